use std::{collections::BTreeSet, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CellCoord, Kind};

const DEFAULT_COLUMNS: u32 = 6;
const DEFAULT_ROWS: u32 = 8;
const DEFAULT_MOVES: u32 = 20;
const DEFAULT_SCORE_GOAL: u64 = 1_000;
const DEFAULT_PALETTE: [Kind; 5] = [Kind::Red, Kind::Orange, Kind::Yellow, Kind::Green, Kind::Blue];

/// Static description of a level, supplied once when a board is created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Number of columns on the board.
    pub columns: u32,
    /// Number of rows on the board.
    pub rows: u32,
    /// Moves the player may spend before the level is lost.
    pub moves_allowed: u32,
    /// Score that wins the level.
    pub score_goal: u64,
    /// Kinds that may be spawned. At least two distinct kinds are required.
    pub palette: Vec<Kind>,
    /// Cells that start with an obstacle overlay.
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
    /// Cells that start with an immovable stone.
    #[serde(default)]
    pub stones: Vec<CellCoord>,
    /// Optional fixed starting layout, top row first. Random when absent.
    #[serde(default)]
    pub layout: Option<Vec<String>>,
    /// Engine limits and scoring constants.
    #[serde(default)]
    pub tuning: Tuning,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            rows: DEFAULT_ROWS,
            moves_allowed: DEFAULT_MOVES,
            score_goal: DEFAULT_SCORE_GOAL,
            palette: DEFAULT_PALETTE.to_vec(),
            obstacles: Vec::new(),
            stones: Vec::new(),
            layout: None,
            tuning: Tuning::default(),
        }
    }
}

impl LevelConfig {
    /// Checks the configuration for values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.columns == 0 || self.rows == 0 {
            return Err(ConfigError::EmptyBoard {
                columns: self.columns,
                rows: self.rows,
            });
        }
        if self.moves_allowed == 0 {
            return Err(ConfigError::NoMoves);
        }

        let mut seen = BTreeSet::new();
        for kind in &self.palette {
            if !seen.insert(*kind) {
                return Err(ConfigError::DuplicateKind(*kind));
            }
        }
        if seen.len() < 2 {
            return Err(ConfigError::TooFewKinds { found: seen.len() });
        }

        let in_bounds = |cell: CellCoord| cell.column() < self.columns && cell.row() < self.rows;
        let cells = self
            .obstacles
            .iter()
            .map(|obstacle| obstacle.cell)
            .chain(self.stones.iter().copied());
        for cell in cells {
            if !in_bounds(cell) {
                return Err(ConfigError::CellOutOfBounds { cell });
            }
        }

        self.tuning.validate()
    }

    /// Duration of player inactivity after which a hint is revealed.
    #[must_use]
    pub fn hint_delay(&self) -> Duration {
        Duration::from_millis(self.tuning.hint_delay_ms)
    }

    /// Star rating earned by the provided score, from zero to three.
    #[must_use]
    pub fn stars(&self, score: u64) -> u8 {
        if self.score_goal == 0 {
            return 3;
        }
        let percent = score.saturating_mul(100) / self.score_goal;
        let thresholds = [
            self.tuning.one_star_percent,
            self.tuning.two_star_percent,
            self.tuning.three_star_percent,
        ];
        thresholds
            .iter()
            .filter(|threshold| percent >= u64::from(**threshold))
            .count() as u8
    }
}

/// Obstacle overlay placed on a cell at level start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Cell carrying the overlay.
    pub cell: CellCoord,
    /// Number of adjacent destructions the overlay absorbs.
    pub durability: u32,
}

/// Engine limits and scoring constants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Re-rolls allowed per spawned piece before a matching kind is accepted.
    pub refill_attempts: u32,
    /// Permutations tried before a deadlocked board is declared unsolvable.
    pub shuffle_attempts: u32,
    /// Score awarded for every destroyed piece.
    pub score_per_piece: u32,
    /// Idle time in milliseconds before a hint is revealed.
    pub hint_delay_ms: u64,
    /// Percentage of the score goal that earns the first star.
    pub one_star_percent: u32,
    /// Percentage of the score goal that earns the second star.
    pub two_star_percent: u32,
    /// Percentage of the score goal that earns the third star.
    pub three_star_percent: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            refill_attempts: 100,
            shuffle_attempts: 1_000,
            score_per_piece: 20,
            hint_delay_ms: 3_000,
            one_star_percent: 50,
            two_star_percent: 75,
            three_star_percent: 100,
        }
    }
}

impl Tuning {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.refill_attempts == 0 {
            return Err(ConfigError::ZeroAttempts("refill_attempts"));
        }
        if self.shuffle_attempts == 0 {
            return Err(ConfigError::ZeroAttempts("shuffle_attempts"));
        }
        let ascending = self.one_star_percent <= self.two_star_percent
            && self.two_star_percent <= self.three_star_percent;
        if !ascending {
            return Err(ConfigError::StarThresholds);
        }
        Ok(())
    }
}

/// Reasons a level configuration is rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The board has no cells.
    #[error("board dimensions {columns}x{rows} leave no cells")]
    EmptyBoard {
        /// Configured column count.
        columns: u32,
        /// Configured row count.
        rows: u32,
    },
    /// The level grants no moves.
    #[error("level must allow at least one move")]
    NoMoves,
    /// The palette lists the same kind twice.
    #[error("palette lists {0:?} more than once")]
    DuplicateKind(Kind),
    /// The palette cannot produce a board without ready-made matches.
    #[error("palette needs at least two kinds, found {found}")]
    TooFewKinds {
        /// Number of distinct kinds configured.
        found: usize,
    },
    /// An obstacle or stone lies outside the board.
    #[error("cell ({}, {}) lies outside the board", .cell.column(), .cell.row())]
    CellOutOfBounds {
        /// Offending coordinate.
        cell: CellCoord,
    },
    /// A fixed layout does not match the configured dimensions.
    #[error("layout is {found_columns}x{found_rows}, expected {columns}x{rows}")]
    LayoutSize {
        /// Configured column count.
        columns: u32,
        /// Configured row count.
        rows: u32,
        /// Column count of the layout.
        found_columns: u32,
        /// Row count of the layout.
        found_rows: u32,
    },
    /// A retry limit was configured as zero.
    #[error("{0} must be at least one")]
    ZeroAttempts(&'static str),
    /// Star thresholds are not ascending.
    #[error("star thresholds must be ascending")]
    StarThresholds,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_is_valid() {
        let config = LevelConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.hint_delay(), Duration::from_secs(3));
    }

    #[test]
    fn single_kind_palette_is_rejected() {
        let config = LevelConfig {
            palette: vec![Kind::Red],
            ..LevelConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::TooFewKinds { found: 1 }));
    }

    #[test]
    fn duplicate_palette_entries_are_rejected() {
        let config = LevelConfig {
            palette: vec![Kind::Red, Kind::Blue, Kind::Red],
            ..LevelConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::DuplicateKind(Kind::Red)));
    }

    #[test]
    fn obstacles_must_lie_on_the_board() {
        let cell = CellCoord::new(6, 0);
        let config = LevelConfig {
            obstacles: vec![Obstacle {
                cell,
                durability: 1,
            }],
            ..LevelConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::CellOutOfBounds { cell }));
    }

    #[test]
    fn zero_shuffle_attempts_are_rejected() {
        let config = LevelConfig {
            tuning: Tuning {
                shuffle_attempts: 0,
                ..Tuning::default()
            },
            ..LevelConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroAttempts("shuffle_attempts"))
        );
    }

    #[test]
    fn stars_follow_goal_thresholds() {
        let config = LevelConfig::default();
        assert_eq!(config.stars(0), 0);
        assert_eq!(config.stars(499), 0);
        assert_eq!(config.stars(500), 1);
        assert_eq!(config.stars(750), 2);
        assert_eq!(config.stars(1_000), 3);
        assert_eq!(config.stars(5_000), 3);
    }

    #[test]
    fn levels_parse_from_toml_with_defaults() {
        let source = r#"
            columns = 7
            rows = 9
            moves_allowed = 25
            score_goal = 2500
            palette = ["red", "green", "blue"]
            stones = [{ column = 3, row = 0 }]

            [[obstacles]]
            cell = { column = 1, row = 4 }
            durability = 2

            [tuning]
            refill_attempts = 50
        "#;
        let config: LevelConfig = toml::from_str(source).expect("level parses");
        assert_eq!(config.columns, 7);
        assert_eq!(config.palette, vec![Kind::Red, Kind::Green, Kind::Blue]);
        assert_eq!(config.stones, vec![CellCoord::new(3, 0)]);
        assert_eq!(config.obstacles[0].durability, 2);
        assert_eq!(config.tuning.refill_attempts, 50);
        assert_eq!(config.tuning.shuffle_attempts, 1_000);
        assert_eq!(config.layout, None);
        assert_eq!(config.validate(), Ok(()));
    }
}
