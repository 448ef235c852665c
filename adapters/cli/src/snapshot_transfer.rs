use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use match3_core::{CellCoord, LevelConfig, Obstacle};
use match3_world::{query, Board};
use serde::{Deserialize, Serialize};

/// Identifier prefix emitted before the encoded snapshot payload.
pub(crate) const SNAPSHOT_HEADER: &str = "match3:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Snapshot of the board contents and obstacle overlays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct BoardSnapshot {
    /// Number of columns on the board.
    pub(crate) columns: u32,
    /// Number of rows on the board.
    pub(crate) rows: u32,
    /// Board contents in layout notation, top row first.
    pub(crate) layout: Vec<String>,
    /// Cells still covered by an obstacle.
    pub(crate) obstacles: Vec<Obstacle>,
}

impl BoardSnapshot {
    /// Captures the current contents of the board.
    #[must_use]
    pub(crate) fn capture(board: &Board) -> Self {
        let grid = query::grid(board);
        let obstacles = grid
            .coords()
            .filter_map(|cell| {
                let durability = grid.get(cell)?.durability();
                (durability > 0).then_some(Obstacle { cell, durability })
            })
            .collect();
        Self {
            columns: grid.columns(),
            rows: grid.rows(),
            layout: grid.to_layout(),
            obstacles,
        }
    }

    /// Replaces the starting board of the level with the snapshot contents.
    ///
    /// Stones travel inside the layout, so configured stones are dropped.
    pub(crate) fn apply_to(self, config: &mut LevelConfig) {
        config.columns = self.columns;
        config.rows = self.rows;
        config.layout = Some(self.layout);
        config.obstacles = self.obstacles;
        config.stones.clear();
    }

    /// Encodes the snapshot into a single-line string suitable for clipboard transfer.
    pub(crate) fn encode(&self) -> Result<String, SnapshotTransferError> {
        let payload = SerializableSnapshot {
            layout: self.layout.clone(),
            obstacles: self
                .obstacles
                .iter()
                .map(|obstacle| (obstacle.cell, obstacle.durability))
                .collect(),
        };
        let json = serde_json::to_vec(&payload).map_err(SnapshotTransferError::InvalidPayload)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!(
            "{SNAPSHOT_HEADER}:{}x{}:{encoded}",
            self.columns, self.rows
        ))
    }

    /// Decodes a snapshot from the provided string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, SnapshotTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(SnapshotTransferError::EmptyPayload);
        }

        let body = trimmed
            .strip_prefix(SNAPSHOT_HEADER)
            .and_then(|rest| rest.strip_prefix(FIELD_DELIMITER))
            .ok_or_else(|| SnapshotTransferError::UnknownHeader(header_of(trimmed)))?;
        let (dimensions, payload) = body
            .split_once(FIELD_DELIMITER)
            .ok_or(SnapshotTransferError::Truncated)?;

        let (columns, rows) = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(SnapshotTransferError::InvalidEncoding)?;
        let decoded: SerializableSnapshot =
            serde_json::from_slice(&bytes).map_err(SnapshotTransferError::InvalidPayload)?;

        let layout_columns = decoded
            .layout
            .first()
            .map_or(0, |row| row.split_whitespace().count());
        if decoded.layout.len() != rows as usize || layout_columns != columns as usize {
            return Err(SnapshotTransferError::DimensionMismatch(
                dimensions.to_owned(),
            ));
        }

        Ok(Self {
            columns,
            rows,
            layout: decoded.layout,
            obstacles: decoded
                .obstacles
                .into_iter()
                .map(|(cell, durability)| Obstacle { cell, durability })
                .collect(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct SerializableSnapshot {
    layout: Vec<String>,
    obstacles: Vec<(CellCoord, u32)>,
}

/// Errors that can occur while transferring board snapshots.
#[derive(Debug)]
pub(crate) enum SnapshotTransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The string does not start with the `match3:v1` header.
    UnknownHeader(String),
    /// The header was not followed by both dimensions and a payload.
    Truncated,
    /// The grid dimensions could not be parsed from the encoded snapshot.
    InvalidDimensions(String),
    /// The layout in the payload disagrees with the advertised dimensions.
    DimensionMismatch(String),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The payload could not be serialised or deserialised.
    InvalidPayload(serde_json::Error),
}

impl fmt::Display for SnapshotTransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "snapshot string was empty"),
            Self::UnknownHeader(header) => {
                write!(f, "snapshot header '{header}' is not {SNAPSHOT_HEADER}")
            }
            Self::Truncated => write!(f, "snapshot string ends before its payload"),
            Self::InvalidDimensions(dimensions) => {
                write!(f, "could not parse board dimensions '{dimensions}'")
            }
            Self::DimensionMismatch(dimensions) => {
                write!(f, "snapshot layout does not span '{dimensions}'")
            }
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode snapshot payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not process snapshot payload: {error}")
            }
        }
    }
}

impl Error for SnapshotTransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            _ => None,
        }
    }
}

/// First two fields of an encoded string, reported back when they are not
/// the expected header.
fn header_of(value: &str) -> String {
    value
        .splitn(3, FIELD_DELIMITER)
        .take(2)
        .collect::<Vec<_>>()
        .join(":")
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), SnapshotTransferError> {
    let invalid = || SnapshotTransferError::InvalidDimensions(dimensions.to_owned());
    let (columns, rows) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;

    let columns = columns.trim().parse::<u32>().map_err(|_| invalid())?;
    let rows = rows.trim().parse::<u32>().map_err(|_| invalid())?;

    if columns == 0 || rows == 0 {
        return Err(invalid());
    }

    Ok((columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_board() -> Board {
        let config = LevelConfig {
            obstacles: vec![Obstacle {
                cell: CellCoord::new(1, 1),
                durability: 2,
            }],
            stones: vec![CellCoord::new(4, 6)],
            ..LevelConfig::default()
        };
        Board::new(config, 17).expect("level is valid")
    }

    #[test]
    fn imported_snapshot_rebuilds_the_same_board() {
        let board = seeded_board();
        let encoded = BoardSnapshot::capture(&board)
            .encode()
            .expect("snapshot encodes");
        assert!(encoded.starts_with(&format!("{SNAPSHOT_HEADER}:6x8:")));

        let mut config = LevelConfig::default();
        BoardSnapshot::decode(&encoded)
            .expect("snapshot decodes")
            .apply_to(&mut config);
        let imported = Board::new(config, 99).expect("imported level is valid");

        assert_eq!(query::grid(&imported), query::grid(&board));
    }

    #[test]
    fn rejects_foreign_prefixes_and_versions() {
        assert!(matches!(
            BoardSnapshot::decode("chess:v1:6x8:e30"),
            Err(SnapshotTransferError::UnknownHeader(header)) if header == "chess:v1"
        ));
        assert!(matches!(
            BoardSnapshot::decode("match3:v2:6x8:e30"),
            Err(SnapshotTransferError::UnknownHeader(header)) if header == "match3:v2"
        ));
        assert!(matches!(
            BoardSnapshot::decode("   "),
            Err(SnapshotTransferError::EmptyPayload)
        ));
    }

    #[test]
    fn rejects_snapshots_cut_short() {
        assert!(matches!(
            BoardSnapshot::decode("match3:v1:6x8"),
            Err(SnapshotTransferError::Truncated)
        ));
        assert!(matches!(
            BoardSnapshot::decode("match3"),
            Err(SnapshotTransferError::UnknownHeader(header)) if header == "match3"
        ));
    }

    #[test]
    fn rejects_layouts_that_disagree_with_the_header() {
        let snapshot = BoardSnapshot {
            columns: 2,
            rows: 1,
            layout: vec!["R G".to_owned()],
            obstacles: Vec::new(),
        };
        let encoded = snapshot.encode().expect("snapshot encodes");
        let tampered = encoded.replacen(":2x1:", ":3x1:", 1);
        assert!(matches!(
            BoardSnapshot::decode(&tampered),
            Err(SnapshotTransferError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn rejects_zero_dimensions() {
        assert!(matches!(
            BoardSnapshot::decode("match3:v1:0x8:e30"),
            Err(SnapshotTransferError::InvalidDimensions(_))
        ));
    }
}
