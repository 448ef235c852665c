#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative board state management for the match-3 engine.
//!
//! The [`Board`] owns the grid, the score, the move budget, and the single
//! random source. Commands enter through [`apply`], which resolves a whole
//! move before returning, or through [`submit`] followed by repeated calls
//! to [`step`], which hands control back after every resolution phase so a
//! presentation layer can animate in between. Both paths drive the same
//! phase machine.

mod generation;
mod orchestrator;

use std::time::Duration;

use match3_core::{
    BoardState, CellCoord, Command, ConfigError, Event, Grid, GridError, LayoutError, LevelConfig,
};
use match3_system_shuffle::{find_legal_move, ShuffleError};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use orchestrator::Stage;
pub use orchestrator::Phase;

/// Represents the authoritative state of one level in play.
#[derive(Debug)]
pub struct Board {
    config: LevelConfig,
    grid: Grid,
    rng: ChaCha8Rng,
    state: BoardState,
    score: u64,
    moves_remaining: u32,
    stage: Option<Stage>,
    elapsed: Duration,
    idle: Duration,
    hint_revealed: bool,
}

impl Board {
    /// Creates a board for the level, seeding its random source with `seed`.
    ///
    /// Without a fixed layout the grid is filled column by column with kinds
    /// that do not form a run, then shuffled if it offers no legal move.
    pub fn new(config: LevelConfig, seed: u64) -> Result<Self, BoardError> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let grid = generation::generate(&config, &mut rng)?;
        Ok(Self {
            moves_remaining: config.moves_allowed,
            config,
            grid,
            rng,
            state: BoardState::Ready,
            score: 0,
            stage: None,
            elapsed: Duration::ZERO,
            idle: Duration::ZERO,
            hint_revealed: false,
        })
    }

    fn set_state(&mut self, state: BoardState, out_events: &mut Vec<Event>) {
        if self.state != state {
            self.state = state;
            out_events.push(Event::StateChanged { state });
        }
    }

    fn reset_idle(&mut self) {
        self.idle = Duration::ZERO;
        self.hint_revealed = false;
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if !matches!(self.state, BoardState::Ready | BoardState::Resolving) {
            return;
        }
        self.elapsed = self.elapsed.saturating_add(dt);
        if self.state != BoardState::Ready || self.hint_revealed {
            return;
        }

        self.idle = self.idle.saturating_add(dt);
        if self.idle < self.config.hint_delay() {
            return;
        }
        self.hint_revealed = true;
        if let Some((first, second)) = find_legal_move(&self.grid) {
            out_events.push(Event::HintRevealed { first, second });
        }
    }
}

/// Errors that abort board creation or resolution.
#[derive(Debug, Error)]
pub enum BoardError {
    /// The level configuration was rejected.
    #[error("invalid level configuration: {0}")]
    Config(#[from] ConfigError),
    /// The fixed layout could not be parsed.
    #[error("invalid level layout: {0}")]
    Layout(#[from] LayoutError),
    /// A deadlocked board could not be rearranged into a playable one.
    #[error("board cannot be unblocked: {0}")]
    Shuffle(#[from] ShuffleError),
    /// A coordinate escaped the grid while resolving a move.
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Applies the command and resolves every phase it starts before returning.
///
/// Phases left pending by an earlier [`submit`] are not advanced; they stay
/// with [`step`].
pub fn apply(
    board: &mut Board,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), BoardError> {
    let already_pending = board.stage.is_some();
    submit(board, command, out_events)?;
    if !already_pending {
        while step(board, out_events)?.is_some() {}
    }
    Ok(())
}

/// Applies the command without resolving the phases it starts.
///
/// Swap requests are only accepted while the board is ready, between two
/// 4-adjacent cells that both hold a piece. Anything else is ignored
/// without an event.
pub fn submit(
    board: &mut Board,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), BoardError> {
    match command {
        Command::RequestSwap { first, second } => {
            orchestrator::begin_swap(board, first, second, out_events)?;
        }
        Command::Pause => {
            if board.state == BoardState::Ready && board.stage.is_none() {
                board.set_state(BoardState::Paused, out_events);
            }
        }
        Command::Resume => {
            if board.state == BoardState::Paused {
                board.set_state(BoardState::Ready, out_events);
            }
        }
        Command::Tick { dt } => board.tick(dt, out_events),
    }
    Ok(())
}

/// Runs the next pending resolution phase, returning it, or `None` when the
/// board has nothing left to resolve.
pub fn step(board: &mut Board, out_events: &mut Vec<Event>) -> Result<Option<Phase>, BoardError> {
    let Some(stage) = board.stage.take() else {
        return Ok(None);
    };
    let phase = stage.phase();
    board.stage = orchestrator::advance(board, stage, out_events)?;
    Ok(Some(phase))
}

/// Query functions that provide read-only access to the board state.
pub mod query {
    use std::time::Duration;

    use super::{Board, CellCoord, Phase};
    use match3_core::{BoardState, Grid, LevelConfig};
    use match3_system_shuffle::find_legal_move;

    /// Provides read-only access to the grid.
    #[must_use]
    pub fn grid(board: &Board) -> &Grid {
        &board.grid
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(board: &Board) -> BoardState {
        board.state
    }

    /// Score accumulated so far.
    #[must_use]
    pub fn score(board: &Board) -> u64 {
        board.score
    }

    /// Moves the player may still spend.
    #[must_use]
    pub fn moves_remaining(board: &Board) -> u32 {
        board.moves_remaining
    }

    /// Star rating earned by the current score.
    #[must_use]
    pub fn stars(board: &Board) -> u8 {
        board.config.stars(board.score)
    }

    /// First legal swap in scan order, if any.
    #[must_use]
    pub fn hint(board: &Board) -> Option<(CellCoord, CellCoord)> {
        find_legal_move(&board.grid)
    }

    /// Board clock, frozen while paused or after the level ended.
    #[must_use]
    pub fn elapsed(board: &Board) -> Duration {
        board.elapsed
    }

    /// Phase the next call to [`crate::step`] will run.
    #[must_use]
    pub fn pending_phase(board: &Board) -> Option<Phase> {
        board.stage.as_ref().map(|stage| stage.phase())
    }

    /// Level configuration the board was created with.
    #[must_use]
    pub fn config(board: &Board) -> &LevelConfig {
        &board.config
    }
}
