#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deadlock detection and board shuffling.
//!
//! A board is deadlocked when no single swap of two adjacent pieces
//! produces a run of three or a swap combo. Stones never take part in a
//! swap, so they are skipped by the scan and stay put during a shuffle.

use match3_core::{CellCoord, Content, Direction, Grid, Piece};
use match3_system_matching::{detect, matches_at};
use match3_system_power_ups::classify_swap;
use rand::{seq::SliceRandom, Rng};
use thiserror::Error;

/// Errors reported by the shuffle engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ShuffleError {
    /// No playable permutation was found within the attempt budget.
    #[error("no playable arrangement found after {attempts} shuffles")]
    Exhausted {
        /// Number of permutations tried.
        attempts: u32,
    },
}

fn is_swappable(grid: &Grid, cell: CellCoord) -> bool {
    grid.piece(cell).is_some()
}

/// Reports whether swapping the two cells would be accepted as a move.
///
/// The swap is legal when either cell ends up in a run of three or when the
/// pair resolves as a swap combo. The grid is left unchanged.
#[must_use]
pub fn is_legal_swap(grid: &Grid, first: CellCoord, second: CellCoord) -> bool {
    if !first.is_adjacent(second) || !is_swappable(grid, first) || !is_swappable(grid, second) {
        return false;
    }
    let mut scratch = grid.clone();
    if scratch.swap(first, second).is_err() {
        return false;
    }
    matches_at(&scratch, first)
        || matches_at(&scratch, second)
        || classify_swap(&scratch, first, second).is_some()
}

/// First legal swap in scan order, pairing every cell with its right and
/// upper neighbour so each adjacent pair is tried exactly once.
#[must_use]
pub fn find_legal_move(grid: &Grid) -> Option<(CellCoord, CellCoord)> {
    let mut scratch = grid.clone();
    for cell in grid.coords() {
        if !is_swappable(grid, cell) {
            continue;
        }
        for direction in [Direction::Right, Direction::Up] {
            let Some(neighbor) = grid.step(cell, direction) else {
                continue;
            };
            if !is_swappable(grid, neighbor) {
                continue;
            }
            if scratch.swap(cell, neighbor).is_err() {
                continue;
            }
            let legal = matches_at(&scratch, cell)
                || matches_at(&scratch, neighbor)
                || classify_swap(&scratch, cell, neighbor).is_some();
            if scratch.swap(cell, neighbor).is_err() {
                continue;
            }
            if legal {
                return Some((cell, neighbor));
            }
        }
    }
    None
}

/// Reports whether at least one legal swap exists.
#[must_use]
pub fn has_any_legal_move(grid: &Grid) -> bool {
    find_legal_move(grid).is_some()
}

/// Rearranges the pieces of the board until it is playable.
///
/// Every piece is pooled, shuffled, and dealt back onto the same cells in
/// scan order. Stones, empty cells, and obstacle overlays keep their place.
/// A permutation is accepted when it holds no ready-made match and offers at
/// least one legal swap. Returns the number of permutations drawn.
pub fn shuffle<R: Rng + ?Sized>(
    grid: &mut Grid,
    rng: &mut R,
    max_attempts: u32,
) -> Result<u32, ShuffleError> {
    let cells: Vec<CellCoord> = grid
        .coords()
        .filter(|cell| is_swappable(grid, *cell))
        .collect();
    let mut pool: Vec<Piece> = cells
        .iter()
        .filter_map(|cell| grid.piece(*cell).copied())
        .collect();

    for attempt in 1..=max_attempts {
        pool.shuffle(rng);
        for (cell, piece) in cells.iter().zip(&pool) {
            if let Some(slot) = grid.get_mut(*cell) {
                slot.set_content(Content::Piece(*piece));
            }
        }
        if detect(grid).is_empty() && has_any_legal_move(grid) {
            return Ok(attempt);
        }
    }

    Err(ShuffleError::Exhausted {
        attempts: max_attempts,
    })
}
