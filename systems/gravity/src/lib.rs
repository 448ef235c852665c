#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Gravity and refill for the board grid.
//!
//! Compaction drops the content of every column onto the cells below it,
//! and refill spawns ordinary pieces into the gaps left at the top while
//! avoiding ready-made runs.

use match3_core::{Cell, CellCoord, Content, Grid, Kind, Piece};
use match3_system_matching::creates_run;
use rand::Rng;

/// Content that moved down during compaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fall {
    /// Cell the content left.
    pub from: CellCoord,
    /// Cell the content landed on.
    pub to: CellCoord,
}

/// Piece spawned into an empty cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Spawn {
    /// Cell that received the piece.
    pub cell: CellCoord,
    /// Kind of the new piece.
    pub kind: Kind,
}

/// Everything that happened during one settle pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Settlement {
    /// Falls in column order, bottom to top within each column.
    pub falls: Vec<Fall>,
    /// Spawns in column order, bottom to top within each column.
    pub spawns: Vec<Spawn>,
}

/// Shifts the occupied cells of a column downward, preserving their order.
///
/// Obstacle overlays stay where they are; only contents move.
pub fn compact(grid: &mut Grid, column: u32) -> Vec<Fall> {
    let mut falls = Vec::new();
    let mut floor = 0;
    let cells: Vec<CellCoord> = grid.column_coords(column).collect();
    for cell in cells {
        let Some(slot) = grid.get_mut(cell) else {
            continue;
        };
        if slot.is_empty() {
            continue;
        }
        let target = CellCoord::new(column, floor);
        floor += 1;
        if target == cell {
            continue;
        }
        let content = slot.take_content();
        if let Some(destination) = grid.get_mut(target) {
            destination.set_content(content);
        }
        falls.push(Fall {
            from: cell,
            to: target,
        });
    }
    falls
}

/// Fills the empty cells of a column bottom to top with random kinds.
///
/// A candidate that would complete a run of three with its neighbours is
/// re-rolled, up to `attempts` draws per cell. When every draw matches, the
/// last one is kept and the next detection pass resolves it.
pub fn refill<R: Rng + ?Sized>(
    grid: &mut Grid,
    column: u32,
    palette: &[Kind],
    rng: &mut R,
    attempts: u32,
) -> Vec<Spawn> {
    let mut spawns = Vec::new();
    if palette.is_empty() {
        return spawns;
    }

    let cells: Vec<CellCoord> = grid.column_coords(column).collect();
    for cell in cells {
        if !grid.get(cell).is_some_and(Cell::is_empty) {
            continue;
        }
        let kind = draw_kind(grid, cell, palette, rng, attempts);
        if let Some(slot) = grid.get_mut(cell) {
            slot.set_content(Content::Piece(Piece::new(kind)));
        }
        spawns.push(Spawn { cell, kind });
    }
    spawns
}

fn draw_kind<R: Rng + ?Sized>(
    grid: &Grid,
    cell: CellCoord,
    palette: &[Kind],
    rng: &mut R,
    attempts: u32,
) -> Kind {
    let mut kind = palette[rng.gen_range(0..palette.len())];
    for _ in 1..attempts {
        if !creates_run(grid, cell, kind) {
            break;
        }
        kind = palette[rng.gen_range(0..palette.len())];
    }
    kind
}

/// Compacts and refills every column, left to right.
pub fn settle<R: Rng + ?Sized>(
    grid: &mut Grid,
    palette: &[Kind],
    rng: &mut R,
    attempts: u32,
) -> Settlement {
    let mut settlement = Settlement::default();
    for column in 0..grid.columns() {
        settlement.falls.extend(compact(grid, column));
    }
    for column in 0..grid.columns() {
        settlement
            .spawns
            .extend(refill(grid, column, palette, rng, attempts));
    }
    settlement
}
