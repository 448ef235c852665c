#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Match detection over the board grid.
//!
//! Detection is a pure function of the grid: it never mutates cells and two
//! consecutive calls on the same grid return identical reports. Marking and
//! promotion are left to the power-up resolver.

use match3_core::{CellCoord, Direction, Grid, Kind, PowerUp};

/// Minimum run length that counts as a match.
pub const MIN_RUN: u32 = 3;

/// Run lengths through a single cell along both axes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RunLengths {
    /// Length of the horizontal run containing the cell.
    pub horizontal: u32,
    /// Length of the vertical run containing the cell.
    pub vertical: u32,
}

impl RunLengths {
    /// Reports whether either axis holds a run of at least three.
    #[must_use]
    pub const fn is_match(&self) -> bool {
        self.horizontal >= MIN_RUN || self.vertical >= MIN_RUN
    }

    /// Reports whether the cell sits where a horizontal and a vertical run cross.
    #[must_use]
    pub const fn is_intersection(&self) -> bool {
        self.horizontal >= MIN_RUN && self.vertical >= MIN_RUN
    }

    /// Power-up this cell would qualify for, evaluated highest priority first.
    #[must_use]
    pub const fn candidate(&self) -> Option<PowerUp> {
        if self.horizontal >= 5 || self.vertical >= 5 {
            Some(PowerUp::ColorBlast)
        } else if self.is_intersection() {
            Some(PowerUp::AreaBlast)
        } else if self.horizontal == 4 {
            Some(PowerUp::RowBlast)
        } else if self.vertical == 4 {
            Some(PowerUp::ColumnBlast)
        } else {
            None
        }
    }
}

/// Axis a run extends along.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Left to right.
    Horizontal,
    /// Bottom to top.
    Vertical,
}

/// Maximal run of at least three matchable pieces of one kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Run {
    /// Axis the run extends along.
    pub axis: Axis,
    /// Lowest-index endpoint: leftmost for horizontal runs, bottommost for vertical ones.
    pub start: CellCoord,
    /// Number of cells in the run.
    pub length: u32,
    /// Kind shared by every piece of the run.
    pub kind: Kind,
}

impl Run {
    /// Cells covered by the run, starting at the lowest-index endpoint.
    #[must_use]
    pub fn cells(&self) -> Vec<CellCoord> {
        (0..self.length)
            .map(|offset| match self.axis {
                Axis::Horizontal => CellCoord::new(self.start.column() + offset, self.start.row()),
                Axis::Vertical => CellCoord::new(self.start.column(), self.start.row() + offset),
            })
            .collect()
    }

    /// Reports whether the run covers the provided cell.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        match self.axis {
            Axis::Horizontal => {
                cell.row() == self.start.row()
                    && cell.column() >= self.start.column()
                    && cell.column() < self.start.column() + self.length
            }
            Axis::Vertical => {
                cell.column() == self.start.column()
                    && cell.row() >= self.start.row()
                    && cell.row() < self.start.row() + self.length
            }
        }
    }
}

/// Matched cell together with the run lengths through it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MatchedCell {
    /// Location of the matched piece.
    pub cell: CellCoord,
    /// Run lengths through the cell.
    pub lengths: RunLengths,
}

/// Result of one detection pass over the whole grid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MatchReport {
    cells: Vec<MatchedCell>,
    runs: Vec<Run>,
}

impl MatchReport {
    /// Reports whether the pass found nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Matched cells in scan order.
    #[must_use]
    pub fn cells(&self) -> &[MatchedCell] {
        &self.cells
    }

    /// Maximal runs found, horizontal runs first.
    #[must_use]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Reports whether the provided cell was matched.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.cells
            .binary_search_by(|matched| matched.cell.cmp(&cell))
            .is_ok()
    }

    /// Coordinates of every matched cell in scan order.
    pub fn coords(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.cells.iter().map(|matched| matched.cell)
    }
}

/// Kind of the piece at `cell` if it may take part in an adjacency run.
#[must_use]
pub fn matchable_kind(grid: &Grid, cell: CellCoord) -> Option<Kind> {
    grid.piece(cell)
        .filter(|piece| piece.is_matchable())
        .map(|piece| piece.kind())
}

fn count_direction(grid: &Grid, cell: CellCoord, kind: Kind, direction: Direction) -> u32 {
    let mut count = 0;
    let mut cursor = cell;
    while let Some(next) = grid.step(cursor, direction) {
        if matchable_kind(grid, next) != Some(kind) {
            break;
        }
        count += 1;
        cursor = next;
    }
    count
}

fn lengths_for(grid: &Grid, cell: CellCoord, kind: Kind) -> RunLengths {
    let count = |direction| count_direction(grid, cell, kind, direction);
    RunLengths {
        horizontal: 1 + count(Direction::Left) + count(Direction::Right),
        vertical: 1 + count(Direction::Down) + count(Direction::Up),
    }
}

/// Run lengths through the piece at `cell`.
///
/// Cells without a matchable piece report zero on both axes.
#[must_use]
pub fn run_lengths(grid: &Grid, cell: CellCoord) -> RunLengths {
    match matchable_kind(grid, cell) {
        Some(kind) => lengths_for(grid, cell, kind),
        None => RunLengths::default(),
    }
}

/// Reports whether the piece at `cell` currently belongs to a run of three.
#[must_use]
pub fn matches_at(grid: &Grid, cell: CellCoord) -> bool {
    run_lengths(grid, cell).is_match()
}

/// Reports whether placing a piece of `kind` at `cell` would complete a run
/// of three with the pieces already around it.
#[must_use]
pub fn creates_run(grid: &Grid, cell: CellCoord, kind: Kind) -> bool {
    grid.contains(cell) && lengths_for(grid, cell, kind).is_match()
}

/// Scans the whole grid for matches.
#[must_use]
pub fn detect(grid: &Grid) -> MatchReport {
    let cells = grid
        .coords()
        .filter_map(|cell| {
            let lengths = run_lengths(grid, cell);
            lengths.is_match().then_some(MatchedCell { cell, lengths })
        })
        .collect();

    let mut runs = Vec::new();
    for row in 0..grid.rows() {
        collect_runs(grid, grid.row_coords(row), Axis::Horizontal, &mut runs);
    }
    for column in 0..grid.columns() {
        collect_runs(grid, grid.column_coords(column), Axis::Vertical, &mut runs);
    }

    MatchReport { cells, runs }
}

fn collect_runs(
    grid: &Grid,
    line: impl Iterator<Item = CellCoord>,
    axis: Axis,
    out: &mut Vec<Run>,
) {
    let mut current: Option<Run> = None;
    for cell in line {
        let kind = matchable_kind(grid, cell);
        if let (Some(run), Some(kind)) = (current.as_mut(), kind) {
            if run.kind == kind {
                run.length += 1;
                continue;
            }
        }

        if let Some(run) = current.take() {
            if run.length >= MIN_RUN {
                out.push(run);
            }
        }
        current = kind.map(|kind| Run {
            axis,
            start: cell,
            length: 1,
            kind,
        });
    }
    if let Some(run) = current {
        if run.length >= MIN_RUN {
            out.push(run);
        }
    }
}
