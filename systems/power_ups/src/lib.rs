#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Power-up resolution: promotions earned by long or crossing runs, swap
//! combos between special pieces, chain reactions, and obstacle damage.

mod chain;
mod combo;
mod obstacles;

use std::collections::BTreeSet;

use match3_core::{CellCoord, Grid, PowerUp};
use match3_system_matching::{Axis, MatchReport, Run};

pub use chain::{Activation, ChainReaction, Detonation, Footprint};
pub use combo::{classify_swap, convert_kind, second_pulse, SwapCombo};
pub use obstacles::{damage_obstacles, ObstacleHit};

/// A matched cell that survives the pass and gains a power-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Promotion {
    /// Cell that keeps its piece.
    pub cell: CellCoord,
    /// Power-up granted to the piece.
    pub power_up: PowerUp,
}

/// Groups the runs of a report into connected shapes and picks the
/// power-up and anchor each shape earns.
///
/// Runs that share a cell form one shape. A shape holding a run of five or
/// more earns a color blast, a crossing earns an area blast, and a lone run
/// of four earns a row or column blast along its axis. The anchor is the
/// swapped piece when the shape contains one, otherwise the lowest-index
/// endpoint of the qualifying run. Pieces that already carry a power-up are
/// never chosen.
#[must_use]
pub fn plan_promotions(grid: &Grid, report: &MatchReport) -> Vec<Promotion> {
    let runs = report.runs();
    let mut promotions = Vec::new();
    for shape in shapes(runs) {
        let members: Vec<&Run> = shape.iter().map(|index| &runs[*index]).collect();
        let Some(power_up) = shape_power_up(&members) else {
            continue;
        };
        if let Some(cell) = anchor(grid, &members, power_up) {
            promotions.push(Promotion { cell, power_up });
        }
    }
    promotions.sort_by_key(|promotion| promotion.cell);
    promotions
}

/// Marks every matched piece that is not a promotion anchor for destruction
/// and clears its swap marker. Anchors stay unmarked and keep theirs.
pub fn mark_matches(grid: &mut Grid, report: &MatchReport, promotions: &[Promotion]) {
    for cell in report.coords() {
        if promotions.iter().any(|promotion| promotion.cell == cell) {
            continue;
        }
        if let Some(piece) = grid.piece_mut(cell) {
            piece.set_matched(true);
            piece.set_swapped(false);
        }
    }
}

/// Cells whose piece is marked for destruction, in scan order.
#[must_use]
pub fn marked_cells(grid: &Grid) -> Vec<CellCoord> {
    grid.coords()
        .filter(|cell| grid.piece(*cell).is_some_and(|piece| piece.is_matched()))
        .collect()
}

fn shapes(runs: &[Run]) -> Vec<Vec<usize>> {
    let mut parent: Vec<usize> = (0..runs.len()).collect();
    for (left, first) in runs.iter().enumerate() {
        for (offset, second) in runs[left + 1..].iter().enumerate() {
            if first.axis != second.axis && crossing(first, second).is_some() {
                union(&mut parent, left, left + 1 + offset);
            }
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut roots: Vec<usize> = Vec::new();
    for index in 0..runs.len() {
        let root = find(&mut parent, index);
        match roots.iter().position(|existing| *existing == root) {
            Some(position) => groups[position].push(index),
            None => {
                roots.push(root);
                groups.push(vec![index]);
            }
        }
    }
    groups
}

fn find(parent: &mut [usize], index: usize) -> usize {
    let mut root = index;
    while parent[root] != root {
        root = parent[root];
    }
    let mut cursor = index;
    while parent[cursor] != root {
        let next = parent[cursor];
        parent[cursor] = root;
        cursor = next;
    }
    root
}

fn union(parent: &mut [usize], left: usize, right: usize) {
    let left_root = find(parent, left);
    let right_root = find(parent, right);
    if left_root != right_root {
        parent[right_root] = left_root;
    }
}

fn crossing(first: &Run, second: &Run) -> Option<CellCoord> {
    let (horizontal, vertical) = match first.axis {
        Axis::Horizontal => (first, second),
        Axis::Vertical => (second, first),
    };
    let cell = CellCoord::new(vertical.start.column(), horizontal.start.row());
    (horizontal.contains(cell) && vertical.contains(cell)).then_some(cell)
}

fn shape_power_up(members: &[&Run]) -> Option<PowerUp> {
    if members.iter().any(|run| run.length >= 5) {
        return Some(PowerUp::ColorBlast);
    }
    if members.len() > 1 {
        return Some(PowerUp::AreaBlast);
    }
    let run = members.first()?;
    match (run.axis, run.length) {
        (Axis::Horizontal, 4) => Some(PowerUp::RowBlast),
        (Axis::Vertical, 4) => Some(PowerUp::ColumnBlast),
        _ => None,
    }
}

fn anchor(grid: &Grid, members: &[&Run], power_up: PowerUp) -> Option<CellCoord> {
    let cells: BTreeSet<CellCoord> = members.iter().flat_map(|run| run.cells()).collect();
    let eligible = |cell: &CellCoord| {
        grid.piece(*cell)
            .is_some_and(|piece| piece.power_up().is_none())
    };

    let swapped = cells.iter().copied().find(|cell| {
        eligible(cell) && grid.piece(*cell).is_some_and(|piece| piece.is_swapped())
    });
    if swapped.is_some() {
        return swapped;
    }

    let preferred: Vec<CellCoord> = match power_up {
        PowerUp::AreaBlast => {
            let mut crossings: Vec<CellCoord> = Vec::new();
            for (index, first) in members.iter().enumerate() {
                for second in &members[index + 1..] {
                    if first.axis != second.axis {
                        crossings.extend(crossing(first, second));
                    }
                }
            }
            crossings.sort();
            crossings
        }
        _ => members
            .iter()
            .max_by_key(|run| run.length)
            .map(|run| run.cells())
            .unwrap_or_default(),
    };

    preferred
        .into_iter()
        .chain(cells.iter().copied())
        .find(|cell| eligible(cell))
}
