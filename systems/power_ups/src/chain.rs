use std::collections::{BTreeSet, VecDeque};

use match3_core::{CellCoord, Content, Grid, Kind, PowerUp};

/// Set of cells a detonation clears.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Footprint {
    /// Every cell of one row.
    Row(u32),
    /// Every cell of one column.
    Column(u32),
    /// The 3x3 neighbourhood of a cell, clipped to the board.
    Area(CellCoord),
    /// Every piece of one kind. Stones are never included.
    Kind(Kind),
    /// Every cell on the board.
    Everything,
}

impl Footprint {
    /// Footprint cleared when a piece carrying `power_up` detonates at `cell`.
    #[must_use]
    pub const fn of(power_up: PowerUp, cell: CellCoord, kind: Kind) -> Self {
        match power_up {
            PowerUp::RowBlast => Self::Row(cell.row()),
            PowerUp::ColumnBlast => Self::Column(cell.column()),
            PowerUp::AreaBlast => Self::Area(cell),
            PowerUp::ColorBlast => Self::Kind(kind),
        }
    }

    /// Cells covered by the footprint on the provided grid, in scan order.
    #[must_use]
    pub fn cells(&self, grid: &Grid) -> Vec<CellCoord> {
        match *self {
            Self::Row(row) => grid.row_coords(row).collect(),
            Self::Column(column) => grid.column_coords(column).collect(),
            Self::Area(center) => (-1..=1)
                .flat_map(|column| (-1..=1).map(move |row| (column, row)))
                .filter_map(|(column, row)| grid.offset(center, column, row))
                .collect(),
            Self::Kind(kind) => grid
                .coords()
                .filter(|cell| grid.piece(*cell).is_some_and(|piece| piece.kind() == kind))
                .collect(),
            Self::Everything => grid.coords().collect(),
        }
    }
}

/// Power-up detonation recorded while a chain reaction resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Activation {
    /// Cell the power-up occupied.
    pub cell: CellCoord,
    /// Power-up that detonated.
    pub power_up: PowerUp,
}

/// Outcome of a resolved chain reaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Detonation {
    /// Cells whose content must be destroyed, in scan order.
    pub destroyed: Vec<CellCoord>,
    /// Power-ups that detonated, in trigger order.
    pub activations: Vec<Activation>,
}

/// Worklist that expands destructions through any power-ups they hit.
///
/// Destroying a cell that holds an untriggered power-up queues its
/// footprint, which may hit further power-ups. Every power-up triggers at
/// most once, so the reaction always ends.
#[derive(Debug)]
pub struct ChainReaction<'a> {
    grid: &'a Grid,
    spared: BTreeSet<CellCoord>,
    triggered: BTreeSet<CellCoord>,
    destroyed: BTreeSet<CellCoord>,
    pending: VecDeque<CellCoord>,
}

impl<'a> ChainReaction<'a> {
    /// Starts an empty reaction over the provided grid.
    #[must_use]
    pub fn new(grid: &'a Grid) -> Self {
        Self {
            grid,
            spared: BTreeSet::new(),
            triggered: BTreeSet::new(),
            destroyed: BTreeSet::new(),
            pending: VecDeque::new(),
        }
    }

    /// Protects a cell from every destruction in this reaction.
    pub fn spare(&mut self, cell: CellCoord) {
        let _ = self.spared.insert(cell);
        let _ = self.destroyed.remove(&cell);
    }

    /// Destroys a cell without triggering the power-up it carries.
    pub fn consume(&mut self, cell: CellCoord) {
        if self.spared.contains(&cell) {
            return;
        }
        if self.grid.get(cell).is_some_and(|slot| !slot.is_empty()) {
            let _ = self.destroyed.insert(cell);
            let _ = self.triggered.insert(cell);
        }
    }

    /// Destroys a cell, triggering its power-up if it has not fired yet.
    pub fn destroy(&mut self, cell: CellCoord) {
        if self.spared.contains(&cell) {
            return;
        }
        let grid = self.grid;
        let Some(slot) = grid.get(cell) else {
            return;
        };
        match slot.content() {
            Content::Empty => {}
            Content::Stone => {
                let _ = self.destroyed.insert(cell);
            }
            Content::Piece(piece) => {
                let _ = self.destroyed.insert(cell);
                if piece.power_up().is_some() && self.triggered.insert(cell) {
                    self.pending.push_back(cell);
                }
            }
        }
    }

    /// Destroys every cell of a footprint.
    pub fn blast(&mut self, footprint: Footprint) {
        for cell in footprint.cells(self.grid) {
            self.destroy(cell);
        }
    }

    /// Resolves every queued trigger and reports the outcome.
    #[must_use]
    pub fn finish(mut self) -> Detonation {
        let grid = self.grid;
        let mut activations = Vec::new();
        while let Some(cell) = self.pending.pop_front() {
            let Some(piece) = grid.piece(cell) else {
                continue;
            };
            let Some(power_up) = piece.power_up() else {
                continue;
            };
            activations.push(Activation { cell, power_up });
            self.blast(Footprint::of(power_up, cell, piece.kind()));
        }

        Detonation {
            destroyed: self.destroyed.into_iter().collect(),
            activations,
        }
    }
}
