use match3_core::{CellCoord, ComboPairing, Grid, Kind, PowerUp};
use match3_system_matching::Axis;

use crate::{ChainReaction, Detonation, Footprint, Promotion};

/// Special resolution earned by swapping two particular pieces.
///
/// Cells refer to positions after the swap: the dragged piece sits on the
/// second cell of the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SwapCombo {
    /// Two color blasts: the whole board is cleared.
    BoardWipe {
        /// First bomb.
        first: CellCoord,
        /// Second bomb.
        second: CellCoord,
    },
    /// A color blast with a line or area blast.
    ColorConversion {
        /// Cell holding the color blast.
        bomb: CellCoord,
        /// Kind whose pieces are converted.
        kind: Kind,
        /// Blast type copied onto the converted pieces.
        power_up: PowerUp,
    },
    /// A color blast with an ordinary piece.
    ColorClear {
        /// Cell holding the color blast.
        bomb: CellCoord,
        /// Kind whose pieces are cleared.
        kind: Kind,
    },
    /// A line blast with an area blast.
    LineAndArea {
        /// Cell holding the line blast; the cleared band is centred here.
        line: CellCoord,
        /// Cell holding the area blast.
        area: CellCoord,
        /// Horizontal clears three rows, vertical clears three columns.
        axis: Axis,
    },
    /// Two line blasts.
    CrossBlast {
        /// First line blast.
        first: CellCoord,
        /// Second line blast.
        second: CellCoord,
    },
    /// Two area blasts.
    DoubleArea {
        /// Dragged bomb. It survives the first pulse and centres the second.
        primary: CellCoord,
        /// Bomb consumed by the first pulse.
        partner: CellCoord,
    },
}

impl SwapCombo {
    /// Pairing reported to the presentation layer.
    #[must_use]
    pub const fn pairing(&self) -> ComboPairing {
        match self {
            Self::BoardWipe { .. } => ComboPairing::BoardWipe,
            Self::ColorConversion { .. } => ComboPairing::ColorConversion,
            Self::ColorClear { .. } => ComboPairing::ColorClear,
            Self::LineAndArea { .. } => ComboPairing::LineAndArea,
            Self::CrossBlast { .. } => ComboPairing::CrossBlast,
            Self::DoubleArea { .. } => ComboPairing::DoubleArea,
        }
    }

    /// Resolves the detonation of the combo on the current grid.
    ///
    /// For [`SwapCombo::ColorConversion`] this is the joint detonation that
    /// follows [`convert_kind`]. For [`SwapCombo::DoubleArea`] it is the first
    /// pulse only; see [`second_pulse`].
    #[must_use]
    pub fn detonate(&self, grid: &Grid) -> Detonation {
        let mut reaction = ChainReaction::new(grid);
        match *self {
            Self::BoardWipe { first, second } => {
                reaction.consume(first);
                reaction.consume(second);
                reaction.blast(Footprint::Everything);
            }
            Self::ColorConversion { bomb, kind, .. } | Self::ColorClear { bomb, kind } => {
                reaction.consume(bomb);
                reaction.blast(Footprint::Kind(kind));
            }
            Self::LineAndArea { line, area, axis } => {
                reaction.consume(line);
                reaction.consume(area);
                for footprint in band(line, axis) {
                    reaction.blast(footprint);
                }
            }
            Self::CrossBlast { first, second } => {
                let footprints: Vec<Footprint> = [first, second]
                    .into_iter()
                    .filter_map(|cell| {
                        let piece = grid.piece(cell)?;
                        Some(Footprint::of(piece.power_up()?, cell, piece.kind()))
                    })
                    .collect();
                reaction.consume(first);
                reaction.consume(second);
                for footprint in footprints {
                    reaction.blast(footprint);
                }
            }
            Self::DoubleArea { primary, partner } => {
                reaction.spare(primary);
                reaction.consume(partner);
                reaction.blast(Footprint::Area(primary));
            }
        }
        reaction.finish()
    }
}

fn band(center: CellCoord, axis: Axis) -> Vec<Footprint> {
    let (index, make): (u32, fn(u32) -> Footprint) = match axis {
        Axis::Horizontal => (center.row(), Footprint::Row),
        Axis::Vertical => (center.column(), Footprint::Column),
    };
    [index.checked_sub(1), Some(index), index.checked_add(1)]
        .into_iter()
        .flatten()
        .map(make)
        .collect()
}

fn line_axis(power_up: PowerUp) -> Axis {
    match power_up {
        PowerUp::RowBlast => Axis::Horizontal,
        _ => Axis::Vertical,
    }
}

/// Classifies a performed swap by the pieces now occupying both cells.
///
/// `second` holds the dragged piece. Returns `None` when the pairing has no
/// special resolution and ordinary matching applies.
#[must_use]
pub fn classify_swap(grid: &Grid, first: CellCoord, second: CellCoord) -> Option<SwapCombo> {
    use PowerUp::{AreaBlast, ColorBlast};

    let resting = grid.piece(first)?;
    let dragged = grid.piece(second)?;
    let combo = match (resting.power_up(), dragged.power_up()) {
        (Some(ColorBlast), Some(ColorBlast)) => SwapCombo::BoardWipe { first, second },
        (Some(ColorBlast), Some(power_up)) => SwapCombo::ColorConversion {
            bomb: first,
            kind: dragged.kind(),
            power_up,
        },
        (Some(power_up), Some(ColorBlast)) => SwapCombo::ColorConversion {
            bomb: second,
            kind: resting.kind(),
            power_up,
        },
        (Some(ColorBlast), None) => SwapCombo::ColorClear {
            bomb: first,
            kind: dragged.kind(),
        },
        (None, Some(ColorBlast)) => SwapCombo::ColorClear {
            bomb: second,
            kind: resting.kind(),
        },
        (Some(AreaBlast), Some(AreaBlast)) => SwapCombo::DoubleArea {
            primary: second,
            partner: first,
        },
        (Some(AreaBlast), Some(line)) => SwapCombo::LineAndArea {
            line: second,
            area: first,
            axis: line_axis(line),
        },
        (Some(line), Some(AreaBlast)) => SwapCombo::LineAndArea {
            line: first,
            area: second,
            axis: line_axis(line),
        },
        (Some(_), Some(_)) => SwapCombo::CrossBlast { first, second },
        _ => return None,
    };
    Some(combo)
}

/// Converts every piece of `kind` into a blast of the given type.
///
/// Line blasts are re-oriented per piece by `orient`, which receives the
/// converted cell and returns the power-up to grant. Pieces already holding
/// a line or area blast are re-granted; color blasts keep theirs.
pub fn convert_kind(
    grid: &mut Grid,
    kind: Kind,
    power_up: PowerUp,
    mut orient: impl FnMut(CellCoord) -> PowerUp,
) -> Vec<Promotion> {
    let targets = Footprint::Kind(kind).cells(grid);
    let mut converted = Vec::new();
    for cell in targets {
        let Some(piece) = grid.piece_mut(cell) else {
            continue;
        };
        if piece.power_up() == Some(PowerUp::ColorBlast) {
            continue;
        }
        let granted = if power_up.is_line() {
            orient(cell)
        } else {
            power_up
        };
        piece.set_power_up(granted);
        converted.push(Promotion {
            cell,
            power_up: granted,
        });
    }
    converted
}

/// Second pulse of a double area combo, centred on the primary bomb's
/// resting cell after gravity.
#[must_use]
pub fn second_pulse(grid: &Grid, center: CellCoord) -> Detonation {
    let mut reaction = ChainReaction::new(grid);
    reaction.consume(center);
    reaction.blast(Footprint::Area(center));
    reaction.finish()
}
