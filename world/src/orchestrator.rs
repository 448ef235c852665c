use match3_core::{BoardState, CellCoord, Content, Event, PowerUp};
use match3_system_gravity::settle;
use match3_system_matching::{detect, matches_at};
use match3_system_power_ups::{
    classify_swap, convert_kind, damage_obstacles, mark_matches, marked_cells, plan_promotions,
    second_pulse, ChainReaction, Detonation, SwapCombo,
};
use match3_system_shuffle::{has_any_legal_move, shuffle};
use rand::Rng;

use crate::{Board, BoardError};

/// Resolution phases a swap passes through, in the order they can occur.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Decides whether the swap is kept or reverted.
    Validate,
    /// Turns every piece of one kind into a blast.
    Convert,
    /// Sets off a swap combo.
    Detonate,
    /// Clears the runs currently on the board and grants power-ups.
    Resolve,
    /// Lets pieces fall and spawns new ones.
    Settle,
    /// Second area pulse of a double area combo.
    SecondPulse,
    /// Ends the move: shuffles a deadlocked board and decides win or loss.
    Conclude,
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum Stage {
    Validate {
        first: CellCoord,
        second: CellCoord,
    },
    Convert {
        combo: SwapCombo,
    },
    Detonate {
        combo: SwapCombo,
    },
    Resolve,
    Settle {
        pulse: Option<CellCoord>,
    },
    SecondPulse {
        center: CellCoord,
    },
    Conclude,
}

impl Stage {
    pub(crate) const fn phase(&self) -> Phase {
        match self {
            Self::Validate { .. } => Phase::Validate,
            Self::Convert { .. } => Phase::Convert,
            Self::Detonate { .. } => Phase::Detonate,
            Self::Resolve => Phase::Resolve,
            Self::Settle { .. } => Phase::Settle,
            Self::SecondPulse { .. } => Phase::SecondPulse,
            Self::Conclude => Phase::Conclude,
        }
    }
}

pub(crate) fn begin_swap(
    board: &mut Board,
    first: CellCoord,
    second: CellCoord,
    out_events: &mut Vec<Event>,
) -> Result<(), BoardError> {
    if board.state != BoardState::Ready || board.stage.is_some() {
        return Ok(());
    }
    // Stones, empty cells and out-of-bounds coordinates all lack a piece.
    if !first.is_adjacent(second)
        || board.grid.piece(first).is_none()
        || board.grid.piece(second).is_none()
    {
        return Ok(());
    }

    board.set_state(BoardState::Resolving, out_events);
    board.grid.swap(first, second)?;
    for cell in [first, second] {
        if let Some(piece) = board.grid.piece_mut(cell) {
            piece.set_swapped(true);
        }
    }
    out_events.push(Event::PiecesSwapped { first, second });
    board.reset_idle();
    board.stage = Some(Stage::Validate { first, second });
    Ok(())
}

pub(crate) fn advance(
    board: &mut Board,
    stage: Stage,
    out_events: &mut Vec<Event>,
) -> Result<Option<Stage>, BoardError> {
    match stage {
        Stage::Validate { first, second } => validate(board, first, second, out_events),
        Stage::Convert { combo } => {
            convert(board, combo, out_events);
            Ok(Some(Stage::Detonate { combo }))
        }
        Stage::Detonate { combo } => {
            let detonation = combo.detonate(&board.grid);
            out_events.push(Event::ComboTriggered {
                pairing: combo.pairing(),
                affected: detonation.destroyed.clone(),
            });
            board.destroy(&detonation, out_events);
            board.clear_swap_markers();
            let pulse = match combo {
                SwapCombo::DoubleArea { primary, .. } => Some(primary),
                _ => None,
            };
            Ok(Some(Stage::Settle { pulse }))
        }
        Stage::Resolve => {
            resolve(board, out_events);
            Ok(Some(Stage::Settle { pulse: None }))
        }
        Stage::Settle { pulse } => Ok(Some(settle_board(board, pulse, out_events))),
        Stage::SecondPulse { center } => {
            let detonation = second_pulse(&board.grid, center);
            out_events.push(Event::PowerUpActivated {
                cell: center,
                power_up: PowerUp::AreaBlast,
            });
            board.destroy(&detonation, out_events);
            Ok(Some(Stage::Settle { pulse: None }))
        }
        Stage::Conclude => {
            conclude(board, out_events)?;
            Ok(None)
        }
    }
}

fn validate(
    board: &mut Board,
    first: CellCoord,
    second: CellCoord,
    out_events: &mut Vec<Event>,
) -> Result<Option<Stage>, BoardError> {
    if let Some(combo) = classify_swap(&board.grid, first, second) {
        board.spend_move(out_events);
        let next = match combo {
            SwapCombo::ColorConversion { .. } => Stage::Convert { combo },
            _ => Stage::Detonate { combo },
        };
        return Ok(Some(next));
    }
    if matches_at(&board.grid, first) || matches_at(&board.grid, second) {
        board.spend_move(out_events);
        return Ok(Some(Stage::Resolve));
    }

    board.grid.swap(first, second)?;
    board.clear_swap_markers();
    out_events.push(Event::SwapReverted { first, second });
    board.set_state(BoardState::Ready, out_events);
    Ok(None)
}

fn convert(board: &mut Board, combo: SwapCombo, out_events: &mut Vec<Event>) {
    let SwapCombo::ColorConversion { kind, power_up, .. } = combo else {
        return;
    };
    let rng = &mut board.rng;
    let converted = convert_kind(&mut board.grid, kind, power_up, |_| {
        if rng.gen_bool(0.5) {
            PowerUp::RowBlast
        } else {
            PowerUp::ColumnBlast
        }
    });
    for promotion in converted {
        out_events.push(Event::PowerUpCreated {
            cell: promotion.cell,
            power_up: promotion.power_up,
        });
    }
}

fn resolve(board: &mut Board, out_events: &mut Vec<Event>) {
    let report = detect(&board.grid);
    let promotions = plan_promotions(&board.grid, &report);
    mark_matches(&mut board.grid, &report, &promotions);

    let mut reaction = ChainReaction::new(&board.grid);
    for promotion in &promotions {
        reaction.spare(promotion.cell);
    }
    for cell in marked_cells(&board.grid) {
        reaction.destroy(cell);
    }
    let detonation = reaction.finish();
    board.destroy(&detonation, out_events);

    for promotion in promotions {
        if let Some(piece) = board.grid.piece_mut(promotion.cell) {
            piece.set_power_up(promotion.power_up);
            out_events.push(Event::PowerUpCreated {
                cell: promotion.cell,
                power_up: promotion.power_up,
            });
        }
    }
    board.clear_swap_markers();
}

fn settle_board(board: &mut Board, pulse: Option<CellCoord>, out_events: &mut Vec<Event>) -> Stage {
    let settlement = settle(
        &mut board.grid,
        &board.config.palette,
        &mut board.rng,
        board.config.tuning.refill_attempts,
    );

    let mut pulse = pulse;
    for fall in settlement.falls {
        if pulse == Some(fall.from) {
            pulse = Some(fall.to);
        }
        out_events.push(Event::PieceFell {
            from: fall.from,
            to: fall.to,
        });
    }
    for spawn in settlement.spawns {
        out_events.push(Event::PieceSpawned {
            cell: spawn.cell,
            kind: spawn.kind,
        });
    }
    out_events.push(Event::GravityApplied);

    if let Some(center) = pulse {
        Stage::SecondPulse { center }
    } else if detect(&board.grid).is_empty() {
        Stage::Conclude
    } else {
        Stage::Resolve
    }
}

fn conclude(board: &mut Board, out_events: &mut Vec<Event>) -> Result<(), BoardError> {
    out_events.push(Event::CascadeSettled);
    if !has_any_legal_move(&board.grid) {
        let attempts = shuffle(
            &mut board.grid,
            &mut board.rng,
            board.config.tuning.shuffle_attempts,
        )?;
        out_events.push(Event::Shuffled { attempts });
    }

    let next = if board.score >= board.config.score_goal {
        BoardState::Won
    } else if board.moves_remaining == 0 {
        BoardState::Lost
    } else {
        BoardState::Ready
    };
    board.set_state(next, out_events);
    board.reset_idle();
    Ok(())
}

impl Board {
    fn spend_move(&mut self, out_events: &mut Vec<Event>) {
        self.moves_remaining = self.moves_remaining.saturating_sub(1);
        out_events.push(Event::MovesChanged {
            remaining: self.moves_remaining,
        });
    }

    fn clear_swap_markers(&mut self) {
        let cells: Vec<CellCoord> = self.grid.coords().collect();
        for cell in cells {
            if let Some(piece) = self.grid.piece_mut(cell) {
                piece.set_swapped(false);
            }
        }
    }

    /// Empties every destroyed cell, awards score, and wears down the
    /// obstacles next to them.
    fn destroy(&mut self, detonation: &Detonation, out_events: &mut Vec<Event>) {
        for activation in &detonation.activations {
            out_events.push(Event::PowerUpActivated {
                cell: activation.cell,
                power_up: activation.power_up,
            });
        }

        let per_piece = self.config.tuning.score_per_piece;
        let mut gained = 0_u64;
        let mut cleared = Vec::with_capacity(detonation.destroyed.len());
        for &cell in &detonation.destroyed {
            let Some(slot) = self.grid.get_mut(cell) else {
                continue;
            };
            let score_delta = match slot.take_content() {
                Content::Piece(_) => per_piece,
                Content::Stone => 0,
                Content::Empty => continue,
            };
            gained += u64::from(score_delta);
            cleared.push(cell);
            out_events.push(Event::PieceDestroyed { cell, score_delta });
        }

        for hit in damage_obstacles(&mut self.grid, &cleared) {
            out_events.push(Event::ObstacleDamaged {
                cell: hit.cell,
                remaining: hit.remaining,
            });
        }

        if gained > 0 {
            self.score += gained;
            out_events.push(Event::ScoreChanged { total: self.score });
        }
    }
}
