use std::{collections::BTreeSet, time::Duration};

use match3_core::{
    BoardState, Cell, CellCoord, ComboPairing, Command, Content, Event, Kind, LevelConfig,
    Obstacle, PowerUp,
};
use match3_system_matching::detect;
use match3_system_shuffle::{has_any_legal_move, ShuffleError};
use match3_world::{self as world, query, Board, BoardError, Phase};

const SCENARIO: [&str; 8] = [
    "G Y R B G Y",
    "R B G Y R B",
    "G Y R B G Y",
    "R B G Y R B",
    "G Y R B G Y",
    "B R G Y R B",
    "R Y R B G Y",
    "R B G Y R B",
];

const FOUR_KINDS: [Kind; 4] = [Kind::Red, Kind::Blue, Kind::Green, Kind::Yellow];
const FIVE_KINDS: [Kind; 5] = [
    Kind::Red,
    Kind::Green,
    Kind::Blue,
    Kind::Yellow,
    Kind::Orange,
];

fn level(rows: &[&str], palette: &[Kind]) -> LevelConfig {
    LevelConfig {
        columns: rows[0].split_whitespace().count() as u32,
        rows: rows.len() as u32,
        moves_allowed: 10,
        score_goal: 1_000_000,
        palette: palette.to_vec(),
        layout: Some(rows.iter().map(|row| (*row).to_owned()).collect()),
        ..LevelConfig::default()
    }
}

fn board(rows: &[&str], palette: &[Kind]) -> Board {
    Board::new(level(rows, palette), 7).expect("level is valid")
}

fn swap(first: CellCoord, second: CellCoord) -> Command {
    Command::RequestSwap { first, second }
}

fn cell(column: u32, row: u32) -> CellCoord {
    CellCoord::new(column, row)
}

fn destroyed(events: &[Event]) -> BTreeSet<CellCoord> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::PieceDestroyed { cell, .. } => Some(*cell),
            _ => None,
        })
        .collect()
}

fn run_to_completion(board: &mut Board, events: &mut Vec<Event>) {
    while world::step(board, events).expect("phase resolves").is_some() {}
}

#[test]
fn swap_completing_a_column_clears_exactly_that_run() {
    let mut board = board(&SCENARIO, &FOUR_KINDS);
    let mut events = Vec::new();

    world::submit(&mut board, swap(cell(1, 2), cell(0, 2)), &mut events).expect("swap accepted");
    assert_eq!(
        events,
        vec![
            Event::StateChanged {
                state: BoardState::Resolving
            },
            Event::PiecesSwapped {
                first: cell(1, 2),
                second: cell(0, 2),
            },
        ]
    );
    assert_eq!(query::pending_phase(&board), Some(Phase::Validate));

    events.clear();
    assert_eq!(world::step(&mut board, &mut events).expect("validates"), Some(Phase::Validate));
    assert_eq!(events, vec![Event::MovesChanged { remaining: 9 }]);

    events.clear();
    assert_eq!(world::step(&mut board, &mut events).expect("resolves"), Some(Phase::Resolve));
    assert_eq!(
        destroyed(&events),
        BTreeSet::from([cell(0, 0), cell(0, 1), cell(0, 2)])
    );
    assert!(
        !events
            .iter()
            .any(|event| matches!(event, Event::PowerUpCreated { .. })),
        "a run of three grants nothing: {events:?}"
    );
    assert!(events.contains(&Event::ScoreChanged { total: 60 }));
    assert_eq!(query::pending_phase(&board), Some(Phase::Settle));

    run_to_completion(&mut board, &mut events);
    assert_eq!(query::state(&board), BoardState::Ready);
    assert!(query::grid(&board).is_full());
    assert!(detect(query::grid(&board)).is_empty());
}

#[test]
fn swap_without_a_match_is_reverted_for_free() {
    let mut board = board(&SCENARIO, &FOUR_KINDS);
    let before = query::grid(&board).clone();
    let mut events = Vec::new();

    world::apply(&mut board, swap(cell(4, 7), cell(5, 7)), &mut events).expect("swap handled");

    assert_eq!(
        events,
        vec![
            Event::StateChanged {
                state: BoardState::Resolving
            },
            Event::PiecesSwapped {
                first: cell(4, 7),
                second: cell(5, 7),
            },
            Event::SwapReverted {
                first: cell(4, 7),
                second: cell(5, 7),
            },
            Event::StateChanged {
                state: BoardState::Ready
            },
        ]
    );
    assert_eq!(query::grid(&board), &before);
    assert_eq!(query::moves_remaining(&board), 10);
}

#[test]
fn four_in_a_row_promotes_the_swapped_piece() {
    let mut board = board(&["Y G O R G", "G R B Y R", "B B Y B O"], &FIVE_KINDS);
    let mut events = Vec::new();

    world::submit(&mut board, swap(cell(2, 1), cell(2, 0)), &mut events).expect("swap accepted");
    assert_eq!(world::step(&mut board, &mut events).expect("validates"), Some(Phase::Validate));

    events.clear();
    assert_eq!(world::step(&mut board, &mut events).expect("resolves"), Some(Phase::Resolve));
    assert_eq!(
        destroyed(&events),
        BTreeSet::from([cell(0, 0), cell(1, 0), cell(3, 0)])
    );
    assert!(events.contains(&Event::PowerUpCreated {
        cell: cell(2, 0),
        power_up: PowerUp::RowBlast,
    }));
    let promoted = query::grid(&board).piece(cell(2, 0)).expect("anchor survives");
    assert_eq!(promoted.kind(), Kind::Blue);
    assert_eq!(promoted.power_up(), Some(PowerUp::RowBlast));
}

#[test]
fn color_blast_with_row_blast_clears_the_whole_kind() {
    let rows = ["P G R Y G", "R Y P G R", "G R* P- Y P", "Y G R P Y"];
    let mut board = board(&rows, &[Kind::Red, Kind::Green, Kind::Yellow, Kind::Blue]);
    let mut events = Vec::new();

    world::submit(&mut board, swap(cell(1, 1), cell(2, 1)), &mut events).expect("swap accepted");
    assert_eq!(world::step(&mut board, &mut events).expect("validates"), Some(Phase::Validate));
    assert_eq!(query::moves_remaining(&board), 9);

    events.clear();
    assert_eq!(world::step(&mut board, &mut events).expect("converts"), Some(Phase::Convert));
    let converted = events
        .iter()
        .filter(|event| matches!(event, Event::PowerUpCreated { .. }))
        .count();
    assert_eq!(converted, 5, "the swapped row blast is converted too");

    events.clear();
    assert_eq!(world::step(&mut board, &mut events).expect("detonates"), Some(Phase::Detonate));
    assert!(events.iter().any(|event| matches!(
        event,
        Event::ComboTriggered {
            pairing: ComboPairing::ColorConversion,
            ..
        }
    )));

    run_to_completion(&mut board, &mut events);
    let grid = query::grid(&board);
    assert!(
        grid.coords()
            .all(|coord| grid.piece(coord).map_or(true, |piece| piece.kind() != Kind::Purple)),
        "purple survived: {:?}",
        grid.to_layout()
    );
}

#[test]
fn color_blast_with_area_blast_regrants_existing_line_blasts() {
    let rows = ["P G R Y G", "R Y P G R", "G R* P+ Y P-", "Y G R P Y"];
    let mut board = board(&rows, &[Kind::Red, Kind::Green, Kind::Yellow, Kind::Blue]);
    let mut events = Vec::new();

    world::submit(&mut board, swap(cell(1, 1), cell(2, 1)), &mut events).expect("swap accepted");
    assert_eq!(world::step(&mut board, &mut events).expect("validates"), Some(Phase::Validate));

    events.clear();
    assert_eq!(world::step(&mut board, &mut events).expect("converts"), Some(Phase::Convert));
    let converted: BTreeSet<CellCoord> = events
        .iter()
        .filter_map(|event| match event {
            Event::PowerUpCreated {
                cell,
                power_up: PowerUp::AreaBlast,
            } => Some(*cell),
            _ => None,
        })
        .collect();
    assert_eq!(
        converted,
        BTreeSet::from([cell(0, 3), cell(1, 1), cell(2, 2), cell(3, 0), cell(4, 1)])
    );

    let grid = query::grid(&board);
    for coord in converted {
        let piece = grid.piece(coord).expect("converted piece stays put");
        assert_eq!(piece.kind(), Kind::Purple);
        assert_eq!(piece.power_up(), Some(PowerUp::AreaBlast), "{coord:?}");
    }
    assert_eq!(
        grid.piece(cell(2, 1)).and_then(|piece| piece.power_up()),
        Some(PowerUp::ColorBlast)
    );
}

#[test]
fn double_area_pulses_twice_around_a_gravity_pass() {
    let rows = [
        "R G B Y O",
        "G B G+ O R",
        "B Y B+ R G",
        "Y O R G B",
        "O R Y B G",
    ];
    let mut board = board(&rows, &FIVE_KINDS);
    let mut events = Vec::new();

    world::submit(&mut board, swap(cell(2, 3), cell(2, 2)), &mut events).expect("swap accepted");
    assert_eq!(world::step(&mut board, &mut events).expect("validates"), Some(Phase::Validate));

    events.clear();
    assert_eq!(world::step(&mut board, &mut events).expect("detonates"), Some(Phase::Detonate));
    let first_pulse = destroyed(&events);
    assert_eq!(first_pulse.len(), 8);
    assert!(!first_pulse.contains(&cell(2, 2)), "primary bomb survives the first pulse");
    assert!(first_pulse.contains(&cell(2, 3)), "partner bomb is consumed");

    events.clear();
    assert_eq!(world::step(&mut board, &mut events).expect("settles"), Some(Phase::Settle));
    assert!(events.contains(&Event::PieceFell {
        from: cell(2, 2),
        to: cell(2, 1),
    }));
    assert_eq!(events.last(), Some(&Event::GravityApplied));
    assert_eq!(query::pending_phase(&board), Some(Phase::SecondPulse));

    events.clear();
    assert_eq!(world::step(&mut board, &mut events).expect("pulses"), Some(Phase::SecondPulse));
    assert_eq!(
        events.first(),
        Some(&Event::PowerUpActivated {
            cell: cell(2, 1),
            power_up: PowerUp::AreaBlast,
        })
    );
    let second_pulse = destroyed(&events);
    let expected: BTreeSet<CellCoord> = (1..=3)
        .flat_map(|column| (0..=2).map(move |row| cell(column, row)))
        .collect();
    assert_eq!(second_pulse, expected);

    run_to_completion(&mut board, &mut events);
    assert!(query::grid(&board).is_full());
}

#[test]
fn matches_wear_down_adjacent_obstacles() {
    let mut config = level(&["G Y R O", "Y O G R", "R R G R"], &FIVE_KINDS);
    config.obstacles = vec![Obstacle {
        cell: cell(1, 1),
        durability: 2,
    }];
    let mut board = Board::new(config, 3).expect("level is valid");
    let mut events = Vec::new();

    world::submit(&mut board, swap(cell(3, 0), cell(2, 0)), &mut events).expect("swap accepted");
    assert_eq!(world::step(&mut board, &mut events).expect("validates"), Some(Phase::Validate));

    events.clear();
    assert_eq!(world::step(&mut board, &mut events).expect("resolves"), Some(Phase::Resolve));
    assert_eq!(
        destroyed(&events),
        BTreeSet::from([cell(0, 0), cell(1, 0), cell(2, 0)])
    );
    assert!(events.contains(&Event::ObstacleDamaged {
        cell: cell(1, 1),
        remaining: 1,
    }));
    assert_eq!(
        query::grid(&board).get(cell(1, 1)).map(Cell::durability),
        Some(1)
    );
}

#[test]
fn invalid_swaps_are_ignored_silently() {
    let mut config = level(&SCENARIO, &FOUR_KINDS);
    config.stones = vec![cell(3, 3)];
    let mut board = Board::new(config, 1).expect("level is valid");
    let before = query::grid(&board).clone();

    let requests = [
        swap(cell(0, 0), cell(2, 0)),
        swap(cell(0, 0), cell(1, 1)),
        swap(cell(5, 7), cell(6, 7)),
        swap(cell(3, 3), cell(3, 2)),
        swap(cell(2, 2), cell(2, 2)),
    ];
    for request in requests {
        let mut events = Vec::new();
        world::apply(&mut board, request.clone(), &mut events).expect("request handled");
        assert!(events.is_empty(), "{request:?} produced {events:?}");
    }
    assert_eq!(query::grid(&board), &before);
    assert_eq!(query::moves_remaining(&board), 10);
    assert_eq!(query::state(&board), BoardState::Ready);
}

#[test]
fn reaching_the_goal_wins_and_freezes_the_board() {
    let mut config = level(&SCENARIO, &FOUR_KINDS);
    config.score_goal = 60;
    let mut board = Board::new(config, 2).expect("level is valid");
    let mut events = Vec::new();

    world::apply(&mut board, swap(cell(1, 2), cell(0, 2)), &mut events).expect("move resolves");
    assert_eq!(query::state(&board), BoardState::Won);
    assert_eq!(
        events.last(),
        Some(&Event::StateChanged {
            state: BoardState::Won
        })
    );
    assert_eq!(query::stars(&board), 3);

    let hint = query::hint(&board).expect("board stays playable");
    events.clear();
    world::apply(&mut board, swap(hint.0, hint.1), &mut events).expect("request handled");
    assert!(events.is_empty());
}

#[test]
fn spending_the_last_move_below_the_goal_loses() {
    let mut config = level(&SCENARIO, &FOUR_KINDS);
    config.moves_allowed = 1;
    let mut board = Board::new(config, 2).expect("level is valid");
    let mut events = Vec::new();

    world::apply(&mut board, swap(cell(1, 2), cell(0, 2)), &mut events).expect("move resolves");
    assert_eq!(query::moves_remaining(&board), 0);
    assert_eq!(query::state(&board), BoardState::Lost);
}

#[test]
fn score_matches_the_destroyed_pieces() {
    let mut board = board(&SCENARIO, &FOUR_KINDS);
    let mut events = Vec::new();

    world::apply(&mut board, swap(cell(1, 2), cell(0, 2)), &mut events).expect("move resolves");
    let awarded: u64 = events
        .iter()
        .filter_map(|event| match event {
            Event::PieceDestroyed { score_delta, .. } => Some(u64::from(*score_delta)),
            _ => None,
        })
        .sum();
    assert!(awarded >= 60);
    assert_eq!(query::score(&board), awarded);
    assert_eq!(
        events.iter().rev().find_map(|event| match event {
            Event::ScoreChanged { total } => Some(*total),
            _ => None,
        }),
        Some(awarded)
    );
}

#[test]
fn commands_during_a_pending_move_leave_its_phases_alone() {
    let mut board = board(&SCENARIO, &FOUR_KINDS);
    let mut events = Vec::new();
    world::submit(&mut board, swap(cell(1, 2), cell(0, 2)), &mut events).expect("swap accepted");

    let commands = [
        swap(cell(4, 7), cell(5, 7)),
        Command::Pause,
        Command::Tick {
            dt: Duration::from_millis(500),
        },
    ];
    for command in commands {
        let mut late = Vec::new();
        world::apply(&mut board, command.clone(), &mut late).expect("command handled");
        assert!(late.is_empty(), "{command:?} produced {late:?}");
    }
    assert_eq!(query::pending_phase(&board), Some(Phase::Validate));
    assert_eq!(query::state(&board), BoardState::Resolving);
    assert_eq!(query::moves_remaining(&board), 10);
    assert_eq!(query::elapsed(&board), Duration::from_millis(500));

    run_to_completion(&mut board, &mut events);
    assert_eq!(query::moves_remaining(&board), 9);
    assert_eq!(query::state(&board), BoardState::Ready);
}

#[test]
fn deadlock_left_by_a_cascade_is_shuffled_before_the_next_move() {
    // The top pocket can never hold a move once refilled, and the lower row
    // has three reds that no single swap lines up.
    let rows = ["R O R # #", "# R # # #", "# # # # #", "R G G R R", "# # # # #"];
    let mut board = board(&rows, &[Kind::Red, Kind::Green]);
    let stones: Vec<CellCoord> = stone_cells(&board);
    let mut events = Vec::new();

    world::apply(&mut board, swap(cell(1, 3), cell(1, 4)), &mut events).expect("move resolves");

    assert_eq!(
        destroyed(&events),
        BTreeSet::from([cell(0, 4), cell(1, 4), cell(2, 4)])
    );
    let settled = events
        .iter()
        .rposition(|event| *event == Event::CascadeSettled)
        .expect("cascade settles");
    assert!(
        matches!(events.get(settled + 1), Some(Event::Shuffled { attempts }) if *attempts >= 1),
        "{events:?}"
    );
    assert_eq!(query::state(&board), BoardState::Ready);
    assert_eq!(query::moves_remaining(&board), 9);

    let grid = query::grid(&board);
    assert!(has_any_legal_move(grid), "{:?}", grid.to_layout());
    assert!(detect(grid).is_empty());
    assert_eq!(stone_cells(&board), stones);
}

#[test]
fn unrecoverable_deadlock_fails_the_move() {
    let mut config = level(&["R O R", "# R #"], &[Kind::Red, Kind::Green]);
    config.tuning.shuffle_attempts = 5;
    let mut board = Board::new(config, 7).expect("level is valid");
    let mut events = Vec::new();

    let error = world::apply(&mut board, swap(cell(1, 0), cell(1, 1)), &mut events)
        .expect_err("no arrangement of three cells and one orange offers a move");
    assert!(matches!(
        error,
        BoardError::Shuffle(ShuffleError::Exhausted { attempts: 5 })
    ));
    assert_eq!(events.last(), Some(&Event::CascadeSettled));
}

fn stone_cells(board: &Board) -> Vec<CellCoord> {
    let grid = query::grid(board);
    grid.coords()
        .filter(|coord| {
            grid.get(*coord)
                .is_some_and(|slot| matches!(slot.content(), Content::Stone))
        })
        .collect()
}
