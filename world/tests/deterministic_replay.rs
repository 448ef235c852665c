use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use match3_core::{BoardState, Command, Event, LevelConfig};
use match3_world::{self as world, query, Board};

const SEED: u64 = 0x5eed_cafe;

#[test]
fn deterministic_replay_produces_identical_sessions() {
    let first = replay();
    let second = replay();

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(
        first.fingerprint(),
        second.fingerprint(),
        "fingerprint mismatch"
    );
    assert!(first.moves_played > 0, "script never played a move");
}

#[test]
fn different_seeds_produce_different_boards() {
    let first = Board::new(LevelConfig::default(), 1).expect("default level is valid");
    let second = Board::new(LevelConfig::default(), 2).expect("default level is valid");
    assert_ne!(query::grid(&first), query::grid(&second));
}

fn replay() -> ReplayOutcome {
    let mut board = Board::new(LevelConfig::default(), SEED).expect("default level is valid");
    let mut events = Vec::new();
    let mut moves_played = 0;

    for round in 0..8 {
        let mut round_events = Vec::new();
        world::apply(
            &mut board,
            Command::Tick {
                dt: Duration::from_millis(1_500),
            },
            &mut round_events,
        )
        .expect("tick applies");
        if round % 3 == 2 {
            world::apply(&mut board, Command::Pause, &mut round_events).expect("pause applies");
            world::apply(&mut board, Command::Resume, &mut round_events).expect("resume applies");
        }
        if query::state(&board) != BoardState::Ready {
            events.extend(round_events);
            break;
        }
        if let Some((first, second)) = query::hint(&board) {
            world::apply(
                &mut board,
                Command::RequestSwap { first, second },
                &mut round_events,
            )
            .expect("move resolves");
            moves_played += 1;
        }
        events.extend(round_events);
    }

    ReplayOutcome {
        layout: query::grid(&board).to_layout(),
        score: query::score(&board),
        moves_remaining: query::moves_remaining(&board),
        elapsed_millis: query::elapsed(&board).as_millis(),
        moves_played,
        events,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    layout: Vec<String>,
    score: u64,
    moves_remaining: u32,
    elapsed_millis: u128,
    moves_played: u32,
    events: Vec<Event>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}
