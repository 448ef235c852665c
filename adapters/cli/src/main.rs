#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives a seeded match-3 board.

mod level_file;
mod snapshot_transfer;

use std::{
    io::{self, BufRead},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use match3_core::{BoardState, CellCoord, Command, Event, LevelConfig};
use match3_world::{self as world, query, Board};
use snapshot_transfer::BoardSnapshot;

/// Seeded match-3 board simulation.
#[derive(Debug, Parser)]
#[command(name = "match3", version)]
struct Cli {
    /// Level description in TOML. The built-in level is used when omitted.
    #[arg(long, value_name = "FILE")]
    level: Option<PathBuf>,
    /// Seed for the board's random source. Drawn from entropy when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// Start from an exported board snapshot instead of the level layout.
    #[arg(long, value_name = "SNAPSHOT")]
    snapshot: Option<String>,
    /// Print every event emitted by the board.
    #[arg(long, short)]
    verbose: bool,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Print the starting board and its snapshot string.
    Show,
    /// Play the hinted move until the level ends.
    Autoplay {
        /// Stop after this many moves.
        #[arg(long)]
        max_moves: Option<u32>,
    },
    /// Read moves from standard input, one `column row column row` per line.
    Play,
}

/// Entry point for the match-3 command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.level {
        Some(path) => level_file::load(path)?,
        None => LevelConfig::default(),
    };
    if let Some(encoded) = &cli.snapshot {
        BoardSnapshot::decode(encoded)
            .context("could not import board snapshot")?
            .apply_to(&mut config);
    }

    let seed = cli.seed.unwrap_or_else(rand::random);
    let mut board = Board::new(config, seed).context("could not create board")?;
    println!("seed {seed}");

    match cli.mode {
        Mode::Show => {
            print_board(&board);
            let snapshot = BoardSnapshot::capture(&board)
                .encode()
                .context("could not export board snapshot")?;
            println!("{snapshot}");
        }
        Mode::Autoplay { max_moves } => autoplay(&mut board, max_moves, cli.verbose)?,
        Mode::Play => play(&mut board, cli.verbose)?,
    }

    print_summary(&board);
    Ok(())
}

fn autoplay(board: &mut Board, max_moves: Option<u32>, verbose: bool) -> Result<()> {
    let mut played = 0;
    while query::state(board) == BoardState::Ready {
        if max_moves.is_some_and(|limit| played >= limit) {
            break;
        }
        let Some((first, second)) = query::hint(board) else {
            break;
        };
        played += 1;
        println!("move {played}: {} <-> {}", coord(first), coord(second));
        run(board, Command::RequestSwap { first, second }, verbose)?;
    }
    print_board(board);
    Ok(())
}

fn play(board: &mut Board, verbose: bool) -> Result<()> {
    print_board(board);
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("could not read from standard input")?;
        let line = line.trim();
        match line {
            "" => continue,
            "quit" => break,
            "hint" => {
                match query::hint(board) {
                    Some((first, second)) => println!("try {} <-> {}", coord(first), coord(second)),
                    None => println!("no move available"),
                }
                continue;
            }
            "pause" => run(board, Command::Pause, verbose)?,
            "resume" => run(board, Command::Resume, verbose)?,
            _ => {
                let Some((first, second)) = parse_move(line) else {
                    eprintln!("expected `column row column row`, got `{line}`");
                    continue;
                };
                let moves_before = query::moves_remaining(board);
                run(board, Command::RequestSwap { first, second }, verbose)?;
                if query::moves_remaining(board) == moves_before {
                    println!("swap rejected");
                }
                print_board(board);
            }
        }
        if query::state(board).is_finished() {
            break;
        }
    }
    Ok(())
}

fn parse_move(line: &str) -> Option<(CellCoord, CellCoord)> {
    let numbers = line
        .split_whitespace()
        .map(str::parse::<u32>)
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    match numbers.as_slice() {
        [c1, r1, c2, r2] => Some((CellCoord::new(*c1, *r1), CellCoord::new(*c2, *r2))),
        _ => None,
    }
}

fn run(board: &mut Board, command: Command, verbose: bool) -> Result<()> {
    let mut events = Vec::new();
    world::apply(board, command, &mut events).context("board failed to resolve the command")?;
    if verbose {
        for event in &events {
            println!("  {}", describe(event));
        }
    }
    Ok(())
}

fn print_board(board: &Board) {
    let grid = query::grid(board);
    for (line, row) in grid.to_layout().into_iter().enumerate() {
        let index = grid.rows() as usize - 1 - line;
        println!("{index:>3} | {row}");
    }
    let obstacles: Vec<String> = grid
        .coords()
        .filter_map(|cell| {
            let durability = grid.get(cell)?.durability();
            (durability > 0).then(|| format!("{}x{durability}", coord(cell)))
        })
        .collect();
    if !obstacles.is_empty() {
        println!("obstacles: {}", obstacles.join(" "));
    }
}

fn print_summary(board: &Board) {
    println!(
        "state {:?}, score {}/{}, stars {}, moves left {}, elapsed {:.1}s",
        query::state(board),
        query::score(board),
        query::config(board).score_goal,
        query::stars(board),
        query::moves_remaining(board),
        query::elapsed(board).as_secs_f32(),
    );
}

fn coord(cell: CellCoord) -> String {
    format!("({},{})", cell.column(), cell.row())
}

fn describe(event: &Event) -> String {
    match event {
        Event::PieceSpawned { cell, kind } => format!("spawned {kind:?} at {}", coord(*cell)),
        Event::PiecesSwapped { first, second } => {
            format!("swapped {} and {}", coord(*first), coord(*second))
        }
        Event::SwapReverted { first, second } => {
            format!("reverted {} and {}", coord(*first), coord(*second))
        }
        Event::PieceDestroyed { cell, score_delta } => {
            format!("destroyed {} (+{score_delta})", coord(*cell))
        }
        Event::PowerUpActivated { cell, power_up } => {
            format!("{power_up:?} went off at {}", coord(*cell))
        }
        Event::PowerUpCreated { cell, power_up } => {
            format!("{power_up:?} created at {}", coord(*cell))
        }
        Event::ComboTriggered { pairing, affected } => {
            format!("{pairing:?} combo hit {} cells", affected.len())
        }
        Event::ObstacleDamaged { cell, remaining } => {
            format!("obstacle at {} has {remaining} left", coord(*cell))
        }
        Event::PieceFell { from, to } => format!("fell {} -> {}", coord(*from), coord(*to)),
        Event::GravityApplied => "gravity applied".to_owned(),
        Event::CascadeSettled => "cascade settled".to_owned(),
        Event::Shuffled { attempts } => format!("shuffled after {attempts} attempts"),
        Event::StateChanged { state } => format!("state {state:?}"),
        Event::ScoreChanged { total } => format!("score {total}"),
        Event::MovesChanged { remaining } => format!("{remaining} moves left"),
        Event::HintRevealed { first, second } => {
            format!("hint {} <-> {}", coord(*first), coord(*second))
        }
    }
}
