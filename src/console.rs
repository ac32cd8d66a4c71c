//! Line-oriented text front end.
//!
//! The loop owns nothing but a `&mut Engine`: it prints a snapshot, reads one line,
//! and either forwards a direction to the engine or handles the command locally.
//! Input that is not a command never reaches the engine.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use rand::Rng;

use crate::engine::{Engine, Move, MoveResult, Snapshot};
use crate::error::EngineError;

const CELL_WIDTH: usize = 7;
const PROMPT: &str = "Move (u/d/l/r), save, load, new or q: ";

/// One line of player input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Move),
    Save,
    Load,
    NewGame,
    Quit,
}

impl FromStr for Command {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "save" => Ok(Command::Save),
            "load" => Ok(Command::Load),
            "new" => Ok(Command::NewGame),
            "q" | "quit" | "exit" => Ok(Command::Quit),
            _ => s.parse().map(Command::Move),
        }
    }
}

/// Render a snapshot as a grid of centred values, blank for empty cells.
pub fn render(snapshot: &Snapshot) -> String {
    let separator = "-".repeat(CELL_WIDTH * 4 + 3);
    snapshot
        .iter()
        .map(|row| row.iter().map(|&v| format_val(v)).collect::<Vec<_>>().join("|"))
        .collect::<Vec<_>>()
        .join(&format!("\n{separator}\n"))
}

fn format_val(val: u32) -> String {
    match val {
        0 => " ".repeat(CELL_WIDTH),
        x => format!("{x:^CELL_WIDTH$}"),
    }
}

/// Start a game on `engine` and play it from `input` until the player quits or input ends.
///
/// After a win or a loss the player is asked whether to play again. Save and load
/// failures are reported and play goes on.
pub fn run<R, I, O>(engine: &mut Engine<R>, input: I, mut out: O) -> io::Result<()>
where
    R: Rng,
    I: BufRead,
    O: Write,
{
    engine.start();
    let mut lines = input.lines();
    loop {
        write_board(&mut out, engine)?;
        write!(out, "{PROMPT}")?;
        out.flush()?;

        let Some(line) = lines.next() else { return Ok(()) };
        let line = line?;
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(_) => {
                writeln!(out, "Unrecognized input {:?}. Enter u/d/l/r, save, load, new or q.", line.trim())?;
                continue;
            }
        };

        match command {
            Command::Quit => {
                writeln!(out, "Thanks for playing!")?;
                return Ok(());
            }
            Command::NewGame => engine.start(),
            Command::Save => match engine.save() {
                Ok(()) => writeln!(out, "Game saved.")?,
                Err(e) => writeln!(out, "Save failed: {e}")?,
            },
            Command::Load => match engine.load() {
                Ok(()) => writeln!(out, "Game loaded.")?,
                Err(e) => writeln!(out, "Load failed: {e}")?,
            },
            Command::Move(dir) => {
                let banner = match engine.process_move(dir) {
                    MoveResult::Continue => continue,
                    MoveResult::Win => "You win!",
                    MoveResult::Lose => "Game over!",
                };
                write_board(&mut out, engine)?;
                writeln!(out, "{banner}")?;
                writeln!(out, "Final score: {}", engine.score())?;
                if !ask_play_again(&mut lines, &mut out)? {
                    return Ok(());
                }
                engine.start();
            }
        }
    }
}

fn write_board<R: Rng, O: Write>(out: &mut O, engine: &mut Engine<R>) -> io::Result<()> {
    let score = engine.score();
    writeln!(out, "{}", render(&engine.board_snapshot()))?;
    writeln!(out, "Score: {score} | Best: {}", engine.high_score())
}

fn ask_play_again<L, O>(lines: &mut L, out: &mut O) -> io::Result<bool>
where
    L: Iterator<Item = io::Result<String>>,
    O: Write,
{
    loop {
        writeln!(out, "Play again? (y/n)")?;
        out.flush()?;
        let Some(line) = lines.next() else { return Ok(false) };
        match line?.trim().chars().next() {
            Some(c) => return Ok(c.eq_ignore_ascii_case(&'y')),
            None => writeln!(out, "Please answer 'y' or 'n'.")?,
        }
    }
}
