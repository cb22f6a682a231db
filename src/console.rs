//! Interactive keyboard input: `r` reloads the preview, `q` quits.

use std::io::BufRead;

use crate::command::{Command, CommandSender};

pub const PROMPT: &str = "Press 'r' to reload. 'q' to quit.";

/// Map one line of input to a command. Unknown input is ignored.
pub fn parse_line(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "r" | "reload" => Some(Command::Reload),
        "q" | "quit" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

/// Read commands from `input` until `quit`, end of input, or queue closure.
/// End of input counts as `quit`.
pub fn run(input: impl BufRead, commands: CommandSender) {
    println!("{PROMPT}");
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!("failed to read console input: {err}");
                break;
            }
        };
        let Some(command) = parse_line(&line) else {
            continue;
        };
        if commands.send(command).is_err() || command == Command::Quit {
            return;
        }
    }
    let _ = commands.send(Command::Quit);
}
