//! Commands accepted by the terminal front-end

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Start,
    Stop,
    /// Set the cast duration in seconds.
    Cast(f64),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ParseCommandError(String);

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(word) = parts.next() else {
            return Err(ParseCommandError("empty command".to_string()));
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "stop" => Command::Stop,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "cast" => {
                let value = parts
                    .next()
                    .ok_or_else(|| ParseCommandError("usage: cast <seconds>".to_string()))?;
                let secs = value
                    .parse::<f64>()
                    .map_err(|_| ParseCommandError(format!("not a number: {}", value)))?;
                Command::Cast(secs)
            }
            other => return Err(ParseCommandError(format!("unknown command: {}", other))),
        };

        if parts.next().is_some() {
            return Err(ParseCommandError(format!("too many arguments for {}", word)));
        }
        Ok(command)
    }
}

pub const HELP: &str = "\
Commands:
  start           begin fishing
  stop            stop and release the button
  cast <seconds>  set cast charge time (0.0 - 1.7)
  status          print the current status as JSON
  quit            stop and exit";
