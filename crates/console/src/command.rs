//! Line command parsing for the console driver.

use cardform_core::{CoreError, FieldKind};

/// One line typed at the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Replace a field's raw text. Everything after the field name is kept
    /// verbatim, spaces included.
    Input { field: FieldKind, text: String },
    Blur(FieldKind),
    Submit,
    Status,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0} (type `help`)")]
    Unknown(String),

    #[error("Usage: blur <card|expiry|cvc>")]
    MissingField,

    #[error(transparent)]
    Field(#[from] CoreError),
}

pub const HELP: &str = "\
Commands:
  card <text>                  type into the card number field
  expiry <text>                type into the expiry field (MM-YY)
  cvc <text>                   type into the CVC field
  blur <card|expiry|cvc>       leave a field
  submit                       submit the form
  status                       print the current snapshot
  help                         show this text
  quit                         stop the engine and exit";

pub fn parse(line: &str) -> Result<Command, CommandError> {
    let line = line.trim_start();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest),
        None => (line.trim_end(), ""),
    };

    match word.to_ascii_lowercase().as_str() {
        "" => Err(CommandError::Empty),
        "card" | "expiry" | "cvc" => Ok(Command::Input {
            field: word.parse()?,
            text: rest.trim_end_matches(['\r', '\n']).to_string(),
        }),
        "blur" => {
            let field = rest.trim();
            if field.is_empty() {
                return Err(CommandError::MissingField);
            }
            Ok(Command::Blur(field.parse()?))
        }
        "submit" => Ok(Command::Submit),
        "status" => Ok(Command::Status),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}
