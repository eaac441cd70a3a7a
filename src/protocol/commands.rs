//! Module `commands`
//!
//! Defines the chat command grammar: the closed set of verbs, the typed
//! `Command` they produce, and the parser that turns a raw message into one.

use std::panic;

use crate::error::ParseError;
use crate::error::handlers::panic_message;
use crate::protocol::validation::VirtualPath;

/// A validated chat command.
///
/// Each variant carries exactly the paths its verb needs, so a `Command`
/// never exists in a half-populated state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List(VirtualPath),   // Folder to list, `/` for the root
    Delete(VirtualPath), // File to delete
    Move {
        source: VirtualPath,
        destination: VirtualPath,
    },
    Copy {
        source: VirtualPath,
        destination: VirtualPath,
    },
    FolderSummary(VirtualPath),
    FileSummary(VirtualPath),
    Help,
}

/// The verb of a command, independent of its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    List,
    Delete,
    Move,
    Copy,
    FolderSummary,
    FileSummary,
    Help,
}

impl Verb {
    /// Maps an upper-cased verb token to a verb.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "LIST" => Some(Verb::List),
            "DELETE" => Some(Verb::Delete),
            "MOVE" => Some(Verb::Move),
            "COPY" => Some(Verb::Copy),
            "FOLDERSUMMARY" => Some(Verb::FolderSummary),
            "FILESUMMARY" => Some(Verb::FileSummary),
            "HELP" | "H" | "?" => Some(Verb::Help),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::List => "LIST",
            Verb::Delete => "DELETE",
            Verb::Move => "MOVE",
            Verb::Copy => "COPY",
            Verb::FolderSummary => "FOLDERSUMMARY",
            Verb::FileSummary => "FILESUMMARY",
            Verb::Help => "HELP",
        }
    }

    /// Human description of the arguments, used in arity errors.
    fn requirement(&self) -> &'static str {
        match self {
            Verb::List | Verb::FolderSummary => "a folder path",
            Verb::Delete | Verb::FileSummary => "a file path",
            Verb::Move | Verb::Copy => "source and destination paths",
            Verb::Help => "no arguments",
        }
    }
}

impl Command {
    pub fn verb(&self) -> Verb {
        match self {
            Command::List(_) => Verb::List,
            Command::Delete(_) => Verb::Delete,
            Command::Move { .. } => Verb::Move,
            Command::Copy { .. } => Verb::Copy,
            Command::FolderSummary(_) => Verb::FolderSummary,
            Command::FileSummary(_) => Verb::FileSummary,
            Command::Help => Verb::Help,
        }
    }

    /// Every verb except HELP needs a connected Drive account.
    pub fn requires_session(&self) -> bool {
        !matches!(self, Command::Help)
    }
}

/// Parses a raw chat message into a `Command`.
///
/// Only the verb is case-insensitive; paths keep the sender's casing since
/// Drive names are case-sensitive. Parsing never panics past this call: an
/// internal failure comes back as `ParseError::Internal`.
pub fn parse_command(message: &str) -> Result<Command, ParseError> {
    match panic::catch_unwind(|| parse_message(message)) {
        Ok(result) => result,
        Err(payload) => Err(ParseError::Internal(panic_message(payload.as_ref()))),
    }
}

fn parse_message(message: &str) -> Result<Command, ParseError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut tokens = trimmed.split_whitespace();
    let verb_token = tokens.next().unwrap_or_default().to_ascii_uppercase();
    let args: Vec<&str> = tokens.collect();

    let verb = Verb::from_token(&verb_token).ok_or(ParseError::UnknownCommand(verb_token))?;

    match verb {
        Verb::Help => {
            expect_args::<0>(verb, &args)?;
            Ok(Command::Help)
        }
        Verb::List => {
            let [folder] = expect_args::<1>(verb, &args)?;
            Ok(Command::List(path_arg(folder, "folder")?))
        }
        Verb::Delete => {
            let [file] = expect_args::<1>(verb, &args)?;
            Ok(Command::Delete(path_arg(file, "file")?))
        }
        Verb::Move => {
            let [source, destination] = expect_args::<2>(verb, &args)?;
            Ok(Command::Move {
                source: path_arg(source, "source")?,
                destination: path_arg(destination, "destination")?,
            })
        }
        Verb::Copy => {
            let [source, destination] = expect_args::<2>(verb, &args)?;
            Ok(Command::Copy {
                source: path_arg(source, "source")?,
                destination: path_arg(destination, "destination")?,
            })
        }
        Verb::FolderSummary => {
            let [folder] = expect_args::<1>(verb, &args)?;
            Ok(Command::FolderSummary(path_arg(folder, "folder")?))
        }
        Verb::FileSummary => {
            let [file] = expect_args::<1>(verb, &args)?;
            Ok(Command::FileSummary(path_arg(file, "file")?))
        }
    }
}

/// Checks that exactly `N` arguments follow the verb.
fn expect_args<'a, const N: usize>(verb: Verb, args: &[&'a str]) -> Result<[&'a str; N], ParseError> {
    <[&'a str; N]>::try_from(args).map_err(|_| ParseError::Arity {
        verb: verb.as_str(),
        requirement: verb.requirement(),
    })
}

fn path_arg(raw: &str, role: &'static str) -> Result<VirtualPath, ParseError> {
    VirtualPath::parse(raw).ok_or_else(|| ParseError::InvalidPath {
        role,
        path: raw.to_string(),
    })
}
