//! Error kinds produced while interpreting a command line.
//!
//! None of these are fatal: the interpreter reports them and goes back to the
//! prompt. Only the `exit` builtin ends a session.

use crate::command::ExitCode;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Which quote character was left open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    Single,
    Double,
}

impl fmt::Display for QuoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteKind::Single => f.write_str("single"),
            QuoteKind::Double => f.write_str("double"),
        }
    }
}

/// The line is malformed and is rejected as a whole.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("syntax error: unterminated {quote} quote")]
    UnterminatedQuote { quote: QuoteKind },

    #[error("syntax error: unexpected end of line after '\\'")]
    TrailingEscape,

    #[error("syntax error: no file specified for redirection after '{operator}'")]
    MissingRedirectTarget { operator: String },
}

/// Failure of a built-in command. The message is the literal text the user sees.
#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("{command}: missing argument")]
    MissingArgument { command: &'static str },

    #[error("cd: HOME environment variable not set")]
    HomeNotSet,

    #[error("cd: {path}: No such file or directory")]
    NoSuchDirectory { path: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failure to start a command or to prepare its output streams.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("{command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Redirect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Not fatal: the stream falls back to the console and the command still runs.
    #[error("{}: cannot create directory {}: {source}", .command, .dir.display())]
    RedirectDirectory {
        command: String,
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Anything that can go wrong while handling a single line.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Builtin(#[from] BuiltinError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("{line}: command not found")]
    CommandNotFound { line: String },

    #[error("write error: {0}")]
    Io(#[from] io::Error),
}

impl ShellError {
    /// Exit status recorded for a line that failed with this error.
    pub fn status(&self) -> ExitCode {
        match self {
            ShellError::Parse(_) => 2,
            ShellError::Builtin(_) => 1,
            ShellError::Execution(ExecutionError::Spawn { .. }) => 126,
            ShellError::Execution(ExecutionError::Redirect { .. })
            | ShellError::Execution(ExecutionError::RedirectDirectory { .. }) => 1,
            ShellError::CommandNotFound { .. } => 127,
            ShellError::Io(_) => 1,
        }
    }
}
