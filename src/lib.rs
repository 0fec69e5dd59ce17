//! A tiny interactive POSIX-style shell.
//!
//! A line typed at the prompt goes through the [`lexer`] (quoting and escapes),
//! then the [`parser`] (redirection operators), and is finally routed by the
//! [`Interpreter`] either to one of the built-in commands or to an external
//! program found on `PATH`. The [`completion`] module drives tab completion of
//! command names while the line is still being edited.
//!
//! All process-wide state the shell cares about (working directory, environment
//! snapshot, last exit status) lives in an explicit [`Session`], so the whole
//! pipeline can be exercised without touching the real process environment.

mod builtin;
pub mod command;
pub mod completion;
pub mod error;
mod external;
mod interpreter;
pub mod io_adapters;
pub mod lexer;
pub mod logging;
pub mod parser;
pub mod resolver;
pub mod session;

pub use builtin::BUILTIN_NAMES;
pub use interpreter::{Flow, Interpreter};
pub use io_adapters::Console;
pub use session::Session;
