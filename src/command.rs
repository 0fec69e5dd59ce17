use crate::error::ShellError;
use crate::io_adapters::OutputStreams;
use crate::session::Session;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Object-safe trait for any command that can be executed by the shell.
///
/// This is implemented by built-ins via a blanket impl and by external commands.
pub trait ExecutableCommand {
    /// Executes the command, writing to the already opened output streams.
    ///
    /// Errors are returned rather than printed; the interpreter routes them to
    /// the command's stderr target.
    fn execute(
        self: Box<Self>,
        streams: &mut OutputStreams<'_>,
        session: &mut Session,
    ) -> Result<ExitCode, ShellError>;
}

/// Factory that tries to create a command from its argument vector.
///
/// Returns `None` when the factory doesn't recognize `argv[0]`.
/// Implementations can use the session to resolve executables (e.g., using PATH).
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided arguments.
    fn try_create(&self, session: &Session, argv: &[String]) -> Option<Box<dyn ExecutableCommand>>;
}
