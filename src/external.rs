use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::error::{ExecutionError, ShellError};
use crate::interpreter::Factory;
use crate::io_adapters::{OutputStreams, Sink};
use crate::resolver::find_command_path;
use crate::session::Session;
use std::ffi::OsStr;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

/// Command that is not a builtin.
pub struct ExternalCommand {
    /// The word the user typed, used in error messages.
    name: String,
    /// Resolved executable.
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalCommand {
    pub fn new(name: String, program: PathBuf, args: Vec<String>) -> Self {
        Self { name, program, args }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(&self, session: &Session, argv: &[String]) -> Option<Box<dyn ExecutableCommand>> {
        let (name, args) = argv.split_first()?;
        let search_paths = OsStr::new(session.search_paths());
        let program = find_command_path(search_paths, name, &session.current_dir);
        tracing::debug!(command = %name, resolved = ?program, "resolved external command");
        Some(Box::new(ExternalCommand::new(name.clone(), program?, args.to_vec())))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(
        self: Box<Self>,
        streams: &mut OutputStreams<'_>,
        session: &mut Session,
    ) -> Result<ExitCode, ShellError> {
        let mut cmd = Command::new(&self.program);
        set_arg0(&mut cmd, &self);
        cmd.args(&self.args)
            .env_clear()
            .envs(&session.vars)
            .current_dir(&session.current_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = cmd.output().map_err(|source| ExecutionError::Spawn {
            command: self.name.clone(),
            source,
        })?;
        tracing::debug!(program = %self.program.display(), status = ?output.status, "child exited");

        write_stdout(&mut streams.stdout, &output.stdout)?;
        streams.stderr.write_all(&output.stderr)?;

        Ok(match output.status.code() {
            Some(x) => x,
            None => terminated_by_signal(output.status),
        })
    }
}

/// The child sees the bare executable name as `argv[0]`, not the full path.
#[cfg(unix)]
fn set_arg0(cmd: &mut Command, external: &ExternalCommand) {
    use std::os::unix::process::CommandExt;
    if let Some(base) = external.program.file_name() {
        cmd.arg0(base);
    }
}

#[cfg(not(unix))]
fn set_arg0(_cmd: &mut Command, _external: &ExternalCommand) {}

/// Console output loses one trailing newline and gets exactly one back;
/// files receive the captured bytes untouched.
fn write_stdout(sink: &mut Sink<'_>, bytes: &[u8]) -> std::io::Result<()> {
    if !sink.is_console() {
        return sink.write_all(bytes);
    }
    if bytes.is_empty() {
        return Ok(());
    }
    let trimmed = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    sink.write_all(trimmed)?;
    sink.write_all(b"\n")
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}
