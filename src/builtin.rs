use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::error::{BuiltinError, ShellError};
use crate::interpreter::Factory;
use crate::io_adapters::OutputStreams;
use crate::resolver::find_command_path;
use crate::session::Session;
use argh::{EarlyExit, FromArgs};
use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Names of all built-in commands, sorted.
pub const BUILTIN_NAMES: [&str; 5] = ["cd", "echo", "exit", "pwd", "type"];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Built-in commands known to the shell at compile time.
///
/// Builtins are executed directly in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// Builds the command from the arguments following its name.
    fn parse(args: &[&str]) -> Result<Self, EarlyExit>;

    /// Executes the command writing regular output to `stdout`.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode, BuiltinError>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        streams: &mut OutputStreams<'_>,
        session: &mut Session,
    ) -> Result<ExitCode, ShellError> {
        Ok(<T as BuiltinCommand>::execute(*self, &mut streams.stdout, session)?)
    }
}

/// Usage text or argument error produced by `argh`.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        streams: &mut OutputStreams<'_>,
        _session: &mut Session,
    ) -> Result<ExitCode, ShellError> {
        if self.is_error {
            writeln!(streams.stderr, "{}", self.output.trim_end())?;
            Ok(1)
        } else {
            writeln!(streams.stdout, "{}", self.output.trim_end())?;
            Ok(0)
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, _session: &Session, argv: &[String]) -> Option<Box<dyn ExecutableCommand>> {
        let (name, args) = argv.split_first()?;
        if name != T::name() {
            return None;
        }
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        Some(match T::parse(&args) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        })
    }
}

/// Leave the shell. Arguments are taken verbatim so that `exit abc` is not a usage error.
pub struct Exit {
    pub code: Option<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Exit {
            code: args.first().map(|s| s.to_string()),
        })
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode, BuiltinError> {
        let code = match self.code {
            None => 0,
            Some(code) => code.parse().unwrap_or(1),
        };
        session.should_exit = Some(code);
        Ok(code)
    }
}

/// Write the arguments to standard output, separated by spaces.
///
/// Arguments are printed as-is; only a leading `-n` is recognized and
/// suppresses the trailing newline.
pub struct Echo {
    pub no_newline: bool,
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        let (no_newline, rest) = match args.split_first() {
            Some((&"-n", rest)) => (true, rest),
            _ => (false, args),
        };
        Ok(Echo {
            no_newline,
            args: rest.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn execute(self, stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode, BuiltinError> {
        let s = self.args.join(" ");
        if self.no_newline {
            write!(stdout, "{}", s)?;
        } else {
            writeln!(stdout, "{}", s)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        Self::from_args(&[Self::name()], args)
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode, BuiltinError> {
        writeln!(stdout, "{}", session.current_dir.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute, relative to the current directory, or starting with `~`.
    pub target: Option<String>,
}

impl Cd {
    fn expand_tilde(target: &str, session: &Session) -> Result<PathBuf, BuiltinError> {
        let rest = match target.strip_prefix('~') {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
            _ => return Ok(PathBuf::from(target)),
        };
        let home = session.get_var("HOME").ok_or(BuiltinError::HomeNotSet)?;
        Ok(PathBuf::from(home).join(rest))
    }
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        Self::from_args(&[Self::name()], args)
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode, BuiltinError> {
        let target = self
            .target
            .ok_or(BuiltinError::MissingArgument { command: "cd" })?;
        let new_dir = session.current_dir.join(Self::expand_tilde(&target, session)?);

        match fs::canonicalize(&new_dir) {
            Ok(dir) if dir.is_dir() => {
                tracing::debug!(dir = %dir.display(), "changed directory");
                session.current_dir = dir;
                Ok(0)
            }
            _ => Err(BuiltinError::NoSuchDirectory { path: target }),
        }
    }
}

#[derive(FromArgs)]
/// Describe how each name would be interpreted as a command.
pub struct Type {
    #[argh(positional, greedy)]
    /// command names to look up.
    pub names: Vec<String>,
}

impl BuiltinCommand for Type {
    fn name() -> &'static str {
        "type"
    }

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        Self::from_args(&[Self::name()], args)
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode, BuiltinError> {
        if self.names.is_empty() {
            return Err(BuiltinError::MissingArgument { command: "type" });
        }
        let mut status = 0;
        for name in &self.names {
            if is_builtin(name) {
                writeln!(stdout, "{} is a shell builtin", name)?;
                continue;
            }
            let search_paths = OsStr::new(session.search_paths());
            match find_command_path(search_paths, name, &session.current_dir) {
                Some(path) => writeln!(stdout, "{} is {}", name, path.display())?,
                None => {
                    writeln!(stdout, "{}: not found", name)?;
                    status = 1;
                }
            }
        }
        Ok(status)
    }
}
