use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::completion::ShellHelper;
use crate::error::ShellError;
use crate::io_adapters::{Console, OutputStreams};
use crate::parser::{self, ParsedCommand};
use crate::session::Session;
use anyhow::Context;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, Editor};
use std::io::Write;

/// Prompt printed before every line.
pub const PROMPT: &str = "$ ";

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate: BuiltinCommand and ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// What the interpreter does after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// End the session with this status.
    Exit(ExitCode),
}

/// A minimal shell-like interpreter that can execute built-in and external commands.
///
/// The interpreter owns the [`Session`], the [`Console`] and a list of
/// [`CommandFactory`] objects that are queried in order to create a command
/// from its argument vector. See [`Default`] for the factories included out of
/// the box.
///
/// Example
/// ```
/// use tinysh::{Flow, Interpreter};
/// let mut sh = Interpreter::default();
/// assert_eq!(sh.execute_line("exit 3"), Flow::Exit(3));
/// ```
pub struct Interpreter {
    session: Session,
    console: Console,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(session: Session, console: Console, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            session,
            console,
            commands,
        }
    }

    /// Interpreter with the default commands over the given session and console.
    pub fn with_session(session: Session, console: Console) -> Self {
        Self::new(session, console, default_commands())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Tokenize, extract redirections and run one input line.
    ///
    /// Errors are reported on the console (parse errors) or on the command's
    /// stderr target (everything else); none of them end the session.
    pub fn execute_line(&mut self, line: &str) -> Flow {
        let status = match parser::parse_line(line) {
            Ok(None) => return Flow::Continue,
            Ok(Some(command)) => self.dispatch(line, &command),
            Err(e) => {
                let err = ShellError::from(e);
                let _ = writeln!(self.console.err(), "{}", err);
                err.status()
            }
        };
        if let Err(e) = self.console.flush() {
            tracing::warn!(error = %e, "failed to flush console");
        }
        self.session.last_status = status;

        match self.session.should_exit.take() {
            Some(code) => Flow::Exit(code),
            None => Flow::Continue,
        }
    }

    fn dispatch(&mut self, line: &str, command: &ParsedCommand) -> ExitCode {
        let mut streams = match OutputStreams::open(&mut self.console, command, &self.session.current_dir) {
            Ok(streams) => streams,
            Err(e) => {
                let err = ShellError::from(e);
                let _ = writeln!(self.console.err(), "{}", err);
                return err.status();
            }
        };

        for notice in std::mem::take(&mut streams.fallbacks) {
            let _ = writeln!(streams.stderr, "{}", notice);
        }

        let result = create_command(&self.commands, &self.session, line, &command.argv)
            .and_then(|cmd| cmd.execute(&mut streams, &mut self.session));
        match result {
            Ok(code) => code,
            Err(err) => {
                tracing::debug!(error = ?err, "command failed");
                let _ = writeln!(streams.stderr, "{}", err);
                err.status()
            }
        }
    }

    /// Run the interactive read-eval-print loop until `exit` or end of input.
    ///
    /// Returns the status the process should exit with.
    pub fn repl(&mut self) -> anyhow::Result<ExitCode> {
        let config = Config::builder()
            .completion_type(CompletionType::List)
            .build();
        let mut rl: Editor<ShellHelper, DefaultHistory> =
            Editor::with_config(config).context("failed to initialize line editor")?;
        rl.set_helper(Some(ShellHelper::new(self.session.search_paths())));

        loop {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    if let Flow::Exit(code) = self.execute_line(&line) {
                        return Ok(code);
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => return Ok(self.session.last_status),
                Err(err) => return Err(err).context("failed to read input line"),
            }
        }
    }
}

impl Default for Interpreter {
    /// Interpreter over the current process state writing to stdout/stderr.
    fn default() -> Self {
        Self::with_session(Session::from_process(), Console::stdio())
    }
}

/// The default set of commands: every builtin, then the external command launcher.
fn default_commands() -> Vec<Box<dyn CommandFactory>> {
    use crate::builtin::*;
    use crate::external::ExternalCommand;
    vec![
        Box::new(Factory::<Exit>::default()),
        Box::new(Factory::<Echo>::default()),
        Box::new(Factory::<Pwd>::default()),
        Box::new(Factory::<Cd>::default()),
        Box::new(Factory::<Type>::default()),
        Box::new(Factory::<ExternalCommand>::default()),
    ]
}

/// `line` is only used for the "command not found" message, which repeats
/// what the user typed with runs of whitespace collapsed.
fn create_command(
    commands: &[Box<dyn CommandFactory>],
    session: &Session,
    line: &str,
    argv: &[String],
) -> Result<Box<dyn ExecutableCommand>, ShellError> {
    commands
        .iter()
        .find_map(|factory| factory.try_create(session, argv))
        .ok_or_else(|| ShellError::CommandNotFound {
            line: line.split_whitespace().collect::<Vec<_>>().join(" "),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_adapters::MemWriter;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;
    use std::rc::Rc;
    use tempfile::TempDir;

    struct Harness {
        sh: Interpreter,
        out: Rc<RefCell<Vec<u8>>>,
        err: Rc<RefCell<Vec<u8>>>,
    }

    impl Harness {
        fn new(dir: &Path) -> Self {
            let mut vars = HashMap::new();
            vars.insert("PATH".to_string(), "/usr/bin:/bin".to_string());
            Self::with_vars(vars, dir)
        }

        fn with_vars(vars: HashMap<String, String>, dir: &Path) -> Self {
            let (out, out_buf) = MemWriter::with_handle();
            let (err, err_buf) = MemWriter::with_handle();
            let console = Console::new(Box::new(out), Box::new(err));
            Self {
                sh: Interpreter::with_session(Session::new(vars, dir), console),
                out: out_buf,
                err: err_buf,
            }
        }

        fn run(&mut self, line: &str) -> Flow {
            self.sh.execute_line(line)
        }

        fn take_out(&self) -> String {
            String::from_utf8(std::mem::take(&mut *self.out.borrow_mut())).unwrap()
        }

        fn take_err(&self) -> String {
            String::from_utf8(std::mem::take(&mut *self.err.borrow_mut())).unwrap()
        }
    }

    #[test]
    fn test_exit_statuses() {
        let dir = TempDir::new().unwrap();
        let mut h = Harness::new(dir.path());
        assert_eq!(h.run("exit"), Flow::Exit(0));
        assert_eq!(h.run("exit 7"), Flow::Exit(7));
        assert_eq!(h.run("exit abc"), Flow::Exit(1));
    }

    #[test]
    fn test_empty_and_blank_lines_are_noops() {
        let dir = TempDir::new().unwrap();
        let mut h = Harness::new(dir.path());
        assert_eq!(h.run(""), Flow::Continue);
        assert_eq!(h.run("   "), Flow::Continue);
        assert_eq!(h.take_out(), "");
        assert_eq!(h.take_err(), "");
    }

    #[test]
    fn test_echo_quoting_to_console() {
        let dir = TempDir::new().unwrap();
        let mut h = Harness::new(dir.path());
        assert_eq!(h.run(r#"echo "a  b" 'c'd"#), Flow::Continue);
        assert_eq!(h.take_out(), "a  b cd\n");
        assert_eq!(h.sh.session().last_status, 0);
    }

    #[test]
    fn test_parse_error_runs_nothing() {
        let dir = TempDir::new().unwrap();
        let mut h = Harness::new(dir.path());
        assert_eq!(h.run(r#"echo "a > out.txt"#), Flow::Continue);
        assert_eq!(h.take_out(), "");
        assert_eq!(h.take_err(), "syntax error: unterminated double quote\n");
        assert_eq!(h.sh.session().last_status, 2);

        h.run("echo hi >");
        assert!(h.take_err().contains("no file specified for redirection"));
        assert!(!dir.path().join("out.txt").exists());
    }

    #[test]
    fn test_echo_redirected_to_file() {
        let dir = TempDir::new().unwrap();
        let mut h = Harness::new(dir.path());

        h.run("echo hello > out.txt");
        h.run("echo again 1>> out.txt");
        assert_eq!(h.take_out(), "");
        assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "hello\nagain\n");

        h.run("echo fresh 1> out.txt");
        assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "fresh\n");
    }

    #[test]
    fn test_unused_stderr_redirect_creates_empty_file() {
        let dir = TempDir::new().unwrap();
        let mut h = Harness::new(dir.path());

        h.run("echo hi 2> logs/err.txt");
        assert_eq!(h.take_out(), "hi\n");
        assert_eq!(fs::read_to_string(dir.path().join("logs/err.txt")).unwrap(), "");
    }

    #[test]
    fn test_builtin_errors_follow_stderr_redirect() {
        let dir = TempDir::new().unwrap();
        let mut h = Harness::new(dir.path());

        h.run("cd /no/such/dir 2> err.txt");
        assert_eq!(h.take_err(), "");
        assert_eq!(
            fs::read_to_string(dir.path().join("err.txt")).unwrap(),
            "cd: /no/such/dir: No such file or directory\n"
        );
        assert_eq!(h.sh.session().current_dir, dir.path());

        h.run("type 2>> err.txt");
        assert_eq!(
            fs::read_to_string(dir.path().join("err.txt")).unwrap(),
            "cd: /no/such/dir: No such file or directory\ntype: missing argument\n"
        );
    }

    #[test]
    fn test_cd_then_pwd() {
        let dir = TempDir::new().unwrap();
        let base = fs::canonicalize(dir.path()).unwrap();
        fs::create_dir(base.join("inner")).unwrap();
        let mut h = Harness::new(&base);

        h.run("cd inner");
        h.run("pwd");
        assert_eq!(h.take_out(), format!("{}\n", base.join("inner").display()));

        h.run("cd /no/such/dir");
        assert_eq!(h.take_err(), "cd: /no/such/dir: No such file or directory\n");
        assert_eq!(h.sh.session().last_status, 1);
        h.run("pwd");
        assert_eq!(h.take_out(), format!("{}\n", base.join("inner").display()));
    }

    #[test]
    fn test_cd_home() {
        let dir = TempDir::new().unwrap();
        let home = fs::canonicalize(dir.path()).unwrap();

        let mut vars = HashMap::new();
        vars.insert("HOME".to_string(), home.to_string_lossy().into_owned());
        let mut h = Harness::with_vars(vars, Path::new("/"));
        h.run("cd ~");
        assert_eq!(h.sh.session().current_dir, home);

        let mut h = Harness::with_vars(HashMap::new(), Path::new("/"));
        h.run("cd ~");
        assert_eq!(h.take_err(), "cd: HOME environment variable not set\n");
    }

    #[test]
    fn test_type_builtin_and_missing() {
        let dir = TempDir::new().unwrap();
        let mut h = Harness::new(dir.path());
        h.run("type cd");
        h.run("type zzzNoSuchCmd");
        assert_eq!(h.take_out(), "cd is a shell builtin\nzzzNoSuchCmd: not found\n");
    }

    #[test]
    fn test_command_not_found() {
        let dir = TempDir::new().unwrap();
        let mut h = Harness::new(dir.path());
        assert_eq!(h.run("zzzNoSuchCmd --flag 'x y'"), Flow::Continue);
        assert_eq!(h.take_err(), "zzzNoSuchCmd --flag 'x y': command not found\n");
        assert_eq!(h.sh.session().last_status, 127);

        h.run(r#"  zzz   'x y'  "q"  "#);
        assert_eq!(h.take_err(), "zzz 'x y' \"q\": command not found\n");
    }

    #[test]
    fn test_command_not_found_follows_stderr_redirect() {
        let dir = TempDir::new().unwrap();
        let mut h = Harness::new(dir.path());
        h.run("zzzNoSuchCmd 2> err.txt");
        assert_eq!(h.take_err(), "");
        assert_eq!(
            fs::read_to_string(dir.path().join("err.txt")).unwrap(),
            "zzzNoSuchCmd 2> err.txt: command not found\n"
        );
    }

    #[test]
    fn test_uncreatable_redirect_directory_is_reported_and_command_still_runs() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("blocker"), "").unwrap();
        let mut h = Harness::new(dir.path());

        h.run("echo hi > blocker/sub/out.txt");
        assert_eq!(h.take_out(), "hi\n");
        let err = h.take_err();
        let expected = format!(
            "echo: cannot create directory {}: ",
            dir.path().join("blocker/sub").display()
        );
        assert!(err.starts_with(&expected), "unexpected stderr: {err:?}");
        assert_eq!(err.lines().count(), 1);
        assert_eq!(h.sh.session().last_status, 0);
    }

    #[test]
    fn test_builtin_help_goes_to_stdout() {
        let dir = TempDir::new().unwrap();
        let mut h = Harness::new(dir.path());
        h.run("pwd --help");
        assert!(h.take_out().contains("Usage: pwd"));
        assert_eq!(h.sh.session().last_status, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_external_command_output_routing() {
        let dir = TempDir::new().unwrap();
        let mut h = Harness::new(dir.path());

        h.run("sh -c 'echo out; echo err >&2' > o.txt 2> e.txt");
        assert_eq!(h.take_out(), "");
        assert_eq!(h.take_err(), "");
        assert_eq!(fs::read_to_string(dir.path().join("o.txt")).unwrap(), "out\n");
        assert_eq!(fs::read_to_string(dir.path().join("e.txt")).unwrap(), "err\n");

        h.run("sh -c 'exit 4'");
        assert_eq!(h.sh.session().last_status, 4);

        h.run("sh -c 'echo visible'");
        assert_eq!(h.take_out(), "visible\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_failure_goes_to_stderr_target() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let bin = dir.path().join("badexec");
        fs::write(&bin, [0u8, 1, 2, 3, 0xff, 0xfe]).unwrap();
        fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).unwrap();

        let mut vars = HashMap::new();
        vars.insert("PATH".to_string(), dir.path().to_string_lossy().into_owned());
        let mut h = Harness::with_vars(vars, dir.path());

        h.run("badexec x 2> e.txt");
        assert_eq!(h.take_out(), "");
        assert_eq!(h.take_err(), "");
        assert_eq!(h.sh.session().last_status, 126);
        let err = fs::read_to_string(dir.path().join("e.txt")).unwrap();
        assert!(err.starts_with("badexec: "), "unexpected stderr: {err:?}");
        assert!(err.ends_with('\n'));
    }
}
