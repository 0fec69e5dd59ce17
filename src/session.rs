use crate::command::ExitCode;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Mutable, user-level view of the process state used by the interpreter.
///
/// The session contains:
/// - `vars`: a snapshot of the environment variables, handed to every child process.
/// - `current_dir`: the working directory for command execution and redirections.
/// - `last_status`: exit status of the last completed line.
/// - `should_exit`: set by the `exit` builtin; the interpreter ends the session when it sees it.
///
/// The shell never changes the real process working directory or environment;
/// everything goes through this value.
#[derive(Debug, Clone)]
pub struct Session {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// Exit status of the last line that ran.
    pub last_status: ExitCode,
    /// Exit status requested by `exit`, if any.
    pub should_exit: Option<ExitCode>,
}

impl Session {
    /// Build a session from an explicit environment and working directory.
    pub fn new(vars: HashMap<String, String>, current_dir: impl Into<PathBuf>) -> Self {
        Self {
            vars,
            current_dir: current_dir.into(),
            last_status: 0,
            should_exit: None,
        }
    }

    /// Capture the current process state into a new `Session`.
    pub fn from_process() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::new(vars, current_dir)
    }

    /// Get the value of a variable from the snapshot.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Set or override a variable in the snapshot.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// The `PATH` search list, empty when unset.
    pub fn search_paths(&self) -> &str {
        self.get_var("PATH").unwrap_or_default()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::from_process()
    }
}
