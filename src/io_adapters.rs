use crate::error::ExecutionError;
use crate::parser::{ParsedCommand, Redirect};
use std::cell::RefCell;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Result as IoResult, Write};
use std::path::Path;
use std::rc::Rc;

/// The terminal side of the shell: where output goes when it is not redirected.
pub struct Console {
    out: Box<dyn Write>,
    err: Box<dyn Write>,
}

impl Console {
    /// Console backed by arbitrary writers, e.g. [`MemWriter`] in tests.
    pub fn new(out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        Self { out, err }
    }

    /// Console backed by the process's standard output and standard error.
    pub fn stdio() -> Self {
        Self::new(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    /// Standard error of the console, for messages produced before a command
    /// has any streams of its own.
    pub fn err(&mut self) -> &mut dyn Write {
        &mut *self.err
    }

    pub fn flush(&mut self) -> IoResult<()> {
        self.out.flush()?;
        self.err.flush()
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::stdio()
    }
}

/// One output stream of a running command: the console or a redirect file.
pub enum Sink<'a> {
    Console(&'a mut dyn Write),
    File(File),
}

impl Sink<'_> {
    pub fn is_console(&self) -> bool {
        matches!(self, Sink::Console(_))
    }
}

impl Write for Sink<'_> {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        match self {
            Sink::Console(w) => w.write(data),
            Sink::File(f) => f.write(data),
        }
    }

    fn flush(&mut self) -> IoResult<()> {
        match self {
            Sink::Console(w) => w.flush(),
            Sink::File(f) => f.flush(),
        }
    }
}

/// Standard output and standard error of a single command.
///
/// Redirect files are opened (and created) up front and closed when this
/// value is dropped at the end of the line.
pub struct OutputStreams<'a> {
    pub stdout: Sink<'a>,
    pub stderr: Sink<'a>,
    /// Redirects that fell back to the console because their directory could
    /// not be created.
    pub fallbacks: Vec<ExecutionError>,
}

impl<'a> OutputStreams<'a> {
    /// Both streams go to the console.
    pub fn console(console: &'a mut Console) -> Self {
        let Console { out, err } = console;
        Self {
            stdout: Sink::Console(&mut **out),
            stderr: Sink::Console(&mut **err),
            fallbacks: Vec::new(),
        }
    }

    /// Opens the redirect targets of `command`, relative to `current_dir`.
    ///
    /// Truncation happens only after both targets opened, so a failing
    /// stderr target leaves an existing stdout file untouched.
    pub fn open(
        console: &'a mut Console,
        command: &ParsedCommand,
        current_dir: &Path,
    ) -> Result<Self, ExecutionError> {
        let name = command.argv.first().map(String::as_str).unwrap_or_default();
        let Console { out, err } = console;
        let mut fallbacks = Vec::new();
        let stdout = open_sink(name, command.stdout.as_ref(), current_dir, &mut **out, &mut fallbacks)?;
        let stderr = open_sink(name, command.stderr.as_ref(), current_dir, &mut **err, &mut fallbacks)?;

        for (sink, redirect) in [(&stdout, &command.stdout), (&stderr, &command.stderr)] {
            if let (Sink::File(file), Some(redirect)) = (sink, redirect) {
                if !redirect.append {
                    file.set_len(0).map_err(|source| ExecutionError::Redirect {
                        path: redirect.path.clone(),
                        source,
                    })?;
                }
            }
        }
        Ok(Self {
            stdout,
            stderr,
            fallbacks,
        })
    }
}

fn open_sink<'a>(
    command: &str,
    redirect: Option<&Redirect>,
    current_dir: &Path,
    console: &'a mut dyn Write,
    fallbacks: &mut Vec<ExecutionError>,
) -> Result<Sink<'a>, ExecutionError> {
    let Some(redirect) = redirect else {
        return Ok(Sink::Console(console));
    };
    let path = current_dir.join(&redirect.path);

    if let Some(parent) = path.parent() {
        if let Err(source) = fs::create_dir_all(parent) {
            tracing::warn!(path = %parent.display(), error = %source, "cannot create redirect directory, using console");
            fallbacks.push(ExecutionError::RedirectDirectory {
                command: command.to_string(),
                dir: parent.to_path_buf(),
                source,
            });
            return Ok(Sink::Console(console));
        }
    }

    let mut options = OpenOptions::new();
    options.create(true);
    if redirect.append {
        options.append(true);
    } else {
        options.write(true);
    }
    let file = options
        .open(&path)
        .map_err(|source| ExecutionError::Redirect {
            path: redirect.path.clone(),
            source,
        })?;
    tracing::debug!(path = %path.display(), append = redirect.append, "opened redirect");
    Ok(Sink::File(file))
}

/// Memory-backed writer for capturing console output.
pub struct MemWriter {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl MemWriter {
    pub fn new() -> Self {
        Self {
            buf: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Convenience: create writer and return (writer, rc_handle).
    pub fn with_handle() -> (Self, Rc<RefCell<Vec<u8>>>) {
        let mw = MemWriter::new();
        let rc = mw.buf.clone();
        (mw, rc)
    }
}

impl Default for MemWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn command(stdout: Option<Redirect>, stderr: Option<Redirect>) -> ParsedCommand {
        ParsedCommand {
            argv: vec!["echo".to_string()],
            stdout,
            stderr,
        }
    }

    fn redirect(path: &str, append: bool) -> Option<Redirect> {
        Some(Redirect {
            path: PathBuf::from(path),
            append,
        })
    }

    fn mem_console() -> (Console, Rc<RefCell<Vec<u8>>>, Rc<RefCell<Vec<u8>>>) {
        let (out, out_buf) = MemWriter::with_handle();
        let (err, err_buf) = MemWriter::with_handle();
        (Console::new(Box::new(out), Box::new(err)), out_buf, err_buf)
    }

    #[test]
    fn test_unredirected_streams_go_to_console() {
        let dir = TempDir::new().unwrap();
        let (mut console, out_buf, err_buf) = mem_console();
        {
            let mut streams = OutputStreams::open(&mut console, &command(None, None), dir.path()).unwrap();
            assert!(streams.stdout.is_console());
            write!(streams.stdout, "out").unwrap();
            write!(streams.stderr, "err").unwrap();
        }
        assert_eq!(out_buf.borrow().as_slice(), b"out");
        assert_eq!(err_buf.borrow().as_slice(), b"err");
    }

    #[test]
    fn test_truncate_creates_file_and_parents_even_if_unused() {
        let dir = TempDir::new().unwrap();
        let (mut console, _, _) = mem_console();
        let cmd = command(None, redirect("nested/deeper/err.txt", false));
        {
            let streams = OutputStreams::open(&mut console, &cmd, dir.path()).unwrap();
            assert!(!streams.stderr.is_console());
        }
        let content = fs::read(dir.path().join("nested/deeper/err.txt")).unwrap();
        assert!(content.is_empty());
    }

    #[test]
    fn test_truncate_and_append_modes() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("out.txt");
        fs::write(&file, "old\n").unwrap();
        let (mut console, _, _) = mem_console();

        {
            let cmd = command(redirect("out.txt", true), None);
            let mut streams = OutputStreams::open(&mut console, &cmd, dir.path()).unwrap();
            write!(streams.stdout, "more\n").unwrap();
        }
        assert_eq!(fs::read_to_string(&file).unwrap(), "old\nmore\n");

        {
            let cmd = command(redirect("out.txt", false), None);
            let mut streams = OutputStreams::open(&mut console, &cmd, dir.path()).unwrap();
            write!(streams.stdout, "new\n").unwrap();
        }
        assert_eq!(fs::read_to_string(&file).unwrap(), "new\n");
    }

    #[test]
    fn test_directory_creation_failure_falls_back_to_console() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("blocker"), "").unwrap();
        let (mut console, out_buf, _) = mem_console();
        {
            let cmd = command(redirect("blocker/sub/out.txt", false), None);
            let mut streams = OutputStreams::open(&mut console, &cmd, dir.path()).unwrap();
            assert!(streams.stdout.is_console());
            assert!(matches!(
                streams.fallbacks.as_slice(),
                [ExecutionError::RedirectDirectory { command, .. }] if command == "echo"
            ));
            write!(streams.stdout, "fallback").unwrap();
        }
        assert_eq!(out_buf.borrow().as_slice(), b"fallback");
    }

    #[test]
    fn test_unopenable_target_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("taken")).unwrap();
        let (mut console, _, _) = mem_console();
        let cmd = command(redirect("taken", false), None);
        let err = OutputStreams::open(&mut console, &cmd, dir.path())
            .err()
            .expect("directory cannot be opened for writing");
        assert!(matches!(err, ExecutionError::Redirect { .. }));
    }

    #[test]
    fn test_failed_stderr_target_keeps_stdout_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("out.txt"), "keep\n").unwrap();
        fs::create_dir(dir.path().join("taken")).unwrap();
        let (mut console, _, _) = mem_console();
        let cmd = command(redirect("out.txt", false), redirect("taken", false));
        assert!(OutputStreams::open(&mut console, &cmd, dir.path()).is_err());
        assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "keep\n");
    }
}
