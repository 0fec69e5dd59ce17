use crate::error::ParseError;
use crate::lexer;
use std::path::PathBuf;

/// Target file of an output redirection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// File name as typed; relative names are resolved against the session directory.
    pub path: PathBuf,
    /// `>>` style: append instead of truncating.
    pub append: bool,
}

/// A command line with its redirections taken out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// `argv[0]` is the command name.
    pub argv: Vec<String>,
    /// Where standard output goes, `None` for the console.
    pub stdout: Option<Redirect>,
    /// Where standard error goes, `None` for the console.
    pub stderr: Option<Redirect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// Maps a standalone token to the stream it redirects and whether it appends.
fn redirect_operator(token: &str) -> Option<(Stream, bool)> {
    match token {
        ">" | "1>" => Some((Stream::Stdout, false)),
        ">>" | "1>>" => Some((Stream::Stdout, true)),
        "2>" => Some((Stream::Stderr, false)),
        "2>>" => Some((Stream::Stderr, true)),
        _ => None,
    }
}

struct CommandBuilder {
    tokens: std::vec::IntoIter<String>,
}

impl CommandBuilder {
    fn from(tokens: Vec<String>) -> Self {
        CommandBuilder {
            tokens: tokens.into_iter(),
        }
    }

    fn consume(&mut self) -> Option<String> {
        self.tokens.next()
    }

    /// Scan left to right; every operator eats exactly the next token.
    fn build(mut self) -> Result<ParsedCommand, ParseError> {
        let mut command = ParsedCommand {
            argv: Vec::new(),
            stdout: None,
            stderr: None,
        };

        while let Some(token) = self.consume() {
            let Some((stream, append)) = redirect_operator(&token) else {
                command.argv.push(token);
                continue;
            };
            let target = self
                .consume()
                .ok_or(ParseError::MissingRedirectTarget { operator: token })?;
            let redirect = Some(Redirect {
                path: PathBuf::from(target),
                append,
            });
            // A later operator for the same stream replaces the earlier one.
            match stream {
                Stream::Stdout => command.stdout = redirect,
                Stream::Stderr => command.stderr = redirect,
            }
        }

        Ok(command)
    }
}

/// Removes redirection operators and their file names from `tokens`.
///
/// The returned `argv` keeps the remaining tokens in order and may be empty
/// (for a line that only contained a redirection).
pub fn extract_redirections(tokens: Vec<String>) -> Result<ParsedCommand, ParseError> {
    CommandBuilder::from(tokens).build()
}

/// Tokenizes and extracts redirections from a raw input line.
///
/// Returns `Ok(None)` when there is nothing to run: an empty line or a line
/// with redirections only.
pub fn parse_line(line: &str) -> Result<Option<ParsedCommand>, ParseError> {
    let tokens = lexer::split_into_tokens(line)?;
    let command = extract_redirections(tokens)?;
    if command.argv.is_empty() {
        return Ok(None);
    }
    Ok(Some(command))
}
