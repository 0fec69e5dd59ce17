//! Lexical analysis (tokenization) of a single command line.
//!
//! Words are split on unquoted whitespace. Quoting follows the POSIX rules the
//! shell needs:
//! - outside quotes a backslash takes the next character literally;
//! - inside single quotes every character is literal;
//! - inside double quotes a backslash only escapes `"`, `\`, `$`, `` ` `` and newline,
//!   and is kept as-is before anything else.
//!
//! Quoted and unquoted fragments with no whitespace between them form one word.

use crate::error::{ParseError, QuoteKind};

/// Characters a backslash can escape inside double quotes.
const DOUBLE_QUOTE_ESCAPABLE: [char; 5] = ['"', '\\', '$', '`', '\n'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Normal,
    InSingleQuote,
    InDoubleQuote,
    Escaped,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    /// `Some` once a word has started, even if it is still empty (`''`).
    current_word: Option<String>,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Normal,
            current_word: None,
        }
    }

    /// Runs the machine over the whole input and returns the words.
    fn make_tokens(&mut self) -> Result<Vec<String>, ParseError> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Normal => self.handle_normal(ch, &mut out),
                LexingState::Escaped => self.handle_escaped(ch),
                LexingState::InSingleQuote => self.handle_single_quote(ch),
                LexingState::InDoubleQuote => self.handle_double_quote(ch),
            }
        }

        match self.state {
            LexingState::InSingleQuote => Err(ParseError::UnterminatedQuote {
                quote: QuoteKind::Single,
            }),
            LexingState::InDoubleQuote => Err(ParseError::UnterminatedQuote {
                quote: QuoteKind::Double,
            }),
            LexingState::Escaped => Err(ParseError::TrailingEscape),
            LexingState::Normal => {
                self.finish_word(&mut out);
                Ok(out)
            }
        }
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn word(&mut self) -> &mut String {
        self.current_word.get_or_insert_with(String::new)
    }

    fn finish_word(&mut self, out: &mut Vec<String>) {
        if let Some(word) = self.current_word.take() {
            out.push(word);
        }
    }

    fn handle_normal(&mut self, ch: char, out: &mut Vec<String>) {
        match ch {
            ' ' | '\t' | '\n' | '\r' => self.finish_word(out),
            '\'' => {
                self.word();
                self.state = LexingState::InSingleQuote;
            }
            '"' => {
                self.word();
                self.state = LexingState::InDoubleQuote;
            }
            '\\' => {
                self.word();
                self.state = LexingState::Escaped;
            }
            c => self.word().push(c),
        }
    }

    fn handle_escaped(&mut self, ch: char) {
        self.word().push(ch);
        self.state = LexingState::Normal;
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::Normal,
            c => self.word().push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) {
        match ch {
            '"' => self.state = LexingState::Normal,
            '\\' => match self.peek_char() {
                Some(next) if DOUBLE_QUOTE_ESCAPABLE.contains(&next) => {
                    self.read_char();
                    self.word().push(next);
                }
                _ => self.word().push('\\'),
            },
            c => self.word().push(c),
        }
    }
}

/// Splits one input line into shell words.
///
/// Returns a [`ParseError`] when a quote is left open or the line ends with a
/// lone backslash; in that case no words are produced at all.
pub fn split_into_tokens(line: &str) -> Result<Vec<String>, ParseError> {
    let mut lexer = LexingFSM::new(line);
    let tokens = lexer.make_tokens()?;
    tracing::debug!(?tokens, "tokenized line");
    Ok(tokens)
}
