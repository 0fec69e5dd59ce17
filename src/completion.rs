//! Tab completion of command names.
//!
//! [`complete`] is a pure state machine over an explicit [`CompletionState`]:
//! the first request for a query computes the candidates, later requests for
//! the same query only count presses. [`ShellHelper`] plugs it into the
//! `rustyline` editor.

use crate::builtin::BUILTIN_NAMES;
use crate::resolver::executables_with_prefix;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::io::{self, Write};

/// Per-session completion state.
#[derive(Debug, Clone, Default)]
pub struct CompletionState {
    /// `None` while idle.
    last_query: Option<String>,
    tab_presses: u32,
    /// Sorted, deduplicated.
    candidates: Vec<String>,
}

impl CompletionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tab_presses(&self) -> u32 {
        self.tab_presses
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }
}

/// What the line editor should do for a completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Nothing starts with the query.
    NoMatch,
    /// Replace the query with this text.
    Replace(String),
    /// Ambiguous and nothing to extend; ring the bell.
    Bell,
    /// Ambiguous on a repeated request; show every candidate.
    List(Vec<String>),
}

/// Handle one completion request for `query`.
///
/// `lookup` returns the names starting with a prefix; it is only called when
/// the query differs from the previous request's.
pub fn complete<F>(state: &mut CompletionState, query: &str, lookup: F) -> Completion
where
    F: FnOnce(&str) -> Vec<String>,
{
    if state.last_query.as_deref() != Some(query) {
        let unique: BTreeSet<String> = lookup(query).into_iter().collect();
        state.candidates = unique.into_iter().collect();
        state.last_query = Some(query.to_string());
        state.tab_presses = 0;
    }
    let presses = state.tab_presses + 1;

    match state.candidates.as_slice() {
        [] => {
            state.tab_presses = presses;
            Completion::NoMatch
        }
        [only] => {
            state.tab_presses = presses;
            Completion::Replace(format!("{} ", only))
        }
        many => {
            let prefix = longest_common_prefix(many);
            if prefix.len() > query.len() {
                // The extension changes the line; the next request starts over.
                return Completion::Replace(prefix.to_string());
            }
            state.tab_presses = presses;
            if presses == 1 {
                Completion::Bell
            } else {
                Completion::List(many.to_vec())
            }
        }
    }
}

/// Character-wise longest common prefix, case-sensitive.
fn longest_common_prefix(words: &[String]) -> &str {
    let Some((first, rest)) = words.split_first() else {
        return "";
    };
    let mut end = first.len();
    for word in rest {
        end = first
            .char_indices()
            .zip(word.chars())
            .take_while(|((_, a), b)| a == b)
            .map(|((i, a), _)| i + a.len_utf8())
            .last()
            .unwrap_or(0)
            .min(end);
    }
    &first[..end]
}

/// Builtins and `PATH` executables whose names start with `prefix`.
pub fn command_candidates(search_paths: &OsString, prefix: &str) -> Vec<String> {
    let mut names: Vec<String> = BUILTIN_NAMES
        .iter()
        .filter(|name| name.starts_with(prefix))
        .map(|name| name.to_string())
        .collect();
    names.extend(executables_with_prefix(search_paths, prefix));
    names.sort();
    names.dedup();
    names
}

/// `rustyline` helper completing the command word of the line.
pub struct ShellHelper {
    search_paths: OsString,
    state: RefCell<CompletionState>,
}

impl ShellHelper {
    pub fn new(search_paths: impl Into<OsString>) -> Self {
        Self {
            search_paths: search_paths.into(),
            state: RefCell::new(CompletionState::new()),
        }
    }

    fn show_candidates(candidates: &[String]) -> io::Result<()> {
        let mut out = io::stdout().lock();
        write!(out, "\r\n{}\r\n", candidates.join("  "))?;
        out.flush()
    }
}

fn pair(text: String) -> Pair {
    Pair {
        display: text.clone(),
        replacement: text,
    }
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = line[..pos]
            .rfind(|c: char| c == ' ' || c == '\t')
            .map(|i| i + 1)
            .unwrap_or(0);
        if !line[..start].trim().is_empty() {
            return Ok((pos, Vec::new()));
        }
        let query = &line[start..pos];

        let outcome = complete(&mut self.state.borrow_mut(), query, |prefix| {
            command_candidates(&self.search_paths, prefix)
        });
        tracing::trace!(query, ?outcome, "completion");

        match outcome {
            // An empty candidate list makes the editor ring the bell.
            Completion::NoMatch | Completion::Bell => Ok((start, Vec::new())),
            Completion::Replace(text) => Ok((start, vec![pair(text)])),
            Completion::List(candidates) => {
                Self::show_candidates(&candidates)?;
                // Re-offering the query redraws the prompt with the original text.
                Ok((start, vec![pair(query.to_string())]))
            }
        }
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}
