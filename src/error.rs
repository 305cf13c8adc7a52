use std::fmt;
use thiserror::Error;

/// Number of characters before the query text in the caret diagnostic,
/// i.e. the width of the `"Query: "` prefix.
const QUERY_PREFIX_LEN: usize = 7;

fn caret_line(position: usize) -> String {
    let mut line = "-".repeat(QUERY_PREFIX_LEN + position);
    line.push('^');
    line
}

/// Top-level error type: either the path failed to parse or its evaluation
/// failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// A path parse failure, pinpointing the offending character.
///
/// `position` is a 0-based code-point column into the query string. The
/// `Display` implementation renders the three-line caret diagnostic:
///
/// ```text
/// Empty query part between two delimiters.
/// Query: name..last
/// ------------^
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    message: String,
    query: String,
    position: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, query: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            query: query.into(),
            position,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\nQuery: {}\n{}",
            self.message,
            self.query,
            caret_line(self.position)
        )
    }
}

impl std::error::Error for ParseError {}

/// What went wrong while evaluating a parsed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// A key, index or query match was not found.
    NotFound,
    /// A part was applied to a value of an unsupported type.
    TypeMismatch,
    /// Modifier options were missing or of the wrong shape.
    InvalidModifierOptions,
    /// A modifier name that neither the built-ins nor the registry know.
    UnknownModifier,
    /// The value cannot be represented as JSON (`@valid`).
    InvalidValue,
    /// A custom modifier could not be registered.
    Registration,
}

/// An evaluation failure.
///
/// When the failing part is known, the error carries the query and the
/// part's column so `Display` can render the same caret diagnostic as
/// [`ParseError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError {
    kind: EvalErrorKind,
    message: String,
    query: Option<String>,
    position: Option<usize>,
}

impl EvalError {
    pub(crate) fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            query: None,
            position: None,
        }
    }

    pub(crate) fn at(mut self, query: &str, position: usize) -> Self {
        self.query = Some(query.to_owned());
        self.position = Some(position);
        self
    }

    /// Attaches a query position unless the error already carries one.
    pub(crate) fn or_at(self, query: &str, position: usize) -> Self {
        if self.position.is_some() {
            self
        } else {
            self.at(query, position)
        }
    }

    pub fn kind(&self) -> EvalErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.query, self.position) {
            (Some(query), Some(position)) => write!(
                f,
                "{}\nQuery: {}\n{}",
                self.message,
                query,
                caret_line(position)
            ),
            _ => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for EvalError {}
