use core::fmt;

use serde::Serialize;

use super::{Location, Span, source_line};

/// A diagnostic tied to a position in the source text.
///
/// Created unbound (span only) by the parser, checker, optimizer, compiler or
/// VM, and resolved against the source with [`FileError::bind`]. The text form
/// is
///
/// ```text
/// message (line:column)
///  | source line
///  | ....^
/// ```
///
/// where the printed column is 1-based. The serialized form keeps the 0-based
/// `Column`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileError {
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub snippet: String,
    #[serde(skip)]
    pub span: Option<Span>,
}

impl FileError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            line: 0,
            column: 0,
            message: message.into(),
            snippet: String::new(),
            span: Some(span),
        }
    }

    /// An error with no position, rendered as the bare message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            line: 0,
            column: 0,
            message: message.into(),
            snippet: String::new(),
            span: None,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.line != 0
    }

    /// Resolves the span against `source`, filling line, column and snippet.
    ///
    /// Binding twice is a no-op.
    pub fn bind(mut self, source: &str) -> Self {
        let Some(span) = self.span else {
            return self;
        };
        if self.is_bound() {
            return self;
        }
        let Location { line, column } = Location::of(source, span.start);
        self.line = line;
        self.column = column;
        if let Some(text) = source_line(source, line) {
            let text = text.replace('\t', " ");
            self.snippet = format!("\n | {}\n | {}^", text, ".".repeat(column));
        }
        self
    }
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_bound() {
            return f.write_str(&self.message);
        }
        write!(
            f,
            "{} ({}:{}){}",
            self.message,
            self.line,
            self.column + 1,
            self.snippet
        )
    }
}

impl std::error::Error for FileError {}
