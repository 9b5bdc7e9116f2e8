//! Error types for rogscript
//!
//! Every pipeline stage has its own error kind. A kind travels inside a
//! [`LangError`] that remembers where in the line it happened, and the
//! orchestrating `run` call folds the stages together into [`RunError`].

use crate::token::Span;
use std::fmt;
use thiserror::Error;

/// Lexer errors. Collected rather than fatal to the scan itself.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScanErrorKind {
    #[error("unexpected character '{0}'")]
    BadCharacter(char),
    #[error("unterminated string")]
    UnterminatedString,
}

/// Parser errors. The first one aborts the parse.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("expected ')' to close '('")]
    UnmatchedParen,
    #[error("expected expression, got {0}")]
    ExpectedExpression(String),
    #[error("{expected}, got {found}")]
    ExpectedToken { expected: String, found: String },
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,
}

/// Static resolution errors, reported before anything executes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveErrorKind {
    #[error("cannot read '{0}' in its own initializer")]
    ReadDuringInitialization(String),
    #[error("'{0}' is already declared in this scope")]
    ReassignedVariable(String),
    #[error("cannot return from outside a function")]
    InvalidReturnOutsideFunction,
}

/// Errors raised while evaluating.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeErrorKind {
    #[error("type mismatch: expected {expected}, got {found}")]
    BadType { expected: &'static str, found: String },
    #[error("undefined variable '{0}'")]
    VariableUsedBeforeDeclared(String),
    #[error("cannot assign to undefined variable '{0}'")]
    VariableAssignedBeforeDefined(String),
    #[error("expected {expected} arguments, got {got}")]
    IncorrectArgLength { expected: usize, got: usize },
    #[error("can only call functions, got {0}")]
    CannotCall(&'static str),
    #[error("cannot access property '{property}' on {target}")]
    CannotAccessProperty { property: String, target: &'static str },
    #[error("cannot index {target} with {key}")]
    InvalidAccessType { key: &'static str, target: &'static str },
    #[error("index {index} out of bounds for array of length {len}")]
    BadIndex { index: String, len: usize },
    #[error("stack overflow: call depth exceeded {0}")]
    StackOverflow(usize),
    #[error("{name}: {message}")]
    NativeFailure { name: String, message: String },
}

/// An error kind with location information
#[derive(Debug, Clone, PartialEq)]
pub struct LangError<K> {
    pub kind: K,
    pub span: Option<Span>,
    pub source_line: Option<String>,
}

pub type ScanError = LangError<ScanErrorKind>;
pub type ParseError = LangError<ParseErrorKind>;
pub type ResolveError = LangError<ResolveErrorKind>;
pub type RuntimeError = LangError<RuntimeErrorKind>;

impl<K: fmt::Display> LangError<K> {
    pub fn new(kind: K, span: Option<Span>) -> Self {
        Self {
            kind,
            span,
            source_line: None,
        }
    }

    pub fn at(kind: K, span: Span) -> Self {
        Self::new(kind, Some(span))
    }

    /// Human-readable message without location
    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    pub fn line(&self) -> Option<usize> {
        self.span.map(|s| s.line)
    }

    pub fn column(&self) -> Option<usize> {
        self.span.map(|s| s.column)
    }

    /// Attach the offending source line so Display can draw a caret.
    pub fn with_source(mut self, source: &str) -> Self {
        if let Some(span) = &self.span {
            let lines: Vec<&str> = source.lines().collect();
            if span.line > 0 && span.line <= lines.len() {
                self.source_line = Some(lines[span.line - 1].to_string());
            }
        }
        self
    }
}

impl<K: fmt::Display> fmt::Display for LangError<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(span) = &self.span {
            write!(f, "[line {}:{}] Error: {}", span.line, span.column, self.kind)?;

            if let Some(ref line) = self.source_line {
                write!(f, "\n  | {}", line)?;
                write!(f, "\n  | {}^", " ".repeat(span.column.saturating_sub(1)))?;
            }
        } else {
            write!(f, "Error: {}", self.kind)?;
        }
        Ok(())
    }
}

impl<K: fmt::Debug + fmt::Display> std::error::Error for LangError<K> {}

/// The single error a `run` call can report
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error("{}", join_lines(.0))]
    Scan(Vec<ScanError>),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl RunError {
    /// Which stage failed, for host-side formatting
    pub fn stage(&self) -> &'static str {
        match self {
            RunError::Scan(_) => "scan",
            RunError::Parse(_) => "parse",
            RunError::Resolve(_) => "resolve",
            RunError::Runtime(_) => "runtime",
        }
    }

    pub fn with_source(self, source: &str) -> Self {
        match self {
            RunError::Scan(errors) => {
                RunError::Scan(errors.into_iter().map(|e| e.with_source(source)).collect())
            }
            RunError::Parse(e) => RunError::Parse(e.with_source(source)),
            RunError::Resolve(e) => RunError::Resolve(e.with_source(source)),
            RunError::Runtime(e) => RunError::Runtime(e.with_source(source)),
        }
    }
}

impl From<Vec<ScanError>> for RunError {
    fn from(errors: Vec<ScanError>) -> Self {
        RunError::Scan(errors)
    }
}

fn join_lines(errors: &[ScanError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_caret() {
        let err = RuntimeError::at(
            RuntimeErrorKind::CannotCall("number"),
            Span::new(4, 5, 1, 5),
        )
        .with_source("var 1()");
        assert_eq!(
            err.to_string(),
            "[line 1:5] Error: can only call functions, got number\n  | var 1()\n  |     ^"
        );
    }

    #[test]
    fn test_scan_errors_render_one_per_line() {
        let errors = vec![
            ScanError::at(ScanErrorKind::BadCharacter('&'), Span::new(0, 1, 1, 1)),
            ScanError::at(ScanErrorKind::UnterminatedString, Span::new(2, 4, 1, 3)),
        ];
        let err = RunError::from(errors);
        assert_eq!(err.stage(), "scan");
        assert_eq!(
            err.to_string(),
            "[line 1:1] Error: unexpected character '&'\n[line 1:3] Error: unterminated string"
        );
    }

    #[test]
    fn test_message_has_no_location() {
        let err = ResolveError::new(ResolveErrorKind::InvalidReturnOutsideFunction, None);
        assert_eq!(err.message(), "cannot return from outside a function");
        assert_eq!(err.line(), None);
    }
}
