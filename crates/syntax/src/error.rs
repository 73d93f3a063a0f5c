use quill_types::Span;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// Input that does not match the grammar.
    Syntax,
    /// A construct the parser had to close or skip to keep going.
    Recovery,
    /// Well-formed input that breaks a naming or structure rule.
    Validation,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParseErrorKind::Syntax => "syntax",
            ParseErrorKind::Recovery => "recovery",
            ParseErrorKind::Validation => "validation",
        })
    }
}

/// A problem found while parsing. Parse errors are collected, never thrown.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} error at {}: {message}", .span.start)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub span: Span,
    pub suggestion: Option<String>,
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::new(ParseErrorKind::Syntax, message, span)
    }

    pub fn recovery(message: impl Into<String>, span: Span) -> Self {
        Self::new(ParseErrorKind::Recovery, message, span)
    }

    pub fn validation(message: impl Into<String>, span: Span) -> Self {
        Self::new(ParseErrorKind::Validation, message, span)
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    fn new(kind: ParseErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            suggestion: None,
        }
    }
}
