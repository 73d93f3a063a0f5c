use quill_types::Span;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderErrorKind {
    /// A root name found in no scope frame and not in the data.
    UndefinedVariable,
    /// A value of the wrong shape, such as iterating a number.
    TypeError,
    /// A filter or function handler failed.
    FilterError,
    /// Anything that stops evaluation outright.
    RuntimeError,
}

impl fmt::Display for RenderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RenderErrorKind::UndefinedVariable => "undefined_variable",
            RenderErrorKind::TypeError => "type_error",
            RenderErrorKind::FilterError => "filter_error",
            RenderErrorKind::RuntimeError => "runtime_error",
        })
    }
}

/// A problem met while rendering. Collected on the context unless
/// `throw_on_error` promotes it.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{kind} at '{path}': {message}")]
pub struct RenderError {
    pub kind: RenderErrorKind,
    pub message: String,
    /// The variable path or expression text the error concerns.
    pub path: String,
    pub span: Option<Span>,
    /// The filter or function name, for `filter_error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl RenderError {
    pub fn new(kind: RenderErrorKind, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: path.into(),
            span: None,
            filter: None,
        }
    }

    pub fn undefined_variable(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            RenderErrorKind::UndefinedVariable,
            format!("'{}' is not defined", path),
            path,
        )
    }

    pub fn type_error(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::TypeError, message, path)
    }

    pub fn filter_error(filter: &str, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            filter: Some(filter.to_string()),
            ..Self::new(RenderErrorKind::FilterError, message, path)
        }
    }

    pub fn runtime(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::RuntimeError, message, path)
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}
