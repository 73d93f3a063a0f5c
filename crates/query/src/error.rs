use thiserror::Error;

/// Raised by a function handler when its input cannot be coerced sensibly.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Function '{function}' error: {message}")]
pub struct FunctionError {
    pub function: String,
    pub message: String,
}

impl FunctionError {
    pub fn new(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by strict-mode queries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Invalid path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    #[error("Path '{path}' not found: nothing at '{segment}'")]
    NotFound { path: String, segment: String },

    #[error("Path '{path}': cannot read '{segment}' of a {found}")]
    TypeMismatch {
        path: String,
        segment: String,
        found: &'static str,
    },

    #[error("Path '{path}' exceeds the maximum depth of {max_depth} segments")]
    DepthExceeded { path: String, max_depth: usize },

    #[error(transparent)]
    Filter(#[from] FunctionError),
}

impl QueryError {
    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn not_found(path: impl Into<String>, segment: impl Into<String>) -> Self {
        Self::NotFound {
            path: path.into(),
            segment: segment.into(),
        }
    }
}
