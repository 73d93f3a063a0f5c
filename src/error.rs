use quill_lexer::LexError;
use quill_query::QueryError;
use quill_render::RenderError;
use quill_syntax::ParseError;
use thiserror::Error;

/// Every way a call through [`crate::Engine`] can fail.
#[derive(Error, Debug)]
pub enum QuillError {
    #[error("Tokenizing failed: {0}")]
    Lex(#[from] LexError),

    /// Only produced by [`crate::CompiledTemplate::ensure_valid`]; parsing itself
    /// always yields a tree.
    #[error("Template has {} parse error(s)", .0.len())]
    Parse(Vec<ParseError>),

    #[error("Query failed: {0}")]
    Query(#[from] QueryError),

    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
