//! Quill: a small template language.
//!
//! The pipeline runs `text --tokenize--> tokens --parse--> tree`, then renders
//! the tree against data as often as needed. Each stage lives in its own
//! crate and is re-exported here; [`Engine`] wires them together around one
//! shared [`FunctionRegistry`].
//!
//! - `quill-lexer`: delimiter-configurable tokenizer
//! - `quill-syntax`: AST and error-recovering parser
//! - `quill-query`: path queries and the built-in function library
//! - `quill-render`: the tree-walking renderer
mod compiled;
mod config;
mod engine;
mod error;

pub use compiled::CompiledTemplate;
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::QuillError;

pub use quill_lexer::{Delimiters, LexError, Token, TokenKind, tokenize};
pub use quill_query::{
    Category, FunctionError, FunctionRegistry, FunctionSignature, Parameter, QueryEngine,
    QueryError, QueryOptions, query,
};
pub use quill_render::{
    RenderContext, RenderError, RenderErrorKind, RenderOptions, RenderOutput, render, render_with,
};
pub use quill_syntax::{ParseError, ParseErrorKind, ParseResult, Template, parse};
pub use quill_types::{Object, Position, Span, Value};

/// The syntax tree types, for callers that walk templates themselves.
pub mod ast {
    pub use quill_syntax::ast::*;
}
