//! Parser and syntax tree for Quill templates.
//!
//! [`parse`] turns the tokens produced by `quill-lexer` into a [`Template`].
//! Expression tags and statement arguments are parsed by a `nom` grammar, see
//! [`parse_expression`].

pub mod ast;
pub mod error;
mod expr;
mod parser;

pub use ast::{
    BinaryOperator, Expr, ExprKind, FilterCall, Literal, Node, NodeKind, PathSegment, Template,
    UnaryOperator,
};
pub use error::{ParseError, ParseErrorKind};
pub use expr::parse_expression;
pub use parser::{ParseResult, parse};
