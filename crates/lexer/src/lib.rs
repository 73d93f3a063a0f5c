//! Tokenizer for Quill templates.
//!
//! Splits raw template text into a flat sequence of text, statement,
//! expression and comment tokens. Delimiters are configurable strings of any
//! length; see [`Delimiters`].

pub mod error;
mod lexer;
pub mod token;

pub use error::LexError;
pub use lexer::tokenize;
pub use token::{Delimiters, Token, TokenKind};
