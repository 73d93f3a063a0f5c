use crate::token::TokenKind;
use quill_types::Position;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unclosed {kind} delimiter opened at {position}")]
    UnclosedDelimiter { kind: TokenKind, position: Position },

    #[error("Invalid delimiter configuration: {0}")]
    InvalidDelimiters(String),
}
