//! Token and delimiter definitions.
use crate::error::LexError;
use quill_types::{Position, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Text,
    Statement,
    Expression,
    Comment,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Text => "text",
            TokenKind::Statement => "statement",
            TokenKind::Expression => "expression",
            TokenKind::Comment => "comment",
        };
        f.write_str(name)
    }
}

/// A typed, positioned slice of template source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// The raw source of the token, delimiters included.
    pub content: String,
    /// The text between the delimiters. Equal to `content` for text tokens.
    pub body: String,
    /// Byte offset of `content` in the source.
    pub offset: usize,
    /// Position where `body` starts.
    pub body_start: Position,
    pub start: Position,
    pub end: Position,
}

impl Token {
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }
}

/// The open/close marker pairs for each tag kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Delimiters {
    pub statement_open: String,
    pub statement_close: String,
    pub expression_open: String,
    pub expression_close: String,
    pub comment_open: String,
    pub comment_close: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            statement_open: "{%".to_string(),
            statement_close: "%}".to_string(),
            expression_open: "{{".to_string(),
            expression_close: "}}".to_string(),
            comment_open: "{#".to_string(),
            comment_close: "#}".to_string(),
        }
    }
}

impl Delimiters {
    /// Tag kinds in tie-break order: when two opening markers start at the
    /// same index the earlier kind in this list wins.
    pub const PRECEDENCE: [TokenKind; 3] =
        [TokenKind::Statement, TokenKind::Expression, TokenKind::Comment];

    /// Returns the `(open, close)` markers for a tag kind.
    pub fn markers(&self, kind: TokenKind) -> Option<(&str, &str)> {
        match kind {
            TokenKind::Statement => Some((&self.statement_open, &self.statement_close)),
            TokenKind::Expression => Some((&self.expression_open, &self.expression_close)),
            TokenKind::Comment => Some((&self.comment_open, &self.comment_close)),
            TokenKind::Text => None,
        }
    }

    /// Rejects configurations with an empty marker, which would match everywhere.
    pub fn validate(&self) -> Result<(), LexError> {
        for kind in Self::PRECEDENCE {
            if let Some((open, close)) = self.markers(kind)
                && (open.is_empty() || close.is_empty())
            {
                return Err(LexError::InvalidDelimiters(format!(
                    "{} delimiters must not be empty",
                    kind
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiters_deserialize_with_defaults() {
        let delims: Delimiters =
            serde_json::from_str(r#"{ "expressionOpen": "[[", "expressionClose": "]]" }"#).unwrap();
        assert_eq!(delims.expression_open, "[[");
        assert_eq!(delims.statement_open, "{%");
    }

    #[test]
    fn test_empty_marker_is_rejected() {
        let delims = Delimiters {
            comment_close: String::new(),
            ..Default::default()
        };
        assert!(matches!(delims.validate(), Err(LexError::InvalidDelimiters(_))));
    }
}
