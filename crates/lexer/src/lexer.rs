//! The scanner that splits template source into tokens.
//!
//! At every token boundary the earliest opening marker of any tag kind wins,
//! ties going to statement, then expression, then comment. The next occurrence
//! of each kind's opening marker is cached and only searched for again once
//! the scanner has moved past it, so the whole scan stays linear.
//!
//! The scanner has no notion of string quoting: a delimiter marker inside a
//! quoted string in an expression, or inside a comment, still ends or starts
//! a tag.
use crate::error::LexError;
use crate::token::{Delimiters, Token, TokenKind};
use quill_types::Position;

#[derive(Debug, Clone, Copy)]
enum NextOpen {
    Unknown,
    At(usize),
    Never,
}

struct Lexer<'a> {
    text: &'a str,
    delimiters: &'a Delimiters,
    offset: usize,
    position: Position,
    next_open: [NextOpen; 3],
    tokens: Vec<Token>,
}

/// Splits `text` into text, statement, expression and comment tokens.
pub fn tokenize(text: &str, delimiters: &Delimiters) -> Result<Vec<Token>, LexError> {
    delimiters.validate()?;
    let mut lexer = Lexer {
        text,
        delimiters,
        offset: 0,
        position: Position::START,
        next_open: [NextOpen::Unknown; 3],
        tokens: Vec::new(),
    };
    lexer.run()?;
    log::trace!("tokenized {} bytes into {} tokens", text.len(), lexer.tokens.len());
    Ok(lexer.tokens)
}

impl<'a> Lexer<'a> {
    fn run(&mut self) -> Result<(), LexError> {
        while self.offset < self.text.len() {
            match self.next_boundary() {
                Some((at, kind)) => {
                    self.push_text(at);
                    self.push_tag(kind)?;
                }
                None => self.push_text(self.text.len()),
            }
        }
        Ok(())
    }

    /// Finds the leftmost opening marker at or after the current offset.
    fn next_boundary(&mut self) -> Option<(usize, TokenKind)> {
        let mut best: Option<(usize, TokenKind)> = None;
        for (slot, kind) in Delimiters::PRECEDENCE.into_iter().enumerate() {
            let Some(at) = self.next_open_of(slot, kind) else {
                continue;
            };
            // Strictly-less keeps the earlier kind on ties.
            if best.is_none_or(|(best_at, _)| at < best_at) {
                best = Some((at, kind));
            }
        }
        best
    }

    fn next_open_of(&mut self, slot: usize, kind: TokenKind) -> Option<usize> {
        match self.next_open[slot] {
            NextOpen::Never => return None,
            NextOpen::At(at) if at >= self.offset => return Some(at),
            _ => {}
        }
        let (open, _) = self.delimiters.markers(kind)?;
        let found = self.text[self.offset..].find(open).map(|rel| self.offset + rel);
        self.next_open[slot] = match found {
            Some(at) => NextOpen::At(at),
            None => NextOpen::Never,
        };
        found
    }

    fn push_text(&mut self, until: usize) {
        if until <= self.offset {
            return;
        }
        let content = &self.text[self.offset..until];
        let start = self.position;
        let end = start.advanced_by(content);
        self.tokens.push(Token {
            kind: TokenKind::Text,
            content: content.to_string(),
            body: content.to_string(),
            offset: self.offset,
            body_start: start,
            start,
            end,
        });
        self.offset = until;
        self.position = end;
    }

    /// Consumes a tag starting at the current offset, from its opening marker
    /// through the first closing marker after it.
    fn push_tag(&mut self, kind: TokenKind) -> Result<(), LexError> {
        let Some((open, close)) = self.delimiters.markers(kind) else {
            return Ok(());
        };
        let start = self.position;
        let body_from = self.offset + open.len();
        let body_to = self.text[body_from..]
            .find(close)
            .map(|rel| body_from + rel)
            .ok_or(LexError::UnclosedDelimiter { kind, position: start })?;
        let tag_end = body_to + close.len();

        let body_start = start.advanced_by(open);
        let body = &self.text[body_from..body_to];
        let end = body_start.advanced_by(body).advanced_by(close);
        self.tokens.push(Token {
            kind,
            content: self.text[self.offset..tag_end].to_string(),
            body: body.to_string(),
            offset: self.offset,
            body_start,
            start,
            end,
        });
        self.offset = tag_end;
        self.position = end;
        Ok(())
    }
}
