//! Builds the template tree from a token stream.
//!
//! The parser never gives up on a document: malformed tags become `Error`
//! nodes, unclosed blocks are closed at end of input, and every problem is
//! collected as a [`ParseError`] next to the tree. This keeps transiently
//! invalid documents (as typed in an editor) renderable.
use crate::ast::{Expr, ExprKind, Node, NodeKind, Template};
use crate::error::ParseError;
use crate::expr::{identifier, parse_expression};
use quill_lexer::{Token, TokenKind};
use quill_types::{Position, Span};
use std::collections::HashSet;

/// Names bound by the renderer that templates may not rebind.
const RESERVED_NAMES: &[&str] = &["loop"];

/// How deeply `if`, `for` and `block` tags may nest, `elif` included.
const MAX_BLOCK_DEPTH: usize = 64;

const KEYWORDS: &[&str] = &[
    "if", "elif", "else", "endif", "for", "endfor", "set", "block", "endblock",
];

/// The outcome of parsing: a tree, always, and whatever went wrong on the way.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseResult {
    pub ast: Template,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parses a token stream into a [`Template`].
pub fn parse(tokens: &[Token]) -> ParseResult {
    let mut parser = Parser {
        tokens,
        pos: 0,
        errors: Vec::new(),
        block_names: HashSet::new(),
        depth: 0,
    };
    let (children, stray) = parser.parse_nodes(&[]);
    debug_assert!(stray.is_none());

    let span = match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => Span::new(first.start, last.end),
        _ => Span::default(),
    };
    log::debug!(
        "parsed {} tokens into {} top-level nodes ({} errors)",
        tokens.len(),
        children.len(),
        parser.errors.len()
    );
    ParseResult {
        ast: Template { children, span },
        errors: parser.errors,
    }
}

/// A statement tag split into its keyword and the remainder of its body.
struct Statement<'t> {
    keyword: &'t str,
    rest: &'t str,
    token: &'t Token,
}

impl<'t> Statement<'t> {
    fn split(token: &'t Token) -> Self {
        let trimmed = token.body.trim_start();
        let len = trimmed
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(trimmed.len());
        Self {
            keyword: &trimmed[..len],
            rest: &trimmed[len..],
            token,
        }
    }

    /// Position of `suffix`, which must be a suffix of the token body.
    fn origin_of(&self, suffix: &str) -> Position {
        let body = &self.token.body;
        self.token
            .body_start
            .advanced_by(&body[..body.len() - suffix.len()])
    }

    fn span(&self) -> Span {
        self.token.span()
    }

    fn raw(&self) -> Option<String> {
        Some(self.token.content.clone())
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    errors: Vec<ParseError>,
    block_names: HashSet<String>,
    depth: usize,
}

impl<'t> Parser<'t> {
    /// Parses nodes until a statement whose keyword is in `terminators`, which
    /// is consumed and returned, or until the tokens run out.
    fn parse_nodes(&mut self, terminators: &[&str]) -> (Vec<Node>, Option<Statement<'t>>) {
        let mut nodes = Vec::new();
        while let Some(token) = self.tokens.get(self.pos) {
            self.pos += 1;
            match token.kind {
                TokenKind::Text => nodes.push(Node::new(
                    NodeKind::Text(token.content.clone()),
                    token.span(),
                    Some(token.content.clone()),
                )),
                TokenKind::Comment => {}
                TokenKind::Expression => nodes.push(self.expression_node(token)),
                TokenKind::Statement => {
                    let statement = Statement::split(token);
                    if terminators.contains(&statement.keyword) {
                        return (nodes, Some(statement));
                    }
                    nodes.push(self.statement_node(statement));
                }
            }
        }
        (nodes, None)
    }

    fn expression_node(&mut self, token: &Token) -> Node {
        match parse_expression(&token.body, token.body_start) {
            Ok(expr) => Node::new(
                NodeKind::Expression(expr),
                token.span(),
                Some(token.content.clone()),
            ),
            Err(error) => {
                let message = error.message.clone();
                self.errors.push(error);
                self.error_node(message, token.span(), Some(token.content.clone()))
            }
        }
    }

    fn statement_node(&mut self, statement: Statement<'t>) -> Node {
        match statement.keyword {
            "if" | "for" | "block" if self.depth >= MAX_BLOCK_DEPTH => self.skip_block(statement),
            "if" => self.nested(|p| p.parse_if(statement)),
            "for" => self.nested(|p| p.parse_for(statement)),
            "set" => self.parse_set(statement),
            "block" => self.nested(|p| p.parse_block(statement)),
            "elif" | "else" | "endif" | "endfor" | "endblock" => {
                let message = format!(
                    "unexpected `{}` without a matching opening tag",
                    statement.keyword
                );
                self.errors
                    .push(ParseError::syntax(message.clone(), statement.span()));
                self.error_node(message, statement.span(), statement.raw())
            }
            "" => {
                let message = "empty statement".to_string();
                self.errors
                    .push(ParseError::syntax(message.clone(), statement.span()));
                self.error_node(message, statement.span(), statement.raw())
            }
            unknown => {
                let message = format!("unknown statement `{}`", unknown);
                let mut error = ParseError::syntax(message.clone(), statement.span());
                if let Some(suggestion) = closest_keyword(unknown) {
                    error = error.with_suggestion(format!("did you mean `{}`?", suggestion));
                }
                self.errors.push(error);
                self.error_node(message, statement.span(), statement.raw())
            }
        }
    }

    fn parse_if(&mut self, head: Statement<'t>) -> Node {
        let condition = self.required_expression(&head, head.rest);
        let (body, terminator) = self.parse_nodes(&["elif", "else", "endif"]);

        let (else_body, end) = match terminator {
            Some(next) if next.keyword == "elif" => {
                let nested = if self.depth >= MAX_BLOCK_DEPTH {
                    self.skip_block(next)
                } else {
                    self.nested(|p| p.parse_if(next))
                };
                let end = nested.span.end;
                (Some(vec![nested]), end)
            }
            Some(next) if next.keyword == "else" => {
                self.expect_bare(&next);
                let (else_nodes, closing) = self.parse_nodes(&["endif"]);
                let end = self.close(&head, closing, "endif");
                (Some(else_nodes), end)
            }
            closing => (None, self.close(&head, closing, "endif")),
        };

        let kind = NodeKind::If {
            condition,
            body,
            else_body,
        };
        Node::new(kind, Span::new(head.token.start, end), head.raw())
    }

    fn parse_for(&mut self, head: Statement<'t>) -> Node {
        let header = split_for_header(head.rest);
        let (body, closing) = self.parse_nodes(&["endfor"]);
        let end = self.close(&head, closing, "endfor");
        let span = Span::new(head.token.start, end);

        let Some((iterator, iterable_source)) = header else {
            let message = "expected `for <name> in <expression>`".to_string();
            self.errors
                .push(ParseError::syntax(message.clone(), head.span()));
            return self.error_node(message, span, head.raw());
        };
        self.check_binding_name(iterator, &head);
        let iterable = self.required_expression(&head, iterable_source);

        let kind = NodeKind::For {
            iterator: iterator.to_string(),
            iterable,
            body,
        };
        Node::new(kind, span, head.raw())
    }

    fn parse_set(&mut self, head: Statement<'t>) -> Node {
        let assignment = identifier(head.rest.trim_start()).ok().and_then(|(after, name)| {
            let value = after.trim_start().strip_prefix('=')?;
            if value.starts_with('=') {
                return None;
            }
            Some((name, value))
        });
        let Some((name, value_source)) = assignment else {
            let message = "expected `set <name> = <expression>`".to_string();
            self.errors
                .push(ParseError::syntax(message.clone(), head.span()));
            return self.error_node(message, head.span(), head.raw());
        };
        self.check_binding_name(name, &head);
        let value = self.required_expression(&head, value_source);

        let kind = NodeKind::Set {
            name: name.to_string(),
            value,
        };
        Node::new(kind, head.span(), head.raw())
    }

    fn parse_block(&mut self, head: Statement<'t>) -> Node {
        let name = match identifier(head.rest.trim_start()) {
            Ok((after, name)) if after.trim().is_empty() => Some(name),
            _ => None,
        };
        let (body, closing) = self.parse_nodes(&["endblock"]);
        if let (Some(name), Some(closing)) = (name, &closing) {
            let closing_name = closing.rest.trim();
            if !closing_name.is_empty() && closing_name != name {
                self.errors.push(ParseError::validation(
                    format!("`endblock {}` does not match `block {}`", closing_name, name),
                    closing.span(),
                ));
            }
        }
        let end = self.close(&head, closing, "endblock");
        let span = Span::new(head.token.start, end);

        let Some(name) = name else {
            let message = "expected `block <name>`".to_string();
            self.errors
                .push(ParseError::syntax(message.clone(), head.span()));
            return self.error_node(message, span, head.raw());
        };
        if !self.block_names.insert(name.to_string()) {
            self.errors.push(ParseError::validation(
                format!("block `{}` is defined more than once", name),
                head.span(),
            ));
        }

        let kind = NodeKind::Block {
            name: name.to_string(),
            body,
        };
        Node::new(kind, span, head.raw())
    }

    // --- Helpers ---

    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> Node) -> Node {
        self.depth += 1;
        let node = parse(self);
        self.depth -= 1;
        node
    }

    /// Replaces a block opened past [`MAX_BLOCK_DEPTH`] with an error node,
    /// consuming tokens through its matching closing tag without descending.
    fn skip_block(&mut self, head: Statement<'t>) -> Node {
        let message = format!("blocks nest deeper than {} levels", MAX_BLOCK_DEPTH);
        self.errors
            .push(ParseError::syntax(message.clone(), head.span()));
        let mut open = 1usize;
        let mut end = head.token.end;
        while open > 0 {
            let Some(token) = self.tokens.get(self.pos) else {
                break;
            };
            self.pos += 1;
            end = token.end;
            if token.kind != TokenKind::Statement {
                continue;
            }
            match Statement::split(token).keyword {
                "if" | "for" | "block" => open += 1,
                "endif" | "endfor" | "endblock" => open -= 1,
                _ => {}
            }
        }
        self.error_node(message, Span::new(head.token.start, end), head.raw())
    }

    /// Parses `source` (a suffix of the head's body) as an expression. Failures
    /// are recorded and replaced by an `Error` expression.
    fn required_expression(&mut self, head: &Statement<'t>, source: &str) -> Expr {
        let origin = head.origin_of(source);
        if source.trim().is_empty() {
            let message = format!("`{}` requires an expression", head.keyword);
            self.errors
                .push(ParseError::syntax(message.clone(), head.span()));
            return Expr::new(ExprKind::Error { message }, head.span());
        }
        match parse_expression(source, origin) {
            Ok(expr) => expr,
            Err(error) => {
                let span = error.span;
                let message = error.message.clone();
                self.errors.push(error);
                Expr::new(ExprKind::Error { message }, span)
            }
        }
    }

    /// Records a recovery error when a block reaches end of input without its
    /// closing tag. Returns where the block ends.
    fn close(&mut self, head: &Statement<'t>, closing: Option<Statement<'t>>, expected: &str) -> Position {
        match closing {
            Some(closing) => {
                if closing.keyword != "endblock" {
                    self.expect_bare(&closing);
                }
                closing.token.end
            }
            None => {
                self.errors.push(
                    ParseError::recovery(
                        format!("`{}` is never closed", head.keyword),
                        head.span(),
                    )
                    .with_suggestion(format!("add `{}`", expected)),
                );
                self.last_end().unwrap_or(head.token.end)
            }
        }
    }

    fn expect_bare(&mut self, statement: &Statement<'t>) {
        if !statement.rest.trim().is_empty() {
            self.errors.push(ParseError::syntax(
                format!("unexpected input after `{}`", statement.keyword),
                statement.span(),
            ));
        }
    }

    fn check_binding_name(&mut self, name: &str, head: &Statement<'t>) {
        if RESERVED_NAMES.contains(&name) {
            self.errors.push(ParseError::validation(
                format!("`{}` is reserved and cannot be rebound", name),
                head.span(),
            ));
        }
    }

    fn last_end(&self) -> Option<Position> {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.end)
    }

    fn error_node(&self, message: String, span: Span, raw: Option<String>) -> Node {
        Node::new(
            NodeKind::Error {
                message,
                recovered: true,
            },
            span,
            raw,
        )
    }
}

/// Splits `x in items` into the iterator name and the iterable source.
fn split_for_header(rest: &str) -> Option<(&str, &str)> {
    let (after_name, name) = identifier(rest.trim_start()).ok()?;
    let after_space = after_name.trim_start();
    if after_space.len() == after_name.len() {
        return None;
    }
    let iterable = after_space.strip_prefix("in")?;
    if !iterable.starts_with(char::is_whitespace) {
        return None;
    }
    Some((name, iterable))
}

fn closest_keyword(word: &str) -> Option<&'static str> {
    KEYWORDS
        .iter()
        .map(|kw| (strsim::levenshtein(word, kw), *kw))
        .filter(|(distance, _)| *distance <= 2)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, kw)| kw)
}
