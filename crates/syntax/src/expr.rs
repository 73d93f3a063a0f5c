//! A `nom`-based parser for the expression language inside tags.
//!
//! Precedence, loosest first: filter pipe, ternary, `||`, `&&`, equality,
//! relational, additive, multiplicative, unary, then postfix member access
//! and method calls on primaries. A pipe takes a whole ternary as its left
//! operand; the right side is always a filter call.
//!
//! Parsers only ever skip *leading* whitespace, so the unconsumed input
//! after a production marks exactly where that node ends.
//!
//! Nesting is capped at [`MAX_DEPTH`] levels. Deeper input is rejected with
//! a syntax error instead of growing the stack.
use crate::ast::{BinaryOperator, Expr, ExprKind, FilterCall, Literal, PathSegment, UnaryOperator};
use crate::error::ParseError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{alpha1, char, digit1, multispace0, one_of},
    combinator::{map, map_res, not, opt, recognize},
    error::{Error, ErrorKind},
    sequence::{pair, preceded, terminated},
};
use quill_types::{Position, Span};
use std::cell::Cell;

/// How deeply groupings, unary operators, ternaries and operator chains
/// may nest within one expression.
pub(crate) const MAX_DEPTH: usize = 64;

type PResult<'s, O> = IResult<&'s str, O>;

/// Parses a complete expression. `origin` is the position of the first
/// character of `source` within the template.
pub fn parse_expression(source: &str, origin: Position) -> Result<Expr, ParseError> {
    ExprParser::new(source, origin).parse_all()
}

struct ExprParser<'s> {
    source: &'s str,
    origin: Position,
    line_starts: Vec<usize>,
    depth: Cell<usize>,
    /// Offset where nesting first went past [`MAX_DEPTH`].
    too_deep: Cell<Option<usize>>,
}

/// One level of nesting, released on drop.
struct DepthGuard<'p>(&'p Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

impl<'s> ExprParser<'s> {
    fn new(source: &'s str, origin: Position) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            origin,
            line_starts,
            depth: Cell::new(0),
            too_deep: Cell::new(None),
        }
    }

    fn parse_all(&self) -> Result<Expr, ParseError> {
        if self.source.trim().is_empty() {
            return Err(ParseError::syntax(
                "empty expression",
                self.span_between(0, self.source.len()),
            ));
        }
        match self.pipeline(self.source) {
            Ok((rest, expr)) => {
                let rest = rest.trim_start();
                if rest.is_empty() {
                    Ok(expr)
                } else {
                    let at = self.offset(rest);
                    Err(ParseError::syntax(
                        format!("unexpected `{}` after expression", rest.trim_end()),
                        self.span_between(at, self.source.len()),
                    ))
                }
            }
            Err(_) if self.too_deep.get().is_some() => {
                let at = self.too_deep.get().unwrap_or_default();
                Err(ParseError::syntax(
                    format!("expression nests deeper than {} levels", MAX_DEPTH),
                    self.span_between(at, self.source.len()),
                ))
            }
            Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(self.error_at(e.input)),
            Err(nom::Err::Incomplete(_)) => Err(self.error_at("")),
        }
    }

    fn error_at(&self, input: &'s str) -> ParseError {
        let trimmed = input.trim_start();
        let at = self.source.len() - trimmed.len();
        let message = match trimmed.chars().next() {
            None => "unexpected end of expression".to_string(),
            Some(_) => {
                let snippet: String = trimmed.chars().take(16).collect();
                format!("unexpected input near `{}`", snippet.trim_end())
            }
        };
        ParseError::syntax(message, self.span_between(at, self.source.len()))
    }

    // --- Positions ---

    fn offset(&self, rest: &str) -> usize {
        self.source.len() - rest.len()
    }

    fn position_at(&self, offset: usize) -> Position {
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line];
        let column = self.source[line_start..offset].chars().count();
        if line == 0 {
            Position::new(self.origin.line, self.origin.column + column)
        } else {
            Position::new(self.origin.line + line, column)
        }
    }

    fn span_between(&self, from: usize, to: usize) -> Span {
        Span::new(self.position_at(from), self.position_at(to))
    }

    fn enter(&self, input: &'s str) -> Result<DepthGuard<'_>, nom::Err<Error<&'s str>>> {
        let depth = self.depth.get();
        if depth >= MAX_DEPTH {
            if self.too_deep.get().is_none() {
                self.too_deep.set(Some(self.offset(input)));
            }
            return Err(nom::Err::Failure(Error::new(input, ErrorKind::TooLarge)));
        }
        self.depth.set(depth + 1);
        Ok(DepthGuard(&self.depth))
    }

    fn node(&self, kind: ExprKind, start: usize, rest: &'s str) -> Expr {
        let end = self.offset(rest);
        Expr {
            kind,
            span: self.span_between(start, end),
            raw: Some(self.source[start..end].to_string()),
        }
    }

    // --- Expression levels ---

    fn pipeline(&self, input: &'s str) -> PResult<'s, Expr> {
        let input = input.trim_start();
        let _level = self.enter(input)?;
        let start = self.offset(input);
        let (mut input, source) = self.ternary(input)?;
        let mut filters = Vec::new();
        while let Ok((after_pipe, _)) = pipe(input) {
            let (rest, call) = self.filter_call(after_pipe)?;
            filters.push(call);
            input = rest;
        }
        if filters.is_empty() {
            return Ok((input, source));
        }
        let kind = ExprKind::Filter {
            source: Box::new(source),
            filters,
        };
        Ok((input, self.node(kind, start, input)))
    }

    fn filter_call(&self, input: &'s str) -> PResult<'s, FilterCall> {
        let input = input.trim_start();
        let start = self.offset(input);
        let (rest, name) = identifier(input)?;
        let (rest, args) = match rest.trim_start().strip_prefix('(') {
            Some(args_input) => self.arguments(args_input, ")")?,
            None => (rest, Vec::new()),
        };
        let call = FilterCall {
            name: name.to_string(),
            args,
            span: self.span_between(start, self.offset(rest)),
        };
        Ok((rest, call))
    }

    fn ternary(&self, input: &'s str) -> PResult<'s, Expr> {
        let input = input.trim_start();
        let start = self.offset(input);
        let (rest, condition) = self.or_expr(input)?;
        let Ok((after_question, _)) = symbol(rest, "?") else {
            return Ok((rest, condition));
        };
        let (rest, then_branch) = self.pipeline(after_question)?;
        let (rest, _) = symbol(rest, ":")?;
        let _level = self.enter(rest)?;
        let (rest, else_branch) = self.ternary(rest)?;
        let kind = ExprKind::Ternary {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        };
        Ok((rest, self.node(kind, start, rest)))
    }

    fn binary_level(
        &self,
        input: &'s str,
        operand: fn(&Self, &'s str) -> PResult<'s, Expr>,
        operator: fn(&'s str) -> PResult<'s, BinaryOperator>,
    ) -> PResult<'s, Expr> {
        let input = input.trim_start();
        let start = self.offset(input);
        let (mut input, mut left) = operand(self, input)?;
        // Each operator wraps the chain so far one level deeper.
        let mut levels = Vec::new();
        while let Ok((after_op, op)) = operator(input.trim_start()) {
            levels.push(self.enter(after_op)?);
            let (rest, right) = operand(self, after_op)?;
            let kind = ExprKind::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
            left = self.node(kind, start, rest);
            input = rest;
        }
        Ok((input, left))
    }

    fn or_expr(&self, input: &'s str) -> PResult<'s, Expr> {
        self.binary_level(input, Self::and_expr, or_op)
    }

    fn and_expr(&self, input: &'s str) -> PResult<'s, Expr> {
        self.binary_level(input, Self::equality_expr, and_op)
    }

    fn equality_expr(&self, input: &'s str) -> PResult<'s, Expr> {
        self.binary_level(input, Self::relational_expr, equality_op)
    }

    fn relational_expr(&self, input: &'s str) -> PResult<'s, Expr> {
        self.binary_level(input, Self::additive_expr, relational_op)
    }

    fn additive_expr(&self, input: &'s str) -> PResult<'s, Expr> {
        self.binary_level(input, Self::multiplicative_expr, additive_op)
    }

    fn multiplicative_expr(&self, input: &'s str) -> PResult<'s, Expr> {
        self.binary_level(input, Self::unary_expr, multiplicative_op)
    }

    fn unary_expr(&self, input: &'s str) -> PResult<'s, Expr> {
        let input = input.trim_start();
        let start = self.offset(input);
        let op = match input.chars().next() {
            Some('!') => UnaryOperator::Not,
            Some('-') => UnaryOperator::Minus,
            Some('+') => UnaryOperator::Plus,
            _ => return self.postfix_expr(input),
        };
        let _level = self.enter(input)?;
        let (rest, operand) = self.unary_expr(&input[1..])?;
        let kind = ExprKind::UnaryOp {
            op,
            operand: Box::new(operand),
        };
        Ok((rest, self.node(kind, start, rest)))
    }

    /// A primary followed by any number of `.name(args)` method calls and,
    /// while the expression is still a variable path, `.name` / `[expr]` lookups.
    fn postfix_expr(&self, input: &'s str) -> PResult<'s, Expr> {
        let input = input.trim_start();
        let start = self.offset(input);
        let (mut input, mut expr) = self.primary_expr(input)?;
        let mut levels = Vec::new();
        loop {
            if let Ok((after_name, name)) = preceded(char('.'), identifier).parse(input)
                && let Some(args_input) = after_name.trim_start().strip_prefix('(')
            {
                levels.push(self.enter(input)?);
                let (rest, mut args) = self.arguments(args_input, ")")?;
                args.insert(0, expr);
                let kind = ExprKind::FunctionCall {
                    name: name.to_string(),
                    args,
                };
                expr = self.node(kind, start, rest);
                input = rest;
                continue;
            }
            if !matches!(expr.kind, ExprKind::Variable { .. }) {
                break;
            }
            let Some((rest, segment)) = self.path_segment(input)? else {
                break;
            };
            if let ExprKind::Variable { path, .. } = &mut expr.kind {
                path.push(segment);
            }
            let end = self.offset(rest);
            expr.span = self.span_between(start, end);
            expr.raw = Some(self.source[start..end].to_string());
            input = rest;
        }
        Ok((input, expr))
    }

    fn path_segment(
        &self,
        input: &'s str,
    ) -> Result<Option<(&'s str, PathSegment)>, nom::Err<Error<&'s str>>> {
        if let Ok((rest, name)) = preceded(char('.'), identifier).parse(input) {
            return Ok(Some((rest, PathSegment::Property(name.to_string()))));
        }
        if let Some(index_input) = input.strip_prefix('[') {
            let (rest, index) = self.pipeline(index_input)?;
            let (rest, _) = symbol(rest, "]")?;
            return Ok(Some((rest, PathSegment::Index(index))));
        }
        Ok(None)
    }

    fn primary_expr(&self, input: &'s str) -> PResult<'s, Expr> {
        let input = input.trim_start();
        let start = self.offset(input);
        let (rest, kind) = match input.chars().next() {
            Some('(') => {
                let (rest, inner) = self.pipeline(&input[1..])?;
                let (rest, _) = symbol(rest, ")")?;
                (rest, ExprKind::Paren(Box::new(inner)))
            }
            Some('[') => {
                let (rest, items) = self.arguments(&input[1..], "]")?;
                (rest, ExprKind::Array(items))
            }
            Some('{') => {
                let (rest, entries) = self.object_entries(&input[1..])?;
                (rest, ExprKind::Object(entries))
            }
            Some('"' | '\'') => {
                let (rest, s) = string_literal(input)?;
                (rest, ExprKind::Literal(Literal::String(s)))
            }
            Some(c) if c.is_ascii_digit() => {
                let (rest, n) = number(input)?;
                (rest, ExprKind::Literal(Literal::Number(n)))
            }
            _ => {
                let (rest, name) = identifier(input)?;
                match name {
                    "true" => (rest, ExprKind::Literal(Literal::Bool(true))),
                    "false" => (rest, ExprKind::Literal(Literal::Bool(false))),
                    "null" => (rest, ExprKind::Literal(Literal::Null)),
                    _ => match rest.trim_start().strip_prefix('(') {
                        Some(args_input) => {
                            let (rest, args) = self.arguments(args_input, ")")?;
                            let kind = ExprKind::FunctionCall {
                                name: name.to_string(),
                                args,
                            };
                            (rest, kind)
                        }
                        None => {
                            let kind = ExprKind::Variable {
                                name: name.to_string(),
                                path: Vec::new(),
                            };
                            (rest, kind)
                        }
                    },
                }
            }
        };
        Ok((rest, self.node(kind, start, rest)))
    }

    /// A comma separated list of expressions up to `close`. The opening
    /// bracket has already been consumed; a trailing comma is allowed.
    fn arguments(&self, input: &'s str, close: &'static str) -> PResult<'s, Vec<Expr>> {
        let mut items = Vec::new();
        let mut input = input;
        loop {
            if let Ok((rest, _)) = symbol(input, close) {
                return Ok((rest, items));
            }
            let (rest, item) = self.pipeline(input)?;
            items.push(item);
            input = rest;
            match symbol(input, ",") {
                Ok((rest, _)) => input = rest,
                Err(_) => {
                    let (rest, _) = symbol(input, close)?;
                    return Ok((rest, items));
                }
            }
        }
    }

    fn object_entries(&self, input: &'s str) -> PResult<'s, Vec<(String, Expr)>> {
        let mut entries = Vec::new();
        let mut input = input;
        loop {
            if let Ok((rest, _)) = symbol(input, "}") {
                return Ok((rest, entries));
            }
            let key_input = input.trim_start();
            let (rest, key) = match key_input.chars().next() {
                Some('"' | '\'') => string_literal(key_input)?,
                _ => map(identifier, str::to_string).parse(key_input)?,
            };
            let (rest, _) = symbol(rest, ":")?;
            let (rest, value) = self.pipeline(rest)?;
            entries.push((key, value));
            input = rest;
            match symbol(input, ",") {
                Ok((rest, _)) => input = rest,
                Err(_) => {
                    let (rest, _) = symbol(input, "}")?;
                    return Ok((rest, entries));
                }
            }
        }
    }
}

// --- Lexical parsers ---

fn symbol<'s>(input: &'s str, sym: &'static str) -> PResult<'s, &'s str> {
    tag(sym).parse(input.trim_start())
}

/// A filter pipe: a single `|` that is not part of `||`.
fn pipe(input: &str) -> PResult<'_, char> {
    preceded(multispace0, terminated(char('|'), not(char('|')))).parse(input)
}

pub(crate) fn identifier(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn number(input: &str) -> PResult<'_, f64> {
    map_res(
        recognize((
            digit1,
            opt((char('.'), digit1)),
            opt((one_of("eE"), opt(one_of("+-")), digit1)),
        )),
        |s: &str| s.parse::<f64>(),
    )
    .parse(input)
}

/// A single or double quoted string with backslash escapes.
fn string_literal(input: &str) -> PResult<'_, String> {
    let mut chars = input.char_indices();
    let quote = match chars.next() {
        Some((_, q @ ('"' | '\''))) => q,
        _ => return Err(nom::Err::Error(Error::new(input, ErrorKind::Char))),
    };
    let mut out = String::new();
    let mut escaped = false;
    for (idx, c) in chars {
        if escaped {
            out.push(match c {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                '0' => '\0',
                other => other,
            });
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Ok((&input[idx + c.len_utf8()..], out));
        } else {
            out.push(c);
        }
    }
    Err(nom::Err::Failure(Error::new(input, ErrorKind::Char)))
}

// --- Operators ---

fn or_op(input: &str) -> PResult<'_, BinaryOperator> {
    map(tag("||"), |_| BinaryOperator::Or).parse(input)
}

fn and_op(input: &str) -> PResult<'_, BinaryOperator> {
    map(tag("&&"), |_| BinaryOperator::And).parse(input)
}

fn equality_op(input: &str) -> PResult<'_, BinaryOperator> {
    alt((
        map(tag("==="), |_| BinaryOperator::StrictEqual),
        map(tag("!=="), |_| BinaryOperator::StrictNotEqual),
        map(tag("=="), |_| BinaryOperator::Equal),
        map(tag("!="), |_| BinaryOperator::NotEqual),
    ))
    .parse(input)
}

fn relational_op(input: &str) -> PResult<'_, BinaryOperator> {
    alt((
        map(tag("<="), |_| BinaryOperator::LessOrEqual),
        map(tag(">="), |_| BinaryOperator::GreaterOrEqual),
        map(char('<'), |_| BinaryOperator::Less),
        map(char('>'), |_| BinaryOperator::Greater),
    ))
    .parse(input)
}

fn additive_op(input: &str) -> PResult<'_, BinaryOperator> {
    alt((
        map(char('+'), |_| BinaryOperator::Add),
        map(char('-'), |_| BinaryOperator::Subtract),
    ))
    .parse(input)
}

fn multiplicative_op(input: &str) -> PResult<'_, BinaryOperator> {
    alt((
        map(char('*'), |_| BinaryOperator::Multiply),
        map(char('/'), |_| BinaryOperator::Divide),
        map(char('%'), |_| BinaryOperator::Modulo),
    ))
    .parse(input)
}
