//! A `nom`-based parser for query paths.
//!
//! A path is a dot/bracket chain (`a.b[0]["c d"][key]`) optionally followed by
//! a filter chain with literal arguments (`| trim | padStart(5, '*')`). Bracket
//! content is a decimal index, a quoted key, or a nested path whose value is
//! used as the key.
use crate::error::QueryError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{map, map_res, opt, recognize, value},
    multi::{many0, separated_list0},
    number::complete::recognize_float,
    sequence::{delimited, pair, preceded},
};
use quill_types::{Value, parse_number};
use std::fmt;

type PResult<'s, O> = IResult<&'s str, O>;

#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// `.name` or `["name"]`
    Property(String),
    /// `[3]`
    Index(usize),
    /// `[other.path]`, resolved against the query root.
    Variable(Vec<PathSegment>),
}

/// A filter applied to a query result.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFilter {
    pub name: String,
    pub args: Vec<Value>,
}

/// A parsed query string.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryPath {
    pub segments: Vec<PathSegment>,
    pub filters: Vec<QueryFilter>,
}

/// Parses a query string. The empty path addresses the root itself.
pub fn parse_path(path: &str) -> Result<QueryPath, QueryError> {
    match query_path(path.trim()) {
        Ok(("", parsed)) => Ok(parsed),
        Ok((rest, _)) => Err(QueryError::invalid_path(
            path,
            format!("unexpected input near '{}'", rest),
        )),
        Err(e) => Err(QueryError::invalid_path(path, e.to_string())),
    }
}

fn query_path(input: &str) -> PResult<'_, QueryPath> {
    map(
        pair(opt(segments), many0(preceded(ws(char('|')), filter))),
        |(segments, filters)| QueryPath {
            segments: segments.unwrap_or_default(),
            filters,
        },
    )
    .parse(input)
}

fn segments(input: &str) -> PResult<'_, Vec<PathSegment>> {
    let (input, first) = alt((bracket, map(name, property))).parse(input)?;
    let (input, rest) =
        many0(alt((preceded(char('.'), map(name, property)), bracket))).parse(input)?;
    let mut all = Vec::with_capacity(rest.len() + 1);
    all.push(first);
    all.extend(rest);
    Ok((input, all))
}

fn bracket(input: &str) -> PResult<'_, PathSegment> {
    delimited(
        pair(char('['), multispace0),
        alt((
            map_res(digit1, |digits: &str| digits.parse().map(PathSegment::Index)),
            map(quoted, PathSegment::Property),
            map(segments, PathSegment::Variable),
        )),
        pair(multispace0, char(']')),
    )
    .parse(input)
}

fn property(name: &str) -> PathSegment {
    PathSegment::Property(name.to_string())
}

/// Data keys may contain anything except path punctuation and whitespace.
fn name(input: &str) -> PResult<'_, &str> {
    take_while1(|c: char| !c.is_whitespace() && !".[]|(),'\"".contains(c)).parse(input)
}

fn quoted(input: &str) -> PResult<'_, String> {
    map(
        alt((
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
        )),
        str::to_string,
    )
    .parse(input)
}

fn filter(input: &str) -> PResult<'_, QueryFilter> {
    map(
        pair(
            identifier,
            opt(delimited(
                ws(char('(')),
                separated_list0(ws(char(',')), literal),
                ws(char(')')),
            )),
        ),
        |(name, args)| QueryFilter {
            name: name.to_string(),
            args: args.unwrap_or_default(),
        },
    )
    .parse(input)
}

fn identifier(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn literal(input: &str) -> PResult<'_, Value> {
    alt((
        map(quoted, Value::String),
        value(Value::Bool(true), tag("true")),
        value(Value::Bool(false), tag("false")),
        value(Value::Null, tag("null")),
        map(recognize_float, |n: &str| Value::Number(parse_number(n))),
    ))
    .parse(input)
}

fn ws<'s, O, P>(inner: P) -> impl Parser<&'s str, Output = O, Error = nom::error::Error<&'s str>>
where
    P: Parser<&'s str, Output = O, Error = nom::error::Error<&'s str>>,
{
    delimited(multispace0, inner, multispace0)
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Property(name) => f.write_str(name),
            PathSegment::Index(i) => write!(f, "[{}]", i),
            PathSegment::Variable(path) => {
                f.write_str("[")?;
                for (i, segment) in path.iter().enumerate() {
                    if i > 0 && matches!(segment, PathSegment::Property(_)) {
                        f.write_str(".")?;
                    }
                    write!(f, "{}", segment)?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop(name: &str) -> PathSegment {
        PathSegment::Property(name.to_string())
    }

    #[test]
    fn test_dot_and_bracket_segments() {
        let parsed = parse_path("a.b[1]['c d'].e").unwrap();
        assert_eq!(
            parsed.segments,
            vec![prop("a"), prop("b"), PathSegment::Index(1), prop("c d"), prop("e")]
        );
        assert!(parsed.filters.is_empty());
    }

    #[test]
    fn test_nested_variable_in_brackets() {
        let parsed = parse_path("rows[ cursor.at ]").unwrap();
        assert_eq!(
            parsed.segments,
            vec![prop("rows"), PathSegment::Variable(vec![prop("cursor"), prop("at")])]
        );
    }

    #[test]
    fn test_dots_inside_quoted_brackets_are_not_split() {
        let parsed = parse_path(r#"config["x.y"]"#).unwrap();
        assert_eq!(parsed.segments, vec![prop("config"), prop("x.y")]);
    }

    #[test]
    fn test_filter_chain_with_literal_arguments() {
        let parsed = parse_path("user.name | trim | padStart(5, '*') | default(null, true, -1.5)").unwrap();
        assert_eq!(parsed.segments, vec![prop("user"), prop("name")]);
        let names: Vec<_> = parsed.filters.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["trim", "padStart", "default"]);
        assert_eq!(
            parsed.filters[1].args,
            vec![Value::Number(5.0), Value::from("*")]
        );
        assert_eq!(
            parsed.filters[2].args,
            vec![Value::Null, Value::Bool(true), Value::Number(-1.5)]
        );
    }

    #[test]
    fn test_empty_path_is_root() {
        assert_eq!(parse_path("").unwrap(), QueryPath::default());
        assert_eq!(parse_path("  ").unwrap(), QueryPath::default());
    }

    #[test]
    fn test_invalid_paths() {
        assert!(matches!(parse_path("a..b"), Err(QueryError::InvalidPath { .. })));
        assert!(matches!(parse_path("a[1"), Err(QueryError::InvalidPath { .. })));
        assert!(matches!(parse_path("a | "), Err(QueryError::InvalidPath { .. })));
    }

    #[test]
    fn test_segment_display() {
        let parsed = parse_path("a[b.c][2]").unwrap();
        let shown: Vec<String> = parsed.segments.iter().map(|s| s.to_string()).collect();
        assert_eq!(shown, vec!["a", "[b.c]", "[2]"]);
    }
}
