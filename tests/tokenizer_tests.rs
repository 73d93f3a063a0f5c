mod common;

use common::{TestResult, init_logger};
use quill::{Delimiters, Engine, LexError, Position, TokenKind, tokenize};

const BALANCED_TEMPLATES: &[&str] = &[
    "",
    "plain text only",
    "{{}}{%%}{##}",
    "Dear {{ user.name | title }},\n\n{% for o in orders %}- {{ o.id }}\n{% endfor %}",
    "{# a comment with {% and {{ inside #}after",
    "line one\r\nline two {{ x }}\r\n{% if y %}\r\n{% endif %}",
    "unicode: \u{e9}\u{e8} {{ '\u{1f600}' }} \u{4e2d}\u{6587}",
    "{{ a }}{{ b }}{{ c }}",
    "%} }} #} stray closers are text",
];

#[test]
fn test_token_contents_reproduce_source() -> TestResult {
    init_logger();
    for source in BALANCED_TEMPLATES {
        let tokens = tokenize(source, &Delimiters::default())?;
        let rebuilt: String = tokens.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(&rebuilt, source);
    }
    Ok(())
}

#[test]
fn test_token_positions_are_contiguous() -> TestResult {
    init_logger();
    for source in BALANCED_TEMPLATES {
        let tokens = tokenize(source, &Delimiters::default())?;
        for pair in tokens.windows(2) {
            assert_eq!(pair[0].end, pair[1].start, "gap in {:?}", source);
        }
        if let Some(first) = tokens.first() {
            assert_eq!(first.start, Position::START);
        }
    }
    Ok(())
}

#[test]
fn test_unclosed_expression_points_at_opening_marker() {
    init_logger();
    let err = tokenize("{{ x", &Delimiters::default()).unwrap_err();
    assert_eq!(
        err,
        LexError::UnclosedDelimiter {
            kind: TokenKind::Expression,
            position: Position::new(1, 0),
        }
    );
}

#[test]
fn test_unclosed_comment_after_valid_tags() {
    init_logger();
    let err = tokenize("{{ a }}\n{% if b %}\n  {# note", &Delimiters::default()).unwrap_err();
    assert_eq!(
        err,
        LexError::UnclosedDelimiter {
            kind: TokenKind::Comment,
            position: Position::new(3, 2),
        }
    );
}

#[test]
fn test_quoted_delimiter_still_splits_tag() -> TestResult {
    init_logger();
    // No string awareness in the scanner: the `}}` inside quotes closes the tag.
    let out = Engine::new().render_json("{{ '}}' }}", &serde_json::json!({}))?;
    assert!(!out.output.is_empty());
    Ok(())
}

#[test]
fn test_custom_delimiters_through_engine() -> TestResult {
    init_logger();
    let engine = Engine::new().with_delimiters(Delimiters {
        statement_open: "[%".into(),
        statement_close: "%]".into(),
        expression_open: "[[".into(),
        expression_close: "]]".into(),
        comment_open: "[#".into(),
        comment_close: "#]".into(),
    })?;
    let tokens = engine.tokenize("[# hidden #][% if on %][[ name ]][% endif %] {{ name }}")?;
    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Comment,
            TokenKind::Statement,
            TokenKind::Expression,
            TokenKind::Statement,
            TokenKind::Text,
        ]
    );

    let out = engine.render_json(
        "[# hidden #][% if on %][[ name ]][% endif %] {{ name }}",
        &serde_json::json!({ "on": true, "name": "quill" }),
    )?;
    assert_eq!(out.output, "quill {{ name }}");
    Ok(())
}

#[test]
fn test_long_markers() -> TestResult {
    init_logger();
    let delimiters = Delimiters {
        expression_open: "<<<".into(),
        expression_close: ">>>".into(),
        ..Default::default()
    };
    let tokens = tokenize("a<<< b >>>c", &delimiters)?;
    assert_eq!(tokens.len(), 3);
    assert_eq!(tokens[1].body, " b ");
    assert_eq!(tokens[2].start, Position::new(1, 10));
    Ok(())
}
