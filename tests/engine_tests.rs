mod common;

use common::{TestResult, init_logger};
use quill::{
    Category, Engine, EngineConfig, FunctionError, FunctionSignature, ParseErrorKind, QuillError,
    Value,
};
use serde_json::json;

#[test]
fn test_engine_from_json_config() -> TestResult {
    init_logger();
    let config = EngineConfig::from_json(
        r#"{
            "delimiters": { "statementOpen": "<%", "statementClose": "%>" },
            "render": { "includeUndefinedVars": true, "undefinedValue": "N/A" }
        }"#,
    )?;
    let engine = Engine::from_config(config)?;
    let out = engine.render_json(
        "<% for p in people %>{{ p.name }}={{ p.email }};<% endfor %>",
        &json!({ "people": [{ "name": "ada", "email": "a@x.io" }, { "name": "alan" }] }),
    )?;
    assert_eq!(out.output, "ada=a@x.io;alan=N/A;");
    // A missing property is silent, only missing roots are errors.
    assert!(out.success);
    Ok(())
}

#[test]
fn test_invalid_config_is_reported() {
    init_logger();
    assert!(matches!(
        Engine::from_config_json(r#"{"render": {"maxDepth": -1}}"#),
        Err(QuillError::Config(_))
    ));
    assert!(matches!(
        Engine::from_config_json(r#"{"delimiters": {"expressionOpen": ""}}"#),
        Err(QuillError::Lex(_))
    ));
}

#[test]
fn test_parse_errors_do_not_block_rendering() -> TestResult {
    init_logger();
    let engine = Engine::new();
    let template = engine.compile("Hello {% iff x %}{{ name }}{% endif %}!")?;

    let errors = template.parse_errors();
    assert!(!errors.is_empty());
    assert_eq!(errors[0].kind, ParseErrorKind::Syntax);
    assert_eq!(errors[0].suggestion.as_deref(), Some("did you mean `if`?"));

    let out = template.render(&Value::from(json!({ "name": "Ada" })))?;
    assert!(out.output.starts_with("Hello Ada"));

    assert!(matches!(template.ensure_valid(), Err(QuillError::Parse(_))));
    Ok(())
}

#[test]
fn test_custom_function_and_introspection() -> TestResult {
    init_logger();
    let engine = Engine::new().with_function(
        FunctionSignature::new("initials", Category::String, "First letter of every word")
            .returns("string")
            .example("'Ada Lovelace' | initials => 'AL'"),
        |value, _args| match value {
            Value::String(s) => Ok(Value::from(
                s.split_whitespace()
                    .filter_map(|w| w.chars().next())
                    .collect::<String>(),
            )),
            other => Err(FunctionError::new(
                "initials",
                format!("expected a string, got {}", other.type_name()),
            )),
        },
    );

    let out = engine.render_json("{{ who | initials }} {{ n | initials }}", &json!({ "who": "Ada Lovelace", "n": 5 }))?;
    assert_eq!(out.output, "AL 5");
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].filter.as_deref(), Some("initials"));

    let registry = engine.registry();
    assert!(registry.len() >= 71);
    let strings: Vec<&str> = registry
        .by_category(Category::String)
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert!(strings.contains(&"initials"));
    assert!(strings.contains(&"padStart"));

    let exported = serde_json::to_value(registry.signature("initials"))?;
    assert_eq!(exported["category"], json!("string"));
    assert_eq!(exported["returnType"], json!("string"));
    Ok(())
}

#[test]
fn test_every_category_is_populated() {
    init_logger();
    let engine = Engine::new();
    for category in Category::ALL {
        assert!(
            !engine.registry().by_category(category).is_empty(),
            "no functions in {}",
            category
        );
    }
}

#[test]
fn test_datetime_filters_in_templates() -> TestResult {
    init_logger();
    let out = Engine::new().render_json(
        "{{ ts | formatDate('%Y-%m-%d %H:%M') }} {{ ts | addDays(1) | weekday }} {{ ts | toISO }}",
        &json!({ "ts": 1_704_450_600_000_i64 }),
    )?;
    assert_eq!(out.output, "2024-01-05 10:30 6 2024-01-05T10:30:00.000Z");
    Ok(())
}

#[cfg(feature = "rayon")]
#[test]
fn test_render_many_matches_sequential() -> TestResult {
    init_logger();
    let template = Engine::new().compile(
        "{% for i in range(n) %}{{ i * factor }}{% if !loop.last %},{% endif %}{% endfor %}",
    )?;
    let contexts: Vec<Value> = (0..64)
        .map(|n| Value::from(json!({ "n": n % 7, "factor": n })))
        .collect();

    let parallel = template.render_many(&contexts);
    assert_eq!(parallel.len(), contexts.len());
    for (data, result) in contexts.iter().zip(parallel) {
        let sequential = template.render(data)?;
        assert_eq!(result?, sequential);
    }
    Ok(())
}
