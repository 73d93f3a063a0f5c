mod common;

use common::{TestResult, error_kinds, init_logger, render, render_text};
use quill::{
    Engine, FunctionRegistry, RenderContext, RenderErrorKind, RenderOptions, Value, render_with,
};
use serde_json::json;

// ============================================================================
// Totality and purity
// ============================================================================

const MALFORMED_TEMPLATES: &[&str] = &[
    "{{ }}",
    "{% %}",
    "{% if %}{% endif %}",
    "{% for in %}{% endfor %}",
    "{% for x in %}{{ x }}",
    "{{ 1 + }}",
    "{% endfor %}{% else %}",
    "{{ a.b.c[d][0] | nope(1) | upper }}",
    "{{ [1, 2 }}",
    "{% set = %}",
    "{% set loop = 1 %}",
    "{{ 'unterminated }}",
    "{% if a %}{% for x in a %}{{ x }}",
    "{{ x() }}",
    "{{ 1 / 0 }} {{ 0 / 0 }}",
    "{{ -'a' }} {{ !{} }}",
    "{% block %}{% endblock %}{% block b %}{% endblock c %}",
    "{{ ((( }}",
    "{{ a ? b }}",
    "{% bogus stuff %}{% iff x %}",
    "{{ 'a' * 'b' }} {{ [1] - {} }}",
    "{{ 1 | avg }} {{ 'x' | range(1e12) }}",
];

#[test]
fn test_rendering_never_fails_in_lenient_mode() {
    init_logger();
    for source in MALFORMED_TEMPLATES {
        match render(source, json!({})) {
            Ok(out) => assert!(out.output.len() < 4096, "{:?}", source),
            Err(e) => panic!("{:?} failed to render: {}", source, e),
        }
    }
}

#[test]
fn test_deeply_nested_templates_render() -> TestResult {
    init_logger();
    let engine = Engine::new();

    let parens = format!("[{{{{ {}1{} }}}}]", "(".repeat(10_000), ")".repeat(10_000));
    let template = engine.compile(&parens)?;
    assert_eq!(template.parse_errors().len(), 1);
    assert_eq!(template.render(&Value::from(json!({})))?.output, "[]");

    let ifs = format!("{}x{}!", "{% if 1 %}".repeat(10_000), "{% endif %}".repeat(10_000));
    let template = engine.compile(&ifs)?;
    assert_eq!(template.parse_errors().len(), 1);
    assert_eq!(template.render(&Value::from(json!({})))?.output, "!");
    Ok(())
}

#[test]
fn test_rendering_is_pure() -> TestResult {
    init_logger();
    let template = Engine::new().compile(
        "{% for u in users | sortBy('age', 'desc') %}{{ loop.index }}:{{ u.name | upper }}{% if !loop.last %}, {% endif %}{% endfor %} {{ missing }}",
    )?;
    let data = Value::from(json!({
        "users": [
            { "name": "ada", "age": 36 },
            { "name": "alan", "age": 41 },
            { "name": "grace", "age": 85 }
        ]
    }));
    let first = template.render(&data)?;
    let second = template.render(&data)?;
    assert_eq!(first, second);
    assert_eq!(first.output, "1:GRACE, 2:ALAN, 3:ADA ");
    assert_eq!(error_kinds(&first), vec![RenderErrorKind::UndefinedVariable]);
    Ok(())
}

// ============================================================================
// Scoping
// ============================================================================

const NESTED_LOOPS: &str =
    "{% for a in xs %}{% for b in a %}{% for c in b %}{{ c }}{% endfor %}{% endfor %}{% endfor %}";

#[test]
fn test_nested_loops_leave_no_frames_behind() -> TestResult {
    init_logger();
    let template = Engine::new().compile(NESTED_LOOPS)?;
    let data = Value::from(json!({ "xs": [[[1, 2], [3]], [[4]]] }));
    let registry = FunctionRegistry::with_builtins();
    let options = RenderOptions::default();
    let mut context = RenderContext::new(&data, &registry, &options);

    let before = context.scope_depth();
    let out = render_with(template.ast(), &mut context)?;
    assert_eq!(out.output, "1234");
    assert_eq!(context.scope_depth(), before);
    assert_eq!(context.pushes(), 9);
    assert_eq!(context.pushes(), context.pops());
    Ok(())
}

#[test]
fn test_aborted_render_leaves_no_frames_behind() -> TestResult {
    init_logger();
    let template = Engine::new().compile(
        "{% for a in xs %}{% for b in a %}{{ b }}{{ nope }}{% endfor %}{% endfor %}",
    )?;
    let data = Value::from(json!({ "xs": [[1, 2], [3]] }));
    let registry = FunctionRegistry::with_builtins();
    let options = RenderOptions {
        throw_on_error: true,
        ..Default::default()
    };
    let mut context = RenderContext::new(&data, &registry, &options);

    let err = render_with(template.ast(), &mut context).unwrap_err();
    assert_eq!(err.kind, RenderErrorKind::UndefinedVariable);
    assert_eq!(context.scope_depth(), 0);
    assert_eq!(context.pushes(), 2);
    assert_eq!(context.pops(), 2);
    Ok(())
}

#[test]
fn test_loop_variable_does_not_escape() {
    init_logger();
    let out = render("{% for x in [1, 2] %}{{ x }}{% endfor %}[{{ x }}]", json!({})).unwrap();
    assert_eq!(out.output, "12[]");
    assert_eq!(error_kinds(&out), vec![RenderErrorKind::UndefinedVariable]);
}

// ============================================================================
// Truthiness and control flow
// ============================================================================

#[test]
fn test_if_truthiness_matrix() {
    init_logger();
    let source = "{% if v %}Y{% else %}N{% endif %}";
    for truthy in [json!(true), json!(1), json!("x"), json!([1]), json!({ "a": 1 })] {
        assert_eq!(render_text(source, json!({ "v": truthy })), "Y", "{}", truthy);
    }
    for falsy in [json!(false), json!(0), json!(""), json!(null), json!([]), json!({})] {
        assert_eq!(render_text(source, json!({ "v": falsy })), "N", "{}", falsy);
    }
    // undefined
    assert_eq!(render_text(source, json!({})), "N");
}

#[test]
fn test_elif_and_set() {
    init_logger();
    let source = "{% for n in [5, 50, 500] %}{% if n < 10 %}s{% elif n < 100 %}m{% else %}l{% endif %}{% endfor %}";
    assert_eq!(render_text(source, json!({})), "sml");

    let source = "{% set greeting = 'Hello, ' + name %}{{ greeting }}!";
    assert_eq!(render_text(source, json!({ "name": "Ada" })), "Hello, Ada!");
}

#[test]
fn test_iterating_a_string_is_type_error() {
    init_logger();
    let out = render("a{% for c in word %}{{ c }}{% endfor %}b", json!({ "word": "hey" })).unwrap();
    assert_eq!(out.output, "ab");
    assert!(!out.success);
    assert_eq!(out.errors[0].kind, RenderErrorKind::TypeError);
    assert_eq!(out.errors[0].path, "word");
}

// ============================================================================
// Filters and errors
// ============================================================================

#[test]
fn test_filters_apply_left_to_right() {
    init_logger();
    assert_eq!(render_text("{{ x | trim | upper }}", json!({ "x": " a " })), "A");
    assert_eq!(render_text("{{ x | upper | trim }}", json!({ "x": " a " })), "A");

    let pad_then_upper = render_text("{{ x | padStart(4, 'x') | upper }}", json!({ "x": "a" }));
    let upper_then_pad = render_text("{{ x | upper | padStart(4, 'x') }}", json!({ "x": "a" }));
    assert_eq!(pad_then_upper, "XXXA");
    assert_eq!(upper_then_pad, "xxxA");
}

#[test]
fn test_failing_filter_is_recorded_and_value_kept() {
    init_logger();
    let out = render("{{ xs | avg }}", json!({ "xs": [] })).unwrap();
    assert_eq!(out.output, "");
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].kind, RenderErrorKind::FilterError);
    assert_eq!(out.errors[0].filter.as_deref(), Some("avg"));
}

#[test]
fn test_missing_variable_renders_empty_with_one_error() {
    init_logger();
    let out = render("{{ missing }}", json!({})).unwrap();
    assert_eq!(out.output, "");
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].kind, RenderErrorKind::UndefinedVariable);
    assert_eq!(out.errors[0].path, "missing");
    assert!(!out.success);
}

#[test]
fn test_throw_on_error_through_engine() {
    init_logger();
    let engine = Engine::new().with_options(RenderOptions {
        throw_on_error: true,
        ..Default::default()
    });
    let err = engine
        .render_json("ok {{ 'a' | repeat(-1) }}", &json!({}))
        .unwrap_err();
    assert!(matches!(err, quill::QuillError::Render(ref e) if e.kind == RenderErrorKind::FilterError));
}

#[test]
fn test_errors_serialize_for_callers() -> TestResult {
    init_logger();
    let out = render("{{ nope }}", json!({}))?;
    let json = serde_json::to_value(&out)?;
    assert_eq!(json["success"], json!(false));
    assert_eq!(json["errors"][0]["kind"], json!("undefined_variable"));
    assert_eq!(json["errors"][0]["path"], json!("nope"));
    Ok(())
}

// ============================================================================
// A realistic document
// ============================================================================

#[test]
fn test_invoice_document() -> TestResult {
    init_logger();
    let source = "{% set total = items | map('price') | sum %}Invoice for {{ customer.name | title }}\n\
{% for item in items %}{{ loop.index }}. {{ item.name }} {{ item.price | toFixed(2) }}\n\
{% endfor %}Total: {{ total | toFixed(2) }}{% if total > 100 %} (free shipping){% endif %}";
    let data = json!({
        "customer": { "name": "ada lovelace" },
        "items": [
            { "name": "Pen", "price": 19.5 },
            { "name": "Lamp", "price": 90 }
        ]
    });
    let out = render(source, data)?;
    assert!(out.success, "{:?}", out.errors);
    assert_eq!(
        out.output,
        "Invoice for Ada Lovelace\n1. Pen 19.50\n2. Lamp 90.00\nTotal: 109.50 (free shipping)"
    );
    Ok(())
}
