#![allow(dead_code)]

use quill::{Engine, RenderErrorKind, RenderOutput, Value};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Renders `source` against JSON data with a default engine.
pub fn render(source: &str, data: serde_json::Value) -> Result<RenderOutput, quill::QuillError> {
    Engine::new().render(source, &Value::from(data))
}

/// Renders and returns only the output text.
pub fn render_text(source: &str, data: serde_json::Value) -> String {
    match render(source, data) {
        Ok(out) => out.output,
        Err(e) => panic!("render of {:?} failed: {}", source, e),
    }
}

pub fn error_kinds(out: &RenderOutput) -> Vec<RenderErrorKind> {
    out.errors.iter().map(|e| e.kind).collect()
}
