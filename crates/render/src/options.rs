use serde::{Deserialize, Serialize};

/// Knobs for a single render call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    /// Abort on the first error instead of collecting it.
    pub throw_on_error: bool,
    /// Emit `undefined_value` where an expression evaluates to undefined.
    pub include_undefined_vars: bool,
    pub undefined_value: String,
    /// Deepest allowed loop nesting.
    pub max_depth: usize,
    /// Log every node and filter application at debug level.
    pub debug: bool,
    /// Total loop iterations allowed across the whole render. `None` is unbounded.
    pub max_iterations: Option<u64>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            throw_on_error: false,
            include_undefined_vars: false,
            undefined_value: String::new(),
            max_depth: 100,
            debug: false,
            max_iterations: None,
        }
    }
}
