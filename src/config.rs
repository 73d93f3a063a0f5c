use quill_lexer::Delimiters;
use quill_render::RenderOptions;
use serde::{Deserialize, Serialize};

/// Engine-wide settings. Every field has a default, so partial JSON is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub delimiters: Delimiters,
    pub render: RenderOptions,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
