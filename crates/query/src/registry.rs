//! Defines the registry of named functions and their introspection metadata.
use crate::error::FunctionError;
use quill_types::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A function handler: receives the piped value and the call arguments.
pub type Handler = dyn Fn(&Value, &[Value]) -> Result<Value, FunctionError> + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    String,
    Number,
    Datetime,
    Array,
    Object,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::String,
        Category::Number,
        Category::Datetime,
        Category::Array,
        Category::Object,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::String => "string",
            Category::Number => "number",
            Category::Datetime => "datetime",
            Category::Array => "array",
            Category::Object => "object",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub optional: bool,
}

/// Machine-readable description of a registered function, for tooling that
/// offers completion or documentation without calling anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSignature {
    pub name: String,
    pub category: Category,
    pub description: String,
    pub parameters: Vec<Parameter>,
    pub return_type: String,
    pub examples: Vec<String>,
}

impl FunctionSignature {
    pub fn new(name: &str, category: Category, description: &str) -> Self {
        Self {
            name: name.to_string(),
            category,
            description: description.to_string(),
            parameters: Vec::new(),
            return_type: "any".to_string(),
            examples: Vec::new(),
        }
    }

    pub fn param(mut self, name: &str, type_name: &str) -> Self {
        self.parameters.push(Parameter {
            name: name.to_string(),
            type_name: type_name.to_string(),
            optional: false,
        });
        self
    }

    pub fn optional(mut self, name: &str, type_name: &str) -> Self {
        self.parameters.push(Parameter {
            name: name.to_string(),
            type_name: type_name.to_string(),
            optional: true,
        });
        self
    }

    pub fn returns(mut self, type_name: &str) -> Self {
        self.return_type = type_name.to_string();
        self
    }

    pub fn example(mut self, example: &str) -> Self {
        self.examples.push(example.to_string());
        self
    }
}

#[derive(Clone)]
struct Entry {
    signature: FunctionSignature,
    handler: Arc<Handler>,
}

/// A registry holding every function callable from templates and queries.
///
/// Built once, then shared read-only (usually behind an `Arc`) by the
/// renderer and the [`crate::QueryEngine`].
#[derive(Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, Entry>,
}

impl FunctionRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Creates a registry holding the built-in library.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::functions::register_builtins(&mut registry);
        log::debug!("registered {} built-in functions", registry.len());
        registry
    }

    /// Registers a function, replacing any earlier one with the same name.
    pub fn register<F>(&mut self, signature: FunctionSignature, handler: F)
    where
        F: Fn(&Value, &[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        let name = signature.name.clone();
        let entry = Entry {
            signature,
            handler: Arc::new(handler),
        };
        if self.functions.insert(name.clone(), entry).is_some() {
            log::trace!("function '{}' replaced", name);
        }
    }

    /// Finds a handler by exact name.
    pub fn get(&self, name: &str) -> Option<&Arc<Handler>> {
        self.functions.get(name).map(|entry| &entry.handler)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Invokes `name` with `value` as its input.
    pub fn call(&self, name: &str, value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
        let handler = self
            .get(name)
            .ok_or_else(|| FunctionError::new(name, "unknown function"))?;
        handler(value, args)
    }

    pub fn signature(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.get(name).map(|entry| &entry.signature)
    }

    /// All signatures, ordered by category then name.
    pub fn signatures(&self) -> Vec<&FunctionSignature> {
        let mut all: Vec<_> = self.functions.values().map(|e| &e.signature).collect();
        all.sort_by(|a, b| (a.category, &a.name).cmp(&(b.category, &b.name)));
        all
    }

    pub fn by_category(&self, category: Category) -> Vec<&FunctionSignature> {
        self.signatures()
            .into_iter()
            .filter(|s| s.category == category)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.functions.len())
            .finish()
    }
}
