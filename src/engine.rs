use crate::compiled::CompiledTemplate;
use crate::config::EngineConfig;
use crate::error::QuillError;
use quill_lexer::{Delimiters, Token, tokenize};
use quill_query::{FunctionError, FunctionRegistry, FunctionSignature, QueryEngine, QueryOptions};
use quill_render::{RenderOptions, RenderOutput};
use quill_syntax::{ParseResult, parse};
use quill_types::Value;
use std::sync::Arc;

/// The entry point tying the pipeline together:
/// `source -> tokens -> tree -> output`.
///
/// An `Engine` owns one function registry, shared by every template it
/// compiles and every query it runs, so a filter behaves the same in both.
///
/// ```
/// use quill::Engine;
/// use serde_json::json;
///
/// let engine = Engine::new();
/// let out = engine
///     .render_json("Hi {{ name | upper }}!", &json!({ "name": "ada" }))
///     .unwrap();
/// assert_eq!(out.output, "Hi ADA!");
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    delimiters: Delimiters,
    options: RenderOptions,
    registry: Arc<FunctionRegistry>,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            delimiters: Delimiters::default(),
            options: RenderOptions::default(),
            registry: Arc::new(FunctionRegistry::with_builtins()),
        }
    }
}

impl Engine {
    /// Creates an engine with default delimiters, default options and the built-in functions.
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_config(config: EngineConfig) -> Result<Self, QuillError> {
        config.delimiters.validate()?;
        Ok(Self {
            delimiters: config.delimiters,
            options: config.render,
            ..Default::default()
        })
    }

    /// Builds an engine from a JSON [`EngineConfig`].
    pub fn from_config_json(json: &str) -> Result<Self, QuillError> {
        Self::from_config(EngineConfig::from_json(json)?)
    }

    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Result<Self, QuillError> {
        delimiters.validate()?;
        self.delimiters = delimiters;
        Ok(self)
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the registry, e.g. with one shared between several engines.
    pub fn with_registry(mut self, registry: Arc<FunctionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Adds a function callable as a filter or a call from templates and queries.
    pub fn with_function<F>(mut self, signature: FunctionSignature, handler: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        self.register(signature, handler);
        self
    }

    /// Registers a function in place. Templates compiled earlier keep the
    /// registry they were compiled with.
    pub fn register<F>(&mut self, signature: FunctionSignature, handler: F)
    where
        F: Fn(&Value, &[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.registry).register(signature, handler);
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// A query engine over this engine's registry.
    pub fn query_engine(&self) -> QueryEngine {
        QueryEngine::new(Arc::clone(&self.registry))
    }

    pub fn tokenize(&self, source: &str) -> Result<Vec<Token>, QuillError> {
        Ok(tokenize(source, &self.delimiters)?)
    }

    /// Tokenizes and parses. Parse problems are returned next to the tree.
    pub fn parse(&self, source: &str) -> Result<ParseResult, QuillError> {
        let tokens = self.tokenize(source)?;
        Ok(parse(&tokens))
    }

    /// Parses `source` once for any number of later renders.
    pub fn compile(&self, source: &str) -> Result<CompiledTemplate, QuillError> {
        let ParseResult { ast, errors } = self.parse(source)?;
        if !errors.is_empty() {
            log::debug!("compiled template with {} parse error(s)", errors.len());
        }
        Ok(CompiledTemplate::new(
            ast,
            errors,
            Arc::clone(&self.registry),
            self.options.clone(),
        ))
    }

    pub fn render(&self, source: &str, data: &Value) -> Result<RenderOutput, QuillError> {
        self.compile(source)?.render(data)
    }

    /// Renders against JSON data.
    pub fn render_json(
        &self,
        source: &str,
        data: &serde_json::Value,
    ) -> Result<RenderOutput, QuillError> {
        self.render(source, &Value::from(data))
    }

    /// Resolves a path, with an optional trailing filter chain, against `data`.
    pub fn query(&self, data: &Value, path: &str, options: &QueryOptions) -> Result<Value, QuillError> {
        Ok(self.query_engine().query(data, path, options)?)
    }
}
