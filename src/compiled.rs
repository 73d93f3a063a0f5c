use crate::error::QuillError;
use quill_query::FunctionRegistry;
use quill_render::{RenderOptions, RenderOutput, render};
use quill_syntax::{ParseError, Template};
use quill_types::Value;
use std::sync::Arc;

/// A parsed template bound to the registry and options of the engine that
/// compiled it. Rendering never mutates it, so one instance can serve any
/// number of renders, concurrently if need be.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    ast: Template,
    parse_errors: Vec<ParseError>,
    registry: Arc<FunctionRegistry>,
    options: RenderOptions,
}

impl CompiledTemplate {
    pub(crate) fn new(
        ast: Template,
        parse_errors: Vec<ParseError>,
        registry: Arc<FunctionRegistry>,
        options: RenderOptions,
    ) -> Self {
        Self {
            ast,
            parse_errors,
            registry,
            options,
        }
    }

    pub fn ast(&self) -> &Template {
        &self.ast
    }

    /// Problems the parser recovered from. The tree is renderable regardless.
    pub fn parse_errors(&self) -> &[ParseError] {
        &self.parse_errors
    }

    /// Fails with every parse error if there were any.
    pub fn ensure_valid(self) -> Result<Self, QuillError> {
        if self.parse_errors.is_empty() {
            Ok(self)
        } else {
            Err(QuillError::Parse(self.parse_errors))
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn render(&self, data: &Value) -> Result<RenderOutput, QuillError> {
        self.render_with_options(data, &self.options)
    }

    /// Renders with one-off options instead of the compiled ones.
    pub fn render_with_options(
        &self,
        data: &Value,
        options: &RenderOptions,
    ) -> Result<RenderOutput, QuillError> {
        Ok(render(&self.ast, data, options, &self.registry)?)
    }

    /// Renders each data context independently on the rayon pool.
    ///
    /// Results come back in input order. Each render owns its own context, so
    /// one failing context does not affect the others.
    #[cfg(feature = "rayon")]
    pub fn render_many(&self, contexts: &[Value]) -> Vec<Result<RenderOutput, QuillError>> {
        use rayon::prelude::*;

        log::debug!("rendering {} contexts in parallel", contexts.len());
        contexts.par_iter().map(|data| self.render(data)).collect()
    }
}
