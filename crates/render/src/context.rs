//! Per-render mutable state: scope frames, `set` globals and collected errors.
use crate::error::RenderError;
use crate::options::RenderOptions;
use quill_query::FunctionRegistry;
use quill_types::{Object, Value};
use std::ops::{Deref, DerefMut};

/// State owned by exactly one render call.
pub struct RenderContext<'a> {
    data: &'a Value,
    registry: &'a FunctionRegistry,
    options: &'a RenderOptions,
    /// Loop frames, innermost last.
    frames: Vec<Object>,
    /// Bindings made by `set` outside any loop.
    globals: Object,
    errors: Vec<RenderError>,
    pushes: usize,
    pops: usize,
    iterations: u64,
}

impl<'a> RenderContext<'a> {
    pub fn new(data: &'a Value, registry: &'a FunctionRegistry, options: &'a RenderOptions) -> Self {
        Self {
            data,
            registry,
            options,
            frames: Vec::new(),
            globals: Object::new(),
            errors: Vec::new(),
            pushes: 0,
            pops: 0,
            iterations: 0,
        }
    }

    pub fn registry(&self) -> &'a FunctionRegistry {
        self.registry
    }

    pub fn options(&self) -> &'a RenderOptions {
        self.options
    }

    /// Finds a root binding: loop frames innermost first, then `set`
    /// globals, then the top level of the data.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .or_else(|| self.globals.get(name))
            .or_else(|| self.data.as_object().and_then(|map| map.get(name)))
    }

    /// Binds `name` in the innermost loop frame, or globally outside loops.
    pub fn assign(&mut self, name: &str, value: Value) {
        let target = self.frames.last_mut().unwrap_or(&mut self.globals);
        target.insert(name.to_string(), value);
    }

    /// Pushes a frame that is popped when the returned guard drops.
    pub fn enter(&mut self, frame: Object) -> FrameGuard<'_, 'a> {
        self.frames.push(frame);
        self.pushes += 1;
        FrameGuard { context: self }
    }

    pub fn scope_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn pushes(&self) -> usize {
        self.pushes
    }

    pub fn pops(&self) -> usize {
        self.pops
    }

    /// Counts one loop iteration against the budget. `false` once exhausted.
    pub(crate) fn tick(&mut self) -> bool {
        self.iterations += 1;
        self.options
            .max_iterations
            .is_none_or(|limit| self.iterations <= limit)
    }

    /// Records a non-fatal error, or hands it back when `throw_on_error` is set.
    pub fn report(&mut self, error: RenderError) -> Result<(), RenderError> {
        if self.options.throw_on_error {
            return Err(error);
        }
        log::debug!("render error recorded: {}", error);
        self.errors.push(error);
        Ok(())
    }

    /// Records an error that ends the render and returns it for propagation.
    pub(crate) fn halt(&mut self, error: RenderError) -> RenderError {
        log::warn!("render aborted: {}", error);
        self.errors.push(error.clone());
        error
    }

    pub fn errors(&self) -> &[RenderError] {
        &self.errors
    }

    pub(crate) fn take_errors(&mut self) -> Vec<RenderError> {
        std::mem::take(&mut self.errors)
    }
}

/// Keeps a loop frame on the stack for as long as it lives.
pub struct FrameGuard<'c, 'a> {
    context: &'c mut RenderContext<'a>,
}

impl<'a> Deref for FrameGuard<'_, 'a> {
    type Target = RenderContext<'a>;

    fn deref(&self) -> &Self::Target {
        self.context
    }
}

impl<'a> DerefMut for FrameGuard<'_, 'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.context
    }
}

impl Drop for FrameGuard<'_, '_> {
    fn drop(&mut self) {
        self.context.frames.pop();
        self.context.pops += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(name: &str, value: i64) -> Object {
        let mut frame = Object::new();
        frame.insert(name.to_string(), Value::from(value));
        frame
    }

    #[test]
    fn test_lookup_order() {
        let data = Value::from(json!({"x": "data", "y": "data"}));
        let registry = FunctionRegistry::new();
        let options = RenderOptions::default();
        let mut ctx = RenderContext::new(&data, &registry, &options);

        ctx.assign("y", Value::from("global"));
        assert_eq!(ctx.lookup("x"), Some(&Value::from("data")));
        assert_eq!(ctx.lookup("y"), Some(&Value::from("global")));
        {
            let mut outer = ctx.enter(frame("x", 1));
            let inner = outer.enter(frame("x", 2));
            assert_eq!(inner.lookup("x"), Some(&Value::Number(2.0)));
            assert_eq!(inner.scope_depth(), 2);
        }
        assert_eq!(ctx.lookup("x"), Some(&Value::from("data")));
        assert_eq!(ctx.lookup("nope"), None);
    }

    #[test]
    fn test_assign_targets_innermost_frame() {
        let data = Value::Null;
        let registry = FunctionRegistry::new();
        let options = RenderOptions::default();
        let mut ctx = RenderContext::new(&data, &registry, &options);
        {
            let mut scope = ctx.enter(Object::new());
            scope.assign("tmp", Value::Bool(true));
            assert_eq!(scope.lookup("tmp"), Some(&Value::Bool(true)));
        }
        assert_eq!(ctx.lookup("tmp"), None);
    }

    #[test]
    fn test_guard_pops_on_early_exit() {
        fn fails(ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
            let mut scope = ctx.enter(Object::new());
            scope.report(RenderError::runtime("boom", ""))?;
            Ok(())
        }
        let data = Value::Null;
        let registry = FunctionRegistry::new();
        let options = RenderOptions {
            throw_on_error: true,
            ..RenderOptions::default()
        };
        let mut ctx = RenderContext::new(&data, &registry, &options);
        assert!(fails(&mut ctx).is_err());
        assert_eq!(ctx.scope_depth(), 0);
        assert_eq!((ctx.pushes(), ctx.pops()), (1, 1));
    }
}
