//! The tree walk over statement nodes and the `render` entry points.
use crate::context::RenderContext;
use crate::error::RenderError;
use crate::eval::evaluate;
use crate::options::RenderOptions;
use quill_query::FunctionRegistry;
use quill_syntax::{Expr, Node, NodeKind, Template};
use quill_types::{Object, Value};
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// The result of a render that ran to completion or failed softly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderOutput {
    pub output: String,
    pub errors: Vec<RenderError>,
    /// `true` when no error of any kind was recorded.
    pub success: bool,
}

/// Renders `template` against `data`.
///
/// Recoverable problems are collected in [`RenderOutput::errors`]. `Err` is
/// only returned when `throw_on_error` is set, carrying the first problem.
pub fn render(
    template: &Template,
    data: &Value,
    options: &RenderOptions,
    registry: &FunctionRegistry,
) -> Result<RenderOutput, RenderError> {
    let mut context = RenderContext::new(data, registry, options);
    render_with(template, &mut context)
}

/// Renders with a caller-supplied context, which stays inspectable afterwards.
///
/// Evaluation runs inside a single failure boundary: a fatal error, or a panic
/// raised by a registered handler, ends the render with empty output and one
/// `runtime_error`.
pub fn render_with(template: &Template, context: &mut RenderContext<'_>) -> Result<RenderOutput, RenderError> {
    let mut output = String::new();
    let walked = panic::catch_unwind(AssertUnwindSafe(|| {
        render_nodes(&template.children, context, &mut output)
    }));
    let halted = match walked {
        Ok(Ok(())) => None,
        Ok(Err(error)) => Some(error),
        Err(payload) => {
            let error = RenderError::runtime(
                format!("evaluation panicked: {}", panic_message(payload.as_ref())),
                "",
            );
            Some(context.halt(error))
        }
    };

    match halted {
        None => {
            let errors = context.take_errors();
            Ok(RenderOutput {
                success: errors.is_empty(),
                output,
                errors,
            })
        }
        Some(error) if context.options().throw_on_error => Err(error),
        Some(_) => Ok(RenderOutput {
            output: String::new(),
            errors: context.take_errors(),
            success: false,
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

fn render_nodes(nodes: &[Node], ctx: &mut RenderContext<'_>, out: &mut String) -> Result<(), RenderError> {
    for node in nodes {
        render_node(node, ctx, out)?;
    }
    Ok(())
}

fn render_node(node: &Node, ctx: &mut RenderContext<'_>, out: &mut String) -> Result<(), RenderError> {
    if ctx.options().debug {
        log::debug!("render {} at {}", node_label(&node.kind), node.span.start);
    }
    match &node.kind {
        NodeKind::Text(text) => out.push_str(text),
        NodeKind::Expression(expr) => {
            let value = evaluate(expr, ctx)?;
            emit(&value, ctx.options(), out);
        }
        NodeKind::If {
            condition,
            body,
            else_body,
        } => {
            if evaluate(condition, ctx)?.is_truthy() {
                render_nodes(body, ctx, out)?;
            } else if let Some(else_body) = else_body {
                render_nodes(else_body, ctx, out)?;
            }
        }
        NodeKind::For {
            iterator,
            iterable,
            body,
        } => render_for(node, iterator, iterable, body, ctx, out)?,
        NodeKind::Set { name, value } => {
            let value = evaluate(value, ctx)?;
            ctx.assign(name, value);
        }
        NodeKind::Block { body, .. } => render_nodes(body, ctx, out)?,
        NodeKind::Error { message, .. } => {
            log::debug!("skipping malformed node at {}: {}", node.span.start, message);
        }
    }
    Ok(())
}

fn emit(value: &Value, options: &RenderOptions, out: &mut String) {
    match value {
        Value::Undefined if options.include_undefined_vars => out.push_str(&options.undefined_value),
        value => out.push_str(&value.to_string()),
    }
}

fn render_for(
    node: &Node,
    iterator: &str,
    iterable: &Expr,
    body: &[Node],
    ctx: &mut RenderContext<'_>,
    out: &mut String,
) -> Result<(), RenderError> {
    let path = iterable.raw.as_deref().map(str::trim).unwrap_or(iterator).to_string();
    if ctx.scope_depth() >= ctx.options().max_depth {
        let message = format!("loop nesting exceeds the maximum depth of {}", ctx.options().max_depth);
        return ctx.report(RenderError::runtime(message, path).at(node.span));
    }
    let items = match evaluate(iterable, ctx)? {
        Value::Array(items) => items,
        other => {
            let message = format!("cannot iterate over a value of type {}", other.type_name());
            return ctx.report(RenderError::type_error(message, path).at(iterable.span));
        }
    };

    let length = items.len();
    for (i, item) in items.into_iter().enumerate() {
        if !ctx.tick() {
            let limit = ctx.options().max_iterations.unwrap_or_default();
            let message = format!("render exceeded the budget of {} loop iterations", limit);
            return Err(ctx.halt(RenderError::runtime(message, path).at(node.span)));
        }
        let mut frame = Object::with_capacity(2);
        frame.insert(iterator.to_string(), item);
        frame.insert("loop".to_string(), loop_object(i, length));
        let mut scope = ctx.enter(frame);
        render_nodes(body, &mut scope, out)?;
    }
    Ok(())
}

fn loop_object(i: usize, length: usize) -> Value {
    let mut info = Object::with_capacity(4);
    info.insert("index".to_string(), Value::from(i + 1));
    info.insert("first".to_string(), Value::Bool(i == 0));
    info.insert("last".to_string(), Value::Bool(i + 1 == length));
    info.insert("length".to_string(), Value::from(length));
    Value::Object(info)
}

fn node_label(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::Text(_) => "text",
        NodeKind::If { .. } => "if",
        NodeKind::For { .. } => "for",
        NodeKind::Set { .. } => "set",
        NodeKind::Block { .. } => "block",
        NodeKind::Expression(_) => "expression",
        NodeKind::Error { .. } => "error",
    }
}
