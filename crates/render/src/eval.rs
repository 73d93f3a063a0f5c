//! Expression evaluation.
//!
//! Every function returns `Err` only to abort the render: either an error
//! promoted by `throw_on_error` or a fatal one. Recoverable problems are
//! reported on the context and evaluation continues with a fallback value.
use crate::context::RenderContext;
use crate::error::RenderError;
use quill_query::lookup;
use quill_syntax::{BinaryOperator, Expr, ExprKind, FilterCall, Literal, PathSegment, UnaryOperator};
use quill_types::{Object, Value, parse_number};
use std::borrow::Cow;
use std::cmp::Ordering;

pub(crate) type Eval = Result<Value, RenderError>;

enum Step<'e> {
    Property(&'e str),
    Key(Value),
}

pub(crate) fn evaluate(expr: &Expr, ctx: &mut RenderContext<'_>) -> Eval {
    match &expr.kind {
        ExprKind::Literal(literal) => Ok(match literal {
            Literal::String(s) => Value::String(s.clone()),
            Literal::Number(n) => Value::Number(*n),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Null => Value::Null,
        }),
        ExprKind::Variable { name, path } => variable(expr, name, path, ctx),
        ExprKind::Filter { source, filters } => {
            let value = evaluate(source, ctx)?;
            filters
                .iter()
                .try_fold(value, |value, filter| apply_filter(filter, value, ctx))
        }
        ExprKind::FunctionCall { name, args } => call_function(expr, name, args, ctx),
        ExprKind::BinaryOp { op, left, right } => binary(expr, *op, left, right, ctx),
        ExprKind::UnaryOp { op, operand } => {
            let value = evaluate(operand, ctx)?;
            Ok(match (op, value) {
                (UnaryOperator::Not, value) => Value::Bool(!value.is_truthy()),
                (UnaryOperator::Minus, Value::Number(n)) => Value::Number(-n),
                (UnaryOperator::Minus | UnaryOperator::Plus, value) => value,
            })
        }
        ExprKind::Array(items) => items
            .iter()
            .map(|item| evaluate(item, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        ExprKind::Object(entries) => {
            let mut object = Object::with_capacity(entries.len());
            for (key, value) in entries {
                object.insert(key.clone(), evaluate(value, ctx)?);
            }
            Ok(Value::Object(object))
        }
        ExprKind::Paren(inner) => evaluate(inner, ctx),
        ExprKind::Ternary {
            condition,
            then_branch,
            else_branch,
        } => {
            if evaluate(condition, ctx)?.is_truthy() {
                evaluate(then_branch, ctx)
            } else {
                evaluate(else_branch, ctx)
            }
        }
        // Already reported by the parser.
        ExprKind::Error { message } => {
            log::debug!("skipping malformed expression at {}: {}", expr.span.start, message);
            Ok(Value::Undefined)
        }
    }
}

fn source_text(expr: &Expr, fallback: &str) -> String {
    expr.raw
        .as_deref()
        .map(str::trim)
        .unwrap_or(fallback)
        .to_string()
}

fn variable(expr: &Expr, name: &str, path: &[PathSegment], ctx: &mut RenderContext<'_>) -> Eval {
    let steps = path
        .iter()
        .map(|segment| match segment {
            PathSegment::Property(property) => Ok(Step::Property(property)),
            PathSegment::Index(index) => evaluate(index, ctx).map(Step::Key),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let Some(root) = ctx.lookup(name) else {
        ctx.report(RenderError::undefined_variable(name).at(expr.span))?;
        return Ok(Value::Undefined);
    };
    let mut current = Cow::Borrowed(root);
    for step in &steps {
        if current.is_nullish() {
            return Ok(Value::Undefined);
        }
        current = match current {
            Cow::Borrowed(value) => walk(value, step),
            Cow::Owned(value) => Cow::Owned(walk(&value, step).into_owned()),
        };
    }
    Ok(current.into_owned())
}

fn walk<'v>(value: &'v Value, step: &Step<'_>) -> Cow<'v, Value> {
    match step {
        Step::Property(name) => lookup::property(value, name),
        Step::Key(key) => lookup::index(value, key),
    }
}

fn arguments(args: &[Expr], ctx: &mut RenderContext<'_>) -> Result<Vec<Value>, RenderError> {
    args.iter().map(|arg| evaluate(arg, ctx)).collect()
}

/// Applies one filter. A failing filter is reported and the input passes through.
fn apply_filter(filter: &FilterCall, value: Value, ctx: &mut RenderContext<'_>) -> Eval {
    let args = arguments(&filter.args, ctx)?;
    if ctx.options().debug {
        log::debug!("filter {} at {} with {} argument(s)", filter.name, filter.span.start, args.len());
    }
    match ctx.registry().call(&filter.name, &value, &args) {
        Ok(result) => Ok(result),
        Err(e) => {
            ctx.report(RenderError::filter_error(&filter.name, e.message, &filter.name).at(filter.span))?;
            Ok(value)
        }
    }
}

/// `name(a, b)` passes `a` as the input value and `b` onward as arguments.
fn call_function(expr: &Expr, name: &str, args: &[Expr], ctx: &mut RenderContext<'_>) -> Eval {
    let mut values = arguments(args, ctx)?;
    let input = if values.is_empty() {
        Value::Undefined
    } else {
        values.remove(0)
    };
    if ctx.options().debug {
        log::debug!("call {} at {}", name, expr.span.start);
    }
    match ctx.registry().call(name, &input, &values) {
        Ok(result) => Ok(result),
        Err(e) => {
            let path = source_text(expr, name);
            ctx.report(RenderError::filter_error(name, e.message, path).at(expr.span))?;
            Ok(Value::Undefined)
        }
    }
}

fn binary(
    expr: &Expr,
    op: BinaryOperator,
    left: &Expr,
    right: &Expr,
    ctx: &mut RenderContext<'_>,
) -> Eval {
    let lhs = evaluate(left, ctx)?;
    // Logical operators yield the deciding operand and skip the other side.
    match op {
        BinaryOperator::And if !lhs.is_truthy() => return Ok(lhs),
        BinaryOperator::Or if lhs.is_truthy() => return Ok(lhs),
        _ => {}
    }
    let rhs = evaluate(right, ctx)?;
    Ok(match op {
        BinaryOperator::And | BinaryOperator::Or => rhs,
        BinaryOperator::Equal => Value::Bool(lhs.loose_eq(&rhs)),
        BinaryOperator::NotEqual => Value::Bool(!lhs.loose_eq(&rhs)),
        BinaryOperator::StrictEqual => Value::Bool(lhs.strict_eq(&rhs)),
        BinaryOperator::StrictNotEqual => Value::Bool(!lhs.strict_eq(&rhs)),
        BinaryOperator::Less => ordered(&lhs, &rhs, Ordering::is_lt),
        BinaryOperator::LessOrEqual => ordered(&lhs, &rhs, Ordering::is_le),
        BinaryOperator::Greater => ordered(&lhs, &rhs, Ordering::is_gt),
        BinaryOperator::GreaterOrEqual => ordered(&lhs, &rhs, Ordering::is_ge),
        BinaryOperator::Add if concatenates(&lhs) || concatenates(&rhs) => {
            Value::String(format!("{}{}", lhs, rhs))
        }
        BinaryOperator::Add
        | BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo => {
            let (Some(a), Some(b)) = (numeric(&lhs), numeric(&rhs)) else {
                let message = format!(
                    "cannot apply '{}' to {} and {}",
                    op.symbol(),
                    lhs.type_name(),
                    rhs.type_name()
                );
                ctx.report(RenderError::type_error(message, source_text(expr, op.symbol())).at(expr.span))?;
                return Ok(Value::Undefined);
            };
            Value::Number(match op {
                BinaryOperator::Add => a + b,
                BinaryOperator::Subtract => a - b,
                BinaryOperator::Multiply => a * b,
                BinaryOperator::Divide => a / b,
                _ => a % b,
            })
        }
    })
}

fn ordered(lhs: &Value, rhs: &Value, accept: fn(Ordering) -> bool) -> Value {
    Value::Bool(lhs.compare(rhs).is_some_and(accept))
}

/// `+` joins the stringified operands whenever either side is not a number.
fn concatenates(value: &Value) -> bool {
    !matches!(value, Value::Number(_))
}

/// The number an arithmetic operand stands for, if it has one.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::String(s) if !s.trim().is_empty() => {
            Some(parse_number(s)).filter(|n| !n.is_nan())
        }
        _ => None,
    }
}
