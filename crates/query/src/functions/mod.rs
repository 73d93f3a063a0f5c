//! The built-in function library.
//!
//! Handlers coerce their input permissively (numeric functions accept numeric
//! strings, string functions stringify anything) and only fail where no
//! sensible coercion exists, such as an array operation given a number.
mod array;
mod datetime;
mod number;
mod object;
mod string;

use crate::engine::{QueryOptions, query};
use crate::error::FunctionError;
use crate::registry::FunctionRegistry;
use quill_types::{Object, Value};

/// Largest string or array a single call may generate.
const MAX_GENERATED_LEN: usize = 1 << 20;

static UNDEFINED: Value = Value::Undefined;

pub(crate) fn register_builtins(registry: &mut FunctionRegistry) {
    string::register(registry);
    number::register(registry);
    datetime::register(registry);
    array::register(registry);
    object::register(registry);
}

fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&UNDEFINED)
}

fn given(args: &[Value], index: usize) -> bool {
    !arg(args, index).is_nullish()
}

fn number_or(args: &[Value], index: usize, default: f64) -> f64 {
    if given(args, index) {
        arg(args, index).to_number()
    } else {
        default
    }
}

fn string_or(args: &[Value], index: usize, default: &str) -> String {
    if given(args, index) {
        arg(args, index).to_string()
    } else {
        default.to_string()
    }
}

/// Reads a whole-number argument, truncating any fraction.
fn integer(function: &str, args: &[Value], index: usize, default: i64) -> Result<i64, FunctionError> {
    let n = number_or(args, index, default as f64);
    if n.is_finite() {
        Ok(n.trunc() as i64)
    } else {
        Err(FunctionError::new(
            function,
            format!("argument {} must be a number, got '{}'", index + 1, arg(args, index)),
        ))
    }
}

fn array<'v>(function: &str, value: &'v Value) -> Result<&'v [Value], FunctionError> {
    value.as_array().map(Vec::as_slice).ok_or_else(|| {
        FunctionError::new(function, format!("expected an array, got {}", value.type_name()))
    })
}

fn object<'v>(function: &str, value: &'v Value) -> Result<&'v Object, FunctionError> {
    value.as_object().ok_or_else(|| {
        FunctionError::new(function, format!("expected an object, got {}", value.type_name()))
    })
}

fn check_len(function: &str, len: usize) -> Result<(), FunctionError> {
    if len > MAX_GENERATED_LEN {
        return Err(FunctionError::new(
            function,
            format!("result of {} items exceeds the limit of {}", len, MAX_GENERATED_LEN),
        ));
    }
    Ok(())
}

/// Resolves a key path inside an element, `Undefined` when it is absent.
fn path_of(value: &Value, path: &str) -> Value {
    query(value, path, &QueryOptions::default()).unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::registry::FunctionRegistry;
    use quill_types::Value;
    use std::sync::LazyLock;

    static REGISTRY: LazyLock<FunctionRegistry> = LazyLock::new(FunctionRegistry::with_builtins);

    pub fn call(name: &str, value: serde_json::Value, args: &[serde_json::Value]) -> Value {
        try_call(name, value, args).unwrap_or_else(|e| panic!("{name} failed: {e}"))
    }

    pub fn try_call(
        name: &str,
        value: serde_json::Value,
        args: &[serde_json::Value],
    ) -> Result<Value, crate::FunctionError> {
        let args: Vec<Value> = args.iter().map(Value::from).collect();
        REGISTRY.call(name, &Value::from(value), &args)
    }

    pub fn v(value: serde_json::Value) -> Value {
        Value::from(value)
    }
}
