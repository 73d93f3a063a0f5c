//! Single-step lookups shared by path queries and the renderer's variable walk.
//!
//! Both callers resolve one segment at a time through these functions, so a
//! `user.tags[0]` path behaves the same whether it comes from a template
//! expression or from [`crate::query`].
use quill_types::{Value, format_number};
use std::borrow::Cow;

/// Reads a named property.
///
/// Objects answer by key. Arrays and strings answer `length`, and arrays also
/// accept a decimal index written as a name. Anything else is `Undefined`.
pub fn property<'v>(value: &'v Value, name: &str) -> Cow<'v, Value> {
    match value {
        Value::Object(map) => map
            .get(name)
            .map_or(Cow::Owned(Value::Undefined), Cow::Borrowed),
        Value::Array(items) if name == "length" => Cow::Owned(Value::from(items.len())),
        Value::Array(items) => name
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .map_or(Cow::Owned(Value::Undefined), Cow::Borrowed),
        Value::String(s) if name == "length" => Cow::Owned(Value::from(s.chars().count())),
        _ => Cow::Owned(Value::Undefined),
    }
}

/// Reads a computed key, as in `value[key]`.
pub fn index<'v>(value: &'v Value, key: &Value) -> Cow<'v, Value> {
    match key {
        Value::Number(n) => match value {
            Value::Array(items) => as_index(*n)
                .and_then(|i| items.get(i))
                .map_or(Cow::Owned(Value::Undefined), Cow::Borrowed),
            Value::String(s) => Cow::Owned(
                as_index(*n)
                    .and_then(|i| s.chars().nth(i))
                    .map_or(Value::Undefined, |c| Value::String(c.to_string())),
            ),
            _ => property(value, &format_number(*n)),
        },
        Value::String(name) => property(value, name),
        Value::Bool(_) => property(value, &key.to_string()),
        _ => Cow::Owned(Value::Undefined),
    }
}

fn as_index(n: f64) -> Option<usize> {
    (n >= 0.0 && n.fract() == 0.0 && n < usize::MAX as f64).then_some(n as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_property_on_objects_and_arrays() {
        let data = Value::from(json!({"a": {"b": 1}, "list": [10, 20, 30]}));
        assert_eq!(*property(&data, "a"), Value::from(json!({"b": 1})));
        assert_eq!(*property(&data, "missing"), Value::Undefined);

        let list = property(&data, "list").into_owned();
        assert_eq!(*property(&list, "length"), Value::Number(3.0));
        assert_eq!(*property(&list, "1"), Value::Number(20.0));
        assert_eq!(*property(&Value::from("héllo"), "length"), Value::Number(5.0));
        assert_eq!(*property(&Value::Number(1.0), "x"), Value::Undefined);
    }

    #[test]
    fn test_computed_index() {
        let list = Value::from(json!(["a", "b"]));
        assert_eq!(*index(&list, &Value::Number(1.0)), Value::from("b"));
        assert_eq!(*index(&list, &Value::Number(-1.0)), Value::Undefined);
        assert_eq!(*index(&list, &Value::Number(0.5)), Value::Undefined);
        assert_eq!(*index(&list, &Value::from("length")), Value::Number(2.0));

        let map = Value::from(json!({"1": "one", "true": "yes"}));
        assert_eq!(*index(&map, &Value::Number(1.0)), Value::from("one"));
        assert_eq!(*index(&map, &Value::Bool(true)), Value::from("yes"));
        assert_eq!(*index(&Value::from("abc"), &Value::Number(2.0)), Value::from("c"));
        assert_eq!(*index(&map, &Value::Null), Value::Undefined);
    }
}
