use super::{arg, object, path_of, string_or};
use crate::error::FunctionError;
use crate::registry::{Category, FunctionRegistry, FunctionSignature};
use quill_types::{Object, Value};

fn sig(name: &str, description: &str) -> FunctionSignature {
    FunctionSignature::new(name, Category::Object, description).returns("object")
}

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register(
        sig("keys", "Keys in insertion order").returns("array").example("{a: 1, b: 2} | keys => ['a', 'b']"),
        keys,
    );
    registry.register(
        sig("values", "Values in insertion order").returns("array").example("{a: 1, b: 2} | values => [1, 2]"),
        values,
    );
    registry.register(
        sig("entries", "Key/value pairs as `{key, value}` objects")
            .returns("array")
            .example("{a: 1} | entries => [{key: 'a', value: 1}]"),
        entries,
    );
    registry.register(
        sig("get", "Reads a key path, with an optional fallback")
            .param("path", "string")
            .optional("default", "any")
            .returns("any")
            .example("user | get('address.city', 'n/a')"),
        get,
    );
    registry.register(
        sig("has", "Tests whether a key is present")
            .param("key", "string")
            .returns("boolean")
            .example("{a: 1} | has('a') => true"),
        has,
    );
    registry.register(
        sig("pick", "Keeps only the named keys")
            .param("keys", "string")
            .example("{a: 1, b: 2} | pick('a') => {a: 1}"),
        pick,
    );
    registry.register(
        sig("omit", "Drops the named keys")
            .param("keys", "string")
            .example("{a: 1, b: 2} | omit('a') => {b: 2}"),
        omit,
    );
    registry.register(
        sig("merge", "Shallow merge; later objects win")
            .param("others", "object")
            .example("{a: 1} | merge({a: 2, b: 3}) => {a: 2, b: 3}"),
        merge,
    );
    registry.register(
        sig("json", "Serializes to JSON, pretty-printed when indent is positive")
            .optional("indent", "number")
            .returns("string")
            .example("{a: [1]} | json => '{\"a\":[1]}'"),
        json,
    );
    registry.register(
        sig("default", "Replaces null or undefined; with `true` also replaces any falsy value")
            .param("fallback", "any")
            .optional("falsy", "boolean")
            .returns("any")
            .example("missing | default('n/a') => 'n/a'"),
        default,
    );
    registry.register(
        sig("isEmpty", "True for null, undefined and empty strings, arrays and objects")
            .returns("boolean")
            .example("{} | isEmpty => true"),
        is_empty,
    );
}

fn keys(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Array(object("keys", value)?.keys().map(|k| Value::from(k.as_str())).collect()))
}

fn values(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Array(object("values", value)?.values().cloned().collect()))
}

fn entries(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    let pairs = object("entries", value)?
        .iter()
        .map(|(key, item)| {
            let mut entry = Object::new();
            entry.insert("key".to_string(), Value::from(key.as_str()));
            entry.insert("value".to_string(), item.clone());
            Value::Object(entry)
        })
        .collect();
    Ok(Value::Array(pairs))
}

fn get(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let found = path_of(value, &string_or(args, 0, ""));
    Ok(match found {
        Value::Undefined => arg(args, 1).clone(),
        found => found,
    })
}

fn has(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    Ok(object("has", value)?.contains_key(&string_or(args, 0, "")).into())
}

/// Key names given either as separate arguments or as one array.
fn key_names(args: &[Value]) -> Vec<String> {
    args.iter()
        .flat_map(|a| match a {
            Value::Array(items) => items.iter().map(Value::to_string).collect(),
            other => vec![other.to_string()],
        })
        .collect()
}

fn pick(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let names = key_names(args);
    let source = object("pick", value)?;
    Ok(Value::Object(
        source
            .iter()
            .filter(|(key, _)| names.contains(key))
            .map(|(key, item)| (key.clone(), item.clone()))
            .collect(),
    ))
}

fn omit(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let names = key_names(args);
    let source = object("omit", value)?;
    Ok(Value::Object(
        source
            .iter()
            .filter(|(key, _)| !names.contains(key))
            .map(|(key, item)| (key.clone(), item.clone()))
            .collect(),
    ))
}

fn merge(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let mut merged = object("merge", value)?.clone();
    for other in args {
        for (key, item) in object("merge", other)? {
            merged.insert(key.clone(), item.clone());
        }
    }
    Ok(Value::Object(merged))
}

fn json(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let data = value.to_json();
    let pretty = arg(args, 0).to_number() > 0.0;
    let text = if pretty {
        serde_json::to_string_pretty(&data)
    } else {
        serde_json::to_string(&data)
    }
    .map_err(|e| FunctionError::new("json", e.to_string()))?;
    Ok(text.into())
}

fn default(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let replace_falsy = arg(args, 1).is_truthy();
    let missing = value.is_nullish() || (replace_falsy && !value.is_truthy());
    Ok(if missing { arg(args, 0).clone() } else { value.clone() })
}

fn is_empty(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    let empty = match value {
        Value::Undefined | Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    };
    Ok(empty.into())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{call, try_call, v};
    use serde_json::json;

    #[test]
    fn test_keys_values_entries_keep_order() {
        let data = json!({"b": 1, "a": 2});
        assert_eq!(call("keys", data.clone(), &[]), v(json!(["b", "a"])));
        assert_eq!(call("values", data.clone(), &[]), v(json!([1, 2])));
        assert_eq!(
            call("entries", data, &[]),
            v(json!([{"key": "b", "value": 1}, {"key": "a", "value": 2}]))
        );
        assert!(try_call("keys", json!([1]), &[]).is_err());
    }

    #[test]
    fn test_get_and_has() {
        let user = json!({"address": {"city": "Oslo"}, "tags": ["a"]});
        assert_eq!(call("get", user.clone(), &[json!("address.city")]), v(json!("Oslo")));
        assert_eq!(call("get", user.clone(), &[json!("tags[0]")]), v(json!("a")));
        assert_eq!(call("get", user.clone(), &[json!("zip"), json!("n/a")]), v(json!("n/a")));
        assert_eq!(call("has", user.clone(), &[json!("tags")]), v(json!(true)));
        assert_eq!(call("has", user, &[json!("zip")]), v(json!(false)));
    }

    #[test]
    fn test_pick_omit_merge() {
        let data = json!({"a": 1, "b": 2, "c": 3});
        assert_eq!(call("pick", data.clone(), &[json!("a"), json!("c")]), v(json!({"a": 1, "c": 3})));
        assert_eq!(call("pick", data.clone(), &[json!(["b"])]), v(json!({"b": 2})));
        assert_eq!(call("omit", data.clone(), &[json!("a")]), v(json!({"b": 2, "c": 3})));
        assert_eq!(
            call("merge", json!({"a": 1}), &[json!({"a": 2, "b": 3}), json!({"c": 4})]),
            v(json!({"a": 2, "b": 3, "c": 4}))
        );
        assert!(try_call("merge", json!({}), &[json!(3)]).is_err());
    }

    #[test]
    fn test_json_and_defaults() {
        assert_eq!(call("json", json!({"a": [1, 2.5]}), &[]), v(json!(r#"{"a":[1,2.5]}"#)));
        assert_eq!(call("json", json!([1]), &[json!(2)]), v(json!("[\n  1\n]")));
        assert_eq!(call("default", json!(null), &[json!("n/a")]), v(json!("n/a")));
        assert_eq!(call("default", json!(""), &[json!("n/a")]), v(json!("")));
        assert_eq!(call("default", json!(""), &[json!("n/a"), json!(true)]), v(json!("n/a")));
        assert_eq!(call("default", json!(0), &[json!(5)]), v(json!(0)));
        assert_eq!(call("isEmpty", json!({}), &[]), v(json!(true)));
        assert_eq!(call("isEmpty", json!(" "), &[]), v(json!(false)));
    }
}
