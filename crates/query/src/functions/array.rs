use super::{arg, array, check_len, given, integer, number_or, path_of, string_or};
use crate::error::FunctionError;
use crate::registry::{Category, FunctionRegistry, FunctionSignature};
use indexmap::IndexMap;
use itertools::Itertools;
use quill_types::Value;
use std::cmp::Ordering;

fn sig(name: &str, description: &str) -> FunctionSignature {
    FunctionSignature::new(name, Category::Array, description).returns("array")
}

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register(
        sig("length", "Element count of an array, characters of a string, keys of an object")
            .returns("number")
            .example("[1, 2, 3] | length => 3"),
        length,
    );
    registry.register(sig("first", "First element").returns("any").example("[1, 2] | first => 1"), first);
    registry.register(sig("last", "Last element").returns("any").example("[1, 2] | last => 2"), last);
    registry.register(
        sig("join", "Joins stringified elements")
            .optional("separator", "string")
            .returns("string")
            .example("['a', 'b'] | join(' & ') => 'a & b'"),
        join,
    );
    registry.register(sig("sort", "Sorts ascending, stable").example("[3, 1, 2] | sort => [1, 2, 3]"), sort);
    registry.register(
        sig("sortBy", "Sorts elements by a key path")
            .param("key", "string")
            .optional("direction", "string")
            .example("users | sortBy('age', 'desc')"),
        sort_by,
    );
    registry.register(
        sig("reverse", "Reverses an array or a string").example("[1, 2, 3] | reverse => [3, 2, 1]"),
        reverse,
    );
    registry.register(
        sig("unique", "Drops repeated elements, keeping the first").example("[1, 1, 2] | unique => [1, 2]"),
        unique,
    );
    registry.register(
        sig("slice", "Elements from start up to end; negative positions count from the end")
            .param("start", "number")
            .optional("end", "number")
            .example("[1, 2, 3, 4] | slice(1, -1) => [2, 3]"),
        slice,
    );
    registry.register(
        sig("flatten", "Flattens one level of nesting").example("[[1], [2, [3]]] | flatten => [1, 2, [3]]"),
        flatten,
    );
    registry.register(
        sig("compact", "Drops falsy elements").example("[0, 1, '', 'a', null] | compact => [1, 'a']"),
        compact,
    );
    registry.register(sig("sum", "Numeric sum").returns("number").example("[1, 2, 3] | sum => 6"), sum);
    registry.register(sig("avg", "Arithmetic mean").returns("number").example("[1, 2, 3] | avg => 2"), avg);
    registry.register(
        sig("map", "Collects a key path from every element")
            .param("key", "string")
            .example("users | map('name')"),
        map,
    );
    registry.register(
        sig("filterBy", "Keeps elements whose key equals a value, or is truthy when no value is given")
            .param("key", "string")
            .optional("value", "any")
            .example("users | filterBy('active')"),
        filter_by,
    );
    registry.register(
        sig("groupBy", "Groups elements into an object keyed by a key path")
            .param("key", "string")
            .returns("object")
            .example("users | groupBy('team')"),
        group_by,
    );
    registry.register(
        sig("includes", "Tests for an element, or a substring when given a string")
            .param("item", "any")
            .returns("boolean")
            .example("[1, 2] | includes(2) => true"),
        includes,
    );
    registry.register(
        sig("take", "The first n elements").param("n", "number").example("[1, 2, 3] | take(2) => [1, 2]"),
        take,
    );
    registry.register(
        sig("range", "Numbers from the value up to, not including, end")
            .optional("end", "number")
            .optional("step", "number")
            .example("range(1, 4) => [1, 2, 3]")
            .example("3 | range => [0, 1, 2]"),
        range,
    );
}

fn length(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    let len = match value {
        Value::Array(items) => items.len(),
        Value::String(s) => s.chars().count(),
        Value::Object(map) => map.len(),
        Value::Undefined | Value::Null => 0,
        other => {
            return Err(FunctionError::new(
                "length",
                format!("a {} has no length", other.type_name()),
            ));
        }
    };
    Ok(Value::from(len))
}

fn first(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(match value {
        Value::String(s) => s.chars().next().map_or(Value::Undefined, |c| c.to_string().into()),
        other => array("first", other)?.first().cloned().unwrap_or_default(),
    })
}

fn last(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(match value {
        Value::String(s) => s.chars().last().map_or(Value::Undefined, |c| c.to_string().into()),
        other => array("last", other)?.last().cloned().unwrap_or_default(),
    })
}

fn join(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let separator = string_or(args, 0, ",");
    Ok(array("join", value)?.iter().join(&separator).into())
}

fn ordering(a: &Value, b: &Value) -> Ordering {
    a.compare(b).unwrap_or(Ordering::Equal)
}

fn sort(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    let mut items = array("sort", value)?.to_vec();
    items.sort_by(ordering);
    Ok(Value::Array(items))
}

fn sort_by(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let key = string_or(args, 0, "");
    let descending = match string_or(args, 1, "asc").as_str() {
        "asc" => false,
        "desc" => true,
        other => {
            return Err(FunctionError::new(
                "sortBy",
                format!("direction must be 'asc' or 'desc', got '{}'", other),
            ));
        }
    };
    let mut keyed: Vec<(Value, Value)> = array("sortBy", value)?
        .iter()
        .map(|item| (path_of(item, &key), item.clone()))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| {
        let order = ordering(a, b);
        if descending { order.reverse() } else { order }
    });
    Ok(Value::Array(keyed.into_iter().map(|(_, item)| item).collect()))
}

fn reverse(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(match value {
        Value::String(s) => s.chars().rev().collect::<String>().into(),
        other => Value::Array(array("reverse", other)?.iter().rev().cloned().collect()),
    })
}

fn unique(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    let mut seen: Vec<Value> = Vec::new();
    for item in array("unique", value)? {
        if !seen.iter().any(|kept| kept.strict_eq(item)) {
            seen.push(item.clone());
        }
    }
    Ok(Value::Array(seen))
}

fn relative(position: i64, len: usize) -> usize {
    let len = len as i64;
    if position < 0 {
        (len + position).max(0) as usize
    } else {
        position.min(len) as usize
    }
}

fn slice(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let bounds = |len: usize| -> Result<(usize, usize), FunctionError> {
        let start = relative(integer("slice", args, 0, 0)?, len);
        let end = relative(integer("slice", args, 1, len as i64)?, len);
        Ok((start, end.max(start)))
    };
    Ok(match value {
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (start, end) = bounds(chars.len())?;
            chars[start..end].iter().collect::<String>().into()
        }
        other => {
            let items = array("slice", other)?;
            let (start, end) = bounds(items.len())?;
            Value::Array(items[start..end].to_vec())
        }
    })
}

fn flatten(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    let mut flat = Vec::new();
    for item in array("flatten", value)? {
        match item {
            Value::Array(inner) => flat.extend(inner.iter().cloned()),
            other => flat.push(other.clone()),
        }
    }
    Ok(Value::Array(flat))
}

fn compact(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Array(
        array("compact", value)?.iter().filter(|item| item.is_truthy()).cloned().collect(),
    ))
}

fn sum(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Number(array("sum", value)?.iter().map(Value::to_number).sum()))
}

fn avg(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    let items = array("avg", value)?;
    if items.is_empty() {
        return Err(FunctionError::new("avg", "cannot average an empty array"));
    }
    let total: f64 = items.iter().map(Value::to_number).sum();
    Ok(Value::Number(total / items.len() as f64))
}

fn map(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let key = string_or(args, 0, "");
    Ok(Value::Array(array("map", value)?.iter().map(|item| path_of(item, &key)).collect()))
}

fn filter_by(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let key = string_or(args, 0, "");
    let expected = arg(args, 1);
    let by_value = args.len() > 1;
    let kept = array("filterBy", value)?
        .iter()
        .filter(|item| {
            let found = path_of(item, &key);
            if by_value { found.loose_eq(expected) } else { found.is_truthy() }
        })
        .cloned()
        .collect();
    Ok(Value::Array(kept))
}

fn group_by(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let key = string_or(args, 0, "");
    let mut groups: IndexMap<String, Vec<Value>> = IndexMap::new();
    for item in array("groupBy", value)? {
        groups.entry(path_of(item, &key).to_string()).or_default().push(item.clone());
    }
    Ok(Value::Object(
        groups.into_iter().map(|(name, items)| (name, Value::Array(items))).collect(),
    ))
}

fn includes(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let needle = arg(args, 0);
    Ok(match value {
        Value::String(s) => (given(args, 0) && s.contains(&needle.to_string())).into(),
        other => array("includes", other)?.iter().any(|item| item.strict_eq(needle)).into(),
    })
}

fn take(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let items = array("take", value)?;
    let n = integer("take", args, 0, 0)?.max(0) as usize;
    Ok(Value::Array(items.iter().take(n).cloned().collect()))
}

fn range(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let (start, end) = if given(args, 0) {
        (value.to_number(), number_or(args, 0, 0.0))
    } else {
        (0.0, value.to_number())
    };
    let step = number_or(args, 1, 1.0);
    if !start.is_finite() || !end.is_finite() || !step.is_finite() || step == 0.0 {
        return Err(FunctionError::new("range", "start, end and a non-zero step must be numbers"));
    }
    let count = ((end - start) / step).ceil().max(0.0);
    check_len("range", count as usize)?;
    Ok(Value::Array(
        (0..count as usize).map(|i| Value::Number(start + i as f64 * step)).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{call, try_call, v};
    use serde_json::json;

    #[test]
    fn test_length_and_ends() {
        assert_eq!(call("length", json!([1, 2, 3]), &[]), v(json!(3)));
        assert_eq!(call("length", json!("héllo"), &[]), v(json!(5)));
        assert_eq!(call("length", json!({"a": 1}), &[]), v(json!(1)));
        assert_eq!(call("length", json!(null), &[]), v(json!(0)));
        assert!(try_call("length", json!(4), &[]).is_err());
        assert_eq!(call("first", json!([1, 2]), &[]), v(json!(1)));
        assert_eq!(call("last", json!("abc"), &[]), v(json!("c")));
        assert_eq!(call("first", json!([]), &[]), quill_types::Value::Undefined);
    }

    #[test]
    fn test_array_only_operations_reject_scalars() {
        for name in ["join", "sort", "unique", "flatten", "sum", "map", "groupBy", "take"] {
            let err = try_call(name, json!(5), &[]).unwrap_err();
            assert_eq!(err.function, name);
        }
    }

    #[test]
    fn test_join_and_sort() {
        assert_eq!(call("join", json!(["a", 1, null]), &[json!(" & ")]), v(json!("a & 1 & ")));
        assert_eq!(call("join", json!([1, 2]), &[]), v(json!("1,2")));
        assert_eq!(call("sort", json!([3, 1, 2]), &[]), v(json!([1, 2, 3])));
        assert_eq!(call("sort", json!(["b", "a"]), &[]), v(json!(["a", "b"])));
    }

    #[test]
    fn test_key_path_operations() {
        let users = json!([
            {"name": "b", "age": 30, "team": "x", "active": true},
            {"name": "a", "age": 20, "team": "y", "active": false},
            {"name": "c", "age": 40, "team": "x"}
        ]);
        assert_eq!(call("map", users.clone(), &[json!("name")]), v(json!(["b", "a", "c"])));
        let sorted = call("sortBy", users.clone(), &[json!("age"), json!("desc")]);
        assert_eq!(call("map", sorted.to_json(), &[json!("name")]), v(json!(["c", "b", "a"])));
        let active = call("filterBy", users.clone(), &[json!("active")]);
        assert_eq!(active.as_array().map(Vec::len), Some(1));
        let team_x = call("filterBy", users.clone(), &[json!("team"), json!("x")]);
        assert_eq!(team_x.as_array().map(Vec::len), Some(2));
        let grouped = call("groupBy", users.clone(), &[json!("team")]);
        let keys: Vec<_> = grouped.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["x", "y"]);
        assert!(try_call("sortBy", users, &[json!("age"), json!("sideways")]).is_err());
    }

    #[test]
    fn test_reshaping() {
        assert_eq!(call("reverse", json!([1, 2, 3]), &[]), v(json!([3, 2, 1])));
        assert_eq!(call("reverse", json!("abc"), &[]), v(json!("cba")));
        assert_eq!(call("unique", json!([1, 1, "1", 2]), &[]), v(json!([1, "1", 2])));
        assert_eq!(call("slice", json!([1, 2, 3, 4]), &[json!(1), json!(-1)]), v(json!([2, 3])));
        assert_eq!(call("slice", json!([1, 2, 3]), &[json!(-2)]), v(json!([2, 3])));
        assert_eq!(call("slice", json!("hello"), &[json!(3), json!(1)]), v(json!("")));
        assert_eq!(call("flatten", json!([[1], [2, [3]], 4]), &[]), v(json!([1, 2, [3], 4])));
        assert_eq!(call("compact", json!([0, 1, "", "a", null]), &[]), v(json!([1, "a"])));
        assert_eq!(call("take", json!([1, 2, 3]), &[json!(2)]), v(json!([1, 2])));
    }

    #[test]
    fn test_aggregates() {
        assert_eq!(call("sum", json!([1, "2", 3]), &[]), v(json!(6)));
        assert_eq!(call("avg", json!([1, 2, 3]), &[]), v(json!(2)));
        assert!(try_call("avg", json!([]), &[]).is_err());
        assert_eq!(call("includes", json!([1, 2]), &[json!(2)]), v(json!(true)));
        assert_eq!(call("includes", json!("team"), &[json!("ea")]), v(json!(true)));
    }

    #[test]
    fn test_range() {
        assert_eq!(call("range", json!(1), &[json!(4)]), v(json!([1, 2, 3])));
        assert_eq!(call("range", json!(3), &[]), v(json!([0, 1, 2])));
        assert_eq!(call("range", json!(5), &[json!(0), json!(-2)]), v(json!([5, 3, 1])));
        assert_eq!(call("range", json!(4), &[json!(1)]), v(json!([])));
        assert!(try_call("range", json!(0), &[json!(10), json!(0)]).is_err());
        assert!(try_call("range", json!(0), &[json!(1e12)]).is_err());
    }
}
