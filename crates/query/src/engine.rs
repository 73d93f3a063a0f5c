//! Path resolution against data values, with strict and lenient modes.
use crate::error::QueryError;
use crate::lookup;
use crate::path::{PathSegment, parse_path};
use crate::registry::FunctionRegistry;
use quill_types::Value;
use std::borrow::Cow;
use std::sync::Arc;

/// Controls how a query reacts to paths that do not resolve.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// Raise instead of falling back to `default_value`.
    pub strict: bool,
    pub default_value: Value,
    /// The longest path, in segments, that will be walked.
    pub max_depth: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            strict: false,
            default_value: Value::Undefined,
            max_depth: 100,
        }
    }
}

impl QueryOptions {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn with_default(default_value: impl Into<Value>) -> Self {
        Self {
            default_value: default_value.into(),
            ..Self::default()
        }
    }
}

/// Resolves a dot/bracket path against `data`.
///
/// Filter syntax is rejected here since there is no registry to dispatch to;
/// use [`QueryEngine::query`] for paths that carry a filter chain.
pub fn query(data: &Value, path: &str, options: &QueryOptions) -> Result<Value, QueryError> {
    let outcome = parse_path(path).and_then(|parsed| {
        if let Some(filter) = parsed.filters.first() {
            return Err(QueryError::invalid_path(
                path,
                format!("filter '{}' needs a QueryEngine to run", filter.name),
            ));
        }
        resolve_segments(data, &parsed.segments, path, options.max_depth)
    });
    settle(outcome, options)
}

/// Walks `segments` from `root`, failing at the first step that finds nothing.
///
/// `path` is only used for error messages.
pub fn resolve_segments(
    root: &Value,
    segments: &[PathSegment],
    path: &str,
    max_depth: usize,
) -> Result<Value, QueryError> {
    if segments.len() > max_depth {
        return Err(QueryError::DepthExceeded {
            path: path.to_string(),
            max_depth,
        });
    }
    let mut current = Cow::Borrowed(root);
    for segment in segments {
        current = match current {
            Cow::Borrowed(value) => step(root, value, segment, path, max_depth)?,
            Cow::Owned(value) => {
                Cow::Owned(step(root, &value, segment, path, max_depth)?.into_owned())
            }
        };
    }
    Ok(current.into_owned())
}

fn step<'v>(
    root: &Value,
    value: &'v Value,
    segment: &PathSegment,
    path: &str,
    max_depth: usize,
) -> Result<Cow<'v, Value>, QueryError> {
    match value {
        Value::Undefined | Value::Null => {
            return Err(QueryError::not_found(path, segment.to_string()));
        }
        Value::Bool(_) | Value::Number(_) => {
            return Err(QueryError::TypeMismatch {
                path: path.to_string(),
                segment: segment.to_string(),
                found: value.type_name(),
            });
        }
        Value::String(_) | Value::Array(_) | Value::Object(_) => {}
    }
    let next = match segment {
        PathSegment::Property(name) => lookup::property(value, name),
        PathSegment::Index(i) => lookup::index(value, &Value::from(*i)),
        PathSegment::Variable(nested) => {
            let key = resolve_segments(root, nested, path, max_depth)?;
            lookup::index(value, &key)
        }
    };
    if matches!(*next, Value::Undefined) {
        return Err(QueryError::not_found(path, segment.to_string()));
    }
    Ok(next)
}

fn settle(outcome: Result<Value, QueryError>, options: &QueryOptions) -> Result<Value, QueryError> {
    match outcome {
        Ok(value) => Ok(value),
        Err(err) if options.strict => Err(err),
        Err(err) => {
            log::debug!("query fell back to its default value: {}", err);
            Ok(options.default_value.clone())
        }
    }
}

/// Runs queries whose paths may end in a filter chain.
///
/// Holds the same registry instance the renderer dispatches filters through,
/// so a filter behaves identically in both places.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    registry: Arc<FunctionRegistry>,
}

impl QueryEngine {
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    pub fn query(&self, data: &Value, path: &str, options: &QueryOptions) -> Result<Value, QueryError> {
        let outcome = parse_path(path).and_then(|parsed| {
            let resolved = resolve_segments(data, &parsed.segments, path, options.max_depth)?;
            parsed.filters.iter().try_fold(resolved, |current, filter| {
                self.registry
                    .call(&filter.name, &current, &filter.args)
                    .map_err(QueryError::from)
            })
        });
        settle(outcome, options)
    }
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new(Arc::new(FunctionRegistry::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data() -> Value {
        Value::from(json!({
            "a": {"b": [10, 20]},
            "user": {"name": "  ada  ", "age": 36},
            "cursor": 1,
            "n": null
        }))
    }

    #[test]
    fn test_query_resolves_paths() {
        let opts = QueryOptions::default();
        assert_eq!(query(&data(), "a.b[1]", &opts).unwrap(), Value::Number(20.0));
        assert_eq!(query(&data(), "a.b[cursor]", &opts).unwrap(), Value::Number(20.0));
        assert_eq!(query(&data(), "a.b.length", &opts).unwrap(), Value::Number(2.0));
        assert_eq!(query(&data(), "n", &opts).unwrap(), Value::Null);
        assert_eq!(query(&data(), "", &opts).unwrap(), data());
    }

    #[test]
    fn test_lenient_query_returns_default() {
        let opts = QueryOptions::with_default(-1);
        assert_eq!(query(&Value::from(json!({})), "x.y", &opts).unwrap(), Value::Number(-1.0));
        assert_eq!(query(&data(), "n.deeper", &opts).unwrap(), Value::Number(-1.0));
        assert_eq!(query(&data(), "a[", &opts).unwrap(), Value::Number(-1.0));
    }

    #[test]
    fn test_strict_query_raises() {
        let opts = QueryOptions::strict();
        assert_eq!(
            query(&Value::from(json!({})), "missing", &opts),
            Err(QueryError::not_found("missing", "missing"))
        );
        assert!(matches!(
            query(&data(), "user.age.value", &opts),
            Err(QueryError::TypeMismatch { found: "number", .. })
        ));
        assert!(matches!(query(&data(), "a..b", &opts), Err(QueryError::InvalidPath { .. })));
    }

    #[test]
    fn test_depth_limit() {
        let opts = QueryOptions {
            strict: true,
            max_depth: 2,
            ..QueryOptions::default()
        };
        assert!(matches!(
            query(&data(), "a.b[0]", &opts),
            Err(QueryError::DepthExceeded { max_depth: 2, .. })
        ));
        let lenient = QueryOptions {
            max_depth: 2,
            default_value: Value::from("deep"),
            ..QueryOptions::default()
        };
        assert_eq!(query(&data(), "a.b[0]", &lenient).unwrap(), Value::from("deep"));
    }

    #[test]
    fn test_plain_query_rejects_filters() {
        let err = query(&data(), "user.name | trim", &QueryOptions::strict()).unwrap_err();
        assert!(matches!(err, QueryError::InvalidPath { .. }));
    }

    #[test]
    fn test_engine_applies_filter_chain() {
        let engine = QueryEngine::default();
        let opts = QueryOptions::strict();
        assert_eq!(
            engine.query(&data(), "user.name | trim | upper", &opts).unwrap(),
            Value::from("ADA")
        );
        assert_eq!(
            engine.query(&data(), "user.name | trim | padStart(5, '*')", &opts).unwrap(),
            Value::from("**ada")
        );
    }

    #[test]
    fn test_engine_filter_errors() {
        let engine = QueryEngine::default();
        let err = engine
            .query(&data(), "user | nope", &QueryOptions::strict())
            .unwrap_err();
        assert!(matches!(err, QueryError::Filter(ref e) if e.function == "nope"));

        let lenient = QueryOptions::with_default("fallback");
        assert_eq!(
            engine.query(&data(), "user | nope", &lenient).unwrap(),
            Value::from("fallback")
        );
    }
}
