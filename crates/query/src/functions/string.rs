use super::{arg, check_len, given, integer, string_or};
use crate::error::FunctionError;
use crate::registry::{Category, FunctionRegistry, FunctionSignature};
use itertools::Itertools;
use quill_types::Value;
use regex::Regex;

fn sig(name: &str, description: &str) -> FunctionSignature {
    FunctionSignature::new(name, Category::String, description).returns("string")
}

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register(sig("upper", "Converts to upper case").example("'abc' | upper => 'ABC'"), upper);
    registry.register(sig("lower", "Converts to lower case").example("'ABC' | lower => 'abc'"), lower);
    registry.register(
        sig("capitalize", "Upper-cases the first character and lower-cases the rest")
            .example("'hELLO' | capitalize => 'Hello'"),
        capitalize,
    );
    registry.register(
        sig("title", "Capitalizes every space-separated word").example("'ada lovelace' | title => 'Ada Lovelace'"),
        title,
    );
    registry.register(sig("trim", "Strips surrounding whitespace").example("'  a  ' | trim => 'a'"), trim);
    registry.register(
        sig("trimStart", "Strips leading whitespace").example("'  a ' | trimStart => 'a '"),
        trim_start,
    );
    registry.register(
        sig("trimEnd", "Strips trailing whitespace").example("' a  ' | trimEnd => ' a'"),
        trim_end,
    );
    registry.register(
        sig("padStart", "Pads the start to a target length")
            .param("length", "number")
            .optional("fill", "string")
            .example("'5' | padStart(3, '0') => '005'"),
        pad_start,
    );
    registry.register(
        sig("padEnd", "Pads the end to a target length")
            .param("length", "number")
            .optional("fill", "string")
            .example("'5' | padEnd(3, '-') => '5--'"),
        pad_end,
    );
    registry.register(
        sig("replace", "Replaces every occurrence of a substring")
            .param("search", "string")
            .param("replacement", "string")
            .example("'a-b-c' | replace('-', '+') => 'a+b+c'"),
        replace,
    );
    registry.register(
        sig("regexReplace", "Replaces every match of a regular expression; `$1` refers to groups")
            .param("pattern", "string")
            .param("replacement", "string")
            .example("'2024-01-05' | regexReplace('(\\d+)-(\\d+)-(\\d+)', '$3/$2/$1') => '05/01/2024'"),
        regex_replace,
    );
    registry.register(
        sig("split", "Splits into an array; an empty separator splits characters")
            .optional("separator", "string")
            .returns("array")
            .example("'a,b' | split(',') => ['a', 'b']"),
        split,
    );
    registry.register(
        sig("substring", "Characters from start up to, not including, end")
            .param("start", "number")
            .optional("end", "number")
            .example("'template' | substring(0, 4) => 'temp'"),
        substring,
    );
    registry.register(
        sig("truncate", "Shortens to a length, appending a suffix when cut")
            .param("length", "number")
            .optional("suffix", "string")
            .example("'abcdef' | truncate(3) => 'abc...'"),
        truncate,
    );
    registry.register(
        sig("startsWith", "Tests for a prefix")
            .param("prefix", "string")
            .returns("boolean")
            .example("'quill' | startsWith('qu') => true"),
        starts_with,
    );
    registry.register(
        sig("endsWith", "Tests for a suffix")
            .param("suffix", "string")
            .returns("boolean")
            .example("'quill' | endsWith('ll') => true"),
        ends_with,
    );
    registry.register(
        sig("contains", "Tests for a substring, or for an element when given an array")
            .param("needle", "any")
            .returns("boolean")
            .example("'quill' | contains('ui') => true"),
        contains,
    );
    registry.register(
        sig("repeat", "Repeats the string").param("count", "number").example("'ab' | repeat(2) => 'abab'"),
        repeat,
    );
    registry.register(
        sig("slugify", "Lower-case, dash-separated ASCII form").example("'Hello World!' | slugify => 'hello-world'"),
        slugify,
    );
    registry.register(
        sig("escapeHtml", "Escapes the five HTML-significant characters")
            .example("'<b>' | escapeHtml => '&lt;b&gt;'"),
        escape_html,
    );
    registry.register(
        sig("stripTags", "Removes anything between angle brackets").example("'<b>hi</b>' | stripTags => 'hi'"),
        strip_tags,
    );
    registry.register(
        sig("wordCount", "Counts whitespace-separated words")
            .returns("number")
            .example("'one two  three' | wordCount => 3"),
        word_count,
    );
}

fn upper(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(value.to_string().to_uppercase().into())
}

fn lower(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(value.to_string().to_lowercase().into())
}

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn capitalize(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(capitalize_word(&value.to_string()).into())
}

fn title(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(value.to_string().split(' ').map(capitalize_word).join(" ").into())
}

fn trim(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(value.to_string().trim().into())
}

fn trim_start(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(value.to_string().trim_start().into())
}

fn trim_end(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(value.to_string().trim_end().into())
}

fn pad(function: &str, value: &Value, args: &[Value], at_start: bool) -> Result<Value, FunctionError> {
    let text = value.to_string();
    let target = integer(function, args, 0, 0)?.max(0) as usize;
    let fill = string_or(args, 1, " ");
    let len = text.chars().count();
    if len >= target || fill.is_empty() {
        return Ok(text.into());
    }
    check_len(function, target)?;
    let padding: String = fill.chars().cycle().take(target - len).collect();
    let padded = if at_start { padding + &text } else { text + &padding };
    Ok(padded.into())
}

fn pad_start(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    pad("padStart", value, args, true)
}

fn pad_end(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    pad("padEnd", value, args, false)
}

fn replace(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let text = value.to_string();
    let search = string_or(args, 0, "");
    if search.is_empty() {
        return Ok(text.into());
    }
    Ok(text.replace(&search, &string_or(args, 1, "")).into())
}

fn regex_replace(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let pattern = Regex::new(&string_or(args, 0, ""))
        .map_err(|e| FunctionError::new("regexReplace", format!("invalid pattern: {}", e)))?;
    let replacement = string_or(args, 1, "");
    Ok(pattern.replace_all(&value.to_string(), replacement.as_str()).into_owned().into())
}

fn split(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let text = value.to_string();
    let separator = string_or(args, 0, ",");
    let parts: Vec<Value> = if separator.is_empty() {
        text.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        text.split(separator.as_str()).map(Value::from).collect()
    };
    Ok(Value::Array(parts))
}

fn substring(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let chars: Vec<char> = value.to_string().chars().collect();
    let len = chars.len() as i64;
    let start = integer("substring", args, 0, 0)?.clamp(0, len) as usize;
    let end = integer("substring", args, 1, len)?.clamp(0, len) as usize;
    let (from, to) = if start <= end { (start, end) } else { (end, start) };
    Ok(chars[from..to].iter().collect::<String>().into())
}

fn truncate(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let text = value.to_string();
    let limit = integer("truncate", args, 0, 0)?.max(0) as usize;
    if text.chars().count() <= limit {
        return Ok(text.into());
    }
    let mut cut: String = text.chars().take(limit).collect();
    cut.push_str(&string_or(args, 1, "..."));
    Ok(cut.into())
}

fn starts_with(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    Ok(value.to_string().starts_with(&string_or(args, 0, "")).into())
}

fn ends_with(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    Ok(value.to_string().ends_with(&string_or(args, 0, "")).into())
}

fn contains(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let needle = arg(args, 0);
    let found = match value {
        Value::Array(items) => items.iter().any(|item| item.strict_eq(needle)),
        _ => given(args, 0) && value.to_string().contains(&needle.to_string()),
    };
    Ok(found.into())
}

fn repeat(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let count = integer("repeat", args, 0, 0)?;
    if count < 0 {
        return Err(FunctionError::new("repeat", "count must not be negative"));
    }
    let text = value.to_string();
    check_len("repeat", text.len().saturating_mul(count as usize))?;
    Ok(text.repeat(count as usize).into())
}

fn slugify(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(slug::slugify(value.to_string()).into())
}

fn escape_html(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    let text = value.to_string();
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    Ok(escaped.into())
}

fn strip_tags(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    let text = value.to_string();
    let mut stripped = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => stripped.push(c),
            _ => {}
        }
    }
    Ok(stripped.into())
}

fn word_count(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::from(value.to_string().split_whitespace().count()))
}
