use super::{arg, integer, number_or, string_or};
use crate::error::FunctionError;
use crate::registry::{Category, FunctionRegistry, FunctionSignature};
use quill_types::{Value, format_number};
use std::iter;

fn sig(name: &str, description: &str) -> FunctionSignature {
    FunctionSignature::new(name, Category::Number, description).returns("number")
}

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register(
        sig("round", "Rounds half up to a number of decimal places")
            .optional("digits", "number")
            .example("3.14159 | round(2) => 3.14"),
        round,
    );
    registry.register(sig("floor", "Rounds down").example("2.7 | floor => 2"), floor);
    registry.register(sig("ceil", "Rounds up").example("2.1 | ceil => 3"), ceil);
    registry.register(sig("abs", "Absolute value").example("-4 | abs => 4"), abs);
    registry.register(
        sig("min", "Smallest of an array, or of the value and the arguments")
            .optional("others", "number")
            .example("[3, 1, 2] | min => 1")
            .example("5 | min(2) => 2"),
        min,
    );
    registry.register(
        sig("max", "Largest of an array, or of the value and the arguments")
            .optional("others", "number")
            .example("[3, 1, 2] | max => 3"),
        max,
    );
    registry.register(
        sig("clamp", "Limits the value to a range")
            .param("min", "number")
            .param("max", "number")
            .example("15 | clamp(0, 10) => 10"),
        clamp,
    );
    registry.register(
        sig("toFixed", "Formats with a fixed number of decimals")
            .optional("digits", "number")
            .returns("string")
            .example("2.5 | toFixed(2) => '2.50'"),
        to_fixed,
    );
    registry.register(
        sig("percent", "Formats a ratio as a percentage")
            .optional("digits", "number")
            .returns("string")
            .example("0.256 | percent(1) => '25.6%'"),
        percent,
    );
    registry.register(sig("add", "Addition").param("n", "number").example("2 | add(3) => 5"), add);
    registry.register(
        sig("subtract", "Subtraction").param("n", "number").example("5 | subtract(3) => 2"),
        subtract,
    );
    registry.register(
        sig("multiply", "Multiplication").param("n", "number").example("2 | multiply(3) => 6"),
        multiply,
    );
    registry.register(
        sig("divide", "Division; dividing by zero is an error")
            .param("n", "number")
            .example("6 | divide(4) => 1.5"),
        divide,
    );
    registry.register(
        sig("mod", "Remainder with the sign of the value").param("n", "number").example("7 | mod(3) => 1"),
        modulo,
    );
    registry.register(sig("pow", "Exponentiation").param("exponent", "number").example("2 | pow(10) => 1024"), pow);
    registry.register(
        sig("number", "Numeric coercion").example("'42' | number => 42"),
        number,
    );
    registry.register(
        sig("formatNumber", "Groups thousands and fixes the decimals")
            .optional("decimals", "number")
            .optional("thousandsSeparator", "string")
            .optional("decimalSeparator", "string")
            .returns("string")
            .example("1234567.891 | formatNumber(2) => '1,234,567.89'"),
        format_grouped,
    );
}

fn round(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let digits = integer("round", args, 0, 0)?.clamp(-15, 15) as i32;
    let scale = 10f64.powi(digits.abs());
    let n = value.to_number();
    let rounded = if digits >= 0 {
        (n * scale + 0.5).floor() / scale
    } else {
        (n / scale + 0.5).floor() * scale
    };
    Ok(Value::Number(rounded))
}

fn floor(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Number(value.to_number().floor()))
}

fn ceil(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Number(value.to_number().ceil()))
}

fn abs(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Number(value.to_number().abs()))
}

fn extremum(function: &str, value: &Value, args: &[Value], pick: fn(f64, f64) -> f64) -> Result<Value, FunctionError> {
    let numbers: Vec<f64> = match value {
        Value::Array(items) => items.iter().map(Value::to_number).collect(),
        other => iter::once(other).chain(args).map(Value::to_number).collect(),
    };
    numbers
        .into_iter()
        .reduce(pick)
        .map(Value::Number)
        .ok_or_else(|| FunctionError::new(function, "no values to compare"))
}

fn min(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    extremum("min", value, args, f64::min)
}

fn max(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    extremum("max", value, args, f64::max)
}

fn clamp(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let low = number_or(args, 0, f64::NEG_INFINITY);
    let high = number_or(args, 1, f64::INFINITY);
    if low.is_nan() || high.is_nan() || low > high {
        return Err(FunctionError::new(
            "clamp",
            format!("invalid range {}..{}", format_number(low), format_number(high)),
        ));
    }
    Ok(Value::Number(value.to_number().clamp(low, high)))
}

fn decimals(function: &str, args: &[Value], index: usize) -> Result<usize, FunctionError> {
    let digits = integer(function, args, index, 0)?;
    if !(0..=20).contains(&digits) {
        return Err(FunctionError::new(function, "digits must be between 0 and 20"));
    }
    Ok(digits as usize)
}

fn fixed(n: f64, digits: usize) -> String {
    if n.is_finite() {
        format!("{:.*}", digits, n)
    } else {
        format_number(n)
    }
}

fn to_fixed(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let digits = decimals("toFixed", args, 0)?;
    Ok(fixed(value.to_number(), digits).into())
}

fn percent(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let digits = decimals("percent", args, 0)?;
    Ok(format!("{}%", fixed(value.to_number() * 100.0, digits)).into())
}

fn add(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Number(value.to_number() + arg(args, 0).to_number()))
}

fn subtract(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Number(value.to_number() - arg(args, 0).to_number()))
}

fn multiply(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Number(value.to_number() * arg(args, 0).to_number()))
}

fn divisor(function: &str, args: &[Value]) -> Result<f64, FunctionError> {
    let n = arg(args, 0).to_number();
    if n == 0.0 || n.is_nan() {
        return Err(FunctionError::new(
            function,
            format!("cannot divide by '{}'", arg(args, 0)),
        ));
    }
    Ok(n)
}

fn divide(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Number(value.to_number() / divisor("divide", args)?))
}

fn modulo(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Number(value.to_number() % divisor("mod", args)?))
}

fn pow(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Number(value.to_number().powf(number_or(args, 0, 1.0))))
}

fn number(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Number(value.to_number()))
}

fn group_thousands(digits: &str, separator: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3 * separator.len());
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push_str(separator);
        }
        grouped.push(c);
    }
    grouped
}

fn format_grouped(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let n = value.to_number();
    if !n.is_finite() {
        return Ok(format_number(n).into());
    }
    let digits = decimals("formatNumber", args, 0)?;
    let thousands = string_or(args, 1, ",");
    let point = string_or(args, 2, ".");

    let text = format!("{:.*}", digits, n.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let mut formatted = String::new();
    if n < 0.0 && text.chars().any(|c| c.is_ascii_digit() && c != '0') {
        formatted.push('-');
    }
    formatted.push_str(&group_thousands(whole, &thousands));
    if !fraction.is_empty() {
        formatted.push_str(&point);
        formatted.push_str(fraction);
    }
    Ok(formatted.into())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{call, try_call, v};
    use serde_json::json;

    #[test]
    fn test_rounding() {
        assert_eq!(call("round", json!(3.14159), &[json!(2)]), v(json!(3.14)));
        assert_eq!(call("round", json!(2.5), &[]), v(json!(3)));
        assert_eq!(call("round", json!(-2.5), &[]), v(json!(-2)));
        assert_eq!(call("round", json!(1234), &[json!(-2)]), v(json!(1200)));
        assert_eq!(call("floor", json!("2.7"), &[]), v(json!(2)));
        assert_eq!(call("ceil", json!(2.1), &[]), v(json!(3)));
        assert_eq!(call("abs", json!(-4), &[]), v(json!(4)));
    }

    #[test]
    fn test_min_max_clamp() {
        assert_eq!(call("min", json!([3, 1, 2]), &[]), v(json!(1)));
        assert_eq!(call("max", json!(["3", 10]), &[]), v(json!(10)));
        assert_eq!(call("min", json!(5), &[json!(2), json!(9)]), v(json!(2)));
        assert!(try_call("max", json!([]), &[]).is_err());
        assert_eq!(call("clamp", json!(15), &[json!(0), json!(10)]), v(json!(10)));
        assert!(try_call("clamp", json!(1), &[json!(5), json!(0)]).is_err());
    }

    #[test]
    fn test_fixed_formats() {
        assert_eq!(call("toFixed", json!(2.5), &[json!(2)]), v(json!("2.50")));
        assert_eq!(call("toFixed", json!("x"), &[json!(1)]), v(json!("NaN")));
        assert!(try_call("toFixed", json!(1), &[json!(99)]).is_err());
        assert_eq!(call("percent", json!(0.256), &[json!(1)]), v(json!("25.6%")));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(call("add", json!("2"), &[json!(3)]), v(json!(5)));
        assert_eq!(call("subtract", json!(5), &[json!(3)]), v(json!(2)));
        assert_eq!(call("multiply", json!(2), &[json!(3)]), v(json!(6)));
        assert_eq!(call("divide", json!(6), &[json!(4)]), v(json!(1.5)));
        assert_eq!(call("mod", json!(-7), &[json!(3)]), v(json!(-1)));
        assert_eq!(call("pow", json!(2), &[json!(10)]), v(json!(1024)));
        assert_eq!(call("number", json!(" 42 "), &[]), v(json!(42)));
        let err = try_call("divide", json!(1), &[json!(0)]).unwrap_err();
        assert_eq!(err.function, "divide");
        assert!(try_call("mod", json!(1), &[]).is_err());
    }

    #[test]
    fn test_format_number_groups_thousands() {
        assert_eq!(call("formatNumber", json!(1234567.891), &[json!(2)]), v(json!("1,234,567.89")));
        assert_eq!(call("formatNumber", json!(-1234), &[]), v(json!("-1,234")));
        assert_eq!(call("formatNumber", json!(999), &[]), v(json!("999")));
        assert_eq!(
            call("formatNumber", json!(1234.5), &[json!(1), json!("."), json!(",")]),
            v(json!("1.234,5"))
        );
        assert_eq!(call("formatNumber", json!(-0.001), &[json!(2)]), v(json!("0.00")));
    }
}
