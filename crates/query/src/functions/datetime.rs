//! Date functions. Dates travel as epoch-millisecond numbers in UTC; string
//! input is accepted in RFC 3339 or `YYYY-MM-DD[ HH:MM:SS]` form.
use super::{arg, integer, string_or};
use crate::error::FunctionError;
use crate::registry::{Category, FunctionRegistry, FunctionSignature};
use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, SecondsFormat, Timelike, Utc};
use quill_types::Value;
use std::fmt::Write;

const MS_PER_MINUTE: f64 = 60_000.0;
const MS_PER_HOUR: f64 = 3_600_000.0;
const MS_PER_DAY: f64 = 86_400_000.0;

fn sig(name: &str, description: &str) -> FunctionSignature {
    FunctionSignature::new(name, Category::Datetime, description).returns("number")
}

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register(
        sig("parseDate", "Parses a date string into epoch milliseconds")
            .example("'2024-01-05' | parseDate => 1704412800000"),
        parse_date,
    );
    registry.register(
        sig("formatDate", "Formats with strftime-style specifiers")
            .optional("format", "string")
            .returns("string")
            .example("1704412800000 | formatDate('%d.%m.%Y') => '05.01.2024'"),
        format_date,
    );
    registry.register(
        sig("toISO", "RFC 3339 timestamp with milliseconds")
            .returns("string")
            .example("0 | toISO => '1970-01-01T00:00:00.000Z'"),
        to_iso,
    );
    registry.register(
        sig("addDays", "Shifts by a number of days").param("days", "number").example("ts | addDays(1)"),
        add_days,
    );
    registry.register(
        sig("addHours", "Shifts by a number of hours").param("hours", "number").example("ts | addHours(-2)"),
        add_hours,
    );
    registry.register(
        sig("addMinutes", "Shifts by a number of minutes")
            .param("minutes", "number")
            .example("ts | addMinutes(30)"),
        add_minutes,
    );
    registry.register(
        sig("addMonths", "Shifts by calendar months, clamping to the month's last day")
            .param("months", "number")
            .example("'2024-03-31' | addMonths(1) => '2024-04-30' as epoch ms"),
        add_months,
    );
    registry.register(
        sig("diffDays", "Whole days from another date to this one")
            .param("other", "number")
            .example("'2024-01-06' | diffDays('2024-01-05') => 1"),
        diff_days,
    );
    registry.register(sig("year", "Calendar year").example("'2024-01-05' | year => 2024"), year);
    registry.register(sig("month", "Month, 1 to 12").example("'2024-01-05' | month => 1"), month);
    registry.register(sig("day", "Day of the month").example("'2024-01-05' | day => 5"), day);
    registry.register(
        sig("weekday", "Day of the week, 0 for Sunday").example("'2024-01-05' | weekday => 5"),
        weekday,
    );
    registry.register(sig("hour", "Hour, 0 to 23").example("'2024-01-05T10:30:00Z' | hour => 10"), hour);
    registry.register(
        sig("minute", "Minute, 0 to 59").example("'2024-01-05T10:30:00Z' | minute => 30"),
        minute,
    );
    registry.register(
        sig("startOfDay", "Midnight of the same day").example("ts | startOfDay"),
        start_of_day,
    );
    registry.register(
        sig("startOfMonth", "Midnight of the first day of the month").example("ts | startOfMonth"),
        start_of_month,
    );
}

fn timestamp(function: &str, value: &Value) -> Result<DateTime<Utc>, FunctionError> {
    let millis = match value {
        Value::String(text) => return parse_text(function, text),
        Value::Number(n) if n.is_finite() => n.trunc() as i64,
        other => {
            return Err(FunctionError::new(
                function,
                format!("expected epoch milliseconds or a date string, got {}", other.type_name()),
            ));
        }
    };
    from_millis(function, millis)
}

fn from_millis(function: &str, millis: i64) -> Result<DateTime<Utc>, FunctionError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| FunctionError::new(function, format!("{} is outside the supported range", millis)))
}

fn parse_text(function: &str, text: &str) -> Result<DateTime<Utc>, FunctionError> {
    let text = text.trim();
    if let Ok(millis) = text.parse::<i64>() {
        return from_millis(function, millis);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| FunctionError::new(function, format!("cannot parse '{}' as a date", text)))
}

fn millis(date: DateTime<Utc>) -> Value {
    Value::Number(date.timestamp_millis() as f64)
}

fn parse_date(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(millis(timestamp("parseDate", value)?))
}

fn format_date(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let date = timestamp("formatDate", value)?;
    let pattern = string_or(args, 0, "%Y-%m-%d");
    let mut formatted = String::new();
    write!(formatted, "{}", date.format(&pattern))
        .map_err(|_| FunctionError::new("formatDate", format!("invalid format '{}'", pattern)))?;
    Ok(formatted.into())
}

fn to_iso(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    let date = timestamp("toISO", value)?;
    Ok(date.to_rfc3339_opts(SecondsFormat::Millis, true).into())
}

fn shift(function: &str, value: &Value, args: &[Value], unit: f64) -> Result<Value, FunctionError> {
    let date = timestamp(function, value)?;
    let amount = arg(args, 0).to_number();
    if !amount.is_finite() {
        return Err(FunctionError::new(function, "amount must be a number"));
    }
    let shifted = date.timestamp_millis() as f64 + (amount * unit).trunc();
    if shifted.abs() > i64::MAX as f64 {
        return Err(FunctionError::new(function, "result is outside the supported range"));
    }
    Ok(millis(from_millis(function, shifted as i64)?))
}

fn add_days(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    shift("addDays", value, args, MS_PER_DAY)
}

fn add_hours(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    shift("addHours", value, args, MS_PER_HOUR)
}

fn add_minutes(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    shift("addMinutes", value, args, MS_PER_MINUTE)
}

fn add_months(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let date = timestamp("addMonths", value)?;
    let months = integer("addMonths", args, 0, 0)?;
    let span = u32::try_from(months.unsigned_abs())
        .map(Months::new)
        .map_err(|_| FunctionError::new("addMonths", "month count is too large"))?;
    let shifted = if months >= 0 {
        date.checked_add_months(span)
    } else {
        date.checked_sub_months(span)
    };
    shifted
        .map(millis)
        .ok_or_else(|| FunctionError::new("addMonths", "result is outside the supported range"))
}

fn diff_days(value: &Value, args: &[Value]) -> Result<Value, FunctionError> {
    let date = timestamp("diffDays", value)?;
    let other = timestamp("diffDays", arg(args, 0))?;
    let delta = (date.timestamp_millis() - other.timestamp_millis()) as f64;
    Ok(Value::Number((delta / MS_PER_DAY).trunc()))
}

fn component(function: &str, value: &Value, read: fn(&DateTime<Utc>) -> u32) -> Result<Value, FunctionError> {
    Ok(Value::Number(read(&timestamp(function, value)?) as f64))
}

fn year(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Number(timestamp("year", value)?.year() as f64))
}

fn month(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    component("month", value, |d| d.month())
}

fn day(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    component("day", value, |d| d.day())
}

fn weekday(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    component("weekday", value, |d| d.weekday().num_days_from_sunday())
}

fn hour(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    component("hour", value, |d| d.hour())
}

fn minute(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    component("minute", value, |d| d.minute())
}

fn midnight(function: &str, date: NaiveDate) -> Result<Value, FunctionError> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| millis(naive.and_utc()))
        .ok_or_else(|| FunctionError::new(function, "no midnight for this date"))
}

fn start_of_day(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    midnight("startOfDay", timestamp("startOfDay", value)?.date_naive())
}

fn start_of_month(value: &Value, _args: &[Value]) -> Result<Value, FunctionError> {
    let date = timestamp("startOfMonth", value)?.date_naive();
    let first = date
        .with_day(1)
        .ok_or_else(|| FunctionError::new("startOfMonth", "no first day for this month"))?;
    midnight("startOfMonth", first)
}
