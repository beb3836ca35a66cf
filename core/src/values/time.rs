//! Time and duration support: formatting and the methods exposed on both.

use chrono::{DateTime, Datelike, TimeDelta, Utc};

use super::{Function, Value};
use crate::errors::HostError;
use crate::types::{FuncType, Type};

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SECOND: u128 = 1_000_000_000;
const NANOS_PER_MINUTE: u128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MINUTE;

/// Formats a duration as `1h2m3.5s`, `1.5ms`, `0s` and so on.
pub fn format_duration(d: TimeDelta) -> String {
    let total = d.num_seconds() as i128 * NANOS_PER_SECOND as i128 + d.subsec_nanos() as i128;
    let sign = if total < 0 { "-" } else { "" };
    let nanos = total.unsigned_abs();
    if nanos == 0 {
        return "0s".to_string();
    }
    let body = if nanos < NANOS_PER_MICRO {
        format!("{}ns", nanos)
    } else if nanos < NANOS_PER_MILLI {
        format!("{}µs", fraction(nanos, NANOS_PER_MICRO))
    } else if nanos < NANOS_PER_SECOND {
        format!("{}ms", fraction(nanos, NANOS_PER_MILLI))
    } else {
        let hours = nanos / NANOS_PER_HOUR;
        let minutes = nanos % NANOS_PER_HOUR / NANOS_PER_MINUTE;
        let seconds = fraction(nanos % NANOS_PER_MINUTE, NANOS_PER_SECOND);
        if hours > 0 {
            format!("{}h{}m{}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m{}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    };
    format!("{}{}", sign, body)
}

/// `value / unit` with trailing zeros of the remainder dropped.
fn fraction(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let rest = value % unit;
    if rest == 0 {
        return whole.to_string();
    }
    let width = unit.to_string().len() - 1;
    let digits = format!("{:0width$}", rest, width = width);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

fn nanos(d: TimeDelta) -> f64 {
    d.num_seconds() as f64 * 1e9 + d.subsec_nanos() as f64
}

/// Signature of a method on the time or duration type.
pub fn method_type(receiver: &Type, name: &str) -> Option<FuncType> {
    let f = FuncType::new;
    match receiver {
        Type::Duration => match name {
            "Hours" | "Minutes" | "Seconds" => Some(f(vec![], Type::FLOAT)),
            "Milliseconds" => Some(f(vec![], Type::INT)),
            "String" => Some(f(vec![], Type::String)),
            _ => None,
        },
        Type::Time => match name {
            "After" | "Before" | "Equal" => Some(f(vec![Type::Time], Type::Bool)),
            "Sub" => Some(f(vec![Type::Time], Type::Duration)),
            "Add" => Some(f(vec![Type::Duration], Type::Time)),
            "Unix" | "Year" => Some(f(vec![], Type::INT)),
            "String" => Some(f(vec![], Type::String)),
            _ => None,
        },
        _ => None,
    }
}

/// The method `name` of a time or duration value, bound to that value.
pub fn bind_method(receiver: &Value, name: &str) -> Option<Function> {
    match receiver {
        Value::Duration(d) => {
            let ty = method_type(&Type::Duration, name)?;
            let d = *d;
            let name_owned = name.to_string();
            Some(Function::new(name, ty, move |_| {
                Ok(match name_owned.as_str() {
                    "Hours" => Value::Float(nanos(d) / NANOS_PER_HOUR as f64),
                    "Minutes" => Value::Float(nanos(d) / NANOS_PER_MINUTE as f64),
                    "Seconds" => Value::Float(nanos(d) / NANOS_PER_SECOND as f64),
                    "Milliseconds" => Value::Int(d.num_milliseconds()),
                    _ => Value::from(format_duration(d)),
                })
            }))
        }
        Value::Time(t) => {
            let ty = method_type(&Type::Time, name)?;
            let t = *t;
            let name_owned = name.to_string();
            Some(Function::new(name, ty, move |args| {
                time_method(t, &name_owned, args)
            }))
        }
        _ => None,
    }
}

fn time_method(t: DateTime<Utc>, name: &str, args: &[Value]) -> Result<Value, HostError> {
    let value = match (name, args) {
        ("After", [Value::Time(other)]) => Value::Bool(t > *other),
        ("Before", [Value::Time(other)]) => Value::Bool(t < *other),
        ("Equal", [Value::Time(other)]) => Value::Bool(t == *other),
        ("Sub", [Value::Time(other)]) => Value::Duration(t - *other),
        ("Add", [Value::Duration(d)]) => t
            .checked_add_signed(*d)
            .map(Value::Time)
            .ok_or_else(|| HostError::msg("time overflow"))?,
        ("Unix", []) => Value::Int(t.timestamp()),
        ("Year", []) => Value::Int(t.year() as i64),
        ("String", []) => Value::from(t.to_rfc3339()),
        (_, args) => {
            let given: Vec<String> = args.iter().map(Value::type_name).collect();
            return Err(HostError::msg(format!(
                "invalid arguments ({}) for method {}",
                given.join(", "),
                name
            )));
        }
    };
    Ok(value)
}
