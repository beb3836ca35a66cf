//! Dynamically typed operations.
//!
//! Used for operands whose static type was `any`, and for the operations that
//! have no specialized instruction.

use ecow::EcoVec;
use regex::Regex;

use super::error::Fault;
use super::instruction_set::CmpOp;
use crate::values::{Value, lookup, time};

type Result<T> = core::result::Result<T, Fault>;

fn mismatch(op: &str, a: &Value, b: &Value) -> Fault {
    Fault::runtime(format!(
        "invalid operation: {} (mismatched types {} and {})",
        op,
        a.type_name(),
        b.type_name()
    ))
}

pub(crate) fn divide_by_zero() -> Fault {
    Fault::runtime("integer divide by zero")
}

/// Integer arithmetic; overflow wraps.
pub(crate) fn int_op(op: u8, a: i64, b: i64) -> Result<i64> {
    Ok(match op {
        b'+' => a.wrapping_add(b),
        b'-' => a.wrapping_sub(b),
        b'*' => a.wrapping_mul(b),
        b'/' if b == 0 => return Err(divide_by_zero()),
        b'/' => a.wrapping_div(b),
        b'%' if b == 0 => return Err(divide_by_zero()),
        b'%' => a.wrapping_rem(b),
        _ => unreachable!("integer operator {}", op as char),
    })
}

pub(crate) fn float_op(op: u8, a: f64, b: f64) -> f64 {
    match op {
        b'+' => a + b,
        b'-' => a - b,
        b'*' => a * b,
        b'/' => a / b,
        b'^' => a.powf(b),
        _ => unreachable!("float operator {}", op as char),
    }
}

/// `a op b` for any operand types.
pub(crate) fn binary(op: u8, a: &Value, b: &Value) -> Result<Value> {
    let symbol = match op {
        b'^' => "**",
        b'+' => "+",
        b'-' => "-",
        b'*' => "*",
        b'/' => "/",
        b'%' => "%",
        _ => unreachable!("binary operator {}", op as char),
    };
    match (a, b) {
        (Value::Int(x), Value::Int(y)) if op == b'^' => Ok(Value::Float((*x as f64).powf(*y as f64))),
        (Value::Int(x), Value::Int(y)) => int_op(op, *x, *y).map(Value::Int),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) if op != b'%' => {
            let (x, y) = (a.as_float().unwrap_or_default(), b.as_float().unwrap_or_default());
            Ok(Value::Float(float_op(op, x, y)))
        }
        (Value::String(x), Value::String(y)) if op == b'+' => {
            let mut joined = x.clone();
            joined.push_str(y);
            Ok(Value::String(joined))
        }
        (Value::Time(t), Value::Duration(d)) | (Value::Duration(d), Value::Time(t)) if op == b'+' => t
            .checked_add_signed(*d)
            .map(Value::Time)
            .ok_or_else(|| Fault::runtime("time overflow")),
        (Value::Time(t), Value::Duration(d)) if op == b'-' => t
            .checked_sub_signed(*d)
            .map(Value::Time)
            .ok_or_else(|| Fault::runtime("time overflow")),
        (Value::Time(x), Value::Time(y)) if op == b'-' => Ok(Value::Duration(*x - *y)),
        (Value::Duration(x), Value::Duration(y)) if op == b'+' => Ok(Value::Duration(*x + *y)),
        (Value::Duration(x), Value::Duration(y)) if op == b'-' => Ok(Value::Duration(*x - *y)),
        _ => Err(mismatch(symbol, a, b)),
    }
}

pub(crate) fn negate(a: &Value) -> Result<Value> {
    match a {
        Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
        Value::Float(x) => Ok(Value::Float(-x)),
        Value::Duration(d) => Ok(Value::Duration(-*d)),
        other => Err(Fault::runtime(format!(
            "invalid operation: - (mismatched type {})",
            other.type_name()
        ))),
    }
}

pub(crate) fn not(a: &Value) -> Result<Value> {
    match a {
        Value::Bool(b) => Ok(Value::Bool(!b)),
        other => Err(Fault::runtime(format!(
            "invalid operation: ! (mismatched type {})",
            other.type_name()
        ))),
    }
}

pub(crate) fn truthy(a: &Value) -> Result<bool> {
    a.as_bool().ok_or_else(|| {
        Fault::runtime(format!(
            "non-bool value (type {}) used as condition",
            a.type_name()
        ))
    })
}

/// Equality, comparing integers and floats by value.
pub(crate) fn equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => *x as f64 == *y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| equal(a, b))
        }
        _ => a == b,
    }
}

pub(crate) fn compare(op: CmpOp, a: &Value, b: &Value) -> Result<Value> {
    let ordering = match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (x, y) = (a.as_float().unwrap_or_default(), b.as_float().unwrap_or_default());
            match x.partial_cmp(&y) {
                Some(ordering) => ordering,
                // NaN compares false with everything.
                None => return Ok(Value::Bool(false)),
            }
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Time(x), Value::Time(y)) => x.cmp(y),
        (Value::Duration(x), Value::Duration(y)) => x.cmp(y),
        _ => return Err(mismatch(op.as_str(), a, b)),
    };
    Ok(Value::Bool(op.test(ordering)))
}

pub(crate) fn float_compare(op: CmpOp, a: f64, b: f64) -> bool {
    a.partial_cmp(&b).is_some_and(|ordering| op.test(ordering))
}

/// `needle in haystack`.
pub(crate) fn contains(needle: &Value, haystack: &Value) -> Result<bool> {
    match haystack {
        Value::Array(items) => Ok(items.iter().any(|item| equal(needle, item))),
        Value::IntSet(set) => Ok(match needle {
            Value::Int(n) => set.contains(n),
            Value::Float(x) if x.fract() == 0.0 => set.contains(&(*x as i64)),
            _ => false,
        }),
        Value::StrSet(set) => Ok(match needle {
            Value::String(s) => set.contains(s),
            _ => false,
        }),
        Value::Map(entries) => match needle {
            Value::String(key) => Ok(entries.contains_key(key)),
            _ => Err(mismatch("in", needle, haystack)),
        },
        Value::Object(object) => match needle {
            Value::String(key) => Ok(lookup(object.as_ref(), key).is_some()),
            _ => Err(mismatch("in", needle, haystack)),
        },
        Value::Nil => Ok(false),
        _ => Err(mismatch("in", needle, haystack)),
    }
}

/// Resolves a negative index from the end and checks bounds.
fn position(index: i64, len: usize) -> Result<usize> {
    let resolved = if index < 0 { index + len as i64 } else { index };
    if resolved < 0 || resolved >= len as i64 {
        return Err(Fault::runtime(format!(
            "index out of range: {} (array length is {})",
            index, len
        )));
    }
    Ok(resolved as usize)
}

fn cannot_fetch(key: &Value, from: &Value) -> Fault {
    Fault::runtime(format!("cannot fetch {} from {}", key, from.type_name()))
}

/// `from[key]` and `from.key`.
pub(crate) fn fetch(from: &Value, key: &Value) -> Result<Value> {
    match (from, key) {
        (Value::Map(entries), Value::String(name)) => {
            Ok(entries.get(name).cloned().unwrap_or_default())
        }
        (Value::Array(items), Value::Int(index)) => {
            Ok(items[position(*index, items.len())?].clone())
        }
        (Value::String(s), Value::Int(index)) => {
            let chars: Vec<char> = s.chars().collect();
            let c = chars[position(*index, chars.len())?];
            Ok(Value::from(c.to_string()))
        }
        (Value::Object(object), Value::String(name)) => {
            lookup(object.as_ref(), name).ok_or_else(|| cannot_fetch(key, from))
        }
        (Value::Time(_) | Value::Duration(_), Value::String(name)) => time::bind_method(from, name)
            .map(Value::Function)
            .ok_or_else(|| cannot_fetch(key, from)),
        _ => Err(cannot_fetch(key, from)),
    }
}

/// Clamps slice bounds the way `s[lo:hi]` does: negative bounds count from
/// the end, and out-of-range bounds are pulled back into range.
fn clamp(lo: Option<i64>, hi: Option<i64>, len: usize) -> (usize, usize) {
    let len = len as i64;
    let resolve = |bound: i64| {
        let bound = if bound < 0 { bound + len } else { bound };
        bound.clamp(0, len)
    };
    let lo = lo.map_or(0, resolve);
    let hi = hi.map_or(len, resolve);
    (lo as usize, hi.max(lo) as usize)
}

fn bound(value: Option<&Value>) -> Result<Option<i64>> {
    match value {
        None => Ok(None),
        Some(Value::Int(n)) => Ok(Some(*n)),
        Some(other) => Err(Fault::runtime(format!(
            "non-integer slice index {}",
            other.type_name()
        ))),
    }
}

pub(crate) fn slice(base: &Value, lo: Option<&Value>, hi: Option<&Value>) -> Result<Value> {
    let (lo, hi) = (bound(lo)?, bound(hi)?);
    match base {
        Value::Array(items) => {
            let (from, to) = clamp(lo, hi, items.len());
            Ok(Value::Array(items[from..to].iter().cloned().collect()))
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (from, to) = clamp(lo, hi, chars.len());
            Ok(Value::from(chars[from..to].iter().collect::<String>()))
        }
        other => Err(Fault::runtime(format!("cannot slice {}", other.type_name()))),
    }
}

/// Number of elements `lo..hi` produces.
pub(crate) fn range_len(lo: i64, hi: i64) -> usize {
    if hi < lo {
        0
    } else {
        (hi as i128 - lo as i128 + 1).min(usize::MAX as i128) as usize
    }
}

pub(crate) fn range(lo: i64, hi: i64) -> Value {
    Value::Array((lo..=hi).map(Value::Int).collect::<EcoVec<_>>())
}

pub(crate) fn len(value: &Value) -> Result<Value> {
    let n = match value {
        Value::Array(items) => items.len(),
        Value::Map(entries) => entries.len(),
        Value::String(s) => s.chars().count(),
        other => {
            return Err(Fault::runtime(format!(
                "invalid argument for len (type {})",
                other.type_name()
            )));
        }
    };
    Ok(Value::Int(n as i64))
}

/// Elements a closure builtin iterates over: array items or map values.
pub(crate) fn elements(collection: &Value) -> Result<EcoVec<Value>> {
    match collection {
        Value::Array(items) => Ok(items.clone()),
        Value::Map(entries) => Ok(entries.values().cloned().collect()),
        other => Err(Fault::runtime(format!(
            "cannot iterate over {}",
            other.type_name()
        ))),
    }
}

fn strings<'v>(op: &str, a: &'v Value, b: &'v Value) -> Result<(&'v str, &'v str)> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Ok((x, y)),
        _ => Err(mismatch(op, a, b)),
    }
}

pub(crate) fn string_contains(a: &Value, b: &Value) -> Result<Value> {
    let (x, y) = strings("contains", a, b)?;
    Ok(Value::Bool(x.contains(y)))
}

pub(crate) fn starts_with(a: &Value, b: &Value) -> Result<Value> {
    let (x, y) = strings("startsWith", a, b)?;
    Ok(Value::Bool(x.starts_with(y)))
}

pub(crate) fn ends_with(a: &Value, b: &Value) -> Result<Value> {
    let (x, y) = strings("endsWith", a, b)?;
    Ok(Value::Bool(x.ends_with(y)))
}

pub(crate) fn matches(text: &Value, pattern: &Value) -> Result<Value> {
    let (text, pattern) = strings("matches", text, pattern)?;
    let regex = Regex::new(pattern)
        .map_err(|e| Fault::runtime(format!("error parsing regexp: {}", e)))?;
    Ok(Value::Bool(regex.is_match(text)))
}

pub(crate) fn matches_regex(text: &Value, regex: &Regex) -> Result<Value> {
    match text {
        Value::String(s) => Ok(Value::Bool(regex.is_match(s))),
        other => Err(Fault::runtime(format!(
            "invalid operation: matches (mismatched types {} and string)",
            other.type_name()
        ))),
    }
}

/// Converts a result to the kind the program was compiled for.
pub(crate) fn cast(kind: u8, value: Value) -> Result<Value> {
    match (kind, &value) {
        (0, Value::Int(_)) | (1, Value::Float(_)) => Ok(value),
        (0, Value::Float(x)) => Ok(Value::Int(x.trunc() as i64)),
        (1, Value::Int(n)) => Ok(Value::Float(*n as f64)),
        (0, other) => Err(Fault::runtime(format!("cannot convert {} to int64", other.type_name()))),
        (_, other) => Err(Fault::runtime(format!(
            "cannot convert {} to float64",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_mixed_arithmetic() {
        assert_eq!(binary(b'+', &Value::Int(1), &Value::Float(0.5)).unwrap(), Value::Float(1.5));
        assert_eq!(binary(b'^', &Value::Int(2), &Value::Int(3)).unwrap(), Value::Float(8.0));
        assert_eq!(binary(b'/', &Value::Int(7), &Value::Int(2)).unwrap(), Value::Int(3));
        assert_eq!(
            binary(b'+', &Value::Int(i64::MAX), &Value::Int(1)).unwrap(),
            Value::Int(i64::MIN)
        );
    }

    #[test]
    fn test_divide_by_zero() {
        let err = binary(b'%', &Value::Int(1), &Value::Int(0)).unwrap_err();
        assert_eq!(err.to_string(), "runtime error: integer divide by zero");
    }

    #[test]
    fn test_mismatch() {
        let err = binary(b'+', &Value::Int(1), &Value::Bool(true)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "runtime error: invalid operation: + (mismatched types int and bool)"
        );
    }

    #[test]
    fn test_duration_arithmetic() {
        let hour = Value::Duration(TimeDelta::hours(1));
        assert_eq!(
            binary(b'-', &hour, &Value::Duration(TimeDelta::minutes(30))).unwrap(),
            Value::Duration(TimeDelta::minutes(30))
        );
        assert_eq!(negate(&hour).unwrap(), Value::Duration(TimeDelta::hours(-1)));
    }

    #[test]
    fn test_equal_numeric() {
        assert!(equal(&Value::Int(1), &Value::Float(1.0)));
        assert!(equal(
            &Value::array([Value::Int(1)]),
            &Value::array([Value::Float(1.0)])
        ));
        assert!(!equal(&Value::Int(1), &Value::from("1")));
    }

    #[test]
    fn test_fetch_negative_index() {
        let items = Value::array([1, 2, 3].map(Value::Int));
        assert_eq!(fetch(&items, &Value::Int(-1)).unwrap(), Value::Int(3));
        let err = fetch(&items, &Value::Int(3)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "runtime error: index out of range: 3 (array length is 3)"
        );
    }

    #[test]
    fn test_fetch_from_nil() {
        let err = fetch(&Value::Nil, &Value::from("baz")).unwrap_err();
        assert_eq!(err.to_string(), "runtime error: cannot fetch baz from nil");
    }

    #[test]
    fn test_slice_clamps() {
        let s = Value::from("hello");
        let (lo, hi) = (Value::Int(1), Value::Int(99));
        assert_eq!(slice(&s, Some(&lo), Some(&hi)).unwrap(), Value::from("ello"));
        assert_eq!(slice(&s, Some(&Value::Int(-2)), None).unwrap(), Value::from("lo"));
        assert_eq!(slice(&s, Some(&Value::Int(4)), Some(&Value::Int(2))).unwrap(), Value::from(""));
    }

    #[test]
    fn test_contains_sets() {
        let set = Value::IntSet(std::sync::Arc::new([1, 2, 3].into_iter().collect()));
        assert!(contains(&Value::Int(2), &set).unwrap());
        assert!(contains(&Value::Float(2.0), &set).unwrap());
        assert!(!contains(&Value::Float(2.5), &set).unwrap());
        assert!(!contains(&Value::from("2"), &set).unwrap());
    }

    #[test]
    fn test_range() {
        assert_eq!(range_len(4, 0), 0);
        assert_eq!(range_len(-1, 1), 3);
        assert_eq!(range(1, 3), Value::array([1, 2, 3].map(Value::Int)));
    }

    #[test]
    fn test_cast() {
        assert_eq!(cast(0, Value::Float(5.5)).unwrap(), Value::Int(5));
        assert_eq!(cast(1, Value::Int(42)).unwrap(), Value::Float(42.0));
        assert!(cast(0, Value::from("x")).is_err());
    }
}
