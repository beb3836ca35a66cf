use core::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use ecow::{EcoString, EcoVec};
use hashbrown::HashSet;

use super::{Function, Object, Record, time};
use crate::types::Type;

/// A value flowing through the VM.
///
/// Collections are reference counted, so cloning a value is cheap. Integer and
/// string sets only appear as constants produced by the optimizer.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(EcoString),
    Time(DateTime<Utc>),
    Duration(TimeDelta),
    Array(EcoVec<Value>),
    Map(Arc<BTreeMap<EcoString, Value>>),
    Object(Arc<dyn Object>),
    Function(Function),
    IntSet(Arc<HashSet<i64>>),
    StrSet(Arc<HashSet<EcoString>>),
}

impl Value {
    pub fn map<K: Into<EcoString>>(entries: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Map(Arc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Array(items.into_iter().collect())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric value widened to `f64`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Static type that describes this value.
    pub fn type_of(&self) -> Type {
        match self {
            Value::Nil => Type::Nil,
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::INT,
            Value::Float(_) => Type::FLOAT,
            Value::String(_) => Type::String,
            Value::Time(_) => Type::Time,
            Value::Duration(_) => Type::Duration,
            Value::Array(items) => Type::array(common_type(items.iter())),
            Value::Map(entries) => Type::map(common_type(entries.values())),
            Value::Object(object) => Type::Struct(object.struct_type().clone()),
            Value::Function(f) => Type::Func(f.ty().clone()),
            Value::IntSet(_) | Value::StrSet(_) => Type::Any,
        }
    }

    /// Name of the value's type, for runtime diagnostics.
    pub fn type_name(&self) -> String {
        match self {
            Value::Array(_) => "array".to_string(),
            Value::Map(_) => "map".to_string(),
            Value::Function(f) => format!("func {}", f.name()),
            Value::IntSet(_) | Value::StrSet(_) => "set".to_string(),
            other => other.type_of().to_string(),
        }
    }
}

fn common_type<'a>(mut values: impl Iterator<Item = &'a Value>) -> Type {
    let Some(first) = values.next() else {
        return Type::Any;
    };
    let ty = first.type_of();
    if values.all(|v| v.type_of() == ty) {
        ty
    } else {
        Type::Any
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.same_as(b),
            (Value::IntSet(a), Value::IntSet(b)) => a == b,
            (Value::StrSet(a), Value::StrSet(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            other => fmt_nested(other, f),
        }
    }
}

/// Like `Display`, but strings are quoted so collections stay readable.
fn fmt_nested(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Nil => f.write_str("nil"),
        Value::Bool(b) => write!(f, "{}", b),
        Value::Int(n) => write!(f, "{}", n),
        Value::Float(x) => write!(f, "{}", x),
        Value::String(s) => write!(f, "{:?}", s.as_str()),
        Value::Time(t) => f.write_str(&t.to_rfc3339()),
        Value::Duration(d) => f.write_str(&time::format_duration(*d)),
        Value::Array(items) => {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                fmt_nested(item, f)?;
            }
            f.write_str("]")
        }
        Value::Map(entries) => {
            f.write_str("{")?;
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{:?}: ", key.as_str())?;
                fmt_nested(item, f)?;
            }
            f.write_str("}")
        }
        Value::Object(object) => write!(f, "{}{{...}}", object.struct_type().name),
        Value::Function(func) => write!(f, "func {}", func.name()),
        Value::IntSet(set) => {
            let mut items: Vec<_> = set.iter().collect();
            items.sort();
            write!(f, "set{:?}", items)
        }
        Value::StrSet(set) => {
            let mut items: Vec<_> = set.iter().map(|s| s.as_str()).collect();
            items.sort();
            write!(f, "set{:?}", items)
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<EcoString> for Value {
    fn from(s: EcoString) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Time(t)
    }
}

impl From<TimeDelta> for Value {
    fn from(d: TimeDelta) -> Self {
        Value::Duration(d)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(Arc::new(record))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Nil, Into::into)
    }
}
