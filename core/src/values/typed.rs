//! Fixed-signature host functions.
//!
//! Each variant is one calling convention with native Rust argument and
//! result types. The checker matches a callee's declared signature against
//! [`TypedFn::index_of`] and stamps the index on the call site, so the VM can
//! unbox arguments without consulting the signature again.

use lazy_static::lazy_static;

use super::Value;
use crate::types::{FuncType, Type};

#[derive(Clone, Copy)]
pub enum TypedFn {
    UnitToInt(fn() -> i64),
    UnitToFloat(fn() -> f64),
    UnitToString(fn() -> String),
    IntToInt(fn(i64) -> i64),
    IntIntToInt(fn(i64, i64) -> i64),
    IntToString(fn(i64) -> String),
    FloatToFloat(fn(f64) -> f64),
    FloatFloatToFloat(fn(f64, f64) -> f64),
    StringToString(fn(&str) -> String),
    StringToInt(fn(&str) -> i64),
    StringToBool(fn(&str) -> bool),
    StringStringToBool(fn(&str, &str) -> bool),
    StringStringToString(fn(&str, &str) -> String),
}

lazy_static! {
    /// Signatures indexed like the variants of [`TypedFn`].
    static ref SIGNATURES: Vec<FuncType> = {
        let f = FuncType::new;
        vec![
            f(vec![], Type::INT),
            f(vec![], Type::FLOAT),
            f(vec![], Type::String),
            f(vec![Type::INT], Type::INT),
            f(vec![Type::INT, Type::INT], Type::INT),
            f(vec![Type::INT], Type::String),
            f(vec![Type::FLOAT], Type::FLOAT),
            f(vec![Type::FLOAT, Type::FLOAT], Type::FLOAT),
            f(vec![Type::String], Type::String),
            f(vec![Type::String], Type::INT),
            f(vec![Type::String], Type::Bool),
            f(vec![Type::String, Type::String], Type::Bool),
            f(vec![Type::String, Type::String], Type::String),
        ]
    };
}

impl TypedFn {
    pub fn index(&self) -> u16 {
        match self {
            TypedFn::UnitToInt(_) => 0,
            TypedFn::UnitToFloat(_) => 1,
            TypedFn::UnitToString(_) => 2,
            TypedFn::IntToInt(_) => 3,
            TypedFn::IntIntToInt(_) => 4,
            TypedFn::IntToString(_) => 5,
            TypedFn::FloatToFloat(_) => 6,
            TypedFn::FloatFloatToFloat(_) => 7,
            TypedFn::StringToString(_) => 8,
            TypedFn::StringToInt(_) => 9,
            TypedFn::StringToBool(_) => 10,
            TypedFn::StringStringToBool(_) => 11,
            TypedFn::StringStringToString(_) => 12,
        }
    }

    pub fn signature(&self) -> &'static FuncType {
        &SIGNATURES[self.index() as usize]
    }

    /// Number of arguments taken by the convention at `index`.
    pub fn arity(index: u16) -> usize {
        SIGNATURES.get(index as usize).map_or(0, |s| s.params.len())
    }

    /// Index of the typed convention whose signature is exactly `ty`.
    pub fn index_of(ty: &FuncType) -> Option<u16> {
        SIGNATURES.iter().position(|s| s == ty).map(|i| i as u16)
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, String> {
        let value = match *self {
            TypedFn::UnitToInt(f) => Value::Int(f()),
            TypedFn::UnitToFloat(f) => Value::Float(f()),
            TypedFn::UnitToString(f) => Value::from(f()),
            TypedFn::IntToInt(f) => Value::Int(f(int(args, 0)?)),
            TypedFn::IntIntToInt(f) => Value::Int(f(int(args, 0)?, int(args, 1)?)),
            TypedFn::IntToString(f) => Value::from(f(int(args, 0)?)),
            TypedFn::FloatToFloat(f) => Value::Float(f(float(args, 0)?)),
            TypedFn::FloatFloatToFloat(f) => Value::Float(f(float(args, 0)?, float(args, 1)?)),
            TypedFn::StringToString(f) => Value::from(f(string(args, 0)?)),
            TypedFn::StringToInt(f) => Value::Int(f(string(args, 0)?)),
            TypedFn::StringToBool(f) => Value::Bool(f(string(args, 0)?)),
            TypedFn::StringStringToBool(f) => Value::Bool(f(string(args, 0)?, string(args, 1)?)),
            TypedFn::StringStringToString(f) => {
                Value::from(f(string(args, 0)?, string(args, 1)?))
            }
        };
        Ok(value)
    }
}

fn arg(args: &[Value], i: usize) -> Result<&Value, String> {
    args.get(i).ok_or_else(|| "not enough arguments".to_string())
}

fn mismatch(value: &Value, expected: &str) -> String {
    format!("cannot use {} as argument (type {})", value.type_name(), expected)
}

fn int(args: &[Value], i: usize) -> Result<i64, String> {
    match arg(args, i)? {
        Value::Int(n) => Ok(*n),
        other => Err(mismatch(other, "int")),
    }
}

fn float(args: &[Value], i: usize) -> Result<f64, String> {
    match arg(args, i)? {
        Value::Float(x) => Ok(*x),
        Value::Int(n) => Ok(*n as f64),
        other => Err(mismatch(other, "float64")),
    }
}

fn string(args: &[Value], i: usize) -> Result<&str, String> {
    match arg(args, i)? {
        Value::String(s) => Ok(s),
        other => Err(mismatch(other, "string")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_of_matches_signature() {
        let inc = TypedFn::IntToInt(|n| n + 1);
        assert_eq!(TypedFn::index_of(inc.signature()), Some(inc.index()));
        let upper = TypedFn::StringToString(|s| s.to_uppercase());
        assert_eq!(TypedFn::index_of(upper.signature()), Some(8));
        assert_eq!(TypedFn::index_of(&FuncType::fast()), None);
    }

    #[test]
    fn test_call_unboxes_arguments() {
        let join = TypedFn::StringStringToString(|a, b| format!("{a}{b}"));
        let result = join.call(&[Value::from("ab"), Value::from("cd")]);
        assert_eq!(result, Ok(Value::from("abcd")));
    }

    #[test]
    fn test_float_accepts_int() {
        let half = TypedFn::FloatToFloat(|x| x / 2.0);
        assert_eq!(half.call(&[Value::Int(3)]), Ok(Value::Float(1.5)));
    }

    #[test]
    fn test_call_rejects_wrong_type() {
        let inc = TypedFn::IntToInt(|n| n + 1);
        assert_eq!(
            inc.call(&[Value::from("x")]),
            Err("cannot use string as argument (type int)".to_string())
        );
    }
}
