//! Static types and the environment [`Nature`].
//!
//! [`Type`] is the descriptor the checker attaches to every AST node. Host
//! shapes are described with [`StructType`] (named fields, embedded records
//! and methods) and [`FuncType`] (host function signatures).

mod func;
mod nature;
mod struct_type;

pub use func::FuncType;
pub use nature::Nature;
pub use struct_type::{Ambiguous, Field, Member, Method, StructType};

use core::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Dynamic type; checks involving it are deferred to runtime.
    Any,
    Nil,
    Bool,
    Int(IntKind),
    Float(FloatKind),
    String,
    Time,
    Duration,
    Array(Box<Type>),
    /// String-keyed map with the given element type.
    Map(Box<Type>),
    Struct(Arc<StructType>),
    Func(Arc<FuncType>),
    /// The error slot of a `(value, error)` host function result.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntKind {
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatKind {
    Float32,
    Float64,
}

impl Type {
    pub const INT: Type = Type::Int(IntKind::Int);
    pub const FLOAT: Type = Type::Float(FloatKind::Float64);

    pub fn array(elem: Type) -> Type {
        Type::Array(Box::new(elem))
    }

    pub fn map(elem: Type) -> Type {
        Type::Map(Box::new(elem))
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Type::Any)
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Type::Nil)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Bool)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Int(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::Float(_))
    }

    pub fn is_number(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Type::String)
    }

    pub fn is_time(&self) -> bool {
        matches!(self, Type::Time)
    }

    pub fn is_duration(&self) -> bool {
        matches!(self, Type::Duration)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Type::Map(_))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Type::Struct(_))
    }

    /// Element type of arrays and maps.
    pub fn elem(&self) -> Option<&Type> {
        match self {
            Type::Array(elem) | Type::Map(elem) => Some(elem),
            _ => None,
        }
    }

    /// Whether `nil` is a valid value of this type.
    pub fn is_nillable(&self) -> bool {
        matches!(
            self,
            Type::Any | Type::Nil | Type::Array(_) | Type::Map(_) | Type::Struct(_) | Type::Func(_)
        )
    }

    /// Whether a value of type `self` can be passed where `target` is declared.
    pub fn assignable_to(&self, target: &Type) -> bool {
        if self == target || target.is_any() {
            return true;
        }
        match (self, target) {
            (Type::Nil, t) => t.is_nillable(),
            (Type::Array(a), Type::Array(b)) | (Type::Map(a), Type::Map(b)) => {
                b.is_any() || a.assignable_to(b)
            }
            (Type::Struct(a), Type::Struct(b)) => a.name == b.name,
            _ => false,
        }
    }

    /// Two values of these types may be compared with `==`.
    pub fn comparable_with(&self, other: &Type) -> bool {
        if self.is_any() || other.is_any() || self.is_nil() || other.is_nil() {
            return true;
        }
        if self.is_number() && other.is_number() {
            return true;
        }
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => f.write_str("any"),
            Type::Nil => f.write_str("nil"),
            Type::Bool => f.write_str("bool"),
            Type::Int(kind) => fmt::Display::fmt(kind, f),
            Type::Float(FloatKind::Float32) => f.write_str("float32"),
            Type::Float(FloatKind::Float64) => f.write_str("float64"),
            Type::String => f.write_str("string"),
            Type::Time => f.write_str("time"),
            Type::Duration => f.write_str("duration"),
            Type::Array(elem) => write!(f, "[]{}", elem),
            Type::Map(elem) => write!(f, "map[string]{}", elem),
            Type::Struct(s) => f.write_str(&s.name),
            Type::Func(func) => fmt::Display::fmt(func, f),
            Type::Error => f.write_str("error"),
        }
    }
}

impl fmt::Display for IntKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IntKind::Int => "int",
            IntKind::Int8 => "int8",
            IntKind::Int16 => "int16",
            IntKind::Int32 => "int32",
            IntKind::Int64 => "int64",
            IntKind::Uint => "uint",
            IntKind::Uint8 => "uint8",
            IntKind::Uint16 => "uint16",
            IntKind::Uint32 => "uint32",
            IntKind::Uint64 => "uint64",
        })
    }
}
