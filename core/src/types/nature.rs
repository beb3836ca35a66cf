use std::sync::Arc;

use ecow::EcoString;
use hashbrown::HashMap;

use super::{Ambiguous, StructType, Type};
use crate::values::Value;

/// Static description of the environment an expression runs against.
///
/// `strict` natures reject unknown identifiers; non-strict ones resolve them
/// to the map's default element type, or [`Type::Any`].
#[derive(Debug, Clone, PartialEq)]
pub enum Nature {
    Any,
    Nil,
    Struct {
        ty: Arc<StructType>,
        strict: bool,
    },
    Map {
        fields: HashMap<EcoString, Type>,
        default: Option<Type>,
        strict: bool,
    },
}

impl Nature {
    /// Describes an environment value.
    pub fn of(env: &Value) -> Nature {
        match env {
            Value::Nil => Nature::Nil,
            Value::Map(entries) => Nature::Map {
                fields: entries
                    .iter()
                    .map(|(name, value)| (name.clone(), value.type_of()))
                    .collect(),
                default: None,
                strict: true,
            },
            Value::Object(object) => Nature::Struct {
                ty: object.struct_type().clone(),
                strict: true,
            },
            _ => Nature::Any,
        }
    }

    /// A map environment with declared field types.
    pub fn map<K: Into<EcoString>>(fields: impl IntoIterator<Item = (K, Type)>) -> Nature {
        Nature::Map {
            fields: fields.into_iter().map(|(k, t)| (k.into(), t)).collect(),
            default: None,
            strict: true,
        }
    }

    pub fn record(ty: Arc<StructType>) -> Nature {
        Nature::Struct { ty, strict: true }
    }

    /// Type given to names missing from a map environment.
    pub fn with_default(self, ty: Type) -> Nature {
        match self {
            Nature::Map { fields, strict, .. } => Nature::Map {
                fields,
                default: Some(ty),
                strict,
            },
            other => other,
        }
    }

    pub fn set_strict(&mut self, value: bool) {
        match self {
            Nature::Struct { strict, .. } | Nature::Map { strict, .. } => *strict = value,
            Nature::Any | Nature::Nil => {}
        }
    }

    pub fn is_strict(&self) -> bool {
        match self {
            Nature::Struct { strict, .. } | Nature::Map { strict, .. } => *strict,
            Nature::Any | Nature::Nil => false,
        }
    }

    pub fn lookup(&self, name: &str) -> Result<Option<Type>, Ambiguous> {
        match self {
            Nature::Struct { ty, .. } => Ok(ty.lookup(name)?.map(|m| m.ty())),
            Nature::Map { fields, .. } => Ok(fields.get(name).cloned()),
            Nature::Any | Nature::Nil => Ok(None),
        }
    }

    /// Type of names the nature does not declare.
    pub fn default_type(&self) -> Type {
        match self {
            Nature::Map {
                default: Some(ty), ..
            } => ty.clone(),
            _ => Type::Any,
        }
    }

    /// Type of the whole environment, as seen through `$env`.
    pub fn as_type(&self) -> Type {
        match self {
            Nature::Struct { ty, .. } => Type::Struct(ty.clone()),
            Nature::Map { default, .. } => {
                Type::map(default.clone().unwrap_or(Type::Any))
            }
            Nature::Nil => Type::Nil,
            Nature::Any => Type::Any,
        }
    }
}
