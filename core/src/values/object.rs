use core::fmt;
use std::sync::Arc;

use ecow::EcoString;
use hashbrown::HashMap;

use super::{Function, Value};
use crate::types::StructType;

/// A host record the VM can read fields and methods from.
///
/// Implementations report their static shape through [`Object::struct_type`];
/// the checker resolves names against it, and the VM calls [`Object::field`]
/// and [`Object::method`] at runtime.
pub trait Object: fmt::Debug + Send + Sync {
    fn struct_type(&self) -> &Arc<StructType>;

    /// Value of a field declared directly on this record.
    fn field(&self, name: &str) -> Option<Value>;

    /// A method declared directly on this record, bound to it.
    fn method(&self, name: &str) -> Option<Function>;

    /// Values of embedded records, in declaration order.
    fn embedded(&self) -> Vec<Arc<dyn Object>> {
        Vec::new()
    }

    /// The plain value this record wraps. Only consulted when the record's
    /// type declares [`StructType::unwraps_to`].
    fn value(&self) -> Option<Value> {
        None
    }
}

/// Resolves a field or method breadth-first through embedded records.
pub fn lookup(object: &dyn Object, name: &str) -> Option<Value> {
    if let Some(value) = own(object, name) {
        return Some(value);
    }
    let mut level = object.embedded();
    while !level.is_empty() {
        let mut next = Vec::new();
        for inner in &level {
            if let Some(value) = own(inner.as_ref(), name) {
                return Some(value);
            }
            next.extend(inner.embedded());
        }
        level = next;
    }
    None
}

fn own(object: &dyn Object, name: &str) -> Option<Value> {
    object
        .field(name)
        .or_else(|| object.method(name).map(Value::Function))
}

/// A ready-made [`Object`] backed by a field map.
///
/// ```ignore
/// let ty = Arc::new(StructType::new("Ticket").field("Price", Type::INT));
/// let ticket = Record::new(ty).set("Price", 100);
/// ```
#[derive(Debug, Clone)]
pub struct Record {
    ty: Arc<StructType>,
    values: HashMap<EcoString, Value>,
    methods: HashMap<EcoString, Function>,
    wrapped: Option<Value>,
}

impl Record {
    pub fn new(ty: Arc<StructType>) -> Self {
        Self {
            ty,
            values: HashMap::new(),
            methods: HashMap::new(),
            wrapped: None,
        }
    }

    pub fn set(mut self, name: impl Into<EcoString>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Provides the implementation of a declared method.
    pub fn bind(mut self, name: impl Into<EcoString>, function: Function) -> Self {
        self.methods.insert(name.into(), function);
        self
    }

    /// Sets the plain value returned by [`Object::value`].
    pub fn wrap(mut self, value: impl Into<Value>) -> Self {
        self.wrapped = Some(value.into());
        self
    }
}

impl Object for Record {
    fn struct_type(&self) -> &Arc<StructType> {
        &self.ty
    }

    fn field(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.get(name) {
            return Some(value.clone());
        }
        // Declared but unset fields read as nil.
        self.ty
            .fields
            .iter()
            .any(|f| f.name == name && !f.embedded)
            .then_some(Value::Nil)
    }

    fn method(&self, name: &str) -> Option<Function> {
        self.methods.get(name).cloned()
    }

    fn embedded(&self) -> Vec<Arc<dyn Object>> {
        self.ty
            .fields
            .iter()
            .filter(|f| f.embedded)
            .filter_map(|f| match self.values.get(&f.name) {
                Some(Value::Object(inner)) => Some(inner.clone()),
                _ => None,
            })
            .collect()
    }

    fn value(&self) -> Option<Value> {
        self.wrapped.clone()
    }
}
