use std::sync::Arc;

use ecow::EcoString;

use super::{FuncType, Type};

/// Static description of a host record.
///
/// Fields flagged `embedded` must hold a [`Type::Struct`]; their fields and
/// methods are promoted to the enclosing record.
#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub name: EcoString,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    /// Type of the plain value the record stands for, if any.
    pub unwraps_to: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: EcoString,
    pub ty: Type,
    pub embedded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: EcoString,
    pub ty: Arc<FuncType>,
}

/// What a name resolves to on a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field(Type),
    Method(Arc<FuncType>),
}

impl Member {
    pub fn ty(&self) -> Type {
        match self {
            Member::Field(ty) => ty.clone(),
            Member::Method(f) => Type::Func(f.clone()),
        }
    }
}

/// Two embedded records expose the same name at the same depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ambiguous;

impl StructType {
    pub fn new(name: impl Into<EcoString>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            methods: Vec::new(),
            unwraps_to: None,
        }
    }

    pub fn field(mut self, name: impl Into<EcoString>, ty: Type) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty,
            embedded: false,
        });
        self
    }

    pub fn embed(mut self, name: impl Into<EcoString>, inner: Arc<StructType>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty: Type::Struct(inner),
            embedded: true,
        });
        self
    }

    pub fn method(mut self, name: impl Into<EcoString>, ty: FuncType) -> Self {
        self.methods.push(Method {
            name: name.into(),
            ty: Arc::new(ty),
        });
        self
    }

    /// Declares that records of this type wrap a plain `ty` value, read with
    /// [`Object::value`](crate::values::Object::value).
    pub fn unwraps_to(mut self, ty: Type) -> Self {
        self.unwraps_to = Some(ty);
        self
    }

    fn own_member(&self, name: &str) -> Option<Member> {
        if let Some(field) = self.fields.iter().find(|f| f.name == name) {
            return Some(Member::Field(field.ty.clone()));
        }
        self.methods
            .iter()
            .find(|m| m.name == name)
            .map(|m| Member::Method(m.ty.clone()))
    }

    fn embedded(&self) -> impl Iterator<Item = &StructType> {
        self.fields.iter().filter(|f| f.embedded).filter_map(|f| match &f.ty {
            Type::Struct(inner) => Some(inner.as_ref()),
            _ => None,
        })
    }

    /// Resolves `name` breadth-first through embedded records.
    ///
    /// The shallowest match wins; two matches at the same depth are
    /// [`Ambiguous`].
    pub fn lookup(&self, name: &str) -> Result<Option<Member>, Ambiguous> {
        let mut level: Vec<&StructType> = vec![self];
        while !level.is_empty() {
            let mut found = None;
            let mut hits = 0;
            let mut next = Vec::new();
            for &record in &level {
                if let Some(member) = record.own_member(name) {
                    hits += 1;
                    found.get_or_insert(member);
                }
                next.extend(record.embedded());
            }
            match hits {
                0 => level = next,
                1 => return Ok(found),
                _ => return Err(Ambiguous),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedded_pair() -> StructType {
        let a = StructType::new("A").field("Ambiguous", Type::Bool).field("OnlyA", Type::INT);
        let b = StructType::new("B").field("Ambiguous", Type::String);
        StructType::new("Env")
            .embed("A", Arc::new(a))
            .embed("B", Arc::new(b))
            .field("Name", Type::String)
    }

    #[test]
    fn test_lookup_own_field() {
        let env = embedded_pair();
        assert_eq!(env.lookup("Name"), Ok(Some(Member::Field(Type::String))));
    }

    #[test]
    fn test_lookup_promoted_field() {
        let env = embedded_pair();
        assert_eq!(env.lookup("OnlyA"), Ok(Some(Member::Field(Type::INT))));
    }

    #[test]
    fn test_lookup_ambiguous() {
        assert_eq!(embedded_pair().lookup("Ambiguous"), Err(Ambiguous));
    }

    #[test]
    fn test_shallow_field_shadows_embedded() {
        let inner = StructType::new("Inner").field("Name", Type::INT);
        let env = StructType::new("Env")
            .embed("Inner", Arc::new(inner))
            .field("Name", Type::String);
        assert_eq!(env.lookup("Name"), Ok(Some(Member::Field(Type::String))));
    }

    #[test]
    fn test_lookup_method() {
        let env = StructType::new("Env").method("Add", FuncType::new(vec![Type::INT], Type::INT));
        assert!(matches!(env.lookup("Add"), Ok(Some(Member::Method(_)))));
        assert_eq!(env.lookup("Missing"), Ok(None));
    }
}
