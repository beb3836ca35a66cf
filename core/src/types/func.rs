use core::fmt;

use super::Type;

/// Signature of a host function.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncType {
    pub params: Vec<Type>,
    /// Element type of the trailing variadic parameter, if any.
    pub variadic: Option<Type>,
    pub results: Vec<Type>,
}

impl FuncType {
    pub fn new(params: Vec<Type>, result: Type) -> Self {
        Self {
            params,
            variadic: None,
            results: vec![result],
        }
    }

    /// A `(result, error)` returning signature.
    pub fn fallible(params: Vec<Type>, result: Type) -> Self {
        Self {
            params,
            variadic: None,
            results: vec![result, Type::Error],
        }
    }

    pub fn variadic(params: Vec<Type>, rest: Type, result: Type) -> Self {
        Self {
            params,
            variadic: Some(rest),
            results: vec![result],
        }
    }

    /// The `(...any) any` signature served by fast dispatch.
    pub fn fast() -> Self {
        Self::variadic(Vec::new(), Type::Any, Type::Any)
    }

    pub fn is_fast(&self) -> bool {
        self.params.is_empty()
            && self.variadic == Some(Type::Any)
            && self.results == [Type::Any]
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic.is_some()
    }

    /// Whether the function reports failure through a trailing error result.
    pub fn returns_error(&self) -> bool {
        self.results.len() == 2 && self.results[1] == Type::Error
    }

    /// Declared type of the `i`th argument.
    pub fn param(&self, i: usize) -> Option<&Type> {
        self.params.get(i).or(self.variadic.as_ref())
    }

    pub fn result(&self) -> Option<&Type> {
        self.results.first()
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("func(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", param)?;
        }
        if let Some(rest) = &self.variadic {
            if !self.params.is_empty() {
                f.write_str(", ")?;
            }
            write!(f, "...{}", rest)?;
        }
        f.write_str(")")?;
        match self.results.as_slice() {
            [] => Ok(()),
            [single] => write!(f, " {}", single),
            many => {
                f.write_str(" (")?;
                for (i, result) in many.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", result)?;
                }
                f.write_str(")")
            }
        }
    }
}
