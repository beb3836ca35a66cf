//! Host functions and their calling conventions.

use core::fmt;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use ecow::EcoString;

use super::{TypedFn, Value};
use crate::errors::HostError;
use crate::types::FuncType;

type FastFn = dyn Fn(&[Value]) -> Value + Send + Sync;
type GenericFn = dyn Fn(&[Value]) -> Result<Value, HostError> + Send + Sync;

/// How a host function is invoked.
///
/// Ordered from cheapest to most general:
/// - `Fast`: `(...any) any`, receives the arguments as-is and cannot fail.
/// - `Typed`: one of the fixed signatures in [`TypedFn`]; arguments are
///   unboxed into native Rust types.
/// - `Generic`: any declared signature; may fail with a [`HostError`].
#[derive(Clone)]
pub enum Callable {
    Fast(Arc<FastFn>),
    Typed(TypedFn),
    Generic(Arc<GenericFn>),
}

#[derive(Clone)]
pub struct Function {
    name: EcoString,
    ty: Arc<FuncType>,
    callable: Callable,
}

/// Why a host call failed.
#[derive(Debug, Clone)]
pub enum CallError {
    /// The function returned an error.
    Host(HostError),
    /// The function panicked.
    Panic(String),
    /// The arguments did not match the signature.
    Argument(String),
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::Host(e) => write!(f, "{}", e),
            CallError::Panic(msg) | CallError::Argument(msg) => f.write_str(msg),
        }
    }
}

impl Function {
    pub fn fast<F>(name: impl Into<EcoString>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            ty: Arc::new(FuncType::fast()),
            callable: Callable::Fast(Arc::new(f)),
        }
    }

    pub fn typed(name: impl Into<EcoString>, f: TypedFn) -> Self {
        Self {
            name: name.into(),
            ty: Arc::new(f.signature().clone()),
            callable: Callable::Typed(f),
        }
    }

    /// A generic function with the declared signature `ty`.
    pub fn new<F>(name: impl Into<EcoString>, ty: FuncType, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            ty: Arc::new(ty),
            callable: Callable::Generic(Arc::new(f)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &Arc<FuncType> {
        &self.ty
    }

    pub fn callable(&self) -> &Callable {
        &self.callable
    }

    /// Calls the function through its own calling convention.
    ///
    /// Arity is validated against the declared signature, so dynamically
    /// typed call sites get a diagnostic instead of a confused host function.
    pub fn call(&self, args: &[Value]) -> Result<Value, CallError> {
        self.check_arity(args.len())?;
        guard(|| match &self.callable {
            Callable::Fast(f) => Ok(f(args)),
            Callable::Typed(t) => t.call(args).map_err(CallError::Argument),
            Callable::Generic(f) => f(args).map_err(CallError::Host),
        })
    }

    fn check_arity(&self, given: usize) -> Result<(), CallError> {
        let declared = self.ty.params.len();
        if given < declared {
            return Err(CallError::Argument(format!(
                "not enough arguments to call {}",
                self.name
            )));
        }
        if given > declared && !self.ty.is_variadic() {
            return Err(CallError::Argument(format!(
                "too many arguments to call {}",
                self.name
            )));
        }
        Ok(())
    }

    /// Same function object, not merely the same behavior.
    pub fn same_as(&self, other: &Function) -> bool {
        self.name == other.name
            && match (&self.callable, &other.callable) {
                (Callable::Fast(a), Callable::Fast(b)) => Arc::ptr_eq(a, b),
                (Callable::Generic(a), Callable::Generic(b)) => Arc::ptr_eq(a, b),
                (Callable::Typed(a), Callable::Typed(b)) => a.index() == b.index(),
                _ => false,
            }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("type", &format_args!("{}", self.ty))
            .finish()
    }
}

/// Runs host code, turning a panic into [`CallError::Panic`].
pub(crate) fn guard<T>(f: impl FnOnce() -> Result<T, CallError>) -> Result<T, CallError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(CallError::Panic(panic_message(payload))),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "host function panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    #[test]
    fn test_fast_call() {
        let len = Function::fast("count", |args| Value::Int(args.len() as i64));
        assert_eq!(len.call(&[Value::Nil, Value::Nil]).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_generic_error_is_preserved() {
        let f = Function::new(
            "WillError",
            FuncType::fallible(vec![Type::String], Type::Bool),
            |_| Err(HostError::msg("error")),
        );
        match f.call(&[Value::from("yes")]) {
            Err(CallError::Host(e)) => assert_eq!(e.to_string(), "error"),
            other => panic!("expected host error, got {:?}", other),
        }
    }

    #[test]
    fn test_panic_is_caught() {
        let f = Function::typed("divide", TypedFn::IntIntToInt(|a, b| a / b));
        match f.call(&[Value::Int(1), Value::Int(0)]) {
            Err(CallError::Panic(msg)) => assert!(msg.contains("divide by zero"), "{msg}"),
            other => panic!("expected panic, got {:?}", other),
        }
    }

    #[test]
    fn test_arity_is_checked() {
        let f = Function::typed("inc", TypedFn::IntToInt(|n| n + 1));
        let err = f.call(&[]).unwrap_err();
        assert_eq!(err.to_string(), "not enough arguments to call inc");
        let err = f.call(&[Value::Int(1), Value::Int(2)]).unwrap_err();
        assert_eq!(err.to_string(), "too many arguments to call inc");
    }
}
