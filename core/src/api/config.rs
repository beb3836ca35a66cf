use core::fmt;

use ecow::EcoString;
use hashbrown::HashMap;

use crate::ast::{BinaryOp, Visitor};
use crate::errors::Error;
use crate::types::{Nature, Type};
use crate::values::{Function, Value};
use crate::vm::Limits;

/// Result kind requested with [`Config::as_bool`], [`Config::as_int64`] or
/// [`Config::as_float64`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Bool,
    Int64,
    Float64,
}

impl fmt::Display for Expect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Expect::Bool => "bool",
            Expect::Int64 => "int64",
            Expect::Float64 => "float64",
        })
    }
}

/// Options for one compilation.
///
/// ```ignore
/// let config = Config::default()
///     .env(env)
///     .operator("+", ["add"])
///     .const_expr("fib")
///     .as_bool();
/// let program = compile("fib(10) > limit", config)?;
/// ```
pub struct Config {
    pub(crate) env: Option<Value>,
    pub(crate) nature: Nature,
    pub(crate) operators: HashMap<BinaryOp, Vec<EcoString>>,
    pub(crate) const_exprs: Vec<EcoString>,
    pub(crate) expect: Option<Expect>,
    pub(crate) optimize: bool,
    pub(crate) visitors: Vec<Box<dyn Visitor>>,
    pub(crate) limits: Limits,
    pub(crate) errors: Vec<String>,
    allow_undefined: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env: None,
            nature: Nature::Any,
            operators: HashMap::new(),
            const_exprs: Vec::new(),
            expect: None,
            optimize: true,
            visitors: Vec::new(),
            limits: Limits::default(),
            errors: Vec::new(),
            allow_undefined: false,
        }
    }
}

impl Config {
    /// Declares the environment. Its shape becomes the [`Nature`] the
    /// expression is checked against, and its functions are available to
    /// [`Config::const_expr`].
    pub fn env(mut self, env: Value) -> Self {
        self.nature = Nature::of(&env);
        if self.allow_undefined {
            self.nature.set_strict(false);
        }
        self.env = Some(env);
        self
    }

    /// Declares the environment shape without a value.
    pub fn nature(mut self, nature: Nature) -> Self {
        self.nature = nature;
        if self.allow_undefined {
            self.nature.set_strict(false);
        }
        self
    }

    /// Unknown names resolve to `any` (or the map's default element type)
    /// instead of failing the check.
    pub fn allow_undefined_variables(mut self) -> Self {
        self.allow_undefined = true;
        self.nature.set_strict(false);
        self
    }

    /// Registers overloads for a binary operator, tried in order when the
    /// operand types are not otherwise valid.
    pub fn operator<I, S>(mut self, symbol: &str, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<EcoString>,
    {
        match BinaryOp::from_symbol(symbol) {
            Some(op) => self
                .operators
                .entry(op)
                .or_default()
                .extend(names.into_iter().map(Into::into)),
            None => self
                .errors
                .push(format!("unknown operator {} for overloading", symbol)),
        }
        self
    }

    /// Marks an environment function as pure, so calls to it with constant
    /// arguments are evaluated while compiling.
    pub fn const_expr(mut self, name: impl Into<EcoString>) -> Self {
        self.const_exprs.push(name.into());
        self
    }

    pub fn as_bool(mut self) -> Self {
        self.expect = Some(Expect::Bool);
        self
    }

    pub fn as_int64(mut self) -> Self {
        self.expect = Some(Expect::Int64);
        self
    }

    pub fn as_float64(mut self) -> Self {
        self.expect = Some(Expect::Float64);
        self
    }

    pub fn optimize(mut self, enabled: bool) -> Self {
        self.optimize = enabled;
        self
    }

    /// Adds a tree rewrite run after parsing. The tree is checked before
    /// and after every visitor.
    pub fn patch(mut self, visitor: impl Visitor + 'static) -> Self {
        self.visitors.push(Box::new(visitor));
        self
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub(crate) fn is_strict(&self) -> bool {
        self.nature.is_strict()
    }

    /// Resolves the functions registered with [`Config::const_expr`].
    pub(crate) fn const_functions(&self) -> Result<HashMap<EcoString, Function>, Error> {
        if let Some(message) = self.errors.first() {
            return Err(Error::Config(message.clone()));
        }
        let mut functions = HashMap::new();
        for name in &self.const_exprs {
            let Some(env) = &self.env else {
                return Err(Error::Config(format!(
                    "no environment for const expression: {}",
                    name
                )));
            };
            match fetch(env, name) {
                Some(Value::Function(f)) => {
                    functions.insert(name.clone(), f);
                }
                _ => {
                    return Err(Error::Config(format!(
                        "const expression \"{}\" must be a function",
                        name
                    )));
                }
            }
        }
        Ok(functions)
    }

    /// Declared type of an environment name, used for operator overloads.
    pub(crate) fn function_type(&self, name: &str) -> Option<Type> {
        self.nature.lookup(name).ok().flatten()
    }
}

fn fetch(env: &Value, name: &str) -> Option<Value> {
    match env {
        Value::Map(entries) => entries.get(name).cloned(),
        Value::Object(object) => crate::values::lookup(object.as_ref(), name),
        _ => None,
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("nature", &self.nature)
            .field("operators", &self.operators)
            .field("const_exprs", &self.const_exprs)
            .field("expect", &self.expect)
            .field("optimize", &self.optimize)
            .field("visitors", &self.visitors.len())
            .field("limits", &self.limits)
            .finish()
    }
}
