//! Public entry points.
//!
//! Compile once, run many times:
//!
//! ```ignore
//! use gauge_core::api::{Config, compile, run};
//! use gauge_core::values::Value;
//!
//! let env = Value::map([("price", Value::from(120)), ("limit", Value::from(100))]);
//! let program = compile("price > limit", Config::default().env(env.clone()).as_bool())?;
//! assert_eq!(run(&program, &env)?, Value::Bool(true));
//! ```
//!
//! [`eval`] is the one-shot form: it skips type checking and optimization.

mod config;

pub use config::{Config, Expect};

use crate::ast::walk;
use crate::checker::check;
use crate::compiler;
use crate::errors::Error;
use crate::optimizer::optimize;
use crate::parser::parse;
use crate::values::Value;
use crate::vm::{self, Limits, Program};

/// Parses, checks, optimizes and compiles `source`.
pub fn compile(source: &str, mut config: Config) -> Result<Program, Error> {
    compile_tree(source, &mut config).map_err(|e| e.bind(source))
}

fn compile_tree(source: &str, config: &mut Config) -> Result<Program, Error> {
    let functions = config.const_functions()?;

    let mut tree = parse(source)?;

    let mut visitors = core::mem::take(&mut config.visitors);
    for visitor in visitors.iter_mut() {
        // Visitors may rely on types; the final check below reports errors.
        let _ = check(&mut tree, config);
        walk(&mut tree, visitor.as_mut());
    }
    config.visitors = visitors;

    check(&mut tree, config)?;

    if config.optimize {
        optimize(&mut tree, &functions)?;
    }

    compiler::compile(&tree, source, config.expect, config.limits)
}

/// Runs a compiled program against `env`.
pub fn run(program: &Program, env: &Value) -> Result<Value, Error> {
    vm::run(program, env)
}

/// Compiles and runs `source` once, without type checking or optimization.
pub fn eval(source: &str, env: &Value) -> Result<Value, Error> {
    let tree = parse(source).map_err(|e| e.bind(source))?;
    let program = compiler::compile(&tree, source, None, Limits::default())
        .map_err(|e| e.bind(source))?;
    run(&program, env)
}
