//! Stack machine executing compiled [`Program`]s.

mod debugger;
mod error;
mod instruction_set;
mod operators;
mod program;
mod runtime;
mod stack;

pub use debugger::{Debugger, Step};
pub use instruction_set::{CmpOp, Instruction};
pub use program::Program;
pub use runtime::{Scope, Vm};

pub(crate) use stack::Stack;

use tracing::debug;

use crate::errors::Error;
use crate::values::Value;

/// Bounds on a single run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Instructions executed before the run is aborted.
    pub max_steps: u64,
    /// Elements allocated by arrays, maps, ranges and closure results.
    pub memory_budget: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_steps: 10_000_000,
            memory_budget: 1_000_000,
        }
    }
}

/// Runs `program` against `env` to completion.
pub fn run(program: &Program, env: &Value) -> Result<Value, Error> {
    let mut vm = Vm::new(program, env);
    let result = vm.run().map_err(|e| e.bind(&program.source));
    debug!(ok = result.is_ok(), "run");
    result
}
