//! Bytecode compiler.
//!
//! Lowers a checked (and usually optimized) tree to a [`Program`]:
//!
//! - Statically typed operands get specialized instructions (`IntBinOp`,
//!   `FloatCmpOp`, ...); `any` operands fall back to the dynamic ones.
//! - Short-circuit operators, conditionals and `?.` chains use patched
//!   forward jumps.
//! - Closure builtins open a VM scope and loop over it with a backward jump.

mod bytecode;

#[cfg(test)]
mod bytecode_test;

pub use bytecode::BytecodeCompiler;

use tracing::debug;

use crate::api::Expect;
use crate::ast::Node;
use crate::errors::Error;
use crate::vm::{Limits, Program};

/// Compiles a checked tree. `source` is kept for runtime diagnostics.
pub fn compile(
    node: &Node,
    source: &str,
    expect: Option<Expect>,
    limits: Limits,
) -> Result<Program, Error> {
    let program = BytecodeCompiler::compile(node, source, expect, limits)?;
    debug!(
        instructions = program.instructions().len(),
        constants = program.constants().len(),
        "compiled"
    );
    Ok(program)
}
