//! Static type checking.
//!
//! [`check`] resolves every name against the configured [`Nature`], types
//! every node, validates operands, calls and closures, and stamps each call
//! site with its [`Dispatch`]. Binary operators the operand table rejects are
//! retried against the overloads registered on the [`Config`].
//!
//! [`Nature`]: crate::types::Nature
//! [`Dispatch`]: crate::ast::Dispatch

mod checker;
mod operators;

use tracing::debug;

use crate::api::{Config, Expect};
use crate::ast::Node;
use crate::errors::Error;
use crate::types::Type;

pub(crate) use operators::combined;

/// Types `node` in place and returns the type of the whole expression.
pub fn check(node: &mut Node, config: &Config) -> Result<Type, Error> {
    let ty = checker::Checker::new(config)
        .visit(node)
        .map_err(Error::Compile)?;
    if let Some(expect) = config.expect {
        let ok = match expect {
            Expect::Bool => ty.is_bool(),
            Expect::Int64 | Expect::Float64 => ty.is_number(),
        };
        if !ok && !ty.is_any() {
            return Err(Error::Expect(format!(
                "expected {}, but got {}",
                expect, ty
            )));
        }
    }
    debug!(ty = %ty, "checked expression");
    Ok(ty)
}

#[cfg(test)]
mod checker_test;
