//! Tree rewrites applied between checking and code generation.
//!
//! Passes run in a fixed order. Folding and constant-expression evaluation
//! repeat until a walk applies nothing, bounded by an iteration cap.

mod const_expr;
mod const_range;
mod fold;
mod in_array;
mod in_range;
mod sum;

use ecow::EcoString;
use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::ast::{Node, walk};
use crate::errors::Error;
use crate::values::Function;

pub use const_range::MAX_CONST_RANGE;

pub const MAX_FOLD_ITERATIONS: usize = 1000;
pub const MAX_CONST_EXPR_ITERATIONS: usize = 100;

/// Rewrites `node` in place.
///
/// `functions` are the pure host functions that may be evaluated at compile
/// time when all their arguments are constant.
pub fn optimize(node: &mut Node, functions: &HashMap<EcoString, Function>) -> Result<(), Error> {
    walk(node, &mut in_array::InArray);

    let folds = until_fixed_point(MAX_FOLD_ITERATIONS, || {
        let mut fold = fold::Fold::default();
        walk(node, &mut fold);
        match fold.error {
            Some(error) => Err(Error::Compile(error)),
            None => Ok(fold.applied),
        }
    })?;
    if folds >= MAX_FOLD_ITERATIONS {
        warn!(iterations = folds, "constant folding did not reach a fixed point");
    }

    if !functions.is_empty() {
        let evaluations = until_fixed_point(MAX_CONST_EXPR_ITERATIONS, || {
            let mut const_expr = const_expr::ConstExpr::new(functions);
            walk(node, &mut const_expr);
            match const_expr.error {
                Some(error) => Err(error),
                None => Ok(const_expr.applied),
            }
        })?;
        if evaluations >= MAX_CONST_EXPR_ITERATIONS {
            warn!(
                iterations = evaluations,
                "constant expressions did not reach a fixed point"
            );
        }
    }

    walk(node, &mut in_range::InRange);
    walk(node, &mut const_range::ConstRange);
    walk(node, &mut sum::Sum);
    debug!(folds, "optimized expression");
    Ok(())
}

/// Repeats `pass` while it reports a rewrite, at most `cap` times.
///
/// Returns how many rounds applied a rewrite; reaching `cap` means the
/// tree may not be at a fixed point yet.
fn until_fixed_point<E>(cap: usize, mut pass: impl FnMut() -> Result<bool, E>) -> Result<usize, E> {
    let mut rounds = 0;
    while rounds < cap && pass()? {
        rounds += 1;
    }
    Ok(rounds)
}
