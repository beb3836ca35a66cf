//! Operand tables for unary and binary operators.

use crate::ast::{BinaryOp, UnaryOp};
use crate::types::{FloatKind, Type};

type Predicate = fn(&Type) -> bool;

/// Result type of `op` applied to `l` and `r`, or `None` when the pair is not
/// admissible.
pub(crate) fn binary(op: BinaryOp, l: &Type, r: &Type) -> Option<Type> {
    use BinaryOp::*;

    match op.normalized() {
        Eq | Ne => l.comparable_with(r).then_some(Type::Bool),
        Or | And => (l.is_bool() && r.is_bool() || or(l, r, &[Type::is_bool])).then_some(Type::Bool),
        Lt | Le | Gt | Ge => {
            let same = l.is_number() && r.is_number()
                || l.is_string() && r.is_string()
                || l.is_time() && r.is_time()
                || l.is_duration() && r.is_duration();
            let ordered: &[Predicate] = &[
                Type::is_number,
                Type::is_string,
                Type::is_time,
                Type::is_duration,
            ];
            (same || or(l, r, ordered)).then_some(Type::Bool)
        }
        Add => {
            if l.is_number() && r.is_number() {
                return Some(combined(l, r));
            }
            match (l, r) {
                (Type::String, Type::String) => return Some(Type::String),
                (Type::Time, Type::Duration) | (Type::Duration, Type::Time) => {
                    return Some(Type::Time);
                }
                (Type::Duration, Type::Duration) => return Some(Type::Duration),
                _ => {}
            }
            let preds: &[Predicate] = &[
                Type::is_number,
                Type::is_string,
                Type::is_time,
                Type::is_duration,
            ];
            or(l, r, preds).then_some(Type::Any)
        }
        Sub => {
            if l.is_number() && r.is_number() {
                return Some(combined(l, r));
            }
            match (l, r) {
                (Type::Time, Type::Time) | (Type::Duration, Type::Duration) => {
                    return Some(Type::Duration);
                }
                (Type::Time, Type::Duration) => return Some(Type::Time),
                _ => {}
            }
            let preds: &[Predicate] = &[Type::is_number, Type::is_time, Type::is_duration];
            or(l, r, preds).then_some(Type::Any)
        }
        Mul | Div => {
            if l.is_number() && r.is_number() {
                return Some(combined(l, r));
            }
            or(l, r, &[Type::is_number]).then_some(Type::Any)
        }
        Mod => {
            if l.is_integer() && r.is_integer() {
                return Some(combined(l, r));
            }
            or(l, r, &[Type::is_integer]).then_some(Type::Any)
        }
        Pow => (l.is_number() && r.is_number() || or(l, r, &[Type::is_number]))
            .then_some(Type::FLOAT),
        In => {
            let key_ok = l.is_string() || l.is_any();
            match r {
                Type::Any | Type::Array(_) => Some(Type::Bool),
                Type::Map(_) | Type::Struct(_) if key_ok => Some(Type::Bool),
                _ => None,
            }
        }
        Matches | Contains | StartsWith | EndsWith => {
            (l.is_string() && r.is_string() || or(l, r, &[Type::is_string]))
                .then_some(Type::Bool)
        }
        Range => (l.is_integer() && r.is_integer() || or(l, r, &[Type::is_integer]))
            .then_some(Type::array(Type::INT)),
        Coalesce => Some(coalesce(l, r)),
        OrOr | AndAnd | Caret => None,
    }
}

/// Result type of a unary operator, or `None` for a mismatched operand.
pub(crate) fn unary(op: UnaryOp, t: &Type) -> Option<Type> {
    match op {
        UnaryOp::Not | UnaryOp::Bang => (t.is_bool() || t.is_any()).then_some(Type::Bool),
        UnaryOp::Neg | UnaryOp::Plus if t.is_number() || t.is_any() => Some(t.clone()),
        UnaryOp::Neg if t.is_duration() => Some(Type::Duration),
        _ => None,
    }
}

/// Type of `a ?? b`.
fn coalesce(l: &Type, r: &Type) -> Type {
    match (l, r) {
        (Type::Nil, r) => r.clone(),
        (l, Type::Nil) => l.clone(),
        (l, r) if r.assignable_to(l) => l.clone(),
        _ => Type::Any,
    }
}

/// Arithmetic result of two numeric operands.
///
/// Equal kinds are kept; any float involved gives `float64`; mixed integer
/// kinds give `int`.
pub(crate) fn combined(l: &Type, r: &Type) -> Type {
    if l == r {
        return l.clone();
    }
    if l.is_float() || r.is_float() {
        return Type::Float(FloatKind::Float64);
    }
    Type::INT
}

/// Either side is `any` and the other satisfies one of `preds`, or both are
/// `any`.
fn or(l: &Type, r: &Type, preds: &[Predicate]) -> bool {
    if l.is_any() && r.is_any() {
        return true;
    }
    if l.is_any() && preds.iter().any(|p| p(r)) {
        return true;
    }
    r.is_any() && preds.iter().any(|p| p(l))
}
