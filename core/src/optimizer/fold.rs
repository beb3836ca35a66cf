use tracing::trace;

use crate::ast::{BinaryOp, Builtin, Node, NodeKind, UnaryOp, Visitor, patch};
use crate::diagnostics::{FileError, Span};
use crate::types::Type;
use crate::values::Value;

/// Constant folding. Run repeatedly: a fold can make its parent foldable.
#[derive(Default)]
pub(super) struct Fold {
    pub(super) applied: bool,
    pub(super) error: Option<FileError>,
}

impl Visitor for Fold {
    fn exit(&mut self, node: &mut Node) {
        if self.error.is_some() {
            return;
        }
        let replacement = match &node.kind {
            NodeKind::Unary { op, node: operand } => unary(*op, operand),
            NodeKind::Binary { op, left, right } => {
                match binary(*op, left, right, node.ty.as_ref()) {
                    Ok(replacement) => replacement,
                    Err(message) => {
                        self.error = Some(FileError::new(message, node.span));
                        return;
                    }
                }
            }
            NodeKind::Array(items) => constant_array(items),
            NodeKind::Builtin {
                name: Builtin::Filter,
                arguments,
            } => merge_filters(arguments),
            _ => None,
        };
        if let Some(replacement) = replacement {
            trace!(from = %crate::ast::dump(node), to = %crate::ast::dump(&replacement), "fold");
            self.applied = true;
            patch(node, replacement);
        }
    }
}

fn leaf(kind: NodeKind) -> Node {
    Node::new(kind, Span::default())
}

fn unary(op: UnaryOp, operand: &Node) -> Option<Node> {
    let NodeKind::Integer(n) = operand.kind else {
        return None;
    };
    let value = match op {
        UnaryOp::Neg => n.checked_neg()?,
        UnaryOp::Plus => n,
        UnaryOp::Not | UnaryOp::Bang => return None,
    };
    let mut folded = leaf(NodeKind::Integer(value));
    folded.ty = operand.ty.clone();
    Some(folded)
}

/// Folds two literal operands. Integer overflow is left to the runtime.
fn binary(
    op: BinaryOp,
    left: &Node,
    right: &Node,
    ty: Option<&Type>,
) -> Result<Option<Node>, &'static str> {
    use BinaryOp::*;

    match (&left.kind, &right.kind) {
        (NodeKind::Integer(a), NodeKind::Integer(b)) => {
            let (a, b) = (*a, *b);
            if matches!(op, Div | Mod) && b == 0 {
                return Err("integer divide by zero");
            }
            // Literals retyped as float by a float parameter.
            if matches!(ty, Some(Type::Float(_))) && matches!(op, Add | Sub | Mul | Div) {
                let (x, y) = (a as f64, b as f64);
                let value = match op {
                    Add => x + y,
                    Sub => x - y,
                    Mul => x * y,
                    _ => x / y,
                };
                return Ok(Some(leaf(NodeKind::Float(value))));
            }
            let value = match op.normalized() {
                Add => a.checked_add(b),
                Sub => a.checked_sub(b),
                Mul => a.checked_mul(b),
                Div => a.checked_div(b),
                Mod => a.checked_rem(b),
                Pow => return Ok(Some(leaf(NodeKind::Float((a as f64).powf(b as f64))))),
                _ => None,
            };
            Ok(value.map(|value| {
                let mut folded = leaf(NodeKind::Integer(value));
                folded.ty = left.ty.clone();
                folded
            }))
        }
        (NodeKind::String(a), NodeKind::String(b)) if op == Add => {
            let mut joined = a.clone();
            joined.push_str(b);
            Ok(Some(leaf(NodeKind::String(joined))))
        }
        _ => Ok(None),
    }
}

/// An array of integer literals or of string literals becomes one constant.
fn constant_array(items: &[Node]) -> Option<Node> {
    if items.is_empty() {
        return None;
    }
    let integers = items.iter().all(|n| matches!(n.kind, NodeKind::Integer(_)));
    let strings = items.iter().all(|n| matches!(n.kind, NodeKind::String(_)));
    if !integers && !strings {
        return None;
    }
    let values = items.iter().filter_map(Node::constant_value);
    Some(leaf(NodeKind::Constant(Value::array(values))))
}

/// `filter(filter(xs, {f}), {g})` becomes `filter(xs, {f && g})`.
fn merge_filters(arguments: &[Node]) -> Option<Node> {
    let [inner, outer] = arguments else {
        return None;
    };
    let NodeKind::Builtin {
        name: Builtin::Filter,
        arguments: inner_arguments,
    } = &inner.kind
    else {
        return None;
    };
    let [collection, inner_closure] = inner_arguments.as_slice() else {
        return None;
    };
    let (NodeKind::Closure(f), NodeKind::Closure(g)) = (&inner_closure.kind, &outer.kind) else {
        return None;
    };
    let mut body = Node::new(
        NodeKind::Binary {
            op: BinaryOp::AndAnd,
            left: f.clone(),
            right: g.clone(),
        },
        g.span,
    );
    if f.ty.is_some() {
        body.ty = Some(Type::Bool);
    }
    let closure = Node {
        kind: NodeKind::Closure(body.boxed()),
        span: inner_closure.span,
        ty: inner_closure.ty.clone(),
    };
    Some(leaf(NodeKind::Builtin {
        name: Builtin::Filter,
        arguments: vec![collection.clone(), closure],
    }))
}
