use crate::ast::{BinaryOp, Node, NodeKind, Visitor, patch};
use crate::types::Type;

/// `x in lo..hi` with literal bounds becomes `x >= lo and x <= hi`.
///
/// Only applied when `x` is not a literal and, on a checked tree, is an
/// integer.
pub(super) struct InRange;

impl Visitor for InRange {
    fn exit(&mut self, node: &mut Node) {
        let NodeKind::Binary {
            op: BinaryOp::In,
            left,
            right,
        } = &node.kind
        else {
            return;
        };
        if left.is_constant() || left.ty.as_ref().is_some_and(|t| !t.is_integer()) {
            return;
        }
        let NodeKind::Binary {
            op: BinaryOp::Range,
            left: lo,
            right: hi,
        } = &right.kind
        else {
            return;
        };
        if !matches!(lo.kind, NodeKind::Integer(_)) || !matches!(hi.kind, NodeKind::Integer(_)) {
            return;
        }
        let typed = node.ty.is_some();
        let compare = |op, bound: &Node| {
            let node = Node::new(
                NodeKind::Binary {
                    op,
                    left: left.clone(),
                    right: bound.clone().boxed(),
                },
                node.span,
            );
            if typed { node.with_type(Type::Bool) } else { node }
        };
        let replacement = Node::new(
            NodeKind::Binary {
                op: BinaryOp::And,
                left: compare(BinaryOp::Ge, lo).boxed(),
                right: compare(BinaryOp::Le, hi).boxed(),
            },
            node.span,
        );
        patch(node, replacement);
    }
}
