use crate::ast::{BinaryOp, Node, NodeKind, Visitor, patch};
use crate::values::Value;

/// Longest literal range materialized at compile time.
pub const MAX_CONST_RANGE: i64 = 100_000;

/// `lo..hi` with literal bounds becomes a constant array. A descending range
/// is empty.
pub(super) struct ConstRange;

impl Visitor for ConstRange {
    fn exit(&mut self, node: &mut Node) {
        let NodeKind::Binary {
            op: BinaryOp::Range,
            left,
            right,
        } = &node.kind
        else {
            return;
        };
        let (NodeKind::Integer(lo), NodeKind::Integer(hi)) = (&left.kind, &right.kind) else {
            return;
        };
        let (lo, hi) = (*lo, *hi);
        let size = hi as i128 - lo as i128 + 1;
        if size > MAX_CONST_RANGE as i128 {
            return;
        }
        let values = (lo..=hi).map(Value::Int);
        let span = node.span;
        patch(node, Node::new(NodeKind::Constant(Value::array(values)), span));
    }
}
