use std::sync::Arc;

use hashbrown::HashSet;

use crate::ast::{BinaryOp, Node, NodeKind, Visitor, patch};
use crate::types::Type;
use crate::values::Value;

/// `x in [1, 2, 3]` and `x in ["a", "b"]` test against a prebuilt set.
pub(super) struct InArray;

impl Visitor for InArray {
    fn exit(&mut self, node: &mut Node) {
        let NodeKind::Binary {
            op: BinaryOp::In,
            right,
            ..
        } = &mut node.kind
        else {
            return;
        };
        let span = right.span;
        let NodeKind::Array(items) = &right.kind else {
            return;
        };
        if items.is_empty() {
            return;
        }
        let set = if items.iter().all(|n| matches!(n.kind, NodeKind::Integer(_))) {
            let set: HashSet<i64> = items
                .iter()
                .filter_map(|n| match n.kind {
                    NodeKind::Integer(v) => Some(v),
                    _ => None,
                })
                .collect();
            Value::IntSet(Arc::new(set))
        } else if items.iter().all(|n| matches!(n.kind, NodeKind::String(_))) {
            let set: HashSet<_> = items
                .iter()
                .filter_map(|n| match &n.kind {
                    NodeKind::String(s) => Some(s.clone()),
                    _ => None,
                })
                .collect();
            Value::StrSet(Arc::new(set))
        } else {
            return;
        };
        patch(right, Node::new(NodeKind::Constant(set), span).with_type(Type::Any));
    }
}
