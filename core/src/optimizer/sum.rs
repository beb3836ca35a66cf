use crate::ast::{BinaryOp, Builtin, Node, NodeKind, Visitor, patch};
use crate::checker::combined;
use crate::types::Type;

/// Rewrites the two `sum` idioms:
///
/// ```text
/// sum([a, b, c])       =>  a + (b + c)
/// sum(map(xs, {f}))    =>  sum(xs, {f})
/// ```
pub(super) struct Sum;

impl Visitor for Sum {
    fn exit(&mut self, node: &mut Node) {
        let NodeKind::Builtin {
            name: Builtin::Sum,
            arguments,
        } = &node.kind
        else {
            return;
        };
        let [argument] = arguments.as_slice() else {
            return;
        };
        let replacement = match &argument.kind {
            NodeKind::Array(items) if items.len() >= 2 => additions(items),
            NodeKind::Builtin {
                name: Builtin::Map,
                arguments: mapped,
            } if mapped.len() == 2 => Node::new(
                NodeKind::Builtin {
                    name: Builtin::Sum,
                    arguments: mapped.clone(),
                },
                node.span,
            ),
            _ => return,
        };
        patch(node, replacement);
    }
}

/// Right-associated `+` chain over `items`.
fn additions(items: &[Node]) -> Node {
    let (last, rest) = match items.split_last() {
        Some(split) => split,
        None => unreachable!("sum rewrite needs at least one element"),
    };
    rest.iter().rev().fold(last.clone(), |right, left| {
        let ty = match (&left.ty, &right.ty) {
            (Some(l), Some(r)) if l.is_number() && r.is_number() => Some(combined(l, r)),
            (Some(_), Some(_)) => Some(Type::Any),
            _ => None,
        };
        Node {
            kind: NodeKind::Binary {
                op: BinaryOp::Add,
                left: left.clone().boxed(),
                right: right.boxed(),
            },
            span: left.span,
            ty,
        }
    })
}
