use core::fmt::Write;

use super::print::quote;
use super::{Node, NodeKind};
use crate::values::Value;

/// Canonical S-expression form of a tree, used to compare trees in tests.
///
/// ```text
/// 2**4-1          =>  (- (** 2 4) 1)
/// foo?.bar        =>  (chain (?. foo "bar"))
/// map(xs, {# * 2}) =>  (map xs (closure (* # 2)))
/// ```
pub fn dump(node: &Node) -> String {
    let mut out = String::new();
    write_node(&mut out, node);
    out
}

fn write_node(out: &mut String, node: &Node) {
    match &node.kind {
        NodeKind::Nil => out.push_str("nil"),
        NodeKind::Bool(b) => {
            let _ = write!(out, "{}", b);
        }
        NodeKind::Integer(n) => {
            let _ = write!(out, "{}", n);
        }
        NodeKind::Float(x) => {
            let _ = write!(out, "{:?}", x);
        }
        NodeKind::String(s) => out.push_str(&quote(s)),
        NodeKind::Constant(value) => {
            out.push_str("Constant(");
            match value {
                Value::String(s) => out.push_str(&quote(s)),
                other => {
                    let _ = write!(out, "{}", other);
                }
            }
            out.push(')');
        }
        NodeKind::Identifier(name) => out.push_str(name),
        NodeKind::Pointer => out.push('#'),
        NodeKind::Unary { op, node } => list(out, op.as_str(), [node.as_ref()]),
        NodeKind::Binary { op, left, right } => list(out, op.as_str(), [left.as_ref(), right.as_ref()]),
        NodeKind::Chain(node) => list(out, "chain", [node.as_ref()]),
        NodeKind::Member {
            node,
            property,
            optional,
        } => {
            let head = if *optional { "?." } else { "." };
            list(out, head, [node.as_ref(), property.as_ref()]);
        }
        NodeKind::Slice { node, from, to } => {
            out.push_str("(slice ");
            write_node(out, node);
            for bound in [from, to] {
                out.push(' ');
                match bound {
                    Some(bound) => write_node(out, bound),
                    None => out.push('_'),
                }
            }
            out.push(')');
        }
        NodeKind::Call {
            callee, arguments, ..
        } => list(out, "call", core::iter::once(callee.as_ref()).chain(arguments)),
        NodeKind::Builtin { name, arguments } => list(out, name.as_str(), arguments),
        NodeKind::Closure(body) => list(out, "closure", [body.as_ref()]),
        NodeKind::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_node(out, item);
            }
            out.push(']');
        }
        NodeKind::Map(pairs) => {
            out.push('{');
            for (i, pair) in pairs.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                match &pair.kind {
                    NodeKind::Pair { key, value } => {
                        write_node(out, key);
                        out.push_str(": ");
                        write_node(out, value);
                    }
                    _ => write_node(out, pair),
                }
            }
            out.push('}');
        }
        NodeKind::Pair { key, value } => list(out, "pair", [key.as_ref(), value.as_ref()]),
        NodeKind::Conditional {
            cond,
            then,
            otherwise,
        } => list(out, "if", [cond.as_ref(), then.as_ref(), otherwise.as_ref()]),
    }
}

fn list<'a>(out: &mut String, head: &str, items: impl IntoIterator<Item = &'a Node>) {
    out.push('(');
    out.push_str(head);
    for item in items {
        out.push(' ');
        write_node(out, item);
    }
    out.push(')');
}
