use core::fmt::Write;

use super::{Node, NodeKind};

/// Source text for a tree.
///
/// Every compound expression is parenthesized, so parsing the output yields
/// the same tree again.
pub fn print(node: &Node) -> String {
    let mut out = String::new();
    write_node(&mut out, node);
    out
}

/// Double-quoted string literal with escapes the lexer understands.
pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
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
        NodeKind::Constant(value) => match value.as_str() {
            Some(s) => out.push_str(&quote(s)),
            None => {
                let _ = write!(out, "{}", value);
            }
        },
        NodeKind::Identifier(name) => out.push_str(name),
        NodeKind::Pointer => out.push('#'),
        NodeKind::Unary { op, node } => {
            out.push('(');
            out.push_str(op.as_str());
            if op.as_str() == "not" {
                out.push(' ');
            }
            write_node(out, node);
            out.push(')');
        }
        NodeKind::Binary { op, left, right } => {
            out.push('(');
            write_node(out, left);
            out.push(' ');
            out.push_str(op.as_str());
            out.push(' ');
            write_node(out, right);
            out.push(')');
        }
        NodeKind::Chain(node) => write_node(out, node),
        NodeKind::Member {
            node,
            property,
            optional,
        } => {
            write_node(out, node);
            if *optional {
                out.push_str("?.");
            }
            match &property.kind {
                NodeKind::String(name) if is_identifier(name) => {
                    if !*optional {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                _ => {
                    out.push('[');
                    write_node(out, property);
                    out.push(']');
                }
            }
        }
        NodeKind::Slice { node, from, to } => {
            write_node(out, node);
            out.push('[');
            if let Some(from) = from {
                write_node(out, from);
            }
            out.push(':');
            if let Some(to) = to {
                write_node(out, to);
            }
            out.push(']');
        }
        NodeKind::Call {
            callee, arguments, ..
        } => {
            write_node(out, callee);
            write_list(out, '(', arguments, ')');
        }
        NodeKind::Builtin { name, arguments } => {
            out.push_str(name.as_str());
            write_list(out, '(', arguments, ')');
        }
        NodeKind::Closure(body) => {
            out.push('{');
            write_node(out, body);
            out.push('}');
        }
        NodeKind::Array(items) => write_list(out, '[', items, ']'),
        NodeKind::Map(pairs) => write_list(out, '{', pairs, '}'),
        NodeKind::Pair { key, value } => {
            match &key.kind {
                NodeKind::String(_) => write_node(out, key),
                _ => {
                    out.push('(');
                    write_node(out, key);
                    out.push(')');
                }
            }
            out.push_str(": ");
            write_node(out, value);
        }
        NodeKind::Conditional {
            cond,
            then,
            otherwise,
        } => {
            out.push('(');
            write_node(out, cond);
            out.push_str(" ? ");
            write_node(out, then);
            out.push_str(" : ");
            write_node(out, otherwise);
            out.push(')');
        }
    }
}

fn write_list(out: &mut String, open: char, items: &[Node], close: char) {
    out.push(open);
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_node(out, item);
    }
    out.push(close);
}
