//! The expression tree.
//!
//! The parser produces a [`Node`] tree, the checker annotates every node with
//! its type, the optimizer rewrites it in place through the [`Visitor`]
//! protocol, and the compiler lowers it to bytecode. [`dump`] and [`print`]
//! turn a tree back into text, the first as an S-expression for tests and the
//! second as source code.

mod dump;
mod node;
mod print;
mod visitor;

pub use dump::dump;
pub use node::{BinaryOp, Builtin, Dispatch, Node, NodeKind, UnaryOp};
pub use print::print;
pub(crate) use print::quote;
pub use visitor::{Visitor, patch, walk};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Span;
    use pretty_assertions::assert_eq;

    fn leaf(kind: NodeKind) -> Node {
        Node::new(kind, Span::default())
    }

    fn int(n: i64) -> Node {
        leaf(NodeKind::Integer(n))
    }

    fn binary(op: BinaryOp, left: Node, right: Node) -> Node {
        leaf(NodeKind::Binary {
            op,
            left: left.boxed(),
            right: right.boxed(),
        })
    }

    fn member(node: Node, name: &str, optional: bool) -> Node {
        leaf(NodeKind::Member {
            node: node.boxed(),
            property: leaf(NodeKind::String(name.into())).boxed(),
            optional,
        })
    }

    #[test]
    fn test_dump_arithmetic() {
        let tree = binary(BinaryOp::Sub, binary(BinaryOp::Pow, int(2), int(4)), int(1));
        assert_eq!(dump(&tree), "(- (** 2 4) 1)");
        assert_eq!(print(&tree), "((2 ** 4) - 1)");
    }

    #[test]
    fn test_dump_optional_chain() {
        let foo = leaf(NodeKind::Identifier("foo".into()));
        let tree = leaf(NodeKind::Chain(member(foo, "bar", true).boxed()));
        assert_eq!(dump(&tree), r#"(chain (?. foo "bar"))"#);
        assert_eq!(print(&tree), "foo?.bar");
    }

    #[test]
    fn test_print_member_with_non_identifier_key() {
        let foo = leaf(NodeKind::Identifier("foo".into()));
        assert_eq!(print(&member(foo.clone(), "a b", false)), r#"foo["a b"]"#);
        assert_eq!(print(&member(foo, "x", true)), r#"foo?.x"#);
    }

    #[test]
    fn test_print_builtin_and_closure() {
        let body = binary(BinaryOp::Mul, leaf(NodeKind::Pointer), int(2));
        let tree = leaf(NodeKind::Builtin {
            name: Builtin::Map,
            arguments: vec![
                leaf(NodeKind::Identifier("xs".into())),
                leaf(NodeKind::Closure(body.boxed())),
            ],
        });
        assert_eq!(dump(&tree), "(map xs (closure (* # 2)))");
        assert_eq!(print(&tree), "map(xs, {(# * 2)})");
    }

    #[test]
    fn test_print_map_and_conditional() {
        let pair = leaf(NodeKind::Pair {
            key: leaf(NodeKind::String("a\"b".into())).boxed(),
            value: leaf(NodeKind::Float(1.5)).boxed(),
        });
        let tree = leaf(NodeKind::Conditional {
            cond: leaf(NodeKind::Bool(true)).boxed(),
            then: leaf(NodeKind::Map(vec![pair])).boxed(),
            otherwise: leaf(NodeKind::Nil).boxed(),
        });
        assert_eq!(print(&tree), r#"(true ? {"a\"b": 1.5} : nil)"#);
        assert_eq!(dump(&tree), r#"(if true {"a\"b": 1.5} nil)"#);
    }

    #[test]
    fn test_quote_control_characters() {
        assert_eq!(quote("a\nb\u{1}"), r#""a\nb\u0001""#);
    }
}
