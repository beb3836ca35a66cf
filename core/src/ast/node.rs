use core::fmt;

use ecow::EcoString;

use crate::diagnostics::Span;
use crate::types::Type;
use crate::values::Value;

/// A node of the expression tree.
///
/// Parents own their children, so a pass holding `&mut Node` can overwrite
/// the node in place (see [`super::patch`]). `ty` is filled in by the checker
/// and is authoritative for every later stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Nil,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(EcoString),
    /// A precomputed value. Only produced by the optimizer and by patches.
    Constant(Value),
    Identifier(EcoString),
    /// The implicit closure parameter, `#` or a leading `.`.
    Pointer,
    Unary {
        op: UnaryOp,
        node: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// Marks a member/call sequence that short-circuits to nil on `?.`.
    Chain(Box<Node>),
    /// `node.property` or `node[property]`.
    Member {
        node: Box<Node>,
        property: Box<Node>,
        optional: bool,
    },
    Slice {
        node: Box<Node>,
        from: Option<Box<Node>>,
        to: Option<Box<Node>>,
    },
    Call {
        callee: Box<Node>,
        arguments: Vec<Node>,
        dispatch: Dispatch,
    },
    Builtin {
        name: Builtin,
        arguments: Vec<Node>,
    },
    Closure(Box<Node>),
    Array(Vec<Node>),
    /// Map literal; every element is a [`NodeKind::Pair`].
    Map(Vec<Node>),
    Pair {
        key: Box<Node>,
        value: Box<Node>,
    },
    Conditional {
        cond: Box<Node>,
        then: Box<Node>,
        otherwise: Box<Node>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Bang,
    Neg,
    Plus,
}

/// Binary operators, keeping the spelling used in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Or,
    OrOr,
    And,
    AndAnd,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Caret,
    In,
    Matches,
    Contains,
    StartsWith,
    EndsWith,
    Range,
    Coalesce,
}

/// Calling convention stamped on a call site by the checker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Dispatch {
    #[default]
    Generic,
    Fast,
    /// Index into the typed function table.
    Typed(u16),
}

/// Reserved functions compiled to dedicated instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Len,
    All,
    None,
    Any,
    One,
    Filter,
    Map,
    Count,
    Sum,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self {
            kind,
            span,
            ty: None,
        }
    }

    pub fn with_type(mut self, ty: Type) -> Self {
        self.ty = Some(ty);
        self
    }

    /// Checked type, or `any` for nodes the checker has not seen.
    pub fn ty(&self) -> &Type {
        static ANY: Type = Type::Any;
        self.ty.as_ref().unwrap_or(&ANY)
    }

    pub fn boxed(self) -> Box<Node> {
        Box::new(self)
    }

    /// Literal and constant nodes.
    pub fn is_constant(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Nil
                | NodeKind::Bool(_)
                | NodeKind::Integer(_)
                | NodeKind::Float(_)
                | NodeKind::String(_)
                | NodeKind::Constant(_)
        )
    }

    /// The value of a literal or constant node.
    pub fn constant_value(&self) -> Option<Value> {
        match &self.kind {
            NodeKind::Nil => Some(Value::Nil),
            NodeKind::Bool(b) => Some(Value::Bool(*b)),
            NodeKind::Integer(n) if self.ty().is_float() => Some(Value::Float(*n as f64)),
            NodeKind::Integer(n) => Some(Value::Int(*n)),
            NodeKind::Float(x) => Some(Value::Float(*x)),
            NodeKind::String(s) => Some(Value::String(s.clone())),
            NodeKind::Constant(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Visits the direct children in evaluation order.
    pub fn for_each_child(&self, mut f: impl FnMut(&Node)) {
        match &self.kind {
            NodeKind::Nil
            | NodeKind::Bool(_)
            | NodeKind::Integer(_)
            | NodeKind::Float(_)
            | NodeKind::String(_)
            | NodeKind::Constant(_)
            | NodeKind::Identifier(_)
            | NodeKind::Pointer => {}
            NodeKind::Unary { node, .. } | NodeKind::Chain(node) | NodeKind::Closure(node) => {
                f(node)
            }
            NodeKind::Binary { left, right, .. } => {
                f(left);
                f(right);
            }
            NodeKind::Member { node, property, .. } => {
                f(node);
                f(property);
            }
            NodeKind::Slice { node, from, to } => {
                f(node);
                if let Some(from) = from {
                    f(from);
                }
                if let Some(to) = to {
                    f(to);
                }
            }
            NodeKind::Call {
                callee, arguments, ..
            } => {
                f(callee);
                arguments.iter().for_each(f);
            }
            NodeKind::Builtin { arguments, .. }
            | NodeKind::Array(arguments)
            | NodeKind::Map(arguments) => arguments.iter().for_each(f),
            NodeKind::Pair { key, value } => {
                f(key);
                f(value);
            }
            NodeKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                f(cond);
                f(then);
                f(otherwise);
            }
        }
    }

    /// Mutable counterpart of [`Node::for_each_child`].
    pub fn for_each_child_mut(&mut self, mut f: impl FnMut(&mut Node)) {
        match &mut self.kind {
            NodeKind::Nil
            | NodeKind::Bool(_)
            | NodeKind::Integer(_)
            | NodeKind::Float(_)
            | NodeKind::String(_)
            | NodeKind::Constant(_)
            | NodeKind::Identifier(_)
            | NodeKind::Pointer => {}
            NodeKind::Unary { node, .. } | NodeKind::Chain(node) | NodeKind::Closure(node) => {
                f(node)
            }
            NodeKind::Binary { left, right, .. } => {
                f(left);
                f(right);
            }
            NodeKind::Member { node, property, .. } => {
                f(node);
                f(property);
            }
            NodeKind::Slice { node, from, to } => {
                f(node);
                if let Some(from) = from {
                    f(from);
                }
                if let Some(to) = to {
                    f(to);
                }
            }
            NodeKind::Call {
                callee, arguments, ..
            } => {
                f(callee);
                arguments.iter_mut().for_each(f);
            }
            NodeKind::Builtin { arguments, .. }
            | NodeKind::Array(arguments)
            | NodeKind::Map(arguments) => arguments.iter_mut().for_each(f),
            NodeKind::Pair { key, value } => {
                f(key);
                f(value);
            }
            NodeKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                f(cond);
                f(then);
                f(otherwise);
            }
        }
    }
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Bang => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
        }
    }

    pub fn is_negation(self) -> bool {
        matches!(self, UnaryOp::Not | UnaryOp::Bang)
    }
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::OrOr => "||",
            BinaryOp::And => "and",
            BinaryOp::AndAnd => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Caret => "^",
            BinaryOp::In => "in",
            BinaryOp::Matches => "matches",
            BinaryOp::Contains => "contains",
            BinaryOp::StartsWith => "startsWith",
            BinaryOp::EndsWith => "endsWith",
            BinaryOp::Range => "..",
            BinaryOp::Coalesce => "??",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<BinaryOp> {
        Some(match symbol {
            "or" => BinaryOp::Or,
            "||" => BinaryOp::OrOr,
            "and" => BinaryOp::And,
            "&&" => BinaryOp::AndAnd,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "**" => BinaryOp::Pow,
            "^" => BinaryOp::Caret,
            "in" => BinaryOp::In,
            "matches" => BinaryOp::Matches,
            "contains" => BinaryOp::Contains,
            "startsWith" => BinaryOp::StartsWith,
            "endsWith" => BinaryOp::EndsWith,
            ".." => BinaryOp::Range,
            "??" => BinaryOp::Coalesce,
            _ => return None,
        })
    }

    /// Collapses alternative spellings: `||` to `or`, `&&` to `and`, `^` to `**`.
    pub fn normalized(self) -> BinaryOp {
        match self {
            BinaryOp::OrOr => BinaryOp::Or,
            BinaryOp::AndAnd => BinaryOp::And,
            BinaryOp::Caret => BinaryOp::Pow,
            op => op,
        }
    }

    pub fn is_logical(self) -> bool {
        matches!(self.normalized(), BinaryOp::Or | BinaryOp::And)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        Some(match name {
            "len" => Builtin::Len,
            "all" => Builtin::All,
            "none" => Builtin::None,
            "any" => Builtin::Any,
            "one" => Builtin::One,
            "filter" => Builtin::Filter,
            "map" => Builtin::Map,
            "count" => Builtin::Count,
            "sum" => Builtin::Sum,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Builtin::Len => "len",
            Builtin::All => "all",
            Builtin::None => "none",
            Builtin::Any => "any",
            Builtin::One => "one",
            Builtin::Filter => "filter",
            Builtin::Map => "map",
            Builtin::Count => "count",
            Builtin::Sum => "sum",
        }
    }

    /// Builtins called as `name(collection, {closure})`.
    pub fn takes_closure(self) -> bool {
        !matches!(self, Builtin::Len | Builtin::Sum)
    }

    /// Builtins whose closure must produce a bool.
    pub fn is_predicate(self) -> bool {
        self.takes_closure() && self != Builtin::Map
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
