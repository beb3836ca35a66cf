use ecow::EcoString;
use regex_syntax::ast::ErrorKind as RegexErrorKind;

use super::lexer::{Kind, Number, Token, parse_number, tokenize};
use crate::ast::{BinaryOp, Builtin, Dispatch, Node, NodeKind, UnaryOp};
use crate::diagnostics::{FileError, Span};
use crate::errors::Error;

/// Deepest expression nesting the parser accepts.
pub const MAX_DEPTH: usize = 500;

const UNARY_PRECEDENCE: u8 = 10;

/// Parses `source` into an expression tree.
pub fn parse(source: &str) -> Result<Node, Error> {
    parse_with_max_depth(source, MAX_DEPTH)
}

pub fn parse_with_max_depth(source: &str, max_depth: usize) -> Result<Node, Error> {
    let result = tokenize(source).and_then(|tokens| {
        let mut parser = Parser::new(&tokens, max_depth);
        let node = parser.parse_expression(0)?;
        let rest = parser.current();
        if rest.kind != Kind::Eof {
            return Err(unexpected(rest));
        }
        Ok(node)
    });
    match result {
        Ok(node) => {
            tracing::debug!(len = source.len(), "parsed expression");
            Ok(node)
        }
        Err(err) => Err(Error::Compile(err.bind(source))),
    }
}

type ParseResult<T> = Result<T, FileError>;

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    /// How many closures enclose the current position.
    closures: usize,
    depth: usize,
    max_depth: usize,
}

fn unexpected(token: &Token) -> FileError {
    FileError::new(format!("unexpected token {}", token), token.span)
}

fn binary_operator(token: &Token) -> Option<BinaryOp> {
    if token.kind != Kind::Operator {
        return None;
    }
    BinaryOp::from_symbol(&token.value)
}

fn unary_operator(token: &Token) -> Option<UnaryOp> {
    if token.kind != Kind::Operator {
        return None;
    }
    match token.value.as_str() {
        "not" => Some(UnaryOp::Not),
        "!" => Some(UnaryOp::Bang),
        "-" => Some(UnaryOp::Neg),
        "+" => Some(UnaryOp::Plus),
        _ => None,
    }
}

/// Binding strength, loosest first. The conditional sits below all of these.
fn precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Coalesce => 1,
        BinaryOp::Or | BinaryOp::OrOr => 2,
        BinaryOp::And | BinaryOp::AndAnd => 3,
        BinaryOp::In
        | BinaryOp::Matches
        | BinaryOp::Contains
        | BinaryOp::StartsWith
        | BinaryOp::EndsWith => 4,
        BinaryOp::Eq | BinaryOp::Ne => 5,
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 6,
        BinaryOp::Range => 7,
        BinaryOp::Add | BinaryOp::Sub => 8,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 9,
        BinaryOp::Pow | BinaryOp::Caret => 11,
    }
}

fn is_right_associative(op: BinaryOp) -> bool {
    matches!(op, BinaryOp::Pow | BinaryOp::Caret)
}

/// Operators that may follow `not`, as in `x not in xs`.
fn is_negatable(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::In
            | BinaryOp::Matches
            | BinaryOp::Contains
            | BinaryOp::StartsWith
            | BinaryOp::EndsWith
    )
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token], max_depth: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            closures: 0,
            depth: 0,
            max_depth,
        }
    }

    fn current(&self) -> &'t Token {
        let tokens: &'t [Token] = self.tokens;
        &tokens[self.pos.min(tokens.len() - 1)]
    }

    fn next(&mut self) -> ParseResult<()> {
        if self.pos + 1 >= self.tokens.len() {
            return Err(FileError::new(
                "unexpected end of expression",
                self.current().span,
            ));
        }
        self.pos += 1;
        Ok(())
    }

    fn expect(&mut self, kind: Kind, value: &str) -> ParseResult<()> {
        if self.current().is(kind, value) {
            self.next()
        } else {
            Err(unexpected(self.current()))
        }
    }

    fn parse_expression(&mut self, min_precedence: u8) -> ParseResult<Node> {
        if self.depth >= self.max_depth {
            return Err(FileError::new(
                format!("maximum nesting depth exceeded ({})", self.max_depth),
                self.current().span,
            ));
        }
        self.depth += 1;
        let node = self.parse_binary(min_precedence);
        self.depth -= 1;
        node
    }

    fn parse_binary(&mut self, min_precedence: u8) -> ParseResult<Node> {
        let mut left = self.parse_primary()?;
        loop {
            let mut op_token = self.current();
            let mut negation = None;
            if op_token.is_operator("not") {
                let saved = self.pos;
                self.next()?;
                let suffix = self.current();
                match binary_operator(suffix) {
                    Some(op) if is_negatable(op) && precedence(op) >= min_precedence => {
                        negation = Some(op_token);
                        op_token = suffix;
                    }
                    Some(op) if is_negatable(op) => {
                        self.pos = saved;
                        break;
                    }
                    _ => return Err(unexpected(suffix)),
                }
            }
            let Some(op) = binary_operator(op_token) else {
                break;
            };
            let strength = precedence(op);
            if strength < min_precedence {
                break;
            }
            self.next()?;
            let right = if is_right_associative(op) {
                self.parse_expression(strength)?
            } else {
                self.parse_expression(strength + 1)?
            };
            if op == BinaryOp::Matches {
                if let NodeKind::String(pattern) = &right.kind {
                    check_regex(pattern)
                        .map_err(|msg| FileError::new(msg, self.current().span))?;
                }
            }
            left = Node::new(
                NodeKind::Binary {
                    op,
                    left: left.boxed(),
                    right: right.boxed(),
                },
                op_token.span,
            );
            if let Some(not) = negation {
                left = Node::new(
                    NodeKind::Unary {
                        op: UnaryOp::Not,
                        node: left.boxed(),
                    },
                    not.span,
                );
            }
        }
        if min_precedence == 0 {
            left = self.parse_conditional(left)?;
        }
        Ok(left)
    }

    fn parse_conditional(&mut self, cond: Node) -> ParseResult<Node> {
        let question = self.current();
        if !question.is_operator("?") {
            return Ok(cond);
        }
        self.next()?;
        let then = self.parse_expression(0)?;
        self.expect(Kind::Operator, ":")?;
        let otherwise = self.parse_expression(0)?;
        Ok(Node::new(
            NodeKind::Conditional {
                cond: cond.boxed(),
                then: then.boxed(),
                otherwise: otherwise.boxed(),
            },
            question.span,
        ))
    }

    fn parse_primary(&mut self) -> ParseResult<Node> {
        let token = self.current();
        if let Some(op) = unary_operator(token) {
            self.next()?;
            let operand = self.parse_expression(UNARY_PRECEDENCE)?;
            let node = Node::new(
                NodeKind::Unary {
                    op,
                    node: operand.boxed(),
                },
                token.span,
            );
            return self.parse_postfix(node);
        }
        if token.is_bracket("(") {
            self.next()?;
            let inner = self.parse_expression(0)?;
            self.expect(Kind::Bracket, ")")?;
            return self.parse_postfix(inner);
        }
        if token.is_operator("#") || token.is_operator(".") {
            if self.closures == 0 {
                return Err(FileError::new(
                    "cannot use pointer accessor outside closure",
                    token.span,
                ));
            }
            // A leading `.` stays in place and is read as member access below.
            if token.value.as_str() == "#" {
                self.next()?;
            }
            return self.parse_postfix(Node::new(NodeKind::Pointer, token.span));
        }
        self.parse_secondary()
    }

    fn parse_secondary(&mut self) -> ParseResult<Node> {
        let token = self.current();
        let kind = match token.kind {
            Kind::Identifier => {
                self.next()?;
                match token.value.as_str() {
                    "true" => NodeKind::Bool(true),
                    "false" => NodeKind::Bool(false),
                    "nil" => NodeKind::Nil,
                    name => match Builtin::from_name(name) {
                        Some(builtin) if self.current().is_bracket("(") => {
                            let node = self.parse_builtin(builtin, token.span)?;
                            return self.parse_postfix(node);
                        }
                        _ => NodeKind::Identifier(token.value.clone()),
                    },
                }
            }
            Kind::Number => {
                let number =
                    parse_number(&token.value).map_err(|msg| FileError::new(msg, token.span))?;
                self.next()?;
                match number {
                    Number::Int(n) => NodeKind::Integer(n),
                    Number::Float(x) => NodeKind::Float(x),
                }
            }
            Kind::String => {
                self.next()?;
                NodeKind::String(token.value.clone())
            }
            Kind::Bracket if token.value.as_str() == "[" => {
                let node = self.parse_array()?;
                return self.parse_postfix(node);
            }
            Kind::Bracket if token.value.as_str() == "{" => {
                let node = self.parse_map()?;
                return self.parse_postfix(node);
            }
            _ => return Err(unexpected(token)),
        };
        self.parse_postfix(Node::new(kind, token.span))
    }

    fn parse_builtin(&mut self, builtin: Builtin, span: Span) -> ParseResult<Node> {
        let arguments = match builtin {
            Builtin::Len => self.parse_arguments()?,
            Builtin::Sum => {
                self.expect(Kind::Bracket, "(")?;
                let mut arguments = vec![self.parse_expression(0)?];
                if self.current().is_operator(",") {
                    self.next()?;
                    if !self.current().is_bracket(")") {
                        arguments.push(self.parse_closure()?);
                    }
                }
                self.expect(Kind::Bracket, ")")?;
                arguments
            }
            _ => {
                self.expect(Kind::Bracket, "(")?;
                let collection = self.parse_expression(0)?;
                self.expect(Kind::Operator, ",")?;
                let closure = self.parse_closure()?;
                self.expect(Kind::Bracket, ")")?;
                vec![collection, closure]
            }
        };
        Ok(Node::new(
            NodeKind::Builtin {
                name: builtin,
                arguments,
            },
            span,
        ))
    }

    /// A closure body, with or without braces.
    fn parse_closure(&mut self) -> ParseResult<Node> {
        let start = self.current();
        let braced = start.is_bracket("{");
        if braced {
            self.next()?;
        }
        self.closures += 1;
        let body = self.parse_expression(0);
        self.closures -= 1;
        let body = body?;
        if braced {
            self.expect(Kind::Bracket, "}")?;
        }
        Ok(Node::new(NodeKind::Closure(body.boxed()), start.span))
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Node>> {
        self.expect(Kind::Bracket, "(")?;
        let mut arguments = Vec::new();
        while !self.current().is_bracket(")") {
            if !arguments.is_empty() {
                self.expect(Kind::Operator, ",")?;
                if self.current().is_bracket(")") {
                    break;
                }
            }
            arguments.push(self.parse_expression(0)?);
        }
        self.expect(Kind::Bracket, ")")?;
        Ok(arguments)
    }

    fn parse_array(&mut self) -> ParseResult<Node> {
        let start = self.current().span;
        self.next()?;
        let mut items = Vec::new();
        while !self.current().is_bracket("]") {
            if !items.is_empty() {
                self.expect(Kind::Operator, ",")?;
                if self.current().is_bracket("]") {
                    break;
                }
            }
            items.push(self.parse_expression(0)?);
        }
        self.expect(Kind::Bracket, "]")?;
        Ok(Node::new(NodeKind::Array(items), start))
    }

    fn parse_map(&mut self) -> ParseResult<Node> {
        let start = self.current().span;
        self.next()?;
        let mut pairs = Vec::new();
        while !self.current().is_bracket("}") {
            if !pairs.is_empty() {
                self.expect(Kind::Operator, ",")?;
                if self.current().is_bracket("}") {
                    break;
                }
                if self.current().is_operator(",") {
                    return Err(unexpected(self.current()));
                }
            }
            let key_token = self.current();
            let key = match key_token.kind {
                Kind::Number | Kind::String | Kind::Identifier => {
                    self.next()?;
                    Node::new(NodeKind::String(key_token.value.clone()), key_token.span)
                }
                Kind::Bracket if key_token.value.as_str() == "(" => self.parse_expression(0)?,
                _ => {
                    return Err(FileError::new(
                        format!(
                            "a map key must be a quoted string, a number, a identifier, \
                             or an expression enclosed in parentheses (unexpected token {})",
                            key_token
                        ),
                        key_token.span,
                    ));
                }
            };
            self.expect(Kind::Operator, ":")?;
            let value = self.parse_expression(0)?;
            pairs.push(Node::new(
                NodeKind::Pair {
                    key: key.boxed(),
                    value: value.boxed(),
                },
                key_token.span,
            ));
        }
        self.expect(Kind::Bracket, "}")?;
        Ok(Node::new(NodeKind::Map(pairs), start))
    }

    /// Member access, indexing, slicing and calls, applied left to right.
    ///
    /// If any link is optional (`?.`) the whole sequence is wrapped in a
    /// single [`NodeKind::Chain`].
    fn parse_postfix(&mut self, mut node: Node) -> ParseResult<Node> {
        let mut chained = false;
        loop {
            let token = self.current();
            let optional = token.is_operator("?.");
            if token.is_operator(".") || optional {
                self.next()?;
                let property = self.current();
                if optional && property.is_bracket("[") {
                    chained = true;
                    node = self.parse_index(node, property.span, true)?;
                    continue;
                }
                self.next()?;
                let is_name = property.kind == Kind::Identifier
                    || (property.kind == Kind::Operator && is_word(&property.value));
                if !is_name {
                    return Err(FileError::new("expected name", property.span));
                }
                chained |= optional;
                let member = Node::new(
                    NodeKind::Member {
                        node: node.boxed(),
                        property: Node::new(NodeKind::String(property.value.clone()), property.span)
                            .boxed(),
                        optional,
                    },
                    property.span,
                );
                node = if self.current().is_bracket("(") {
                    let arguments = self.parse_arguments()?;
                    call(member, arguments)
                } else {
                    member
                };
            } else if token.is_bracket("[") {
                node = self.parse_index(node, token.span, false)?;
            } else if token.is_bracket("(") {
                let arguments = self.parse_arguments()?;
                node = call(node, arguments);
            } else {
                break;
            }
        }
        if chained {
            let span = node.span;
            node = Node::new(NodeKind::Chain(node.boxed()), span);
        }
        Ok(node)
    }

    /// `node[index]`, `node[from:to]` and their open-ended forms. The current
    /// token is the opening bracket.
    fn parse_index(&mut self, node: Node, span: Span, optional: bool) -> ParseResult<Node> {
        self.next()?;
        let from = if self.current().is_operator(":") {
            None
        } else {
            Some(self.parse_expression(0)?)
        };
        if self.current().is_operator(":") {
            self.next()?;
            let to = if self.current().is_bracket("]") {
                None
            } else {
                Some(self.parse_expression(0)?.boxed())
            };
            self.expect(Kind::Bracket, "]")?;
            return Ok(Node::new(
                NodeKind::Slice {
                    node: node.boxed(),
                    from: from.map(Node::boxed),
                    to,
                },
                span,
            ));
        }
        self.expect(Kind::Bracket, "]")?;
        let Some(property) = from else {
            return Err(unexpected(self.current()));
        };
        Ok(Node::new(
            NodeKind::Member {
                node: node.boxed(),
                property: property.boxed(),
                optional,
            },
            span,
        ))
    }
}

fn call(callee: Node, arguments: Vec<Node>) -> Node {
    let span = callee.span;
    Node::new(
        NodeKind::Call {
            callee: callee.boxed(),
            arguments,
            dispatch: Dispatch::default(),
        },
        span,
    )
}

fn is_word(s: &EcoString) -> bool {
    s.chars().all(|c| c.is_alphabetic())
}

/// Validates a literal `matches` pattern, describing failures the way the
/// regular expression syntax names them.
fn check_regex(pattern: &str) -> Result<(), String> {
    if let Err(err) = regex_syntax::ast::parse::Parser::new().parse(pattern) {
        let reason = match err.kind() {
            RegexErrorKind::GroupUnopened => "unexpected )".to_string(),
            RegexErrorKind::GroupUnclosed => "missing closing )".to_string(),
            RegexErrorKind::ClassUnclosed => "missing closing ]".to_string(),
            RegexErrorKind::RepetitionMissing => "missing argument to repetition operator".to_string(),
            RegexErrorKind::EscapeUnrecognized => "invalid escape sequence".to_string(),
            other => other.to_string(),
        };
        return Err(format!("error parsing regexp: {}: `{}`", reason, pattern));
    }
    regex::Regex::new(pattern)
        .map(|_| ())
        .map_err(|err| format!("error parsing regexp: {}", err))
}
