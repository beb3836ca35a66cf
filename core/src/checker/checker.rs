use core::mem;

use ecow::EcoString;

use super::operators;
use crate::api::Config;
use crate::ast::{self, BinaryOp, Builtin, Dispatch, Node, NodeKind, UnaryOp};
use crate::diagnostics::{FileError, Span};
use crate::types::{Ambiguous, FuncType, Type};
use crate::values::{TypedFn, time};

type CheckResult<T> = Result<T, FileError>;

/// Walks the tree once, writing every node's type into `Node::ty`.
pub(crate) struct Checker<'c> {
    config: &'c Config,
    /// Element types of the enclosing closures, innermost last.
    pointers: Vec<Type>,
}

impl<'c> Checker<'c> {
    pub(crate) fn new(config: &'c Config) -> Self {
        Self {
            config,
            pointers: Vec::new(),
        }
    }

    pub(crate) fn visit(&mut self, node: &mut Node) -> CheckResult<Type> {
        let ty = self.infer(node)?;
        node.ty = Some(ty.clone());
        Ok(ty)
    }

    fn infer(&mut self, node: &mut Node) -> CheckResult<Type> {
        if matches!(node.kind, NodeKind::Binary { .. }) {
            return self.binary(node);
        }
        let span = node.span;
        match &mut node.kind {
            NodeKind::Nil => Ok(Type::Nil),
            NodeKind::Bool(_) => Ok(Type::Bool),
            // Keeps the type given by an enclosing float or sized-int parameter.
            NodeKind::Integer(_) => Ok(match &node.ty {
                Some(ty @ (Type::Int(_) | Type::Float(_))) => ty.clone(),
                _ => Type::INT,
            }),
            NodeKind::Float(_) => Ok(Type::FLOAT),
            NodeKind::String(_) => Ok(Type::String),
            NodeKind::Constant(value) => Ok(value.type_of()),
            NodeKind::Identifier(name) => self.resolve(name, span),
            NodeKind::Pointer => self.pointers.last().cloned().ok_or_else(|| {
                FileError::new("cannot use pointer accessor outside closure", span)
            }),
            NodeKind::Unary { op, node: operand } => {
                let op = *op;
                let ty = self.visit(operand)?;
                operators::unary(op, &ty).ok_or_else(|| {
                    FileError::new(
                        format!("invalid operation: {} (mismatched type {})", op, ty),
                        span,
                    )
                })
            }
            NodeKind::Binary { .. } => unreachable!("binary nodes are checked first"),
            NodeKind::Chain(inner) => self.visit(inner),
            NodeKind::Member {
                node: base,
                property,
                ..
            } => self.member(base, property, span, false),
            NodeKind::Slice { node: base, from, to } => {
                let ty = self.visit(base)?;
                if !(ty.is_array() || ty.is_string() || ty.is_any()) {
                    return Err(FileError::new(format!("cannot slice {}", ty), span));
                }
                for index in [from.as_deref_mut(), to.as_deref_mut()].into_iter().flatten() {
                    let index_ty = self.visit(index)?;
                    if !index_ty.is_integer() && !index_ty.is_any() {
                        return Err(FileError::new(
                            format!("non-integer slice index {}", index_ty),
                            index.span,
                        ));
                    }
                }
                Ok(ty)
            }
            NodeKind::Call {
                callee,
                arguments,
                dispatch,
            } => self.call(callee, arguments, dispatch, span),
            NodeKind::Builtin { name, arguments } => self.builtin(*name, arguments, span),
            NodeKind::Closure(body) => {
                self.pointers.push(Type::Any);
                let ty = self.visit(body);
                self.pointers.pop();
                Ok(closure_type(ty?))
            }
            NodeKind::Array(items) => {
                let mut types = Vec::with_capacity(items.len());
                for item in items.iter_mut() {
                    types.push(self.visit(item)?);
                }
                Ok(Type::array(common(types)))
            }
            NodeKind::Map(pairs) => {
                let mut types = Vec::with_capacity(pairs.len());
                for pair in pairs.iter_mut() {
                    types.push(self.visit(pair)?);
                }
                Ok(Type::map(common(types)))
            }
            NodeKind::Pair { key, value } => {
                let key_ty = self.visit(key)?;
                if !key_ty.is_string() && !key_ty.is_any() {
                    return Err(FileError::new(
                        format!("cannot use {} as map key", key_ty),
                        key.span,
                    ));
                }
                self.visit(value)
            }
            NodeKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                let cond_ty = self.visit(cond)?;
                if !cond_ty.is_bool() && !cond_ty.is_any() {
                    return Err(FileError::new(
                        format!("non-bool expression (type {}) used as condition", cond_ty),
                        cond.span,
                    ));
                }
                let a = self.visit(then)?;
                let b = self.visit(otherwise)?;
                Ok(match (a, b) {
                    (Type::Nil, b) => b,
                    (a, Type::Nil) => a,
                    (a, b) if a.assignable_to(&b) => a,
                    _ => Type::Any,
                })
            }
        }
    }

    fn resolve(&self, name: &str, span: Span) -> CheckResult<Type> {
        if name == "$env" {
            return Ok(self.config.nature.as_type());
        }
        match self.config.nature.lookup(name) {
            Ok(Some(ty)) => Ok(ty),
            Ok(None) if self.config.is_strict() => {
                Err(FileError::new(format!("unknown name {}", name), span))
            }
            Ok(None) => Ok(self.config.nature.default_type()),
            Err(Ambiguous) => Err(FileError::new(
                format!("ambiguous identifier {}", name),
                span,
            )),
        }
    }

    fn binary(&mut self, node: &mut Node) -> CheckResult<Type> {
        let span = node.span;
        let NodeKind::Binary { op, left, right } = &mut node.kind else {
            return Ok(Type::Any);
        };
        let op = *op;
        let l = self.visit(left)?;
        let r = self.visit(right)?;
        if let Some(ty) = operators::binary(op, &l, &r) {
            return Ok(ty);
        }
        let Some(name) = self.overload(op, &l, &r) else {
            return Err(FileError::new(
                format!("invalid operation: {} (mismatched types {} and {})", op, l, r),
                span,
            ));
        };
        if let NodeKind::Binary { left, right, .. } = mem::replace(&mut node.kind, NodeKind::Nil) {
            node.kind = NodeKind::Call {
                callee: Node::new(NodeKind::Identifier(name), span).boxed(),
                arguments: vec![*left, *right],
                dispatch: Dispatch::Generic,
            };
        }
        self.infer(node)
    }

    /// First registered overload of `op` accepting `(l, r)`.
    fn overload(&self, op: BinaryOp, l: &Type, r: &Type) -> Option<EcoString> {
        let names = self.config.operators.get(&op)?;
        names
            .iter()
            .find(|name| match self.config.function_type(name) {
                Some(Type::Func(f)) => {
                    !f.is_variadic()
                        && f.params.len() == 2
                        && !f.results.is_empty()
                        && l.assignable_to(&f.params[0])
                        && r.assignable_to(&f.params[1])
                }
                _ => false,
            })
            .cloned()
    }

    fn member(
        &mut self,
        base: &mut Node,
        property: &mut Node,
        span: Span,
        callee: bool,
    ) -> CheckResult<Type> {
        let name = match &property.kind {
            NodeKind::String(name) => Some(name.clone()),
            _ => None,
        };
        if let (NodeKind::Identifier(env), Some(name)) = (&base.kind, &name) {
            if env.as_str() == "$env" {
                base.ty = Some(self.config.nature.as_type());
                property.ty = Some(Type::String);
                return self.resolve(name, span);
            }
        }

        let base_ty = self.visit(base)?;
        let prop_ty = self.visit(property)?;
        let missing = |base_ty: &Type| {
            let name = name.clone().unwrap_or_else(|| ast::print(&*property).into());
            let kind = if callee { "method" } else { "field" };
            FileError::new(format!("type {} has no {} {}", base_ty, kind, name), span)
        };

        match &base_ty {
            Type::Any => Ok(Type::Any),
            Type::Map(elem) => {
                if prop_ty.is_string() || prop_ty.is_any() {
                    Ok((**elem).clone())
                } else {
                    Err(FileError::new(
                        format!("cannot use {} to get an element from {}", prop_ty, base_ty),
                        property.span,
                    ))
                }
            }
            Type::Array(elem) => {
                if prop_ty.is_integer() || prop_ty.is_any() {
                    Ok((**elem).clone())
                } else {
                    Err(FileError::new(
                        format!(
                            "array elements can only be selected using an integer (got {})",
                            prop_ty
                        ),
                        property.span,
                    ))
                }
            }
            Type::String => {
                if prop_ty.is_integer() || prop_ty.is_any() {
                    Ok(Type::String)
                } else {
                    Err(FileError::new(
                        format!(
                            "string elements can only be selected using an integer (got {})",
                            prop_ty
                        ),
                        property.span,
                    ))
                }
            }
            Type::Struct(record) => match &name {
                Some(name) => match record.lookup(name) {
                    Ok(Some(member)) => Ok(member.ty()),
                    Ok(None) => Err(missing(&base_ty)),
                    Err(Ambiguous) => Err(FileError::new(
                        format!("ambiguous identifier {}", name),
                        span,
                    )),
                },
                None if prop_ty.is_string() || prop_ty.is_any() => Ok(Type::Any),
                None => Err(undefined(&base_ty, &prop_ty, span)),
            },
            Type::Time | Type::Duration => name
                .as_deref()
                .and_then(|name| time::method_type(&base_ty, name))
                .map(|f| Type::Func(f.into()))
                .ok_or_else(|| missing(&base_ty)),
            Type::Nil => Err(missing(&base_ty)),
            _ if name.is_some() => Err(missing(&base_ty)),
            _ => Err(undefined(&base_ty, &prop_ty, span)),
        }
    }

    fn call(
        &mut self,
        callee: &mut Node,
        arguments: &mut [Node],
        dispatch: &mut Dispatch,
        span: Span,
    ) -> CheckResult<Type> {
        let callee_ty = match &mut callee.kind {
            NodeKind::Member {
                node: base,
                property,
                ..
            } => {
                let ty = self.member(base, property, callee.span, true)?;
                callee.ty = Some(ty.clone());
                ty
            }
            _ => self.visit(callee)?,
        };

        let func = match callee_ty {
            Type::Any => {
                for argument in arguments.iter_mut() {
                    self.visit(argument)?;
                }
                *dispatch = Dispatch::Generic;
                return Ok(Type::Any);
            }
            Type::Func(func) => func,
            other => {
                return Err(FileError::new(format!("{} is not callable", other), span));
            }
        };

        let name = callee_name(callee);
        let result = match func.results.as_slice() {
            [] => {
                return Err(FileError::new(
                    format!("func {} doesn't return value", name),
                    span,
                ));
            }
            [result] => result.clone(),
            [result, Type::Error] => result.clone(),
            _ => {
                return Err(FileError::new(
                    format!("func {} returns more than two values", name),
                    span,
                ));
            }
        };

        let declared = func.params.len();
        if arguments.len() < declared {
            return Err(FileError::new(
                format!("not enough arguments to call {}", name),
                span,
            ));
        }
        if arguments.len() > declared && !func.is_variadic() {
            return Err(FileError::new(
                format!("too many arguments to call {}", name),
                span,
            ));
        }

        for (i, argument) in arguments.iter_mut().enumerate() {
            let mut ty = self.visit(argument)?;
            let Some(param) = func.param(i) else {
                continue;
            };
            if is_integer_arithmetic(argument) && param.is_number() {
                retype(argument, param);
                ty = param.clone();
            }
            if !ty.assignable_to(param) && !ty.is_any() {
                return Err(FileError::new(
                    format!(
                        "cannot use {} as argument (type {}) to call {} ",
                        ty, param, name
                    ),
                    argument.span,
                ));
            }
        }

        *dispatch = if func.is_fast() {
            Dispatch::Fast
        } else if let Some(index) = TypedFn::index_of(&func) {
            Dispatch::Typed(index)
        } else {
            Dispatch::Generic
        };
        Ok(result)
    }

    fn builtin(&mut self, name: Builtin, arguments: &mut [Node], span: Span) -> CheckResult<Type> {
        match (name, arguments) {
            (Builtin::Len, [argument]) => {
                let ty = self.visit(argument)?;
                if ty.is_array() || ty.is_map() || ty.is_string() || ty.is_any() {
                    Ok(Type::INT)
                } else {
                    Err(FileError::new(
                        format!("invalid argument for len (type {})", ty),
                        span,
                    ))
                }
            }
            (Builtin::Sum, [collection, rest @ ..]) if rest.len() <= 1 => {
                let elem = self.collection(name, collection)?;
                let elem = match rest.first_mut() {
                    Some(closure) => self.closure(name, closure, elem)?,
                    None => elem,
                };
                if elem.is_number() || elem.is_any() {
                    Ok(elem)
                } else {
                    Err(FileError::new(
                        format!("invalid argument for sum (type {})", elem),
                        collection.span,
                    ))
                }
            }
            (name, [collection, closure]) if name.takes_closure() => {
                let elem = self.collection(name, collection)?;
                let body = self.closure(name, closure, elem.clone())?;
                if name.is_predicate() && !body.is_bool() && !body.is_any() {
                    return Err(FileError::new(
                        format!("closure should return boolean (got {})", body),
                        closure.span,
                    ));
                }
                Ok(match name {
                    Builtin::Count => Type::INT,
                    Builtin::Filter => Type::array(elem),
                    Builtin::Map => Type::array(body),
                    _ => Type::Bool,
                })
            }
            (name, arguments) => Err(FileError::new(
                format!(
                    "invalid number of arguments for {} (got {})",
                    name,
                    arguments.len()
                ),
                span,
            )),
        }
    }

    /// Checks the collection argument of a builtin, returning its element type.
    fn collection(&mut self, name: Builtin, collection: &mut Node) -> CheckResult<Type> {
        let ty = self.visit(collection)?;
        match ty {
            Type::Array(elem) | Type::Map(elem) => Ok(*elem),
            Type::Any => Ok(Type::Any),
            other => Err(FileError::new(
                format!("builtin {} takes only array (got {})", name, other),
                collection.span,
            )),
        }
    }

    /// Checks a closure argument with `#` bound to `elem`, returning the type
    /// of its body.
    fn closure(&mut self, name: Builtin, closure: &mut Node, elem: Type) -> CheckResult<Type> {
        let NodeKind::Closure(body) = &mut closure.kind else {
            return Err(FileError::new(
                format!("builtin {} expects a closure", name),
                closure.span,
            ));
        };
        self.pointers.push(elem);
        let ty = self.visit(body);
        self.pointers.pop();
        let ty = ty?;
        closure.ty = Some(closure_type(ty.clone()));
        Ok(ty)
    }
}

fn closure_type(body: Type) -> Type {
    Type::Func(FuncType::new(vec![Type::Any], body).into())
}

fn undefined(base: &Type, property: &Type, span: Span) -> FileError {
    FileError::new(format!("type {}[{}] is undefined", base, property), span)
}

/// The element type shared by all `types`, or `any`.
fn common(types: Vec<Type>) -> Type {
    let mut types = types.into_iter();
    let Some(first) = types.next() else {
        return Type::Any;
    };
    if types.all(|t| t == first) {
        first
    } else {
        Type::Any
    }
}

fn callee_name(callee: &Node) -> EcoString {
    match &callee.kind {
        NodeKind::Identifier(name) => name.clone(),
        NodeKind::Member { property, .. } => match &property.kind {
            NodeKind::String(name) => name.clone(),
            _ => ast::print(callee).into(),
        },
        _ => ast::print(callee).into(),
    }
}

/// An integer literal, or `+ - * /` arithmetic over integer literals.
fn is_integer_arithmetic(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Integer(_) => true,
        NodeKind::Unary {
            op: UnaryOp::Neg | UnaryOp::Plus,
            node,
        } => is_integer_arithmetic(node),
        NodeKind::Binary {
            op: BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div,
            left,
            right,
        } => is_integer_arithmetic(left) && is_integer_arithmetic(right),
        _ => false,
    }
}

/// Gives every node of an integer-literal expression the parameter type.
fn retype(node: &mut Node, ty: &Type) {
    node.ty = Some(ty.clone());
    node.for_each_child_mut(|child| retype(child, ty));
}
