use core::mem;

use crate::ast::{Dispatch, Node, NodeKind, Visitor, patch};
use crate::errors::HostError;
use crate::types::{FuncType, Type};
use crate::values::{Function, Value};

/// Replaces every expression whose record type declares
/// [`StructType::unwraps_to`](crate::types::StructType::unwraps_to) with a
/// call that reads the wrapped value, so records standing for numbers or
/// strings take part in ordinary operators.
///
/// ```ignore
/// let meter = Arc::new(StructType::new("Meter").unwraps_to(Type::INT));
/// let env = Value::map([
///     ("ValueOne", Value::from(Record::new(meter.clone()).wrap(1))),
///     ("ValueTwo", Value::from(Record::new(meter).wrap(2))),
/// ]);
/// let config = Config::default().env(env.clone()).patch(ValueGetter);
/// let program = compile("ValueOne + ValueTwo", config)?;
/// assert_eq!(run(&program, &env)?, Value::Int(3));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueGetter;

impl Visitor for ValueGetter {
    fn exit(&mut self, node: &mut Node) {
        let Some(Type::Struct(record)) = &node.ty else {
            return;
        };
        let Some(ty) = record.unwraps_to.clone() else {
            return;
        };
        let span = node.span;
        let wrapped = mem::replace(node, Node::new(NodeKind::Nil, span));
        let getter = Node::new(NodeKind::Constant(Value::Function(getter(ty.clone()))), span);
        let mut call = Node::new(
            NodeKind::Call {
                callee: getter.boxed(),
                arguments: vec![wrapped],
                dispatch: Dispatch::default(),
            },
            span,
        );
        call.ty = Some(ty);
        patch(node, call);
    }
}

/// Host function returning the value wrapped by its record argument.
fn getter(ty: Type) -> Function {
    Function::new("$value", FuncType::new(vec![Type::Any], ty), |args| {
        match args.first() {
            Some(Value::Object(object)) => object.value().ok_or_else(|| {
                HostError::msg(format!("{} wraps no value", object.struct_type().name))
            }),
            other => Err(HostError::msg(format!(
                "cannot unwrap {}",
                other.map_or_else(|| "nothing".to_string(), Value::type_name)
            ))),
        }
    })
}
