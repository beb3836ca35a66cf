use hashbrown::HashMap;
use ecow::EcoString;
use tracing::trace;

use crate::ast::{Node, NodeKind, Visitor, patch};
use crate::diagnostics::FileError;
use crate::errors::Error;
use crate::values::{CallError, Function};

/// Evaluates calls to pure host functions whose arguments are all constant.
pub(super) struct ConstExpr<'f> {
    pub(super) functions: &'f HashMap<EcoString, Function>,
    pub(super) applied: bool,
    pub(super) error: Option<Error>,
}

impl<'f> ConstExpr<'f> {
    pub(super) fn new(functions: &'f HashMap<EcoString, Function>) -> Self {
        Self {
            functions,
            applied: false,
            error: None,
        }
    }
}

impl Visitor for ConstExpr<'_> {
    fn exit(&mut self, node: &mut Node) {
        if self.error.is_some() {
            return;
        }
        let NodeKind::Call {
            callee, arguments, ..
        } = &node.kind
        else {
            return;
        };
        let NodeKind::Identifier(name) = &callee.kind else {
            return;
        };
        let Some(function) = self.functions.get(name) else {
            return;
        };
        let Some(args) = arguments
            .iter()
            .map(Node::constant_value)
            .collect::<Option<Vec<_>>>()
        else {
            return;
        };
        match function.call(&args) {
            Ok(value) => {
                trace!(function = %name, result = %value, "evaluated constant expression");
                let span = node.span;
                patch(node, Node::new(NodeKind::Constant(value), span));
                self.applied = true;
            }
            Err(CallError::Host(e)) => self.error = Some(Error::Host(e)),
            Err(CallError::Panic(message)) => {
                self.error = Some(Error::Compile(FileError::new(
                    format!("compile error: {}", message),
                    node.span,
                )));
            }
            Err(CallError::Argument(message)) => {
                self.error = Some(Error::Compile(FileError::new(message, node.span)));
            }
        }
    }
}
