//! Single-stepping execution for interactive inspection.

use super::runtime::{Scope, Vm};
use super::{Instruction, Program};
use crate::diagnostics::Span;
use crate::errors::Error;
use crate::values::Value;

/// Outcome of [`Debugger::step`].
#[derive(Debug, Clone)]
pub enum Step {
    Running,
    Completed(Value),
    Failed(Error),
}

/// Drives a program one instruction at a time.
///
/// Once the program completes or fails, further steps execute nothing and
/// return the same terminal state again.
pub struct Debugger<'p> {
    vm: Vm<'p>,
    program: &'p Program,
    outcome: Option<Step>,
}

impl<'p> Debugger<'p> {
    pub fn new(program: &'p Program, env: &'p Value) -> Self {
        Debugger {
            vm: Vm::new(program, env),
            program,
            outcome: None,
        }
    }

    pub fn step(&mut self) -> Step {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        let step = match self.vm.step() {
            Ok(None) => return Step::Running,
            Ok(Some(value)) => Step::Completed(value),
            Err(error) => Step::Failed(error.bind(&self.program.source)),
        };
        self.outcome = Some(step.clone());
        step
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Address of the instruction the next step executes.
    pub fn position(&self) -> usize {
        self.vm.ip()
    }

    pub fn instruction(&self) -> Option<Instruction> {
        self.program.instructions.get(self.vm.ip()).copied()
    }

    /// Source range of the next instruction.
    pub fn span(&self) -> Option<Span> {
        self.program.spans.get(self.vm.ip()).copied()
    }

    /// Operand stack, bottom first.
    pub fn stack(&self) -> &[Value] {
        self.vm.stack()
    }

    /// Active closure scopes, outermost first.
    pub fn scopes(&self) -> &[Scope] {
        self.vm.scopes()
    }
}
