use core::fmt;

use hashbrown::{HashMap, HashSet};
use regex::Regex;

use super::{Instruction, Limits};
use crate::diagnostics::Span;
use crate::values::Value;

/// A compiled expression.
///
/// Immutable once built; one program can be run any number of times,
/// concurrently, against different environments.
pub struct Program {
    pub(crate) source: String,
    pub(crate) instructions: Vec<Instruction>,
    /// Source location of each instruction, for runtime diagnostics.
    pub(crate) spans: Vec<Span>,
    pub(crate) constants: Vec<Value>,
    /// Patterns of `matches` with a literal right side.
    pub(crate) regexes: Vec<Regex>,
    pub(crate) limits: Limits,
}

static_assertions::assert_impl_all!(Program: Send, Sync);

impl Program {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Jump targets, keyed by instruction address, numbered in address order.
    fn labels(&self) -> HashMap<usize, usize> {
        let mut targets: HashSet<usize> = HashSet::new();
        let mut wide_arg: usize = 0;
        for (addr, instr) in self.instructions.iter().enumerate() {
            if let Instruction::WideArg(high) = instr {
                wide_arg = (wide_arg | (*high as usize)) << 8;
                continue;
            }
            if let Some(offset) = instr.jump_offset() {
                targets.insert(jump_target(addr, instr, wide_arg | offset as usize));
            }
            wide_arg = 0;
        }
        let mut sorted: Vec<_> = targets.into_iter().collect();
        sorted.sort_unstable();
        sorted.into_iter().enumerate().map(|(i, addr)| (addr, i)).collect()
    }
}

/// Jumps are relative to the next instruction.
fn jump_target(addr: usize, instr: &Instruction, offset: usize) -> usize {
    match instr {
        Instruction::JumpBackward(_) => (addr + 1).saturating_sub(offset),
        _ => addr + 1 + offset,
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Program {{")?;
        if self.constants.is_empty() {
            writeln!(f, "  constants: []")?;
        } else {
            writeln!(f, "  constants: [")?;
            for (i, constant) in self.constants.iter().enumerate() {
                writeln!(f, "    [{}] = {:?}", i, constant)?;
            }
            writeln!(f, "  ]")?;
        }
        if !self.regexes.is_empty() {
            writeln!(f, "  regexes: [")?;
            for (i, regex) in self.regexes.iter().enumerate() {
                writeln!(f, "    [{}] = {:?}", i, regex.as_str())?;
            }
            writeln!(f, "  ]")?;
        }

        let labels = self.labels();
        writeln!(f, "  instructions:")?;
        let mut wide_arg: usize = 0;
        for (addr, instr) in self.instructions.iter().enumerate() {
            let label = labels
                .get(&addr)
                .map(|l| format!("L{}:", l))
                .unwrap_or_default();

            if let Instruction::WideArg(high) = instr {
                wide_arg = (wide_arg | (*high as usize)) << 8;
                writeln!(f, "    {:4} {:>4}  {:?}", addr, label, instr)?;
                continue;
            }

            if let Some(offset) = instr.jump_offset() {
                let target = jump_target(addr, instr, wide_arg | offset as usize);
                let target_label = labels
                    .get(&target)
                    .map(|l| format!("L{}", l))
                    .unwrap_or_else(|| format!("@{}", target));
                writeln!(
                    f,
                    "    {:4} {:>4}  {:?} (to {})",
                    addr, label, instr, target_label
                )?;
            } else {
                writeln!(f, "    {:4} {:>4}  {:?}", addr, label, instr)?;
            }
            wide_arg = 0;
        }
        write!(f, "}}")
    }
}
