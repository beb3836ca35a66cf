//! Lowering of checked trees to VM bytecode.

use core::mem;

use ecow::EcoString;
use hashbrown::HashMap;
use regex::Regex;
use smallvec::SmallVec;

use crate::api::Expect;
use crate::ast::{BinaryOp, Builtin, Dispatch, Node, NodeKind, UnaryOp};
use crate::diagnostics::{FileError, Span};
use crate::values::Value;
use crate::vm::{CmpOp, Instruction, Limits, Program};

type CompileResult<T> = Result<T, FileError>;

/// Nil jumps of one `?.` chain, patched together.
type Jumps = SmallVec<[usize; 4]>;

/// Largest offset one `WideArg` prefix lets a jump encode.
const MAX_JUMP: usize = 0xFFFF;

/// Pool key for constants that can be shared between call sites.
#[derive(PartialEq, Eq, Hash)]
enum ConstKey {
    Int(i64),
    Float(u64),
    String(EcoString),
}

impl ConstKey {
    fn of(value: &Value) -> Option<ConstKey> {
        match value {
            Value::Int(n) => Some(ConstKey::Int(*n)),
            Value::Float(x) => Some(ConstKey::Float(x.to_bits())),
            Value::String(s) => Some(ConstKey::String(s.clone())),
            _ => None,
        }
    }
}

/// Bytecode compiler.
///
/// Walks the tree once, emitting instructions in evaluation order. Every
/// instruction records the span of the node that produced it so the VM can
/// locate runtime errors.
pub struct BytecodeCompiler {
    /// Constant pool.
    constants: Vec<Value>,

    /// Deduplication map for scalar constants: key -> pool index.
    constant_map: HashMap<ConstKey, usize>,

    instructions: Vec<Instruction>,
    spans: Vec<Span>,

    /// Patterns of `matches` with a literal right side, compiled once.
    regexes: Vec<Regex>,

    /// Pending nil short-circuit jumps of the enclosing `?.` chains.
    chains: Vec<Jumps>,

    /// Span of the node being compiled.
    span: Span,
}

impl BytecodeCompiler {
    pub fn new() -> Self {
        Self {
            constants: Vec::new(),
            constant_map: HashMap::new(),
            instructions: Vec::new(),
            spans: Vec::new(),
            regexes: Vec::new(),
            chains: Vec::new(),
            span: Span::default(),
        }
    }

    /// Compiles `node` into a program ending in `Return`.
    pub fn compile(
        node: &Node,
        source: &str,
        expect: Option<Expect>,
        limits: Limits,
    ) -> CompileResult<Program> {
        let mut compiler = Self::new();
        compiler.compile_node(node)?;
        match expect {
            Some(Expect::Int64) => compiler.emit(Instruction::Cast(0)),
            Some(Expect::Float64) => compiler.emit(Instruction::Cast(1)),
            Some(Expect::Bool) | None => {}
        }
        compiler.emit(Instruction::Return);
        Ok(compiler.finalize(source, limits))
    }

    fn finalize(self, source: &str, limits: Limits) -> Program {
        Program {
            source: source.to_string(),
            instructions: self.instructions,
            spans: self.spans,
            constants: self.constants,
            regexes: self.regexes,
            limits,
        }
    }

    // === Instruction Emission ===

    fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
        self.spans.push(self.span);
    }

    /// Emits `make(arg)`, preceded by as many `WideArg` prefixes as the
    /// operand needs.
    fn emit_arg(&mut self, make: impl FnOnce(u8) -> Instruction, arg: usize) {
        let mut high = Vec::new();
        let mut rest = arg >> 8;
        while rest > 0 {
            high.push((rest & 0xFF) as u8);
            rest >>= 8;
        }
        for byte in high.into_iter().rev() {
            self.emit(Instruction::WideArg(byte));
        }
        self.emit(make((arg & 0xFF) as u8));
    }

    // === Constant Pool Management ===

    /// Adds a constant to the pool (or reuses an equal scalar) and returns
    /// its index.
    fn add_constant(&mut self, value: Value) -> usize {
        let key = ConstKey::of(&value);
        if let Some(index) = key.as_ref().and_then(|k| self.constant_map.get(k)) {
            return *index;
        }
        let index = self.constants.len();
        self.constants.push(value);
        if let Some(key) = key {
            self.constant_map.insert(key, index);
        }
        index
    }

    fn emit_constant(&mut self, value: Value) {
        match value {
            Value::Nil => self.emit(Instruction::ConstNil),
            Value::Bool(b) => self.emit(Instruction::ConstBool(b as u8)),
            Value::Int(n) if i8::try_from(n).is_ok() => self.emit(Instruction::ConstInt(n as i8)),
            Value::Int(n) if u8::try_from(n).is_ok() => self.emit(Instruction::ConstUInt(n as u8)),
            value => {
                let index = self.add_constant(value);
                self.emit_arg(Instruction::ConstLoad, index);
            }
        }
    }

    // === Jump Patching Infrastructure ===

    /// Reserves a `WideArg` + jump pair and returns the index of the jump.
    fn jump_placeholder(&mut self) -> usize {
        self.emit(Instruction::WideArg(0));
        self.emit(Instruction::Nop);
        self.instructions.len() - 1
    }

    /// Current instruction index, for use as a jump target.
    fn label(&self) -> usize {
        self.instructions.len()
    }

    /// Points the placeholder at `target`, relative to the instruction after
    /// the jump.
    fn patch_jump(
        &mut self,
        placeholder: usize,
        target: usize,
        make_jump: impl FnOnce(u8) -> Instruction,
    ) -> CompileResult<()> {
        let offset = target - placeholder - 1;
        if offset > MAX_JUMP {
            return Err(FileError::new("expression too large to compile", self.span));
        }
        self.instructions[placeholder - 1] = Instruction::WideArg((offset >> 8) as u8);
        self.instructions[placeholder] = make_jump((offset & 0xFF) as u8);
        Ok(())
    }

    fn patch_here(
        &mut self,
        placeholder: usize,
        make_jump: impl FnOnce(u8) -> Instruction,
    ) -> CompileResult<()> {
        self.patch_jump(placeholder, self.label(), make_jump)
    }

    /// Emits an unconditional jump back to `target`.
    fn emit_backward(&mut self, target: usize) -> CompileResult<()> {
        // The jump itself lands after its `WideArg` prefix.
        let after_jump = self.label() + 2;
        let offset = after_jump - target;
        if offset > MAX_JUMP {
            return Err(FileError::new("expression too large to compile", self.span));
        }
        self.emit(Instruction::WideArg((offset >> 8) as u8));
        self.emit(Instruction::JumpBackward((offset & 0xFF) as u8));
        Ok(())
    }

    // === Tree Lowering ===

    fn compile_node(&mut self, node: &Node) -> CompileResult<()> {
        let parent = mem::replace(&mut self.span, node.span);
        let result = self.lower(node);
        self.span = parent;
        result
    }

    fn lower(&mut self, node: &Node) -> CompileResult<()> {
        match &node.kind {
            NodeKind::Nil
            | NodeKind::Bool(_)
            | NodeKind::Integer(_)
            | NodeKind::Float(_)
            | NodeKind::String(_)
            | NodeKind::Constant(_) => {
                if let Some(value) = node.constant_value() {
                    self.emit_constant(value);
                }
            }

            NodeKind::Identifier(name) if name.as_str() == "$env" => {
                self.emit(Instruction::LoadEnv);
            }
            NodeKind::Identifier(name) => {
                let index = self.add_constant(Value::String(name.clone()));
                self.emit_arg(Instruction::LoadName, index);
            }
            NodeKind::Pointer => self.emit(Instruction::LoadPointer),

            NodeKind::Unary { op, node: operand } => {
                self.compile_node(operand)?;
                match op {
                    UnaryOp::Not | UnaryOp::Bang => self.emit(Instruction::Not),
                    UnaryOp::Neg if operand.ty().is_integer() => self.emit(Instruction::NegInt),
                    UnaryOp::Neg if operand.ty().is_float() => self.emit(Instruction::NegFloat),
                    UnaryOp::Neg => self.emit(Instruction::Neg),
                    UnaryOp::Plus => {}
                }
            }

            NodeKind::Binary { op, left, right } => self.binary(*op, left, right)?,

            NodeKind::Chain(inner) => {
                self.chains.push(Jumps::new());
                let result = self.compile_node(inner);
                let jumps = self.chains.pop().unwrap_or_default();
                result?;
                for jump in jumps {
                    self.patch_here(jump, Instruction::JumpIfNil)?;
                }
            }

            NodeKind::Member {
                node: base,
                property,
                optional,
            } => {
                self.compile_node(base)?;
                let nil_jump = if *optional {
                    let jump = self.jump_placeholder();
                    match self.chains.last_mut() {
                        Some(chain) => {
                            chain.push(jump);
                            None
                        }
                        None => Some(jump),
                    }
                } else {
                    None
                };
                match &property.kind {
                    NodeKind::String(name) => {
                        let index = self.add_constant(Value::String(name.clone()));
                        self.emit_arg(Instruction::FetchField, index);
                    }
                    _ => {
                        self.compile_node(property)?;
                        self.emit(Instruction::Fetch);
                    }
                }
                if let Some(jump) = nil_jump {
                    self.patch_here(jump, Instruction::JumpIfNil)?;
                }
            }

            NodeKind::Slice { node: base, from, to } => {
                self.compile_node(base)?;
                let mut bounds = 0;
                if let Some(from) = from {
                    self.compile_node(from)?;
                    bounds |= 1;
                }
                if let Some(to) = to {
                    self.compile_node(to)?;
                    bounds |= 2;
                }
                self.emit(Instruction::Slice(bounds));
            }

            NodeKind::Call {
                callee,
                arguments,
                dispatch,
            } => {
                self.compile_node(callee)?;
                for argument in arguments {
                    self.compile_node(argument)?;
                }
                match dispatch {
                    Dispatch::Generic => self.emit_arg(Instruction::Call, arguments.len()),
                    Dispatch::Fast => self.emit_arg(Instruction::CallFast, arguments.len()),
                    Dispatch::Typed(index) => {
                        self.emit_arg(Instruction::CallTyped, *index as usize)
                    }
                }
            }

            NodeKind::Builtin { name, arguments } => self.builtin(*name, arguments)?,

            NodeKind::Closure(body) => self.compile_node(body)?,

            NodeKind::Array(items) => {
                for item in items {
                    self.compile_node(item)?;
                }
                self.emit_arg(Instruction::MakeArray, items.len());
            }

            NodeKind::Map(pairs) => {
                for pair in pairs {
                    self.compile_node(pair)?;
                }
                self.emit_arg(Instruction::MakeMap, pairs.len());
            }
            NodeKind::Pair { key, value } => {
                self.compile_node(key)?;
                self.compile_node(value)?;
            }

            NodeKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                self.compile_node(cond)?;
                let else_jump = self.jump_placeholder();
                self.compile_node(then)?;
                let end_jump = self.jump_placeholder();
                self.patch_here(else_jump, Instruction::PopJumpIfFalse)?;
                self.compile_node(otherwise)?;
                self.patch_here(end_jump, Instruction::JumpForward)?;
            }
        }
        Ok(())
    }

    fn binary(&mut self, op: BinaryOp, left: &Node, right: &Node) -> CompileResult<()> {
        use BinaryOp::*;

        let op = op.normalized();
        match op {
            Or | And | Coalesce => {
                self.compile_node(left)?;
                let end_jump = self.jump_placeholder();
                self.emit(Instruction::Pop);
                self.compile_node(right)?;
                let make_jump = match op {
                    Or => Instruction::JumpIfTrue,
                    And => Instruction::JumpIfFalse,
                    _ => Instruction::JumpIfNotNil,
                };
                return self.patch_here(end_jump, make_jump);
            }
            Matches => {
                if let NodeKind::String(pattern) = &right.kind {
                    let regex = Regex::new(pattern).map_err(|e| {
                        FileError::new(format!("error parsing regexp: {}", e), right.span)
                    })?;
                    self.compile_node(left)?;
                    self.regexes.push(regex);
                    self.emit_arg(Instruction::MatchesConst, self.regexes.len() - 1);
                    return Ok(());
                }
            }
            _ => {}
        }

        self.compile_node(left)?;
        self.compile_node(right)?;
        let (l, r) = (left.ty(), right.ty());
        let instruction = match op {
            Eq => Instruction::Eq,
            Ne => Instruction::NotEq,
            Lt | Le | Gt | Ge => {
                let cmp = match op {
                    Lt => CmpOp::Lt,
                    Le => CmpOp::Le,
                    Gt => CmpOp::Gt,
                    _ => CmpOp::Ge,
                };
                if l.is_integer() && r.is_integer() {
                    Instruction::IntCmpOp(cmp)
                } else if l.is_float() && r.is_float() {
                    Instruction::FloatCmpOp(cmp)
                } else if l.is_string() && r.is_string() {
                    Instruction::StringCmpOp(cmp)
                } else {
                    Instruction::Compare(cmp)
                }
            }
            Add | Sub | Mul | Div | Mod => {
                let byte = match op {
                    Add => b'+',
                    Sub => b'-',
                    Mul => b'*',
                    Div => b'/',
                    _ => b'%',
                };
                if l.is_integer() && r.is_integer() {
                    Instruction::IntBinOp(byte)
                } else if l.is_float() && r.is_float() && op != Mod {
                    Instruction::FloatBinOp(byte)
                } else {
                    Instruction::BinOp(byte)
                }
            }
            Pow => Instruction::BinOp(b'^'),
            In => Instruction::In,
            Matches => Instruction::Matches,
            Contains => Instruction::Contains,
            StartsWith => Instruction::StartsWith,
            EndsWith => Instruction::EndsWith,
            Range => Instruction::Range,
            Or | OrOr | And | AndAnd | Caret | Coalesce => {
                unreachable!("{} is normalized or short-circuited", op)
            }
        };
        self.emit(instruction);
        Ok(())
    }

    // === Builtins ===

    fn builtin(&mut self, name: Builtin, arguments: &[Node]) -> CompileResult<()> {
        let (collection, closure) = match arguments {
            [collection] => (collection, None),
            [collection, closure] => (collection, Some(closure)),
            _ => {
                return Err(FileError::new(
                    format!(
                        "invalid number of arguments for {} (got {})",
                        name,
                        arguments.len()
                    ),
                    self.span,
                ));
            }
        };

        if name == Builtin::Len {
            self.compile_node(collection)?;
            self.emit(Instruction::Len);
            return Ok(());
        }

        self.compile_node(collection)?;
        self.emit(Instruction::Begin);
        match (name, closure) {
            (Builtin::All | Builtin::None | Builtin::Any, Some(closure)) => {
                let mut breaks = Vec::new();
                self.emit_loop(|c| {
                    c.compile_node(closure)?;
                    if name == Builtin::None {
                        c.emit(Instruction::Not);
                    }
                    breaks.push(c.jump_placeholder());
                    c.emit(Instruction::Pop);
                    Ok(())
                })?;
                self.emit(Instruction::ConstBool((name != Builtin::Any) as u8));
                let make_jump = if name == Builtin::Any {
                    Instruction::JumpIfTrue
                } else {
                    Instruction::JumpIfFalse
                };
                for jump in breaks {
                    self.patch_here(jump, make_jump)?;
                }
            }
            (Builtin::One | Builtin::Count, Some(closure)) => {
                self.emit_loop(|c| {
                    c.compile_node(closure)?;
                    c.emit_cond(|c| {
                        c.emit(Instruction::IncrementCount);
                        Ok(())
                    })
                })?;
                self.emit(Instruction::GetCount);
                if name == Builtin::One {
                    self.emit(Instruction::ConstInt(1));
                    self.emit(Instruction::Eq);
                }
            }
            (Builtin::Filter, Some(closure)) => {
                self.emit_loop(|c| {
                    c.compile_node(closure)?;
                    c.emit_cond(|c| {
                        c.emit(Instruction::LoadPointer);
                        c.emit(Instruction::Collect);
                        Ok(())
                    })
                })?;
                self.emit(Instruction::GetCollected);
            }
            (Builtin::Map, Some(closure)) => {
                self.emit_loop(|c| {
                    c.compile_node(closure)?;
                    c.emit(Instruction::Collect);
                    Ok(())
                })?;
                self.emit(Instruction::GetCollected);
            }
            (Builtin::Sum, closure) => {
                self.emit(Instruction::ConstInt(0));
                self.emit(Instruction::SetAcc);
                self.emit_loop(|c| {
                    match closure {
                        Some(closure) => c.compile_node(closure)?,
                        None => c.emit(Instruction::LoadPointer),
                    }
                    c.emit(Instruction::GetAcc);
                    c.emit(Instruction::BinOp(b'+'));
                    c.emit(Instruction::SetAcc);
                    Ok(())
                })?;
                self.emit(Instruction::GetAcc);
            }
            (name, _) => {
                return Err(FileError::new(
                    format!("builtin {} expects a closure", name),
                    self.span,
                ));
            }
        }
        self.emit(Instruction::End);
        Ok(())
    }

    /// Runs `body` once per element of the innermost scope.
    fn emit_loop(
        &mut self,
        body: impl FnOnce(&mut Self) -> CompileResult<()>,
    ) -> CompileResult<()> {
        let begin = self.label();
        let end_jump = self.jump_placeholder();
        body(self)?;
        self.emit(Instruction::IncrementIndex);
        self.emit_backward(begin)?;
        self.patch_here(end_jump, Instruction::JumpIfEnd)
    }

    /// Runs `body` when the bool on top of the stack is true; pops it either way.
    fn emit_cond(
        &mut self,
        body: impl FnOnce(&mut Self) -> CompileResult<()>,
    ) -> CompileResult<()> {
        let noop = self.jump_placeholder();
        self.emit(Instruction::Pop);
        body(self)?;
        let end = self.jump_placeholder();
        self.patch_here(noop, Instruction::JumpIfFalse)?;
        self.emit(Instruction::Pop);
        self.patch_here(end, Instruction::JumpForward)
    }
}

impl Default for BytecodeCompiler {
    fn default() -> Self {
        Self::new()
    }
}
