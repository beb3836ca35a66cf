use ecow::{EcoString, EcoVec};
use tracing::trace;

use super::error::Fault;
use super::instruction_set::Instruction;
use super::operators as ops;
use super::{Program, Stack};
use crate::errors::Error;
use crate::values::{Callable, Function, TypedFn, Value, guard};

/// Iteration state of one closure builtin.
#[derive(Debug, Clone)]
pub struct Scope {
    pub items: EcoVec<Value>,
    pub index: usize,
    pub count: i64,
    pub acc: Value,
    pub collected: EcoVec<Value>,
}

impl Scope {
    fn new(items: EcoVec<Value>) -> Self {
        Self {
            items,
            index: 0,
            count: 0,
            acc: Value::Nil,
            collected: EcoVec::new(),
        }
    }

    /// The element `#` refers to.
    pub fn current(&self) -> Option<&Value> {
        self.items.get(self.index)
    }
}

/// One execution of a [`Program`].
///
/// Not reusable: construct a fresh `Vm` per run. [`Vm::run`] executes to
/// completion; [`Vm::step`] executes a single instruction for the debugger.
pub struct Vm<'p> {
    program: &'p Program,
    env: &'p Value,
    ip: usize,
    stack: Stack<Value>,
    scopes: Vec<Scope>,
    steps: u64,
    memory: usize,
    wide_arg: usize,
}

impl<'p> Vm<'p> {
    pub fn new(program: &'p Program, env: &'p Value) -> Self {
        Vm {
            program,
            env,
            ip: 0,
            stack: Stack::new(16),
            scopes: Vec::new(),
            steps: 0,
            memory: 0,
            wide_arg: 0,
        }
    }

    pub fn run(&mut self) -> Result<Value, Error> {
        loop {
            if let Some(value) = self.step()? {
                return Ok(value);
            }
        }
    }

    /// Address of the next instruction.
    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn stack(&self) -> &[Value] {
        self.stack.as_slice()
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// Executes one instruction. Returns the result once the program returns.
    pub fn step(&mut self) -> Result<Option<Value>, Error> {
        let at = self.ip;
        self.execute().map_err(|fault| {
            let span = self.program.spans.get(at).copied().unwrap_or_default();
            fault.at(span)
        })
    }

    /// Operand of the current instruction, extended by any `WideArg` prefix.
    fn arg(&mut self, low: u8) -> usize {
        let arg = self.wide_arg | low as usize;
        self.wide_arg = 0;
        arg
    }

    fn jump_forward(&mut self, low: u8) {
        self.ip += self.arg(low);
    }

    fn grow(&mut self, size: usize) -> Result<(), Fault> {
        self.memory = self.memory.saturating_add(size);
        if self.memory > self.program.limits.memory_budget {
            return Err(Fault::MemoryExceeded);
        }
        Ok(())
    }

    fn scope(&mut self) -> &mut Scope {
        match self.scopes.last_mut() {
            Some(scope) => scope,
            None => unreachable!("closure instruction outside a scope"),
        }
    }

    fn name(&self, index: usize) -> EcoString {
        match &self.program.constants[index] {
            Value::String(name) => name.clone(),
            other => unreachable!("name constant is {:?}", other),
        }
    }

    fn pop_pair(&mut self) -> (Value, Value) {
        let b = self.stack.pop();
        let a = self.stack.pop();
        (a, b)
    }

    fn execute(&mut self) -> Result<Option<Value>, Fault> {
        let Some(&instruction) = self.program.instructions.get(self.ip) else {
            unreachable!("instruction pointer past the end of the program")
        };
        self.ip += 1;
        self.steps += 1;
        if self.steps > self.program.limits.max_steps {
            return Err(Fault::StepsExceeded);
        }
        trace!(ip = self.ip - 1, ?instruction, "step");

        use Instruction::*;
        match instruction {
            Nop => {}
            WideArg(high) => {
                self.wide_arg = (self.wide_arg | high as usize) << 8;
                return Ok(None);
            }
            ConstLoad(low) => {
                let index = self.arg(low);
                self.stack.push(self.program.constants[index].clone());
            }
            ConstInt(value) => self.stack.push(Value::Int(value as i64)),
            ConstUInt(value) => self.stack.push(Value::Int(value as i64)),
            ConstBool(value) => self.stack.push(Value::Bool(value != 0)),
            ConstNil => self.stack.push(Value::Nil),
            Pop => {
                self.stack.pop();
            }
            LoadEnv => self.stack.push(self.env.clone()),
            LoadName(low) => {
                let index = self.arg(low);
                let name = self.name(index);
                let value = match self.env {
                    Value::Map(entries) => entries.get(&name).cloned().unwrap_or_default(),
                    Value::Object(object) => {
                        crate::values::lookup(object.as_ref(), &name).unwrap_or_default()
                    }
                    _ => Value::Nil,
                };
                self.stack.push(value);
            }
            LoadPointer => {
                let value = self.scope().current().cloned().unwrap_or_default();
                self.stack.push(value);
            }

            // Statically typed operands can still be nil at runtime (a missing
            // map key, an unset field); those go through the dynamic operators.
            IntBinOp(op) => {
                let (a, b) = self.pop_pair();
                let value = match (&a, &b) {
                    (Value::Int(x), Value::Int(y)) => Value::Int(ops::int_op(op, *x, *y)?),
                    _ => ops::binary(op, &a, &b)?,
                };
                self.stack.push(value);
            }
            NegInt => {
                let a = self.stack.pop();
                let value = match a {
                    Value::Int(n) => Value::Int(n.wrapping_neg()),
                    other => ops::negate(&other)?,
                };
                self.stack.push(value);
            }
            IntCmpOp(op) => {
                let (a, b) = self.pop_pair();
                let value = match (&a, &b) {
                    (Value::Int(x), Value::Int(y)) => Value::Bool(op.test(x.cmp(y))),
                    _ => ops::compare(op, &a, &b)?,
                };
                self.stack.push(value);
            }
            FloatBinOp(op) => {
                let (a, b) = self.pop_pair();
                let value = match (a.as_float(), b.as_float()) {
                    (Some(x), Some(y)) => Value::Float(ops::float_op(op, x, y)),
                    _ => ops::binary(op, &a, &b)?,
                };
                self.stack.push(value);
            }
            NegFloat => {
                let a = self.stack.pop();
                let value = match a.as_float() {
                    Some(x) => Value::Float(-x),
                    None => ops::negate(&a)?,
                };
                self.stack.push(value);
            }
            FloatCmpOp(op) => {
                let (a, b) = self.pop_pair();
                let value = match (a.as_float(), b.as_float()) {
                    (Some(x), Some(y)) => Value::Bool(ops::float_compare(op, x, y)),
                    _ => ops::compare(op, &a, &b)?,
                };
                self.stack.push(value);
            }
            BinOp(op) => {
                let (a, b) = self.pop_pair();
                self.stack.push(ops::binary(op, &a, &b)?);
            }
            Neg => {
                let a = self.stack.pop();
                self.stack.push(ops::negate(&a)?);
            }
            Compare(op) | StringCmpOp(op) => {
                let (a, b) = self.pop_pair();
                self.stack.push(ops::compare(op, &a, &b)?);
            }

            Not => {
                let a = self.stack.pop();
                self.stack.push(ops::not(&a)?);
            }
            Eq => {
                let (a, b) = self.pop_pair();
                self.stack.push(Value::Bool(ops::equal(&a, &b)));
            }
            NotEq => {
                let (a, b) = self.pop_pair();
                self.stack.push(Value::Bool(!ops::equal(&a, &b)));
            }

            JumpForward(low) => self.jump_forward(low),
            JumpBackward(low) => {
                let offset = self.arg(low);
                self.ip -= offset;
            }
            PopJumpIfFalse(low) => {
                let cond = self.stack.pop();
                if !ops::truthy(&cond)? {
                    self.jump_forward(low);
                }
            }
            JumpIfFalse(low) => {
                if !ops::truthy(self.stack.peek())? {
                    self.jump_forward(low);
                }
            }
            JumpIfTrue(low) => {
                if ops::truthy(self.stack.peek())? {
                    self.jump_forward(low);
                }
            }
            JumpIfNil(low) => {
                if self.stack.peek().is_nil() {
                    self.jump_forward(low);
                }
            }
            JumpIfNotNil(low) => {
                if !self.stack.peek().is_nil() {
                    self.jump_forward(low);
                }
            }
            Return => return Ok(Some(self.stack.pop())),

            Call(low) => {
                let argc = self.arg(low);
                let args = self.stack.pop_n(argc);
                let function = self.callee()?;
                self.stack.push(function.call(&args)?);
            }
            CallFast(low) => {
                let argc = self.arg(low);
                let args = self.stack.pop_n(argc);
                let function = self.callee()?;
                let result = match function.callable() {
                    Callable::Fast(f) => guard(|| Ok(f(&args)))?,
                    _ => function.call(&args)?,
                };
                self.stack.push(result);
            }
            CallTyped(low) => {
                let index = self.arg(low) as u16;
                let argc = TypedFn::arity(index);
                let args = self.stack.pop_n(argc);
                let function = self.callee()?;
                let result = match function.callable() {
                    Callable::Typed(t) if t.index() == index => {
                        guard(|| t.call(&args).map_err(crate::values::CallError::Argument))?
                    }
                    _ => function.call(&args)?,
                };
                self.stack.push(result);
            }

            MakeArray(low) => {
                let count = self.arg(low);
                self.grow(count)?;
                let items = self.stack.pop_n(count);
                self.stack.push(Value::Array(items.into_iter().collect()));
            }
            MakeMap(low) => {
                let count = self.arg(low);
                self.grow(count)?;
                let flat = self.stack.pop_n(count * 2);
                let mut entries = Vec::with_capacity(count);
                let mut iter = flat.into_iter();
                while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
                    match key {
                        Value::String(key) => entries.push((key, value)),
                        other => {
                            return Err(Fault::runtime(format!(
                                "cannot use {} as map key",
                                other.type_name()
                            )));
                        }
                    }
                }
                self.stack.push(Value::map(entries));
            }
            Len => {
                let a = self.stack.pop();
                self.stack.push(ops::len(&a)?);
            }
            Fetch => {
                let (base, key) = self.pop_pair();
                self.stack.push(ops::fetch(&base, &key)?);
            }
            FetchField(low) => {
                let index = self.arg(low);
                let base = self.stack.pop();
                let key = &self.program.constants[index];
                self.stack.push(ops::fetch(&base, key)?);
            }
            Slice(bounds) => {
                let hi = (bounds & 2 != 0).then(|| self.stack.pop());
                let lo = (bounds & 1 != 0).then(|| self.stack.pop());
                let base = self.stack.pop();
                self.stack.push(ops::slice(&base, lo.as_ref(), hi.as_ref())?);
            }
            Range => {
                let (lo, hi) = self.pop_pair();
                let (Value::Int(lo), Value::Int(hi)) = (&lo, &hi) else {
                    return Err(Fault::runtime(format!(
                        "invalid operation: .. (mismatched types {} and {})",
                        lo.type_name(),
                        hi.type_name()
                    )));
                };
                self.grow(ops::range_len(*lo, *hi))?;
                self.stack.push(ops::range(*lo, *hi));
            }
            In => {
                let (needle, haystack) = self.pop_pair();
                self.stack.push(Value::Bool(ops::contains(&needle, &haystack)?));
            }

            Matches => {
                let (text, pattern) = self.pop_pair();
                self.stack.push(ops::matches(&text, &pattern)?);
            }
            MatchesConst(low) => {
                let index = self.arg(low);
                let text = self.stack.pop();
                self.stack.push(ops::matches_regex(&text, &self.program.regexes[index])?);
            }
            Contains => {
                let (a, b) = self.pop_pair();
                self.stack.push(ops::string_contains(&a, &b)?);
            }
            StartsWith => {
                let (a, b) = self.pop_pair();
                self.stack.push(ops::starts_with(&a, &b)?);
            }
            EndsWith => {
                let (a, b) = self.pop_pair();
                self.stack.push(ops::ends_with(&a, &b)?);
            }
            Cast(kind) => {
                let a = self.stack.pop();
                self.stack.push(ops::cast(kind, a)?);
            }

            Begin => {
                let collection = self.stack.pop();
                let items = ops::elements(&collection)?;
                self.scopes.push(Scope::new(items));
            }
            JumpIfEnd(low) => {
                let scope = self.scope();
                if scope.index >= scope.items.len() {
                    self.jump_forward(low);
                }
            }
            IncrementIndex => self.scope().index += 1,
            IncrementCount => self.scope().count += 1,
            GetCount => {
                let count = self.scope().count;
                self.stack.push(Value::Int(count));
            }
            Collect => {
                self.grow(1)?;
                let value = self.stack.pop();
                self.scope().collected.push(value);
            }
            GetCollected => {
                let collected = core::mem::take(&mut self.scope().collected);
                self.stack.push(Value::Array(collected));
            }
            SetAcc => {
                let value = self.stack.pop();
                self.scope().acc = value;
            }
            GetAcc => {
                let acc = self.scope().acc.clone();
                self.stack.push(acc);
            }
            End => {
                self.scopes.pop();
            }
        }
        self.wide_arg = 0;
        Ok(None)
    }

    fn callee(&mut self) -> Result<Function, Fault> {
        match self.stack.pop() {
            Value::Function(function) => Ok(function),
            other => Err(Fault::runtime(format!("{} is not callable", other.type_name()))),
        }
    }
}
