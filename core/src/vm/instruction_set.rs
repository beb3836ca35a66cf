//! VM instructions, fixed 16-bit format.
//!
//! # Instruction Format
//!
//! Every instruction is exactly 2 bytes:
//! ```text
//! ┌────────────┬────────────┐
//! │    Tag     │  Operand   │
//! │  (8 bits)  │  (8 bits)  │
//! └────────────┴────────────┘
//! ```
//!
//! # Wide Arguments
//!
//! Operands above 255 are prefixed with `WideArg`, which supplies the high
//! byte(s):
//! ```ignore
//! WideArg(0x03)       // High byte
//! ConstLoad(0xE8)     // Combined: constant 1000 (0x03E8)
//! ```
//!
//! Jumps are always emitted with one `WideArg` prefix so they can be patched
//! in place; their offset is counted in instructions from the instruction
//! after the jump.
//!
//! # Stack Discipline
//!
//! Stack effect notation: `[..., operand1, operand2] -> [..., result]`

use core::fmt;

/// A single VM instruction (exactly 16 bits).
#[repr(C, u8)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// No operation. Never emitted by the compiler.
    Nop = 0x00,

    // ========================================================================
    // Stack & Constants (0x01 - 0x0F)
    // ========================================================================
    /// Push constant from pool.
    /// Operand: index (wide) | Stack: [...] -> [..., value]
    ConstLoad(u8) = 0x01,

    /// Push small signed integer (-128 to 127).
    /// Stack: [...] -> [..., int]
    ConstInt(i8) = 0x02,

    /// Push unsigned byte (0 to 255).
    /// Stack: [...] -> [..., int]
    ConstUInt(u8) = 0x03,

    /// Push the Bool value (arg != 0).
    ConstBool(u8) = 0x04,

    /// Wide argument prefix: `(this_operand << 8) | next_operand`.
    WideArg(u8) = 0x05,

    /// Push nil.
    ConstNil = 0x06,

    /// Stack: [..., a] -> [...]
    Pop = 0x08,

    /// Push the whole environment.
    LoadEnv = 0x0A,

    /// Push an environment variable; unknown names push nil.
    /// Operand: constant index of the name (wide)
    LoadName(u8) = 0x0B,

    /// Push the element of the innermost closure scope.
    LoadPointer = 0x0C,

    // ========================================================================
    // Arithmetic (0x10 - 0x2F)
    // ========================================================================
    /// Integer binary operation, operand is the operator byte:
    /// `+ - * / %`. Division and modulo by zero fail.
    /// Stack: [..., a: Int, b: Int] -> [..., Int]
    IntBinOp(u8) = 0x10,

    NegInt = 0x11,

    /// Stack: [..., a: Int, b: Int] -> [..., Bool]
    IntCmpOp(CmpOp) = 0x14,

    /// Float binary operation: `+ - * /`.
    FloatBinOp(u8) = 0x20,

    NegFloat = 0x21,

    FloatCmpOp(CmpOp) = 0x22,

    /// Dynamically typed binary operation: `+ - * / % ^`.
    BinOp(u8) = 0x28,

    /// Dynamically typed negation.
    Neg = 0x29,

    /// Dynamically typed ordering.
    Compare(CmpOp) = 0x2A,

    // ========================================================================
    // Logic & Equality (0x30 - 0x37)
    // ========================================================================
    Not = 0x32,

    /// Structural equality, numeric across int and float.
    Eq = 0x35,

    NotEq = 0x36,

    // ========================================================================
    // Control Flow (0x38 - 0x4F)
    // ========================================================================
    /// Unconditional forward jump.
    JumpForward(u8) = 0x38,

    /// Pop and jump if false.
    /// Stack: [..., cond: Bool] -> [...]
    PopJumpIfFalse(u8) = 0x39,

    /// Jump if the top is false, leaving it on the stack.
    JumpIfFalse(u8) = 0x3A,

    /// Jump if the top is true, leaving it on the stack.
    JumpIfTrue(u8) = 0x3B,

    /// Jump if the top is nil, leaving it on the stack.
    JumpIfNil(u8) = 0x3C,

    /// Jump if the top is not nil, leaving it on the stack.
    JumpIfNotNil(u8) = 0x3D,

    /// Stack: [retval] -> []
    Return = 0x3E,

    /// Call through the function's own convention.
    /// Operand: argument count (wide) | Stack: [..., func, args...] -> [..., result]
    Call(u8) = 0x3F,

    /// Call a `(...any) any` function directly.
    CallFast(u8) = 0x40,

    /// Call a fixed-signature function.
    /// Operand: typed convention index; the argument count is its arity.
    CallTyped(u8) = 0x41,

    /// Unconditional backward jump, relative to the next instruction.
    JumpBackward(u8) = 0x42,

    // ========================================================================
    // Collections (0x60 - 0x7F)
    // ========================================================================
    /// Operand: count (wide) | Stack: [..., e1, ..., eN] -> [..., array]
    MakeArray(u8) = 0x60,

    /// Length of an array, map or string.
    Len = 0x61,

    /// Index or key access.
    /// Stack: [..., base, key] -> [..., value]
    Fetch = 0x62,

    /// Named member access.
    /// Operand: constant index of the name (wide) | Stack: [..., base] -> [..., value]
    FetchField(u8) = 0x63,

    /// Operand: bit 0 set when the lower bound is present, bit 1 for the upper.
    /// Stack: [..., base, lo?, hi?] -> [..., slice]
    Slice(u8) = 0x65,

    /// Stack: [..., lo: Int, hi: Int] -> [..., array]
    Range = 0x66,

    /// Membership in an array, map, record or constant set.
    /// Stack: [..., needle, haystack] -> [..., Bool]
    In = 0x67,

    /// Operand: pair count (wide) | Stack: [..., k1, v1, ..., kN, vN] -> [..., map]
    MakeMap(u8) = 0x70,

    // ========================================================================
    // Strings (0x98 - 0x9F)
    // ========================================================================
    StringCmpOp(CmpOp) = 0x98,

    /// Match against a pattern compiled at run time.
    /// Stack: [..., text, pattern] -> [..., Bool]
    Matches = 0x99,

    /// Match against a precompiled pattern.
    /// Operand: regex table index (wide) | Stack: [..., text] -> [..., Bool]
    MatchesConst(u8) = 0x9A,

    Contains = 0x9B,
    StartsWith = 0x9C,
    EndsWith = 0x9D,

    // ========================================================================
    // Conversions (0xB0 - 0xBF)
    // ========================================================================
    /// Convert the result to the requested kind.
    /// Operand: 0 for int64, 1 for float64
    Cast(u8) = 0xB0,

    // ========================================================================
    // Closure Scopes (0xC0 - 0xCF)
    // ========================================================================
    /// Pop a collection and open a scope iterating over it.
    Begin = 0xC0,

    /// Jump when the innermost scope has no element left.
    JumpIfEnd(u8) = 0xC1,

    IncrementIndex = 0xC2,

    IncrementCount = 0xC3,

    /// Push the scope's counter.
    GetCount = 0xC4,

    /// Pop a value into the scope's result array.
    Collect = 0xC5,

    /// Push the scope's result array.
    GetCollected = 0xC6,

    /// Pop into the scope's accumulator.
    SetAcc = 0xC7,

    GetAcc = 0xC8,

    /// Close the innermost scope.
    End = 0xC9,
}
static_assertions::assert_eq_size!(Instruction, [u8; 2]);

/// Ordering comparison encoded in a single operand byte.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }

    pub fn test(self, ordering: core::cmp::Ordering) -> bool {
        use core::cmp::Ordering::*;
        match self {
            CmpOp::Lt => ordering == Less,
            CmpOp::Le => ordering != Greater,
            CmpOp::Gt => ordering == Greater,
            CmpOp::Ge => ordering != Less,
        }
    }
}

impl Instruction {
    /// Size of an instruction in bytes
    pub const SIZE: usize = 2;

    /// Relative jump operand, if this is a jump.
    pub(crate) const fn jump_offset(&self) -> Option<u8> {
        match self {
            Self::JumpForward(offset)
            | Self::PopJumpIfFalse(offset)
            | Self::JumpIfFalse(offset)
            | Self::JumpIfTrue(offset)
            | Self::JumpIfNil(offset)
            | Self::JumpIfNotNil(offset)
            | Self::JumpIfEnd(offset)
            | Self::JumpBackward(offset) => Some(*offset),
            _ => None,
        }
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Binary operations - show operator as char
            Self::IntBinOp(op) => write!(f, "IntBinOp({})", *op as char),
            Self::FloatBinOp(op) => write!(f, "FloatBinOp({})", *op as char),
            Self::BinOp(op) => write!(f, "BinOp({})", *op as char),

            Self::IntCmpOp(op) => write!(f, "IntCmpOp({:?})", op),
            Self::FloatCmpOp(op) => write!(f, "FloatCmpOp({:?})", op),
            Self::StringCmpOp(op) => write!(f, "StringCmpOp({:?})", op),
            Self::Compare(op) => write!(f, "Compare({:?})", op),

            Self::Nop => write!(f, "Nop"),
            Self::ConstLoad(idx) => write!(f, "ConstLoad({})", idx),
            Self::ConstInt(val) => write!(f, "ConstInt({})", val),
            Self::ConstUInt(val) => write!(f, "ConstUInt({})", val),
            Self::ConstBool(val) => write!(f, "ConstBool({})", val),
            Self::WideArg(high) => write!(f, "WideArg(0x{:02X})", high),
            Self::ConstNil => write!(f, "ConstNil"),
            Self::Pop => write!(f, "Pop"),
            Self::LoadEnv => write!(f, "LoadEnv"),
            Self::LoadName(idx) => write!(f, "LoadName({})", idx),
            Self::LoadPointer => write!(f, "LoadPointer"),
            Self::NegInt => write!(f, "NegInt"),
            Self::NegFloat => write!(f, "NegFloat"),
            Self::Neg => write!(f, "Neg"),
            Self::Not => write!(f, "Not"),
            Self::Eq => write!(f, "Eq"),
            Self::NotEq => write!(f, "NotEq"),
            Self::JumpForward(offset) => write!(f, "JumpForward({})", offset),
            Self::PopJumpIfFalse(offset) => write!(f, "PopJumpIfFalse({})", offset),
            Self::JumpIfFalse(offset) => write!(f, "JumpIfFalse({})", offset),
            Self::JumpIfTrue(offset) => write!(f, "JumpIfTrue({})", offset),
            Self::JumpIfNil(offset) => write!(f, "JumpIfNil({})", offset),
            Self::JumpIfNotNil(offset) => write!(f, "JumpIfNotNil({})", offset),
            Self::JumpBackward(offset) => write!(f, "JumpBackward({})", offset),
            Self::Return => write!(f, "Return"),
            Self::Call(argc) => write!(f, "Call({})", argc),
            Self::CallFast(argc) => write!(f, "CallFast({})", argc),
            Self::CallTyped(idx) => write!(f, "CallTyped({})", idx),
            Self::MakeArray(count) => write!(f, "MakeArray({})", count),
            Self::Len => write!(f, "Len"),
            Self::Fetch => write!(f, "Fetch"),
            Self::FetchField(idx) => write!(f, "FetchField({})", idx),
            Self::Slice(bounds) => write!(f, "Slice({})", bounds),
            Self::Range => write!(f, "Range"),
            Self::In => write!(f, "In"),
            Self::MakeMap(count) => write!(f, "MakeMap({})", count),
            Self::Matches => write!(f, "Matches"),
            Self::MatchesConst(idx) => write!(f, "MatchesConst({})", idx),
            Self::Contains => write!(f, "Contains"),
            Self::StartsWith => write!(f, "StartsWith"),
            Self::EndsWith => write!(f, "EndsWith"),
            Self::Cast(0) => write!(f, "Cast(int64)"),
            Self::Cast(_) => write!(f, "Cast(float64)"),
            Self::Begin => write!(f, "Begin"),
            Self::JumpIfEnd(offset) => write!(f, "JumpIfEnd({})", offset),
            Self::IncrementIndex => write!(f, "IncrementIndex"),
            Self::IncrementCount => write!(f, "IncrementCount"),
            Self::GetCount => write!(f, "GetCount"),
            Self::Collect => write!(f, "Collect"),
            Self::GetCollected => write!(f, "GetCollected"),
            Self::SetAcc => write!(f, "SetAcc"),
            Self::GetAcc => write!(f, "GetAcc"),
            Self::End => write!(f, "End"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_size() {
        assert_eq!(core::mem::size_of::<Instruction>(), 2);
        assert_eq!(Instruction::SIZE, 2);
    }

    #[test]
    fn test_instruction_alignment() {
        assert_eq!(core::mem::align_of::<Instruction>(), 1);
    }

    #[test]
    fn test_parameterized_ops() {
        assert_ne!(Instruction::IntBinOp(b'+'), Instruction::IntBinOp(b'-'));
        assert_ne!(
            Instruction::IntCmpOp(CmpOp::Lt),
            Instruction::IntCmpOp(CmpOp::Gt)
        );
    }

    #[test]
    fn test_cmp_op() {
        use core::cmp::Ordering;
        assert!(CmpOp::Le.test(Ordering::Equal));
        assert!(!CmpOp::Lt.test(Ordering::Equal));
        assert!(CmpOp::Ge.test(Ordering::Greater));
    }

    #[test]
    fn test_debug_formatting() {
        assert_eq!(format!("{:?}", Instruction::IntBinOp(b'+')), "IntBinOp(+)");
        assert_eq!(format!("{:?}", Instruction::IntCmpOp(CmpOp::Lt)), "IntCmpOp(Lt)");
        assert_eq!(format!("{:?}", Instruction::Cast(1)), "Cast(float64)");
    }
}
