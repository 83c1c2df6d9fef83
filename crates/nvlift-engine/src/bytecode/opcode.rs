//! The method bytecode instruction set.
//!
//! Canonical, operand-carrying forms only: the decompiler normalizes
//! shorthand encodings (`ldc.i4.3`, `ldloc.0`, short branch forms) into
//! their long equivalents before handing the stream to the engine.
//!
//! The set deliberately includes opcodes the translator does not cover;
//! those fail translation with `UnsupportedInstruction` and are listed by
//! [`crate::translate::unsupported_opcodes`] so callers can reject a method
//! before attempting it.

/// Opcodes of the source instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // ===== Stack manipulation =====
    /// No operation. Also the carrier for synthesized block-boundary
    /// markers (operand `Block`) after CFG construction.
    Nop,
    /// Discard the top of the stack
    Pop,
    /// Duplicate the top of the stack
    Dup,

    // ===== Constants =====
    /// Push a 32-bit integer constant (operand: integer)
    LdcI4,
    /// Push a 64-bit integer constant (operand: integer)
    LdcI8,
    /// Push a 32-bit float constant (operand: float)
    LdcR4,
    /// Push a 64-bit float constant (operand: float)
    LdcR8,

    // ===== Locals and arguments =====
    /// Load a local variable (operand: slot index)
    Ldloc,
    /// Store to a local variable (operand: slot index)
    Stloc,
    /// Load an argument (operand: parameter index)
    Ldarg,
    /// Store to an argument (operand: parameter index)
    Starg,

    // ===== Arithmetic and bitwise =====
    Add,
    Sub,
    Mul,
    /// Signed division
    Div,
    /// Unsigned division
    DivUn,
    /// Signed remainder
    Rem,
    /// Unsigned remainder
    RemUn,
    And,
    Or,
    Xor,
    Shl,
    /// Arithmetic (signed) right shift
    Shr,
    /// Logical (unsigned) right shift
    ShrUn,
    Neg,
    Not,

    // ===== Comparison =====
    /// Push 1 if equal, else 0
    Ceq,
    /// Push 1 if greater (signed)
    Cgt,
    /// Push 1 if greater (unsigned)
    CgtUn,
    /// Push 1 if less (signed)
    Clt,
    /// Push 1 if less (unsigned)
    CltUn,

    // ===== Conversions =====
    ConvI1,
    ConvI2,
    ConvI4,
    ConvI8,
    ConvU1,
    ConvU2,
    ConvU4,
    ConvU8,
    ConvR4,
    ConvR8,

    // ===== Arrays and indirection =====
    /// Load an array element: pops index, array
    Ldelem,
    /// Store an array element: pops value, index, array
    Stelem,
    /// Load through a pointer
    Ldind,
    /// Store through a pointer: pops value, pointer
    Stind,

    // ===== Control flow =====
    /// Unconditional branch (operand: relative target)
    Br,
    /// Branch if the popped condition is true
    Brtrue,
    /// Branch if the popped condition is false
    Brfalse,
    /// Branch if equal
    Beq,
    /// Branch if not equal (unsigned/unordered form)
    BneUn,
    /// Branch if less (signed)
    Blt,
    /// Branch if less (unsigned)
    BltUn,
    /// Branch if less or equal (signed)
    Ble,
    /// Branch if less or equal (unsigned)
    BleUn,
    /// Branch if greater (signed)
    Bgt,
    /// Branch if greater (unsigned)
    BgtUn,
    /// Branch if greater or equal (signed)
    Bge,
    /// Branch if greater or equal (unsigned)
    BgeUn,

    // ===== Calls and return =====
    /// Call a method (operand: method reference)
    Call,
    /// Tail call; translated like an ordinary call
    Tailcall,
    /// Return, with the top of the stack as value when one is present
    Ret,

    // ===== Not translatable to device code =====
    Ldstr,
    Newobj,
    Callvirt,
    Ldfld,
    Stfld,
    Ldsfld,
    Stsfld,
    Newarr,
    Ldlen,
    Box,
    Unbox,
    Throw,
    Leave,
    Endfinally,
    Switch,
    Castclass,
    Isinst,
    Ldftn,
    Localloc,
    Sizeof,
}

/// Control-flow category of an opcode, used by the CFG scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    /// Falls through to the next instruction
    Next,
    /// Unconditional transfer
    Branch,
    /// Two-way transfer
    CondBranch,
    /// Transfers into a callee and back
    Call,
    /// Leaves the method
    Return,
}

impl Opcode {
    /// Every opcode in the instruction set, in declaration order.
    pub const ALL: [Opcode; 81] = [
        Opcode::Nop,
        Opcode::Pop,
        Opcode::Dup,
        Opcode::LdcI4,
        Opcode::LdcI8,
        Opcode::LdcR4,
        Opcode::LdcR8,
        Opcode::Ldloc,
        Opcode::Stloc,
        Opcode::Ldarg,
        Opcode::Starg,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::DivUn,
        Opcode::Rem,
        Opcode::RemUn,
        Opcode::And,
        Opcode::Or,
        Opcode::Xor,
        Opcode::Shl,
        Opcode::Shr,
        Opcode::ShrUn,
        Opcode::Neg,
        Opcode::Not,
        Opcode::Ceq,
        Opcode::Cgt,
        Opcode::CgtUn,
        Opcode::Clt,
        Opcode::CltUn,
        Opcode::ConvI1,
        Opcode::ConvI2,
        Opcode::ConvI4,
        Opcode::ConvI8,
        Opcode::ConvU1,
        Opcode::ConvU2,
        Opcode::ConvU4,
        Opcode::ConvU8,
        Opcode::ConvR4,
        Opcode::ConvR8,
        Opcode::Ldelem,
        Opcode::Stelem,
        Opcode::Ldind,
        Opcode::Stind,
        Opcode::Br,
        Opcode::Brtrue,
        Opcode::Brfalse,
        Opcode::Beq,
        Opcode::BneUn,
        Opcode::Blt,
        Opcode::BltUn,
        Opcode::Ble,
        Opcode::BleUn,
        Opcode::Bgt,
        Opcode::BgtUn,
        Opcode::Bge,
        Opcode::BgeUn,
        Opcode::Call,
        Opcode::Tailcall,
        Opcode::Ret,
        Opcode::Ldstr,
        Opcode::Newobj,
        Opcode::Callvirt,
        Opcode::Ldfld,
        Opcode::Stfld,
        Opcode::Ldsfld,
        Opcode::Stsfld,
        Opcode::Newarr,
        Opcode::Ldlen,
        Opcode::Box,
        Opcode::Unbox,
        Opcode::Throw,
        Opcode::Leave,
        Opcode::Endfinally,
        Opcode::Switch,
        Opcode::Castclass,
        Opcode::Isinst,
        Opcode::Ldftn,
        Opcode::Localloc,
        Opcode::Sizeof,
    ];

    /// Control-flow category, as the CFG scan sees it.
    pub fn flow(&self) -> FlowControl {
        match self {
            Opcode::Br => FlowControl::Branch,
            Opcode::Brtrue
            | Opcode::Brfalse
            | Opcode::Beq
            | Opcode::BneUn
            | Opcode::Blt
            | Opcode::BltUn
            | Opcode::Ble
            | Opcode::BleUn
            | Opcode::Bgt
            | Opcode::BgtUn
            | Opcode::Bge
            | Opcode::BgeUn => FlowControl::CondBranch,
            Opcode::Call | Opcode::Tailcall => FlowControl::Call,
            Opcode::Ret => FlowControl::Return,
            _ => FlowControl::Next,
        }
    }
}
