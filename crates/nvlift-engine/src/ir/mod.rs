//! The target intermediate representation.
//!
//! A self-contained, NVVM-flavored IR: typed values in basic blocks with
//! explicit terminators, grouped into functions and assembled into a
//! [`Module`] carrying target triple, data layout, and kernel annotations.
//! The external code generator consumes the `Module` value; the `Display`
//! implementations provide an LLVM-style textual dump for inspection.

pub mod builder;
pub mod display;
pub mod instr;
pub mod module;
pub mod types;

pub use builder::InstBuilder;
pub use instr::{
    Block, BlockId, FloatPredicate, FuncId, Function, Inst, IntPredicate, Terminator, ValueId,
};
pub use module::{KernelAnnotation, Module};
pub use types::{IrType, GLOBAL_ADDR_SPACE};
