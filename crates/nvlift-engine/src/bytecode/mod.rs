//! The method bytecode consumed from the decompiler.
//!
//! This module defines the contract side of the engine: source value types,
//! the opcode set, offset-addressed instruction records, and method/program
//! descriptors. The decompiler produces these records; the engine never
//! parses raw bytes itself.

pub mod instr;
pub mod method;
pub mod opcode;
pub mod types;

pub use instr::{Instruction, Operand};
pub use method::{Method, MethodId, Program};
pub use opcode::{FlowControl, Opcode};
pub use types::SourceType;
