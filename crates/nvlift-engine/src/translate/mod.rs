//! The stack-to-IR translation pipeline.
//!
//! Walks a block-split instruction stream in order, simulating the operand
//! stack and dispatching every instruction to a handler that emits target
//! IR. Calls resolve through a per-module memo so each callee is
//! translated once; builtin-tagged callees resolve to shared intrinsic
//! declarations.

pub mod emitter;
pub mod intrinsics;
pub mod typemap;

pub use emitter::{is_supported, unsupported_opcodes, Translator};
pub use typemap::map_type;

use crate::analysis::CfgError;
use crate::bytecode::{Opcode, SourceType};

/// Fatal translation error. There is no recovery or partial-result path:
/// any of these aborts the whole compilation request.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error(transparent)]
    Cfg(#[from] CfgError),

    /// The dispatch table does not cover this opcode.
    #[error("unsupported instruction {opcode:?} at offset {offset}")]
    UnsupportedInstruction { opcode: Opcode, offset: u32 },

    /// The type mapper cannot represent a source type in device code.
    #[error("type cannot be lowered to device code: {ty}")]
    UnsupportedType { ty: SourceType },

    /// A local variable is loaded before any store to it.
    #[error("local variable {index} is loaded before any store, at offset {offset}")]
    UninitializedVariable { index: usize, offset: u32 },

    /// An instruction pops from an empty operand stack.
    #[error("operand stack underflow at offset {offset}")]
    StackUnderflow { offset: u32 },

    /// An instruction tries to emit into a block already closed by a
    /// terminator.
    #[error("instruction at offset {offset} follows a terminator in a closed block")]
    BlockClosed { offset: u32 },

    /// A callee is reached again while its own translation is still in
    /// progress; recursive call graphs are not translatable.
    #[error("recursive call to '{method}' cannot be translated")]
    RecursiveCall { method: String },
}
