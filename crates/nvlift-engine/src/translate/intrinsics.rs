//! NVVM special-register and barrier intrinsics.
//!
//! Builtin-tagged methods resolve to these pre-declared device primitives
//! instead of being translated from a body. The registry mirrors the PTX
//! special registers exposed to kernels: thread/block indices, dimensions,
//! and the warp size, plus the block-level barrier.

use crate::bytecode::{Method, SourceType};

pub const THREAD_IDX_X: &str = "llvm.nvvm.read.ptx.sreg.tid.x";
pub const THREAD_IDX_Y: &str = "llvm.nvvm.read.ptx.sreg.tid.y";
pub const THREAD_IDX_Z: &str = "llvm.nvvm.read.ptx.sreg.tid.z";
pub const BLOCK_IDX_X: &str = "llvm.nvvm.read.ptx.sreg.ctaid.x";
pub const BLOCK_IDX_Y: &str = "llvm.nvvm.read.ptx.sreg.ctaid.y";
pub const BLOCK_IDX_Z: &str = "llvm.nvvm.read.ptx.sreg.ctaid.z";
pub const THREAD_DIM_X: &str = "llvm.nvvm.read.ptx.sreg.ntid.x";
pub const THREAD_DIM_Y: &str = "llvm.nvvm.read.ptx.sreg.ntid.y";
pub const THREAD_DIM_Z: &str = "llvm.nvvm.read.ptx.sreg.ntid.z";
pub const BLOCK_DIM_X: &str = "llvm.nvvm.read.ptx.sreg.nctaid.x";
pub const BLOCK_DIM_Y: &str = "llvm.nvvm.read.ptx.sreg.nctaid.y";
pub const BLOCK_DIM_Z: &str = "llvm.nvvm.read.ptx.sreg.nctaid.z";
pub const WARP_SIZE: &str = "llvm.nvvm.read.ptx.sreg.warpsize";
pub const BARRIER: &str = "llvm.nvvm.barrier0";

/// All special-register read intrinsics (each takes no arguments and
/// yields an i32).
pub const SPECIAL_REGISTERS: [&str; 13] = [
    THREAD_IDX_X,
    THREAD_IDX_Y,
    THREAD_IDX_Z,
    BLOCK_IDX_X,
    BLOCK_IDX_Y,
    BLOCK_IDX_Z,
    THREAD_DIM_X,
    THREAD_DIM_Y,
    THREAD_DIM_Z,
    BLOCK_DIM_X,
    BLOCK_DIM_Y,
    BLOCK_DIM_Z,
    WARP_SIZE,
];

/// Builtin-tagged method reading the named special register.
pub fn special_register_method(name: impl Into<String>, intrinsic: &str) -> Method {
    Method::builtin(name, intrinsic, vec![], SourceType::I32)
}

/// Builtin-tagged method for the block-level barrier.
pub fn barrier_method(name: impl Into<String>) -> Method {
    Method::builtin(name, BARRIER, vec![], SourceType::Void)
}
