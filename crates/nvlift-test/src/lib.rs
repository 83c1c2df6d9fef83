//! Test harness for nvlift.
//!
//! Fluent builders for instruction streams, methods, and programs, so
//! tests read as kernels instead of offset arithmetic. Instructions are
//! laid out one offset apart; `branch` takes the absolute index of the
//! target instruction and computes the relative displacement itself.

use nvlift_engine::bytecode::{
    Instruction, Method, MethodId, Opcode, Operand, Program, SourceType,
};
use nvlift_engine::translate::intrinsics;

/// Builds a [`Method`] one instruction at a time.
pub struct MethodBuilder {
    name: String,
    params: Vec<SourceType>,
    ret: SourceType,
    local_count: usize,
    kernel: bool,
    body: Vec<Instruction>,
}

impl MethodBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        MethodBuilder {
            name: name.into(),
            params: Vec::new(),
            ret: SourceType::Void,
            local_count: 0,
            kernel: false,
            body: Vec::new(),
        }
    }

    pub fn param(mut self, ty: SourceType) -> Self {
        self.params.push(ty);
        self
    }

    pub fn returns(mut self, ty: SourceType) -> Self {
        self.ret = ty;
        self
    }

    pub fn locals(mut self, count: usize) -> Self {
        self.local_count = count;
        self
    }

    pub fn kernel(mut self) -> Self {
        self.kernel = true;
        self
    }

    /// Append an instruction with an explicit operand.
    pub fn raw(mut self, opcode: Opcode, operand: Operand) -> Self {
        let offset = self.body.len() as u32;
        self.body.push(Instruction::new(offset, opcode, operand));
        self
    }

    /// Append an operand-less instruction.
    pub fn op(self, opcode: Opcode) -> Self {
        self.raw(opcode, Operand::None)
    }

    pub fn push_i32(self, value: i64) -> Self {
        self.raw(Opcode::LdcI4, Operand::Int(value))
    }

    pub fn push_i64(self, value: i64) -> Self {
        self.raw(Opcode::LdcI8, Operand::Int(value))
    }

    pub fn push_f32(self, value: f64) -> Self {
        self.raw(Opcode::LdcR4, Operand::Float(value))
    }

    pub fn push_f64(self, value: f64) -> Self {
        self.raw(Opcode::LdcR8, Operand::Float(value))
    }

    pub fn ldloc(self, index: i64) -> Self {
        self.raw(Opcode::Ldloc, Operand::Int(index))
    }

    pub fn stloc(self, index: i64) -> Self {
        self.raw(Opcode::Stloc, Operand::Int(index))
    }

    pub fn ldarg(self, index: i64) -> Self {
        self.raw(Opcode::Ldarg, Operand::Int(index))
    }

    pub fn starg(self, index: i64) -> Self {
        self.raw(Opcode::Starg, Operand::Int(index))
    }

    /// Append a branch to the instruction at absolute index `target`.
    pub fn branch(self, opcode: Opcode, target: i64) -> Self {
        let next = self.body.len() as i64 + 1;
        self.raw(opcode, Operand::Target((target - next) as i32))
    }

    pub fn call(self, callee: MethodId) -> Self {
        self.raw(Opcode::Call, Operand::Method(callee))
    }

    pub fn ret(self) -> Self {
        self.op(Opcode::Ret)
    }

    pub fn build(self) -> Method {
        let mut method = Method::new(self.name, self.params, self.ret);
        method.local_count = self.local_count;
        method.kernel = self.kernel;
        method.body = self.body;
        method
    }
}

/// Accumulates methods into a [`Program`].
#[derive(Default)]
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        ProgramBuilder { program: Program::new() }
    }

    pub fn method(&mut self, method: Method) -> MethodId {
        self.program.add_method(method)
    }

    pub fn build(self) -> Program {
        self.program
    }
}

/// Builtin method reading the x thread index.
pub fn thread_idx_x() -> Method {
    intrinsics::special_register_method("thread_idx_x", intrinsics::THREAD_IDX_X)
}

/// Builtin method reading the x block index.
pub fn block_idx_x() -> Method {
    intrinsics::special_register_method("block_idx_x", intrinsics::BLOCK_IDX_X)
}

/// Builtin method reading the x block dimension.
pub fn thread_dim_x() -> Method {
    intrinsics::special_register_method("thread_dim_x", intrinsics::THREAD_DIM_X)
}

/// Builtin method for the block-level barrier.
pub fn barrier() -> Method {
    intrinsics::barrier_method("barrier")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_displacement_is_relative_to_next() {
        let method = MethodBuilder::new("m")
            .op(Opcode::Nop) // 0
            .branch(Opcode::Br, 0) // 1: back to 0
            .ret() // 2
            .build();
        assert_eq!(method.body[1].operand, Operand::Target(-2));
    }

    #[test]
    fn test_forward_branch_displacement() {
        let method = MethodBuilder::new("m")
            .push_i32(1) // 0
            .branch(Opcode::Brtrue, 3) // 1: forward to 3
            .op(Opcode::Nop) // 2
            .ret() // 3
            .build();
        assert_eq!(method.body[1].operand, Operand::Target(1));
    }
}
