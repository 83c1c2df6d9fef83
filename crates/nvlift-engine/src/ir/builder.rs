//! Positioned instruction emission.
//!
//! `InstBuilder` wraps one function and one open block, allocating typed
//! values and appending instructions. It does not track block lifetime;
//! the translation frame owns the consumable cursor and only constructs a
//! builder for a block it knows to be open.

use super::instr::{
    BlockId, FloatPredicate, FuncId, Function, Inst, IntPredicate, Terminator, ValueId,
};
use super::types::IrType;

/// Builder positioned at the end of one block.
pub struct InstBuilder<'a> {
    func: &'a mut Function,
    block: BlockId,
}

impl<'a> InstBuilder<'a> {
    pub fn new(func: &'a mut Function, block: BlockId) -> Self {
        InstBuilder { func, block }
    }

    pub fn block(&self) -> BlockId {
        self.block
    }

    /// Allocate a fresh value of the given type.
    pub fn alloc(&mut self, ty: IrType) -> ValueId {
        self.func.alloc_value(ty)
    }

    /// Append an instruction to the current block.
    pub fn push(&mut self, inst: Inst) {
        self.func.block_mut(self.block).instrs.push(inst);
    }

    pub fn const_int(&mut self, ty: IrType, value: i64) -> ValueId {
        let dest = self.alloc(ty.clone());
        self.push(Inst::ConstInt { dest, ty, value });
        dest
    }

    pub fn const_float(&mut self, ty: IrType, value: f64) -> ValueId {
        let dest = self.alloc(ty.clone());
        self.push(Inst::ConstFloat { dest, ty, value });
        dest
    }

    pub fn icmp(&mut self, pred: IntPredicate, lhs: ValueId, rhs: ValueId) -> ValueId {
        let dest = self.alloc(IrType::bool());
        self.push(Inst::ICmp { dest, pred, lhs, rhs });
        dest
    }

    pub fn fcmp(&mut self, pred: FloatPredicate, lhs: ValueId, rhs: ValueId) -> ValueId {
        let dest = self.alloc(IrType::bool());
        self.push(Inst::FCmp { dest, pred, lhs, rhs });
        dest
    }

    pub fn zext(&mut self, value: ValueId, ty: IrType) -> ValueId {
        let dest = self.alloc(ty.clone());
        self.push(Inst::ZExt { dest, value, ty });
        dest
    }

    /// Allocate a stack slot holding one value of `ty`.
    pub fn alloca(&mut self, ty: IrType) -> ValueId {
        let dest = self.alloc(IrType::stack_ptr(ty.clone()));
        self.push(Inst::Alloca { dest, ty });
        dest
    }

    /// Load through a pointer; the result takes the pointee type.
    pub fn load(&mut self, ptr: ValueId) -> ValueId {
        let ty = self.func.value_type(ptr).pointee().cloned().unwrap_or(IrType::Void);
        let dest = self.alloc(ty);
        self.push(Inst::Load { dest, ptr });
        dest
    }

    pub fn store(&mut self, value: ValueId, ptr: ValueId) {
        self.push(Inst::Store { ptr, value });
    }

    /// Address of the `index`-th element behind `base`; keeps the base's
    /// pointer type (and address space).
    pub fn element_ptr(&mut self, base: ValueId, index: ValueId) -> ValueId {
        let ty = self.func.value_type(base).clone();
        let dest = self.alloc(ty);
        self.push(Inst::ElementPtr { dest, base, index });
        dest
    }

    /// Emit a call. Returns the result value unless `ret` is void.
    pub fn call(&mut self, callee: FuncId, ret: &IrType, args: Vec<ValueId>) -> Option<ValueId> {
        if ret.is_void() {
            self.push(Inst::Call { dest: None, callee, args });
            None
        } else {
            let dest = self.alloc(ret.clone());
            self.push(Inst::Call { dest: Some(dest), callee, args });
            Some(dest)
        }
    }

    pub fn br(&mut self, target: BlockId) {
        self.func.block_mut(self.block).terminator = Terminator::Br(target);
    }

    pub fn cond_br(&mut self, cond: ValueId, then_dest: BlockId, else_dest: BlockId) {
        self.func.block_mut(self.block).terminator =
            Terminator::CondBr { cond, then_dest, else_dest };
    }

    pub fn ret(&mut self, value: Option<ValueId>) {
        self.func.block_mut(self.block).terminator = Terminator::Ret(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_const_and_compare() {
        let mut func = Function::new(FuncId(0), "f", vec![], IrType::i32());
        let entry = func.entry;
        let mut b = InstBuilder::new(&mut func, entry);
        let three = b.const_int(IrType::i32(), 3);
        let five = b.const_int(IrType::i32(), 5);
        let cmp = b.icmp(IntPredicate::Slt, three, five);
        b.ret(Some(cmp));

        assert_eq!(func.block(entry).instrs.len(), 3);
        assert!(func.value_type(cmp).is_bool());
        assert!(matches!(func.block(entry).terminator, Terminator::Ret(Some(_))));
    }

    #[test]
    fn test_slot_roundtrip_types() {
        let mut func = Function::new(FuncId(0), "f", vec![IrType::i64()], IrType::Void);
        let entry = func.entry;
        let param = func.param(0);
        let mut b = InstBuilder::new(&mut func, entry);
        let slot = b.alloca(IrType::i64());
        b.store(param, slot);
        let loaded = b.load(slot);
        assert_eq!(func.value_type(slot), &IrType::stack_ptr(IrType::i64()));
        assert_eq!(func.value_type(loaded), &IrType::i64());
    }

    #[test]
    fn test_element_ptr_keeps_address_space() {
        let arr_ty = IrType::global_ptr(IrType::f32());
        let mut func = Function::new(FuncId(0), "f", vec![arr_ty.clone(), IrType::i32()], IrType::Void);
        let entry = func.entry;
        let arr = func.param(0);
        let idx = func.param(1);
        let mut b = InstBuilder::new(&mut func, entry);
        let addr = b.element_ptr(arr, idx);
        assert_eq!(func.value_type(addr), &arr_ty);
    }

    #[test]
    fn test_void_call_produces_no_value() {
        let mut func = Function::new(FuncId(0), "f", vec![], IrType::Void);
        let entry = func.entry;
        let mut b = InstBuilder::new(&mut func, entry);
        assert!(b.call(FuncId(1), &IrType::Void, vec![]).is_none());
        assert!(b.call(FuncId(2), &IrType::i32(), vec![]).is_some());
    }
}
