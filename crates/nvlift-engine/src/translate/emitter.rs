//! Stack-to-IR emission.
//!
//! The translator walks a block-split instruction stream in order,
//! simulating the operand stack with abstract values and dispatching each
//! opcode to a handler that emits IR. Locals and arguments live in lazily
//! materialized stack slots; calls resolve through a per-module memo so
//! each callee is translated exactly once, and builtin-tagged callees
//! become shared intrinsic declarations.

use once_cell::sync::Lazy;
use rustc_hash::{FxHashMap, FxHashSet};

use super::typemap::{map_type, map_types};
use super::TranslateError;
use crate::analysis::find_branch_targets;
use crate::bytecode::{Instruction, MethodId, Opcode, Operand, Program};
use crate::ir::{
    BlockId, FloatPredicate, FuncId, Inst, InstBuilder, IntPredicate, IrType, Module, ValueId,
};

/// Whether the dispatch table covers an opcode.
pub fn is_supported(opcode: Opcode) -> bool {
    !matches!(
        opcode,
        Opcode::Ldstr
            | Opcode::Newobj
            | Opcode::Callvirt
            | Opcode::Ldfld
            | Opcode::Stfld
            | Opcode::Ldsfld
            | Opcode::Stsfld
            | Opcode::Newarr
            | Opcode::Ldlen
            | Opcode::Box
            | Opcode::Unbox
            | Opcode::Throw
            | Opcode::Leave
            | Opcode::Endfinally
            | Opcode::Switch
            | Opcode::Castclass
            | Opcode::Isinst
            | Opcode::Ldftn
            | Opcode::Localloc
            | Opcode::Sizeof
    )
}

static UNSUPPORTED: Lazy<Vec<Opcode>> =
    Lazy::new(|| Opcode::ALL.iter().copied().filter(|op| !is_supported(*op)).collect());

/// The opcodes the dispatch table does not cover, for pre-validating a
/// method before attempting translation.
pub fn unsupported_opcodes() -> &'static [Opcode] {
    &UNSUPPORTED
}

/// Per-method translation state: the abstract operand stack, lazily
/// materialized local/argument slots, and the emission cursor. The cursor
/// is consumed by terminator emission; emitting afterwards (without first
/// entering a new block) is a fatal error.
struct Frame {
    func: FuncId,
    cursor: Option<BlockId>,
    stack: Vec<ValueId>,
    locals: Vec<Option<ValueId>>,
    args: Vec<Option<ValueId>>,
}

impl Frame {
    fn new(func: FuncId, entry: BlockId, param_count: usize, local_count: usize) -> Self {
        Frame {
            func,
            cursor: Some(entry),
            stack: Vec::new(),
            locals: vec![None; local_count],
            args: vec![None; param_count],
        }
    }

    fn pop(&mut self, offset: u32) -> Result<ValueId, TranslateError> {
        self.stack.pop().ok_or(TranslateError::StackUnderflow { offset })
    }

    fn block(&self, offset: u32) -> Result<BlockId, TranslateError> {
        self.cursor.ok_or(TranslateError::BlockClosed { offset })
    }
}

/// Translates methods of one program into one module.
pub struct Translator<'a> {
    program: &'a Program,
    module: &'a mut Module,
    /// Methods already translated (or declared), by identity
    translated: FxHashMap<MethodId, FuncId>,
    /// Methods whose translation is on the call stack right now
    in_progress: FxHashSet<MethodId>,
}

impl<'a> Translator<'a> {
    pub fn new(program: &'a Program, module: &'a mut Module) -> Self {
        Translator {
            program,
            module,
            translated: FxHashMap::default(),
            in_progress: FxHashSet::default(),
        }
    }

    /// Translate a method into the module, returning its function.
    ///
    /// Builtin-tagged methods resolve to a declaration named by their
    /// intrinsic identifier, reused if already present. Ordinary methods
    /// are translated at most once; later requests return the memoized
    /// function.
    pub fn emit_method(&mut self, id: MethodId) -> Result<FuncId, TranslateError> {
        if let Some(&func) = self.translated.get(&id) {
            return Ok(func);
        }
        let method = self.program.method(id);
        let params = map_types(&method.params)?;
        let ret = map_type(&method.ret)?;

        if let Some(intrinsic) = method.intrinsic_name() {
            let func = self.module.declare_function(intrinsic, params, ret);
            self.translated.insert(id, func);
            return Ok(func);
        }

        if !self.in_progress.insert(id) {
            return Err(TranslateError::RecursiveCall { method: method.name.clone() });
        }

        let func = self.module.create_function(method.name.clone(), params, ret);
        let mut body = method.body.clone();
        find_branch_targets(&mut body, self.module.function_mut(func))?;

        let entry = self.module.function(func).entry;
        let mut frame = Frame::new(func, entry, method.params.len(), method.local_count);
        for instr in &body {
            self.emit_instruction(&mut frame, instr)?;
        }

        self.in_progress.remove(&id);
        self.translated.insert(id, func);
        Ok(func)
    }

    fn emit_instruction(
        &mut self,
        frame: &mut Frame,
        instr: &Instruction,
    ) -> Result<(), TranslateError> {
        let offset = instr.offset;
        match instr.opcode {
            Opcode::Nop => {
                if let Operand::Block(target) = instr.operand {
                    self.switch_block(frame, target);
                }
                Ok(())
            }
            Opcode::Pop => {
                frame.pop(offset)?;
                Ok(())
            }
            Opcode::Dup => {
                let top = frame.pop(offset)?;
                frame.stack.push(top);
                frame.stack.push(top);
                Ok(())
            }

            Opcode::LdcI4 => {
                if let Operand::Int(value) = instr.operand {
                    self.emit_const_int(frame, offset, IrType::i32(), value)?;
                }
                Ok(())
            }
            Opcode::LdcI8 => {
                if let Operand::Int(value) = instr.operand {
                    self.emit_const_int(frame, offset, IrType::i64(), value)?;
                }
                Ok(())
            }
            Opcode::LdcR4 => {
                if let Operand::Float(value) = instr.operand {
                    self.emit_const_float(frame, offset, IrType::f32(), value)?;
                }
                Ok(())
            }
            Opcode::LdcR8 => {
                if let Operand::Float(value) = instr.operand {
                    self.emit_const_float(frame, offset, IrType::f64(), value)?;
                }
                Ok(())
            }

            Opcode::Ldloc => {
                if let Operand::Int(index) = instr.operand {
                    self.emit_load_var(frame, offset, index as usize, false)?;
                }
                Ok(())
            }
            Opcode::Ldarg => {
                if let Operand::Int(index) = instr.operand {
                    self.emit_load_var(frame, offset, index as usize, true)?;
                }
                Ok(())
            }
            Opcode::Stloc => {
                if let Operand::Int(index) = instr.operand {
                    self.emit_store_var(frame, offset, index as usize, false)?;
                }
                Ok(())
            }
            Opcode::Starg => {
                if let Operand::Int(index) = instr.operand {
                    self.emit_store_var(frame, offset, index as usize, true)?;
                }
                Ok(())
            }

            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::DivUn
            | Opcode::Rem
            | Opcode::RemUn
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor
            | Opcode::Shl
            | Opcode::Shr
            | Opcode::ShrUn => self.emit_binary(frame, offset, instr.opcode),

            Opcode::Neg | Opcode::Not => self.emit_unary(frame, offset, instr.opcode),

            Opcode::Ceq => self.emit_ceq(frame, offset),
            Opcode::Cgt => self.emit_compare(frame, offset, IntPredicate::Sgt, FloatPredicate::Ogt),
            Opcode::CgtUn => {
                self.emit_compare(frame, offset, IntPredicate::Ugt, FloatPredicate::Ogt)
            }
            Opcode::Clt => self.emit_compare(frame, offset, IntPredicate::Slt, FloatPredicate::Olt),
            Opcode::CltUn => {
                self.emit_compare(frame, offset, IntPredicate::Ult, FloatPredicate::Olt)
            }

            Opcode::ConvI1 => self.emit_convert(frame, offset, IrType::i8(), true),
            Opcode::ConvI2 => self.emit_convert(frame, offset, IrType::i16(), true),
            Opcode::ConvI4 => self.emit_convert(frame, offset, IrType::i32(), true),
            Opcode::ConvI8 => self.emit_convert(frame, offset, IrType::i64(), true),
            Opcode::ConvU1 => self.emit_convert(frame, offset, IrType::i8(), false),
            Opcode::ConvU2 => self.emit_convert(frame, offset, IrType::i16(), false),
            Opcode::ConvU4 => self.emit_convert(frame, offset, IrType::i32(), false),
            Opcode::ConvU8 => self.emit_convert(frame, offset, IrType::i64(), false),
            Opcode::ConvR4 => self.emit_convert(frame, offset, IrType::f32(), true),
            Opcode::ConvR8 => self.emit_convert(frame, offset, IrType::f64(), true),

            Opcode::Ldelem => self.emit_load_elem(frame, offset),
            Opcode::Stelem => self.emit_store_elem(frame, offset),
            Opcode::Ldind => {
                let ptr = frame.pop(offset)?;
                let block = frame.block(offset)?;
                let mut b = InstBuilder::new(self.module.function_mut(frame.func), block);
                let value = b.load(ptr);
                frame.stack.push(value);
                Ok(())
            }
            Opcode::Stind => {
                let value = frame.pop(offset)?;
                let ptr = frame.pop(offset)?;
                let block = frame.block(offset)?;
                let mut b = InstBuilder::new(self.module.function_mut(frame.func), block);
                b.store(value, ptr);
                Ok(())
            }

            Opcode::Br => self.emit_br(frame, instr),
            Opcode::Brtrue => self.emit_cond_branch(frame, instr, true),
            Opcode::Brfalse => self.emit_cond_branch(frame, instr, false),
            Opcode::Beq => {
                self.emit_ceq(frame, offset)?;
                self.emit_cond_branch(frame, instr, true)
            }
            Opcode::BneUn => {
                self.emit_ceq(frame, offset)?;
                self.emit_cond_branch(frame, instr, false)
            }
            Opcode::Blt => {
                self.emit_compare(frame, offset, IntPredicate::Slt, FloatPredicate::Olt)?;
                self.emit_cond_branch(frame, instr, true)
            }
            Opcode::BltUn => {
                self.emit_compare(frame, offset, IntPredicate::Ult, FloatPredicate::Olt)?;
                self.emit_cond_branch(frame, instr, true)
            }
            Opcode::Ble => {
                self.emit_compare(frame, offset, IntPredicate::Sle, FloatPredicate::Ole)?;
                self.emit_cond_branch(frame, instr, true)
            }
            Opcode::BleUn => {
                self.emit_compare(frame, offset, IntPredicate::Ule, FloatPredicate::Ole)?;
                self.emit_cond_branch(frame, instr, true)
            }
            Opcode::Bgt => {
                self.emit_compare(frame, offset, IntPredicate::Sgt, FloatPredicate::Ogt)?;
                self.emit_cond_branch(frame, instr, true)
            }
            Opcode::BgtUn => {
                self.emit_compare(frame, offset, IntPredicate::Ugt, FloatPredicate::Ogt)?;
                self.emit_cond_branch(frame, instr, true)
            }
            Opcode::Bge => {
                self.emit_compare(frame, offset, IntPredicate::Sge, FloatPredicate::Oge)?;
                self.emit_cond_branch(frame, instr, true)
            }
            Opcode::BgeUn => {
                self.emit_compare(frame, offset, IntPredicate::Uge, FloatPredicate::Oge)?;
                self.emit_cond_branch(frame, instr, true)
            }

            Opcode::Call | Opcode::Tailcall => self.emit_call(frame, instr),
            Opcode::Ret => self.emit_ret(frame, offset),

            opcode @ (Opcode::Ldstr
            | Opcode::Newobj
            | Opcode::Callvirt
            | Opcode::Ldfld
            | Opcode::Stfld
            | Opcode::Ldsfld
            | Opcode::Stsfld
            | Opcode::Newarr
            | Opcode::Ldlen
            | Opcode::Box
            | Opcode::Unbox
            | Opcode::Throw
            | Opcode::Leave
            | Opcode::Endfinally
            | Opcode::Switch
            | Opcode::Castclass
            | Opcode::Isinst
            | Opcode::Ldftn
            | Opcode::Localloc
            | Opcode::Sizeof) => Err(TranslateError::UnsupportedInstruction { opcode, offset }),
        }
    }

    /// Enter `target`: an open block falls through into it with an
    /// explicit jump; a closed one just repositions the cursor.
    fn switch_block(&mut self, frame: &mut Frame, target: BlockId) {
        if let Some(block) = frame.cursor {
            let mut b = InstBuilder::new(self.module.function_mut(frame.func), block);
            b.br(target);
        }
        frame.cursor = Some(target);
    }

    fn emit_const_int(
        &mut self,
        frame: &mut Frame,
        offset: u32,
        ty: IrType,
        value: i64,
    ) -> Result<(), TranslateError> {
        let block = frame.block(offset)?;
        let mut b = InstBuilder::new(self.module.function_mut(frame.func), block);
        let dest = b.const_int(ty, value);
        frame.stack.push(dest);
        Ok(())
    }

    fn emit_const_float(
        &mut self,
        frame: &mut Frame,
        offset: u32,
        ty: IrType,
        value: f64,
    ) -> Result<(), TranslateError> {
        let block = frame.block(offset)?;
        let mut b = InstBuilder::new(self.module.function_mut(frame.func), block);
        let dest = b.const_float(ty, value);
        frame.stack.push(dest);
        Ok(())
    }

    fn emit_binary(
        &mut self,
        frame: &mut Frame,
        offset: u32,
        opcode: Opcode,
    ) -> Result<(), TranslateError> {
        let rhs = frame.pop(offset)?;
        let lhs = frame.pop(offset)?;
        let block = frame.block(offset)?;
        let func = self.module.function_mut(frame.func);
        let result_ty = func.value_type(lhs).clone();
        let float = result_ty.is_float() || func.value_type(rhs).is_float();
        let mut b = InstBuilder::new(func, block);
        let dest = b.alloc(result_ty);
        let inst = match (opcode, float) {
            (Opcode::Add, false) => Inst::Add { dest, lhs, rhs },
            (Opcode::Add, true) => Inst::FAdd { dest, lhs, rhs },
            (Opcode::Sub, false) => Inst::Sub { dest, lhs, rhs },
            (Opcode::Sub, true) => Inst::FSub { dest, lhs, rhs },
            (Opcode::Mul, false) => Inst::Mul { dest, lhs, rhs },
            (Opcode::Mul, true) => Inst::FMul { dest, lhs, rhs },
            (Opcode::Div, false) => Inst::SDiv { dest, lhs, rhs },
            (Opcode::Div, true) => Inst::FDiv { dest, lhs, rhs },
            (Opcode::DivUn, _) => Inst::UDiv { dest, lhs, rhs },
            (Opcode::Rem, false) => Inst::SRem { dest, lhs, rhs },
            (Opcode::Rem, true) => Inst::FRem { dest, lhs, rhs },
            (Opcode::RemUn, _) => Inst::URem { dest, lhs, rhs },
            (Opcode::And, _) => Inst::And { dest, lhs, rhs },
            (Opcode::Or, _) => Inst::Or { dest, lhs, rhs },
            (Opcode::Xor, _) => Inst::Xor { dest, lhs, rhs },
            (Opcode::Shl, _) => Inst::Shl { dest, lhs, rhs },
            (Opcode::Shr, _) => Inst::AShr { dest, lhs, rhs },
            (Opcode::ShrUn, _) => Inst::LShr { dest, lhs, rhs },
            _ => unreachable!("not a binary opcode: {:?}", opcode),
        };
        b.push(inst);
        frame.stack.push(dest);
        Ok(())
    }

    fn emit_unary(
        &mut self,
        frame: &mut Frame,
        offset: u32,
        opcode: Opcode,
    ) -> Result<(), TranslateError> {
        let value = frame.pop(offset)?;
        let block = frame.block(offset)?;
        let func = self.module.function_mut(frame.func);
        let ty = func.value_type(value).clone();
        let float = ty.is_float();
        let mut b = InstBuilder::new(func, block);
        let dest = b.alloc(ty);
        let inst = match (opcode, float) {
            (Opcode::Neg, false) => Inst::Neg { dest, value },
            (Opcode::Neg, true) => Inst::FNeg { dest, value },
            (Opcode::Not, _) => Inst::Not { dest, value },
            _ => unreachable!("not a unary opcode: {:?}", opcode),
        };
        b.push(inst);
        frame.stack.push(dest);
        Ok(())
    }

    /// Pop a comparison operand; i1 values are widened to i32 first
    /// because the backend rejects narrow types in this position.
    fn pop_no_bool(&mut self, frame: &mut Frame, offset: u32) -> Result<ValueId, TranslateError> {
        let value = frame.pop(offset)?;
        if !self.module.function(frame.func).value_type(value).is_bool() {
            return Ok(value);
        }
        let block = frame.block(offset)?;
        let mut b = InstBuilder::new(self.module.function_mut(frame.func), block);
        Ok(b.zext(value, IrType::i32()))
    }

    fn emit_ceq(&mut self, frame: &mut Frame, offset: u32) -> Result<(), TranslateError> {
        let rhs = self.pop_no_bool(frame, offset)?;
        let lhs = self.pop_no_bool(frame, offset)?;
        self.emit_cmp(frame, offset, lhs, rhs, IntPredicate::Eq, FloatPredicate::Oeq)
    }

    fn emit_compare(
        &mut self,
        frame: &mut Frame,
        offset: u32,
        ipred: IntPredicate,
        fpred: FloatPredicate,
    ) -> Result<(), TranslateError> {
        let rhs = frame.pop(offset)?;
        let lhs = frame.pop(offset)?;
        self.emit_cmp(frame, offset, lhs, rhs, ipred, fpred)
    }

    fn emit_cmp(
        &mut self,
        frame: &mut Frame,
        offset: u32,
        lhs: ValueId,
        rhs: ValueId,
        ipred: IntPredicate,
        fpred: FloatPredicate,
    ) -> Result<(), TranslateError> {
        let block = frame.block(offset)?;
        let func = self.module.function_mut(frame.func);
        let float = func.value_type(lhs).is_float() || func.value_type(rhs).is_float();
        let mut b = InstBuilder::new(func, block);
        let dest = if float { b.fcmp(fpred, lhs, rhs) } else { b.icmp(ipred, lhs, rhs) };
        frame.stack.push(dest);
        Ok(())
    }

    fn emit_load_var(
        &mut self,
        frame: &mut Frame,
        offset: u32,
        index: usize,
        is_param: bool,
    ) -> Result<(), TranslateError> {
        let existing = if is_param { frame.args[index] } else { frame.locals[index] };
        if let Some(slot) = existing {
            let block = frame.block(offset)?;
            let mut b = InstBuilder::new(self.module.function_mut(frame.func), block);
            let value = b.load(slot);
            frame.stack.push(value);
            return Ok(());
        }
        if !is_param {
            return Err(TranslateError::UninitializedVariable { index, offset });
        }
        // First use of an argument: materialize a slot so a later store
        // has a home, but push the incoming value itself.
        let block = frame.block(offset)?;
        let func = self.module.function_mut(frame.func);
        let param = func.param(index);
        let ty = func.value_type(param).clone();
        let mut b = InstBuilder::new(func, block);
        let slot = b.alloca(ty);
        b.store(param, slot);
        frame.args[index] = Some(slot);
        frame.stack.push(param);
        Ok(())
    }

    fn emit_store_var(
        &mut self,
        frame: &mut Frame,
        offset: u32,
        index: usize,
        is_param: bool,
    ) -> Result<(), TranslateError> {
        let value = frame.pop(offset)?;
        let block = frame.block(offset)?;
        let existing = if is_param { frame.args[index] } else { frame.locals[index] };
        let slot = match existing {
            Some(slot) => slot,
            None => {
                // First store sizes the slot to the stored value's type
                let func = self.module.function_mut(frame.func);
                let ty = func.value_type(value).clone();
                let mut b = InstBuilder::new(func, block);
                let slot = b.alloca(ty);
                if is_param {
                    frame.args[index] = Some(slot);
                } else {
                    frame.locals[index] = Some(slot);
                }
                slot
            }
        };
        let mut b = InstBuilder::new(self.module.function_mut(frame.func), block);
        b.store(value, slot);
        Ok(())
    }

    fn emit_load_elem(&mut self, frame: &mut Frame, offset: u32) -> Result<(), TranslateError> {
        let index = frame.pop(offset)?;
        let array = frame.pop(offset)?;
        let block = frame.block(offset)?;
        let mut b = InstBuilder::new(self.module.function_mut(frame.func), block);
        let addr = b.element_ptr(array, index);
        let value = b.load(addr);
        frame.stack.push(value);
        Ok(())
    }

    fn emit_store_elem(&mut self, frame: &mut Frame, offset: u32) -> Result<(), TranslateError> {
        let value = frame.pop(offset)?;
        let index = frame.pop(offset)?;
        let array = frame.pop(offset)?;
        let block = frame.block(offset)?;
        let mut b = InstBuilder::new(self.module.function_mut(frame.func), block);
        let addr = b.element_ptr(array, index);
        b.store(value, addr);
        Ok(())
    }

    fn emit_convert(
        &mut self,
        frame: &mut Frame,
        offset: u32,
        target: IrType,
        signed: bool,
    ) -> Result<(), TranslateError> {
        let value = frame.pop(offset)?;
        let src = self.module.function(frame.func).value_type(value).clone();
        // Pointers pass through untouched; identical types need no cast
        if src == target || !(src.is_int() || src.is_float()) {
            frame.stack.push(value);
            return Ok(());
        }
        enum Cast {
            Trunc,
            SExt,
            ZExt,
            SiToFp,
            UiToFp,
            FpToSi,
            FpToUi,
            FpExt,
            FpTrunc,
        }
        let cast = match (&src, &target) {
            (IrType::Int(s), IrType::Int(d)) if d < s => Cast::Trunc,
            (IrType::Int(_), IrType::Int(_)) if signed => Cast::SExt,
            (IrType::Int(_), IrType::Int(_)) => Cast::ZExt,
            (IrType::Int(_), IrType::Float(_)) if signed => Cast::SiToFp,
            (IrType::Int(_), IrType::Float(_)) => Cast::UiToFp,
            (IrType::Float(_), IrType::Int(_)) if signed => Cast::FpToSi,
            (IrType::Float(_), IrType::Int(_)) => Cast::FpToUi,
            (IrType::Float(s), IrType::Float(d)) if d > s => Cast::FpExt,
            (IrType::Float(_), IrType::Float(_)) => Cast::FpTrunc,
            _ => unreachable!("non-numeric conversion operands are filtered above"),
        };
        let block = frame.block(offset)?;
        let mut b = InstBuilder::new(self.module.function_mut(frame.func), block);
        let dest = b.alloc(target.clone());
        let ty = target;
        let inst = match cast {
            Cast::Trunc => Inst::Trunc { dest, value, ty },
            Cast::SExt => Inst::SExt { dest, value, ty },
            Cast::ZExt => Inst::ZExt { dest, value, ty },
            Cast::SiToFp => Inst::SiToFp { dest, value, ty },
            Cast::UiToFp => Inst::UiToFp { dest, value, ty },
            Cast::FpToSi => Inst::FpToSi { dest, value, ty },
            Cast::FpToUi => Inst::FpToUi { dest, value, ty },
            Cast::FpExt => Inst::FpExt { dest, value, ty },
            Cast::FpTrunc => Inst::FpTrunc { dest, value, ty },
        };
        b.push(inst);
        frame.stack.push(dest);
        Ok(())
    }

    fn emit_br(&mut self, frame: &mut Frame, instr: &Instruction) -> Result<(), TranslateError> {
        let target = match instr.operand {
            Operand::Block(target) => target,
            _ => unreachable!("branch operands are rewritten during CFG construction"),
        };
        let block = frame.block(instr.offset)?;
        let mut b = InstBuilder::new(self.module.function_mut(frame.func), block);
        b.br(target);
        frame.cursor = None;
        Ok(())
    }

    fn emit_cond_branch(
        &mut self,
        frame: &mut Frame,
        instr: &Instruction,
        branch_if_true: bool,
    ) -> Result<(), TranslateError> {
        let (cont, target) = match instr.operand {
            Operand::Branch { cont, target } => (cont, target),
            _ => unreachable!("branch operands are rewritten during CFG construction"),
        };
        let cond = frame.pop(instr.offset)?;
        let block = frame.block(instr.offset)?;
        let (then_dest, else_dest) = if branch_if_true { (target, cont) } else { (cont, target) };
        let mut b = InstBuilder::new(self.module.function_mut(frame.func), block);
        b.cond_br(cond, then_dest, else_dest);
        frame.cursor = Some(cont);
        Ok(())
    }

    fn emit_call(&mut self, frame: &mut Frame, instr: &Instruction) -> Result<(), TranslateError> {
        let callee_id = match instr.operand {
            Operand::Method(id) => id,
            _ => unreachable!("call instructions carry a method reference"),
        };
        let callee = self.program.method(callee_id);
        let ret = map_type(&callee.ret)?;
        // The stack's top is the last argument; pass left to right
        let mut args = Vec::with_capacity(callee.params.len());
        for _ in 0..callee.params.len() {
            args.push(frame.pop(instr.offset)?);
        }
        args.reverse();
        let func = self.emit_method(callee_id)?;
        let block = frame.block(instr.offset)?;
        let mut b = InstBuilder::new(self.module.function_mut(frame.func), block);
        if let Some(result) = b.call(func, &ret, args) {
            frame.stack.push(result);
        }
        Ok(())
    }

    fn emit_ret(&mut self, frame: &mut Frame, offset: u32) -> Result<(), TranslateError> {
        let value = if frame.stack.is_empty() { None } else { Some(frame.pop(offset)?) };
        let block = frame.block(offset)?;
        let mut b = InstBuilder::new(self.module.function_mut(frame.func), block);
        b.ret(value);
        frame.cursor = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{Method, SourceType};
    use crate::ir::Terminator;

    fn body(ops: &[(Opcode, Operand)]) -> Vec<Instruction> {
        ops.iter()
            .enumerate()
            .map(|(i, &(opcode, operand))| Instruction::new(i as u32, opcode, operand))
            .collect()
    }

    fn translate_one(method: Method) -> Result<Module, TranslateError> {
        let mut program = Program::new();
        let id = program.add_method(method);
        let mut module = Module::new("test");
        {
            let mut translator = Translator::new(&program, &mut module);
            translator.emit_method(id)?;
        }
        Ok(module)
    }

    fn method(name: &str, params: Vec<SourceType>, ret: SourceType, ops: &[(Opcode, Operand)]) -> Method {
        let mut m = Method::new(name, params, ret);
        m.body = body(ops);
        m
    }

    #[test]
    fn test_const_return() {
        let module = translate_one(method(
            "forty_two",
            vec![],
            SourceType::I32,
            &[(Opcode::LdcI4, Operand::Int(42)), (Opcode::Ret, Operand::None)],
        ))
        .unwrap();

        let func = module.function(module.get_function("forty_two").unwrap());
        let entry = func.block(func.entry);
        assert!(entry
            .instrs
            .iter()
            .any(|i| matches!(i, Inst::ConstInt { value: 42, .. })));
        assert!(matches!(entry.terminator, Terminator::Ret(Some(_))));
    }

    #[test]
    fn test_add_is_integer_for_integer_operands() {
        let module = translate_one(method(
            "sum",
            vec![],
            SourceType::I32,
            &[
                (Opcode::LdcI4, Operand::Int(3)),
                (Opcode::LdcI4, Operand::Int(5)),
                (Opcode::Add, Operand::None),
                (Opcode::Ret, Operand::None),
            ],
        ))
        .unwrap();

        let func = module.function(module.get_function("sum").unwrap());
        let entry = func.block(func.entry);
        assert!(entry.instrs.iter().any(|i| matches!(i, Inst::Add { .. })));
        assert!(!entry.instrs.iter().any(|i| matches!(i, Inst::FAdd { .. })));
    }

    #[test]
    fn test_add_is_float_for_float_operands() {
        let module = translate_one(method(
            "fsum",
            vec![],
            SourceType::F64,
            &[
                (Opcode::LdcR8, Operand::Float(1.5)),
                (Opcode::LdcR8, Operand::Float(2.5)),
                (Opcode::Add, Operand::None),
                (Opcode::Ret, Operand::None),
            ],
        ))
        .unwrap();

        let func = module.function(module.get_function("fsum").unwrap());
        let entry = func.block(func.entry);
        assert!(entry.instrs.iter().any(|i| matches!(i, Inst::FAdd { .. })));
    }

    #[test]
    fn test_binary_operand_order() {
        // 10 - 4: the second push is the right operand
        let module = translate_one(method(
            "diff",
            vec![],
            SourceType::I32,
            &[
                (Opcode::LdcI4, Operand::Int(10)),
                (Opcode::LdcI4, Operand::Int(4)),
                (Opcode::Sub, Operand::None),
                (Opcode::Ret, Operand::None),
            ],
        ))
        .unwrap();

        let func = module.function(module.get_function("diff").unwrap());
        let entry = func.block(func.entry);
        let ten = entry.instrs[0].dest().unwrap();
        let four = entry.instrs[1].dest().unwrap();
        assert!(entry
            .instrs
            .iter()
            .any(|i| matches!(i, Inst::Sub { lhs, rhs, .. } if *lhs == ten && *rhs == four)));
    }

    #[test]
    fn test_signed_and_unsigned_division_are_distinct() {
        let ops = |div: Opcode| {
            vec![
                (Opcode::LdcI4, Operand::Int(8)),
                (Opcode::LdcI4, Operand::Int(2)),
                (div, Operand::None),
                (Opcode::Ret, Operand::None),
            ]
        };
        let signed = translate_one(method("s", vec![], SourceType::I32, &ops(Opcode::Div))).unwrap();
        let unsigned =
            translate_one(method("u", vec![], SourceType::I32, &ops(Opcode::DivUn))).unwrap();

        let s = signed.function(signed.get_function("s").unwrap());
        let u = unsigned.function(unsigned.get_function("u").unwrap());
        assert!(s.block(s.entry).instrs.iter().any(|i| matches!(i, Inst::SDiv { .. })));
        assert!(u.block(u.entry).instrs.iter().any(|i| matches!(i, Inst::UDiv { .. })));
    }

    #[test]
    fn test_local_store_then_load() {
        let mut m = method(
            "local",
            vec![],
            SourceType::I32,
            &[
                (Opcode::LdcI4, Operand::Int(10)),
                (Opcode::Stloc, Operand::Int(0)),
                (Opcode::Ldloc, Operand::Int(0)),
                (Opcode::Ret, Operand::None),
            ],
        );
        m.local_count = 1;
        let module = translate_one(m).unwrap();

        let func = module.function(module.get_function("local").unwrap());
        let entry = func.block(func.entry);
        assert!(entry.instrs.iter().any(|i| matches!(i, Inst::Alloca { .. })));
        assert!(entry.instrs.iter().any(|i| matches!(i, Inst::Store { .. })));
        assert!(entry.instrs.iter().any(|i| matches!(i, Inst::Load { .. })));
    }

    #[test]
    fn test_load_before_store_is_fatal() {
        let mut m = method(
            "bad",
            vec![],
            SourceType::I32,
            &[(Opcode::Ldloc, Operand::Int(0)), (Opcode::Ret, Operand::None)],
        );
        m.local_count = 1;
        let err = translate_one(m).unwrap_err();
        assert!(matches!(err, TranslateError::UninitializedVariable { index: 0, .. }));
    }

    #[test]
    fn test_first_argument_load_pushes_raw_parameter() {
        let module = translate_one(method(
            "ident",
            vec![SourceType::I32],
            SourceType::I32,
            &[(Opcode::Ldarg, Operand::Int(0)), (Opcode::Ret, Operand::None)],
        ))
        .unwrap();

        let func = module.function(module.get_function("ident").unwrap());
        let entry = func.block(func.entry);
        // A slot is materialized and the incoming value stored into it
        assert!(entry.instrs.iter().any(|i| matches!(i, Inst::Alloca { .. })));
        assert!(entry
            .instrs
            .iter()
            .any(|i| matches!(i, Inst::Store { value, .. } if *value == func.param(0))));
        // The returned value is the parameter itself, not a load
        assert_eq!(entry.terminator, Terminator::Ret(Some(func.param(0))));
    }

    #[test]
    fn test_second_argument_load_reads_through_slot() {
        let module = translate_one(method(
            "twice",
            vec![SourceType::I32],
            SourceType::I32,
            &[
                (Opcode::Ldarg, Operand::Int(0)),
                (Opcode::Pop, Operand::None),
                (Opcode::Ldarg, Operand::Int(0)),
                (Opcode::Ret, Operand::None),
            ],
        ))
        .unwrap();

        let func = module.function(module.get_function("twice").unwrap());
        let entry = func.block(func.entry);
        let loads = entry.instrs.iter().filter(|i| matches!(i, Inst::Load { .. })).count();
        assert_eq!(loads, 1);
        // The second load's result is returned
        assert!(matches!(entry.terminator, Terminator::Ret(Some(v)) if v != func.param(0)));
    }

    #[test]
    fn test_equality_widens_bool_operands() {
        // (1 < 2) == (3 < 4): both compare results are i1 and must be
        // widened before the equality compare
        let module = translate_one(method(
            "beq",
            vec![],
            SourceType::Bool,
            &[
                (Opcode::LdcI4, Operand::Int(1)),
                (Opcode::LdcI4, Operand::Int(2)),
                (Opcode::Clt, Operand::None),
                (Opcode::LdcI4, Operand::Int(3)),
                (Opcode::LdcI4, Operand::Int(4)),
                (Opcode::Clt, Operand::None),
                (Opcode::Ceq, Operand::None),
                (Opcode::Ret, Operand::None),
            ],
        ))
        .unwrap();

        let func = module.function(module.get_function("beq").unwrap());
        let entry = func.block(func.entry);
        let widens = entry
            .instrs
            .iter()
            .filter(|i| matches!(i, Inst::ZExt { ty, .. } if *ty == IrType::i32()))
            .count();
        assert_eq!(widens, 2);
    }

    #[test]
    fn test_conversions() {
        let module = translate_one(method(
            "conv",
            vec![SourceType::I32],
            SourceType::I64,
            &[
                (Opcode::Ldarg, Operand::Int(0)),
                (Opcode::ConvI8, Operand::None),
                (Opcode::Ret, Operand::None),
            ],
        ))
        .unwrap();
        let func = module.function(module.get_function("conv").unwrap());
        let entry = func.block(func.entry);
        assert!(entry
            .instrs
            .iter()
            .any(|i| matches!(i, Inst::SExt { ty, .. } if *ty == IrType::i64())));
    }

    #[test]
    fn test_float_to_int_conversion() {
        let module = translate_one(method(
            "trunc",
            vec![SourceType::F64],
            SourceType::I32,
            &[
                (Opcode::Ldarg, Operand::Int(0)),
                (Opcode::ConvI4, Operand::None),
                (Opcode::Ret, Operand::None),
            ],
        ))
        .unwrap();
        let func = module.function(module.get_function("trunc").unwrap());
        let entry = func.block(func.entry);
        assert!(entry.instrs.iter().any(|i| matches!(i, Inst::FpToSi { .. })));
    }

    #[test]
    fn test_stack_underflow_is_fatal() {
        let err = translate_one(method(
            "under",
            vec![],
            SourceType::I32,
            &[(Opcode::Add, Operand::None), (Opcode::Ret, Operand::None)],
        ))
        .unwrap_err();
        assert!(matches!(err, TranslateError::StackUnderflow { offset: 0 }));
    }

    #[test]
    fn test_emitting_after_return_is_fatal() {
        let err = translate_one(method(
            "after_ret",
            vec![],
            SourceType::Void,
            &[(Opcode::Ret, Operand::None), (Opcode::LdcI4, Operand::Int(1))],
        ))
        .unwrap_err();
        assert!(matches!(err, TranslateError::BlockClosed { offset: 1 }));
    }

    #[test]
    fn test_unsupported_opcode_is_fatal() {
        let err = translate_one(method(
            "boxed",
            vec![],
            SourceType::Void,
            &[(Opcode::Box, Operand::None), (Opcode::Ret, Operand::None)],
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            TranslateError::UnsupportedInstruction { opcode: Opcode::Box, offset: 0 }
        ));
    }

    #[test]
    fn test_unsupported_query_matches_dispatch() {
        for &opcode in unsupported_opcodes() {
            let err = translate_one(method(
                "probe",
                vec![],
                SourceType::Void,
                &[(opcode, Operand::None), (Opcode::Ret, Operand::None)],
            ))
            .unwrap_err();
            assert!(
                matches!(err, TranslateError::UnsupportedInstruction { .. }),
                "{:?} should be rejected by the dispatch table",
                opcode
            );
        }
        assert!(!unsupported_opcodes().contains(&Opcode::Add));
        assert!(!unsupported_opcodes().contains(&Opcode::Call));
        assert!(unsupported_opcodes().contains(&Opcode::Newobj));
    }

    #[test]
    fn test_object_parameter_is_rejected() {
        let err = translate_one(method(
            "managed",
            vec![SourceType::Object("System.Object".into())],
            SourceType::Void,
            &[(Opcode::Ret, Operand::None)],
        ))
        .unwrap_err();
        assert!(matches!(err, TranslateError::UnsupportedType { .. }));
    }

    #[test]
    fn test_array_access() {
        let module = translate_one(method(
            "first",
            vec![SourceType::array(SourceType::I32)],
            SourceType::I32,
            &[
                (Opcode::Ldarg, Operand::Int(0)),
                (Opcode::LdcI4, Operand::Int(0)),
                (Opcode::Ldelem, Operand::None),
                (Opcode::Ret, Operand::None),
            ],
        ))
        .unwrap();

        let func = module.function(module.get_function("first").unwrap());
        let entry = func.block(func.entry);
        assert!(entry.instrs.iter().any(|i| matches!(i, Inst::ElementPtr { .. })));
        // The loaded element takes the array's element type
        let load_dest = entry
            .instrs
            .iter()
            .find_map(|i| match i {
                Inst::Load { dest, ptr } if entry
                    .instrs
                    .iter()
                    .any(|j| matches!(j, Inst::ElementPtr { dest: d, .. } if d == ptr)) =>
                {
                    Some(*dest)
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(func.value_type(load_dest), &IrType::i32());
    }

    #[test]
    fn test_recursive_call_is_fatal() {
        let mut program = Program::new();
        let mut m = Method::new("loops_forever", vec![], SourceType::Void);
        m.body = body(&[(Opcode::Call, Operand::Method(MethodId(0))), (Opcode::Ret, Operand::None)]);
        let id = program.add_method(m);

        let mut module = Module::new("test");
        let mut translator = Translator::new(&program, &mut module);
        let err = translator.emit_method(id).unwrap_err();
        assert!(matches!(err, TranslateError::RecursiveCall { .. }));
        assert!(err.to_string().contains("loops_forever"));
    }
}
