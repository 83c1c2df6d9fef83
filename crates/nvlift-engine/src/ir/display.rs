//! Pretty-printing for the target IR.
//!
//! Produces an LLVM-style textual dump, used for inspection and in tests.
//! Callees print as `@f<id>`; the per-function header line maps ids to
//! names.

use std::fmt;

use super::instr::{Block, FloatPredicate, Function, Inst, IntPredicate, Terminator};
use super::module::Module;

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; module '{}'", self.name)?;
        if !self.target_triple.is_empty() {
            writeln!(f, "target triple = \"{}\"", self.target_triple)?;
        }
        if !self.data_layout.is_empty() {
            writeln!(f, "target datalayout = \"{}\"", self.data_layout)?;
        }
        for func in self.functions() {
            writeln!(f)?;
            write!(f, "{}", func)?;
        }
        if !self.annotations.is_empty() {
            writeln!(f)?;
            for ann in &self.annotations {
                writeln!(f, "!nvvm.annotations = {{ {}, !\"{}\", i32 {} }}", ann.func, ann.name, ann.flag)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = if self.is_declaration { "declare" } else { "define" };
        write!(f, "{} {} @{}(", keyword, self.ret, self.name)?;
        for (i, ty) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", ty)?;
        }
        write!(f, ")")?;
        writeln!(f, " ; {}", self.id)?;
        if self.is_declaration {
            return Ok(());
        }
        writeln!(f, "{{")?;
        for block in &self.blocks {
            write!(f, "{}", block)?;
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.id)?;
        for inst in &self.instrs {
            writeln!(f, "  {}", inst)?;
        }
        writeln!(f, "  {}", self.terminator)
    }
}

impl fmt::Display for IntPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntPredicate::Eq => "eq",
            IntPredicate::Ne => "ne",
            IntPredicate::Slt => "slt",
            IntPredicate::Sle => "sle",
            IntPredicate::Sgt => "sgt",
            IntPredicate::Sge => "sge",
            IntPredicate::Ult => "ult",
            IntPredicate::Ule => "ule",
            IntPredicate::Ugt => "ugt",
            IntPredicate::Uge => "uge",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for FloatPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FloatPredicate::Oeq => "oeq",
            FloatPredicate::One => "one",
            FloatPredicate::Olt => "olt",
            FloatPredicate::Ole => "ole",
            FloatPredicate::Ogt => "ogt",
            FloatPredicate::Oge => "oge",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inst::ConstInt { dest, ty, value } => write!(f, "{} = const {} {}", dest, ty, value),
            Inst::ConstFloat { dest, ty, value } => write!(f, "{} = const {} {}", dest, ty, value),

            Inst::Add { dest, lhs, rhs } => write!(f, "{} = add {}, {}", dest, lhs, rhs),
            Inst::Sub { dest, lhs, rhs } => write!(f, "{} = sub {}, {}", dest, lhs, rhs),
            Inst::Mul { dest, lhs, rhs } => write!(f, "{} = mul {}, {}", dest, lhs, rhs),
            Inst::SDiv { dest, lhs, rhs } => write!(f, "{} = sdiv {}, {}", dest, lhs, rhs),
            Inst::UDiv { dest, lhs, rhs } => write!(f, "{} = udiv {}, {}", dest, lhs, rhs),
            Inst::SRem { dest, lhs, rhs } => write!(f, "{} = srem {}, {}", dest, lhs, rhs),
            Inst::URem { dest, lhs, rhs } => write!(f, "{} = urem {}, {}", dest, lhs, rhs),
            Inst::And { dest, lhs, rhs } => write!(f, "{} = and {}, {}", dest, lhs, rhs),
            Inst::Or { dest, lhs, rhs } => write!(f, "{} = or {}, {}", dest, lhs, rhs),
            Inst::Xor { dest, lhs, rhs } => write!(f, "{} = xor {}, {}", dest, lhs, rhs),
            Inst::Shl { dest, lhs, rhs } => write!(f, "{} = shl {}, {}", dest, lhs, rhs),
            Inst::AShr { dest, lhs, rhs } => write!(f, "{} = ashr {}, {}", dest, lhs, rhs),
            Inst::LShr { dest, lhs, rhs } => write!(f, "{} = lshr {}, {}", dest, lhs, rhs),
            Inst::Neg { dest, value } => write!(f, "{} = neg {}", dest, value),
            Inst::Not { dest, value } => write!(f, "{} = not {}", dest, value),

            Inst::FAdd { dest, lhs, rhs } => write!(f, "{} = fadd {}, {}", dest, lhs, rhs),
            Inst::FSub { dest, lhs, rhs } => write!(f, "{} = fsub {}, {}", dest, lhs, rhs),
            Inst::FMul { dest, lhs, rhs } => write!(f, "{} = fmul {}, {}", dest, lhs, rhs),
            Inst::FDiv { dest, lhs, rhs } => write!(f, "{} = fdiv {}, {}", dest, lhs, rhs),
            Inst::FRem { dest, lhs, rhs } => write!(f, "{} = frem {}, {}", dest, lhs, rhs),
            Inst::FNeg { dest, value } => write!(f, "{} = fneg {}", dest, value),

            Inst::ICmp { dest, pred, lhs, rhs } => {
                write!(f, "{} = icmp {} {}, {}", dest, pred, lhs, rhs)
            }
            Inst::FCmp { dest, pred, lhs, rhs } => {
                write!(f, "{} = fcmp {} {}, {}", dest, pred, lhs, rhs)
            }

            Inst::ZExt { dest, value, ty } => write!(f, "{} = zext {} to {}", dest, value, ty),
            Inst::SExt { dest, value, ty } => write!(f, "{} = sext {} to {}", dest, value, ty),
            Inst::Trunc { dest, value, ty } => write!(f, "{} = trunc {} to {}", dest, value, ty),
            Inst::FpExt { dest, value, ty } => write!(f, "{} = fpext {} to {}", dest, value, ty),
            Inst::FpTrunc { dest, value, ty } => {
                write!(f, "{} = fptrunc {} to {}", dest, value, ty)
            }
            Inst::SiToFp { dest, value, ty } => write!(f, "{} = sitofp {} to {}", dest, value, ty),
            Inst::UiToFp { dest, value, ty } => write!(f, "{} = uitofp {} to {}", dest, value, ty),
            Inst::FpToSi { dest, value, ty } => write!(f, "{} = fptosi {} to {}", dest, value, ty),
            Inst::FpToUi { dest, value, ty } => write!(f, "{} = fptoui {} to {}", dest, value, ty),

            Inst::Alloca { dest, ty } => write!(f, "{} = alloca {}", dest, ty),
            Inst::Load { dest, ptr } => write!(f, "{} = load {}", dest, ptr),
            Inst::Store { ptr, value } => write!(f, "store {}, {}", value, ptr),
            Inst::ElementPtr { dest, base, index } => {
                write!(f, "{} = getelementptr {}, {}", dest, base, index)
            }

            Inst::Call { dest, callee, args } => {
                if let Some(dest) = dest {
                    write!(f, "{} = ", dest)?;
                }
                write!(f, "call {}(", callee)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::None => write!(f, "<no terminator>"),
            Terminator::Br(target) => write!(f, "br label {}", target),
            Terminator::CondBr { cond, then_dest, else_dest } => {
                write!(f, "br {}, label {}, label {}", cond, then_dest, else_dest)
            }
            Terminator::Ret(Some(value)) => write!(f, "ret {}", value),
            Terminator::Ret(None) => write!(f, "ret void"),
        }
    }
}
