//! Control-flow graph construction over a flat instruction stream.
//!
//! One scan over the stream resolves every branch: the absolute target is
//! the offset of the instruction after the branch plus the signed relative
//! operand. The instruction at the target offset gets a synthetic marker
//! (`Nop` carrying the new block's handle) inserted in front of it, unless
//! one is already there; the branch operand is then rewritten from the raw
//! displacement into block handles. Conditional branches also get a fresh
//! fallthrough block, so their operand carries both successors.
//!
//! Markers share the offset of the instruction they precede; everything
//! else stays sorted by offset. Inserting at or before the scan position
//! bumps the scan index so the stream is never revisited out of order.

use crate::bytecode::{FlowControl, Instruction, Opcode, Operand};
use crate::ir::Function;

/// Error during CFG construction.
#[derive(Debug, thiserror::Error)]
pub enum CfgError {
    /// A branch operand resolves to an offset that is not an instruction
    /// start. Never rounded or skipped.
    #[error("branch at offset {offset} targets offset {target}, which is not an instruction start")]
    MalformedBranchTarget { offset: u32, target: i64 },
}

/// Resolve branch targets in `instrs`, splitting the stream into the basic
/// blocks of `func`. The function's entry block is left as block 0; every
/// branch target gets its own block.
pub fn find_branch_targets(
    instrs: &mut Vec<Instruction>,
    func: &mut Function,
) -> Result<(), CfgError> {
    let mut i = 0;
    while i < instrs.len() {
        let conditional = match instrs[i].opcode.flow() {
            FlowControl::Branch => false,
            FlowControl::CondBranch => true,
            _ => {
                i += 1;
                continue;
            }
        };
        let rel = match instrs[i].operand {
            Operand::Target(rel) => i64::from(rel),
            // Already rewritten (defensively skip; a raw stream never
            // carries block operands)
            _ => {
                i += 1;
                continue;
            }
        };

        // Displacements are relative to the next instruction's offset.
        let offset = instrs[i].offset;
        let base = instrs
            .get(i + 1)
            .map(|next| i64::from(next.offset))
            .ok_or(CfgError::MalformedBranchTarget { offset, target: rel })?;
        let target = base + rel;

        let insert = instrs
            .iter()
            .position(|ins| i64::from(ins.offset) == target)
            .ok_or(CfgError::MalformedBranchTarget { offset, target })?;

        let target_block = if instrs[insert].is_block_marker() {
            match instrs[insert].operand {
                Operand::Block(block) => block,
                _ => unreachable!(),
            }
        } else {
            let block = func.add_block();
            instrs.insert(
                insert,
                Instruction::new(target as u32, Opcode::Nop, Operand::Block(block)),
            );
            if insert <= i {
                i += 1;
            }
            block
        };

        instrs[i].operand = if conditional {
            let cont = func.add_block();
            Operand::Branch { cont, target: target_block }
        } else {
            Operand::Block(target_block)
        };
        i += 1;
    }
    Ok(())
}
