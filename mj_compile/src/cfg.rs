//! Basic-block graph and the three-phase branch-resolution/linearization
//! pass (spec.md §4.2): number each reachable block's starting offset,
//! patch `goto`/`goto_if_false` operands against those offsets, then emit
//! the final linear instruction stream. All three phases iterate block ids
//! in **creation order** (`0..blocks.len()`), skipping ids a shared
//! reachability scan didn't reach from the entry block, so a block's offset
//! agrees across phases regardless of cycles introduced by `while` bodies
//! jumping back to their condition. Creation order, not graph-traversal
//! order, is what keeps an `if`'s `then` and `else` arms from interleaving:
//! `then`'s block is created before `else`'s, so it's numbered, patched,
//! and emitted first, and its trailing `goto` jumps clean over `else` to
//! the join block instead of falling through into it.

use std::collections::{HashMap, HashSet};

use mj_bytecode::{Instruction, OpCode};

pub type BlockId = usize;

#[derive(Debug, Clone, Default)]
pub struct BasicBlock {
    pub instructions: Vec<Instruction>,
    pub then_branch: Option<BlockId>,
    pub else_branch: Option<BlockId>,
}

/// Builds up a method's basic-block graph as it is lowered. Blocks are
/// appended as control flow demands them; `then_branch`/`else_branch` double
/// as both real jump targets (for a block ending in `goto`/`goto_if_false`)
/// and mere successor pointers for blocks that simply fall through.
#[derive(Debug, Default)]
pub struct CfgBuilder {
    blocks: Vec<BasicBlock>,
}

impl CfgBuilder {
    pub fn new() -> Self {
        CfgBuilder { blocks: vec![BasicBlock::default()] }
    }

    pub fn entry(&self) -> BlockId {
        0
    }

    pub fn new_block(&mut self) -> BlockId {
        self.blocks.push(BasicBlock::default());
        self.blocks.len() - 1
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id]
    }

    pub fn emit(&mut self, id: BlockId, instr: Instruction) {
        self.blocks[id].instructions.push(instr);
    }

    /// Runs the three-phase pass and returns the linearized instruction
    /// stream for this method.
    pub fn finish(self) -> Vec<Instruction> {
        let entry = self.entry();
        let reachable = reachable_from(&self.blocks, entry);
        let starts = number(&self.blocks, &reachable);
        let mut blocks = self.blocks;
        patch(&mut blocks, &reachable, &starts);
        emit(&blocks, &reachable)
    }
}

/// Every block id reachable from `entry` by following `then_branch`/
/// `else_branch`, computed once and shared across all three phases so they
/// agree on which ids to skip.
fn reachable_from(blocks: &[BasicBlock], entry: BlockId) -> HashSet<BlockId> {
    let mut seen = HashSet::new();
    let mut stack = vec![entry];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        if let Some(t) = blocks[id].then_branch {
            stack.push(t);
        }
        if let Some(e) = blocks[id].else_branch {
            stack.push(e);
        }
    }
    seen
}

fn number(blocks: &[BasicBlock], reachable: &HashSet<BlockId>) -> HashMap<BlockId, usize> {
    let mut starts = HashMap::new();
    let mut cursor = 0usize;
    for id in 0..blocks.len() {
        if !reachable.contains(&id) {
            continue;
        }
        starts.insert(id, cursor);
        cursor += blocks[id].instructions.len();
    }
    starts
}

fn patch(blocks: &mut [BasicBlock], reachable: &HashSet<BlockId>, starts: &HashMap<BlockId, usize>) {
    for id in 0..blocks.len() {
        if !reachable.contains(&id) {
            continue;
        }
        let then_branch = blocks[id].then_branch;
        let else_branch = blocks[id].else_branch;
        if let Some(last) = blocks[id].instructions.last_mut() {
            match last.op {
                OpCode::Goto => {
                    if let Some(target) = then_branch {
                        last.operand = starts[&target] as i64;
                    }
                }
                OpCode::GotoIfFalse => {
                    if let Some(target) = else_branch {
                        last.operand = starts[&target] as i64;
                    }
                }
                _ => {}
            }
        }
    }
}

fn emit(blocks: &[BasicBlock], reachable: &HashSet<BlockId>) -> Vec<Instruction> {
    let mut out = Vec::new();
    for id in 0..blocks.len() {
        if !reachable.contains(&id) {
            continue;
        }
        out.extend(blocks[id].instructions.iter().copied());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mj_bytecode::Instruction;

    #[test]
    fn while_loop_backward_goto_resolves_to_the_condition_block() {
        let mut cfg = CfgBuilder::new();
        let entry = cfg.entry();
        let cond = cfg.new_block();
        cfg.block_mut(entry).then_branch = Some(cond);

        cfg.emit(cond, Instruction::simple(OpCode::Ldc));
        cfg.emit(cond, Instruction::with_operand(OpCode::GotoIfFalse, 0));
        let body = cfg.new_block();
        cfg.block_mut(cond).then_branch = Some(body);

        cfg.emit(body, Instruction::with_operand(OpCode::Goto, 0));
        let exit = cfg.new_block();
        cfg.block_mut(cond).else_branch = Some(exit);
        cfg.block_mut(body).then_branch = Some(cond);

        let out = cfg.finish();
        // entry(0) + cond's ldc(1) + cond's goto_if_false(1) = cond at offset 0
        assert_eq!(out[1].op, OpCode::GotoIfFalse);
        // body's goto targets cond, which starts right after the (empty) entry block
        assert_eq!(out[2].op, OpCode::Goto);
        assert_eq!(out[2].operand, 0);
    }

    #[test]
    fn if_else_arms_stay_in_creation_order_not_traversal_order() {
        // cond(0) -> then(1) -> join(3)
        //         -> else(2) -> join(3)
        // Creation order is cond, then, else, join. A DFS from cond that
        // visits then_branch before else_branch would reach join (via
        // then's then_branch) before it reaches else, numbering/emitting
        // join ahead of else.
        let mut cfg = CfgBuilder::new();
        let cond = cfg.entry();
        cfg.emit(cond, Instruction::with_operand(OpCode::GotoIfFalse, 0));

        let then_block = cfg.new_block();
        cfg.emit(then_block, Instruction::with_operand(OpCode::Ldc, 100));
        cfg.emit(then_block, Instruction::with_operand(OpCode::Goto, 0));

        let else_block = cfg.new_block();
        cfg.emit(else_block, Instruction::with_operand(OpCode::Ldc, 200));

        let join = cfg.new_block();
        cfg.emit(join, Instruction::simple(OpCode::Return));

        cfg.block_mut(cond).then_branch = Some(then_block);
        cfg.block_mut(cond).else_branch = Some(else_block);
        cfg.block_mut(then_block).then_branch = Some(join);
        cfg.block_mut(else_block).then_branch = Some(join);

        let out = cfg.finish();
        // cond(1) + then(2) + else(1) + join(1) = 5 instructions, in that order.
        assert_eq!(out.len(), 5);
        assert_eq!(out[1].op, OpCode::Ldc);
        assert_eq!(out[1].operand, 100);
        assert_eq!(out[2].op, OpCode::Goto);
        assert_eq!(out[3].op, OpCode::Ldc);
        assert_eq!(out[3].operand, 200);
        assert_eq!(out[4].op, OpCode::Return);
        // then's trailing goto must jump past else, straight to join.
        assert_eq!(out[2].operand, 4);
        // cond's goto_if_false must land on else, not skip it.
        assert_eq!(out[0].operand, 3);
    }
}
