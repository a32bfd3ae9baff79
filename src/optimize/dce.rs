//! Dead code elimination.
//!
//! Two phases: blocks unreachable from the entry are deleted outright, then
//! pure instructions whose results are never used are removed, cascading to
//! operands which become unused in turn.  Side-effecting instructions (calls,
//! stores, foreign code) and terminators are never candidates.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    analysis::cfg::ControlFlowGraph,
    block::Block,
    context::Context,
    error::IrError,
    function::Function,
    pass_manager::Pass,
    value::Value,
};

pub const DCE_NAME: &str = "dce";

pub fn create_dce_pass() -> Pass {
    Pass {
        name: DCE_NAME,
        descr: "remove unreachable blocks and unused pure instructions",
        runner: eliminate_dead_code,
    }
}

/// Returns the number of blocks plus instructions removed.
pub fn eliminate_dead_code(context: &mut Context, function: Function) -> Result<u64, IrError> {
    let cfg = ControlFlowGraph::new(function);
    cfg.build(context)?;
    let mut count = cfg.remove_unreachable_blocks(context)? as u64;
    count += remove_dead_instructions(context, function);
    Ok(count)
}

fn remove_dead_instructions(context: &mut Context, function: Function) -> u64 {
    // Count the uses of each instruction value and remember its block, since
    // a cascaded removal must pull the operand from its own defining block.
    let mut num_uses: FxHashMap<Value, u32> = FxHashMap::default();
    let mut def_block: FxHashMap<Value, Block> = FxHashMap::default();
    for (block, ins_val) in function.instruction_iter(context) {
        def_block.insert(ins_val, block);
        for opd in instruction_operands(context, ins_val) {
            if opd.get_instruction(context).is_some() {
                *num_uses.entry(opd).or_insert(0) += 1;
            }
        }
    }

    let mut worklist: Vec<Value> = function
        .instruction_iter(context)
        .map(|(_, ins_val)| ins_val)
        .filter(|ins_val| !num_uses.contains_key(ins_val) && is_removable(context, *ins_val))
        .collect();

    let mut removed_set = FxHashSet::default();
    let mut removed = 0;
    while let Some(dead_val) = worklist.pop() {
        if !removed_set.insert(dead_val) {
            continue;
        }
        let Some(block) = def_block.get(&dead_val) else {
            continue;
        };
        let opds = instruction_operands(context, dead_val);
        block.remove_instruction(context, dead_val);
        removed += 1;
        for opd in opds {
            if let Some(count) = num_uses.get_mut(&opd) {
                *count = count.saturating_sub(1);
                if *count == 0 && is_removable(context, opd) {
                    worklist.push(opd);
                }
            }
        }
    }
    removed
}

fn instruction_operands(context: &Context, ins_val: Value) -> Vec<Value> {
    ins_val
        .get_instruction(context)
        .map(|instruction| instruction.get_operands())
        .unwrap_or_default()
}

fn is_removable(context: &Context, ins_val: Value) -> bool {
    ins_val
        .get_instruction(context)
        .map(|instruction| !instruction.may_have_side_effect() && !instruction.is_terminator())
        .unwrap_or(false)
}
