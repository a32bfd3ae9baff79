//! Copy propagation.
//!
//! Forwards stored values to later loads of the same local within a block:
//! after `store %v, x`, a `load x` is replaced by `%v` everywhere and the
//! load deleted.  Chains (`x = v; y = x; use y`) collapse in one run because
//! operand replacement follows the map transitively; the orphaned `get_local`
//! addresses are left for dead code elimination.
//!
//! Bindings are tracked per block and dropped at anything which could write
//! memory behind our back: calls, foreign code, element stores and stores
//! through a pointer which isn't a direct local address.

use rustc_hash::FxHashMap;

use crate::{
    block::Block,
    context::Context,
    error::IrError,
    function::Function,
    instruction::{value_as_local, Instruction},
    local_var::LocalVar,
    pass_manager::Pass,
    value::Value,
};

pub const COPYPROP_NAME: &str = "copyprop";

pub fn create_copyprop_pass() -> Pass {
    Pass {
        name: COPYPROP_NAME,
        descr: "forward stored values to loads of the same local",
        runner: propagate_copies,
    }
}

/// Returns the number of loads forwarded and removed.
pub fn propagate_copies(context: &mut Context, function: Function) -> Result<u64, IrError> {
    let mut replace_map: FxHashMap<Value, Value> = FxHashMap::default();
    let mut dead_loads: Vec<(Block, Value)> = Vec::new();

    for block in function.block_iter(context) {
        // The value most recently stored to each local, if still valid.
        let mut bindings: FxHashMap<LocalVar, Value> = FxHashMap::default();
        for ins_val in block.instruction_iter(context) {
            let Some(instruction) = ins_val.get_instruction(context) else {
                continue;
            };
            match instruction {
                Instruction::Store {
                    dst_val_ptr,
                    stored_val,
                } => match value_as_local(context, *dst_val_ptr) {
                    Some(local_var) => {
                        bindings.insert(local_var, *stored_val);
                    }
                    // A store through an arbitrary pointer may alias any
                    // local.
                    None => bindings.clear(),
                },
                Instruction::Load(ptr_val) => {
                    if let Some(stored_val) = value_as_local(context, *ptr_val)
                        .and_then(|local_var| bindings.get(&local_var))
                    {
                        replace_map.insert(ins_val, *stored_val);
                        dead_loads.push((block, ins_val));
                    }
                }
                otherwise => {
                    if otherwise.may_have_side_effect() {
                        bindings.clear();
                    }
                }
            }
        }
    }

    if !replace_map.is_empty() {
        // Rewrite function-wide: a forwarded load may have users in other
        // blocks.
        function.replace_values(context, &replace_map);
        for (block, load_val) in &dead_loads {
            block.remove_instruction(context, *load_val);
        }
    }
    Ok(dead_loads.len() as u64)
}
