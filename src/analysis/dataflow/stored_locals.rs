//! Which local variables have definitely been stored to?
//!
//! A forward must-analysis: a local is in a block's out set iff every path
//! from the entry to the end of that block writes it through a direct
//! `GetLocal` pointer.  Useful for flagging reads of possibly uninitialized
//! locals.

use crate::{
    analysis::dataflow::DataFlowAnalysis,
    block::Block,
    context::Context,
    function::Function,
    instruction::{value_as_local, Instruction},
    local_var::LocalVar,
    value::ValueDatum,
    FxIndexSet,
};

#[derive(Default)]
pub struct StoredLocals;

impl DataFlowAnalysis for StoredLocals {
    // `None` is the optimistic "all locals" element, so blocks which haven't
    // been evaluated yet don't drag the meet down to the empty set.
    type Value = Option<FxIndexSet<LocalVar>>;

    fn initial_value(&self, _context: &Context, _function: Function) -> Self::Value {
        None
    }

    fn transfer(&self, context: &Context, block: Block, input: &Self::Value) -> Self::Value {
        let mut stored = input.clone().unwrap_or_default();
        for ins_val in block.instruction_iter(context) {
            if let ValueDatum::Instruction(Instruction::Store { dst_val_ptr, .. }) =
                &context.values[ins_val.0].value
            {
                if let Some(local_var) = value_as_local(context, *dst_val_ptr) {
                    stored.insert(local_var);
                }
            }
        }
        Some(stored)
    }

    fn meet(&self, values: Vec<&Self::Value>) -> Self::Value {
        let mut known = values.into_iter().flatten();
        let first = known.next()?.clone();
        Some(known.fold(first, |acc, set| acc.intersection(set).copied().collect()))
    }
}
