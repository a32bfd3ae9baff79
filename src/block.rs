//! Represents a 'basic block' of [`Instruction`]s in a control flow graph.
//!
//! [`Block`]s contain zero or more _non-terminating_ instructions and at most
//! one _terminating_ instruction or _terminator_.  Terminators are branches,
//! switches or a return instruction and are the last instruction in the
//! block.
//!
//! Every [`crate::Function`] has at least one block, the first of which is
//! usually labeled `entry`.
//!
//! Besides its instruction list a block carries the facts derived for it by
//! [`crate::ControlFlowGraph`]: edge sets, dominators, its immediate
//! dominator and its dominance frontier.  Only the CFG writes those fields.

use rustc_hash::FxHashMap;

use crate::{
    context::Context,
    function::Function,
    instruction::{Instruction, InstructionInserter},
    value::{Value, ValueDatum},
    FxIndexSet,
};

/// A wrapper around a slotmap handle into the [`Context`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Block(pub slotmap::DefaultKey);

#[doc(hidden)]
pub struct BlockContent {
    /// Block label, useful for printing.
    pub label: Label,
    /// The function containing this block.
    pub function: Function,
    /// List of instructions in the block.
    pub(crate) instructions: Vec<Value>,
    /// CFG predecessors.  Populated only by `ControlFlowGraph::build`.
    pub(crate) preds: FxIndexSet<Block>,
    /// CFG successors.  Populated only by `ControlFlowGraph::build`.
    pub(crate) succs: FxIndexSet<Block>,
    /// The blocks dominating this one, including itself.
    pub(crate) doms: FxIndexSet<Block>,
    /// The unique closest strict dominator.  None only for the entry block.
    pub(crate) idom: Option<Block>,
    /// The dominance frontier of this block.
    pub(crate) dom_frontier: FxIndexSet<Block>,
}

/// Each block may be explicitly named.  A [`Label`] is a simple `String`
/// synonym.
pub type Label = String;

impl Block {
    /// Return a new block handle.
    ///
    /// Creates a new Block belonging to `function` in the context and returns
    /// its handle.  `label` is optional and is used only when printing the IR.
    pub fn new(context: &mut Context, function: Function, label: Option<String>) -> Block {
        let label = function.get_unique_label(context, label);
        let content = BlockContent {
            label,
            function,
            instructions: vec![],
            preds: FxIndexSet::default(),
            succs: FxIndexSet::default(),
            doms: FxIndexSet::default(),
            idom: None,
            dom_frontier: FxIndexSet::default(),
        };
        Block(context.blocks.insert(content))
    }

    /// Get the parent function for this block.
    pub fn get_function(&self, context: &Context) -> Function {
        context.blocks[self.0].function
    }

    /// Create a new [`InstructionInserter`] to more easily append
    /// instructions to this block.
    pub fn append<'a>(&self, context: &'a mut Context) -> InstructionInserter<'a> {
        InstructionInserter::new(context, *self)
    }

    /// Get the label of this block.  If it wasn't given one upon creation it
    /// will be a generated label.
    pub fn get_label(&self, context: &Context) -> String {
        context.blocks[self.0].label.clone()
    }

    /// Get the number of instructions in this block.
    pub fn num_instructions(&self, context: &Context) -> usize {
        context.blocks[self.0].instructions.len()
    }

    /// Get instruction at position `pos`.
    ///
    /// Returns `None` if block is empty.
    pub fn get_instruction_at(&self, context: &Context, pos: usize) -> Option<Value> {
        context.blocks[self.0].instructions.get(pos).cloned()
    }

    /// Get a reference to the block terminator.
    ///
    /// Returns `None` if block is empty or the last instruction isn't a
    /// terminator.
    pub fn get_terminator<'a>(&self, context: &'a Context) -> Option<&'a Instruction> {
        context.blocks[self.0].instructions.last().and_then(|val| {
            match &context.values[val.0].value {
                ValueDatum::Instruction(term_inst) if term_inst.is_terminator() => Some(term_inst),
                _ => None,
            }
        })
    }

    /// Return whether this block is already terminated.  Checks if the final
    /// instruction, if it exists, is a terminator.
    pub fn is_terminated(&self, context: &Context) -> bool {
        self.get_terminator(context).is_some()
    }

    /// The raw targets of this block's terminator, in terminator order,
    /// duplicates retained.
    pub fn terminator_targets(&self, context: &Context) -> Vec<Block> {
        self.get_terminator(context)
            .map(|term| term.branch_targets())
            .unwrap_or_default()
    }

    /// Get the number of predecessor blocks, i.e., blocks which branch to
    /// this one.
    pub fn num_predecessors(&self, context: &Context) -> usize {
        context.blocks[self.0].preds.len()
    }

    /// Get an iterator over this block's predecessor blocks.
    pub fn pred_iter<'a>(&'a self, context: &'a Context) -> impl Iterator<Item = &'a Block> {
        context.blocks[self.0].preds.iter()
    }

    /// Get an iterator over this block's successor blocks.
    pub fn succ_iter<'a>(&'a self, context: &'a Context) -> impl Iterator<Item = &'a Block> {
        context.blocks[self.0].succs.iter()
    }

    /// Add `from_block` to the set of predecessors of this block.
    pub fn add_pred(&self, context: &mut Context, from_block: &Block) {
        context.blocks[self.0].preds.insert(*from_block);
    }

    /// Remove `from_block` from the set of predecessors of this block.
    pub fn remove_pred(&self, context: &mut Context, from_block: &Block) {
        context.blocks[self.0].preds.shift_remove(from_block);
    }

    /// The set of blocks dominating this one, including itself.  Empty until
    /// `ControlFlowGraph::compute_dominators` has run.
    pub fn dominators<'a>(&self, context: &'a Context) -> &'a FxIndexSet<Block> {
        &context.blocks[self.0].doms
    }

    /// Does `dominator` dominate this block?
    pub fn is_dominated_by(&self, context: &Context, dominator: &Block) -> bool {
        context.blocks[self.0].doms.contains(dominator)
    }

    /// The unique closest strict dominator, or `None` for the entry block.
    /// Meaningless until `ControlFlowGraph::compute_immediate_dominators` has
    /// run.
    pub fn immediate_dominator(&self, context: &Context) -> Option<Block> {
        context.blocks[self.0].idom
    }

    /// The dominance frontier of this block.  Empty until
    /// `ControlFlowGraph::compute_dominance_frontier` has run.
    pub fn dominance_frontier<'a>(&self, context: &'a Context) -> &'a FxIndexSet<Block> {
        &context.blocks[self.0].dom_frontier
    }

    /// Replace a value within this block.
    ///
    /// For every instruction within the block, any reference to a key of
    /// `replace_map` is replaced with its mapped value.
    pub fn replace_values(&self, context: &mut Context, replace_map: &FxHashMap<Value, Value>) {
        for ins_idx in 0..context.blocks[self.0].instructions.len() {
            let ins = context.blocks[self.0].instructions[ins_idx];
            ins.replace_instruction_values(context, replace_map);
        }
    }

    /// Remove an instruction from this block.
    ///
    /// **NOTE:** We must be very careful!  We mustn't remove the terminator.
    /// Some extra checks should probably be performed here to avoid
    /// corruption!
    pub fn remove_instruction(&self, context: &mut Context, instr_val: Value) {
        let ins = &mut context.blocks[self.0].instructions;
        if let Some(pos) = ins.iter().position(|iv| *iv == instr_val) {
            ins.remove(pos);
        }
    }

    /// Remove instructions from block that satisfy a given predicate.
    pub fn remove_instructions<T: Fn(Value) -> bool>(&self, context: &mut Context, pred: T) {
        let ins = &mut context.blocks[self.0].instructions;
        ins.retain(|value| !pred(*value));
    }

    /// Return an instruction iterator for each instruction in this block.
    pub fn instruction_iter(&self, context: &Context) -> InstructionIterator {
        InstructionIterator::new(context, self)
    }
}

/// An iterator over each block in a [`Function`].
pub struct BlockIterator {
    blocks: Vec<slotmap::DefaultKey>,
    next: usize,
}

impl BlockIterator {
    /// Return a new iterator for each block in `function`.
    pub fn new(context: &Context, function: &Function) -> Self {
        // Copy all the current block indices, so they may be modified in the
        // context during iteration.
        BlockIterator {
            blocks: context.functions[function.0]
                .blocks
                .iter()
                .map(|block| block.0)
                .collect(),
            next: 0,
        }
    }
}

impl Iterator for BlockIterator {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        if self.next < self.blocks.len() {
            let idx = self.next;
            self.next += 1;
            Some(Block(self.blocks[idx]))
        } else {
            None
        }
    }
}

/// Iterate over all [`Instruction`]s in a specific [`Block`].
pub struct InstructionIterator {
    instructions: Vec<slotmap::DefaultKey>,
    next: usize,
}

impl InstructionIterator {
    pub fn new(context: &Context, block: &Block) -> Self {
        // Copy all the current instruction indices, so they may be modified
        // in the context during iteration.
        InstructionIterator {
            instructions: context.blocks[block.0]
                .instructions
                .iter()
                .map(|val| val.0)
                .collect(),
            next: 0,
        }
    }
}

impl Iterator for InstructionIterator {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        if self.next < self.instructions.len() {
            let idx = self.next;
            self.next += 1;
            Some(Value(self.instructions[idx]))
        } else {
            None
        }
    }
}
