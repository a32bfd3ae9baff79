//! A generic worklist solver for forward data-flow problems.
//!
//! An analysis describes its lattice value, transfer function and meet
//! operator by implementing [`DataFlowAnalysis`]; the provided
//! [`DataFlowAnalysis::analyze`] drives them to a fixed point over a
//! function's blocks.  See [`stored_locals`] for a worked example.

pub mod stored_locals;
pub use stored_locals::StoredLocals;

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{analysis::cfg::ControlFlowGraph, block::Block, context::Context, function::Function};

/// Steps the solver may take per block before it gives up, as a structural
/// safety net against a non-converging transfer function.
const MAX_STEPS_PER_BLOCK: usize = 64;

/// The fixed point reached by [`DataFlowAnalysis::analyze`].
#[derive(Debug)]
pub struct DataFlowResult<V> {
    /// The value holding on entry to each block.
    pub in_values: FxHashMap<Block, V>,
    /// The value holding on exit from each block.
    pub out_values: FxHashMap<Block, V>,
    /// How many block evaluations the solver performed.
    pub steps: usize,
    /// False iff the step cap was hit with work still queued, in which case
    /// the values are a safe but unfinished approximation.
    pub converged: bool,
}

/// A forward data-flow problem.
///
/// `transfer` must be monotone for `analyze` to converge; `meet` combines the
/// out values of a block's predecessors into its in value.  The solver
/// requires the function's CFG edges to be current, i.e.
/// [`ControlFlowGraph::build`] has run since the last terminator rewrite.
pub trait DataFlowAnalysis {
    type Value: Clone + PartialEq;

    /// The value every block starts from, also used as the entry's in value.
    fn initial_value(&self, context: &Context, function: Function) -> Self::Value;

    /// Push `input` through the instructions of `block`.
    fn transfer(&self, context: &Context, block: Block, input: &Self::Value) -> Self::Value;

    /// Combine the out values of a block's predecessors.  Never called with
    /// an empty list.
    fn meet(&self, values: Vec<&Self::Value>) -> Self::Value;

    /// Whether a recomputed out value should requeue the successors.
    fn changed(&self, old_value: &Self::Value, new_value: &Self::Value) -> bool {
        old_value != new_value
    }

    /// Solve this analysis over `function` with a worklist seeded in reverse
    /// postorder, so that in the absence of back edges each block is
    /// evaluated only once.
    fn analyze(&self, context: &Context, function: Function) -> DataFlowResult<Self::Value> {
        let cfg = ControlFlowGraph::new(function);
        let mut seed: Vec<Block> = cfg.reverse_post_order(context);
        // Unreachable blocks still get seeded, after the reachable ones.
        let reachable: FxHashSet<Block> = seed.iter().copied().collect();
        seed.extend(
            function
                .block_iter(context)
                .filter(|block| !reachable.contains(block)),
        );

        let initial = self.initial_value(context, function);
        let mut in_values: FxHashMap<Block, Self::Value> = seed
            .iter()
            .map(|block| (*block, initial.clone()))
            .collect();
        let mut out_values = in_values.clone();

        let max_steps = MAX_STEPS_PER_BLOCK * seed.len();
        let mut queued: FxHashSet<Block> = seed.iter().copied().collect();
        let mut worklist: VecDeque<Block> = seed.into_iter().collect();

        let mut steps = 0;
        while let Some(block) = worklist.pop_front() {
            if steps >= max_steps {
                tracing::warn!(
                    function = function.get_name(context),
                    steps,
                    "data-flow solver hit its step cap"
                );
                return DataFlowResult {
                    in_values,
                    out_values,
                    steps,
                    converged: false,
                };
            }
            steps += 1;
            queued.remove(&block);

            let preds: Vec<Block> = block.pred_iter(context).copied().collect();
            if !preds.is_empty() {
                let pred_outs: Vec<&Self::Value> =
                    preds.iter().map(|pred| &out_values[pred]).collect();
                let new_in = self.meet(pred_outs);
                in_values.insert(block, new_in);
            }
            let new_out = self.transfer(context, block, &in_values[&block]);
            if self.changed(&out_values[&block], &new_out) {
                out_values.insert(block, new_out);
                for succ in block.succ_iter(context) {
                    if queued.insert(*succ) {
                        worklist.push_back(*succ);
                    }
                }
            }
        }

        DataFlowResult {
            in_values,
            out_values,
            steps,
            converged: true,
        }
    }
}
