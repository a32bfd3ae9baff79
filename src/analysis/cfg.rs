//! Control-flow structure for a single function.
//!
//! [`ControlFlowGraph`] derives edges, dominators, dominance frontiers, loops
//! and traversal orders from a function's terminators.  The edge and
//! dominator facts are stored on the blocks themselves (see
//! [`crate::Block`]); everything else is returned to the caller.
//!
//! Edge sets are only ever written by [`ControlFlowGraph::build`], so after
//! any pass rewrites terminators the graph must be rebuilt before the
//! derived facts can be trusted.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{block::Block, context::Context, error::IrError, function::Function, FxIndexSet};

/// Analyses over the control flow of one [`Function`].
///
/// The struct itself is just the function handle; all state lives in the
/// context.  Typical usage is `build` followed by `compute_dominators`, then
/// whichever derived queries are needed.
pub struct ControlFlowGraph {
    function: Function,
}

impl ControlFlowGraph {
    pub fn new(function: Function) -> ControlFlowGraph {
        ControlFlowGraph { function }
    }

    pub fn function(&self) -> Function {
        self.function
    }

    /// Derive the predecessor and successor sets of every block from the
    /// block terminators.
    ///
    /// Previous edge sets are discarded.  Edges are deduplicated, so a
    /// conditional branch with equal arms or a switch with repeated targets
    /// contributes a single edge.  Fails if any block lacks a terminator.
    pub fn build(&self, context: &mut Context) -> Result<(), IrError> {
        let blocks: Vec<Block> = self.function.block_iter(context).collect();
        for block in &blocks {
            let content = &mut context.blocks[block.0];
            content.preds.clear();
            content.succs.clear();
        }
        for block in &blocks {
            if !block.is_terminated(context) {
                return Err(IrError::MissingTerminator(block.get_label(context)));
            }
            for target in block.terminator_targets(context) {
                context.blocks[block.0].succs.insert(target);
                context.blocks[target.0].preds.insert(*block);
            }
        }
        Ok(())
    }

    /// Compute the full dominator set of every block by iterating
    /// `doms(b) = {b} ∪ ⋂ doms(p) for preds p` to a fixed point.
    ///
    /// The entry block is dominated only by itself; blocks unreachable from
    /// the entry keep their pessimistic all-blocks set.  Requires `build`.
    pub fn compute_dominators(&self, context: &mut Context) {
        let blocks: Vec<Block> = self.function.block_iter(context).collect();
        let entry_block = self.function.get_entry_block(context);
        let all_blocks: FxIndexSet<Block> = blocks.iter().copied().collect();

        for block in &blocks {
            context.blocks[block.0].doms = if *block == entry_block {
                std::iter::once(entry_block).collect()
            } else {
                all_blocks.clone()
            };
        }

        let mut changed = true;
        while changed {
            changed = false;
            for block in &blocks {
                if *block == entry_block {
                    continue;
                }
                let preds: Vec<Block> = block.pred_iter(context).copied().collect();
                let Some((first_pred, rest_preds)) = preds.split_first() else {
                    continue;
                };
                let mut new_doms = context.blocks[first_pred.0].doms.clone();
                for pred in rest_preds {
                    new_doms = new_doms
                        .intersection(&context.blocks[pred.0].doms)
                        .copied()
                        .collect();
                }
                new_doms.insert(*block);
                if new_doms != context.blocks[block.0].doms {
                    context.blocks[block.0].doms = new_doms;
                    changed = true;
                }
            }
        }
    }

    /// Compute the immediate dominator of every block: the strict dominator
    /// which every other strict dominator itself dominates.
    ///
    /// The entry block has no immediate dominator.  Requires
    /// `compute_dominators`.
    pub fn compute_immediate_dominators(&self, context: &mut Context) {
        let blocks: Vec<Block> = self.function.block_iter(context).collect();
        let entry_block = self.function.get_entry_block(context);
        for block in &blocks {
            if *block == entry_block {
                context.blocks[block.0].idom = None;
                continue;
            }
            let strict_doms: Vec<Block> = context.blocks[block.0]
                .doms
                .iter()
                .filter(|dom| *dom != block)
                .copied()
                .collect();
            let idom = strict_doms.iter().copied().find(|cand| {
                strict_doms
                    .iter()
                    .all(|other| other == cand || context.blocks[cand.0].doms.contains(other))
            });
            context.blocks[block.0].idom = idom;
        }
    }

    /// Compute the dominance frontier of every block.
    ///
    /// For each join point (two or more predecessors), walk from each
    /// predecessor up the immediate dominator chain until the join's own
    /// immediate dominator, adding the join to each visited block's frontier.
    /// Requires `compute_immediate_dominators`.
    pub fn compute_dominance_frontier(&self, context: &mut Context) {
        let blocks: Vec<Block> = self.function.block_iter(context).collect();
        for block in &blocks {
            context.blocks[block.0].dom_frontier.clear();
        }
        for block in &blocks {
            if block.num_predecessors(context) < 2 {
                continue;
            }
            let Some(block_idom) = block.immediate_dominator(context) else {
                continue;
            };
            let preds: Vec<Block> = block.pred_iter(context).copied().collect();
            for pred in preds {
                let mut runner = pred;
                while runner != block_idom {
                    context.blocks[runner.0].dom_frontier.insert(*block);
                    match context.blocks[runner.0].idom {
                        Some(next) => runner = next,
                        None => break,
                    }
                }
            }
        }
    }

    /// Find every back edge, i.e. each `(tail, head)` edge whose head
    /// dominates its tail.  Requires `compute_dominators`.
    ///
    /// Blocks unreachable from the entry keep the pessimistic all-blocks
    /// dominator set, so any edge leaving one is reported as a back edge;
    /// run `remove_unreachable_blocks` first if that matters.
    pub fn find_back_edges(&self, context: &Context) -> Vec<(Block, Block)> {
        let mut back_edges = Vec::new();
        for block in self.function.block_iter(context) {
            for succ in block.succ_iter(context) {
                if block.is_dominated_by(context, succ) {
                    back_edges.push((block, *succ));
                }
            }
        }
        back_edges
    }

    /// Identify the natural loop of each back edge: the head plus every block
    /// which reaches the tail without passing through the head.
    ///
    /// One set is returned per back edge, in `find_back_edges` order; loops
    /// sharing a head are not merged.  Requires `compute_dominators`, and
    /// inherits `find_back_edges`' caveat about unreachable blocks.
    pub fn identify_loops(&self, context: &Context) -> Vec<FxIndexSet<Block>> {
        self.find_back_edges(context)
            .into_iter()
            .map(|(tail, head)| {
                let mut loop_blocks: FxIndexSet<Block> = FxIndexSet::default();
                loop_blocks.insert(head);
                let mut stack = vec![tail];
                while let Some(block) = stack.pop() {
                    if loop_blocks.insert(block) {
                        stack.extend(block.pred_iter(context).copied());
                    }
                }
                loop_blocks
            })
            .collect()
    }

    /// Compute the shortest edge distance from the entry to each reachable
    /// block.  Unreachable blocks are absent from the result.
    pub fn compute_block_depths(&self, context: &Context) -> FxHashMap<Block, usize> {
        let entry_block = self.function.get_entry_block(context);
        let mut depths = FxHashMap::default();
        depths.insert(entry_block, 0);
        let mut queue = VecDeque::from([entry_block]);
        while let Some(block) = queue.pop_front() {
            let next_depth = depths[&block] + 1;
            let succs: Vec<Block> = block.succ_iter(context).copied().collect();
            for succ in succs {
                // Only ever relax a depth downwards.
                if depths.get(&succ).map_or(true, |depth| *depth > next_depth) {
                    depths.insert(succ, next_depth);
                    queue.push_back(succ);
                }
            }
        }
        depths
    }

    /// Depth first preorder over the reachable blocks, starting at the entry.
    /// Successors are explored in terminator order.
    pub fn depth_first_traversal(&self, context: &Context) -> Vec<Block> {
        let mut visited = FxHashSet::default();
        let mut order = Vec::new();
        let mut stack = vec![self.function.get_entry_block(context)];
        while let Some(block) = stack.pop() {
            if !visited.insert(block) {
                continue;
            }
            order.push(block);
            let succs: Vec<Block> = block.succ_iter(context).copied().collect();
            // Reversed so the first successor is popped first.
            for succ in succs.into_iter().rev() {
                if !visited.contains(&succ) {
                    stack.push(succ);
                }
            }
        }
        order
    }

    /// Breadth first order over the reachable blocks, starting at the entry.
    pub fn breadth_first_traversal(&self, context: &Context) -> Vec<Block> {
        let entry_block = self.function.get_entry_block(context);
        let mut visited = FxHashSet::default();
        visited.insert(entry_block);
        let mut order = Vec::new();
        let mut queue = VecDeque::from([entry_block]);
        while let Some(block) = queue.pop_front() {
            order.push(block);
            for succ in block.succ_iter(context) {
                if visited.insert(*succ) {
                    queue.push_back(*succ);
                }
            }
        }
        order
    }

    /// Depth first postorder over the reachable blocks: each block appears
    /// after all of its DFS descendants.
    pub fn post_order(&self, context: &Context) -> Vec<Block> {
        let mut discovered = FxHashSet::default();
        let mut order = Vec::new();
        // The bool marks a block whose successors are already expanded and
        // which is only awaiting emission.
        let mut stack = vec![(self.function.get_entry_block(context), false)];
        while let Some((block, expanded)) = stack.pop() {
            if expanded {
                order.push(block);
                continue;
            }
            if !discovered.insert(block) {
                continue;
            }
            stack.push((block, true));
            let succs: Vec<Block> = block.succ_iter(context).copied().collect();
            for succ in succs.into_iter().rev() {
                if !discovered.contains(&succ) {
                    stack.push((succ, false));
                }
            }
        }
        order
    }

    /// Reverse postorder over the reachable blocks.  Ignoring back edges,
    /// every block appears before its successors, which makes it the
    /// canonical order for seeding forward analyses.
    pub fn reverse_post_order(&self, context: &Context) -> Vec<Block> {
        let mut order = self.post_order(context);
        order.reverse();
        order
    }

    /// Whether every cycle in the graph is a natural loop, i.e. every
    /// retreating edge found by a DFS targets a block dominating its source.
    /// Requires `compute_dominators`.
    pub fn is_reducible(&self, context: &Context) -> bool {
        let mut finished = FxHashSet::default();
        let mut on_path = FxHashSet::default();
        let mut stack = vec![(self.function.get_entry_block(context), false)];
        while let Some((block, leaving)) = stack.pop() {
            if leaving {
                on_path.remove(&block);
                finished.insert(block);
                continue;
            }
            if on_path.contains(&block) || finished.contains(&block) {
                continue;
            }
            on_path.insert(block);
            stack.push((block, true));
            let succs: Vec<Block> = block.succ_iter(context).copied().collect();
            for succ in succs {
                if on_path.contains(&succ) {
                    // A cycle edge into the current DFS path.
                    if !block.is_dominated_by(context, &succ) {
                        return false;
                    }
                } else if !finished.contains(&succ) {
                    stack.push((succ, false));
                }
            }
        }
        true
    }

    /// The blocks not reachable from the entry, in function block order.
    pub fn find_unreachable_blocks(&self, context: &Context) -> Vec<Block> {
        let reachable: FxHashSet<Block> = self.depth_first_traversal(context).into_iter().collect();
        self.function
            .block_iter(context)
            .filter(|block| !reachable.contains(block))
            .collect()
    }

    /// Delete every block not reachable from the entry and return how many
    /// were removed.  Surviving blocks have the dead blocks stripped from
    /// their predecessor sets.
    pub fn remove_unreachable_blocks(&self, context: &mut Context) -> Result<usize, IrError> {
        let dead_blocks = self.find_unreachable_blocks(context);
        for dead_block in &dead_blocks {
            let targets: Vec<Block> = dead_block.succ_iter(context).copied().collect();
            for target in targets {
                target.remove_pred(context, dead_block);
            }
        }
        for dead_block in &dead_blocks {
            self.function.remove_block(context, dead_block)?;
        }
        Ok(dead_blocks.len())
    }
}
