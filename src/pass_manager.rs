//! Passes and the pipeline which runs them to a fixed point.
//!
//! A [`Pass`] is a named function-level rewrite returning how many changes it
//! made.  The [`OptimizationPipeline`] runs its passes over every function in
//! a module, round after round, until a full round makes no change or the
//! round cap is hit.  Because one pass's rewrites create the next one's
//! opportunities (constant folding feeds dead code elimination and so on),
//! iterating the whole list beats ordering it cleverly.

use crate::{
    analysis::cfg::ControlFlowGraph,
    context::Context,
    error::IrError,
    function::Function,
    module::Module,
    optimize::{
        create_constfold_pass, create_copyprop_pass, create_dce_pass, create_strengthred_pass,
    },
    FxIndexMap,
};

/// An upper bound on optimization rounds, in case a buggy pair of passes
/// keeps undoing each other's work.
pub const MAX_PIPELINE_ROUNDS: usize = 100;

/// A function-level rewrite.
///
/// The runner returns the number of rewrites it performed; zero means the
/// function is already in this pass's normal form.  The pipeline rebuilds the
/// function's CFG and dominators before every invocation, so a runner may
/// rely on both being current.
pub struct Pass {
    pub name: &'static str,
    pub descr: &'static str,
    pub runner: fn(&mut Context, Function) -> Result<u64, IrError>,
}

/// What a pipeline run did.
#[derive(Debug)]
pub struct PipelineResult {
    /// How many rounds were executed, including the final no-change round.
    pub rounds: usize,
    /// False iff the round cap was hit while passes were still rewriting.
    pub converged: bool,
    /// Total rewrites per pass, keyed by pass name, in pass order.
    pub pass_counts: FxIndexMap<&'static str, u64>,
}

impl PipelineResult {
    /// Total rewrites across all passes and rounds.
    pub fn total(&self) -> u64 {
        self.pass_counts.values().sum()
    }

    /// Whether anything was rewritten at all.
    pub fn modified(&self) -> bool {
        self.total() > 0
    }
}

/// An ordered list of [`Pass`]es run to a fixed point over a module.
#[derive(Default)]
pub struct OptimizationPipeline {
    passes: Vec<Pass>,
}

impl OptimizationPipeline {
    pub fn new() -> OptimizationPipeline {
        OptimizationPipeline { passes: Vec::new() }
    }

    /// Append a pass to the end of the pipeline.
    pub fn add_pass(&mut self, pass: Pass) {
        self.passes.push(pass);
    }

    /// The default pipeline: constant folding then dead code elimination.
    pub fn add_standard_passes(&mut self) {
        self.add_pass(create_constfold_pass());
        self.add_pass(create_dce_pass());
    }

    /// The aggressive pipeline: the standard passes, then copy propagation
    /// and strength reduction, then the standard passes again to clean up
    /// what those two exposed.
    pub fn add_aggressive_passes(&mut self) {
        self.add_standard_passes();
        self.add_pass(create_copyprop_pass());
        self.add_pass(create_strengthred_pass());
        self.add_standard_passes();
    }

    /// An iterator over the registered passes, in run order.
    pub fn pass_iter(&self) -> impl Iterator<Item = &Pass> {
        self.passes.iter()
    }

    /// Run every pass over every function in `module`, repeating the whole
    /// list until a round makes no rewrite or [`MAX_PIPELINE_ROUNDS`] is hit.
    pub fn run(&self, context: &mut Context, module: Module) -> Result<PipelineResult, IrError> {
        let mut pass_counts: FxIndexMap<&'static str, u64> =
            self.passes.iter().map(|pass| (pass.name, 0)).collect();
        let mut rounds = 0;
        let mut converged = false;
        while rounds < MAX_PIPELINE_ROUNDS {
            rounds += 1;
            let mut round_total = 0;
            for pass in &self.passes {
                let mut pass_total = 0;
                for function in module.function_iter(context) {
                    // A previous pass may have rewritten terminators or
                    // removed blocks, so re-derive the CFG facts each time.
                    let cfg = ControlFlowGraph::new(function);
                    cfg.build(context)?;
                    cfg.compute_dominators(context);
                    pass_total += (pass.runner)(context, function)?;
                }
                tracing::debug!(pass = pass.name, rewrites = pass_total, "pass finished");
                if let Some(count) = pass_counts.get_mut(pass.name) {
                    *count += pass_total;
                }
                round_total += pass_total;
            }
            tracing::debug!(round = rounds, rewrites = round_total, "optimization round done");
            if round_total == 0 {
                converged = true;
                break;
            }
        }
        if !converged {
            tracing::warn!(
                module = module.get_name(context),
                rounds,
                "optimization pipeline hit its round cap"
            );
        }
        Ok(PipelineResult {
            rounds,
            converged,
            pass_counts,
        })
    }
}
