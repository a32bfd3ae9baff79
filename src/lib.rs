//! An in-memory intermediate representation for the Rill compiler, together
//! with the analyses and rewrites performed on it between lowering and code
//! generation.
//!
//! The IR is stored in a [`Context`] which owns arenas for every module,
//! function, block and value.  The handles (`Module`, `Function`, `Block`,
//! `Value`, ...) are small `Copy` keys into those arenas, so they are cheap to
//! pass around and easy to replace, a common practise for optimization passes.
//!
//! On top of the data model sit:
//! - [`ControlFlowGraph`]: successor/predecessor edges, dominators, dominance
//!   frontiers, natural loops, traversal orders and reachability.
//! - [`DataFlowAnalysis`]: a generic forward worklist solver.
//! - [`OptimizationPipeline`]: constant folding, dead code elimination, copy
//!   propagation and strength reduction, run to a fixed point.

pub mod analysis;
pub use analysis::*;
pub mod block;
pub use block::*;
pub mod constant;
pub use constant::*;
pub mod context;
pub use context::*;
pub mod error;
pub use error::*;
pub mod function;
pub use function::*;
pub mod instruction;
pub use instruction::*;
pub mod irtype;
pub use irtype::*;
pub mod local_var;
pub use local_var::*;
pub mod module;
pub use module::*;
pub mod optimize;
pub use optimize::*;
pub mod pass_manager;
pub use pass_manager::*;
pub mod printer;
pub use printer::*;
pub mod value;
pub use value::*;

/// An [`indexmap::IndexSet`] using the fast FxHasher, for deterministic
/// iteration order over block and value sets.
pub type FxIndexSet<T> =
    indexmap::IndexSet<T, std::hash::BuildHasherDefault<rustc_hash::FxHasher>>;

/// An [`indexmap::IndexMap`] using the fast FxHasher.
pub type FxIndexMap<K, V> =
    indexmap::IndexMap<K, V, std::hash::BuildHasherDefault<rustc_hash::FxHasher>>;
