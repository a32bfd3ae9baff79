//! Analyses over the IR.
//!
//! [`cfg`] derives control-flow structure for a single function, and
//! [`dataflow`] is a generic solver for forward data-flow problems over that
//! structure.

pub mod cfg;
pub mod dataflow;

pub use cfg::*;
pub use dataflow::*;
