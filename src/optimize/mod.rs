//! The optimization passes.
//!
//! Each module provides a raw entry point returning the number of rewrites
//! it made, plus a `create_*_pass` constructor wrapping it as a
//! [`crate::Pass`] for the pipeline.  All passes preserve observable
//! behaviour: side-effecting instructions are never removed or reordered and
//! division by a constant zero is always left in place to trap at runtime.

pub mod constants;
pub mod copy_prop;
pub mod dce;
pub mod strength;

pub use constants::*;
pub use copy_prop::*;
pub use dce::*;
pub use strength::*;
