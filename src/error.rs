/// These errors are for internal IR failures, not designed to be useful to a
/// Rill developer, but more for users of the `rill-ir` crate, i.e., compiler
/// developers.
///
/// Malformed IR beyond what these describe (e.g. dangling block references)
/// is a precondition violation rather than a recoverable error.
#[derive(Debug)]
pub enum IrError {
    FunctionLocalClobbered(String, String),
    MissingBlock(String),
    MissingTerminator(String),
    RemoveMissingBlock(String),
}

impl std::error::Error for IrError {}

use std::fmt;

impl fmt::Display for IrError {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            IrError::FunctionLocalClobbered(fn_str, var_str) => write!(
                f,
                "Local storage for function {fn_str} already has an entry for variable {var_str}."
            ),
            IrError::MissingBlock(blk_str) => write!(f, "Unable to find block {blk_str}."),
            IrError::MissingTerminator(blk_str) => {
                write!(f, "Block {blk_str} is missing its terminator.")
            }
            IrError::RemoveMissingBlock(blk_str) => {
                write!(f, "Unable to remove block {blk_str}; not found.")
            }
        }
    }
}
