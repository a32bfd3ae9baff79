//! The main handle to an IR instance.
//!
//! [`Context`] contains several [`slotmap`] arenas to maintain the IR ECS.  It
//! is passed around as a mutable reference to most of the Rill-IR APIs.

use rustc_hash::FxHashMap;
use slotmap::{DefaultKey, SlotMap};

use crate::{
    block::BlockContent,
    function::FunctionContent,
    irtype::{Type, TypeContent},
    local_var::LocalVarContent,
    module::{ModuleContent, ModuleIterator},
    value::ValueContent,
};

/// The main IR context handle.
///
/// Every module, function, block and value is stored here.  Types are interned
/// so equal types share a handle.
pub struct Context {
    pub(crate) modules: SlotMap<DefaultKey, ModuleContent>,
    pub(crate) functions: SlotMap<DefaultKey, FunctionContent>,
    pub(crate) blocks: SlotMap<DefaultKey, BlockContent>,
    pub(crate) values: SlotMap<DefaultKey, ValueContent>,
    pub(crate) local_vars: SlotMap<DefaultKey, LocalVarContent>,
    pub(crate) types: SlotMap<DefaultKey, TypeContent>,
    pub(crate) type_map: FxHashMap<TypeContent, Type>,
}

impl Context {
    /// Return a new context with the base types already interned.
    pub fn new() -> Context {
        let mut context = Context {
            modules: SlotMap::default(),
            functions: SlotMap::default(),
            blocks: SlotMap::default(),
            values: SlotMap::default(),
            local_vars: SlotMap::default(),
            types: SlotMap::default(),
            type_map: FxHashMap::default(),
        };
        Type::create_base_types(&mut context);
        context
    }

    /// Return an iterator for every module in this context.
    pub fn module_iter(&self) -> ModuleIterator {
        ModuleIterator::new(self)
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

use std::fmt::{Display, Error, Formatter};

impl Display for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", crate::printer::to_string(self))
    }
}
