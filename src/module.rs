//! A scope containing a collection of [`Function`]s and global constants.
//!
//! The module is the unit over which the optimization pipeline runs: every
//! pass is applied to every function in the module.

use std::collections::BTreeMap;

use crate::{
    context::Context,
    function::{Function, FunctionIterator},
    value::Value,
};

/// A wrapper around a slotmap handle into the [`Context`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Module(pub slotmap::DefaultKey);

#[doc(hidden)]
pub struct ModuleContent {
    pub name: String,
    pub functions: Vec<Function>,
    pub globals: BTreeMap<String, Value>,
}

impl Module {
    /// Return a new named module.
    pub fn new(context: &mut Context, name: &str) -> Module {
        let content = ModuleContent {
            name: name.to_owned(),
            functions: Vec::new(),
            globals: BTreeMap::new(),
        };
        Module(context.modules.insert(content))
    }

    /// Get this module's name.
    pub fn get_name<'a>(&self, context: &'a Context) -> &'a str {
        &context.modules[self.0].name
    }

    /// Return an iterator over each of the [`Function`]s in this module.
    pub fn function_iter(&self, context: &Context) -> FunctionIterator {
        FunctionIterator::new(context, self)
    }

    /// Get a function in this module by name.
    pub fn get_function(&self, context: &Context, name: &str) -> Option<Function> {
        context.modules[self.0]
            .functions
            .iter()
            .find(|function| function.get_name(context) == name)
            .copied()
    }

    /// Add a global constant value to this module.
    pub fn add_global_constant(&self, context: &mut Context, name: String, const_val: Value) {
        context.modules[self.0].globals.insert(name, const_val);
    }

    /// Get a named global constant value from this module, if found.
    pub fn get_global_constant(&self, context: &Context, name: &str) -> Option<Value> {
        context.modules[self.0].globals.get(name).copied()
    }
}

/// An iterator over [`Module`]s within a [`Context`].
pub struct ModuleIterator {
    modules: Vec<slotmap::DefaultKey>,
    next: usize,
}

impl ModuleIterator {
    /// Return a new [`Module`] iterator.
    pub fn new(context: &Context) -> ModuleIterator {
        // Copy all the current modules indices, so they may be modified in
        // the context during iteration.
        ModuleIterator {
            modules: context.modules.keys().collect(),
            next: 0,
        }
    }
}

impl Iterator for ModuleIterator {
    type Item = Module;

    fn next(&mut self) -> Option<Module> {
        if self.next < self.modules.len() {
            let idx = self.next;
            self.next += 1;
            Some(Module(self.modules[idx]))
        } else {
            None
        }
    }
}
