//! A typed function with a list of basic blocks and named local variables.
//!
//! The entry block is always the first in the list and is created along with
//! the function.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::{
    block::{Block, BlockIterator, Label},
    constant::Constant,
    context::Context,
    error::IrError,
    irtype::Type,
    local_var::LocalVar,
    module::Module,
    value::Value,
};

/// A wrapper around a slotmap handle into the [`Context`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Function(pub slotmap::DefaultKey);

#[doc(hidden)]
pub struct FunctionContent {
    pub name: String,
    pub arguments: Vec<(String, Value)>,
    pub return_type: Type,
    pub blocks: Vec<Block>,

    // BTree rather than Hash for deterministic ordering.
    pub local_storage: BTreeMap<String, LocalVar>,

    next_label_idx: u64,
}

impl Function {
    /// Return a new [`Function`] handle.
    ///
    /// Creates a [`Function`] in the `context` within `module` and returns a
    /// handle.  An entry block is created and made the first block.
    pub fn new(
        context: &mut Context,
        module: Module,
        name: String,
        args: Vec<(String, Type)>,
        return_type: Type,
    ) -> Function {
        let arguments = args
            .into_iter()
            .map(|(name, ty)| (name, Value::new_argument(context, ty)))
            .collect();
        let content = FunctionContent {
            name,
            arguments,
            return_type,
            blocks: Vec::new(),
            local_storage: BTreeMap::new(),
            next_label_idx: 0,
        };
        let func = Function(context.functions.insert(content));

        context.modules[module.0].functions.push(func);

        let entry_block = Block::new(context, func, Some("entry".to_owned()));
        context
            .functions
            .get_mut(func.0)
            .unwrap()
            .blocks
            .push(entry_block);

        func
    }

    /// Create and append a new [`Block`] to this function.
    pub fn create_block(&self, context: &mut Context, label: Option<Label>) -> Block {
        let block = Block::new(context, *self, label);
        let func = context.functions.get_mut(self.0).unwrap();
        func.blocks.push(block);
        block
    }

    /// Create and insert a new [`Block`] into this function, before `other`.
    pub fn create_block_before(
        &self,
        context: &mut Context,
        other: &Block,
        label: Option<Label>,
    ) -> Result<Block, IrError> {
        // We need to create the new block first (even though we may not use
        // it on Err below) since we can't borrow context mutably twice.
        let new_block = Block::new(context, *self, label);
        let other_label = other.get_label(context);
        let func = context.functions.get_mut(self.0).unwrap();
        func.blocks
            .iter()
            .position(|block| block == other)
            .map(|idx| {
                func.blocks.insert(idx, new_block);
                new_block
            })
            .ok_or(IrError::MissingBlock(other_label))
    }

    /// Create and insert a new [`Block`] into this function, after `other`.
    pub fn create_block_after(
        &self,
        context: &mut Context,
        other: &Block,
        label: Option<Label>,
    ) -> Result<Block, IrError> {
        let new_block = Block::new(context, *self, label);
        let other_label = other.get_label(context);
        let func = context.functions.get_mut(self.0).unwrap();
        func.blocks
            .iter()
            .position(|block| block == other)
            .map(|idx| {
                func.blocks.insert(idx + 1, new_block);
                new_block
            })
            .ok_or(IrError::MissingBlock(other_label))
    }

    /// Remove a [`Block`] from this function.
    ///
    /// The block is dropped from the block list and its arena entry released.
    /// The caller must ensure no remaining terminator targets it.
    pub fn remove_block(&self, context: &mut Context, block: &Block) -> Result<(), IrError> {
        let label = block.get_label(context);
        let func = context.functions.get_mut(self.0).unwrap();
        let block_idx = func
            .blocks
            .iter()
            .position(|b| b == block)
            .ok_or(IrError::RemoveMissingBlock(label))?;
        func.blocks.remove(block_idx);
        context.blocks.remove(block.0);
        Ok(())
    }

    /// Get a unique block label.
    ///
    /// If `hint` is `None` then the label will be in the form `"blockN"`
    /// where N is an incrementing decimal.  Otherwise if the hint is already
    /// used then the label becomes the hint with a decimal suffix.
    pub fn get_unique_label(&self, context: &mut Context, hint: Option<String>) -> String {
        match hint {
            Some(hint) => {
                if context.functions[self.0]
                    .blocks
                    .iter()
                    .any(|block| context.blocks[block.0].label == hint)
                {
                    let idx = self.get_next_label_idx(context);
                    self.get_unique_label(context, Some(format!("{hint}{idx}")))
                } else {
                    hint
                }
            }
            None => {
                let idx = self.get_next_label_idx(context);
                self.get_unique_label(context, Some(format!("block{idx}")))
            }
        }
    }

    fn get_next_label_idx(&self, context: &mut Context) -> u64 {
        let func = context.functions.get_mut(self.0).unwrap();
        let idx = func.next_label_idx;
        func.next_label_idx += 1;
        idx
    }

    /// Return the function name.
    pub fn get_name<'a>(&self, context: &'a Context) -> &'a str {
        &context.functions[self.0].name
    }

    /// Return the function entry (i.e., the first) block.
    pub fn get_entry_block(&self, context: &Context) -> Block {
        context.functions[self.0].blocks[0]
    }

    /// Return the declared return type.
    pub fn get_return_type(&self, context: &Context) -> Type {
        context.functions[self.0].return_type
    }

    /// Return the number of blocks in this function.
    pub fn num_blocks(&self, context: &Context) -> usize {
        context.functions[self.0].blocks.len()
    }

    /// Get an argument value by name.
    pub fn get_arg(&self, context: &Context, name: &str) -> Option<Value> {
        context.functions[self.0]
            .arguments
            .iter()
            .find_map(|(arg_name, val)| (arg_name == name).then_some(val))
            .copied()
    }

    /// Find the name of an arg value.
    pub fn lookup_arg_name<'a>(&self, context: &'a Context, value: &Value) -> Option<&'a String> {
        context.functions[self.0]
            .arguments
            .iter()
            .find_map(|(name, arg_val)| (arg_val == value).then_some(name))
    }

    /// Get an iterator over each of the function arguments.
    pub fn args_iter<'a>(&self, context: &'a Context) -> impl Iterator<Item = &'a (String, Value)> {
        context.functions[self.0].arguments.iter()
    }

    /// Declare a new local variable in this function.
    ///
    /// Returns an error if the name is a duplicate.
    pub fn new_local_var(
        &self,
        context: &mut Context,
        name: String,
        local_type: Type,
        initializer: Option<Constant>,
        mutable: bool,
    ) -> Result<LocalVar, IrError> {
        let var = LocalVar::new(context, local_type, initializer, mutable);
        let func = context.functions.get_mut(self.0).unwrap();
        if func.local_storage.insert(name.clone(), var).is_some() {
            Err(IrError::FunctionLocalClobbered(func.name.clone(), name))
        } else {
            Ok(var)
        }
    }

    /// Get a local variable by name.
    pub fn get_local_var(&self, context: &Context, name: &str) -> Option<LocalVar> {
        context.functions[self.0].local_storage.get(name).copied()
    }

    /// Find the name of a local variable.
    pub fn lookup_local_name<'a>(
        &self,
        context: &'a Context,
        var: &LocalVar,
    ) -> Option<&'a String> {
        context.functions[self.0]
            .local_storage
            .iter()
            .find_map(|(name, local_var)| (local_var == var).then_some(name))
    }

    /// Get an iterator over each of the function's local variables.
    pub fn locals_iter<'a>(
        &self,
        context: &'a Context,
    ) -> impl Iterator<Item = (&'a String, &'a LocalVar)> {
        context.functions[self.0].local_storage.iter()
    }

    /// Return a [`BlockIterator`] for each block in this function.
    pub fn block_iter(&self, context: &Context) -> BlockIterator {
        BlockIterator::new(context, self)
    }

    /// Return an iterator for every `(Block, Value)` instruction pair in this
    /// function.
    ///
    /// The pairs are collected up front so the context may be mutated during
    /// iteration.
    pub fn instruction_iter(&self, context: &Context) -> std::vec::IntoIter<(Block, Value)> {
        context.functions[self.0]
            .blocks
            .iter()
            .flat_map(|block| {
                context.blocks[block.0]
                    .instructions
                    .iter()
                    .map(|ins_val| (*block, *ins_val))
            })
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// Replace every operand use of `old_val` in this function with
    /// `new_val`.
    pub fn replace_value(&self, context: &mut Context, old_val: Value, new_val: Value) {
        let mut map = FxHashMap::default();
        map.insert(old_val, new_val);
        self.replace_values(context, &map);
    }

    /// Replace all operand uses described by `replace_map`, in every block of
    /// this function.
    pub fn replace_values(&self, context: &mut Context, replace_map: &FxHashMap<Value, Value>) {
        let blocks: Vec<Block> = self.block_iter(context).collect();
        for block in blocks {
            block.replace_values(context, replace_map);
        }
    }
}

/// An iterator over each [`Function`] in a [`Module`].
pub struct FunctionIterator {
    functions: Vec<slotmap::DefaultKey>,
    next: usize,
}

impl FunctionIterator {
    /// Return a new [`FunctionIterator`] for the functions in `module`.
    pub fn new(context: &Context, module: &Module) -> FunctionIterator {
        // Copy all the current modules' function indices, so they may be
        // modified in the context during iteration.
        FunctionIterator {
            functions: context.modules[module.0]
                .functions
                .iter()
                .map(|func| func.0)
                .collect(),
            next: 0,
        }
    }
}

impl Iterator for FunctionIterator {
    type Item = Function;

    fn next(&mut self) -> Option<Function> {
        if self.next < self.functions.len() {
            let idx = self.next;
            self.next += 1;
            Some(Function(self.functions[idx]))
        } else {
            None
        }
    }
}
