//! The base descriptor for various values within the IR.
//!
//! [`Value`]s can be function arguments, constants and instructions.
//! [`crate::Instruction`]s generally refer to each other and to constants via
//! the [`Value`] wrapper.
//!
//! Like most IR data structures they are `Copy` and cheap to pass around by
//! value.  They are therefore also easy to replace, a common practise for
//! optimization passes.

use rustc_hash::FxHashMap;

use crate::{constant::Constant, context::Context, instruction::Instruction, irtype::Type};

/// A wrapper around a slotmap handle into the [`Context`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Value(pub slotmap::DefaultKey);

#[doc(hidden)]
#[derive(Debug, Clone)]
pub struct ValueContent {
    pub value: ValueDatum,
}

#[derive(Debug, Clone)]
pub enum ValueDatum {
    Argument(Type),
    Constant(Constant),
    Instruction(Instruction),
}

impl Value {
    /// Return a new argument [`Value`].
    pub fn new_argument(context: &mut Context, ty: Type) -> Value {
        let content = ValueContent {
            value: ValueDatum::Argument(ty),
        };
        Value(context.values.insert(content))
    }

    /// Return a new constant [`Value`].
    pub fn new_constant(context: &mut Context, constant: Constant) -> Value {
        let content = ValueContent {
            value: ValueDatum::Constant(constant),
        };
        Value(context.values.insert(content))
    }

    /// Return a new instruction [`Value`].
    pub fn new_instruction(context: &mut Context, instruction: Instruction) -> Value {
        let content = ValueContent {
            value: ValueDatum::Instruction(instruction),
        };
        Value(context.values.insert(content))
    }

    /// Return whether this is a constant value.
    pub fn is_constant(&self, context: &Context) -> bool {
        matches!(context.values[self.0].value, ValueDatum::Constant(_))
    }

    /// Return whether this value is an instruction, and specifically a
    /// 'terminator'.
    ///
    /// A terminator is always the last instruction in a block (and may not
    /// appear anywhere else) and is either a branch, switch or return.
    pub fn is_terminator(&self, context: &Context) -> bool {
        match &context.values[self.0].value {
            ValueDatum::Instruction(ins) => ins.is_terminator(),
            _ => false,
        }
    }

    /// Replace the contents of this value with new contents.
    ///
    /// This is the standard rewrite mechanism: since all instructions refer to
    /// values the user can replace a value in place and all users see the new
    /// contents.
    pub fn replace(&self, context: &mut Context, replacement: ValueDatum) {
        context.values[self.0].value = replacement;
    }

    /// Get a reference to this value as a constant, iff it is one.
    pub fn get_constant<'a>(&self, context: &'a Context) -> Option<&'a Constant> {
        match &context.values[self.0].value {
            ValueDatum::Constant(cn) => Some(cn),
            _ => None,
        }
    }

    /// Get a reference to this value as an instruction, iff it is one.
    pub fn get_instruction<'a>(&self, context: &'a Context) -> Option<&'a Instruction> {
        match &context.values[self.0].value {
            ValueDatum::Instruction(instruction) => Some(instruction),
            _ => None,
        }
    }

    /// Get a mutable reference to this value as an instruction, iff it is one.
    pub fn get_instruction_mut<'a>(&self, context: &'a mut Context) -> Option<&'a mut Instruction> {
        match &mut context.values[self.0].value {
            ValueDatum::Instruction(instruction) => Some(instruction),
            _ => None,
        }
    }

    /// If this value is an instruction, replace any operand found in
    /// `replace_map` with its mapped value, transitively.
    pub fn replace_instruction_values(
        &self,
        context: &mut Context,
        replace_map: &FxHashMap<Value, Value>,
    ) {
        if let ValueDatum::Instruction(instruction) = &mut context.values[self.0].value {
            instruction.replace_values(replace_map);
        }
    }

    /// Get the type for this value, if found.
    ///
    /// Arguments and constants always have a type, but only some instructions
    /// do.
    pub fn get_type(&self, context: &Context) -> Option<Type> {
        match &context.values[self.0].value {
            ValueDatum::Argument(ty) => Some(*ty),
            ValueDatum::Constant(cn) => Some(cn.ty),
            ValueDatum::Instruction(ins) => ins.get_type(context),
        }
    }
}
