//! Instructions for data manipulation and control flow.
//!
//! Every instruction is a [`crate::Value`] used for its result, its effect, or
//! both.  The enum is closed: control-flow edge extraction and the
//! optimization passes both work by exhaustive matching over it.

use rustc_hash::FxHashMap;

use crate::{
    block::Block,
    constant::Constant,
    context::Context,
    function::Function,
    irtype::Type,
    local_var::LocalVar,
    value::{Value, ValueDatum},
};

#[derive(Debug, Clone)]
pub enum Instruction {
    /// An opaque blob of target code passed directly to codegen.  Assumed to
    /// have arbitrary side effects and no defined result; the optimizer never
    /// parses, folds or removes it.
    ForeignCode(String),
    /// Unary arithmetic and logic operations.
    UnaryOp { op: UnaryOpKind, arg: Value },
    /// Binary arithmetic and logic operations.
    BinaryOp {
        op: BinaryOpKind,
        arg1: Value,
        arg2: Value,
    },
    /// Comparison between two values, returning a boolean.
    Cmp(Predicate, Value, Value),
    /// A function call with a list of arguments.
    Call(Function, Vec<Value>),
    /// An instance or base-class method call, dispatched by name.
    MethodCall {
        receiver: Value,
        method: String,
        dispatch: Dispatch,
        args: Vec<Value>,
        return_type: Type,
    },
    /// Project a field out of a class object.
    GetField {
        base: Value,
        field_ty: Type,
        index: u64,
    },
    /// Extract an element from a tuple value.
    ExtractValue {
        tuple: Value,
        field_ty: Type,
        index: u64,
    },
    /// Allocate an array of `len` elements, returning a pointer to the first.
    NewArray {
        elem_ty: Type,
        ptr_ty: Type,
        len: Value,
    },
    /// Write an element into an array.
    StoreElement {
        array: Value,
        index_val: Value,
        stored_val: Value,
    },
    /// Compute the address of an element within an aggregate.
    GetElemPtr {
        base: Value,
        elem_ptr_ty: Type,
        index_val: Value,
    },
    /// Reserve a stack slot, returning a pointer to it.
    StackAlloc { ptr_ty: Type },
    /// The address of a function-local variable.
    GetLocal(LocalVar),
    /// Read a value from a memory pointer.
    Load(Value),
    /// Write a value to a memory pointer.
    Store {
        dst_val_ptr: Value,
        stored_val: Value,
    },
    /// Convert a value to another type.
    Cast(Value, Type),
    /// No-op, handy as a placeholder instruction.
    Nop,

    // Terminators.
    /// An unconditional jump.
    Branch(Block),
    /// A conditional jump with the boolean condition value and true or false
    /// destinations.
    ConditionalBranch {
        cond_value: Value,
        true_block: Block,
        false_block: Block,
    },
    /// A multi-way jump: one destination per case constant, plus a default.
    Switch {
        value: Value,
        cases: Vec<(Constant, Block)>,
        default: Block,
    },
    /// Return from a function.
    Ret(Value, Type),
}

/// Method dispatch kinds.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Dispatch {
    Instance,
    Base,
}

/// Comparison operations.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Predicate {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum UnaryOpKind {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BinaryOpKind {
    Add,
    Sub,
    Mul,
    /// Type directed division: float division for float operands, integer
    /// division otherwise.
    Div,
    /// Division which always truncates towards zero.
    IntDiv,
    Mod,
    And,
    Or,
    Xor,
    Lsh,
    Rsh,
}

impl Instruction {
    /// Some [`Instruction`]s can return a value, but for some a return value
    /// doesn't make sense.
    ///
    /// Those which perform side effects such as writing to memory, and also
    /// terminators such as `Ret`, do not have a type.
    pub fn get_type(&self, context: &Context) -> Option<Type> {
        match self {
            Instruction::UnaryOp { arg, .. } => arg.get_type(context),
            Instruction::BinaryOp { arg1, .. } => arg1.get_type(context),
            Instruction::Cmp(..) => Some(Type::get_bool(context)),
            Instruction::Call(function, _) => Some(function.get_return_type(context)),
            Instruction::MethodCall { return_type, .. } => Some(*return_type),
            Instruction::GetField { field_ty, .. } => Some(*field_ty),
            Instruction::ExtractValue { field_ty, .. } => Some(*field_ty),
            Instruction::NewArray { ptr_ty, .. } => Some(*ptr_ty),
            Instruction::GetElemPtr { elem_ptr_ty, .. } => Some(*elem_ptr_ty),
            Instruction::StackAlloc { ptr_ty } => Some(*ptr_ty),
            Instruction::GetLocal(local_var) => Some(local_var.get_type(context)),

            // Load needs to strip the pointer from the source type.
            Instruction::Load(ptr_val) => ptr_val
                .get_type(context)
                .and_then(|ty| ty.get_pointee_type(context)),

            Instruction::Cast(_, ty) => Some(*ty),

            // These are used for their effect, or terminate.  No type.
            Instruction::ForeignCode(_)
            | Instruction::StoreElement { .. }
            | Instruction::Store { .. }
            | Instruction::Nop
            | Instruction::Branch(_)
            | Instruction::ConditionalBranch { .. }
            | Instruction::Switch { .. }
            | Instruction::Ret(..) => None,
        }
    }

    /// Get the value operands referenced by this instruction.
    pub fn get_operands(&self) -> Vec<Value> {
        match self {
            Instruction::ForeignCode(_) => vec![],
            Instruction::UnaryOp { op: _, arg } => vec![*arg],
            Instruction::BinaryOp { op: _, arg1, arg2 } => vec![*arg1, *arg2],
            Instruction::Cmp(_, lhs, rhs) => vec![*lhs, *rhs],
            Instruction::Call(_, args) => args.clone(),
            Instruction::MethodCall { receiver, args, .. } => {
                let mut vals = vec![*receiver];
                vals.extend_from_slice(args);
                vals
            }
            Instruction::GetField { base, .. } => vec![*base],
            Instruction::ExtractValue { tuple, .. } => vec![*tuple],
            Instruction::NewArray { len, .. } => vec![*len],
            Instruction::StoreElement {
                array,
                index_val,
                stored_val,
            } => vec![*array, *index_val, *stored_val],
            Instruction::GetElemPtr {
                base, index_val, ..
            } => vec![*base, *index_val],
            Instruction::StackAlloc { .. } => vec![],
            Instruction::GetLocal(_) => vec![],
            Instruction::Load(ptr) => vec![*ptr],
            Instruction::Store {
                dst_val_ptr,
                stored_val,
            } => vec![*dst_val_ptr, *stored_val],
            Instruction::Cast(val, _) => vec![*val],
            Instruction::Nop => vec![],
            Instruction::Branch(_) => vec![],
            Instruction::ConditionalBranch { cond_value, .. } => vec![*cond_value],
            Instruction::Switch { value, .. } => vec![*value],
            Instruction::Ret(val, _) => vec![*val],
        }
    }

    /// Replace each operand found in `replace_map` with its mapped value,
    /// following chains in the map transitively.
    pub fn replace_values(&mut self, replace_map: &FxHashMap<Value, Value>) {
        let replace = |val: &mut Value| {
            while let Some(new_val) = replace_map.get(val) {
                *val = *new_val;
            }
        };
        match self {
            Instruction::ForeignCode(_)
            | Instruction::StackAlloc { .. }
            | Instruction::GetLocal(_)
            | Instruction::Nop
            | Instruction::Branch(_) => (),
            Instruction::UnaryOp { op: _, arg } => replace(arg),
            Instruction::BinaryOp { op: _, arg1, arg2 } => {
                replace(arg1);
                replace(arg2);
            }
            Instruction::Cmp(_, lhs, rhs) => {
                replace(lhs);
                replace(rhs);
            }
            Instruction::Call(_, args) => args.iter_mut().for_each(replace),
            Instruction::MethodCall { receiver, args, .. } => {
                replace(receiver);
                args.iter_mut().for_each(replace);
            }
            Instruction::GetField { base, .. } => replace(base),
            Instruction::ExtractValue { tuple, .. } => replace(tuple),
            Instruction::NewArray { len, .. } => replace(len),
            Instruction::StoreElement {
                array,
                index_val,
                stored_val,
            } => {
                replace(array);
                replace(index_val);
                replace(stored_val);
            }
            Instruction::GetElemPtr {
                base, index_val, ..
            } => {
                replace(base);
                replace(index_val);
            }
            Instruction::Load(ptr) => replace(ptr),
            Instruction::Store {
                dst_val_ptr,
                stored_val,
            } => {
                replace(dst_val_ptr);
                replace(stored_val);
            }
            Instruction::Cast(val, _) => replace(val),
            Instruction::ConditionalBranch { cond_value, .. } => replace(cond_value),
            Instruction::Switch { value, .. } => replace(value),
            Instruction::Ret(val, _) => replace(val),
        }
    }

    /// Whether this instruction has observable effects beyond its result.
    ///
    /// Calls and foreign code are assumed to read and write anything; stores
    /// write memory; `Ret` transfers control out of the function.
    pub fn may_have_side_effect(&self) -> bool {
        match self {
            Instruction::ForeignCode(_)
            | Instruction::Call(..)
            | Instruction::MethodCall { .. }
            | Instruction::StoreElement { .. }
            | Instruction::Store { .. }
            | Instruction::Ret(..) => true,

            Instruction::UnaryOp { .. }
            | Instruction::BinaryOp { .. }
            | Instruction::Cmp(..)
            | Instruction::GetField { .. }
            | Instruction::ExtractValue { .. }
            | Instruction::NewArray { .. }
            | Instruction::GetElemPtr { .. }
            | Instruction::StackAlloc { .. }
            | Instruction::GetLocal(_)
            | Instruction::Load(_)
            | Instruction::Cast(..)
            | Instruction::Nop
            | Instruction::Branch(_)
            | Instruction::ConditionalBranch { .. }
            | Instruction::Switch { .. } => false,
        }
    }

    /// Whether this instruction must be the last in its block.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Branch(_)
                | Instruction::ConditionalBranch { .. }
                | Instruction::Switch { .. }
                | Instruction::Ret(..)
        )
    }

    /// The blocks this terminator may transfer control to, in terminator
    /// order and with duplicates retained.  Empty for non-terminators.
    pub fn branch_targets(&self) -> Vec<Block> {
        match self {
            Instruction::Branch(block) => vec![*block],
            Instruction::ConditionalBranch {
                true_block,
                false_block,
                ..
            } => vec![*true_block, *false_block],
            Instruction::Switch { cases, default, .. } => {
                let mut targets: Vec<Block> = cases.iter().map(|(_, block)| *block).collect();
                targets.push(*default);
                targets
            }
            _ => vec![],
        }
    }
}

/// Provide a context for appending new [`Instruction`]s to a [`Block`].
pub struct InstructionInserter<'a> {
    context: &'a mut Context,
    block: Block,
}

macro_rules! insert_instruction {
    ($self: ident, $ctor: expr) => {{
        let instruction_val = Value::new_instruction($self.context, $ctor);
        $self
            .context
            .blocks
            .get_mut($self.block.0)
            .unwrap()
            .instructions
            .push(instruction_val);
        instruction_val
    }};
}

impl<'a> InstructionInserter<'a> {
    /// Return a new [`InstructionInserter`] context for `block`.
    pub fn new(context: &'a mut Context, block: Block) -> InstructionInserter<'a> {
        InstructionInserter { context, block }
    }

    pub fn foreign_code(self, code: String) -> Value {
        insert_instruction!(self, Instruction::ForeignCode(code))
    }

    pub fn unary_op(self, op: UnaryOpKind, arg: Value) -> Value {
        insert_instruction!(self, Instruction::UnaryOp { op, arg })
    }

    pub fn binary_op(self, op: BinaryOpKind, arg1: Value, arg2: Value) -> Value {
        insert_instruction!(self, Instruction::BinaryOp { op, arg1, arg2 })
    }

    pub fn cmp(self, pred: Predicate, lhs_value: Value, rhs_value: Value) -> Value {
        insert_instruction!(self, Instruction::Cmp(pred, lhs_value, rhs_value))
    }

    pub fn call(self, function: Function, args: &[Value]) -> Value {
        insert_instruction!(self, Instruction::Call(function, args.to_vec()))
    }

    pub fn method_call(
        self,
        receiver: Value,
        method: String,
        dispatch: Dispatch,
        args: &[Value],
        return_type: Type,
    ) -> Value {
        insert_instruction!(
            self,
            Instruction::MethodCall {
                receiver,
                method,
                dispatch,
                args: args.to_vec(),
                return_type,
            }
        )
    }

    pub fn get_field(self, base: Value, field_ty: Type, index: u64) -> Value {
        insert_instruction!(
            self,
            Instruction::GetField {
                base,
                field_ty,
                index,
            }
        )
    }

    pub fn extract_value(self, tuple: Value, field_ty: Type, index: u64) -> Value {
        insert_instruction!(
            self,
            Instruction::ExtractValue {
                tuple,
                field_ty,
                index,
            }
        )
    }

    pub fn new_array(self, elem_ty: Type, len: Value) -> Value {
        let ptr_ty = Type::new_ptr(self.context, elem_ty);
        insert_instruction!(
            self,
            Instruction::NewArray {
                elem_ty,
                ptr_ty,
                len,
            }
        )
    }

    pub fn store_element(self, array: Value, index_val: Value, stored_val: Value) -> Value {
        insert_instruction!(
            self,
            Instruction::StoreElement {
                array,
                index_val,
                stored_val,
            }
        )
    }

    pub fn get_elem_ptr(self, base: Value, elem_ty: Type, index_val: Value) -> Value {
        let elem_ptr_ty = Type::new_ptr(self.context, elem_ty);
        insert_instruction!(
            self,
            Instruction::GetElemPtr {
                base,
                elem_ptr_ty,
                index_val,
            }
        )
    }

    pub fn stack_alloc(self, ty: Type) -> Value {
        let ptr_ty = Type::new_ptr(self.context, ty);
        insert_instruction!(self, Instruction::StackAlloc { ptr_ty })
    }

    pub fn get_local(self, local_var: LocalVar) -> Value {
        insert_instruction!(self, Instruction::GetLocal(local_var))
    }

    pub fn load(self, src_val: Value) -> Value {
        insert_instruction!(self, Instruction::Load(src_val))
    }

    pub fn store(self, dst_val_ptr: Value, stored_val: Value) -> Value {
        insert_instruction!(
            self,
            Instruction::Store {
                dst_val_ptr,
                stored_val,
            }
        )
    }

    pub fn cast(self, value: Value, ty: Type) -> Value {
        insert_instruction!(self, Instruction::Cast(value, ty))
    }

    pub fn nop(self) -> Value {
        insert_instruction!(self, Instruction::Nop)
    }

    pub fn branch(self, to_block: Block) -> Value {
        insert_instruction!(self, Instruction::Branch(to_block))
    }

    pub fn conditional_branch(
        self,
        cond_value: Value,
        true_block: Block,
        false_block: Block,
    ) -> Value {
        insert_instruction!(
            self,
            Instruction::ConditionalBranch {
                cond_value,
                true_block,
                false_block,
            }
        )
    }

    pub fn switch(self, value: Value, cases: Vec<(Constant, Block)>, default: Block) -> Value {
        insert_instruction!(
            self,
            Instruction::Switch {
                value,
                cases,
                default,
            }
        )
    }

    pub fn ret(self, value: Value, ty: Type) -> Value {
        insert_instruction!(self, Instruction::Ret(value, ty))
    }
}

/// Resolve a value to the local variable it addresses, iff it is a direct
/// `GetLocal`.
pub fn value_as_local(context: &Context, val: Value) -> Option<LocalVar> {
    match &context.values[val.0].value {
        ValueDatum::Instruction(Instruction::GetLocal(local_var)) => Some(*local_var),
        _ => None,
    }
}
