//! Print the IR in a human readable form, mostly for debugging and test
//! assertions.
//!
//! Instruction results are numbered `%N` in order of appearance within their
//! function; arguments and locals print under their declared names and
//! constants are printed inline.  The output is stable for a given build
//! order, which is what the tests rely on.

use std::fmt::Write;

use rustc_hash::FxHashMap;

use crate::{
    constant::{Constant, ConstantValue},
    context::Context,
    function::Function,
    instruction::{BinaryOpKind, Dispatch, Instruction, Predicate, UnaryOpKind},
    module::Module,
    value::{Value, ValueDatum},
};

/// Render every module in `context`.
pub fn to_string(context: &Context) -> String {
    let mut text = String::new();
    for module in context.module_iter() {
        module_to_string(context, module, &mut text);
    }
    text
}

/// Render a single function.
pub fn function_to_string(context: &Context, function: Function) -> String {
    let mut text = String::new();
    write_function(context, function, &mut text);
    text
}

fn module_to_string(context: &Context, module: Module, text: &mut String) {
    let _ = writeln!(text, "module {} {{", module.get_name(context));
    for function in module.function_iter(context) {
        write_function(context, function, text);
    }
    let _ = writeln!(text, "}}");
}

fn write_function(context: &Context, function: Function, text: &mut String) {
    let args = function
        .args_iter(context)
        .map(|(name, val)| {
            let ty = val
                .get_type(context)
                .map(|ty| ty.as_string(context))
                .unwrap_or_else(|| "?".to_owned());
            format!("{name}: {ty}")
        })
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(
        text,
        "    fn {}({args}) -> {} {{",
        function.get_name(context),
        function.get_return_type(context).as_string(context),
    );

    for (name, var) in function.locals_iter(context) {
        let mutable = if var.is_mutable(context) { "mut " } else { "" };
        let init = var
            .get_initializer(context)
            .map(|constant| format!(" = {}", constant_to_string(context, constant)))
            .unwrap_or_default();
        let _ = writeln!(
            text,
            "        local {mutable}{} {name}{init}",
            var.get_inner_type(context).as_string(context)
        );
    }

    // Number instruction results in order of appearance.
    let mut namer = ValueNamer::new(function);
    for block in function.block_iter(context) {
        let _ = writeln!(text, "    {}:", block.get_label(context));
        for ins_val in block.instruction_iter(context) {
            let ins_str = match ins_val.get_instruction(context) {
                Some(instruction) => instruction_to_string(context, &namer, instruction),
                None => "<corrupt instruction>".to_owned(),
            };
            match ins_val
                .get_type(context)
                .map(|_| namer.name_result(ins_val))
            {
                Some(result) => {
                    let _ = writeln!(text, "        {result} = {ins_str}");
                }
                None => {
                    let _ = writeln!(text, "        {ins_str}");
                }
            }
        }
    }
    let _ = writeln!(text, "    }}");
}

struct ValueNamer {
    function: Function,
    names: FxHashMap<Value, String>,
    next_idx: usize,
}

impl ValueNamer {
    fn new(function: Function) -> ValueNamer {
        ValueNamer {
            function,
            names: FxHashMap::default(),
            next_idx: 0,
        }
    }

    fn name_result(&mut self, val: Value) -> String {
        let idx = self.next_idx;
        self.next_idx += 1;
        let name = format!("%{idx}");
        self.names.insert(val, name.clone());
        name
    }

    fn operand(&self, context: &Context, val: Value) -> String {
        match &context.values[val.0].value {
            ValueDatum::Argument(_) => self
                .function
                .lookup_arg_name(context, &val)
                .cloned()
                .unwrap_or_else(|| "<unknown arg>".to_owned()),
            ValueDatum::Constant(constant) => constant_to_string(context, constant),
            ValueDatum::Instruction(_) => self
                .names
                .get(&val)
                .cloned()
                .unwrap_or_else(|| "%?".to_owned()),
        }
    }
}

fn constant_to_string(context: &Context, constant: &Constant) -> String {
    let ty = constant.ty.as_string(context);
    match &constant.value {
        ConstantValue::Unit => "const unit".to_owned(),
        ConstantValue::Bool(b) => format!("const bool {b}"),
        ConstantValue::Int(n) => format!("const {ty} {n}"),
        ConstantValue::Float(f) => format!("const {ty} {f}"),
        ConstantValue::String(string) => format!("const str {string:?}"),
    }
}

fn instruction_to_string(
    context: &Context,
    namer: &ValueNamer,
    instruction: &Instruction,
) -> String {
    let function = namer.function;
    let opnd = |val: &Value| namer.operand(context, *val);
    match instruction {
        Instruction::ForeignCode(code) => format!("foreign {code:?}"),
        Instruction::UnaryOp { op, arg } => {
            format!("{} {}", unary_op_str(op), opnd(arg))
        }
        Instruction::BinaryOp { op, arg1, arg2 } => {
            format!("{} {}, {}", binary_op_str(op), opnd(arg1), opnd(arg2))
        }
        Instruction::Cmp(pred, lhs, rhs) => {
            format!("cmp {} {}, {}", predicate_str(pred), opnd(lhs), opnd(rhs))
        }
        Instruction::Call(callee, args) => format!(
            "call {}({})",
            callee.get_name(context),
            args.iter().map(opnd).collect::<Vec<_>>().join(", ")
        ),
        Instruction::MethodCall {
            receiver,
            method,
            dispatch,
            args,
            ..
        } => {
            let dispatch = match dispatch {
                Dispatch::Instance => "",
                Dispatch::Base => "base ",
            };
            format!(
                "mcall {dispatch}{}.{method}({})",
                opnd(receiver),
                args.iter().map(opnd).collect::<Vec<_>>().join(", ")
            )
        }
        Instruction::GetField { base, index, .. } => {
            format!("get_field {}, {index}", opnd(base))
        }
        Instruction::ExtractValue { tuple, index, .. } => {
            format!("extract_value {}, {index}", opnd(tuple))
        }
        Instruction::NewArray { elem_ty, len, .. } => {
            format!("new_array {}, {}", elem_ty.as_string(context), opnd(len))
        }
        Instruction::StoreElement {
            array,
            index_val,
            stored_val,
        } => format!(
            "store_element {}, {}, {}",
            opnd(array),
            opnd(index_val),
            opnd(stored_val)
        ),
        Instruction::GetElemPtr {
            base, index_val, ..
        } => format!("get_elem_ptr {}, {}", opnd(base), opnd(index_val)),
        Instruction::StackAlloc { ptr_ty } => {
            format!("stack_alloc {}", ptr_ty.as_string(context))
        }
        Instruction::GetLocal(local_var) => format!(
            "get_local {}",
            function
                .lookup_local_name(context, local_var)
                .cloned()
                .unwrap_or_else(|| "<unknown local>".to_owned())
        ),
        Instruction::Load(ptr) => format!("load {}", opnd(ptr)),
        Instruction::Store {
            dst_val_ptr,
            stored_val,
        } => format!("store {}, {}", opnd(stored_val), opnd(dst_val_ptr)),
        Instruction::Cast(val, ty) => {
            format!("cast {} to {}", opnd(val), ty.as_string(context))
        }
        Instruction::Nop => "nop".to_owned(),
        Instruction::Branch(block) => format!("br {}", block.get_label(context)),
        Instruction::ConditionalBranch {
            cond_value,
            true_block,
            false_block,
        } => format!(
            "cbr {}, {}, {}",
            opnd(cond_value),
            true_block.get_label(context),
            false_block.get_label(context)
        ),
        Instruction::Switch {
            value,
            cases,
            default,
        } => {
            let cases = cases
                .iter()
                .map(|(constant, block)| {
                    format!(
                        "{}: {}",
                        constant_to_string(context, constant),
                        block.get_label(context)
                    )
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "switch {}, [{cases}], default {}",
                opnd(value),
                default.get_label(context)
            )
        }
        Instruction::Ret(val, ty) => format!("ret {} {}", ty.as_string(context), opnd(val)),
    }
}

fn unary_op_str(op: &UnaryOpKind) -> &'static str {
    match op {
        UnaryOpKind::Not => "not",
        UnaryOpKind::Neg => "neg",
    }
}

fn binary_op_str(op: &BinaryOpKind) -> &'static str {
    match op {
        BinaryOpKind::Add => "add",
        BinaryOpKind::Sub => "sub",
        BinaryOpKind::Mul => "mul",
        BinaryOpKind::Div => "div",
        BinaryOpKind::IntDiv => "idiv",
        BinaryOpKind::Mod => "mod",
        BinaryOpKind::And => "and",
        BinaryOpKind::Or => "or",
        BinaryOpKind::Xor => "xor",
        BinaryOpKind::Lsh => "lsh",
        BinaryOpKind::Rsh => "rsh",
    }
}

fn predicate_str(pred: &Predicate) -> &'static str {
    match pred {
        Predicate::Equal => "eq",
        Predicate::NotEqual => "ne",
        Predicate::LessThan => "lt",
        Predicate::LessThanOrEqual => "le",
        Predicate::GreaterThan => "gt",
        Predicate::GreaterThanOrEqual => "ge",
    }
}
