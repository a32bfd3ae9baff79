//! Strength reduction.
//!
//! Rewrites expensive integer arithmetic into cheaper forms:
//!
//! - `x * 0` becomes the constant `0`;
//! - `x * 1`, `x / 1`, `x + 0` and `x - 0` collapse to `x`;
//! - `x * 2^k` becomes `x << k` and `x / 2^k` becomes `x >> k`, for `2^k >= 2`.
//!
//! Commuted forms (`0 + x`, `2^k * x`) are handled for the commutative
//! operators.  Float arithmetic is never touched; reassociating or shifting
//! floats changes rounding.

use crate::{
    block::Block,
    constant::{Constant, ConstantValue},
    context::Context,
    error::IrError,
    function::Function,
    instruction::{BinaryOpKind, Instruction},
    pass_manager::Pass,
    value::{Value, ValueDatum},
};

pub const STRENGTHRED_NAME: &str = "strengthred";

pub fn create_strengthred_pass() -> Pass {
    Pass {
        name: STRENGTHRED_NAME,
        descr: "rewrite expensive integer arithmetic into cheaper forms",
        runner: reduce_strength,
    }
}

enum Reduction {
    /// The result is a constant zero.
    Zero,
    /// The result is just this operand.
    Identity(Value),
    /// Rewrite to `arg <op> shift_amount`.
    Shift {
        op: BinaryOpKind,
        arg: Value,
        shift_amount: i64,
    },
}

pub fn reduce_strength(context: &mut Context, function: Function) -> Result<u64, IrError> {
    let mut count = 0;
    while reduce_one(context, function) {
        count += 1;
    }
    Ok(count)
}

fn reduce_one(context: &mut Context, function: Function) -> bool {
    let candidate = function.instruction_iter(context).find_map(|(block, ins_val)| {
        let ValueDatum::Instruction(Instruction::BinaryOp { op, arg1, arg2 }) =
            &context.values[ins_val.0].value
        else {
            return None;
        };
        let width = ins_val.get_type(context)?.get_int_width(context)?;
        let reduction = match op {
            BinaryOpKind::Mul => match (const_int(context, *arg1), const_int(context, *arg2)) {
                (_, Some(0)) | (Some(0), _) => Some(Reduction::Zero),
                (_, Some(1)) => Some(Reduction::Identity(*arg1)),
                (Some(1), _) => Some(Reduction::Identity(*arg2)),
                (_, Some(c)) if is_power_of_two(c) => Some(Reduction::Shift {
                    op: BinaryOpKind::Lsh,
                    arg: *arg1,
                    shift_amount: c.trailing_zeros() as i64,
                }),
                (Some(c), _) if is_power_of_two(c) => Some(Reduction::Shift {
                    op: BinaryOpKind::Lsh,
                    arg: *arg2,
                    shift_amount: c.trailing_zeros() as i64,
                }),
                _ => None,
            },
            BinaryOpKind::Div | BinaryOpKind::IntDiv => match const_int(context, *arg2) {
                Some(1) => Some(Reduction::Identity(*arg1)),
                Some(c) if is_power_of_two(c) => Some(Reduction::Shift {
                    op: BinaryOpKind::Rsh,
                    arg: *arg1,
                    shift_amount: c.trailing_zeros() as i64,
                }),
                _ => None,
            },
            BinaryOpKind::Add => match (const_int(context, *arg1), const_int(context, *arg2)) {
                (_, Some(0)) => Some(Reduction::Identity(*arg1)),
                (Some(0), _) => Some(Reduction::Identity(*arg2)),
                _ => None,
            },
            BinaryOpKind::Sub => match const_int(context, *arg2) {
                Some(0) => Some(Reduction::Identity(*arg1)),
                _ => None,
            },
            _ => None,
        };
        reduction.map(|reduction| (block, ins_val, width, reduction))
    });

    let Some((block, ins_val, width, reduction)) = candidate else {
        return false;
    };
    match reduction {
        Reduction::Zero => {
            let zero = Constant::new_int(context, width, 0);
            ins_val.replace(context, ValueDatum::Constant(zero));
            block.remove_instruction(context, ins_val);
        }
        Reduction::Identity(kept) => {
            function.replace_value(context, ins_val, kept);
            block.remove_instruction(context, ins_val);
        }
        Reduction::Shift {
            op,
            arg,
            shift_amount,
        } => {
            let shift_val = Constant::get_int(context, width, shift_amount);
            ins_val.replace(
                context,
                ValueDatum::Instruction(Instruction::BinaryOp {
                    op,
                    arg1: arg,
                    arg2: shift_val,
                }),
            );
        }
    }
    true
}

fn const_int(context: &Context, val: Value) -> Option<i64> {
    match val.get_constant(context)?.value {
        ConstantValue::Int(n) => Some(n),
        _ => None,
    }
}

/// A power of two worth shifting by, i.e. two or greater.
fn is_power_of_two(c: i64) -> bool {
    c >= 2 && (c & (c - 1)) == 0
}
