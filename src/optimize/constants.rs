//! Constant folding.
//!
//! Evaluates instructions whose operands are all constants and replaces the
//! instruction value in place, so every user sees the folded constant with no
//! use-list bookkeeping.  Conditional branches and switches on a constant are
//! rewritten to unconditional branches, which is what later exposes
//! unreachable blocks to dead code elimination.
//!
//! Division and modulo by a constant zero are never folded; that trap belongs
//! to the runtime.

use crate::{
    block::Block,
    constant::{Constant, ConstantValue},
    context::Context,
    error::IrError,
    function::Function,
    instruction::Instruction,
    pass_manager::Pass,
    value::{Value, ValueDatum},
};

pub const CONSTFOLD_NAME: &str = "constfold";

pub fn create_constfold_pass() -> Pass {
    Pass {
        name: CONSTFOLD_NAME,
        descr: "evaluate constant expressions at compile time",
        runner: fold_constants,
    }
}

pub fn fold_constants(context: &mut Context, function: Function) -> Result<u64, IrError> {
    let mut count = 0;
    loop {
        if fold_binary_op(context, function)
            || fold_unary_op(context, function)
            || fold_cmp(context, function)
            || fold_conditional_branch(context, function)
            || fold_switch(context, function)
        {
            count += 1;
        } else {
            break;
        }
    }
    Ok(count)
}

fn fold_binary_op(context: &mut Context, function: Function) -> bool {
    let candidate = function
        .instruction_iter(context)
        .find_map(
            |(block, ins_val)| match &context.values[ins_val.0].value {
                ValueDatum::Instruction(Instruction::BinaryOp { op, arg1, arg2 }) => {
                    let lhs = arg1.get_constant(context)?;
                    let rhs = arg2.get_constant(context)?;
                    Constant::eval_binary(context, *op, lhs, rhs)
                        .map(|folded| (block, ins_val, folded))
                }
                _ => None,
            },
        );
    fold_to_constant(context, candidate)
}

fn fold_unary_op(context: &mut Context, function: Function) -> bool {
    let candidate = function
        .instruction_iter(context)
        .find_map(
            |(block, ins_val)| match &context.values[ins_val.0].value {
                ValueDatum::Instruction(Instruction::UnaryOp { op, arg }) => {
                    let arg = arg.get_constant(context)?;
                    Constant::eval_unary(context, *op, arg).map(|folded| (block, ins_val, folded))
                }
                _ => None,
            },
        );
    fold_to_constant(context, candidate)
}

fn fold_cmp(context: &mut Context, function: Function) -> bool {
    let candidate = function
        .instruction_iter(context)
        .find_map(
            |(block, ins_val)| match &context.values[ins_val.0].value {
                ValueDatum::Instruction(Instruction::Cmp(pred, lhs, rhs)) => {
                    let lhs = lhs.get_constant(context)?;
                    let rhs = rhs.get_constant(context)?;
                    Constant::eval_cmp(*pred, lhs, rhs)
                        .map(|result| (block, ins_val, Constant::new_bool(context, result)))
                }
                _ => None,
            },
        );
    fold_to_constant(context, candidate)
}

/// Turn the instruction value into the folded constant, in place, and drop it
/// from its block.
fn fold_to_constant(context: &mut Context, candidate: Option<(Block, Value, Constant)>) -> bool {
    match candidate {
        Some((block, ins_val, folded)) => {
            ins_val.replace(context, ValueDatum::Constant(folded));
            block.remove_instruction(context, ins_val);
            true
        }
        None => false,
    }
}

fn fold_conditional_branch(context: &mut Context, function: Function) -> bool {
    let candidate = function
        .instruction_iter(context)
        .find_map(
            |(block, ins_val)| match &context.values[ins_val.0].value {
                ValueDatum::Instruction(Instruction::ConditionalBranch {
                    cond_value,
                    true_block,
                    false_block,
                }) => match cond_value.get_constant(context)?.value {
                    ConstantValue::Bool(cond) => {
                        let (taken, not_taken) = if cond {
                            (*true_block, *false_block)
                        } else {
                            (*false_block, *true_block)
                        };
                        // Coinciding arms still use the surviving edge.
                        let dead_targets = if taken == not_taken {
                            vec![]
                        } else {
                            vec![not_taken]
                        };
                        Some((block, ins_val, taken, dead_targets))
                    }
                    _ => None,
                },
                _ => None,
            },
        );
    fold_to_branch(context, candidate)
}

fn fold_switch(context: &mut Context, function: Function) -> bool {
    let candidate = function
        .instruction_iter(context)
        .find_map(
            |(block, ins_val)| match &context.values[ins_val.0].value {
                ValueDatum::Instruction(Instruction::Switch {
                    value,
                    cases,
                    default,
                }) => {
                    let scrutinee = value.get_constant(context)?;
                    let taken = cases
                        .iter()
                        .find_map(|(case, case_block)| case.eq(scrutinee).then_some(*case_block))
                        .unwrap_or(*default);
                    let not_taken = cases
                        .iter()
                        .map(|(_, case_block)| *case_block)
                        .chain(std::iter::once(*default))
                        .filter(|case_block| *case_block != taken)
                        .collect();
                    Some((block, ins_val, taken, not_taken))
                }
                _ => None,
            },
        );
    fold_to_branch(context, candidate)
}

/// Replace a constant-condition terminator with an unconditional branch to
/// `taken`, updating the edge sets so later folds in the same run see them.
fn fold_to_branch(
    context: &mut Context,
    candidate: Option<(Block, Value, Block, Vec<Block>)>,
) -> bool {
    match candidate {
        Some((block, ins_val, taken, not_taken)) => {
            ins_val.replace(
                context,
                ValueDatum::Instruction(Instruction::Branch(taken)),
            );
            for dead_target in not_taken {
                dead_target.remove_pred(context, &block);
                context.blocks[block.0].succs.shift_remove(&dead_target);
            }
            true
        }
        None => false,
    }
}
