use rill_ir::*;

fn new_module_function(context: &mut Context, args: Vec<(String, Type)>) -> (Module, Function) {
    let module = Module::new(context, "test");
    let return_type = Type::get_int(context, 64);
    let function = Function::new(context, module, "main".to_owned(), args, return_type);
    (module, function)
}

fn int_arg(context: &mut Context, name: &str) -> Vec<(String, Type)> {
    let int_ty = Type::get_int(context, 64);
    vec![(name.to_owned(), int_ty)]
}

#[test]
fn fold_constant_add() {
    let mut context = Context::new();
    let (_, function) = new_module_function(&mut context, Vec::new());
    let entry = function.get_entry_block(&context);

    let int_ty = Type::get_int(&mut context, 64);
    let two = Constant::get_int(&mut context, 64, 2);
    let three = Constant::get_int(&mut context, 64, 3);
    let sum = entry
        .append(&mut context)
        .binary_op(BinaryOpKind::Add, two, three);
    entry.append(&mut context).ret(sum, int_ty);

    let count = fold_constants(&mut context, function).unwrap();
    assert_eq!(count, 1);
    // The add value itself became the constant, so the ret sees it with no
    // operand rewriting.
    assert!(matches!(
        sum.get_constant(&context).unwrap().value,
        ConstantValue::Int(5)
    ));
    assert_eq!(entry.num_instructions(&context), 1);

    // Already in normal form; a second run does nothing.
    assert_eq!(fold_constants(&mut context, function).unwrap(), 0);
}

#[test]
fn fold_never_divides_by_zero() {
    let mut context = Context::new();
    let (_, function) = new_module_function(&mut context, Vec::new());
    let entry = function.get_entry_block(&context);

    let int_ty = Type::get_int(&mut context, 64);
    let five = Constant::get_int(&mut context, 64, 5);
    let zero = Constant::get_int(&mut context, 64, 0);
    let div = entry
        .append(&mut context)
        .binary_op(BinaryOpKind::Div, five, zero);
    entry.append(&mut context).ret(div, int_ty);

    assert_eq!(fold_constants(&mut context, function).unwrap(), 0);
    assert!(div.get_instruction(&context).is_some());
}

#[test]
fn fold_float_arithmetic() {
    let mut context = Context::new();
    let (_, function) = new_module_function(&mut context, Vec::new());
    let entry = function.get_entry_block(&context);

    let float_ty = Type::get_float(&mut context, 64);
    let a = Constant::get_float(&mut context, 64, 1.5);
    let b = Constant::get_float(&mut context, 64, 2.25);
    let sum = entry.append(&mut context).binary_op(BinaryOpKind::Add, a, b);
    entry.append(&mut context).ret(sum, float_ty);

    assert_eq!(fold_constants(&mut context, function).unwrap(), 1);
    assert!(matches!(
        sum.get_constant(&context).unwrap().value,
        ConstantValue::Float(f) if f == 3.75
    ));
}

#[test]
fn fold_comparison_and_branch() {
    let mut context = Context::new();
    let (_, function) = new_module_function(&mut context, Vec::new());
    let entry = function.get_entry_block(&context);
    let then_blk = function.create_block(&mut context, Some("then".to_owned()));
    let else_blk = function.create_block(&mut context, Some("else".to_owned()));

    let int_ty = Type::get_int(&mut context, 64);
    let one = Constant::get_int(&mut context, 64, 1);
    let two = Constant::get_int(&mut context, 64, 2);
    let cond = entry
        .append(&mut context)
        .cmp(Predicate::LessThan, one, two);
    entry
        .append(&mut context)
        .conditional_branch(cond, then_blk, else_blk);
    then_blk.append(&mut context).ret(one, int_ty);
    else_blk.append(&mut context).ret(two, int_ty);

    ControlFlowGraph::new(function).build(&mut context).unwrap();
    // Two folds: the comparison to `true`, then the branch on it.
    assert_eq!(fold_constants(&mut context, function).unwrap(), 2);
    assert!(matches!(
        entry.get_terminator(&context),
        Some(Instruction::Branch(target)) if *target == then_blk
    ));

    // The untaken arm is now unreachable and DCE deletes it.
    let removed = eliminate_dead_code(&mut context, function).unwrap();
    assert!(removed >= 1);
    assert_eq!(function.num_blocks(&context), 2);
}

#[test]
fn fold_branch_with_coinciding_arms() {
    let mut context = Context::new();
    let (_, function) = new_module_function(&mut context, Vec::new());
    let entry = function.get_entry_block(&context);
    let next = function.create_block(&mut context, Some("next".to_owned()));

    let int_ty = Type::get_int(&mut context, 64);
    let cond = Constant::get_bool(&mut context, true);
    entry
        .append(&mut context)
        .conditional_branch(cond, next, next);
    let zero = Constant::get_int(&mut context, 64, 0);
    next.append(&mut context).ret(zero, int_ty);

    ControlFlowGraph::new(function).build(&mut context).unwrap();
    assert_eq!(fold_constants(&mut context, function).unwrap(), 1);
    assert!(matches!(
        entry.get_terminator(&context),
        Some(Instruction::Branch(target)) if *target == next
    ));
    // Both arms were the taken block, so the surviving edge must remain.
    assert_eq!(entry.succ_iter(&context).count(), 1);
    assert_eq!(next.num_predecessors(&context), 1);
}

#[test]
fn fold_switch_on_constant() {
    let mut context = Context::new();
    let (_, function) = new_module_function(&mut context, Vec::new());
    let entry = function.get_entry_block(&context);
    let case_one = function.create_block(&mut context, Some("one".to_owned()));
    let case_two = function.create_block(&mut context, Some("two".to_owned()));
    let default_blk = function.create_block(&mut context, Some("default".to_owned()));

    let int_ty = Type::get_int(&mut context, 64);
    let scrutinee = Constant::get_int(&mut context, 64, 2);
    let one = Constant::new_int(&context, 64, 1);
    let two = Constant::new_int(&context, 64, 2);
    entry.append(&mut context).switch(
        scrutinee,
        vec![(one, case_one), (two, case_two)],
        default_blk,
    );
    for block in [case_one, case_two, default_blk] {
        let zero = Constant::get_int(&mut context, 64, 0);
        block.append(&mut context).ret(zero, int_ty);
    }

    ControlFlowGraph::new(function).build(&mut context).unwrap();
    assert_eq!(fold_constants(&mut context, function).unwrap(), 1);
    assert!(matches!(
        entry.get_terminator(&context),
        Some(Instruction::Branch(target)) if *target == case_two
    ));

    eliminate_dead_code(&mut context, function).unwrap();
    assert_eq!(function.num_blocks(&context), 2);
}

#[test]
fn dce_cascades_through_unused_chains() {
    let mut context = Context::new();
    let args = int_arg(&mut context, "x");
    let (_, function) = new_module_function(&mut context, args);
    let entry = function.get_entry_block(&context);
    let x = function.get_arg(&context, "x").unwrap();

    let int_ty = Type::get_int(&mut context, 64);
    let sum = entry.append(&mut context).binary_op(BinaryOpKind::Add, x, x);
    let _sq = entry
        .append(&mut context)
        .binary_op(BinaryOpKind::Mul, sum, sum);
    entry.append(&mut context).ret(x, int_ty);

    // The mul is unused, and removing it leaves the add unused too.
    assert_eq!(eliminate_dead_code(&mut context, function).unwrap(), 2);
    assert_eq!(entry.num_instructions(&context), 1);
}

#[test]
fn dce_keeps_side_effects() {
    let mut context = Context::new();
    let (_, function) = new_module_function(&mut context, Vec::new());
    let entry = function.get_entry_block(&context);

    let int_ty = Type::get_int(&mut context, 64);
    entry
        .append(&mut context)
        .foreign_code("mov r0, #1".to_owned());
    let zero = Constant::get_int(&mut context, 64, 0);
    entry.append(&mut context).ret(zero, int_ty);

    assert_eq!(eliminate_dead_code(&mut context, function).unwrap(), 0);
    assert_eq!(entry.num_instructions(&context), 2);
}

#[test]
fn copy_propagation_forwards_chains() {
    let mut context = Context::new();
    let (_, function) = new_module_function(&mut context, Vec::new());
    let entry = function.get_entry_block(&context);
    let int_ty = Type::get_int(&mut context, 64);
    let x = function
        .new_local_var(&mut context, "x".to_owned(), int_ty, None, true)
        .unwrap();
    let y = function
        .new_local_var(&mut context, "y".to_owned(), int_ty, None, true)
        .unwrap();

    // x = 10; y = x; ret y + 5
    let ten = Constant::get_int(&mut context, 64, 10);
    let x_ptr = entry.append(&mut context).get_local(x);
    entry.append(&mut context).store(x_ptr, ten);
    let x_val = entry.append(&mut context).load(x_ptr);
    let y_ptr = entry.append(&mut context).get_local(y);
    entry.append(&mut context).store(y_ptr, x_val);
    let y_val = entry.append(&mut context).load(y_ptr);
    let five = Constant::get_int(&mut context, 64, 5);
    let sum = entry
        .append(&mut context)
        .binary_op(BinaryOpKind::Add, y_val, five);
    entry.append(&mut context).ret(sum, int_ty);

    assert_eq!(propagate_copies(&mut context, function).unwrap(), 2);
    // Both loads are gone and the add reads the stored constant directly.
    assert!(matches!(
        sum.get_instruction(&context),
        Some(Instruction::BinaryOp { arg1, .. }) if *arg1 == ten
    ));
    let remaining: Vec<Value> = entry.instruction_iter(&context).collect();
    assert!(!remaining.contains(&x_val));
    assert!(!remaining.contains(&y_val));

    // Constant folding can now finish the job.
    assert_eq!(fold_constants(&mut context, function).unwrap(), 1);
    assert!(matches!(
        sum.get_constant(&context).unwrap().value,
        ConstantValue::Int(15)
    ));
}

#[test]
fn copy_propagation_respects_calls() {
    let mut context = Context::new();
    let (module, function) = new_module_function(&mut context, Vec::new());
    let void_ty = Type::get_void(&context);
    let other = Function::new(
        &mut context,
        module,
        "other".to_owned(),
        Vec::new(),
        void_ty,
    );
    let other_entry = other.get_entry_block(&context);
    let unit = Constant::get_unit(&mut context);
    other_entry.append(&mut context).ret(unit, void_ty);

    let entry = function.get_entry_block(&context);
    let int_ty = Type::get_int(&mut context, 64);
    let x = function
        .new_local_var(&mut context, "x".to_owned(), int_ty, None, true)
        .unwrap();

    // The call may write `x` through an escaped pointer, so the load after
    // it must stay.
    let ten = Constant::get_int(&mut context, 64, 10);
    let x_ptr = entry.append(&mut context).get_local(x);
    entry.append(&mut context).store(x_ptr, ten);
    entry.append(&mut context).call(other, &[]);
    let x_val = entry.append(&mut context).load(x_ptr);
    entry.append(&mut context).ret(x_val, int_ty);

    assert_eq!(propagate_copies(&mut context, function).unwrap(), 0);
    assert!(x_val.get_instruction(&context).is_some());
}

#[test]
fn strength_reduction_cases() {
    let mut context = Context::new();
    let args = int_arg(&mut context, "x");
    let (_, function) = new_module_function(&mut context, args);
    let entry = function.get_entry_block(&context);
    let x = function.get_arg(&context, "x").unwrap();
    let int_ty = Type::get_int(&mut context, 64);

    let eight = Constant::get_int(&mut context, 64, 8);
    let one = Constant::get_int(&mut context, 64, 1);
    let zero = Constant::get_int(&mut context, 64, 0);
    let four = Constant::get_int(&mut context, 64, 4);

    let shifted = entry
        .append(&mut context)
        .binary_op(BinaryOpKind::Mul, x, eight);
    let kept = entry
        .append(&mut context)
        .binary_op(BinaryOpKind::Mul, x, one);
    let zeroed = entry
        .append(&mut context)
        .binary_op(BinaryOpKind::Mul, x, zero);
    let divided = entry
        .append(&mut context)
        .binary_op(BinaryOpKind::IntDiv, x, four);
    let added = entry
        .append(&mut context)
        .binary_op(BinaryOpKind::Add, zeroed, divided);
    let summed = entry
        .append(&mut context)
        .binary_op(BinaryOpKind::Add, shifted, kept);
    let total = entry
        .append(&mut context)
        .binary_op(BinaryOpKind::Add, added, summed);
    entry.append(&mut context).ret(total, int_ty);

    // Five rewrites: x*8, x*1, x*0, x/4, and then `0 + (x >> 2)` collapsing
    // once the zero has materialized.
    assert_eq!(reduce_strength(&mut context, function).unwrap(), 5);

    // x * 8 became x << 3.
    assert!(matches!(
        shifted.get_instruction(&context),
        Some(Instruction::BinaryOp { op: BinaryOpKind::Lsh, arg1, arg2 })
            if *arg1 == x
                && matches!(arg2.get_constant(&context).unwrap().value, ConstantValue::Int(3))
    ));
    // x / 4 became x >> 2.
    assert!(matches!(
        divided.get_instruction(&context),
        Some(Instruction::BinaryOp { op: BinaryOpKind::Rsh, arg1, arg2 })
            if *arg1 == x
                && matches!(arg2.get_constant(&context).unwrap().value, ConstantValue::Int(2))
    ));
    // x * 1 collapsed into its use.
    assert!(matches!(
        summed.get_instruction(&context),
        Some(Instruction::BinaryOp { arg2, .. }) if *arg2 == x
    ));
    // x * 0 became the constant zero.
    assert!(matches!(
        zeroed.get_constant(&context).unwrap().value,
        ConstantValue::Int(0)
    ));
    // 0 + divided collapsed, so the final add reads `divided` directly.
    assert!(matches!(
        total.get_instruction(&context),
        Some(Instruction::BinaryOp { arg1, .. }) if *arg1 == divided
    ));

    // A second run finds nothing new to do.
    assert_eq!(reduce_strength(&mut context, function).unwrap(), 0);
}

#[test]
fn strength_reduction_leaves_floats_alone() {
    let mut context = Context::new();
    let float_ty = Type::get_float(&mut context, 64);
    let (_, function) = new_module_function(&mut context, vec![("f".to_owned(), float_ty)]);
    let entry = function.get_entry_block(&context);
    let f = function.get_arg(&context, "f").unwrap();

    let two = Constant::get_float(&mut context, 64, 2.0);
    let doubled = entry
        .append(&mut context)
        .binary_op(BinaryOpKind::Mul, f, two);
    entry.append(&mut context).ret(doubled, float_ty);

    assert_eq!(reduce_strength(&mut context, function).unwrap(), 0);
    assert!(matches!(
        doubled.get_instruction(&context),
        Some(Instruction::BinaryOp { op: BinaryOpKind::Mul, .. })
    ));
}

#[test]
fn standard_pipeline_runs_to_fixed_point() {
    let mut context = Context::new();
    let args = int_arg(&mut context, "x");
    let (module, function) = new_module_function(&mut context, args);
    let entry = function.get_entry_block(&context);
    let x = function.get_arg(&context, "x").unwrap();

    let int_ty = Type::get_int(&mut context, 64);
    let two = Constant::get_int(&mut context, 64, 2);
    let three = Constant::get_int(&mut context, 64, 3);
    let sum = entry
        .append(&mut context)
        .binary_op(BinaryOpKind::Add, two, three);
    let _unused = entry.append(&mut context).binary_op(BinaryOpKind::Mul, x, x);
    entry.append(&mut context).ret(sum, int_ty);

    let mut pipeline = OptimizationPipeline::new();
    pipeline.add_standard_passes();
    let result = pipeline.run(&mut context, module).unwrap();

    assert!(result.converged);
    assert!(result.modified());
    // The last round verifies quiescence, so at least two rounds ran.
    assert!(result.rounds >= 2);
    assert!(result.pass_counts[CONSTFOLD_NAME] >= 1);
    assert!(result.pass_counts[DCE_NAME] >= 1);
    assert_eq!(entry.num_instructions(&context), 1);
    assert!(matches!(
        sum.get_constant(&context).unwrap().value,
        ConstantValue::Int(5)
    ));
}

#[test]
fn pipeline_is_quiescent_on_optimal_code() {
    let mut context = Context::new();
    let args = int_arg(&mut context, "x");
    let (module, function) = new_module_function(&mut context, args);
    let entry = function.get_entry_block(&context);
    let x = function.get_arg(&context, "x").unwrap();

    let int_ty = Type::get_int(&mut context, 64);
    let sum = entry.append(&mut context).binary_op(BinaryOpKind::Add, x, x);
    entry.append(&mut context).ret(sum, int_ty);

    let mut pipeline = OptimizationPipeline::new();
    pipeline.add_aggressive_passes();
    let result = pipeline.run(&mut context, module).unwrap();

    assert!(result.converged);
    assert!(!result.modified());
    assert_eq!(result.rounds, 1);
    assert_eq!(result.total(), 0);
}

#[test]
fn aggressive_pipeline_collapses_locals() {
    let mut context = Context::new();
    let (module, function) = new_module_function(&mut context, Vec::new());
    let entry = function.get_entry_block(&context);
    let int_ty = Type::get_int(&mut context, 64);
    let x = function
        .new_local_var(&mut context, "x".to_owned(), int_ty, None, true)
        .unwrap();

    // x = 10; ret (x * 4)
    let ten = Constant::get_int(&mut context, 64, 10);
    let four = Constant::get_int(&mut context, 64, 4);
    let x_ptr = entry.append(&mut context).get_local(x);
    entry.append(&mut context).store(x_ptr, ten);
    let x_val = entry.append(&mut context).load(x_ptr);
    let product = entry
        .append(&mut context)
        .binary_op(BinaryOpKind::Mul, x_val, four);
    entry.append(&mut context).ret(product, int_ty);

    let mut pipeline = OptimizationPipeline::new();
    pipeline.add_aggressive_passes();
    let result = pipeline.run(&mut context, module).unwrap();

    assert!(result.converged);
    assert!(result.modified());
    assert!(result.pass_counts[COPYPROP_NAME] >= 1);
    // The load was forwarded, the multiply reduced to a shift and the shift
    // folded: the function now returns a plain constant.
    assert!(matches!(
        product.get_constant(&context).unwrap().value,
        ConstantValue::Int(40)
    ));
}
