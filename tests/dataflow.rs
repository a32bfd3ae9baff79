use rill_ir::*;

fn new_module_function(context: &mut Context) -> Function {
    let module = Module::new(context, "test");
    let return_type = Type::get_int(context, 64);
    Function::new(context, module, "main".to_owned(), Vec::new(), return_type)
}

fn append_ret_zero(context: &mut Context, block: Block) {
    let int_ty = Type::get_int(context, 64);
    let zero = Constant::get_int(context, 64, 0);
    block.append(context).ret(zero, int_ty);
}

fn store_const_to_local(context: &mut Context, block: Block, local_var: LocalVar, n: i64) {
    let ptr = block.append(context).get_local(local_var);
    let val = Constant::get_int(context, 64, n);
    block.append(context).store(ptr, val);
}

#[test]
fn stored_locals_straight_line() {
    let mut context = Context::new();
    let function = new_module_function(&mut context);
    let int_ty = Type::get_int(&mut context, 64);
    let a = function
        .new_local_var(&mut context, "a".to_owned(), int_ty, None, true)
        .unwrap();
    let b = function
        .new_local_var(&mut context, "b".to_owned(), int_ty, None, true)
        .unwrap();

    let entry = function.get_entry_block(&context);
    store_const_to_local(&mut context, entry, a, 1);
    append_ret_zero(&mut context, entry);

    ControlFlowGraph::new(function).build(&mut context).unwrap();
    let result = StoredLocals.analyze(&context, function);
    assert!(result.converged);

    let entry_out = result.out_values[&entry].as_ref().unwrap();
    assert!(entry_out.contains(&a));
    assert!(!entry_out.contains(&b));
    // Nothing is stored before the entry runs.
    assert!(result.in_values[&entry].is_none());
}

#[test]
fn stored_locals_meet_is_intersection() {
    let mut context = Context::new();
    let function = new_module_function(&mut context);
    let int_ty = Type::get_int(&mut context, 64);
    let a = function
        .new_local_var(&mut context, "a".to_owned(), int_ty, None, true)
        .unwrap();
    let b = function
        .new_local_var(&mut context, "b".to_owned(), int_ty, None, true)
        .unwrap();

    let entry = function.get_entry_block(&context);
    let then_blk = function.create_block(&mut context, Some("then".to_owned()));
    let else_blk = function.create_block(&mut context, Some("else".to_owned()));
    let end_blk = function.create_block(&mut context, Some("end".to_owned()));

    // `a` is stored on every path, `b` only down the then arm.
    store_const_to_local(&mut context, entry, a, 1);
    let cond = Constant::get_bool(&mut context, true);
    entry
        .append(&mut context)
        .conditional_branch(cond, then_blk, else_blk);
    store_const_to_local(&mut context, then_blk, b, 2);
    then_blk.append(&mut context).branch(end_blk);
    else_blk.append(&mut context).branch(end_blk);
    append_ret_zero(&mut context, end_blk);

    ControlFlowGraph::new(function).build(&mut context).unwrap();
    let result = StoredLocals.analyze(&context, function);
    assert!(result.converged);

    let then_out = result.out_values[&then_blk].as_ref().unwrap();
    assert!(then_out.contains(&a) && then_out.contains(&b));

    let end_in = result.in_values[&end_blk].as_ref().unwrap();
    assert!(end_in.contains(&a));
    assert!(!end_in.contains(&b));
}

#[test]
fn stored_locals_converges_around_a_loop() {
    let mut context = Context::new();
    let function = new_module_function(&mut context);
    let int_ty = Type::get_int(&mut context, 64);
    let a = function
        .new_local_var(&mut context, "a".to_owned(), int_ty, None, true)
        .unwrap();
    let b = function
        .new_local_var(&mut context, "b".to_owned(), int_ty, None, true)
        .unwrap();

    let entry = function.get_entry_block(&context);
    let header = function.create_block(&mut context, Some("header".to_owned()));
    let body = function.create_block(&mut context, Some("body".to_owned()));
    let exit = function.create_block(&mut context, Some("exit".to_owned()));

    store_const_to_local(&mut context, entry, a, 1);
    entry.append(&mut context).branch(header);
    let cond = Constant::get_bool(&mut context, true);
    header
        .append(&mut context)
        .conditional_branch(cond, body, exit);
    store_const_to_local(&mut context, body, b, 2);
    body.append(&mut context).branch(header);
    append_ret_zero(&mut context, exit);

    ControlFlowGraph::new(function).build(&mut context).unwrap();
    let result = StoredLocals.analyze(&context, function);
    assert!(result.converged);

    // `b` is only stored if the body ran at least once, so the header can
    // only rely on `a`.
    let header_in = result.in_values[&header].as_ref().unwrap();
    assert!(header_in.contains(&a));
    assert!(!header_in.contains(&b));
    let exit_in = result.in_values[&exit].as_ref().unwrap();
    assert!(exit_in.contains(&a));
    assert!(!exit_in.contains(&b));
}

/// A deliberately non-converging analysis, to exercise the step cap.
struct Counter;

impl DataFlowAnalysis for Counter {
    type Value = usize;

    fn initial_value(&self, _context: &Context, _function: Function) -> usize {
        0
    }

    fn transfer(&self, _context: &Context, _block: Block, input: &usize) -> usize {
        input + 1
    }

    fn meet(&self, values: Vec<&usize>) -> usize {
        values.into_iter().copied().max().unwrap_or(0)
    }
}

#[test]
fn solver_gives_up_on_non_converging_analysis() {
    let mut context = Context::new();
    let function = new_module_function(&mut context);
    let entry = function.get_entry_block(&context);
    let header = function.create_block(&mut context, Some("header".to_owned()));
    let exit = function.create_block(&mut context, Some("exit".to_owned()));

    entry.append(&mut context).branch(header);
    let cond = Constant::get_bool(&mut context, true);
    header
        .append(&mut context)
        .conditional_branch(cond, header, exit);
    append_ret_zero(&mut context, exit);

    ControlFlowGraph::new(function).build(&mut context).unwrap();
    let result = Counter.analyze(&context, function);
    assert!(!result.converged);
    assert_eq!(result.steps, 64 * function.num_blocks(&context));
}
