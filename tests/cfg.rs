use rill_ir::*;

fn new_module_function(context: &mut Context, args: Vec<(String, Type)>) -> Function {
    let module = Module::new(context, "test");
    let return_type = Type::get_int(context, 64);
    Function::new(context, module, "main".to_owned(), args, return_type)
}

fn append_ret_zero(context: &mut Context, block: Block) {
    let int_ty = Type::get_int(context, 64);
    let zero = Constant::get_int(context, 64, 0);
    block.append(context).ret(zero, int_ty);
}

/// entry -> (then | else) -> end
fn build_diamond(context: &mut Context) -> (Function, Block, Block, Block, Block) {
    let function = new_module_function(context, Vec::new());
    let entry = function.get_entry_block(context);
    let then_blk = function.create_block(context, Some("then".to_owned()));
    let else_blk = function.create_block(context, Some("else".to_owned()));
    let end_blk = function.create_block(context, Some("end".to_owned()));

    let cond = Constant::get_bool(context, true);
    entry
        .append(context)
        .conditional_branch(cond, then_blk, else_blk);
    then_blk.append(context).branch(end_blk);
    else_blk.append(context).branch(end_blk);
    append_ret_zero(context, end_blk);

    (function, entry, then_blk, else_blk, end_blk)
}

#[test]
fn build_derives_edges() {
    let mut context = Context::new();
    let (function, entry, then_blk, else_blk, end_blk) = build_diamond(&mut context);

    let cfg = ControlFlowGraph::new(function);
    cfg.build(&mut context).unwrap();

    let entry_succs: Vec<Block> = entry.succ_iter(&context).copied().collect();
    assert_eq!(entry_succs, vec![then_blk, else_blk]);
    assert_eq!(entry.num_predecessors(&context), 0);
    assert_eq!(end_blk.num_predecessors(&context), 2);
    assert!(then_blk.pred_iter(&context).any(|pred| *pred == entry));
    assert!(end_blk.pred_iter(&context).any(|pred| *pred == else_blk));
}

#[test]
fn build_fails_without_terminator() {
    let mut context = Context::new();
    let function = new_module_function(&mut context, Vec::new());
    // The entry block is left empty.
    let cfg = ControlFlowGraph::new(function);
    let result = cfg.build(&mut context);
    assert!(matches!(result, Err(IrError::MissingTerminator(_))));
}

#[test]
fn switch_edges_are_deduplicated() {
    let mut context = Context::new();
    let function = new_module_function(&mut context, Vec::new());
    let entry = function.get_entry_block(&context);
    let case_blk = function.create_block(&mut context, Some("case".to_owned()));
    let default_blk = function.create_block(&mut context, Some("default".to_owned()));

    let scrutinee = Constant::get_int(&mut context, 64, 1);
    let one = Constant::new_int(&context, 64, 1);
    let two = Constant::new_int(&context, 64, 2);
    entry.append(&mut context).switch(
        scrutinee,
        vec![(one, case_blk), (two, case_blk)],
        default_blk,
    );
    append_ret_zero(&mut context, case_blk);
    append_ret_zero(&mut context, default_blk);

    // Both cases target the same block but the edge is single.
    assert_eq!(entry.terminator_targets(&context).len(), 3);
    let cfg = ControlFlowGraph::new(function);
    cfg.build(&mut context).unwrap();
    assert_eq!(entry.succ_iter(&context).count(), 2);
    assert_eq!(case_blk.num_predecessors(&context), 1);
}

#[test]
fn diamond_dominators() {
    let mut context = Context::new();
    let (function, entry, then_blk, else_blk, end_blk) = build_diamond(&mut context);

    let cfg = ControlFlowGraph::new(function);
    cfg.build(&mut context).unwrap();
    cfg.compute_dominators(&mut context);
    cfg.compute_immediate_dominators(&mut context);
    cfg.compute_dominance_frontier(&mut context);

    // The join is dominated by the entry but by neither arm.
    assert!(end_blk.is_dominated_by(&context, &entry));
    assert!(end_blk.is_dominated_by(&context, &end_blk));
    assert!(!end_blk.is_dominated_by(&context, &then_blk));
    assert!(!end_blk.is_dominated_by(&context, &else_blk));

    assert_eq!(entry.immediate_dominator(&context), None);
    assert_eq!(then_blk.immediate_dominator(&context), Some(entry));
    assert_eq!(else_blk.immediate_dominator(&context), Some(entry));
    assert_eq!(end_blk.immediate_dominator(&context), Some(entry));

    assert!(then_blk.dominance_frontier(&context).contains(&end_blk));
    assert!(else_blk.dominance_frontier(&context).contains(&end_blk));
    assert!(entry.dominance_frontier(&context).is_empty());
    assert!(end_blk.dominance_frontier(&context).is_empty());
}

#[test]
fn diamond_traversals_and_depths() {
    let mut context = Context::new();
    let (function, entry, then_blk, else_blk, end_blk) = build_diamond(&mut context);

    let cfg = ControlFlowGraph::new(function);
    cfg.build(&mut context).unwrap();

    let depths = cfg.compute_block_depths(&context);
    assert_eq!(depths[&entry], 0);
    assert_eq!(depths[&then_blk], 1);
    assert_eq!(depths[&else_blk], 1);
    assert_eq!(depths[&end_blk], 2);

    // Successors are explored in terminator order.
    let dfs = cfg.depth_first_traversal(&context);
    assert_eq!(dfs, vec![entry, then_blk, end_blk, else_blk]);

    let bfs = cfg.breadth_first_traversal(&context);
    assert_eq!(bfs, vec![entry, then_blk, else_blk, end_blk]);

    let post = cfg.post_order(&context);
    assert_eq!(post.len(), 4);
    assert_eq!(*post.last().unwrap(), entry);
    assert_eq!(post[0], end_blk);

    let rpo = cfg.reverse_post_order(&context);
    assert_eq!(rpo[0], entry);
    assert_eq!(*rpo.last().unwrap(), end_blk);
    // Every block appears before its (forward) successors.
    let pos = |blk: Block| rpo.iter().position(|b| *b == blk).unwrap();
    assert!(pos(entry) < pos(then_blk));
    assert!(pos(then_blk) < pos(end_blk));
    assert!(pos(else_blk) < pos(end_blk));
}

#[test]
fn single_loop_identification() {
    let mut context = Context::new();
    let int_ty = Type::get_int(&mut context, 64);
    let function = new_module_function(&mut context, vec![("n".to_owned(), int_ty)]);
    let entry = function.get_entry_block(&context);
    let header = function.create_block(&mut context, Some("header".to_owned()));
    let body = function.create_block(&mut context, Some("body".to_owned()));
    let exit = function.create_block(&mut context, Some("exit".to_owned()));

    entry.append(&mut context).branch(header);
    let n = function.get_arg(&context, "n").unwrap();
    let ten = Constant::get_int(&mut context, 64, 10);
    let cond = header
        .append(&mut context)
        .cmp(Predicate::LessThan, n, ten);
    header
        .append(&mut context)
        .conditional_branch(cond, body, exit);
    body.append(&mut context).branch(header);
    append_ret_zero(&mut context, exit);

    let cfg = ControlFlowGraph::new(function);
    cfg.build(&mut context).unwrap();
    cfg.compute_dominators(&mut context);
    cfg.compute_immediate_dominators(&mut context);

    assert_eq!(cfg.find_back_edges(&context), vec![(body, header)]);

    let loops = cfg.identify_loops(&context);
    assert_eq!(loops.len(), 1);
    assert_eq!(loops[0].len(), 2);
    assert!(loops[0].contains(&header));
    assert!(loops[0].contains(&body));

    assert!(body.is_dominated_by(&context, &header));
    assert_eq!(exit.immediate_dominator(&context), Some(header));
    assert!(cfg.is_reducible(&context));
}

#[test]
fn irreducible_graph_is_detected() {
    let mut context = Context::new();
    let function = new_module_function(&mut context, Vec::new());
    let entry = function.get_entry_block(&context);
    let left = function.create_block(&mut context, Some("left".to_owned()));
    let right = function.create_block(&mut context, Some("right".to_owned()));

    // A two-block cycle entered from both sides: neither member dominates
    // the other.
    let cond = Constant::get_bool(&mut context, true);
    entry.append(&mut context).conditional_branch(cond, left, right);
    left.append(&mut context).branch(right);
    right.append(&mut context).branch(left);

    let cfg = ControlFlowGraph::new(function);
    cfg.build(&mut context).unwrap();
    cfg.compute_dominators(&mut context);
    assert!(cfg.find_back_edges(&context).is_empty());
    assert!(!cfg.is_reducible(&context));
}

#[test]
fn unreachable_blocks_are_removed() {
    let mut context = Context::new();
    let function = new_module_function(&mut context, Vec::new());
    let entry = function.get_entry_block(&context);
    let orphan = function.create_block(&mut context, Some("orphan".to_owned()));

    append_ret_zero(&mut context, entry);
    append_ret_zero(&mut context, orphan);

    let cfg = ControlFlowGraph::new(function);
    cfg.build(&mut context).unwrap();
    assert_eq!(cfg.find_unreachable_blocks(&context), vec![orphan]);

    let removed = cfg.remove_unreachable_blocks(&mut context).unwrap();
    assert_eq!(removed, 1);
    assert_eq!(function.num_blocks(&context), 1);
    assert!(cfg.find_unreachable_blocks(&context).is_empty());
}
