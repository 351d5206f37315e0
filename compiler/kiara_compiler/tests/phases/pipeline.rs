//! Statements driven through compiler phases.

use std::cell::RefCell;
use std::rc::Rc;

use kiara_compiler::{
    CompilationContext, Compiler, ParserPhase, PipelineError, ReplacePhase, SubstituteBuiltins,
    PARSER_RESULT,
};
use kiara_ir::{Node, VisitError};
use kiara_types::{Idx, World};
use pretty_assertions::assert_eq;

use crate::common::{builtin_call, constant, Sink};

fn statement(world: &World, ty: Idx) -> Node {
    Node::block("stmt", vec![builtin_call(world, "sizeof", ty)])
}

fn first_constant(stmt: &Node) -> Option<u64> {
    let first = stmt.as_block()?.exprs().get(0)?;
    constant(&first)
}

#[test]
fn builtins_are_substituted_per_statement() {
    let world = World::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let statements = vec![
        statement(&world, Idx::I8),
        statement(&world, world.ptr(Idx::VOID)),
        statement(&world, Idx::C_INT),
    ];

    let mut compiler = Compiler::new();
    compiler.add_phase(ParserPhase::new(statements.into_iter().peekable()));
    compiler.add_phase(ReplacePhase::new(SubstituteBuiltins::new(&world)));
    compiler.add_phase(Sink(Rc::clone(&seen)));

    let mut ctx = CompilationContext::new();
    compiler.run(&mut ctx).unwrap();

    assert!(ctx.is_end_of_compilation());
    assert!(!ctx.has(PARSER_RESULT));
    let sizes: Vec<Option<u64>> = seen.borrow().iter().map(first_constant).collect();
    assert_eq!(sizes, vec![Some(1), Some(8), Some(4)]);
}

#[test]
fn a_failing_pass_stops_the_run() {
    let world = World::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let statements = vec![
        statement(&world, Idx::I8),
        Node::block("bad", vec![builtin_call(&world, "alignof", Idx::I8)]),
        statement(&world, Idx::I16),
    ];

    let mut compiler = Compiler::new();
    compiler.add_phase(ParserPhase::new(statements.into_iter().peekable()));
    compiler.add_phase(ReplacePhase::new(SubstituteBuiltins::new(&world)));
    compiler.add_phase(Sink(Rc::clone(&seen)));

    let mut ctx = CompilationContext::new();
    let err = compiler.run(&mut ctx).unwrap_err();

    let PipelineError::Visit(VisitError::Failed(msg)) = &err else {
        panic!("unexpected error: {err}");
    };
    assert!(msg.starts_with("Unsupported builtin intrinsic: "));
    assert_eq!(seen.borrow().len(), 1);
    assert_eq!(ctx.phase(), 0);
    assert!(!ctx.is_end_of_compilation());
}
