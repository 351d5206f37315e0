//! Overload resolution and argument conversion.

use kiara_compiler::{BuildErrorKind, CallMode, CallRequest};
use kiara_ir::{printer, Node, PrimValue, SourceLocation};
use kiara_types::{Idx, World};
use pretty_assertions::assert_eq;

use crate::common::{builder, call_args, callee, declare, int};

#[test]
fn literal_add_picks_the_exact_overload() {
    let world = World::new();
    let builder = builder(&world);
    let add_i32 = declare(&builder, "add", Idx::I32, &[("a", Idx::I32), ("b", Idx::I32)]);
    declare(&builder, "add", Idx::I64, &[("a", Idx::I64), ("b", Idx::I64)]);
    declare(&builder, "add", Idx::DOUBLE, &[("a", Idx::DOUBLE), ("b", Idx::DOUBLE)]);

    let (one, two) = (int(1), int(2));
    let call = builder
        .create_call(CallRequest::new("add"), vec![one.clone(), two.clone()])
        .unwrap();

    assert_eq!(callee(&call), Some(add_i32));
    assert_eq!(call.ty(), Idx::I32);
    assert_eq!(call_args(&call), vec![one, two]);
}

#[test]
fn typedef_parameters_accept_their_target() {
    let world = World::new();
    let builder = builder(&world);
    let int_ty = builder.lookup_type("int").unwrap();
    let add = declare(&builder, "add", int_ty, &[("a", int_ty), ("b", int_ty)]);

    let call = builder
        .create_call(CallRequest::new("add"), vec![int(1), int(2)])
        .unwrap();
    assert_eq!(callee(&call), Some(add));
}

#[test]
fn coercion_failure_lists_candidates() {
    let world = World::new();
    let builder = builder(&world);
    let f = declare(&builder, "f", Idx::VOID, &[("x", Idx::DOUBLE)]);

    let location = Some(SourceLocation::new(7, 3));
    let err = builder
        .create_call(CallRequest::new("f").at(location), vec![int(1)])
        .unwrap_err();

    assert_eq!(err.location, location);
    let BuildErrorKind::NoMatchingFunction { candidates, .. } = &err.kind else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(candidates, &vec![printer::to_string(&world, &f)]);

    let text = err.to_string();
    assert!(text.starts_with("7:3: no matching function for call to 'f' (mangled '"));
    assert!(text.contains("arguments: (i32),\ncandidates:\n"));
}

#[test]
fn strict_mode_rejects_conversions() {
    let world = World::new();
    let builder = builder(&world);
    declare(&builder, "take", Idx::VOID, &[("p", world.c_void_ptr())]);
    let p = builder.create_variable_in_scope("p", world.ptr(Idx::U8)).unwrap();

    assert!(builder
        .create_call(CallRequest::new("take"), vec![p.clone()])
        .is_ok());
    let strict = CallRequest::new("take").mode(CallMode::NoTypeConversion);
    assert!(builder.create_call(strict, vec![p]).is_err());
}

#[test]
fn reference_parameters_bind_variables() {
    let world = World::new();
    let builder = builder(&world);
    let ref_i32 = world.reference(Idx::I32);
    let inc = declare(&builder, "inc", Idx::VOID, &[("r", ref_i32)]);
    let x = builder.create_variable_in_scope("x", Idx::I32).unwrap();

    let call = builder
        .create_call(CallRequest::new("inc"), vec![x.clone()])
        .unwrap();
    assert_eq!(callee(&call), Some(inc));

    let args = call_args(&call);
    assert_eq!(args.len(), 1);
    assert_eq!(args[0].ty(), ref_i32);
    assert_eq!(args[0].as_mem_ref().and_then(|m| m.value()), Some(x.clone()));
    assert_eq!(x.reference(&world), Some(args[0].clone()));

    let err = builder
        .create_call(CallRequest::new("inc"), vec![int(1)])
        .unwrap_err();
    assert!(matches!(err.kind, BuildErrorKind::NoMatchingFunction { .. }));
}

#[test]
fn strings_and_null_pass_as_pointers() {
    let world = World::new();
    let builder = builder(&world);
    let puts = declare(&builder, "puts", Idx::I32, &[("s", world.c_char_ptr())]);

    let hello = Node::literal(PrimValue::String("hello".to_owned()));
    let call = builder
        .create_call(CallRequest::new("puts"), vec![hello])
        .unwrap();
    assert_eq!(callee(&call), Some(puts.clone()));

    let null = Node::literal(PrimValue::NullPtr);
    let call = builder
        .create_call(CallRequest::new("puts"), vec![null])
        .unwrap();
    assert_eq!(callee(&call), Some(puts));
}

#[test]
fn explicit_scope_is_searched() {
    let world = World::new();
    let mut builder = builder(&world);
    let root = std::rc::Rc::clone(builder.scope());
    let child = builder.push_scope("module");
    let local = declare(&builder, "local", Idx::VOID, &[]);
    builder.pop_scope();

    assert!(builder
        .create_call(CallRequest::new("local"), Vec::new())
        .is_err());
    let call = builder
        .create_call(CallRequest::new("local").in_scope(child), Vec::new())
        .unwrap();
    assert_eq!(callee(&call), Some(local));
    assert!(root.lookup_local("local").is_none());
}
