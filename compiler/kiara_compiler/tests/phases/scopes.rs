//! Overload visibility across nested scopes.

use kiara_compiler::{BuildErrorKind, CallRequest};
use kiara_ir::{Node, PrimValue};
use kiara_types::{Idx, World};
use pretty_assertions::assert_eq;

use crate::common::{builder, callee, declare, int};

fn double(value: f64) -> Node {
    Node::literal(PrimValue::Double(value))
}

fn overload_count(builder: &kiara_compiler::IrBuilder<'_>, name: &str) -> usize {
    builder
        .scope()
        .lookup_local(name)
        .and_then(|b| b.as_overloads().map(|set| set.borrow().len()))
        .unwrap_or(0)
}

#[test]
fn overloads_added_in_a_child_stay_there() {
    let world = World::new();
    let mut builder = builder(&world);
    let print_int = declare(&builder, "print", Idx::VOID, &[("v", Idx::I32)]);

    {
        let guard = builder.scope_guard("body");
        let print_double = declare(&guard, "print", Idx::VOID, &[("v", Idx::DOUBLE)]);
        assert_eq!(overload_count(&guard, "print"), 2);

        let call = guard
            .create_call(CallRequest::new("print"), vec![double(1.5)])
            .unwrap();
        assert_eq!(callee(&call), Some(print_double));
        let call = guard
            .create_call(CallRequest::new("print"), vec![int(1)])
            .unwrap();
        assert_eq!(callee(&call), Some(print_int.clone()));
    }

    assert_eq!(overload_count(&builder, "print"), 1);
    let err = builder
        .create_call(CallRequest::new("print"), vec![double(1.5)])
        .unwrap_err();
    assert!(matches!(err.kind, BuildErrorKind::NoMatchingFunction { .. }));
    let call = builder
        .create_call(CallRequest::new("print"), vec![int(1)])
        .unwrap();
    assert_eq!(callee(&call), Some(print_int));
}

#[test]
fn sibling_scopes_do_not_share_overloads() {
    let world = World::new();
    let mut builder = builder(&world);
    declare(&builder, "emit", Idx::VOID, &[("v", Idx::I32)]);

    let left = builder.push_scope("left");
    declare(&builder, "emit", Idx::VOID, &[("v", Idx::I64)]);
    builder.pop_scope();
    let right = builder.push_scope("right");
    declare(&builder, "emit", Idx::VOID, &[("v", Idx::DOUBLE)]);
    builder.pop_scope();

    let long = Node::literal(PrimValue::I64(1));
    assert!(builder
        .create_call(CallRequest::new("emit").in_scope(left.clone()), vec![long.clone()])
        .is_ok());
    assert!(builder
        .create_call(CallRequest::new("emit").in_scope(right.clone()), vec![long])
        .is_err());
    assert!(builder
        .create_call(CallRequest::new("emit").in_scope(left), vec![double(0.0)])
        .is_err());
    assert!(builder
        .create_call(CallRequest::new("emit").in_scope(right), vec![double(0.0)])
        .is_ok());
}

#[test]
fn redeclaring_in_a_child_is_rejected() {
    let world = World::new();
    let mut builder = builder(&world);
    declare(&builder, "f", Idx::VOID, &[("v", Idx::I32)]);

    let guard = builder.scope_guard("inner");
    let proto = kiara_ir::Prototype::mangled(&world, "f", Idx::VOID, vec![("w".to_owned(), Idx::I32)]);
    let again = Node::extern_function(std::rc::Rc::new(proto));
    let err = guard.add_function(&again).unwrap_err();
    assert!(matches!(err.kind, BuildErrorKind::AlreadyOverloaded { .. }));
}
