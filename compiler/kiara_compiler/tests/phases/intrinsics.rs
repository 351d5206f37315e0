//! Helper synthesis, and calls resolved through the synthesized helpers.

use kiara_compiler::CallRequest;
use kiara_ir::Node;
use kiara_types::{Idx, StructField, World};
use pretty_assertions::assert_eq;

use crate::common::{builder, call_args, callee, declare, int};

fn point(world: &World) -> Idx {
    world.struct_type(
        "Point",
        vec![StructField::new("x", Idx::I32), StructField::new("y", Idx::I64)],
    )
}

#[test]
fn struct_helpers_are_synthesized_once() {
    let world = World::new();
    let mut builder = builder(&world);
    let point = point(&world);
    let mut exprs = Vec::new();

    let first = builder.create_struct_code(point, &mut exprs).unwrap();
    let created = exprs.len();
    assert_eq!(created, 7);

    let second = builder.create_struct_code(point, &mut exprs).unwrap();
    assert_eq!(first, second);
    assert_eq!(exprs.len(), created);

    let guard = builder.scope_guard("nested");
    let third = guard.create_struct_code(point, &mut exprs).unwrap();
    assert_eq!(first, third);
    assert_eq!(exprs.len(), created);
}

#[test]
fn helpers_stay_unique_below_a_shadowing_overload_set() {
    let world = World::new();
    let mut builder = builder(&world);
    let ref_i32 = world.reference(Idx::I32);
    let ptr_u8 = world.ptr(Idx::U8);
    let mut exprs = Vec::new();

    let guard = builder.scope_guard("body");
    let user_deref = declare(&guard, "__deref__", Idx::U8, &[("p", ptr_u8)]);

    let first = guard.create_dereference_code(ref_i32, &mut exprs).unwrap();
    let created = exprs.len();
    let second = guard.create_dereference_code(ref_i32, &mut exprs).unwrap();
    assert_eq!(first, second);
    assert_eq!(exprs.len(), created);

    let p = guard.create_variable_in_scope("p", ptr_u8).unwrap();
    let read = guard
        .create_call(CallRequest::new("__deref__"), vec![p])
        .unwrap();
    assert_eq!(callee(&read), Some(user_deref));
}

#[test]
fn member_access_resolves_the_field_accessor() {
    let world = World::new();
    let builder = builder(&world);
    let point = point(&world);
    let mut exprs = Vec::new();
    let accessors = builder.create_struct_code(point, &mut exprs).unwrap();

    let p = builder.create_variable_in_scope("p", point).unwrap();
    let field = Node::symbol(&world, "y", None);
    let access = builder
        .create_call(CallRequest::new("."), vec![p.clone(), field])
        .unwrap();

    assert_eq!(callee(&access), Some(accessors[1].clone()));
    assert_eq!(access.ty(), world.reference(Idx::I64));
    assert_eq!(call_args(&access)[0], p.reference(&world).unwrap());
}

#[test]
fn reference_arguments_are_read_through_deref() {
    let world = World::new();
    let builder = builder(&world);
    let ref_i32 = world.reference(Idx::I32);
    let add = declare(&builder, "add", Idx::I32, &[("a", Idx::I32), ("b", Idx::I32)]);
    let r = builder.create_variable_in_scope("r", ref_i32).unwrap();

    assert!(builder
        .create_call(CallRequest::new("add"), vec![r.clone(), int(1)])
        .is_err());

    let mut exprs = Vec::new();
    let deref = builder.create_dereference_code(ref_i32, &mut exprs).unwrap();
    let call = builder
        .create_call(CallRequest::new("add"), vec![r.clone(), int(1)])
        .unwrap();

    assert_eq!(callee(&call), Some(add));
    let read = &call_args(&call)[0];
    assert_eq!(callee(read), Some(deref));
    assert_eq!(call_args(read), vec![r]);
}

#[test]
fn pointer_operators() {
    let world = World::new();
    let builder = builder(&world);
    let ptr_double = world.ptr(Idx::DOUBLE);
    let mut exprs = Vec::new();
    builder.create_dereference_code(ptr_double, &mut exprs).unwrap();
    builder
        .create_address_of_code(world.reference(Idx::DOUBLE), &mut exprs)
        .unwrap();

    let p = builder.create_variable_in_scope("p", ptr_double).unwrap();
    let star = builder
        .create_call(CallRequest::new("*"), vec![p])
        .unwrap();
    assert_eq!(star.ty(), world.reference(Idx::DOUBLE));

    let d = builder.create_variable_in_scope("d", Idx::DOUBLE).unwrap();
    let amp = builder
        .create_call(CallRequest::new("&"), vec![d])
        .unwrap();
    assert_eq!(amp.ty(), ptr_double);
}

#[test]
fn assignment_and_indexing() {
    let world = World::new();
    let builder = builder(&world);
    let ref_i64 = world.reference(Idx::I64);
    let mut exprs = Vec::new();
    let assign = builder.create_assign_code(ref_i64, Idx::I64, &mut exprs).unwrap();
    let index = builder
        .create_array_index_code(world.ptr(Idx::I64), Idx::I32, &mut exprs)
        .unwrap();
    assert_eq!(exprs, vec![assign.clone(), index.clone()]);

    let v = builder.create_variable_in_scope("v", Idx::I64).unwrap();
    let store = builder
        .create_call(CallRequest::new("="), vec![v, Node::literal(kiara_ir::PrimValue::I64(9))])
        .unwrap();
    assert_eq!(callee(&store), Some(assign));

    let arr = builder.create_variable_in_scope("arr", world.ptr(Idx::I64)).unwrap();
    let elem = builder
        .create_call(CallRequest::new("__index__"), vec![arr, int(3)])
        .unwrap();
    assert_eq!(callee(&elem), Some(index));
    assert_eq!(elem.ty(), ref_i64);
}
