use super::*;
use kiara_types::StructField;
use pretty_assertions::assert_eq;

fn extern_fn(world: &World, name: &str, ret: Idx, args: &[(&str, Idx)]) -> Node {
    let args = args.iter().map(|(n, ty)| ((*n).to_owned(), *ty)).collect();
    Node::extern_function(Rc::new(Prototype::mangled(world, name, ret, args)))
}

fn callee_of(call: &Node) -> Option<Node> {
    call.as_call().and_then(|call| call.called_function())
}

#[test]
fn scope_stack_push_pop() {
    let world = World::new();
    let mut builder = IrBuilder::new(&world);
    let root = Rc::clone(builder.scope());

    let child = builder.push_scope("fn");
    assert_eq!(builder.depth(), 2);
    assert_eq!(child.full_name(), "global.fn");
    assert!(builder.pop_scope().is_some());
    assert!(Rc::ptr_eq(builder.scope(), &root));
    assert!(builder.pop_scope().is_none());
}

#[test]
fn scope_guard_restores_on_drop() {
    let world = World::new();
    let mut builder = IrBuilder::new(&world);
    {
        let mut guard = builder.scope_guard("block");
        guard.push_scope("inner");
        assert_eq!(guard.depth(), 3);
    }
    assert_eq!(builder.depth(), 1);
}

#[test]
fn default_types() {
    let world = World::new();
    let builder = IrBuilder::new(&world);
    IrBuilder::register_default_types(builder.scope()).unwrap();

    assert_eq!(builder.lookup_type("int"), Some(Idx::C_INT));
    assert_eq!(builder.lookup_type("uint64_t"), Some(Idx::U64));
    assert_eq!(builder.lookup_type("u16"), Some(Idx::U16));
    assert_eq!(builder.lookup_type("float"), Some(Idx::C_FLOAT));
    assert_eq!(builder.lookup_type("string"), Some(Idx::STRING));
    assert_eq!(builder.lookup_type("nope"), None);

    let ty = builder.lookup_expr("size_t").unwrap();
    assert_eq!(ty.as_type_expr().map(|t| t.type_value()), Some(Idx::C_SIZE_T));
}

#[test]
fn variables_shadowing_is_rejected() {
    let world = World::new();
    let mut builder = IrBuilder::new(&world);
    let x = builder.create_variable_in_scope("x", Idx::I32).unwrap();
    assert_eq!(builder.lookup_expr("x"), Some(x));

    let guard = builder.scope_guard("inner");
    let err = guard.create_variable_in_scope("x", Idx::I64).unwrap_err();
    assert!(matches!(err.kind, BuildErrorKind::AlreadyBound { ref name, .. } if name == "x"));
    assert!(err.to_string().starts_with("Symbol 'x' is already bound to : "));
}

#[test]
fn lookup_function_needs_a_single_overload() {
    let world = World::new();
    let builder = IrBuilder::new(&world);
    let f = extern_fn(&world, "f", Idx::VOID, &[("a", Idx::I32)]);
    builder.add_function(&f).unwrap();
    assert_eq!(builder.lookup_function("f"), Some(f));

    let g = extern_fn(&world, "f", Idx::VOID, &[("a", Idx::DOUBLE)]);
    builder.add_function(&g).unwrap();
    assert_eq!(builder.lookup_function("f"), None);
}

#[test]
fn overloads_are_copied_into_nested_scopes() {
    let world = World::new();
    let mut builder = IrBuilder::new(&world);
    let root = Rc::clone(builder.scope());
    builder
        .add_function(&extern_fn(&world, "f", Idx::VOID, &[("a", Idx::I32)]))
        .unwrap();

    let child = builder.push_scope("child");
    builder
        .add_function(&extern_fn(&world, "f", Idx::VOID, &[("a", Idx::DOUBLE)]))
        .unwrap();

    let count = |scope: &Rc<Scope>| {
        scope
            .lookup_local("f")
            .and_then(|b| b.as_overloads().map(|set| set.borrow().len()))
    };
    assert_eq!(count(&root), Some(1));
    assert_eq!(count(&child), Some(2));
}

#[test]
fn duplicate_overload_is_rejected() {
    let world = World::new();
    let builder = IrBuilder::new(&world);
    builder
        .add_function(&extern_fn(&world, "f", Idx::VOID, &[("a", Idx::I32)]))
        .unwrap();
    let err = builder
        .add_function(&extern_fn(&world, "f", Idx::VOID, &[("b", Idx::I32)]))
        .unwrap_err();

    assert!(matches!(err.kind, BuildErrorKind::AlreadyOverloaded { .. }));
    assert!(err
        .to_string()
        .starts_with("Function 'f' is already overloaded with signature : "));
}

#[test]
fn function_over_a_variable_is_rejected() {
    let world = World::new();
    let builder = IrBuilder::new(&world);
    builder.create_variable_in_scope("f", Idx::I32).unwrap();
    let err = builder
        .add_function(&extern_fn(&world, "f", Idx::VOID, &[]))
        .unwrap_err();
    assert_eq!(err.kind, BuildErrorKind::NotAFunction("f".to_owned()));
}

#[test]
fn function_scope_binds_arguments() {
    let world = World::new();
    let mut builder = IrBuilder::new(&world);
    let proto = Prototype::mangled(
        &world,
        "add",
        Idx::I32,
        vec![("a".to_owned(), Idx::I32), ("b".to_owned(), Idx::I32)],
    );
    let func = Node::function(&world, Rc::new(proto), None).unwrap();

    let guard = builder.scope_guard("add");
    guard.init_function_scope(&func).unwrap();
    assert!(guard.lookup_expr("a").is_some());
    assert!(guard.lookup_expr("b").is_some());
    assert_eq!(guard.lookup_function("add"), Some(func));
}

#[test]
fn exact_call() {
    let world = World::new();
    let builder = IrBuilder::new(&world);
    let add = extern_fn(&world, "add", Idx::I32, &[("a", Idx::I32), ("b", Idx::I32)]);
    builder.add_function(&add).unwrap();

    let args = vec![
        builder.create_literal(PrimValue::I32(1)),
        builder.create_literal(PrimValue::I32(2)),
    ];
    let location = Some(kiara_ir::SourceLocation::new(4, 2));
    let call = builder
        .create_call(CallRequest::new("add").at(location), args)
        .unwrap();

    assert_eq!(callee_of(&call), Some(add));
    assert_eq!(call.ty(), Idx::I32);
    assert_eq!(call.location(), location);
}

#[test]
fn missing_function() {
    let world = World::new();
    let builder = IrBuilder::new(&world);
    let err = builder
        .create_call(
            CallRequest::new("nothing"),
            vec![builder.create_literal(PrimValue::Boolean(true))],
        )
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "no function 'nothing' for arguments (boolean) declared"
    );
}

#[test]
fn no_matching_overload_lists_candidates() {
    let world = World::new();
    let builder = IrBuilder::new(&world);
    builder
        .add_function(&extern_fn(&world, "f", Idx::VOID, &[("x", Idx::DOUBLE)]))
        .unwrap();

    let err = builder
        .create_call(
            CallRequest::new("f"),
            vec![builder.create_literal(PrimValue::I32(1))],
        )
        .unwrap_err();
    let BuildErrorKind::NoMatchingFunction { callee, args, candidates } = &err.kind else {
        panic!("unexpected error: {err}");
    };
    let mangled = kiara_ir::Mangler::new(&world).mangle_function("f", &[Idx::I32]);
    assert_eq!(callee, &format!("'f' (mangled '{mangled}')"));
    assert_eq!(args, "i32");
    assert_eq!(candidates.len(), 1);
    assert!(err
        .to_string()
        .starts_with("no matching function for call to 'f'"));
}

#[test]
fn zero_conversion_candidate_wins() {
    let world = World::new();
    let builder = IrBuilder::new(&world);
    let ptr_i32 = world.ptr(Idx::I32);
    let by_void = extern_fn(&world, "g", Idx::VOID, &[("p", world.c_void_ptr())]);
    let by_any = extern_fn(&world, "g", Idx::VOID, &[("p", Idx::ANY)]);
    builder.add_function(&by_void).unwrap();
    builder.add_function(&by_any).unwrap();

    let p = builder.create_variable_in_scope("p", ptr_i32).unwrap();
    let call = builder.create_call(CallRequest::new("g"), vec![p]).unwrap();
    assert_eq!(callee_of(&call), Some(by_any));
}

#[test]
fn equal_conversions_are_ambiguous() {
    let world = World::new();
    let builder = IrBuilder::new(&world);
    let void_ptr = world.c_void_ptr();
    builder
        .add_function(&extern_fn(&world, "g", Idx::VOID, &[("a", Idx::ANY), ("b", void_ptr)]))
        .unwrap();
    builder
        .add_function(&extern_fn(&world, "g", Idx::VOID, &[("a", void_ptr), ("b", Idx::ANY)]))
        .unwrap();

    let p = builder.create_variable_in_scope("p", world.ptr(Idx::I32)).unwrap();
    let err = builder
        .create_call(CallRequest::new("g"), vec![p.clone(), p])
        .unwrap_err();
    let BuildErrorKind::Ambiguous { name, candidates } = &err.kind else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(name, "g");
    assert_eq!(candidates.len(), 2);
}

#[test]
fn two_exact_candidates_are_ambiguous() {
    let world = World::new();
    let builder = IrBuilder::new(&world);
    builder
        .add_function(&extern_fn(&world, "h", Idx::VOID, &[("a", Idx::ANY)]))
        .unwrap();
    builder
        .add_function(&extern_fn(&world, "h", Idx::VOID, &[("a", world.reference(Idx::I32))]))
        .unwrap();

    let x = builder.create_variable_in_scope("x", Idx::I32).unwrap();
    let overloads = builder.scope().lookup_local("h").unwrap();
    let functions = overloads.as_overloads().unwrap().borrow().functions();
    for candidate in functions {
        let param = candidate.as_function().unwrap().proto().arg_types()[0];
        let mut conversions = 0;
        builder.convert_value(&x, param, &mut conversions).unwrap();
        assert_eq!(conversions, 0);
    }

    let err = builder
        .create_call(CallRequest::new("h"), vec![x])
        .unwrap_err();
    let BuildErrorKind::Ambiguous { name, candidates } = &err.kind else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(name, "h");
    assert_eq!(candidates.len(), 2);
}

#[test]
fn indirect_call_through_function_pointer() {
    let world = World::new();
    let builder = IrBuilder::new(&world);
    let fn_ptr = world.ptr(world.function(Idx::I32, &[Idx::I32]));
    let callback = builder.create_variable_in_scope("cb", fn_ptr).unwrap();

    let call = builder
        .create_call(
            CallRequest::new("cb"),
            vec![builder.create_literal(PrimValue::I32(3))],
        )
        .unwrap();
    assert_eq!(call.as_call().and_then(|c| c.callee()), Some(callback));
    assert_eq!(call.ty(), Idx::I32);

    let err = builder
        .create_call(
            CallRequest::new("cb"),
            vec![builder.create_literal(PrimValue::Boolean(false))],
        )
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "no matching function for call to 'cb', arguments: (boolean), no candidates !"
    );
}

#[test]
fn value_called_through_call_method() {
    let world = World::new();
    let builder = IrBuilder::new(&world);
    let obj = builder.create_variable_in_scope("obj", Idx::I64).unwrap();

    let err = builder
        .create_call(CallRequest::new("obj"), Vec::new())
        .unwrap_err();
    assert!(matches!(err.kind, BuildErrorKind::NoCallMethod { .. }));

    let call_method = extern_fn(&world, "__call__", Idx::I32, &[("self", Idx::I64)]);
    builder.add_function(&call_method).unwrap();
    let call = builder
        .create_call(CallRequest::new("obj"), Vec::new())
        .unwrap();
    assert_eq!(callee_of(&call), Some(call_method));
    assert_eq!(
        call.as_call().and_then(|c| c.args().get(0)),
        Some(obj)
    );
}

#[test]
fn type_names_are_not_callable() {
    let world = World::new();
    let builder = IrBuilder::new(&world);
    IrBuilder::register_default_types(builder.scope()).unwrap();
    let err = builder
        .create_call(CallRequest::new("int"), Vec::new())
        .unwrap_err();
    assert!(matches!(err.kind, BuildErrorKind::NotAnExpression { .. }));
}

#[test]
fn conversions() {
    let world = World::new();
    let builder = IrBuilder::new(&world);
    let mut conversions = 0;

    let x = builder.create_variable("x", Idx::I32);
    let as_ref = builder
        .convert_value(&x, world.reference(Idx::I32), &mut conversions)
        .unwrap();
    assert_eq!(as_ref.ty(), world.reference(Idx::I32));
    assert_eq!(x.reference(&world), Some(as_ref));

    let s = builder.create_literal(PrimValue::String("hi".to_owned()));
    assert!(builder
        .convert_value(&s, world.c_char_ptr(), &mut conversions)
        .is_ok());

    let null = builder.create_literal(PrimValue::NullPtr);
    assert!(builder
        .convert_value(&null, world.ptr(Idx::DOUBLE), &mut conversions)
        .is_ok());

    let arr = builder.create_variable("arr", world.fixed_array(Idx::U8, 4));
    assert!(builder
        .convert_value(&arr, world.ptr(Idx::U8), &mut conversions)
        .is_ok());
    assert_eq!(conversions, 0);

    let p = builder.create_variable("p", world.ptr(Idx::I64));
    assert!(builder
        .convert_value(&p, world.c_void_ptr(), &mut conversions)
        .is_ok());
    assert_eq!(conversions, 1);

    let err = builder
        .convert_value(&x, Idx::DOUBLE, &mut conversions)
        .unwrap_err();
    assert_eq!(err.to_string(), "Cannot convert value of type i32 to double");
}

#[test]
fn reference_values_read_through_deref() {
    let world = World::new();
    let builder = IrBuilder::new(&world);
    let ref_i32 = world.reference(Idx::I32);
    let r = builder.create_variable("r", ref_i32);
    let mut conversions = 0;

    assert!(builder.convert_value(&r, Idx::I32, &mut conversions).is_err());

    let mut exprs = Vec::new();
    let deref = builder.create_dereference_code(ref_i32, &mut exprs).unwrap();
    let read = builder.convert_value(&r, Idx::I32, &mut conversions).unwrap();
    assert_eq!(callee_of(&read), Some(deref));
    assert_eq!(read.ty(), Idx::I32);
    assert_eq!(builder.get_dereference(&builder.create_literal(PrimValue::I32(0))), Ok(None));
}

#[test]
fn address_of_is_synthesized_once() {
    let world = World::new();
    let builder = IrBuilder::new(&world);
    let ref_i32 = world.reference(Idx::I32);
    let mut exprs = Vec::new();

    let amp = builder.create_address_of_code(ref_i32, &mut exprs).unwrap();
    assert_eq!(exprs.len(), 2);
    let again = builder.create_address_of_code(ref_i32, &mut exprs).unwrap();
    assert_eq!(exprs.len(), 2);
    assert_eq!(amp, again);

    let def = amp.as_function().unwrap();
    assert_eq!(def.name(), "&");
    assert!(def.proto().is_operator());
    assert_eq!(def.proto().return_type(), world.ptr(Idx::I32));
    assert!(def.proto().has_attribute("always_inline"));

    let helper = exprs[0].as_function().unwrap();
    assert_eq!(helper.name(), "__addressof__");
    assert!(helper.proto().has_attribute("llvm"));
    assert!(helper.intrinsic_body().is_some_and(|b| b.contains("ret  ${rettype}")));

    let err = builder.create_address_of_code(Idx::I32, &mut exprs).unwrap_err();
    assert_eq!(err.to_string(), "Type i32 is not a reference");
}

#[test]
fn helpers_live_in_the_top_scope() {
    let world = World::new();
    let mut builder = IrBuilder::new(&world);
    let root = Rc::clone(builder.scope());
    let ptr_f = world.ptr(Idx::DOUBLE);
    let mut exprs = Vec::new();
    {
        let guard = builder.scope_guard("nested");
        guard.create_dereference_code(ptr_f, &mut exprs).unwrap();
    }
    assert_eq!(exprs.len(), 2);
    assert!(root.lookup_local("__deref__").is_some());
    assert!(root.lookup_local("*").is_some());

    let deref = builder.create_dereference_code(ptr_f, &mut exprs).unwrap();
    assert_eq!(exprs.len(), 2);
    assert_eq!(
        deref.as_function().map(|f| f.proto().return_type()),
        Some(world.reference(Idx::DOUBLE))
    );
}

#[test]
fn struct_accessors() {
    let world = World::new();
    let builder = IrBuilder::new(&world);
    let point = world.struct_type(
        "Point",
        vec![StructField::new("x", Idx::I32), StructField::new("y", Idx::I64)],
    );
    let mut exprs = Vec::new();

    let accessors = builder.create_struct_code(point, &mut exprs).unwrap();
    assert_eq!(accessors.len(), 2);
    // deref for ptr (with `*`), deref for ref, then `.` and `->` per field
    assert_eq!(exprs.len(), 7);

    let y = accessors[1].as_function().unwrap();
    assert_eq!(y.name(), ".");
    assert_eq!(y.proto().precedence(), 80);
    assert_eq!(y.proto().return_type(), world.reference(Idx::I64));
    assert!(y.intrinsic_body().is_some_and(|b| b.contains("%size_t 8   %r")));

    let err = builder.create_struct_code(Idx::I32, &mut exprs).unwrap_err();
    assert_eq!(err.kind, BuildErrorKind::NotAStruct("i32".to_owned()));
}

#[test]
fn integer_casts() {
    let world = World::new();
    let builder = IrBuilder::new(&world);
    let mut exprs = Vec::new();
    let body = |func: &Node| {
        func.as_function()
            .and_then(|f| f.intrinsic_body().map(str::to_owned))
            .unwrap_or_default()
    };

    let widen = builder.create_cast_code(Idx::I32, Idx::I64, &mut exprs).unwrap();
    assert!(body(&widen).contains("sext"));
    assert_eq!(widen.as_function().map(|f| f.name().to_owned()), Some("to_i64".to_owned()));
    let unsigned = builder.create_cast_code(Idx::U8, Idx::I32, &mut exprs).unwrap();
    assert!(body(&unsigned).contains("zext"));
    let narrow = builder.create_cast_code(Idx::C_LONG, Idx::I16, &mut exprs).unwrap();
    assert!(body(&narrow).contains("trunc"));
    let same = builder.create_cast_code(Idx::U32, Idx::I32, &mut exprs).unwrap();
    assert!(body(&same).contains("ret ${argtype0} %${argname0} } "));

    let ptr = builder
        .create_cast_code(world.ptr(Idx::I8), world.ptr(Idx::U16), &mut exprs)
        .unwrap();
    assert_eq!(ptr.as_function().map(|f| f.name().to_owned()), Some("to_u16_ptr".to_owned()));
    assert!(body(&ptr).contains("bitcast"));

    let err = builder
        .create_cast_code(Idx::DOUBLE, Idx::I32, &mut exprs)
        .unwrap_err();
    assert_eq!(err.to_string(), "Cannot create cast from double to i32");
}

#[test]
fn array_index_and_assignment() {
    let world = World::new();
    let builder = IrBuilder::new(&world);
    let mut exprs = Vec::new();

    let index = builder
        .create_array_index_code(world.ptr(Idx::I32), Idx::U64, &mut exprs)
        .unwrap();
    let def = index.as_function().unwrap();
    assert_eq!(def.name(), "__index__");
    assert_eq!(def.proto().return_type(), world.reference(Idx::I32));
    assert!(def
        .intrinsic_body()
        .is_some_and(|b| b.contains("${argname1}, 4  %add.ptr")));

    assert!(matches!(
        builder.create_array_index_code(Idx::I32, Idx::U64, &mut exprs),
        Err(BuildError { kind: BuildErrorKind::UnsupportedIndex { .. }, .. })
    ));

    let ref_i32 = world.reference(Idx::I32);
    let assign = builder.create_assign_code(ref_i32, Idx::I32, &mut exprs).unwrap();
    let def = assign.as_function().unwrap();
    assert_eq!(def.name(), "=");
    assert_eq!(def.proto().precedence(), 2);
    assert!(def.intrinsic_body().is_some_and(|b| b.contains("store")));

    let err = builder.create_assign_code(Idx::I32, Idx::I32, &mut exprs).unwrap_err();
    assert_eq!(err.to_string(), "Cannot assign to i32, it is not a reference");
}
