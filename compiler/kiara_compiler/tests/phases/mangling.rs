//! Property tests of mangled names and the resolution built on them.

use kiara_compiler::{CallRequest, IrBuilder};
use kiara_ir::{Mangler, Node, PrimValue, Prototype};
use kiara_types::{Idx, World};
use proptest::prelude::*;

use crate::common::{callee, declare};

fn prim_strategy() -> impl Strategy<Value = Idx> {
    prop::sample::select(vec![
        Idx::I8,
        Idx::U8,
        Idx::I16,
        Idx::U16,
        Idx::I32,
        Idx::U32,
        Idx::I64,
        Idx::U64,
        Idx::FLOAT,
        Idx::DOUBLE,
        Idx::BOOLEAN,
    ])
}

fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,12}").expect("valid regex")
}

fn zero_args(world: &World, params: &[Idx]) -> Vec<Node> {
    params
        .iter()
        .map(|ty| Node::literal(PrimValue::zero(world, *ty).unwrap()))
        .collect()
}

fn named_args(params: &[Idx]) -> Vec<(String, Idx)> {
    params
        .iter()
        .enumerate()
        .map(|(i, ty)| (format!("a{i}"), *ty))
        .collect()
}

fn borrowed(args: &[(String, Idx)]) -> Vec<(&str, Idx)> {
    args.iter().map(|(n, ty)| (n.as_str(), *ty)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    #[test]
    fn mangled_names_are_stable(
        name in name_strategy(),
        params in prop::collection::vec(prim_strategy(), 0..5),
    ) {
        let first = World::new();
        let second = World::new();
        let mangled = Mangler::new(&first).mangle_function(&name, &params);

        prop_assert_eq!(&mangled, &Mangler::new(&second).mangle_function(&name, &params));
        prop_assert_eq!(&mangled, &Mangler::new(&first).mangle_call(&name, &zero_args(&first, &params)));

        let proto = Prototype::mangled(&first, &name, Idx::VOID, named_args(&params));
        prop_assert_eq!(&mangled, &*proto.mangled_name());
    }

    #[test]
    fn different_signatures_mangle_differently(
        name in name_strategy(),
        a in prop::collection::vec(prim_strategy(), 0..4),
        b in prop::collection::vec(prim_strategy(), 0..4),
    ) {
        prop_assume!(a != b);
        let world = World::new();
        let mangler = Mangler::new(&world);
        prop_assert_ne!(mangler.mangle_function(&name, &a), mangler.mangle_function(&name, &b));
    }

    #[test]
    fn exact_overload_always_wins(
        params in prop::collection::vec(prim_strategy(), 1..4),
        others in prop::collection::vec(prop::collection::vec(prim_strategy(), 1..4), 0..4),
    ) {
        let world = World::new();
        let builder = IrBuilder::new(&world);
        let expected = declare(&builder, "f", Idx::VOID, &borrowed(&named_args(&params)));

        let mut declared = vec![params.clone()];
        for other in others {
            if declared.contains(&other) {
                continue;
            }
            declare(&builder, "f", Idx::VOID, &borrowed(&named_args(&other)));
            declared.push(other);
        }

        let call = builder
            .create_call(CallRequest::new("f"), zero_args(&world, &params))
            .unwrap();
        prop_assert_eq!(callee(&call), Some(expected));
    }
}
