//! Property tests of argument conversion.

use kiara_compiler::IrBuilder;
use kiara_ir::{Node, PrimValue};
use kiara_types::{Idx, World};
use proptest::prelude::*;

use crate::common::builder;

fn prim_strategy() -> impl Strategy<Value = Idx> {
    prop::sample::select(vec![
        Idx::I8,
        Idx::U8,
        Idx::I16,
        Idx::I32,
        Idx::U32,
        Idx::I64,
        Idx::U64,
        Idx::DOUBLE,
        Idx::BOOLEAN,
    ])
}

/// `base` wrapped in one pointer or array layer per step of `shape`.
fn wrapped(world: &World, base: Idx, shape: &[u8]) -> Idx {
    shape.iter().fold(base, |ty, step| match step % 3 {
        0 => world.ptr(ty),
        1 => world.array(ty),
        _ => world.fixed_array(ty, 4),
    })
}

fn convert(builder: &IrBuilder<'_>, value: &Node, dest: Idx) -> (Option<Node>, u32) {
    let mut conversions = 0;
    let converted = builder.convert_value(value, dest, &mut conversions).ok();
    (converted, conversions)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    #[test]
    fn conversion_is_deterministic(
        src in prim_strategy(),
        dest in prim_strategy(),
        src_shape in prop::collection::vec(any::<u8>(), 0..3),
        dest_shape in prop::collection::vec(any::<u8>(), 0..3),
    ) {
        let world = World::new();
        let builder = builder(&world);
        let src = wrapped(&world, src, &src_shape);
        let dest = wrapped(&world, dest, &dest_shape);
        let value = builder.create_variable_in_scope("v", src).unwrap();

        let (first, first_count) = convert(&builder, &value, dest);
        let (second, second_count) = convert(&builder, &value, dest);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first_count, second_count);
        prop_assert!(first_count <= 1);
        if src == dest {
            prop_assert_eq!(first, Some(value));
            prop_assert_eq!(first_count, 0);
        }
    }

    #[test]
    fn pointers_decay_to_void_pointer_at_a_cost(
        base in prim_strategy(),
        shape in prop::collection::vec(any::<u8>(), 0..3),
    ) {
        let world = World::new();
        let builder = builder(&world);
        let ty = world.ptr(wrapped(&world, base, &shape));
        let value = builder.create_variable_in_scope("p", ty).unwrap();

        let (converted, conversions) = convert(&builder, &value, world.c_void_ptr());
        prop_assert_eq!(converted, Some(value));
        prop_assert_eq!(conversions, 1);
    }

    #[test]
    fn anything_converts_to_any(base in prim_strategy()) {
        let world = World::new();
        let builder = builder(&world);
        let value = Node::literal(PrimValue::zero(&world, base).unwrap());

        let (converted, conversions) = convert(&builder, &value, Idx::ANY);
        prop_assert_eq!(converted, Some(value));
        prop_assert_eq!(conversions, 0);
    }
}
