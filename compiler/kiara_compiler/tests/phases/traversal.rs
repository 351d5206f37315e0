//! Rewriting passes over graphs with break back-edges.

use kiara_compiler::SubstituteBuiltins;
use kiara_ir::replacer;
use kiara_ir::transformer::{self, TransformState, Transformer};
use kiara_ir::visitor::{VisitResult, Visitor};
use kiara_ir::{printer, Node, PrimValue};
use kiara_types::{Idx, World};
use pretty_assertions::{assert_eq, assert_ne};

use crate::common::{builtin_call, constant, int};

/// Doubles every `i32` literal into a fresh node.
struct Doubler<'w> {
    world: &'w World,
    state: TransformState,
}

impl Visitor for Doubler<'_> {
    type Output = Node;

    fn visit_object(&mut self, node: &Node) -> VisitResult<Node> {
        transformer::walk(self, node)
    }

    fn visit_literal(&mut self, node: &Node) -> VisitResult<Node> {
        match node.as_literal().map(|lit| lit.value()) {
            Some(PrimValue::I32(v)) => Ok(int(v * 2)),
            _ => Ok(node.clone()),
        }
    }
}

impl Transformer for Doubler<'_> {
    fn transform_state(&mut self) -> &mut TransformState {
        &mut self.state
    }

    fn world(&self) -> &World {
        self.world
    }
}

/// `loop { first; break }`, returning the loop, its body and the break.
fn breaking_loop(first: Node) -> (Node, Node, Node) {
    let body = Node::block("body", vec![first]);
    let brk = Node::break_expr(&body, None);
    body.as_block().unwrap().add_expr(brk.clone());
    (Node::loop_expr(body.clone()), body, brk)
}

#[test]
fn replacement_terminates_on_loops() {
    let world = World::new();
    let (looped, body, brk) = breaking_loop(builtin_call(&world, "sizeof", Idx::I64));
    let stmt = Node::block("stmt", vec![looped]);

    let mut pass = SubstituteBuiltins::new(&world);
    assert_eq!(replacer::apply(&mut pass, &stmt).unwrap(), stmt);

    let exprs = body.as_block().unwrap().exprs().nodes();
    assert_eq!(constant(&exprs[0]), Some(8));
    assert_eq!(exprs[1], brk);
    assert_eq!(brk.as_break().unwrap().block(), Some(body));
    assert!(!printer::to_string(&world, &stmt).is_empty());
}

#[test]
fn shared_subtree_is_replaced_once() {
    let world = World::new();
    let sizeof = builtin_call(&world, "sizeof", Idx::U16);
    let stmt = Node::block("stmt", vec![sizeof.clone(), sizeof]);

    let mut pass = SubstituteBuiltins::new(&world);
    replacer::apply(&mut pass, &stmt).unwrap();

    let exprs = stmt.as_block().unwrap().exprs().nodes();
    assert_eq!(exprs[0], exprs[1]);
    assert_eq!(constant(&exprs[0]), Some(2));
}

#[test]
fn copied_blocks_keep_their_breaks() {
    let world = World::new();
    let (looped, body, brk) = breaking_loop(int(1));

    let mut doubler = Doubler {
        world: &world,
        state: TransformState::new(),
    };
    let copy = transformer::apply(&mut doubler, &looped).unwrap();
    assert_ne!(copy, looped);

    let new_body = copy.as_loop().unwrap().body().unwrap();
    assert_ne!(new_body, body);
    let new_exprs = new_body.as_block().unwrap().exprs().nodes();
    assert_eq!(constant(&new_exprs[0]), Some(2));
    assert_eq!(new_exprs[1].as_break().unwrap().block(), Some(new_body.clone()));

    assert_eq!(brk.as_break().unwrap().block(), Some(body.clone()));
    assert_eq!(body.as_block().unwrap().breaks(), vec![brk]);
    assert_eq!(constant(&body.as_block().unwrap().exprs().nodes()[0]), Some(1));
}

#[test]
fn identity_transform_keeps_blocks_with_breaks() {
    let world = World::new();
    let (looped, body, brk) = breaking_loop(Node::literal(PrimValue::Boolean(true)));
    let root = Node::block("stmt", vec![looped.clone()]);

    let mut doubler = Doubler {
        world: &world,
        state: TransformState::new(),
    };
    assert_eq!(transformer::apply(&mut doubler, &root).unwrap(), root);
    assert_eq!(root.as_block().unwrap().exprs().get(0), Some(looped.clone()));
    assert_eq!(looped.as_loop().unwrap().body(), Some(body.clone()));
    assert_eq!(body.as_block().unwrap().breaks(), vec![brk]);
}

#[test]
fn break_cycles_do_not_leak() {
    let weak = {
        let (looped, body, _brk) = breaking_loop(int(0));
        drop(looped);
        body.downgrade()
    };
    assert!(weak.upgrade().is_none());
}
