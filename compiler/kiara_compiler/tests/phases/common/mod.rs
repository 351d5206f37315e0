//! Shared test utilities for phase tests.

use std::cell::RefCell;
use std::rc::Rc;

use kiara_compiler::{CompilationContext, Compiler, CompilerPhase, IrBuilder, PipelineError};
use kiara_ir::{Node, PrimValue, Prototype};
use kiara_types::{Idx, World};

/// Builder over a root scope holding the default type names.
pub fn builder(world: &World) -> IrBuilder<'_> {
    let builder = IrBuilder::new(world);
    IrBuilder::register_default_types(builder.scope()).unwrap();
    builder
}

/// Declare `extern name(args): ret` in the current scope of `builder`.
pub fn declare(builder: &IrBuilder<'_>, name: &str, ret: Idx, args: &[(&str, Idx)]) -> Node {
    let args = args.iter().map(|(n, ty)| ((*n).to_owned(), *ty)).collect();
    let proto = Prototype::mangled(builder.world(), name, ret, args);
    let func = Node::extern_function(Rc::new(proto));
    builder.add_function(&func).unwrap();
    func
}

pub fn int(value: i32) -> Node {
    Node::literal(PrimValue::I32(value))
}

/// The function a direct call targets.
pub fn callee(call: &Node) -> Option<Node> {
    call.as_call().and_then(|call| call.called_function())
}

pub fn call_args(call: &Node) -> Vec<Node> {
    call.as_call().map(|call| call.args().nodes()).unwrap_or_default()
}

/// `name(ty)` where `name` is a builtin intrinsic.
pub fn builtin_call(world: &World, name: &str, ty: Idx) -> Node {
    let proto = Prototype::new(world, name, Idx::C_SIZE_T, vec![("t".to_owned(), Idx::TYPE)]);
    proto.set_attribute("builtin", "true");
    let func = Node::intrinsic(Rc::new(proto), name);
    Node::call(world, func, vec![Node::type_expr(ty)])
}

/// Integer constant of a literal node.
pub fn constant(node: &Node) -> Option<u64> {
    match node.as_literal()?.value() {
        PrimValue::U64(v) => Some(*v),
        PrimValue::I32(v) => u64::try_from(*v).ok(),
        _ => None,
    }
}

/// Last phase of a test pipeline: records what reaches it.
pub struct Sink(pub Rc<RefCell<Vec<Node>>>);

impl CompilerPhase for Sink {
    fn run_phase(
        &mut self,
        compiler: &Compiler<'_>,
        ctx: &mut CompilationContext,
        object: Option<&Node>,
    ) -> Result<(), PipelineError> {
        self.0.borrow_mut().extend(object.cloned());
        compiler.emit(ctx, object)
    }
}
