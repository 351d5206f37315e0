//! Rewriting passes run as [`ReplacePhase`](crate::ReplacePhase)s.

use kiara_ir::replacer::{self, ReplaceState, Replacer};
use kiara_ir::visitor::{VisitResult, Visitor};
use kiara_ir::{printer, Node, PrimValue, VisitError};
use kiara_types::{Idx, World};

/// Attribute marking an intrinsic the compiler evaluates itself.
pub const BUILTIN_ATTRIBUTE: &str = "builtin";

/// Size of a pointer on the target.
const POINTER_SIZE: u64 = 8;

/// Replaces calls of builtin intrinsics by their value.
///
/// `sizeof(T)` and `sizeof(expr)` become a `size_t` constant. Any other
/// builtin is an error.
pub struct SubstituteBuiltins<'w> {
    world: &'w World,
    state: ReplaceState,
}

impl<'w> SubstituteBuiltins<'w> {
    pub fn new(world: &'w World) -> Self {
        SubstituteBuiltins {
            world,
            state: ReplaceState::new(),
        }
    }

    fn size_of(&self, ty: Idx) -> Option<u64> {
        let ty = self.world.canonical(ty);
        if let Some(kind) = self.world.prim_kind(ty) {
            return Some(kind.byte_size());
        }
        if self.world.is_pointer(ty) {
            return Some(POINTER_SIZE);
        }
        self.world.size_of(ty)
    }

    fn eval_sizeof(&self, arg: &Node) -> VisitResult<Node> {
        let ty = arg
            .as_type_expr()
            .map_or_else(|| arg.ty(), |expr| expr.type_value());
        let Some(size) = self.size_of(ty) else {
            return Err(VisitError::Failed(format!(
                "Cannot compute sizeof of type: {}",
                self.world.type_name(ty)
            )));
        };
        tracing::trace!(ty = %self.world.type_name(ty), size, "sizeof");
        Ok(Node::literal_with_type(Idx::C_SIZE_T, PrimValue::U64(size)).with_location(arg.location()))
    }
}

impl Visitor for SubstituteBuiltins<'_> {
    type Output = Node;

    fn visit_object(&mut self, node: &Node) -> VisitResult<Node> {
        replacer::walk(self, node)
    }

    fn visit_call(&mut self, node: &Node) -> VisitResult<Node> {
        let Some(func) = node.as_call().and_then(|call| call.called_function()) else {
            return replacer::walk(self, node);
        };
        let Some(def) = func.as_function() else {
            return replacer::walk(self, node);
        };
        let Some(body) = def.intrinsic_body() else {
            return replacer::walk(self, node);
        };
        if !def.proto().has_attribute(BUILTIN_ATTRIBUTE) {
            return replacer::walk(self, node);
        }

        let args = node.as_call().map(|call| call.args().nodes()).unwrap_or_default();
        match (body, args.as_slice()) {
            ("sizeof", [arg]) => self.eval_sizeof(arg),
            _ => Err(VisitError::Failed(format!(
                "Unsupported builtin intrinsic: {}",
                printer::to_string(self.world, &func)
            ))),
        }
    }
}

impl Replacer for SubstituteBuiltins<'_> {
    fn replace_state(&mut self) -> &mut ReplaceState {
        &mut self.state
    }
}
