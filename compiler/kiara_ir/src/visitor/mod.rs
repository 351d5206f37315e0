//! Kind-dispatched IR visitor.
//!
//! # Design
//!
//! [`dispatch`] switches on the node kind once and calls the matching
//! `visit_*` method. Every method has a default that falls back to the
//! visit method of the more general kind:
//!
//! ```text
//! visit_function ─┐
//! visit_extern   ─┼─> visit_function_definition ─> visit_expr ─┐
//! visit_intrinsic ┤                                             ├─> visit_object
//! visit_call ...  ┴────────────────────────────> visit_expr ────┘
//! visit_prototype, visit_type_definition ───────────────────────┘
//! ```
//!
//! `visit_object` reports the kind as unsupported. A visitor therefore
//! implements only the kinds it cares about, plus whichever general
//! fallback suits it; kinds added later still reach that fallback.
//!
//! The replacer and transformer are visitors whose fallbacks walk the
//! children: see [`crate::replacer`] and [`crate::transformer`].

use crate::{FunctionBody, Node, NodeKind, VisitError};

pub type VisitResult<T> = Result<T, VisitError>;

pub trait Visitor {
    type Output;

    /// Visit `node`. A missing node is an error: continuing past it would
    /// leave a corrupted tree behind.
    fn apply(&mut self, node: Option<&Node>) -> VisitResult<Self::Output> {
        match node {
            Some(node) => kiara_stack::ensure_sufficient_stack(|| dispatch(self, node)),
            None => Err(VisitError::NullNode),
        }
    }

    fn visit_object(&mut self, node: &Node) -> VisitResult<Self::Output> {
        Err(VisitError::Unsupported {
            kind: node.kind().name(),
        })
    }

    fn visit_expr(&mut self, node: &Node) -> VisitResult<Self::Output> {
        self.visit_object(node)
    }

    fn visit_mem_ref(&mut self, node: &Node) -> VisitResult<Self::Output> {
        self.visit_expr(node)
    }

    fn visit_literal(&mut self, node: &Node) -> VisitResult<Self::Output> {
        self.visit_expr(node)
    }

    fn visit_list_literal(&mut self, node: &Node) -> VisitResult<Self::Output> {
        self.visit_expr(node)
    }

    fn visit_type_expr(&mut self, node: &Node) -> VisitResult<Self::Output> {
        self.visit_expr(node)
    }

    fn visit_def(&mut self, node: &Node) -> VisitResult<Self::Output> {
        self.visit_expr(node)
    }

    fn visit_symbol(&mut self, node: &Node) -> VisitResult<Self::Output> {
        self.visit_expr(node)
    }

    fn visit_call(&mut self, node: &Node) -> VisitResult<Self::Output> {
        self.visit_expr(node)
    }

    fn visit_if(&mut self, node: &Node) -> VisitResult<Self::Output> {
        self.visit_expr(node)
    }

    fn visit_loop(&mut self, node: &Node) -> VisitResult<Self::Output> {
        self.visit_expr(node)
    }

    fn visit_for(&mut self, node: &Node) -> VisitResult<Self::Output> {
        self.visit_expr(node)
    }

    fn visit_let(&mut self, node: &Node) -> VisitResult<Self::Output> {
        self.visit_expr(node)
    }

    fn visit_block(&mut self, node: &Node) -> VisitResult<Self::Output> {
        self.visit_expr(node)
    }

    fn visit_break(&mut self, node: &Node) -> VisitResult<Self::Output> {
        self.visit_expr(node)
    }

    fn visit_function_definition(&mut self, node: &Node) -> VisitResult<Self::Output> {
        self.visit_expr(node)
    }

    fn visit_function(&mut self, node: &Node) -> VisitResult<Self::Output> {
        self.visit_function_definition(node)
    }

    fn visit_extern_function(&mut self, node: &Node) -> VisitResult<Self::Output> {
        self.visit_function_definition(node)
    }

    fn visit_intrinsic(&mut self, node: &Node) -> VisitResult<Self::Output> {
        self.visit_function_definition(node)
    }

    fn visit_function_declaration(&mut self, node: &Node) -> VisitResult<Self::Output> {
        self.visit_function_definition(node)
    }

    fn visit_prototype(&mut self, node: &Node) -> VisitResult<Self::Output> {
        self.visit_object(node)
    }

    fn visit_type_definition(&mut self, node: &Node) -> VisitResult<Self::Output> {
        self.visit_object(node)
    }
}

/// Call the `visit_*` method matching the kind of `node`.
pub fn dispatch<V: Visitor + ?Sized>(visitor: &mut V, node: &Node) -> VisitResult<V::Output> {
    match node.kind() {
        NodeKind::MemRef(_) => visitor.visit_mem_ref(node),
        NodeKind::PrimLiteral(_) => visitor.visit_literal(node),
        NodeKind::ListLiteral(_) => visitor.visit_list_literal(node),
        NodeKind::TypeExpr(_) => visitor.visit_type_expr(node),
        NodeKind::DefExpr(_) => visitor.visit_def(node),
        NodeKind::SymbolExpr(_) => visitor.visit_symbol(node),
        NodeKind::Call(_) => visitor.visit_call(node),
        NodeKind::If(_) => visitor.visit_if(node),
        NodeKind::Loop(_) => visitor.visit_loop(node),
        NodeKind::For(_) => visitor.visit_for(node),
        NodeKind::Let(_) => visitor.visit_let(node),
        NodeKind::Block(_) => visitor.visit_block(node),
        NodeKind::Break(_) => visitor.visit_break(node),
        NodeKind::Prototype(_) => visitor.visit_prototype(node),
        NodeKind::TypeDefinition(_) => visitor.visit_type_definition(node),
        NodeKind::FunctionDefinition(func) => match func.body() {
            FunctionBody::Function(_) => visitor.visit_function(node),
            FunctionBody::Extern => visitor.visit_extern_function(node),
            FunctionBody::Intrinsic(_) => visitor.visit_intrinsic(node),
            FunctionBody::Declaration { .. } => visitor.visit_function_declaration(node),
        },
    }
}
