//! The IR node graph.
//!
//! # Design
//!
//! - Nodes are shared: a [`Node`] is an `Rc` handle compared by identity,
//!   so the same subtree may hang off several parents
//! - Child edges use interior mutability; structural rewrites go through
//!   [`Node::replace_expr`], never through silent aliasing
//! - The one cycle in the graph (a break pointing back at its enclosing
//!   block) is a weak reference, registered with the block on construction
//!   and pruned when the break is dropped
//! - Memoized `MemRef` wrappers are cached weakly by their target, since
//!   the wrapper itself owns the target

mod block;
mod expr;
mod function;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use kiara_types::{Idx, World};

use crate::SourceLocation;

pub use block::{BlockExpr, BreakExpr};
pub use expr::{
    CallExpr, DefExpr, ForExpr, IfExpr, LetExpr, ListLiteral, LoopExpr, MemRef, PrimLiteral,
    PrimValue, SymbolExpr, TypeExpr,
};
pub use function::{
    Attributes, FunctionBody, FunctionDefinition, Prototype, TypeDefinition,
};

/// Shared handle to an IR node. Equality and hashing are by identity.
#[derive(Clone)]
pub struct Node(Rc<NodeData>);

/// Non-owning handle to an IR node.
#[derive(Clone, Default)]
pub struct WeakNode(Weak<NodeData>);

pub struct NodeData {
    ty: Idx,
    location: Cell<Option<SourceLocation>>,
    kind: NodeKind,
}

/// Every node variant of the IR.
pub enum NodeKind {
    MemRef(MemRef),
    PrimLiteral(PrimLiteral),
    ListLiteral(ListLiteral),
    TypeExpr(TypeExpr),
    DefExpr(DefExpr),
    SymbolExpr(SymbolExpr),
    Call(CallExpr),
    If(IfExpr),
    Loop(LoopExpr),
    For(ForExpr),
    Let(LetExpr),
    Block(BlockExpr),
    Break(BreakExpr),
    Prototype(Rc<Prototype>),
    TypeDefinition(TypeDefinition),
    FunctionDefinition(FunctionDefinition),
}

impl NodeKind {
    /// Stable kind name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::MemRef(_) => "MemRef",
            NodeKind::PrimLiteral(_) => "PrimLiteral",
            NodeKind::ListLiteral(_) => "ListLiteral",
            NodeKind::TypeExpr(_) => "TypeExpr",
            NodeKind::DefExpr(_) => "DefExpr",
            NodeKind::SymbolExpr(_) => "SymbolExpr",
            NodeKind::Call(_) => "CallExpr",
            NodeKind::If(_) => "IfExpr",
            NodeKind::Loop(_) => "LoopExpr",
            NodeKind::For(_) => "ForExpr",
            NodeKind::Let(_) => "LetExpr",
            NodeKind::Block(_) => "BlockExpr",
            NodeKind::Break(_) => "BreakExpr",
            NodeKind::Prototype(_) => "Prototype",
            NodeKind::TypeDefinition(_) => "TypeDefinition",
            NodeKind::FunctionDefinition(func) => match func.body() {
                FunctionBody::Function(_) => "Function",
                FunctionBody::Extern => "ExternFunction",
                FunctionBody::Intrinsic(_) => "Intrinsic",
                FunctionBody::Declaration { .. } => "FunctionDeclaration",
            },
        }
    }
}

// Edges

/// An owned, replaceable child slot.
#[derive(Default)]
pub struct Edge(RefCell<Option<Node>>);

impl Edge {
    pub fn new(node: Option<Node>) -> Self {
        Edge(RefCell::new(node))
    }

    pub fn get(&self) -> Option<Node> {
        self.0.borrow().clone()
    }

    pub fn set(&self, node: Option<Node>) {
        let prev = self.0.replace(node);
        drop(prev);
    }

    pub fn is_some(&self) -> bool {
        self.0.borrow().is_some()
    }

    /// Replace the child if it is `old`. A `new` node rejected by `accepts`
    /// leaves the slot empty.
    fn replace(&self, old: &Node, new: &Node, accepts: fn(&Node) -> bool) -> bool {
        if self.0.borrow().as_ref() != Some(old) {
            return false;
        }
        self.set(accepts(new).then(|| new.clone()));
        true
    }
}

/// An ordered list of owned, replaceable child slots.
#[derive(Default)]
pub struct EdgeList(RefCell<Vec<Option<Node>>>);

impl EdgeList {
    pub fn new(nodes: Vec<Node>) -> Self {
        EdgeList(RefCell::new(nodes.into_iter().map(Some).collect()))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Node> {
        self.0.borrow().get(index).cloned().flatten()
    }

    /// Snapshot of the slots, including emptied ones.
    pub fn slots(&self) -> Vec<Option<Node>> {
        self.0.borrow().clone()
    }

    /// Snapshot of the present children.
    pub fn nodes(&self) -> Vec<Node> {
        self.0.borrow().iter().flatten().cloned().collect()
    }

    pub fn last(&self) -> Option<Option<Node>> {
        self.0.borrow().last().cloned()
    }

    fn push(&self, node: Node) {
        self.0.borrow_mut().push(Some(node));
    }

    fn set_all(&self, nodes: Vec<Node>) {
        let prev = self.0.replace(nodes.into_iter().map(Some).collect());
        drop(prev);
    }

    fn clear(&self) {
        let prev = self.0.take();
        drop(prev);
    }

    fn replace(&self, old: &Node, new: &Node, accepts: fn(&Node) -> bool) -> bool {
        let mut replaced = Vec::new();
        {
            let mut slots = self.0.borrow_mut();
            for slot in slots.iter_mut() {
                if slot.as_ref() == Some(old) {
                    replaced.push(std::mem::replace(
                        slot,
                        accepts(new).then(|| new.clone()),
                    ));
                }
            }
        }
        !replaced.is_empty()
    }
}

/// Weakly held memoized `MemRef`.
#[derive(Default)]
struct MemRefCache(RefCell<WeakNode>);

impl MemRefCache {
    fn get_or_create(&self, create: impl FnOnce() -> Node) -> Node {
        if let Some(node) = self.0.borrow().upgrade() {
            return node;
        }
        let node = create();
        *self.0.borrow_mut() = node.downgrade();
        node
    }

    fn replace(&self, old: &Node, new: &Node) -> bool {
        if !self.0.borrow().points_to(old) {
            return false;
        }
        *self.0.borrow_mut() = if new.is_mem_ref() {
            new.downgrade()
        } else {
            WeakNode::default()
        };
        true
    }

    fn clear(&self) {
        *self.0.borrow_mut() = WeakNode::default();
    }
}

fn accepts_expr(node: &Node) -> bool {
    node.is_expr()
}

fn accepts_def(node: &Node) -> bool {
    matches!(node.kind(), NodeKind::DefExpr(_))
}

// Node

impl Node {
    fn from_kind(ty: Idx, kind: NodeKind) -> Self {
        Node(Rc::new(NodeData {
            ty,
            location: Cell::new(None),
            kind,
        }))
    }

    pub fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    /// Type of the value this node produces.
    ///
    /// Function definitions and prototypes report their function type,
    /// which stays [`Idx::NONE`] until every argument type and the return
    /// type are known. A block tracks its last expression. Type
    /// definitions report [`Idx::NONE`].
    pub fn ty(&self) -> Idx {
        match self.kind() {
            NodeKind::FunctionDefinition(func) => func.proto().function_type(),
            NodeKind::Prototype(proto) => proto.function_type(),
            NodeKind::Block(block) => block.result_type(),
            _ => self.0.ty,
        }
    }

    pub fn location(&self) -> Option<SourceLocation> {
        self.0.location.get()
    }

    pub fn set_location(&self, location: Option<SourceLocation>) {
        self.0.location.set(location);
    }

    #[must_use]
    pub fn with_location(self, location: Option<SourceLocation>) -> Self {
        self.set_location(location);
        self
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode(Rc::downgrade(&self.0))
    }

    /// Address of the node, used to derive unique generated names.
    pub fn addr(&self) -> *const () {
        Rc::as_ptr(&self.0).cast()
    }

    /// Number of strong handles to this node.
    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Expressions produce values; prototypes and type definitions do not.
    pub fn is_expr(&self) -> bool {
        !matches!(
            self.kind(),
            NodeKind::Prototype(_) | NodeKind::TypeDefinition(_)
        )
    }

    pub fn is_mem_ref(&self) -> bool {
        matches!(self.kind(), NodeKind::MemRef(_))
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind(), NodeKind::Block(_))
    }

    /// Memoized address-of wrapper for addressable nodes: variables declared
    /// with an address, and function definitions. `None` otherwise.
    pub fn reference(&self, world: &World) -> Option<Node> {
        let cache = match self.kind() {
            NodeKind::DefExpr(def) if def.has_address() => &def.mem_ref,
            NodeKind::FunctionDefinition(func) => &func.mem_ref,
            _ => return None,
        };
        Some(cache.get_or_create(|| Node::mem_ref(world, self)))
    }

    /// Replace every child edge that points at `old` with `new`.
    ///
    /// Returns whether any edge matched. An edge whose slot cannot hold
    /// `new` (a variable slot handed a non-variable, an expression slot
    /// handed a declaration) is left empty rather than failing.
    pub fn replace_expr(&self, old: &Node, new: &Node) -> bool {
        match self.kind() {
            NodeKind::MemRef(mem_ref) => mem_ref.value.replace(old, new, accepts_expr),
            NodeKind::PrimLiteral(_)
            | NodeKind::TypeExpr(_)
            | NodeKind::SymbolExpr(_)
            | NodeKind::Prototype(_)
            | NodeKind::TypeDefinition(_) => false,
            NodeKind::ListLiteral(list) => list.elems.replace(old, new, accepts_expr),
            NodeKind::DefExpr(def) => def.mem_ref.replace(old, new),
            NodeKind::Call(call) => {
                let args = call.args.replace(old, new, accepts_expr);
                call.callee.replace(old, new, accepts_expr) | args
            }
            NodeKind::If(if_expr) => {
                if_expr.cond.replace(old, new, accepts_expr)
                    | if_expr.then.replace(old, new, accepts_expr)
                    | if_expr.else_.replace(old, new, accepts_expr)
            }
            NodeKind::Loop(loop_expr) => loop_expr.body.replace(old, new, accepts_expr),
            NodeKind::For(for_expr) => {
                for_expr.var.replace(old, new, accepts_def)
                    | for_expr.start.replace(old, new, accepts_expr)
                    | for_expr.end.replace(old, new, accepts_expr)
                    | for_expr.step.replace(old, new, accepts_expr)
                    | for_expr.body.replace(old, new, accepts_expr)
            }
            NodeKind::Let(let_expr) => {
                let_expr.var.replace(old, new, accepts_def)
                    | let_expr.init.replace(old, new, accepts_expr)
                    | let_expr.body.replace(old, new, accepts_expr)
            }
            NodeKind::Block(block) => block.exprs.replace(old, new, accepts_expr),
            NodeKind::Break(brk) => {
                let retargeted = if brk.block().as_ref() == Some(old) {
                    let target = new.is_block().then_some(new);
                    brk.retarget(self, target);
                    true
                } else {
                    false
                };
                brk.value.replace(old, new, accepts_expr) | retargeted
            }
            NodeKind::FunctionDefinition(func) => {
                let mut success = func.args.replace(old, new, accepts_def);
                success |= func.mem_ref.replace(old, new);
                if let FunctionBody::Function(body) = func.body() {
                    success |= body.replace(old, new, accepts_expr);
                }
                success
            }
        }
    }

    /// Empty every owned edge. Used at teardown to reclaim graphs whose
    /// nodes refer to each other, e.g. a function whose body calls itself.
    ///
    /// The break-to-block back edge is not owned and stays.
    pub fn unlink(&self) {
        match self.kind() {
            NodeKind::MemRef(mem_ref) => mem_ref.value.set(None),
            NodeKind::PrimLiteral(_)
            | NodeKind::TypeExpr(_)
            | NodeKind::Prototype(_)
            | NodeKind::TypeDefinition(_) => {}
            NodeKind::ListLiteral(list) => list.elems.clear(),
            NodeKind::DefExpr(def) => def.mem_ref.clear(),
            NodeKind::SymbolExpr(symbol) => symbol.clear_scope(),
            NodeKind::Call(call) => {
                call.callee.set(None);
                call.args.clear();
            }
            NodeKind::If(if_expr) => {
                if_expr.cond.set(None);
                if_expr.then.set(None);
                if_expr.else_.set(None);
            }
            NodeKind::Loop(loop_expr) => loop_expr.body.set(None),
            NodeKind::For(for_expr) => {
                for_expr.var.set(None);
                for_expr.start.set(None);
                for_expr.end.set(None);
                for_expr.step.set(None);
                for_expr.body.set(None);
            }
            NodeKind::Let(let_expr) => {
                let_expr.var.set(None);
                let_expr.init.set(None);
                let_expr.body.set(None);
            }
            NodeKind::Block(block) => block.exprs.clear(),
            NodeKind::Break(brk) => brk.value.set(None),
            NodeKind::FunctionDefinition(func) => {
                func.args.clear();
                func.mem_ref.clear();
                if let FunctionBody::Function(body) = func.body() {
                    body.set(None);
                }
            }
        }
    }

    /// Call `f` on every owned child, in edge order. Skips the
    /// break-to-block back edge.
    pub fn for_each_child(&self, f: &mut dyn FnMut(&Node)) {
        match self.kind() {
            NodeKind::MemRef(mem_ref) => visit_edge(&mem_ref.value, f),
            NodeKind::PrimLiteral(_)
            | NodeKind::TypeExpr(_)
            | NodeKind::DefExpr(_)
            | NodeKind::SymbolExpr(_)
            | NodeKind::Prototype(_)
            | NodeKind::TypeDefinition(_) => {}
            NodeKind::ListLiteral(list) => visit_list(&list.elems, f),
            NodeKind::Call(call) => {
                visit_edge(&call.callee, f);
                visit_list(&call.args, f);
            }
            NodeKind::If(if_expr) => {
                visit_edge(&if_expr.cond, f);
                visit_edge(&if_expr.then, f);
                visit_edge(&if_expr.else_, f);
            }
            NodeKind::Loop(loop_expr) => visit_edge(&loop_expr.body, f),
            NodeKind::For(for_expr) => {
                visit_edge(&for_expr.var, f);
                visit_edge(&for_expr.start, f);
                visit_edge(&for_expr.end, f);
                visit_edge(&for_expr.step, f);
                visit_edge(&for_expr.body, f);
            }
            NodeKind::Let(let_expr) => {
                visit_edge(&let_expr.var, f);
                visit_edge(&let_expr.init, f);
                visit_edge(&let_expr.body, f);
            }
            NodeKind::Block(block) => visit_list(&block.exprs, f),
            NodeKind::Break(brk) => visit_edge(&brk.value, f),
            NodeKind::FunctionDefinition(func) => {
                visit_list(&func.args, f);
                if let FunctionBody::Function(body) = func.body() {
                    visit_edge(body, f);
                }
            }
        }
    }
}

fn visit_edge(edge: &Edge, f: &mut dyn FnMut(&Node)) {
    if let Some(child) = edge.get() {
        f(&child);
    }
}

fn visit_list(list: &EdgeList, f: &mut dyn FnMut(&Node)) {
    for child in list.nodes() {
        f(&child);
    }
}

macro_rules! kind_accessors {
    ($($fn_name:ident => $variant:ident($ty:ty);)*) => {
        impl Node {
            $(
                pub fn $fn_name(&self) -> Option<&$ty> {
                    match self.kind() {
                        NodeKind::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            )*
        }
    };
}

kind_accessors! {
    as_mem_ref => MemRef(MemRef);
    as_literal => PrimLiteral(PrimLiteral);
    as_list => ListLiteral(ListLiteral);
    as_type_expr => TypeExpr(TypeExpr);
    as_def => DefExpr(DefExpr);
    as_symbol => SymbolExpr(SymbolExpr);
    as_call => Call(CallExpr);
    as_if => If(IfExpr);
    as_loop => Loop(LoopExpr);
    as_for => For(ForExpr);
    as_let => Let(LetExpr);
    as_block => Block(BlockExpr);
    as_break => Break(BreakExpr);
    as_type_definition => TypeDefinition(TypeDefinition);
    as_function => FunctionDefinition(FunctionDefinition);
}

impl Node {
    pub fn as_prototype(&self) -> Option<&Rc<Prototype>> {
        match self.kind() {
            NodeKind::Prototype(proto) => Some(proto),
            _ => None,
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:p}", self.kind().name(), self.addr())
    }
}

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.0.upgrade().map(Node)
    }

    /// Check whether this handle refers to `node`, even if it is dying.
    pub fn points_to(&self, node: &Node) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&node.0))
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for WeakNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(node) => write!(f, "Weak({node:?})"),
            None => f.write_str("Weak(<dropped>)"),
        }
    }
}
