//! In-place rewriting of the IR.
//!
//! A [`Replacer`] is a [`Visitor`] producing, for each node, the node that
//! should stand in its place. [`walk`] processes the owned children of a
//! node and swaps every child whose result differs into the parent edge.
//!
//! Each node is processed at most once per traversal. Reaching it again
//! (a subtree shared by two parents) reuses the recorded result, so both
//! parents see the same replacement. Call [`Replacer::reset`] between
//! traversals, or stale results leak into the next run.
//!
//! The back edge from a break to its block is never followed. When a
//! block is replaced, the breaks registered with it are retargeted.

use rustc_hash::FxHashMap;

use crate::visitor::{VisitResult, Visitor};
use crate::{FunctionBody, Node, NodeKind};

/// Results recorded during one replacement traversal.
#[derive(Default)]
pub struct ReplaceState {
    cache: FxHashMap<Node, Node>,
}

impl ReplaceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result recorded for `node`, if it was already processed.
    pub fn get(&self, node: &Node) -> Option<Node> {
        self.cache.get(node).cloned()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

pub trait Replacer: Visitor<Output = Node> {
    fn replace_state(&mut self) -> &mut ReplaceState;

    fn reset(&mut self) {
        self.replace_state().clear();
    }
}

/// Process `node` and return its replacement, `node` itself if unchanged.
pub fn apply<R: Replacer + ?Sized>(replacer: &mut R, node: &Node) -> VisitResult<Node> {
    if let Some(done) = replacer.replace_state().get(node) {
        return Ok(done);
    }
    // Mark first, so a node reachable from itself is not re-entered.
    replacer
        .replace_state()
        .cache
        .insert(node.clone(), node.clone());
    let result = replacer.apply(Some(node))?;
    replacer
        .replace_state()
        .cache
        .insert(node.clone(), result.clone());
    Ok(result)
}

/// Process the owned children of `node` in place and keep `node`.
pub fn walk<R: Replacer + ?Sized>(replacer: &mut R, node: &Node) -> VisitResult<Node> {
    for child in operands(node) {
        let new = apply(replacer, &child)?;
        if new != child {
            tracing::trace!(parent = ?node, old = ?child, new = ?new, "replace child");
            node.replace_expr(&child, &new);
            retarget_breaks(&child, &new);
        }
    }
    Ok(node.clone())
}

/// Children visited by traversals: the owned edges, minus the callee of a
/// call (a function must not be re-entered through its own call sites)
/// and the argument variables of a function.
fn operands(node: &Node) -> Vec<Node> {
    let mut out = Vec::new();
    match node.kind() {
        NodeKind::PrimLiteral(_)
        | NodeKind::TypeExpr(_)
        | NodeKind::DefExpr(_)
        | NodeKind::SymbolExpr(_)
        | NodeKind::Prototype(_)
        | NodeKind::TypeDefinition(_) => {}
        NodeKind::MemRef(mem_ref) => out.extend(mem_ref.value()),
        NodeKind::ListLiteral(list) => out = list.elems().nodes(),
        NodeKind::Call(call) => out = call.args().nodes(),
        NodeKind::If(if_expr) => {
            out.extend(if_expr.cond());
            out.extend(if_expr.then());
            out.extend(if_expr.else_());
        }
        NodeKind::Loop(loop_expr) => out.extend(loop_expr.body()),
        NodeKind::For(for_expr) => {
            out.extend(for_expr.var());
            out.extend(for_expr.start());
            out.extend(for_expr.end());
            out.extend(for_expr.step());
            out.extend(for_expr.body());
        }
        NodeKind::Let(let_expr) => {
            out.extend(let_expr.var());
            out.extend(let_expr.init());
            out.extend(let_expr.body());
        }
        NodeKind::Block(block) => out = block.exprs().nodes(),
        NodeKind::Break(brk) => out.extend(brk.value()),
        NodeKind::FunctionDefinition(func) => {
            if let FunctionBody::Function(body) = func.body() {
                out.extend(body.get());
            }
        }
    }
    out
}

fn retarget_breaks(old: &Node, new: &Node) {
    if let Some(block) = old.as_block() {
        for brk in block.breaks() {
            brk.replace_expr(old, new);
        }
    }
}
