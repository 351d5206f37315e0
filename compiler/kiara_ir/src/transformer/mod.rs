//! Rebuilding transforms of the IR.
//!
//! A [`Transformer`] is a [`Visitor`] returning, for each node, either the
//! node itself or a replacement. [`walk`] transforms the children of a
//! node and rebuilds the node only if some child changed identity;
//! otherwise the original is returned and the subtree stays shared.
//!
//! Results are cached per node, so a subtree reachable twice is
//! transformed once. The cache must be cleared between runs
//! ([`Transformer::clear_result_cache`]).
//!
//! Breaks never follow the edge back to their block. A block is rebuilt
//! only when one of its children changed; the copy is then recorded, and
//! every path from it down to a break of the old block is rebuilt once
//! more so the breaks point at the copy.

use rustc_hash::FxHashMap;

use kiara_types::World;

use crate::visitor::{VisitResult, Visitor};
use crate::{FunctionBody, Node, NodeKind, VisitError};

/// Caches of one transformer run.
#[derive(Default)]
pub struct TransformState {
    results: FxHashMap<Node, Node>,
    blocks: FxHashMap<Node, Node>,
}

impl TransformState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn result(&self, node: &Node) -> Option<Node> {
        self.results.get(node).cloned()
    }

    /// The copy made of `block` in this run, if any.
    pub fn rebuilt_block(&self, block: &Node) -> Option<Node> {
        self.blocks.get(block).cloned()
    }

    pub fn clear(&mut self) {
        self.results.clear();
        self.blocks.clear();
    }
}

pub trait Transformer: Visitor<Output = Node> {
    fn transform_state(&mut self) -> &mut TransformState;

    /// World in which rebuilt nodes are typed.
    fn world(&self) -> &World;

    fn clear_result_cache(&mut self) {
        self.transform_state().clear();
    }
}

/// Transform `node`, reusing the result of an earlier visit.
pub fn apply<T: Transformer + ?Sized>(transformer: &mut T, node: &Node) -> VisitResult<Node> {
    if let Some(done) = transformer.transform_state().result(node) {
        return Ok(done);
    }
    // A node reached again while in progress is left as is.
    transformer
        .transform_state()
        .results
        .insert(node.clone(), node.clone());
    let result = transformer.apply(Some(node))?;
    transformer
        .transform_state()
        .results
        .insert(node.clone(), result.clone());
    Ok(result)
}

/// Transform the children of `node` and rebuild it if any changed.
pub fn walk<T: Transformer + ?Sized>(transformer: &mut T, node: &Node) -> VisitResult<Node> {
    let mut changed = false;
    let rebuilt = match node.kind() {
        NodeKind::PrimLiteral(_)
        | NodeKind::TypeExpr(_)
        | NodeKind::DefExpr(_)
        | NodeKind::SymbolExpr(_)
        | NodeKind::Prototype(_)
        | NodeKind::TypeDefinition(_) => return Ok(node.clone()),
        NodeKind::MemRef(mem_ref) => {
            let value = expr_edge(transformer, &mut changed, mem_ref.value())?;
            if !changed {
                return Ok(node.clone());
            }
            let value = value.ok_or(VisitError::NullNode)?;
            let world = transformer.world();
            value
                .reference(world)
                .unwrap_or_else(|| Node::mem_ref(world, &value))
        }
        NodeKind::ListLiteral(list) => {
            let elems = expr_list(transformer, &mut changed, list.elems().nodes())?;
            if !changed {
                return Ok(node.clone());
            }
            Node::list_literal(node.ty(), elems)
        }
        NodeKind::Call(call) => {
            let args = expr_list(transformer, &mut changed, call.args().nodes())?;
            if !changed {
                return Ok(node.clone());
            }
            let callee = call.callee().ok_or(VisitError::NullNode)?;
            Node::call(transformer.world(), callee, args)
        }
        NodeKind::If(if_expr) => {
            let cond = expr_edge(transformer, &mut changed, if_expr.cond())?;
            let then = expr_edge(transformer, &mut changed, if_expr.then())?;
            let else_ = expr_edge(transformer, &mut changed, if_expr.else_())?;
            if !changed {
                return Ok(node.clone());
            }
            Node::if_expr(
                transformer.world(),
                cond.ok_or(VisitError::NullNode)?,
                then.ok_or(VisitError::NullNode)?,
                else_,
            )
        }
        NodeKind::Loop(loop_expr) => {
            let body = expr_edge(transformer, &mut changed, loop_expr.body())?;
            if !changed {
                return Ok(node.clone());
            }
            Node::loop_expr(body.ok_or(VisitError::NullNode)?)
        }
        NodeKind::For(for_expr) => {
            let var = def_edge(transformer, &mut changed, for_expr.var())?;
            let start = expr_edge(transformer, &mut changed, for_expr.start())?;
            let end = expr_edge(transformer, &mut changed, for_expr.end())?;
            let step = expr_edge(transformer, &mut changed, for_expr.step())?;
            let body = expr_edge(transformer, &mut changed, for_expr.body())?;
            if !changed {
                return Ok(node.clone());
            }
            Node::for_expr(
                var.ok_or(VisitError::NullNode)?,
                start.ok_or(VisitError::NullNode)?,
                end.ok_or(VisitError::NullNode)?,
                step,
                body.ok_or(VisitError::NullNode)?,
            )
        }
        NodeKind::Let(let_expr) => {
            let var = def_edge(transformer, &mut changed, let_expr.var())?;
            let init = expr_edge(transformer, &mut changed, let_expr.init())?;
            let body = expr_edge(transformer, &mut changed, let_expr.body())?;
            if !changed {
                return Ok(node.clone());
            }
            Node::let_expr(
                var.ok_or(VisitError::NullNode)?,
                init,
                body.ok_or(VisitError::NullNode)?,
            )
        }
        NodeKind::Block(block) => {
            let had_breaks = block.has_breaks();
            let exprs = expr_list(transformer, &mut changed, block.exprs().nodes())?;
            if !changed {
                return Ok(node.clone());
            }
            let copy = Node::block(&block.name(), exprs);
            if had_breaks {
                transformer
                    .transform_state()
                    .blocks
                    .insert(node.clone(), copy.clone());
                retarget_breaks(transformer, node, &copy)?;
            }
            copy
        }
        NodeKind::Break(brk) => {
            let value = expr_edge(transformer, &mut changed, brk.value())?;
            let target = match brk.block() {
                Some(old) => match transformer.transform_state().rebuilt_block(&old) {
                    Some(new) => {
                        changed = true;
                        Some(new)
                    }
                    None => Some(old),
                },
                None => None,
            };
            if !changed {
                return Ok(node.clone());
            }
            let target = target.ok_or_else(|| {
                VisitError::Failed("break target no longer exists".to_owned())
            })?;
            Node::break_expr(&target, value)
        }
        NodeKind::FunctionDefinition(func) => {
            let FunctionBody::Function(body) = func.body() else {
                return Ok(node.clone());
            };
            let body = expr_edge(transformer, &mut changed, body.get())?;
            if !changed {
                return Ok(node.clone());
            }
            return node
                .with_function_body(transformer.world(), body)
                .map_err(|err| VisitError::Failed(err.to_string()))?
                .ok_or(VisitError::NullNode);
        }
    };
    Ok(rebuilt.with_location(node.location()))
}

/// Rebuilds the paths leading to breaks of one block so they target its
/// copy. Nothing else changes.
struct Retarget<'w> {
    world: &'w World,
    state: TransformState,
}

impl Visitor for Retarget<'_> {
    type Output = Node;

    fn visit_object(&mut self, node: &Node) -> VisitResult<Node> {
        walk(self, node)
    }
}

impl Transformer for Retarget<'_> {
    fn transform_state(&mut self) -> &mut TransformState {
        &mut self.state
    }

    fn world(&self) -> &World {
        self.world
    }
}

/// Point the breaks of `old` found under `copy` at `copy`, and make the
/// cached results of `transformer` refer to the retargeted nodes.
fn retarget_breaks<T: Transformer + ?Sized>(
    transformer: &mut T,
    old: &Node,
    copy: &Node,
) -> VisitResult<()> {
    let Some(inner) = copy.as_block() else {
        return Ok(());
    };
    let mut retarget = Retarget {
        world: transformer.world(),
        state: TransformState::new(),
    };
    retarget.state.blocks.insert(old.clone(), copy.clone());
    let mut changed = false;
    let exprs = expr_list(&mut retarget, &mut changed, inner.exprs().nodes())?;
    if !changed {
        return Ok(());
    }
    inner.set_exprs(exprs);

    let Retarget { state, .. } = retarget;
    for result in transformer.transform_state().results.values_mut() {
        if let Some(new) = state.results.get(&*result) {
            *result = new.clone();
        }
    }
    Ok(())
}

/// Transform an expression child. A result that is not an expression is
/// an error.
fn expr_edge<T: Transformer + ?Sized>(
    transformer: &mut T,
    changed: &mut bool,
    child: Option<Node>,
) -> VisitResult<Option<Node>> {
    let Some(old) = child else {
        return Ok(None);
    };
    let new = apply(transformer, &old)?;
    if !new.is_expr() {
        return Err(VisitError::KindMismatch {
            expected: "expression",
            found: new.kind().name(),
        });
    }
    *changed |= new != old;
    Ok(Some(new))
}

/// Transform a variable child, which must stay a `DefExpr`.
fn def_edge<T: Transformer + ?Sized>(
    transformer: &mut T,
    changed: &mut bool,
    child: Option<Node>,
) -> VisitResult<Option<Node>> {
    let Some(old) = child else {
        return Ok(None);
    };
    let new = apply(transformer, &old)?;
    if new.as_def().is_none() {
        return Err(VisitError::KindMismatch {
            expected: "DefExpr",
            found: new.kind().name(),
        });
    }
    *changed |= new != old;
    Ok(Some(new))
}

fn expr_list<T: Transformer + ?Sized>(
    transformer: &mut T,
    changed: &mut bool,
    children: Vec<Node>,
) -> VisitResult<Vec<Node>> {
    children
        .into_iter()
        .map(|child| {
            expr_edge(transformer, changed, Some(child))?.ok_or(VisitError::NullNode)
        })
        .collect()
}
