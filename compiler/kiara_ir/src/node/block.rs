//! Blocks and the breaks that leave them.

use std::cell::{Ref, RefCell};

use kiara_types::Idx;

use super::{Edge, EdgeList, Node, NodeKind, WeakNode};

/// Ordered expression sequence; typed by its last expression.
///
/// Keeps a registry of the breaks targeting it. The registry holds weak
/// handles only and is never walked as an ownership edge.
pub struct BlockExpr {
    name: RefCell<String>,
    pub(super) exprs: EdgeList,
    breaks: RefCell<Vec<WeakNode>>,
}

impl BlockExpr {
    pub fn name(&self) -> Ref<'_, str> {
        Ref::map(self.name.borrow(), String::as_str)
    }

    pub fn set_name(&self, name: &str) {
        name.clone_into(&mut self.name.borrow_mut());
    }

    pub fn exprs(&self) -> &EdgeList {
        &self.exprs
    }

    pub fn add_expr(&self, expr: Node) {
        self.exprs.push(expr);
    }

    pub fn set_exprs(&self, exprs: Vec<Node>) {
        self.exprs.set_all(exprs);
    }

    /// Live breaks targeting this block, in registration order.
    pub fn breaks(&self) -> Vec<Node> {
        self.breaks
            .borrow()
            .iter()
            .filter_map(WeakNode::upgrade)
            .collect()
    }

    pub fn has_breaks(&self) -> bool {
        self.breaks.borrow().iter().any(WeakNode::is_alive)
    }

    /// Type of the last expression, `void` for an empty block.
    pub(super) fn result_type(&self) -> Idx {
        match self.exprs.last() {
            Some(Some(last)) => last.ty(),
            Some(None) | None => Idx::VOID,
        }
    }

    fn register_break(&self, this: &Node, brk: &Node) {
        self.breaks.borrow_mut().push(brk.downgrade());
        let mut name = self.name.borrow_mut();
        if name.is_empty() {
            *name = format!("$block_{:p}", this.addr());
        }
    }

    fn deregister_break(&self, brk: &Node) {
        self.breaks
            .borrow_mut()
            .retain(|weak| weak.is_alive() && !weak.points_to(brk));
    }

    fn prune_breaks(&self) {
        self.breaks.borrow_mut().retain(WeakNode::is_alive);
    }
}

/// Exit from an enclosing block, optionally carrying a value.
pub struct BreakExpr {
    block: RefCell<WeakNode>,
    pub(super) value: Edge,
}

impl BreakExpr {
    /// The targeted block, while it is alive.
    pub fn block(&self) -> Option<Node> {
        self.block.borrow().upgrade()
    }

    pub fn value(&self) -> Option<Node> {
        self.value.get()
    }

    /// Move `this` (the node owning this break) to a new target.
    pub(super) fn retarget(&self, this: &Node, target: Option<&Node>) {
        if let Some(old) = self.block() {
            if let Some(block) = old.as_block() {
                block.deregister_break(this);
            }
        }
        *self.block.borrow_mut() = target.map(Node::downgrade).unwrap_or_default();
        if let Some(target) = target {
            if let Some(block) = target.as_block() {
                block.register_break(target, this);
            }
        }
    }
}

impl Drop for BreakExpr {
    fn drop(&mut self) {
        if let Some(target) = self.block.get_mut().upgrade() {
            if let Some(block) = target.as_block() {
                block.prune_breaks();
            }
        }
    }
}

impl Node {
    pub fn block(name: &str, exprs: Vec<Node>) -> Node {
        Node::from_kind(
            Idx::VOID,
            NodeKind::Block(BlockExpr {
                name: RefCell::new(name.to_owned()),
                exprs: EdgeList::new(exprs),
                breaks: RefCell::new(Vec::new()),
            }),
        )
    }

    /// Break out of `block`. The break registers itself with the block.
    pub fn break_expr(block: &Node, value: Option<Node>) -> Node {
        let ty = value.as_ref().map_or(Idx::VOID, Node::ty);
        let node = Node::from_kind(
            ty,
            NodeKind::Break(BreakExpr {
                block: RefCell::new(block.downgrade()),
                value: Edge::new(value),
            }),
        );
        if let Some(target) = block.as_block() {
            target.register_break(block, &node);
        }
        node
    }
}
