//! Expression nodes.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use kiara_types::{Idx, PrimKind, World};

use super::{Edge, EdgeList, MemRefCache, Node, NodeKind};
use crate::Scope;

/// Scalar constant carried by a [`PrimLiteral`].
#[derive(Clone, Debug, PartialEq)]
pub enum PrimValue {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
    NullPtr,
}

impl PrimValue {
    /// Exact type of the constant.
    pub fn ty(&self) -> Idx {
        match self {
            PrimValue::I8(_) => Idx::I8,
            PrimValue::U8(_) => Idx::U8,
            PrimValue::I16(_) => Idx::I16,
            PrimValue::U16(_) => Idx::U16,
            PrimValue::I32(_) => Idx::I32,
            PrimValue::U32(_) => Idx::U32,
            PrimValue::I64(_) => Idx::I64,
            PrimValue::U64(_) => Idx::U64,
            PrimValue::Float(_) => Idx::FLOAT,
            PrimValue::Double(_) => Idx::DOUBLE,
            PrimValue::Boolean(_) => Idx::BOOLEAN,
            PrimValue::String(_) => Idx::STRING,
            PrimValue::NullPtr => Idx::NULLPTR,
        }
    }

    /// Zero value of a primitive type. `None` for strings and non-primitives.
    pub fn zero(world: &World, ty: Idx) -> Option<Self> {
        let value = match world.prim_kind(ty)? {
            PrimKind::I8 => PrimValue::I8(0),
            PrimKind::U8 => PrimValue::U8(0),
            PrimKind::I16 => PrimValue::I16(0),
            PrimKind::U16 => PrimValue::U16(0),
            PrimKind::I32 => PrimValue::I32(0),
            PrimKind::U32 => PrimValue::U32(0),
            PrimKind::I64 => PrimValue::I64(0),
            PrimKind::U64 => PrimValue::U64(0),
            PrimKind::Float => PrimValue::Float(0.0),
            PrimKind::Double => PrimValue::Double(0.0),
            PrimKind::Boolean => PrimValue::Boolean(false),
            PrimKind::NullPtr => PrimValue::NullPtr,
            PrimKind::String => return None,
        };
        Some(value)
    }
}

impl fmt::Display for PrimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimValue::I8(v) => write!(f, "{v}"),
            PrimValue::U8(v) => write!(f, "{v}"),
            PrimValue::I16(v) => write!(f, "{v}"),
            PrimValue::U16(v) => write!(f, "{v}"),
            PrimValue::I32(v) => write!(f, "{v}"),
            PrimValue::U32(v) => write!(f, "{v}"),
            PrimValue::I64(v) => write!(f, "{v}"),
            PrimValue::U64(v) => write!(f, "{v}"),
            PrimValue::Float(v) => write!(f, "{v}"),
            PrimValue::Double(v) => write!(f, "{v}"),
            PrimValue::Boolean(v) => write!(f, "{v}"),
            PrimValue::String(v) => write!(f, "{v:?}"),
            PrimValue::NullPtr => f.write_str("nullptr"),
        }
    }
}

/// Marks its value as addressable; typed `ref(T)`.
pub struct MemRef {
    pub(super) value: Edge,
}

impl MemRef {
    pub fn value(&self) -> Option<Node> {
        self.value.get()
    }
}

pub struct PrimLiteral {
    value: PrimValue,
}

impl PrimLiteral {
    pub fn value(&self) -> &PrimValue {
        &self.value
    }
}

pub struct ListLiteral {
    pub(super) elems: EdgeList,
}

impl ListLiteral {
    pub fn elems(&self) -> &EdgeList {
        &self.elems
    }
}

/// A type used as a value, e.g. the argument of `sizeof`.
pub struct TypeExpr {
    type_value: Idx,
}

impl TypeExpr {
    pub fn type_value(&self) -> Idx {
        self.type_value
    }
}

/// A variable binding site.
pub struct DefExpr {
    name: RefCell<String>,
    has_address: bool,
    pub(super) mem_ref: MemRefCache,
}

impl DefExpr {
    pub fn name(&self) -> Ref<'_, str> {
        Ref::map(self.name.borrow(), String::as_str)
    }

    pub fn has_address(&self) -> bool {
        self.has_address
    }
}

/// A name awaiting resolution, optionally tied to the scope it was
/// written in.
pub struct SymbolExpr {
    name: String,
    scope: RefCell<Option<Rc<Scope>>>,
}

impl SymbolExpr {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> Option<Rc<Scope>> {
        self.scope.borrow().clone()
    }

    pub(super) fn clear_scope(&self) {
        let prev = self.scope.take();
        drop(prev);
    }
}

pub struct CallExpr {
    pub(super) callee: Edge,
    pub(super) args: EdgeList,
}

impl CallExpr {
    pub fn callee(&self) -> Option<Node> {
        self.callee.get()
    }

    /// The callee when it is a function definition (a direct call).
    pub fn called_function(&self) -> Option<Node> {
        self.callee
            .get()
            .filter(|callee| matches!(callee.kind(), NodeKind::FunctionDefinition(_)))
    }

    pub fn args(&self) -> &EdgeList {
        &self.args
    }
}

pub struct IfExpr {
    pub(super) cond: Edge,
    pub(super) then: Edge,
    pub(super) else_: Edge,
}

impl IfExpr {
    pub fn cond(&self) -> Option<Node> {
        self.cond.get()
    }

    pub fn then(&self) -> Option<Node> {
        self.then.get()
    }

    pub fn else_(&self) -> Option<Node> {
        self.else_.get()
    }
}

/// Infinite loop, left only through a break.
pub struct LoopExpr {
    pub(super) body: Edge,
}

impl LoopExpr {
    pub fn body(&self) -> Option<Node> {
        self.body.get()
    }
}

pub struct ForExpr {
    pub(super) var: Edge,
    pub(super) start: Edge,
    pub(super) end: Edge,
    pub(super) step: Edge,
    pub(super) body: Edge,
}

impl ForExpr {
    /// The loop variable (a `DefExpr`).
    pub fn var(&self) -> Option<Node> {
        self.var.get()
    }

    pub fn start(&self) -> Option<Node> {
        self.start.get()
    }

    pub fn end(&self) -> Option<Node> {
        self.end.get()
    }

    pub fn step(&self) -> Option<Node> {
        self.step.get()
    }

    pub fn body(&self) -> Option<Node> {
        self.body.get()
    }
}

pub struct LetExpr {
    pub(super) var: Edge,
    pub(super) init: Edge,
    pub(super) body: Edge,
}

impl LetExpr {
    /// The bound variable (a `DefExpr`).
    pub fn var(&self) -> Option<Node> {
        self.var.get()
    }

    pub fn init(&self) -> Option<Node> {
        self.init.get()
    }

    pub fn body(&self) -> Option<Node> {
        self.body.get()
    }
}

fn ref_type(world: &World, value: &Node) -> Idx {
    let ty = value.ty();
    if world.is_reference(ty) {
        ty
    } else {
        world.reference(ty)
    }
}

/// Return type of calling `callee`: the prototype's return type for a
/// function definition, the signature's return type for a function
/// pointer, [`Idx::NONE`] otherwise.
fn callee_return_type(world: &World, callee: &Node) -> Idx {
    if let Some(func) = callee.as_function() {
        return func.proto().return_type();
    }
    world
        .pointee(callee.ty())
        .and_then(|elem| world.function_signature(elem))
        .map_or(Idx::NONE, |(ret, _)| ret)
}

/// Unify the branch types of an `if`.
fn branch_type(world: &World, then: Option<&Node>, else_: Option<&Node>) -> Idx {
    let (Some(then), Some(else_)) = (then, else_) else {
        return Idx::VOID;
    };
    let (t1, t2) = (then.ty(), else_.ty());
    if world.canonically_equal(t1, Idx::ANY) {
        t2
    } else if world.canonically_equal(t2, Idx::ANY) || world.canonically_equal(t1, t2) {
        t1
    } else {
        Idx::VOID
    }
}

impl Node {
    /// Address-of wrapper. Wrapping a `MemRef` wraps its value instead.
    pub fn mem_ref(world: &World, value: &Node) -> Node {
        let ty = ref_type(world, value);
        let inner = value
            .as_mem_ref()
            .and_then(MemRef::value)
            .unwrap_or_else(|| value.clone());
        Node::from_kind(
            ty,
            NodeKind::MemRef(MemRef {
                value: Edge::new(Some(inner)),
            }),
        )
    }

    pub fn literal(value: PrimValue) -> Node {
        Node::literal_with_type(value.ty(), value)
    }

    /// Literal whose type is an alias of the value's type, e.g. a `size_t`
    /// constant.
    pub fn literal_with_type(ty: Idx, value: PrimValue) -> Node {
        Node::from_kind(ty, NodeKind::PrimLiteral(PrimLiteral { value }))
    }

    pub fn list_literal(ty: Idx, elems: Vec<Node>) -> Node {
        Node::from_kind(
            ty,
            NodeKind::ListLiteral(ListLiteral {
                elems: EdgeList::new(elems),
            }),
        )
    }

    pub fn type_expr(type_value: Idx) -> Node {
        Node::from_kind(Idx::TYPE, NodeKind::TypeExpr(TypeExpr { type_value }))
    }

    /// Variable binding site. An empty name gets a unique generated one.
    pub fn def_expr(name: &str, ty: Idx, has_address: bool) -> Node {
        let node = Node::from_kind(
            ty,
            NodeKind::DefExpr(DefExpr {
                name: RefCell::new(name.to_owned()),
                has_address,
                mem_ref: MemRefCache::default(),
            }),
        );
        if name.is_empty() {
            if let NodeKind::DefExpr(def) = node.kind() {
                *def.name.borrow_mut() = format!("$var_{:p}", node.addr());
            }
        }
        node
    }

    /// Addressable variable.
    pub fn variable(name: &str, ty: Idx) -> Node {
        Node::def_expr(name, ty, true)
    }

    pub fn symbol(world: &World, name: &str, scope: Option<Rc<Scope>>) -> Node {
        Node::from_kind(
            world.symbol(name),
            NodeKind::SymbolExpr(SymbolExpr {
                name: name.to_owned(),
                scope: RefCell::new(scope),
            }),
        )
    }

    pub fn call(world: &World, callee: Node, args: Vec<Node>) -> Node {
        let ty = callee_return_type(world, &callee);
        Node::from_kind(
            ty,
            NodeKind::Call(CallExpr {
                callee: Edge::new(Some(callee)),
                args: EdgeList::new(args),
            }),
        )
    }

    pub fn if_expr(world: &World, cond: Node, then: Node, else_: Option<Node>) -> Node {
        let ty = branch_type(world, Some(&then), else_.as_ref());
        Node::from_kind(
            ty,
            NodeKind::If(IfExpr {
                cond: Edge::new(Some(cond)),
                then: Edge::new(Some(then)),
                else_: Edge::new(else_),
            }),
        )
    }

    pub fn loop_expr(body: Node) -> Node {
        Node::from_kind(
            Idx::VOID,
            NodeKind::Loop(LoopExpr {
                body: Edge::new(Some(body)),
            }),
        )
    }

    /// `for var = start, end[, step] in body`. `var` must be a `DefExpr`.
    pub fn for_expr(var: Node, start: Node, end: Node, step: Option<Node>, body: Node) -> Node {
        debug_assert!(var.as_def().is_some(), "for loop variable must be a DefExpr");
        Node::from_kind(
            Idx::VOID,
            NodeKind::For(ForExpr {
                var: Edge::new(Some(var)),
                start: Edge::new(Some(start)),
                end: Edge::new(Some(end)),
                step: Edge::new(step),
                body: Edge::new(Some(body)),
            }),
        )
    }

    /// `var = init in body`. `var` must be a `DefExpr`.
    pub fn let_expr(var: Node, init: Option<Node>, body: Node) -> Node {
        debug_assert!(var.as_def().is_some(), "let variable must be a DefExpr");
        Node::from_kind(
            body.ty(),
            NodeKind::Let(LetExpr {
                var: Edge::new(Some(var)),
                init: Edge::new(init),
                body: Edge::new(Some(body)),
            }),
        )
    }
}
