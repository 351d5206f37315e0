//! Prototypes, type definitions and function definitions.

use std::cell::{Cell, Ref, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use kiara_types::{Idx, World};

use super::{Edge, EdgeList, MemRefCache, Node, NodeKind};
use crate::mangle::Mangler;
use crate::ReturnTypeError;

/// Ordered string attributes attached to a prototype, e.g. `always_inline`
/// or `llvm`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_owned(), value.to_owned());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) {
        self.0.remove(key);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// `[key, key2(value)] `; flag values (`true`, `1`) are not printed.
impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        f.write_str("[")?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(key)?;
            if value != "true" && value != "1" {
                write!(f, "({value})")?;
            }
        }
        f.write_str("] ")
    }
}

/// A function signature: names, typed arguments, return type and operator
/// metadata.
///
/// The return type may be unknown ([`Idx::NONE`]) or `any` at
/// construction and is fixed at most once afterwards. The function type is
/// known once every argument type and the return type are.
pub struct Prototype {
    name: String,
    mangled_name: RefCell<String>,
    args: Vec<(String, Idx)>,
    ret: Cell<Idx>,
    function_type: Cell<Idx>,
    is_operator: bool,
    precedence: u32,
    attributes: RefCell<Attributes>,
}

impl Prototype {
    /// Prototype whose mangled name is its plain name.
    pub fn new(world: &World, name: &str, ret: Idx, args: Vec<(String, Idx)>) -> Self {
        Self::with_mangled_name(world, name, name, ret, args)
    }

    pub fn with_mangled_name(
        world: &World,
        name: &str,
        mangled_name: &str,
        ret: Idx,
        args: Vec<(String, Idx)>,
    ) -> Self {
        Self::build(world, name, mangled_name.to_owned(), ret, args, false, 0)
    }

    /// Prototype keyed by the mangled form of its name and argument types.
    pub fn mangled(world: &World, name: &str, ret: Idx, args: Vec<(String, Idx)>) -> Self {
        let arg_types: Vec<Idx> = args.iter().map(|(_, ty)| *ty).collect();
        let mangled = Mangler::new(world).mangle_function(name, &arg_types);
        Self::build(world, name, mangled, ret, args, false, 0)
    }

    /// C linkage: unmangled and marked with the `C` attribute.
    pub fn c_function(world: &World, name: &str, ret: Idx, args: Vec<(String, Idx)>) -> Self {
        let proto = Self::new(world, name, ret, args);
        proto.set_attribute("C", "true");
        proto
    }

    /// Unary or binary operator. Binary operators carry a precedence.
    pub fn operator(
        world: &World,
        name: &str,
        ret: Idx,
        args: Vec<(String, Idx)>,
        precedence: u32,
    ) -> Self {
        let arg_types: Vec<Idx> = args.iter().map(|(_, ty)| *ty).collect();
        let mangled = Mangler::new(world).mangle_function(name, &arg_types);
        Self::build(world, name, mangled, ret, args, true, precedence)
    }

    fn build(
        world: &World,
        name: &str,
        mangled_name: String,
        ret: Idx,
        args: Vec<(String, Idx)>,
        is_operator: bool,
        precedence: u32,
    ) -> Self {
        let proto = Prototype {
            name: name.to_owned(),
            mangled_name: RefCell::new(mangled_name),
            args,
            ret: Cell::new(ret),
            function_type: Cell::new(Idx::NONE),
            is_operator,
            precedence,
            attributes: RefCell::new(Attributes::new()),
        };
        proto.compute_function_type(world);
        proto
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mangled_name(&self) -> Ref<'_, str> {
        Ref::map(self.mangled_name.borrow(), String::as_str)
    }

    pub fn set_mangled_name(&self, name: &str) {
        name.clone_into(&mut self.mangled_name.borrow_mut());
    }

    pub fn args(&self) -> &[(String, Idx)] {
        &self.args
    }

    pub fn arg_types(&self) -> Vec<Idx> {
        self.args.iter().map(|(_, ty)| *ty).collect()
    }

    pub fn return_type(&self) -> Idx {
        self.ret.get()
    }

    /// `fn(args) -> ret`, or [`Idx::NONE`] while a type is still unknown.
    pub fn function_type(&self) -> Idx {
        self.function_type.get()
    }

    pub fn is_operator(&self) -> bool {
        self.is_operator
    }

    pub fn is_unary_op(&self) -> bool {
        self.is_operator && self.args.len() == 1
    }

    pub fn is_binary_op(&self) -> bool {
        self.is_operator && self.args.len() == 2
    }

    pub fn precedence(&self) -> u32 {
        self.precedence
    }

    pub fn attributes(&self) -> Ref<'_, Attributes> {
        self.attributes.borrow()
    }

    pub fn set_attribute(&self, key: &str, value: &str) {
        self.attributes.borrow_mut().set(key, value);
    }

    pub fn attribute(&self, key: &str) -> Option<String> {
        self.attributes.borrow().get(key).map(str::to_owned)
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.borrow().has(key)
    }

    /// Fix the return type.
    ///
    /// Setting a canonically equal type is a no-op. An unknown or `any`
    /// return type may be replaced; any other type may not.
    pub fn set_return_type(&self, world: &World, ty: Idx) -> Result<(), ReturnTypeError> {
        let ret = self.ret.get();
        if ret == ty || (ret.is_some() && world.canonically_equal(ret, ty)) {
            return Ok(());
        }
        if ret.is_some() && !world.canonically_equal(ret, Idx::ANY) {
            return Err(ReturnTypeError {
                current: world.type_name(ret),
                requested: world.type_name(ty),
            });
        }
        self.ret.set(ty);
        self.compute_function_type(world);
        Ok(())
    }

    fn compute_function_type(&self, world: &World) {
        let ret = self.ret.get();
        let known = ret.is_some() && self.args.iter().all(|(_, ty)| ty.is_some());
        let ty = if known {
            world.function(ret, &self.arg_types())
        } else {
            Idx::NONE
        };
        self.function_type.set(ty);
    }
}

impl fmt::Debug for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prototype")
            .field("name", &self.name)
            .field("mangled_name", &*self.mangled_name.borrow())
            .field("args", &self.args)
            .field("ret", &self.ret.get())
            .finish_non_exhaustive()
    }
}

/// Binds a name to a type. A declaration, not an expression.
pub struct TypeDefinition {
    name: String,
    defined_type: Idx,
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn defined_type(&self) -> Idx {
        self.defined_type
    }
}

/// What stands behind a function definition's prototype.
pub enum FunctionBody {
    /// A body expression; `None` until set.
    Function(Edge),
    /// Resolved by the linker.
    Extern,
    /// Opaque backend code template, emitted verbatim.
    Intrinsic(String),
    /// Signature only.
    Declaration { is_extern: bool },
}

/// A prototype with its argument variables and a body.
pub struct FunctionDefinition {
    proto: Rc<Prototype>,
    pub(super) args: EdgeList,
    body: FunctionBody,
    pub(super) mem_ref: MemRefCache,
}

impl FunctionDefinition {
    pub fn proto(&self) -> &Rc<Prototype> {
        &self.proto
    }

    pub fn name(&self) -> &str {
        self.proto.name()
    }

    pub fn mangled_name(&self) -> Ref<'_, str> {
        self.proto.mangled_name()
    }

    /// Argument variables, one addressable `DefExpr` per prototype argument.
    pub fn args(&self) -> &EdgeList {
        &self.args
    }

    pub fn body(&self) -> &FunctionBody {
        &self.body
    }

    /// Body expression of a plain function.
    pub fn body_expr(&self) -> Option<Node> {
        match &self.body {
            FunctionBody::Function(body) => body.get(),
            _ => None,
        }
    }

    /// Code template of an intrinsic.
    pub fn intrinsic_body(&self) -> Option<&str> {
        match &self.body {
            FunctionBody::Intrinsic(code) => Some(code),
            _ => None,
        }
    }

    pub fn is_extern(&self) -> bool {
        matches!(
            self.body,
            FunctionBody::Extern | FunctionBody::Declaration { is_extern: true }
        )
    }

    /// Set the body of a plain function and infer the return type from it.
    /// Other function kinds ignore the body.
    pub fn set_body(&self, world: &World, body: Option<Node>) -> Result<(), ReturnTypeError> {
        let FunctionBody::Function(edge) = &self.body else {
            return Ok(());
        };
        let ty = body.as_ref().map(Node::ty);
        edge.set(body);
        match ty {
            Some(ty) => self.proto.set_return_type(world, ty),
            None => Ok(()),
        }
    }
}

impl Node {
    pub fn prototype(proto: Rc<Prototype>) -> Node {
        Node::from_kind(Idx::NONE, NodeKind::Prototype(proto))
    }

    pub fn type_definition(name: &str, defined_type: Idx) -> Node {
        Node::from_kind(
            Idx::NONE,
            NodeKind::TypeDefinition(TypeDefinition {
                name: name.to_owned(),
                defined_type,
            }),
        )
    }

    fn function_definition(proto: Rc<Prototype>, body: FunctionBody) -> Node {
        let args = proto
            .args()
            .iter()
            .map(|(name, ty)| Node::variable(name, *ty))
            .collect();
        Node::from_kind(
            Idx::NONE,
            NodeKind::FunctionDefinition(FunctionDefinition {
                proto,
                args: EdgeList::new(args),
                body,
                mem_ref: MemRefCache::default(),
            }),
        )
    }

    /// Function with an optional body. A body fixes the return type.
    pub fn function(
        world: &World,
        proto: Rc<Prototype>,
        body: Option<Node>,
    ) -> Result<Node, ReturnTypeError> {
        let node = Node::function_definition(proto, FunctionBody::Function(Edge::default()));
        if let Some(func) = node.as_function() {
            func.set_body(world, body)?;
        }
        Ok(node)
    }

    /// Copy of the plain function `self` with a new body. The argument
    /// variables are shared with the original, so the body keeps
    /// referring to them.
    pub(crate) fn with_function_body(
        &self,
        world: &World,
        body: Option<Node>,
    ) -> Result<Option<Node>, ReturnTypeError> {
        let Some(func) = self.as_function() else {
            return Ok(None);
        };
        if !matches!(func.body, FunctionBody::Function(_)) {
            return Ok(None);
        }
        let node = Node::from_kind(
            Idx::NONE,
            NodeKind::FunctionDefinition(FunctionDefinition {
                proto: Rc::clone(&func.proto),
                args: EdgeList::new(func.args.nodes()),
                body: FunctionBody::Function(Edge::default()),
                mem_ref: MemRefCache::default(),
            }),
        );
        if let Some(copy) = node.as_function() {
            copy.set_body(world, body)?;
        }
        Ok(Some(node.with_location(self.location())))
    }

    pub fn extern_function(proto: Rc<Prototype>) -> Node {
        Node::function_definition(proto, FunctionBody::Extern)
    }

    pub fn intrinsic(proto: Rc<Prototype>, code: &str) -> Node {
        Node::function_definition(proto, FunctionBody::Intrinsic(code.to_owned()))
    }

    pub fn function_declaration(proto: Rc<Prototype>, is_extern: bool) -> Node {
        Node::function_definition(proto, FunctionBody::Declaration { is_extern })
    }
}
