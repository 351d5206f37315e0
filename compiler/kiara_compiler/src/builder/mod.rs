//! The IR builder.
//!
//! [`IrBuilder`] is the façade through which the parser and IR generators
//! create nodes. It owns a stack of active scopes; names are resolved
//! against the innermost one. Overload resolution lives in `call`,
//! helper synthesis in `intrinsics`.
//!
//! Helpers and other process-wide functions are registered in the *top*
//! scope of the chain, never a nested one, so every later lookup from any
//! nested scope finds the same definition.

mod call;
mod intrinsics;

use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use kiara_ir::{
    printer, Binding, Node, OverloadSet, OverloadedObjectMap, PrimValue, Prototype, Scope,
};
use kiara_types::{Idx, World};

use crate::{BuildError, BuildErrorKind};

pub use call::{CallMode, CallRequest, DEFAULT_CALL_METHOD};

/// Names bound by [`IrBuilder::register_default_types`].
const DEFAULT_TYPES: [(&str, Idx); 36] = [
    ("void", Idx::VOID),
    ("char", Idx::C_CHAR),
    ("schar", Idx::C_SCHAR),
    ("uchar", Idx::C_UCHAR),
    ("short", Idx::C_SHORT),
    ("ushort", Idx::C_USHORT),
    ("int", Idx::C_INT),
    ("uint", Idx::C_UINT),
    ("long", Idx::C_LONG),
    ("ulong", Idx::C_ULONG),
    ("longlong", Idx::C_LONGLONG),
    ("ulonglong", Idx::C_ULONGLONG),
    ("size_t", Idx::C_SIZE_T),
    ("ssize_t", Idx::C_SSIZE_T),
    ("float", Idx::C_FLOAT),
    ("double", Idx::C_DOUBLE),
    ("any", Idx::ANY),
    ("type", Idx::TYPE),
    ("boolean", Idx::BOOLEAN),
    ("int8_t", Idx::I8),
    ("uint8_t", Idx::U8),
    ("int16_t", Idx::I16),
    ("uint16_t", Idx::U16),
    ("int32_t", Idx::I32),
    ("uint32_t", Idx::U32),
    ("int64_t", Idx::I64),
    ("uint64_t", Idx::U64),
    ("i8", Idx::I8),
    ("u8", Idx::U8),
    ("i16", Idx::I16),
    ("u16", Idx::U16),
    ("i32", Idx::I32),
    ("u32", Idx::U32),
    ("i64", Idx::I64),
    ("u64", Idx::U64),
    ("string", Idx::STRING),
];

/// Builds IR against a type world and a stack of scopes.
pub struct IrBuilder<'w> {
    world: &'w World,
    scope: Rc<Scope>,
    outer: Vec<Rc<Scope>>,
}

impl<'w> IrBuilder<'w> {
    /// Builder over a fresh root scope named `global`.
    pub fn new(world: &'w World) -> Self {
        Self::with_scope(world, Scope::new("global"))
    }

    pub fn with_scope(world: &'w World, scope: Rc<Scope>) -> Self {
        IrBuilder {
            world,
            scope,
            outer: Vec::new(),
        }
    }

    pub fn world(&self) -> &'w World {
        self.world
    }

    /// The innermost active scope.
    pub fn scope(&self) -> &Rc<Scope> {
        &self.scope
    }

    /// Number of scopes on the stack.
    pub fn depth(&self) -> usize {
        self.outer.len() + 1
    }

    /// Replace the innermost scope.
    pub fn set_scope(&mut self, scope: Rc<Scope>) {
        self.scope = scope;
    }

    /// Enter a new child of the current scope and return it.
    pub fn push_scope(&mut self, name: &str) -> Rc<Scope> {
        let child = Scope::with_parent(name, &self.scope);
        self.push_existing_scope(Rc::clone(&child));
        child
    }

    pub fn push_existing_scope(&mut self, scope: Rc<Scope>) {
        let prev = std::mem::replace(&mut self.scope, scope);
        self.outer.push(prev);
    }

    /// Leave the innermost scope. The outermost scope is never popped.
    pub fn pop_scope(&mut self) -> Option<Rc<Scope>> {
        let prev = self.outer.pop()?;
        Some(std::mem::replace(&mut self.scope, prev))
    }

    /// Enter a child scope until the guard is dropped.
    pub fn scope_guard(&mut self, name: &str) -> ScopeGuard<'_, 'w> {
        let depth = self.depth();
        self.push_scope(name);
        ScopeGuard {
            builder: self,
            depth,
        }
    }

    pub fn create_literal(&self, value: PrimValue) -> Node {
        Node::literal(value)
    }

    /// Addressable variable, not bound anywhere.
    pub fn create_variable(&self, name: &str, ty: Idx) -> Node {
        Node::variable(name, ty)
    }

    /// Addressable variable bound in the current scope.
    pub fn create_variable_in_scope(&self, name: &str, ty: Idx) -> Result<Node, BuildError> {
        let var = self.create_variable(name, ty);
        self.add_variable_to_scope(&var)?;
        Ok(var)
    }

    /// Resolve `name` to an expression. A name with a single overload
    /// resolves to that function; a type name to a type expression.
    pub fn lookup_expr(&self, name: &str) -> Option<Node> {
        match self.scope.lookup_object(name, true)? {
            Binding::Expr(node) => Some(node),
            Binding::Overloads(set) => set.borrow().single(),
            Binding::Type(ty) => Some(Node::type_expr(ty)),
            Binding::Scope(_) => None,
        }
    }

    pub fn lookup_type(&self, name: &str) -> Option<Idx> {
        self.scope.lookup_object(name, true)?.as_type()
    }

    /// The function `name` stands for, if it is not overloaded.
    pub fn lookup_function(&self, name: &str) -> Option<Node> {
        self.lookup_expr(name).filter(|node| node.as_function().is_some())
    }

    /// Bind a variable under its own name.
    pub fn add_variable_to_scope(&self, var: &Node) -> Result<(), BuildError> {
        let Some(def) = var.as_def() else {
            return Err(BuildErrorKind::NotAnExpression {
                name: printer::to_string(self.world, var),
                object: var.kind().name().to_owned(),
            }
            .into());
        };
        let name = def.name().to_string();
        self.add_object_to_scope(&name, Binding::Expr(var.clone()))
    }

    /// Bind `name` in the current scope. The name must not be visible yet,
    /// not even from a parent scope.
    pub fn add_object_to_scope(&self, name: &str, binding: Binding) -> Result<(), BuildError> {
        if let Some(existing) = self.scope.lookup_object(name, true) {
            return Err(BuildErrorKind::AlreadyBound {
                name: name.to_owned(),
                object: self.describe_binding(&existing),
            }
            .into());
        }
        self.scope.add_object(name, binding)?;
        Ok(())
    }

    /// Register `func` as an overload of its name in the current scope.
    pub fn add_function(&self, func: &Node) -> Result<(), BuildError> {
        self.add_function_to_scope(func, &self.scope)
    }

    /// Register `func` as an overload of its name in `scope`.
    ///
    /// When the overloads of the name belong to an ancestor scope, they are
    /// copied into `scope` first, so the ancestor does not see the new one.
    pub fn add_function_to_scope(&self, func: &Node, scope: &Rc<Scope>) -> Result<(), BuildError> {
        let Some(def) = func.as_function() else {
            return Err(BuildErrorKind::NotAnExpression {
                name: printer::to_string(self.world, func),
                object: func.kind().name().to_owned(),
            }
            .into());
        };
        let name = def.name().to_owned();
        let mangled = def.mangled_name().to_string();

        let Some((binding, owner)) = scope.lookup_object_and_scope(&name) else {
            let mut map = OverloadedObjectMap::new(&name);
            map.add(&mangled, func.clone())?;
            scope.add_object(&name, Binding::Overloads(OverloadSet::new(map)))?;
            tracing::debug!(%name, %mangled, scope = %scope.full_name(), "new overload set");
            return Ok(());
        };

        let Some(set) = binding.as_overloads() else {
            return Err(BuildErrorKind::NotAFunction(name).into());
        };
        if set.borrow().lookup(&mangled).is_some() {
            return Err(BuildErrorKind::AlreadyOverloaded {
                name,
                signature: printer::prototype_to_string(self.world, def.proto()),
            }
            .into());
        }

        let set = if Rc::ptr_eq(&owner, scope) {
            set.clone()
        } else {
            let forked = set.fork();
            scope.add_object(&name, Binding::Overloads(forked.clone()))?;
            tracing::debug!(
                %name,
                from = %owner.full_name(),
                to = %scope.full_name(),
                "copy overload set"
            );
            forked
        };
        set.borrow_mut().add(&mangled, func.clone())?;
        tracing::debug!(%name, %mangled, scope = %scope.full_name(), "add overload");
        Ok(())
    }

    /// The function registered under the mangled name of `proto`, looking
    /// from `scope` outwards.
    pub fn get_function_from_scope(proto: &Prototype, scope: &Rc<Scope>) -> Option<Node> {
        let (binding, _) = scope.lookup_object_and_scope(proto.name())?;
        let found = binding.as_overloads()?.borrow().lookup(&proto.mangled_name())?;
        found.as_function().is_some().then_some(found)
    }

    pub fn has_function_in_scope(proto: &Prototype, scope: &Rc<Scope>) -> bool {
        Self::get_function_from_scope(proto, scope).is_some()
    }

    /// Bind the argument variables of `func`, then `func` itself, in the
    /// current scope.
    pub fn init_function_scope(&self, func: &Node) -> Result<(), BuildError> {
        if let Some(def) = func.as_function() {
            for arg in def.args().nodes() {
                self.add_variable_to_scope(&arg)?;
            }
        }
        self.add_function(func)
    }

    /// Bind the built-in type names in `scope`.
    pub fn register_default_types(scope: &Scope) -> Result<(), BuildError> {
        for (name, ty) in DEFAULT_TYPES {
            scope.add_object(name, Binding::Type(ty))?;
        }
        Ok(())
    }

    /// Argument types as `T, U, ...`.
    fn arg_type_names(&self, args: &[Node]) -> String {
        let names: Vec<String> = args.iter().map(|arg| self.world.type_name(arg.ty())).collect();
        names.join(", ")
    }

    fn describe_binding(&self, binding: &Binding) -> String {
        match binding {
            Binding::Type(ty) => self.world.type_name(*ty),
            Binding::Expr(node) => printer::to_string(self.world, node),
            Binding::Overloads(set) => {
                let funcs: Vec<String> = set
                    .borrow()
                    .functions()
                    .iter()
                    .map(|func| printer::to_string(self.world, func))
                    .collect();
                funcs.join("\n")
            }
            Binding::Scope(scope) => format!("scope {}", scope.full_name()),
        }
    }
}

/// Keeps a child scope active; dropping it restores the scope stack.
pub struct ScopeGuard<'b, 'w> {
    builder: &'b mut IrBuilder<'w>,
    depth: usize,
}

impl<'w> Deref for ScopeGuard<'_, 'w> {
    type Target = IrBuilder<'w>;

    fn deref(&self) -> &Self::Target {
        self.builder
    }
}

impl DerefMut for ScopeGuard<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.builder
    }
}

impl Drop for ScopeGuard<'_, '_> {
    fn drop(&mut self) {
        while self.builder.depth() > self.depth {
            self.builder.pop_scope();
        }
    }
}

#[cfg(test)]
mod tests;
