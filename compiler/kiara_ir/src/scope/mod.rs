//! Nested symbol tables.
//!
//! A [`Scope`] maps names to [`Binding`]s and links to its parent. Functions
//! are bound through an [`OverloadSet`], a shared table from mangled name
//! to function definition, so one surface name can carry many signatures.
//!
//! # Copy-on-write overloads
//!
//! An overload set is shared between every scope that can see it. Adding
//! an overload from a scope that does not own the set must first copy it
//! into that scope ([`OverloadSet::fork`]); mutating in place is only
//! allowed in the owning scope, which [`Scope::lookup_object_and_scope`]
//! reports.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use kiara_types::Idx;

use crate::{Node, ScopeError};

/// Every overload of one surface name, keyed by mangled name.
#[derive(Clone, Debug)]
pub struct OverloadedObjectMap {
    name: String,
    objects: BTreeMap<String, Node>,
}

impl OverloadedObjectMap {
    pub fn new(name: &str) -> Self {
        OverloadedObjectMap {
            name: name.to_owned(),
            objects: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Register `object` under `mangled`. The key must be new.
    pub fn add(&mut self, mangled: &str, object: Node) -> Result<(), ScopeError> {
        if self.objects.contains_key(mangled) {
            return Err(ScopeError {
                name: mangled.to_owned(),
            });
        }
        self.objects.insert(mangled.to_owned(), object);
        Ok(())
    }

    pub fn remove(&mut self, mangled: &str) -> bool {
        self.objects.remove(mangled).is_some()
    }

    pub fn lookup(&self, mangled: &str) -> Option<Node> {
        self.objects.get(mangled).cloned()
    }

    /// Mangled key under which `object` is registered.
    pub fn object_name(&self, object: &Node) -> Option<&str> {
        self.objects
            .iter()
            .find(|(_, candidate)| *candidate == object)
            .map(|(key, _)| key.as_str())
    }

    /// Entries in mangled-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.objects.iter().map(|(key, node)| (key.as_str(), node))
    }

    /// The registered functions, in mangled-name order.
    pub fn functions(&self) -> Vec<Node> {
        self.objects.values().cloned().collect()
    }

    /// The only entry, if there is exactly one.
    pub fn single(&self) -> Option<Node> {
        if self.objects.len() == 1 {
            self.objects.values().next().cloned()
        } else {
            None
        }
    }
}

/// Shared handle to an [`OverloadedObjectMap`].
#[repr(transparent)]
#[derive(Clone)]
pub struct OverloadSet(Rc<RefCell<OverloadedObjectMap>>);

impl OverloadSet {
    pub fn new(map: OverloadedObjectMap) -> Self {
        OverloadSet(Rc::new(RefCell::new(map)))
    }

    pub fn borrow(&self) -> Ref<'_, OverloadedObjectMap> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, OverloadedObjectMap> {
        self.0.borrow_mut()
    }

    /// Independent copy, for registering overloads in another scope.
    #[must_use]
    pub fn fork(&self) -> Self {
        OverloadSet::new(self.0.borrow().clone())
    }

    pub fn ptr_eq(&self, other: &OverloadSet) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for OverloadSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = self.0.borrow();
        f.debug_struct("OverloadSet")
            .field("name", &map.name)
            .field("keys", &map.objects.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// What a name in a scope stands for.
#[derive(Clone, Debug)]
pub enum Binding {
    Type(Idx),
    /// An IR node: a variable, a function, a type definition.
    Expr(Node),
    Overloads(OverloadSet),
    Scope(Rc<Scope>),
}

impl Binding {
    pub fn as_type(&self) -> Option<Idx> {
        match self {
            Binding::Type(ty) => Some(*ty),
            _ => None,
        }
    }

    pub fn as_expr(&self) -> Option<&Node> {
        match self {
            Binding::Expr(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_overloads(&self) -> Option<&OverloadSet> {
        match self {
            Binding::Overloads(set) => Some(set),
            _ => None,
        }
    }

    fn is_same(&self, node: &Node) -> bool {
        matches!(self, Binding::Expr(bound) if bound == node)
    }
}

/// A named symbol table with an optional parent.
pub struct Scope {
    name: String,
    parent: Option<Rc<Scope>>,
    objects: RefCell<BTreeMap<String, Binding>>,
}

impl Scope {
    /// A root scope.
    pub fn new(name: &str) -> Rc<Self> {
        Rc::new(Scope {
            name: name.to_owned(),
            parent: None,
            objects: RefCell::new(BTreeMap::new()),
        })
    }

    pub fn with_parent(name: &str, parent: &Rc<Scope>) -> Rc<Self> {
        Rc::new(Scope {
            name: name.to_owned(),
            parent: Some(Rc::clone(parent)),
            objects: RefCell::new(BTreeMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names along the chain from the root, joined with `.`.
    pub fn full_name(&self) -> String {
        let mut names = vec![self.name.as_str()];
        let mut scope = self.parent.as_deref();
        while let Some(current) = scope {
            names.push(&current.name);
            scope = current.parent.as_deref();
        }
        names.reverse();
        names.join(".")
    }

    pub fn parent(&self) -> Option<&Rc<Scope>> {
        self.parent.as_ref()
    }

    /// The root of the chain.
    pub fn top_scope(self: &Rc<Self>) -> Rc<Scope> {
        let mut scope = Rc::clone(self);
        while let Some(parent) = scope.parent.clone() {
            scope = parent;
        }
        scope
    }

    /// Bind `name` in this scope. Shadowing a parent binding is allowed;
    /// rebinding within the scope is not.
    pub fn add_object(&self, name: &str, binding: Binding) -> Result<(), ScopeError> {
        let mut objects = self.objects.borrow_mut();
        if objects.contains_key(name) {
            return Err(ScopeError {
                name: name.to_owned(),
            });
        }
        tracing::trace!(scope = %self.name, name, "bind");
        objects.insert(name.to_owned(), binding);
        Ok(())
    }

    /// Unbind `name` from this scope, if bound.
    pub fn remove_object(&self, name: &str) {
        let prev = self.objects.borrow_mut().remove(name);
        drop(prev);
    }

    /// Look up `name`.
    ///
    /// A recursive lookup merges the overload sets bound to `name` along
    /// the whole chain into a fresh set, nearer scopes overriding farther
    /// ones per mangled key. Without overloads, the nearest binding wins.
    pub fn lookup_object(&self, name: &str, recursive: bool) -> Option<Binding> {
        if recursive {
            let mut merged = OverloadedObjectMap::new(name);
            self.collect_overloads(name, &mut merged);
            if !merged.is_empty() {
                return Some(Binding::Overloads(OverloadSet::new(merged)));
            }
        }
        if let Some(binding) = self.lookup_local(name) {
            return Some(binding);
        }
        match &self.parent {
            Some(parent) if recursive => parent.lookup_object(name, recursive),
            _ => None,
        }
    }

    /// Binding of `name` in this scope only.
    pub fn lookup_local(&self, name: &str) -> Option<Binding> {
        self.objects.borrow().get(name).cloned()
    }

    /// Nearest binding of `name` together with the scope that owns it.
    /// Overload sets are returned as stored, not merged.
    pub fn lookup_object_and_scope(self: &Rc<Self>, name: &str) -> Option<(Binding, Rc<Scope>)> {
        if let Some(binding) = self.lookup_local(name) {
            return Some((binding, Rc::clone(self)));
        }
        self.parent
            .as_ref()
            .and_then(|parent| parent.lookup_object_and_scope(name))
    }

    /// Every overload bound to `name` along the chain, root first.
    pub fn lookup_objects_recursive(&self, name: &str) -> Vec<Node> {
        let mut out = Vec::new();
        self.collect_overload_list(name, &mut out);
        out
    }

    /// Name under which `node` is bound, searching parents if `recursive`.
    pub fn object_name(&self, node: &Node, recursive: bool) -> Option<String> {
        let found = self
            .objects
            .borrow()
            .iter()
            .find(|(_, binding)| binding.is_same(node))
            .map(|(name, _)| name.clone());
        match (found, &self.parent) {
            (Some(name), _) => Some(name),
            (None, Some(parent)) if recursive => parent.object_name(node, recursive),
            (None, _) => None,
        }
    }

    /// Snapshot of the local bindings, in name order.
    pub fn bindings(&self) -> Vec<(String, Binding)> {
        self.objects
            .borrow()
            .iter()
            .map(|(name, binding)| (name.clone(), binding.clone()))
            .collect()
    }

    /// Drop every local binding. Breaks cycles through symbols that refer
    /// back to this scope.
    pub fn clear(&self) {
        let prev = std::mem::take(&mut *self.objects.borrow_mut());
        drop(prev);
    }

    fn collect_overloads(&self, name: &str, out: &mut OverloadedObjectMap) {
        if let Some(parent) = &self.parent {
            parent.collect_overloads(name, out);
        }
        if let Some(Binding::Overloads(set)) = self.objects.borrow().get(name) {
            for (key, node) in set.borrow().iter() {
                out.objects.insert(key.to_owned(), node.clone());
            }
        }
    }

    fn collect_overload_list(&self, name: &str, out: &mut Vec<Node>) {
        if let Some(parent) = &self.parent {
            parent.collect_overload_list(name, out);
        }
        if let Some(Binding::Overloads(set)) = self.objects.borrow().get(name) {
            out.extend(set.borrow().functions());
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("name", &self.full_name())
            .field("names", &self.objects.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}
