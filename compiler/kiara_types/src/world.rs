//! The type world: a hash-consing store of every type in a compilation.
//!
//! # Design
//!
//! - Structural types are interned: equal [`TypeData`] yields the same [`Idx`]
//! - Each entry records its canonical form (typedefs stripped at every
//!   level) and its [`TypeFlags`], both computed once at intern time
//! - Unique structs bypass the intern map so that two declarations with the
//!   same name stay distinct
//! - Interior mutability lets IR nodes and the builder share `&World`
//!   while new types are created

mod construct;
mod format;
mod layout;
mod query;

use std::cell::{Ref, RefCell};

use rustc_hash::FxHashMap;

use crate::data::{PrimKind, StructData, TypeData};
use crate::{Idx, TypeFlags};

struct Entry {
    data: TypeData,
    canonical: Idx,
    flags: TypeFlags,
}

#[derive(Default)]
struct Store {
    entries: Vec<Entry>,
    map: FxHashMap<TypeData, Idx>,
}

/// Owner of all types.
pub struct World {
    store: RefCell<Store>,
}

const PRIMITIVES: [PrimKind; 13] = [
    PrimKind::I8,
    PrimKind::U8,
    PrimKind::I16,
    PrimKind::U16,
    PrimKind::I32,
    PrimKind::U32,
    PrimKind::I64,
    PrimKind::U64,
    PrimKind::Float,
    PrimKind::Double,
    PrimKind::Boolean,
    PrimKind::String,
    PrimKind::NullPtr,
];

const C_TYPEDEFS: [(&str, Idx); 16] = [
    ("char", Idx::I8),
    ("schar", Idx::I8),
    ("uchar", Idx::U8),
    ("short", Idx::I16),
    ("ushort", Idx::U16),
    ("int", Idx::I32),
    ("uint", Idx::U32),
    ("long", Idx::I64),
    ("ulong", Idx::U64),
    ("longlong", Idx::I64),
    ("ulonglong", Idx::U64),
    ("size_t", Idx::U64),
    ("ssize_t", Idx::I64),
    ("float", Idx::FLOAT),
    ("double", Idx::DOUBLE),
    ("bool", Idx::BOOLEAN),
];

impl World {
    /// Create a world holding the built-in types at their fixed handles.
    pub fn new() -> Self {
        let world = World {
            store: RefCell::new(Store::default()),
        };

        world.intern(TypeData::Void);
        world.intern(TypeData::Any);
        world.intern(TypeData::Type);
        world.intern(TypeData::UnresolvedSymbol);
        for kind in PRIMITIVES {
            world.intern(TypeData::Prim(kind));
        }
        for (name, target) in C_TYPEDEFS {
            world.intern(TypeData::Typedef {
                name: name.to_owned(),
                target,
            });
        }

        debug_assert_eq!(world.len(), Idx::BUILTIN_COUNT as usize);
        world
    }

    /// Number of types in the world.
    pub fn len(&self) -> usize {
        self.store.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that `idx` names an entry of this world.
    pub fn contains(&self, idx: Idx) -> bool {
        idx.is_some() && idx.index() < self.len()
    }

    /// Borrow the structural data of a type.
    ///
    /// Returns `None` for [`Idx::NONE`] and foreign handles. The borrow must
    /// be released before any new type is interned.
    pub fn data(&self, idx: Idx) -> Option<Ref<'_, TypeData>> {
        if !self.contains(idx) {
            return None;
        }
        Some(Ref::map(self.store.borrow(), |store| {
            &store.entries[idx.index()].data
        }))
    }

    /// Canonical form of `idx` (itself when it has no typedefs).
    ///
    /// [`Idx::NONE`] maps to itself.
    pub fn canonical(&self, idx: Idx) -> Idx {
        if !self.contains(idx) {
            return idx;
        }
        self.store.borrow().entries[idx.index()].canonical
    }

    /// Semantic type equality: equal after stripping typedefs.
    pub fn canonically_equal(&self, a: Idx, b: Idx) -> bool {
        self.canonical(a) == self.canonical(b)
    }

    /// Cached flags of `idx`. Empty for [`Idx::NONE`].
    pub fn flags(&self, idx: Idx) -> TypeFlags {
        if !self.contains(idx) {
            return TypeFlags::empty();
        }
        self.store.borrow().entries[idx.index()].flags
    }

    /// Intern structural type data, returning the existing handle if an
    /// equal type is already present.
    pub fn intern(&self, data: TypeData) -> Idx {
        if let Some(&idx) = self.store.borrow().map.get(&data) {
            return idx;
        }

        let canonical = self.canonicalize(&data);
        let flags = self.compute_flags(&data, canonical);

        let mut store = self.store.borrow_mut();
        let idx = Self::next_idx(&store);
        store.entries.push(Entry {
            data: data.clone(),
            canonical: canonical.unwrap_or(idx),
            flags,
        });
        store.map.insert(data, idx);
        tracing::trace!(?idx, "interned type");
        idx
    }

    /// Push an entry that does not participate in hash-consing.
    fn push_unique(&self, data: StructData) -> Idx {
        let flags = TypeFlags::category_of(&TypeData::Struct(data.clone()));
        let mut store = self.store.borrow_mut();
        let idx = Self::next_idx(&store);
        store.entries.push(Entry {
            data: TypeData::Struct(data),
            canonical: idx,
            flags,
        });
        idx
    }

    #[allow(clippy::cast_possible_truncation)]
    fn next_idx(store: &Store) -> Idx {
        Idx::from_raw(store.entries.len() as u32)
    }

    /// Canonical handle for `data`, or `None` when `data` is already
    /// canonical (the new entry is its own canonical form).
    fn canonicalize(&self, data: &TypeData) -> Option<Idx> {
        if let TypeData::Typedef { target, .. } = data {
            return Some(self.canonical(*target));
        }

        let rebuilt = data.map_children(|child| self.canonical(child));
        if rebuilt == *data {
            None
        } else {
            Some(self.intern(rebuilt))
        }
    }

    fn compute_flags(&self, data: &TypeData, canonical: Option<Idx>) -> TypeFlags {
        let mut flags = match canonical {
            Some(idx) => self.flags(idx) & !TypeFlags::PROPAGATE_MASK,
            None => TypeFlags::category_of(data),
        };
        if matches!(data, TypeData::Typedef { .. }) {
            flags |= TypeFlags::HAS_TYPEDEF;
        }
        for child in data.children() {
            flags |= TypeFlags::propagate_from(self.flags(child));
        }
        flags
    }

    /// Replace the fields of a declared unique struct.
    fn set_struct_fields(&self, idx: Idx, fields: Vec<crate::StructField>) {
        let child_flags = fields
            .iter()
            .fold(TypeFlags::empty(), |acc, field| {
                acc | TypeFlags::propagate_from(self.flags(field.ty))
            });

        let mut store = self.store.borrow_mut();
        let entry = &mut store.entries[idx.index()];
        if let TypeData::Struct(data) = &mut entry.data {
            data.fields = Some(fields);
        }
        entry.flags.remove(TypeFlags::IS_OPAQUE);
        entry.flags |= child_flags;
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World").field("len", &self.len()).finish()
    }
}
