//! Queries on the canonical form of types.
//!
//! Every query strips typedefs first, and answers `None` (or `false`) for
//! [`Idx::NONE`] instead of panicking.

use super::World;
use crate::data::{ParamList, PrimKind, StructField, TypeData};
use crate::{Idx, TypeFlags};

impl World {
    /// Apply `f` to the canonical data of `idx`.
    fn with_canonical<R>(&self, idx: Idx, f: impl FnOnce(&TypeData) -> Option<R>) -> Option<R> {
        let data = self.data(self.canonical(idx))?;
        f(&data)
    }

    pub fn prim_kind(&self, idx: Idx) -> Option<PrimKind> {
        self.with_canonical(idx, |data| match data {
            TypeData::Prim(kind) => Some(*kind),
            _ => None,
        })
    }

    /// Element of `ptr(T)`.
    pub fn pointee(&self, idx: Idx) -> Option<Idx> {
        self.with_canonical(idx, |data| match data {
            TypeData::Ptr(elem) => Some(*elem),
            _ => None,
        })
    }

    /// Element of `ref(T)`.
    pub fn referent(&self, idx: Idx) -> Option<Idx> {
        self.with_canonical(idx, |data| match data {
            TypeData::Ref(elem) => Some(*elem),
            _ => None,
        })
    }

    /// Element of a dynamic or fixed array.
    pub fn array_element(&self, idx: Idx) -> Option<Idx> {
        self.with_canonical(idx, |data| match data {
            TypeData::Array(elem) | TypeData::FixedArray { elem, .. } => Some(*elem),
            _ => None,
        })
    }

    /// Length of `array(T, N)`.
    pub fn array_len(&self, idx: Idx) -> Option<u64> {
        self.with_canonical(idx, |data| match data {
            TypeData::FixedArray { len, .. } => Some(*len),
            _ => None,
        })
    }

    /// Return type and parameters of a function type.
    pub fn function_signature(&self, idx: Idx) -> Option<(Idx, ParamList)> {
        self.with_canonical(idx, |data| match data {
            TypeData::Function { ret, params } => Some((*ret, params.clone())),
            _ => None,
        })
    }

    /// Fields of a defined struct. `None` for opaque structs and non-structs.
    pub fn struct_fields(&self, idx: Idx) -> Option<Vec<StructField>> {
        self.with_canonical(idx, |data| match data {
            TypeData::Struct(data) => data.fields.clone(),
            _ => None,
        })
    }

    pub fn struct_name(&self, idx: Idx) -> Option<String> {
        self.with_canonical(idx, |data| match data {
            TypeData::Struct(data) => Some(data.name.clone()),
            _ => None,
        })
    }

    /// Name carried by `symbol("name")`.
    pub fn symbol_name(&self, idx: Idx) -> Option<String> {
        self.with_canonical(idx, |data| match data {
            TypeData::Symbol(name) => Some(name.clone()),
            _ => None,
        })
    }

    /// Name of a typedef. Looks at `idx` itself, not its canonical form.
    pub fn typedef_name(&self, idx: Idx) -> Option<String> {
        match self.data(idx).as_deref() {
            Some(TypeData::Typedef { name, .. }) => Some(name.clone()),
            _ => None,
        }
    }

    pub fn is_unique(&self, idx: Idx) -> bool {
        self.flags(idx).contains(TypeFlags::IS_UNIQUE)
    }

    pub fn is_integer(&self, idx: Idx) -> bool {
        self.flags(idx).is_integer()
    }

    pub fn is_signed_integer(&self, idx: Idx) -> bool {
        self.flags(idx).contains(TypeFlags::IS_SIGNED)
    }

    pub fn is_pointer(&self, idx: Idx) -> bool {
        self.flags(idx).is_pointer()
    }

    pub fn is_reference(&self, idx: Idx) -> bool {
        self.flags(idx).is_reference()
    }

    pub fn is_function(&self, idx: Idx) -> bool {
        self.flags(idx).contains(TypeFlags::IS_FUNCTION)
    }

    /// `ptr(fn(...))`: a callable value.
    pub fn is_function_pointer(&self, idx: Idx) -> bool {
        self.pointee(idx).is_some_and(|elem| self.is_function(elem))
    }

    pub fn is_void(&self, idx: Idx) -> bool {
        self.canonical(idx) == Idx::VOID
    }
}
