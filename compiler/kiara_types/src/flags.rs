//! Per-type property flags, computed once when a type is interned.

use bitflags::bitflags;

use crate::data::TypeData;

bitflags! {
    /// Cached properties of the canonical form of a type.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct TypeFlags: u32 {
        // === Category (bits 0-9) ===

        const IS_PRIMITIVE = 1 << 0;
        const IS_INTEGER = 1 << 1;
        const IS_SIGNED = 1 << 2;
        const IS_FLOATING = 1 << 3;
        const IS_POINTER = 1 << 4;
        const IS_REFERENCE = 1 << 5;
        const IS_ARRAY = 1 << 6;
        const IS_FUNCTION = 1 << 7;
        const IS_STRUCT = 1 << 8;
        const IS_UNIQUE = 1 << 9;
        /// A unique struct that is declared but has no fields yet.
        const IS_OPAQUE = 1 << 10;

        // === Presence (bit 16) ===

        /// The type itself or one of its components is a typedef.
        const HAS_TYPEDEF = 1 << 16;
    }
}

impl TypeFlags {
    /// Flags inherited by a compound type from its components.
    pub const PROPAGATE_MASK: Self = Self::HAS_TYPEDEF;

    /// Category flags of a single level of type data.
    pub(crate) fn category_of(data: &TypeData) -> Self {
        match data {
            TypeData::Prim(kind) => {
                let mut flags = Self::IS_PRIMITIVE;
                if kind.is_integer() {
                    flags |= Self::IS_INTEGER;
                }
                if kind.is_signed_integer() {
                    flags |= Self::IS_SIGNED;
                }
                if kind.is_floating_point() {
                    flags |= Self::IS_FLOATING;
                }
                flags
            }
            TypeData::Ptr(_) => Self::IS_POINTER,
            TypeData::Ref(_) => Self::IS_REFERENCE,
            TypeData::Array(_) | TypeData::FixedArray { .. } => Self::IS_ARRAY,
            TypeData::Function { .. } => Self::IS_FUNCTION,
            TypeData::Struct(data) => {
                let mut flags = Self::IS_STRUCT;
                if data.unique {
                    flags |= Self::IS_UNIQUE;
                }
                if data.fields.is_none() {
                    flags |= Self::IS_OPAQUE;
                }
                flags
            }
            TypeData::Typedef { .. } => Self::HAS_TYPEDEF,
            TypeData::Void
            | TypeData::Any
            | TypeData::Type
            | TypeData::UnresolvedSymbol
            | TypeData::Symbol(_) => Self::empty(),
        }
    }

    #[inline]
    pub const fn propagate_from(child: Self) -> Self {
        Self::from_bits_truncate(child.bits() & Self::PROPAGATE_MASK.bits())
    }

    #[inline]
    pub const fn is_integer(self) -> bool {
        self.contains(Self::IS_INTEGER)
    }

    #[inline]
    pub const fn is_pointer(self) -> bool {
        self.contains(Self::IS_POINTER)
    }

    #[inline]
    pub const fn is_reference(self) -> bool {
        self.contains(Self::IS_REFERENCE)
    }
}
