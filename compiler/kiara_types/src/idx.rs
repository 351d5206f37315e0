//! Type handle into the [`World`](crate::World).
//!
//! # Design
//!
//! - 32-bit indices, `Copy`, compared by value
//! - The built-in types (void, any, primitives, C typedefs) are interned
//!   at world creation in a fixed order, so their handles are constants
//! - Two handles may still denote the same type after typedef stripping;
//!   use [`World::canonically_equal`](crate::World::canonically_equal)
//!   for semantic equality

use std::fmt;

/// A 32-bit index into the type world.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Idx(u32);

impl Idx {
    // === Special types (0-3) ===

    /// `void`.
    pub const VOID: Self = Self(0);
    /// `any`: accepts every value.
    pub const ANY: Self = Self(1);
    /// `type`: the type of reified types (`TypeExpr`).
    pub const TYPE: Self = Self(2);
    /// Placeholder for names that have not been resolved yet.
    pub const UNRESOLVED: Self = Self(3);

    // === Primitive types (4-16) ===

    pub const I8: Self = Self(4);
    pub const U8: Self = Self(5);
    pub const I16: Self = Self(6);
    pub const U16: Self = Self(7);
    pub const I32: Self = Self(8);
    pub const U32: Self = Self(9);
    pub const I64: Self = Self(10);
    pub const U64: Self = Self(11);
    pub const FLOAT: Self = Self(12);
    pub const DOUBLE: Self = Self(13);
    pub const BOOLEAN: Self = Self(14);
    /// String literal type.
    pub const STRING: Self = Self(15);
    /// Type of the null pointer literal.
    pub const NULLPTR: Self = Self(16);

    // === C typedefs (17-32) ===
    // Each is a typedef over the primitive of the same width.

    pub const C_CHAR: Self = Self(17);
    pub const C_SCHAR: Self = Self(18);
    pub const C_UCHAR: Self = Self(19);
    pub const C_SHORT: Self = Self(20);
    pub const C_USHORT: Self = Self(21);
    pub const C_INT: Self = Self(22);
    pub const C_UINT: Self = Self(23);
    pub const C_LONG: Self = Self(24);
    pub const C_ULONG: Self = Self(25);
    pub const C_LONGLONG: Self = Self(26);
    pub const C_ULONGLONG: Self = Self(27);
    pub const C_SIZE_T: Self = Self(28);
    pub const C_SSIZE_T: Self = Self(29);
    pub const C_FLOAT: Self = Self(30);
    pub const C_DOUBLE: Self = Self(31);
    pub const C_BOOL: Self = Self(32);

    /// Number of types interned by [`World::new`](crate::World::new).
    pub const BUILTIN_COUNT: u32 = 33;

    /// Unknown type (e.g. a prototype whose return type is not inferred yet).
    pub const NONE: Self = Self(u32::MAX);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check if this handle was interned by the world constructor.
    #[inline]
    pub const fn is_builtin(self) -> bool {
        self.0 < Self::BUILTIN_COUNT
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    pub const fn is_some(self) -> bool {
        !self.is_none()
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Idx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "Idx::NONE")
        } else {
            write!(f, "Idx({})", self.0)
        }
    }
}

impl Default for Idx {
    fn default() -> Self {
        Self::NONE
    }
}
