//! Type world for the KIARA IDL compiler.
//!
//! Types are hash-consed into a [`World`] and referred to by [`Idx`]
//! handles. Built-in types (void, any, primitives and the C typedefs) live
//! at fixed handles, so `Idx::I32` is valid in every world.
//!
//! # Canonical form
//!
//! A typedef is a distinct handle that is semantically equal to its
//! target. Each entry stores its canonical form, so semantic equality is
//! one comparison: [`World::canonically_equal`].

mod data;
mod error;
mod flags;
mod idx;
mod world;

pub use data::{ParamList, PrimKind, StructData, StructField, TypeData};
pub use error::TypeError;
pub use flags::TypeFlags;
pub use idx::Idx;
pub use world::World;
