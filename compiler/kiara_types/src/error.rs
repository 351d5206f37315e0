//! Errors raised while building types.

use std::fmt;

use crate::Idx;

/// Failure to define a type in the [`World`](crate::World).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeError {
    /// `define_struct` was called on a handle that is not a unique struct.
    NotAUniqueStruct(Idx),
    /// The struct already has fields.
    AlreadyDefined { name: String },
    /// Two fields share a name.
    DuplicateField { struct_name: String, field: String },
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::NotAUniqueStruct(idx) => {
                write!(f, "type {idx:?} is not a unique struct")
            }
            TypeError::AlreadyDefined { name } => {
                write!(f, "struct '{name}' is already defined")
            }
            TypeError::DuplicateField { struct_name, field } => {
                write!(f, "duplicate field '{field}' in struct '{struct_name}'")
            }
        }
    }
}

impl std::error::Error for TypeError {}
