//! Error types raised by IR construction, scopes and traversals.

use std::fmt;

/// A binding conflicts with one already present in the same scope or
/// overload map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeError {
    pub name: String,
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object '{}' already defined.", self.name)
    }
}

impl std::error::Error for ScopeError {}

/// A prototype's return type was already fixed to a different type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReturnTypeError {
    /// Name of the type already set.
    pub current: String,
    /// Name of the type that was requested.
    pub requested: String,
}

impl fmt::Display for ReturnTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Return type is already set to {}, cannot change to {}",
            self.current, self.requested
        )
    }
}

impl std::error::Error for ReturnTypeError {}

/// Failure while walking the IR.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VisitError {
    /// `apply` was handed a missing node.
    NullNode,
    /// The visitor has no handler for this node kind.
    Unsupported { kind: &'static str },
    /// A rebuilt child has the wrong kind for the edge it must fill.
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// Pass-specific failure.
    Failed(String),
}

impl fmt::Display for VisitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisitError::NullNode => write!(f, "NULL pointer"),
            VisitError::Unsupported { kind } => {
                write!(f, "Support for object type: {kind} was not implemented yet")
            }
            VisitError::KindMismatch { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            VisitError::Failed(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for VisitError {}
