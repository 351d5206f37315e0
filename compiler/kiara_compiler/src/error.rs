//! Errors raised while building IR and running compiler phases.

use std::fmt;

use kiara_ir::{ReturnTypeError, ScopeError, SourceLocation, VisitError};
use kiara_types::TypeError;

/// What went wrong in an [`IrBuilder`](crate::IrBuilder) operation.
///
/// The messages are user facing: parse errors are reported with them.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BuildErrorKind {
    #[error("no function '{name}' for arguments ({args}) declared")]
    NoFunction { name: String, args: String },

    #[error("'{name}' is not an expression: {object}")]
    NotAnExpression { name: String, object: String },

    #[error("'{name}' is not a function, and there is no {call_method} function: {expr} has type {ty}")]
    NoCallMethod {
        name: String,
        call_method: String,
        expr: String,
        ty: String,
    },

    #[error("'{name}' is not a function, and {call_method} is not a function: {expr} has type {ty}")]
    CallMethodNotAFunction {
        name: String,
        call_method: String,
        expr: String,
        ty: String,
    },

    #[error(
        "Multiple compatible function definitions for symbol \"{name}\" found, candidates:{}",
        signature_lines(.candidates)
    )]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },

    /// `callee` is the quoted name, with the mangled name when overloads
    /// were searched.
    #[error(
        "no matching function for call to {callee}, arguments: ({args}){}",
        candidate_list(.candidates)
    )]
    NoMatchingFunction {
        callee: String,
        args: String,
        candidates: Vec<String>,
    },

    #[error("Cannot convert value of type {from} to {to}")]
    NoConversion { from: String, to: String },

    #[error("Type {0} is not a reference")]
    NotAReference(String),

    #[error("Type {0} is neither a reference nor pointer")]
    NotDereferenceable(String),

    #[error("Type {0} is not a struct with a known layout")]
    NotAStruct(String),

    #[error("Cannot create cast from {from} to {to}")]
    UnsupportedCast { from: String, to: String },

    #[error("Cannot index {array} with {index}")]
    UnsupportedIndex { array: String, index: String },

    #[error("Cannot assign to {0}, it is not a reference")]
    NotAssignable(String),

    #[error("Symbol '{name}' is already bound to : {object}")]
    AlreadyBound { name: String, object: String },

    #[error("Scope contains already '{0}' symbol and it is not a function")]
    NotAFunction(String),

    #[error("Function '{name}' is already overloaded with signature : {signature}")]
    AlreadyOverloaded { name: String, signature: String },

    #[error(transparent)]
    ReturnType(#[from] ReturnTypeError),

    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

fn signature_lines(signatures: &[String]) -> String {
    signatures.iter().map(|sig| format!("\n{sig}")).collect()
}

fn candidate_list(signatures: &[String]) -> String {
    if signatures.is_empty() {
        return ", no candidates !".to_owned();
    }
    let mut out = ",\ncandidates:\n".to_owned();
    for sig in signatures {
        out.push_str(sig);
        out.push('\n');
    }
    out
}

/// A builder failure, with the source position it concerns if known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildError {
    pub location: Option<SourceLocation>,
    pub kind: BuildErrorKind,
}

impl BuildError {
    pub fn new(kind: BuildErrorKind) -> Self {
        BuildError {
            location: None,
            kind,
        }
    }

    #[must_use]
    pub fn at(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = self.location {
            write!(f, "{location}: ")?;
        }
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<BuildErrorKind> for BuildError {
    fn from(kind: BuildErrorKind) -> Self {
        BuildError::new(kind)
    }
}

impl From<ScopeError> for BuildError {
    fn from(err: ScopeError) -> Self {
        BuildError::new(err.into())
    }
}

impl From<ReturnTypeError> for BuildError {
    fn from(err: ReturnTypeError) -> Self {
        BuildError::new(err.into())
    }
}

impl From<TypeError> for BuildError {
    fn from(err: TypeError) -> Self {
        BuildError::new(err.into())
    }
}

/// Deliver `result` to a caller that may collect errors as text.
///
/// With a sink, a failure is written into it and `Ok(None)` returned.
/// Without one the error is passed on unchanged.
pub fn report<T>(
    result: Result<T, BuildError>,
    error_msg: Option<&mut String>,
) -> Result<Option<T>, BuildError> {
    match (result, error_msg) {
        (Ok(value), _) => Ok(Some(value)),
        (Err(err), Some(sink)) => {
            *sink = err.to_string();
            Ok(None)
        }
        (Err(err), None) => Err(err),
    }
}

/// Failure inside a [`Compiler`](crate::Compiler) run.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Visit(#[from] VisitError),

    #[error(transparent)]
    Build(#[from] BuildError),

    /// A phase emitted back into itself.
    #[error("compiler phase {phase} is already running")]
    Reentrant { phase: usize },
}
