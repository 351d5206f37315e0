//! KIARA IR - node graph, scopes and traversals
//!
//! This crate holds the intermediate representation the KIARA compiler
//! builds from IDL declarations:
//! - [`Node`] handles over a shared, mutable expression graph
//! - [`Scope`] chains binding names to types, expressions and overloads
//! - [`Mangler`] for collision-free names of overloaded functions
//! - [`visitor`], [`replacer`] and [`transformer`] for walking and
//!   rewriting the graph
//! - [`printer`] for diagnostics dumps
//!
//! Types are not defined here: nodes carry [`kiara_types::Idx`] handles
//! into a [`kiara_types::World`].

mod error;
mod location;
pub mod mangle;
mod node;
pub mod printer;
pub mod replacer;
mod scope;
pub mod transformer;
pub mod visitor;

pub use error::{ReturnTypeError, ScopeError, VisitError};
pub use location::SourceLocation;
pub use mangle::{MangleMode, Mangler};
pub use node::{
    Attributes, BlockExpr, BreakExpr, CallExpr, DefExpr, Edge, EdgeList, ForExpr, FunctionBody,
    FunctionDefinition, IfExpr, LetExpr, ListLiteral, LoopExpr, MemRef, Node, NodeKind,
    PrimLiteral, PrimValue, Prototype, SymbolExpr, TypeDefinition, TypeExpr, WeakNode,
};
pub use scope::{Binding, OverloadSet, OverloadedObjectMap, Scope};
