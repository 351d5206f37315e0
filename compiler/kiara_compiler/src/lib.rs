//! KIARA compiler core.
//!
//! Builds typed IR from resolved names and drives it through passes:
//! - [`IrBuilder`] resolves names, picks overloads, converts arguments and
//!   synthesizes the intrinsic helpers generated code relies on
//! - [`Compiler`] runs an ordered list of [`CompilerPhase`]s over each
//!   parsed statement, threading a [`CompilationContext`]
//! - [`SubstituteBuiltins`] folds builtin intrinsics into constants
//!
//! Every fallible operation returns [`BuildError`]; [`report`] adapts it to
//! callers that want the message in an output string instead.

mod error;

pub mod builder;
pub mod passes;
pub mod pipeline;

pub use builder::{CallMode, CallRequest, IrBuilder, ScopeGuard};
pub use error::{report, BuildError, BuildErrorKind, PipelineError};
pub use passes::SubstituteBuiltins;
pub use pipeline::{
    CompilationContext, Compiler, CompilerPhase, ParserPhase, ReplacePhase, StatementSource,
    TransformPhase, PARSER_RESULT,
};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call more than once. Nothing is installed unless `RUST_LOG` is
/// set, e.g. `RUST_LOG=kiara_compiler=debug`. With `KIARA_LOG_TREE` also
/// set, spans render as an indented tree instead of flat lines.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        let filter = EnvFilter::from_default_env();
        if std::env::var("KIARA_LOG_TREE").is_ok() {
            tracing_subscriber::registry()
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_bracketed_fields(true),
                )
                .with(filter)
                .init();
        } else {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
