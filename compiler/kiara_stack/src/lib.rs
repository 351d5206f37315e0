//! Stack growth for recursive IR walks.
//!
//! The IR is a tree of reference-counted nodes and every pass over it
//! (visitor dispatch, in-place replacement, rebuilding transforms, the
//! pretty printer) is plain recursive descent. Generated marshalling code
//! can nest blocks, lets and calls far deeper than a hand-written program
//! would, so each recursive step goes through [`ensure_sufficient_stack`].
//!
//! # Platform Support
//!
//! - **Native targets**: `stacker::maybe_grow` allocates a fresh stack
//!   segment when the remaining space drops below the red zone.
//! - **WASM targets**: passthrough.

/// Remaining stack below which a new segment is allocated (128KB).
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment (2MB).
const SEGMENT_SIZE: usize = 2 * 1024 * 1024;

/// Run `f`, growing the stack first if less than the red zone remains.
///
/// ```text
/// fn apply(&mut self, node: &Node) -> VisitResult<()> {
///     ensure_sufficient_stack(|| dispatch(self, node))
/// }
/// ```
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
