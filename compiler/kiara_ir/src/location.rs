//! Source positions attached to IR nodes for diagnostics.

use std::fmt;

/// A line/column position in the source being compiled. Both are 1-based.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceLocation {
    pub line: u32,
    pub col: u32,
}

impl SourceLocation {
    #[inline]
    pub const fn new(line: u32, col: u32) -> Self {
        SourceLocation { line, col }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}
