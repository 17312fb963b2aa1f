//! Compile template source into a [`Program`]

mod generator;
mod program;

pub use generator::generate;
pub use program::{Branch, Node, Program};

use crate::error::CompileError;
use crate::parser::scanner::tokenize;

/// Scan and block-match `source`.
///
/// Malformed tags never fail compilation; they stay in the output as text.
/// Only structural problems (unbalanced blocks) are errors.
pub fn compile(source: &str) -> Result<Program, CompileError> {
    let segments = tokenize(source);
    tracing::trace!(segments = segments.len(), "scanned template");
    generate(segments)
}
