//! Parser for brace templates
//!
//! Scanning happens in two layers: [`scanner`] finds tag boundaries in raw
//! text, then [`grammar`] parses the tokens of each tag body.

pub mod ast;
pub mod grammar;
pub mod lexer;
pub mod scanner;

pub use ast::*;
pub use grammar::parse_expression;
pub use scanner::{scan, tokenize, Scanned};
