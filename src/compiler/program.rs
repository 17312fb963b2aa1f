//! Compiled node tree
//!
//! A [`Program`] is what the renderer walks. Its `Display` output is the
//! generated representation kept alongside every compiled template.

use std::fmt;

use crate::parser::ast::{Condition, EachBinding, Expr, InsertMode};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Insert {
        expr: Expr,
        mode: InsertMode,
    },
    Each {
        binding: EachBinding,
        collection: Expr,
        body: Vec<Node>,
    },
    /// At most one branch renders
    Conditional {
        branches: Vec<Branch>,
        otherwise: Option<Vec<Node>>,
    },
    Include {
        id: String,
        params: Vec<(String, Expr)>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: Condition,
    pub body: Vec<Node>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_nodes(f, &self.nodes, 0)
    }
}

fn insert_word(mode: InsertMode) -> &'static str {
    match mode {
        InsertMode::Escaped => "insert",
        InsertMode::Raw => "raw",
        InsertMode::Json => "json",
        InsertMode::RawJson => "raw-json",
    }
}

fn write_nodes(f: &mut fmt::Formatter<'_>, nodes: &[Node], depth: usize) -> fmt::Result {
    let indent = "  ".repeat(depth);
    for node in nodes {
        match node {
            Node::Text(text) => writeln!(f, "{}text {:?}", indent, text)?,
            Node::Insert { expr, mode } => writeln!(f, "{}{} {}", indent, insert_word(*mode), expr)?,
            Node::Each {
                binding,
                collection,
                body,
            } => {
                writeln!(f, "{}each {}{}", indent, binding, collection)?;
                write_nodes(f, body, depth + 1)?;
                writeln!(f, "{}end", indent)?;
            }
            Node::Conditional {
                branches,
                otherwise,
            } => {
                for (i, branch) in branches.iter().enumerate() {
                    let prefix = if i == 0 { "" } else { "else-" };
                    writeln!(f, "{}{}{}", indent, prefix, branch.condition)?;
                    write_nodes(f, &branch.body, depth + 1)?;
                }
                if let Some(body) = otherwise {
                    writeln!(f, "{}else", indent)?;
                    write_nodes(f, body, depth + 1)?;
                }
                writeln!(f, "{}end", indent)?;
            }
            Node::Include { id, params } => {
                write!(f, "{}include {:?}", indent, id)?;
                for (name, value) in params {
                    write!(f, " {}: {}", name, value)?;
                }
                writeln!(f)?;
            }
        }
    }
    Ok(())
}
