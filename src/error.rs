//! Error types for compiling and rendering templates

use std::fmt;

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Block kinds tracked by the compiler's block stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Each,
    If,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BlockKind::Each => "each",
            BlockKind::If => "if",
        })
    }
}

/// Structural errors found while matching blocks
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("line {line}: {{/{block}}} without an open {{{block}}}")]
    UnmatchedClose {
        block: BlockKind,
        line: usize,
        span: Span,
    },

    #[error("line {line}: {{/{found}}} cannot close the {{{expected}}} opened on line {opened}")]
    MismatchedClose {
        expected: BlockKind,
        found: BlockKind,
        line: usize,
        opened: usize,
        span: Span,
    },

    #[error("line {line}: {{else}} without an open {{if}}")]
    ElseWithoutIf { line: usize, span: Span },

    #[error("line {line}: {{else}} after the final {{else}} of an {{if}}")]
    ElseAfterElse { line: usize, span: Span },

    #[error("line {line}: unclosed {{{block}}}")]
    Unclosed {
        block: BlockKind,
        line: usize,
        span: Span,
    },
}

impl CompileError {
    /// Span of the offending tag
    pub fn span(&self) -> &Span {
        match self {
            Self::UnmatchedClose { span, .. }
            | Self::MismatchedClose { span, .. }
            | Self::ElseWithoutIf { span, .. }
            | Self::ElseAfterElse { span, .. }
            | Self::Unclosed { span, .. } => span,
        }
    }

    /// 1-based line of the offending tag
    pub fn line(&self) -> usize {
        match self {
            Self::UnmatchedClose { line, .. }
            | Self::MismatchedClose { line, .. }
            | Self::ElseWithoutIf { line, .. }
            | Self::ElseAfterElse { line, .. }
            | Self::Unclosed { line, .. } => *line,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let span = self.span().clone();
        let label = match self {
            Self::MismatchedClose { expected, .. } => format!("expected {{/{}}} here", expected),
            Self::Unclosed { block, .. } => format!("this {{{}}} is never closed", block),
            _ => "no matching block is open".to_string(),
        };

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(self.to_string())
            .with_label(
                Label::new((filename, span))
                    .with_message(label)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);
        if written.is_err() {
            return self.to_string();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// Errors returned by compile and render calls
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// `tmpl` or `render_by_id` target the lookup could not provide
    #[error("template not found: {id}")]
    TemplateNotFound { id: String },

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("function '{name}' failed: {message}")]
    Function { name: String, message: String },

    /// Expression evaluated against absent or incompatible data
    #[error("{message}")]
    Runtime { message: String },

    #[error("cannot serialize value: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("template inclusion nested deeper than {limit} levels")]
    IncludeDepth { limit: usize },
}

impl Error {
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::TemplateNotFound { id: id.into() }
    }
}
