//! Syntax tree types for template tags and expressions

use std::fmt;

use serde_json::Value;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Context slots injected by `each` and conditionals, never backed by data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// `$` - current element
    Element,
    /// `$k` - current key (array index or mapping key)
    Key,
    /// `$i` - zero-based running position
    Index,
    /// `$$` - the collection being iterated
    Collection,
    /// `$n` - collection length
    Length,
    /// `$keys` - key list of the collection
    Keys,
    /// `$0` / `$1` - short-lived temporaries bound by conditionals
    Temp(u8),
}

impl Slot {
    pub fn from_sigil(sigil: &str) -> Option<Self> {
        match sigil {
            "$" => Some(Slot::Element),
            "$k" => Some(Slot::Key),
            "$i" => Some(Slot::Index),
            "$$" => Some(Slot::Collection),
            "$n" => Some(Slot::Length),
            "$keys" => Some(Slot::Keys),
            "$0" => Some(Slot::Temp(0)),
            "$1" => Some(Slot::Temp(1)),
            _ => None,
        }
    }

    pub fn sigil(&self) -> &'static str {
        match self {
            Slot::Element => "$",
            Slot::Key => "$k",
            Slot::Index => "$i",
            Slot::Collection => "$$",
            Slot::Length => "$n",
            Slot::Keys => "$keys",
            Slot::Temp(0) => "$0",
            Slot::Temp(_) => "$1",
        }
    }
}

/// Where a variable path starts
#[derive(Debug, Clone, PartialEq)]
pub enum Root {
    /// Name in the local scope (loop bindings, include params, then data)
    Local(String),
    Slot(Slot),
}

/// One postfix step of a variable path
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// `.name` or a numeric `.0`
    Field(String),
    /// `[expr]`
    Index(Expr),
    /// `(args)` - calls the function named by the preceding step
    Call(Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    LessOrEqual,
    GreaterOrEqual,
    Less,
    Greater,
    And,
    Or,
    Add,
    Sub,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
        }
    }
}

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Number or string literal
    Literal(Value),
    Variable { root: Root, path: Vec<Segment> },
    Group(Box<Expr>),
    Object(Vec<(String, Expr)>),
    Array(Vec<Expr>),
    /// Flat operator chain, evaluated strictly left to right
    Binary {
        first: Box<Expr>,
        rest: Vec<(BinaryOp, Expr)>,
    },
}

impl Expr {
    /// Bare local reference, as produced by object shorthand `{name}`
    pub fn local(name: impl Into<String>) -> Self {
        Expr::Variable {
            root: Root::Local(name.into()),
            path: Vec::new(),
        }
    }
}

/// The test a conditional performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    Truthy,
    Empty,
    Key,
    Value,
    First,
    Last,
}

impl TestKind {
    fn suffix(&self) -> &'static str {
        match self {
            TestKind::Truthy => "",
            TestKind::Empty => "-empty",
            TestKind::Key => "-key",
            TestKind::Value => "-val",
            TestKind::First => "-first",
            TestKind::Last => "-last",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub kind: TestKind,
    /// `if-not` / `unless`
    pub negated: bool,
    pub subject: Option<Expr>,
    /// Right-hand side of `in` for `-key` / `-val`
    pub haystack: Option<Expr>,
}

/// Named locals bound by the long `each` form; all `None` in the short form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EachBinding {
    pub value: Option<String>,
    pub key: Option<String>,
    pub index: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    Escaped,
    Raw,
    Json,
    RawJson,
}

/// A recognized `{...}` directive
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    /// `{* ... *}`
    Comment,
    /// `{{}` / `{}}`
    Brace(char),
    /// `{else}` or `{else-if ...}` and friends
    Else(Option<Condition>),
    CloseIf,
    CloseEach,
    Each {
        binding: EachBinding,
        collection: Expr,
    },
    If(Condition),
    Include {
        id: String,
        params: Vec<(String, Expr)>,
    },
    Insert {
        expr: Expr,
        mode: InsertMode,
    },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Variable { root, path } => {
                match root {
                    Root::Local(name) => f.write_str(name)?,
                    Root::Slot(slot) => f.write_str(slot.sigil())?,
                }
                for segment in path {
                    match segment {
                        Segment::Field(name) => write!(f, ".{}", name)?,
                        Segment::Index(expr) => write!(f, "[{}]", expr)?,
                        Segment::Call(args) => {
                            f.write_str("(")?;
                            write_list(f, args)?;
                            f.write_str(")")?;
                        }
                    }
                }
                Ok(())
            }
            Expr::Group(inner) => write!(f, "({})", inner),
            Expr::Object(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
            Expr::Array(items) => {
                f.write_str("[")?;
                write_list(f, items)?;
                f.write_str("]")
            }
            Expr::Binary { first, rest } => {
                write!(f, "{}", first)?;
                for (op, operand) in rest {
                    write!(f, " {} {}", op.symbol(), operand)?;
                }
                Ok(())
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = if self.negated { "if-not" } else { "if" };
        write!(f, "{}{}", base, self.kind.suffix())?;
        if let Some(subject) = &self.subject {
            write!(f, " {}", subject)?;
        }
        if let Some(haystack) = &self.haystack {
            write!(f, " in {}", haystack)?;
        }
        Ok(())
    }
}

impl fmt::Display for EachBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(value) = &self.value else {
            return Ok(());
        };
        f.write_str(value)?;
        if let Some(key) = &self.key {
            write!(f, " as {}", key)?;
        }
        if let Some(index) = &self.index {
            write!(f, " at {}", index)?;
        }
        f.write_str(" in ")
    }
}
