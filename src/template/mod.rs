//! Template lookup by identifier
//!
//! `tmpl` tags and [`Engine::render_by_id`](crate::Engine::render_by_id)
//! name templates by id. The engine asks a [`Lookup`] for the source text;
//! [`TemplateRegistry`] is the provided implementation, holding in-memory
//! definitions and optionally reading `<dir>/<id>.<ext>` files.
//!
//! # Example
//!
//! ```rust
//! use brace_templates::{Engine, TemplateRegistry};
//! use serde_json::json;
//!
//! let mut registry = TemplateRegistry::new();
//! registry.register("greeting", "Hello {name}").unwrap();
//!
//! let engine = Engine::new().with_lookup(registry);
//! let out = engine.render_by_id("greeting", &json!({"name": "Ann"})).unwrap();
//! assert_eq!(out.as_deref(), Some("Hello Ann"));
//! ```

mod registry;

use std::collections::BTreeMap;

pub use registry::{TemplateError, TemplateRegistry, DEFAULT_EXTENSION};

/// Template text found by a [`Lookup`], with whatever attributes the
/// provider attached to it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostTemplate {
    pub source: String,
    pub attributes: BTreeMap<String, String>,
}

impl HostTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Attach an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Resolves template identifiers to source text.
///
/// A miss is `None`, never an error: callers may probe optional templates.
pub trait Lookup: Send + Sync {
    fn lookup(&self, id: &str) -> Option<HostTemplate>;
}

/// Lookup that knows no templates
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl Lookup for NoLookup {
    fn lookup(&self, _id: &str) -> Option<HostTemplate> {
        None
    }
}

impl<F> Lookup for F
where
    F: Fn(&str) -> Option<HostTemplate> + Send + Sync,
{
    fn lookup(&self, id: &str) -> Option<HostTemplate> {
        self(id)
    }
}
