//! Host services the renderer relies on
//!
//! Escaping, serialization and collection discrimination are provided by the
//! embedding application. [`HtmlHost`] covers the usual HTML case.

use serde_json::{Map, Value};

use crate::error::Error;

/// Shape of an iterable value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Collection<'v> {
    Sequence(&'v [Value]),
    Mapping(&'v Map<String, Value>),
}

impl<'v> Collection<'v> {
    pub fn len(&self) -> usize {
        match self {
            Collection::Sequence(items) => items.len(),
            Collection::Mapping(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys in iteration order: indices for sequences, names for mappings
    pub fn keys(&self) -> Vec<Value> {
        match self {
            Collection::Sequence(items) => (0..items.len()).map(Value::from).collect(),
            Collection::Mapping(map) => map.keys().cloned().map(Value::String).collect(),
        }
    }

    /// Values in iteration order
    pub fn values(&self) -> Vec<&'v Value> {
        match self {
            Collection::Sequence(items) => items.iter().collect(),
            Collection::Mapping(map) => map.values().collect(),
        }
    }

    /// `(key, value)` pairs in iteration order
    pub fn entries(&self) -> Vec<(Value, &'v Value)> {
        self.keys().into_iter().zip(self.values()).collect()
    }
}

pub trait Host: Send + Sync {
    /// Escape text for insertion into the output document
    fn escape(&self, text: &str) -> String {
        escape_html(text)
    }

    /// Canonical data-interchange text for a value
    fn serialize(&self, value: &Value) -> Result<String, Error> {
        Ok(serde_json::to_string(value)?)
    }

    /// Whether a value can be iterated, and how
    fn collection<'v>(&self, value: &'v Value) -> Option<Collection<'v>> {
        match value {
            Value::Array(items) => Some(Collection::Sequence(items)),
            Value::Object(map) => Some(Collection::Mapping(map)),
            _ => None,
        }
    }
}

/// Default host: HTML escaping and compact JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlHost;

impl Host for HtmlHost {}

/// Replace `& < > ' "` with character references
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
