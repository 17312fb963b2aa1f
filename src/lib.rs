//! Brace templates - a compiler for `{...}`-tagged text templates
//!
//! Templates interleave literal text with tags: inserts (`{user.name}`),
//! loops (`{each items}...{/each}`), conditionals (`{if x > 5}...{else}...{/if}`)
//! and inclusion of other templates (`{tmpl row item: $}`). A template is
//! compiled once into a node tree, cached by its source text, and rendered
//! against JSON data.
//!
//! # Example
//!
//! ```rust
//! use brace_templates::render;
//! use serde_json::json;
//!
//! let out = render("Hello {name}!", &json!({"name": "World"})).unwrap();
//! assert_eq!(out, "Hello World!");
//! ```
//!
//! Use an [`Engine`] to keep compiled templates and failure records across
//! calls:
//!
//! ```rust
//! use brace_templates::Engine;
//! use serde_json::json;
//!
//! let engine = Engine::new();
//! let template = "{if x > 5}big{else}small{/if}";
//! assert_eq!(engine.render(template, &json!({"x": 3})).unwrap(), "small");
//! assert_eq!(engine.render(template, &json!({"x": 9})).unwrap(), "big");
//! assert_eq!(engine.compile_count(), 1);
//! ```

pub mod compiler;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod parser;
mod renderer;
pub mod template;

pub use compiler::{compile, Node, Program};
pub use config::{ConfigError, EngineConfig};
pub use engine::{CompiledTemplate, Engine, ErrorRecord};
pub use error::{BlockKind, CompileError, Error};
pub use host::{escape_html, Collection, Host, HtmlHost};
pub use renderer::Function;
pub use template::{HostTemplate, Lookup, NoLookup, TemplateError, TemplateRegistry};

/// Render `source` against `data` with a fresh default [`Engine`]
///
/// Nothing is cached between calls; keep an [`Engine`] around for that.
pub fn render(source: &str, data: &serde_json::Value) -> Result<String, Error> {
    Engine::new().render(source, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_simple_insert() {
        assert_eq!(render("Hello {name}!", &json!({"name": "World"})).unwrap(), "Hello World!");
    }

    #[test]
    fn test_render_structural_error() {
        let err = render("{/if}", &json!({})).unwrap_err();
        assert!(matches!(
            err,
            Error::Compile(CompileError::UnmatchedClose {
                block: BlockKind::If,
                ..
            })
        ));
    }

    #[test]
    fn test_render_escapes_by_default() {
        let data = json!({"name": "<b>"});
        assert_eq!(render("{name}", &data).unwrap(), "&lt;b&gt;");
        assert_eq!(render("{esc name}", &data).unwrap(), "&lt;b&gt;");
        assert_eq!(render("{raw name}", &data).unwrap(), "<b>");
    }
}
