//! The template engine: compile cache, diagnostics and render entry points
//!
//! An [`Engine`] owns all mutable state. Share one per application (it is
//! `Send + Sync`) rather than reaching for a global.
//!
//! # Example
//!
//! ```rust
//! use brace_templates::Engine;
//! use serde_json::json;
//!
//! let engine = Engine::new();
//! let out = engine
//!     .render("{each v at i in items}{i}:{v} {/each}", &json!({"items": [10, 20]}))
//!     .unwrap();
//! assert_eq!(out, "0:10 1:20 ");
//! ```

mod cache;
mod diagnostics;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::compiler;
use crate::config::EngineConfig;
use crate::error::Error;
use crate::host::{Host, HtmlHost};
use crate::renderer::functions::builtins;
use crate::renderer::{Function, Renderer};
use crate::template::{Lookup, NoLookup, TemplateRegistry};

pub use cache::CompiledTemplate;
pub use diagnostics::ErrorRecord;

use cache::CompileCache;
use diagnostics::ErrorLog;

pub struct Engine {
    config: EngineConfig,
    lookup: Box<dyn Lookup>,
    host: Box<dyn Host>,
    functions: HashMap<String, Function>,
    cache: Mutex<CompileCache>,
    errors: Mutex<ErrorLog>,
    compiles: AtomicUsize,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("cached", &self.cache.lock().len())
            .field("compiles", &self.compile_count())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine from a configuration.
    ///
    /// A configured template directory becomes the lookup for `tmpl` and
    /// [`render_by_id`](Self::render_by_id).
    pub fn with_config(config: EngineConfig) -> Self {
        let lookup: Box<dyn Lookup> = match &config.template_dir {
            Some(dir) => Box::new(
                TemplateRegistry::with_base_path(dir).with_extension(config.template_extension.clone()),
            ),
            None => Box::new(NoLookup),
        };
        Self {
            errors: Mutex::new(ErrorLog::new(config.error_log_capacity)),
            config,
            lookup,
            host: Box::new(HtmlHost),
            functions: builtins(),
            cache: Mutex::new(CompileCache::default()),
            compiles: AtomicUsize::new(0),
        }
    }

    /// Replace the template lookup
    pub fn with_lookup(mut self, lookup: impl Lookup + 'static) -> Self {
        self.lookup = Box::new(lookup);
        self
    }

    /// Replace the escaping and serialization host
    pub fn with_host(mut self, host: impl Host + 'static) -> Self {
        self.host = Box::new(host);
        self
    }

    /// Make `name` callable from templates, replacing any function of that name
    pub fn register_function<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    pub(crate) fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    /// Compile `source`, or return the artifact cached for it.
    ///
    /// Repeated calls with the same source return the same `Arc`.
    pub fn compile(&self, source: &str) -> Result<Arc<CompiledTemplate>, Error> {
        self.compile_source(source)
            .map_err(|error| self.fail(source, None, &Value::Null, error))
    }

    fn compile_source(&self, source: &str) -> Result<Arc<CompiledTemplate>, Error> {
        if let Some(hit) = self.cache.lock().by_source(source) {
            tracing::trace!(len = source.len(), "compile cache hit");
            return Ok(hit);
        }

        // compile outside the lock; a racing insert of the same source wins
        let program = compiler::compile(source)?;
        self.compiles.fetch_add(1, Ordering::Relaxed);
        let compiled = Arc::new(CompiledTemplate::new(source, program));

        let mut cache = self.cache.lock();
        let kept = cache.insert(compiled);
        tracing::debug!(len = source.len(), cached = cache.len(), "compiled template");
        Ok(kept)
    }

    /// Compile the template the lookup knows as `id`.
    ///
    /// `Ok(None)` when no such template exists.
    pub fn compile_by_id(&self, id: &str) -> Result<Option<Arc<CompiledTemplate>>, Error> {
        self.compile_id_for(id, &Value::Null)
    }

    fn compile_id_for(&self, id: &str, data: &Value) -> Result<Option<Arc<CompiledTemplate>>, Error> {
        self.resolve_id(id)
            .map_err(|(source, error)| self.fail(&source, None, data, error))
    }

    /// Id index, then lookup and compile. Failures are returned with the
    /// looked-up source and left for the caller to record.
    pub(crate) fn resolve_id(&self, id: &str) -> Result<Option<Arc<CompiledTemplate>>, (String, Error)> {
        if let Some(hit) = self.cache.lock().by_id(id) {
            tracing::trace!(%id, "id cache hit");
            return Ok(Some(hit));
        }

        let Some(found) = self.lookup.lookup(id) else {
            tracing::debug!(%id, "template id not found");
            return Ok(None);
        };
        match self.compile_source(&found.source) {
            Ok(compiled) => Ok(Some(self.cache.lock().insert_id(id, compiled))),
            Err(error) => Err((found.source, error)),
        }
    }

    /// Compile (or fetch) `source` and render it against `data`
    pub fn render(&self, source: &str, data: &Value) -> Result<String, Error> {
        let compiled = self
            .compile_source(source)
            .map_err(|error| self.fail(source, None, data, error))?;
        self.execute(&compiled, data)
    }

    /// Render the template known as `id`; `Ok(None)` when there is none
    pub fn render_by_id(&self, id: &str, data: &Value) -> Result<Option<String>, Error> {
        match self.compile_id_for(id, data)? {
            Some(compiled) => self.execute(&compiled, data).map(Some),
            None => Ok(None),
        }
    }

    /// Render an already compiled template
    pub fn execute(&self, compiled: &CompiledTemplate, data: &Value) -> Result<String, Error> {
        Renderer::new(self)
            .render(compiled.program(), data)
            .map_err(|error| self.fail(compiled.source(), Some(compiled.generated()), data, error))
    }

    /// Drop every cached artifact, by source and by id
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
        tracing::debug!("compile cache cleared");
    }

    /// Number of compile passes actually run
    pub fn compile_count(&self) -> usize {
        self.compiles.load(Ordering::Relaxed)
    }

    /// Recorded failures, oldest first
    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.errors.lock().records()
    }

    pub fn last_error(&self) -> Option<ErrorRecord> {
        self.errors.lock().last()
    }

    pub fn clear_errors(&self) {
        self.errors.lock().clear();
    }

    /// Record a failure, then hand the error back for propagation
    fn fail(&self, template: &str, generated: Option<&str>, data: &Value, error: Error) -> Error {
        tracing::debug!(%error, "template failure recorded");
        self.errors.lock().push(ErrorRecord {
            template: template.to_string(),
            generated: generated.map(str::to_string),
            data: data.clone(),
            message: error.to_string(),
        });
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::HostTemplate;
    use serde_json::json;

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }

    #[test]
    fn test_compile_is_cached() {
        let engine = Engine::new();
        let a = engine.compile("Hello {name}!").expect("Should compile");
        let b = engine.compile("Hello {name}!").expect("Should compile");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(engine.compile_count(), 1);
    }

    #[test]
    fn test_compile_failure_not_cached() {
        let engine = Engine::new();
        assert!(engine.compile("{each xs}").is_err());
        assert!(engine.compile("{each xs}").is_err());
        assert_eq!(engine.compile_count(), 0);
        assert_eq!(engine.errors().len(), 2);
    }

    #[test]
    fn test_id_and_source_share_artifact() {
        let engine = Engine::new().with_lookup(|id: &str| {
            (id == "row").then(|| HostTemplate::new("<li>{$}</li>"))
        });
        let by_id = engine
            .compile_by_id("row")
            .expect("Should compile")
            .expect("Should exist");
        let by_source = engine.compile("<li>{$}</li>").expect("Should compile");
        assert!(Arc::ptr_eq(&by_id, &by_source));
        assert_eq!(engine.compile_count(), 1);
        assert!(engine.compile_by_id("nope").expect("no error").is_none());
    }

    #[test]
    fn test_registered_function() {
        let mut engine = Engine::new();
        engine.register_function("double", |args: &[Value]| {
            let n = args.first().and_then(Value::as_i64).ok_or("expected an integer")?;
            Ok(json!(n * 2))
        });
        assert_eq!(engine.render("{double(21)}", &json!({})).unwrap(), "42");

        let err = engine.render("{double('x')}", &json!({})).unwrap_err();
        assert_eq!(err.to_string(), "function 'double' failed: expected an integer");
    }

    #[test]
    fn test_failure_recorded_with_data() {
        let engine = Engine::new();
        let data = json!({"n": 5});
        let err = engine.render("{each n}x{/each}", &data).unwrap_err();
        let record = engine.last_error().expect("Should record");
        assert_eq!(record.template, "{each n}x{/each}");
        assert_eq!(record.data, data);
        assert_eq!(record.message, err.to_string());
        assert!(record.generated.is_some());

        engine.clear_errors();
        assert!(engine.errors().is_empty());
    }

    fn broken_lookup(id: &str) -> Option<HostTemplate> {
        match id {
            "bad-each" => Some(HostTemplate::new("{each xs}")),
            "bad-close" => Some(HostTemplate::new("{/if}")),
            _ => None,
        }
    }

    #[test]
    fn test_render_by_id_failure_keeps_data() {
        let engine = Engine::new().with_lookup(broken_lookup);
        let data = json!({"xs": [1]});
        assert!(engine.render_by_id("bad-each", &data).is_err());

        let records = engine.errors();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].template, "{each xs}");
        assert_eq!(records[0].data, data);
        assert_eq!(records[0].generated, None);
    }

    #[test]
    fn test_broken_include_recorded_once() {
        let engine = Engine::new().with_lookup(broken_lookup);
        let data = json!({"k": 1});
        let err = engine.render("outer {tmpl bad-close}", &data).unwrap_err();
        assert!(matches!(err, Error::Compile(_)));

        let records = engine.errors();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].template, "outer {tmpl bad-close}");
        assert_eq!(records[0].data, data);
        assert_eq!(engine.compile_count(), 1);
    }
}
