//! Registry of named templates, in memory or on disk

use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

use super::{HostTemplate, Lookup};

/// Default file extension for directory-backed templates
pub const DEFAULT_EXTENSION: &str = "tmpl";

/// Errors that can occur during template operations
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template not found in memory or on disk
    #[error("template not found: {id}")]
    NotFound { id: String },

    /// Duplicate template definition
    #[error("duplicate template definition: {id}")]
    Duplicate { id: String },

    /// Identifier that cannot name a file
    #[error("invalid template id: {id:?}")]
    InvalidId { id: String },

    /// Error reading template file
    #[error("error reading template file {path}: {message}")]
    FileReadError { path: PathBuf, message: String },
}

/// Registry for storing template definitions
#[derive(Debug)]
pub struct TemplateRegistry {
    templates: HashMap<String, HostTemplate>,
    /// Directory searched when an id is not registered in memory
    base_path: Option<PathBuf>,
    extension: String,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self {
            templates: HashMap::new(),
            base_path: None,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl TemplateRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new registry backed by a template directory
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: Some(base_path.into()),
            ..Self::default()
        }
    }

    /// Set the file extension used for directory lookups (without the dot)
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Register template source under `id`
    pub fn register(&mut self, id: impl Into<String>, source: impl Into<String>) -> Result<(), TemplateError> {
        self.register_template(id, HostTemplate::new(source))
    }

    /// Register a template with attributes
    pub fn register_template(
        &mut self,
        id: impl Into<String>,
        template: HostTemplate,
    ) -> Result<(), TemplateError> {
        let id = id.into();
        if self.templates.contains_key(&id) {
            return Err(TemplateError::Duplicate { id });
        }
        self.templates.insert(id, template);
        Ok(())
    }

    /// Get an in-memory template by id
    pub fn get(&self, id: &str) -> Option<&HostTemplate> {
        self.templates.get(id)
    }

    /// Check if a template is registered in memory
    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    /// Get all in-memory template ids
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(|s| s.as_str())
    }

    /// Get the template directory
    pub fn base_path(&self) -> Option<&PathBuf> {
        self.base_path.as_ref()
    }

    /// File path an id maps to: `<base>/<id>.<ext>`
    pub fn resolve_path(&self, id: &str) -> PathBuf {
        let file = format!("{}.{}", id, self.extension);
        match &self.base_path {
            Some(base) => base.join(file),
            None => PathBuf::from(file),
        }
    }

    /// Load a template from memory, then from the template directory
    pub fn load(&self, id: &str) -> Result<HostTemplate, TemplateError> {
        if let Some(template) = self.templates.get(id) {
            return Ok(template.clone());
        }
        if self.base_path.is_none() {
            return Err(TemplateError::NotFound { id: id.to_string() });
        }
        // ids name files directly under the base directory
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(TemplateError::InvalidId { id: id.to_string() });
        }

        let path = self.resolve_path(id);
        if !path.is_file() {
            return Err(TemplateError::NotFound { id: id.to_string() });
        }
        let source = std::fs::read_to_string(&path).map_err(|e| TemplateError::FileReadError {
            path: path.clone(),
            message: e.to_string(),
        })?;

        Ok(HostTemplate::new(source).with_attribute("path", path.display().to_string()))
    }
}

impl Lookup for TemplateRegistry {
    fn lookup(&self, id: &str) -> Option<HostTemplate> {
        match self.load(id) {
            Ok(template) => Some(template),
            Err(TemplateError::NotFound { .. }) => None,
            Err(error) => {
                tracing::warn!(%id, %error, "template lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("brace-registry-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).expect("Should create scratch dir");
        dir
    }

    #[test]
    fn test_registry_register_and_get() {
        let mut registry = TemplateRegistry::new();
        registry.register("row", "<li>{$}</li>").expect("Should register");
        assert!(registry.contains("row"));
        assert_eq!(
            registry.get("row").map(|t| t.source.as_str()),
            Some("<li>{$}</li>")
        );
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["row"]);
    }

    #[test]
    fn test_registry_duplicate_error() {
        let mut registry = TemplateRegistry::new();
        registry.register("row", "a").expect("First register should succeed");
        let result = registry.register("row", "b");
        assert!(matches!(result, Err(TemplateError::Duplicate { .. })));
    }

    #[test]
    fn test_missing_without_directory() {
        let registry = TemplateRegistry::new();
        assert!(matches!(
            registry.load("nope"),
            Err(TemplateError::NotFound { .. })
        ));
        assert_eq!(registry.lookup("nope"), None);
    }

    #[test]
    fn test_resolve_path() {
        let registry = TemplateRegistry::with_base_path("/srv/views").with_extension("html");
        assert_eq!(registry.base_path(), Some(&PathBuf::from("/srv/views")));
        assert_eq!(registry.resolve_path("card"), PathBuf::from("/srv/views/card.html"));

        let memory = TemplateRegistry::new();
        assert_eq!(memory.base_path(), None);
        assert_eq!(memory.resolve_path("card"), PathBuf::from("card.tmpl"));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = scratch_dir("load");
        std::fs::write(dir.join("card.tmpl"), "<b>{title}</b>").expect("Should write");

        let registry = TemplateRegistry::with_base_path(&dir);
        let template = registry.lookup("card").expect("Should find file template");
        assert_eq!(template.source, "<b>{title}</b>");
        assert!(template.attributes.contains_key("path"));
        assert_eq!(registry.lookup("missing"), None);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_memory_shadows_directory() {
        let dir = scratch_dir("shadow");
        std::fs::write(dir.join("card.tmpl"), "disk").expect("Should write");

        let mut registry = TemplateRegistry::with_base_path(&dir);
        registry.register("card", "memory").expect("Should register");
        assert_eq!(registry.load("card").expect("Should load").source, "memory");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_path_like_ids_rejected() {
        let registry = TemplateRegistry::with_base_path(std::env::temp_dir());
        assert!(matches!(
            registry.load("../etc/passwd"),
            Err(TemplateError::InvalidId { .. })
        ));
    }
}
