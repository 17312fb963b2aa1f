//! Engine configuration
//!
//! Built in code with the `with_*` methods, or loaded from a TOML file:
//!
//! ```toml
//! [engine]
//! error-log-capacity = 64
//! max-include-depth = 16
//!
//! [templates]
//! dir = "views"
//! extension = "html"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::template::DEFAULT_EXTENSION;

/// Errors that can occur when loading or parsing a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Configuration options for an [`Engine`](crate::Engine)
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Number of failure records kept by the diagnostics log
    pub error_log_capacity: usize,

    /// Deepest chain of nested `tmpl` inclusions before rendering fails
    pub max_include_depth: usize,

    /// Directory searched for templates by id
    pub template_dir: Option<PathBuf>,

    /// File extension of directory templates, without the dot
    pub template_extension: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            error_log_capacity: 32,
            max_include_depth: 64,
            template_dir: None,
            template_extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

/// TOML structure for deserializing configuration
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    #[serde(default)]
    engine: TomlEngine,
    #[serde(default)]
    templates: TomlTemplates,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct TomlEngine {
    error_log_capacity: Option<usize>,
    max_include_depth: Option<usize>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlTemplates {
    dir: Option<PathBuf>,
    extension: Option<String>,
}

impl EngineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the diagnostics log capacity
    pub fn with_error_log_capacity(mut self, capacity: usize) -> Self {
        self.error_log_capacity = capacity;
        self
    }

    /// Set the inclusion depth limit
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    /// Set the template directory
    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = Some(dir.into());
        self
    }

    /// Set the template file extension
    pub fn with_template_extension(mut self, extension: impl Into<String>) -> Self {
        self.template_extension = extension.into();
        self
    }

    /// Load configuration from a TOML file
    ///
    /// A relative `templates.dir` is resolved against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        if let Some(dir) = config.template_dir.take() {
            config.template_dir = Some(match path.parent() {
                Some(parent) if dir.is_relative() => parent.join(dir),
                _ => dir,
            });
        }
        Ok(config)
    }

    /// Load configuration from a TOML string
    ///
    /// Missing keys keep their default values.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let defaults = Self::default();

        Ok(EngineConfig {
            error_log_capacity: parsed
                .engine
                .error_log_capacity
                .unwrap_or(defaults.error_log_capacity),
            max_include_depth: parsed
                .engine
                .max_include_depth
                .unwrap_or(defaults.max_include_depth),
            template_dir: parsed.templates.dir,
            template_extension: parsed
                .templates
                .extension
                .unwrap_or(defaults.template_extension),
        })
    }
}
