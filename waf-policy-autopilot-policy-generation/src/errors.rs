//! Error types for config loading and policy rendering

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced while loading the rule table, reading resources or rendering policies
#[derive(Debug, Error)]
pub enum PolicyGenerationError {
    /// A file could not be read or written
    #[error("Failed to {operation} '{}': {source}", path.display())]
    FileSystem {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The YAML rule table is not well-formed
    #[error("Failed to parse policy config YAML: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// The rule table parsed but failed validation
    #[error("Invalid policy config: {0}")]
    InvalidConfig(String),

    /// The resource inventory JSON is not well-formed
    #[error("Failed to parse resources JSON: {0}")]
    ResourceParse(#[source] serde_json::Error),

    /// Rendering a policy for a single resource failed
    #[error("Failed to render policy for resource {resource}: {message}")]
    Render { resource: String, message: String },

    /// A file expected to be compiled into the binary is missing
    #[error("Embedded resource not found: {0}")]
    EmbeddedResource(String),
}

impl PolicyGenerationError {
    pub(crate) fn file_system(
        operation: impl Into<String>,
        path: impl AsRef<Path>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            operation: operation.into(),
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub(crate) fn render(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            resource: resource.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PolicyGenerationError>;
