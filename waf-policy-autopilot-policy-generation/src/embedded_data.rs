//! Rule tables compiled into the binary
//!
//! The default `policy-variants.yaml` is embedded so the Lambda and the CLI can
//! render policies without any file on disk.

use rust_embed::RustEmbed;

use crate::errors::{PolicyGenerationError, Result};

pub(crate) const DEFAULT_POLICY_VARIANTS: &str = "policy-variants.yaml";

/// Embedded rule tables
#[derive(RustEmbed)]
#[folder = "resources/config"]
#[include = "*.yaml"]
pub struct EmbeddedConfig;

impl EmbeddedConfig {
    /// Raw bytes of the default rule table
    pub fn default_policy_variants() -> Result<Vec<u8>> {
        Self::config(DEFAULT_POLICY_VARIANTS)
    }

    /// Raw bytes of an embedded rule table by file name
    pub fn config(name: &str) -> Result<Vec<u8>> {
        Self::get(name)
            .map(|file| file.data.to_vec())
            .ok_or_else(|| PolicyGenerationError::EmbeddedResource(name.to_string()))
    }

    /// Names of every embedded rule table, sorted
    pub fn names() -> Vec<String> {
        let mut names: Vec<String> = Self::iter().map(|name| name.into_owned()).collect();
        names.sort();
        names
    }
}
