//! WAF-attachable resources and their tags

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{PolicyGenerationError, Result};

/// Logical resource type understood by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Application Load Balancer
    Alb,
    /// Any type string this build does not know how to render
    #[serde(other)]
    Unsupported,
}

impl ResourceKind {
    /// Key of this kind in `resourceDefaults`
    pub fn defaults_key(&self) -> &'static str {
        match self {
            Self::Alb => "alb",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.defaults_key())
    }
}

/// A taggable resource that can be protected by a WAFv2 web ACL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub arn: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Resource {
    pub fn alb(arn: impl Into<String>, tags: BTreeMap<String, String>) -> Self {
        let arn = arn.into();
        Self {
            id: lb_name_from_arn(&arn),
            arn,
            kind: ResourceKind::Alb,
            tags,
        }
    }

    /// Tag value, treating an empty value as absent
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }
}

/// Read a JSON array of resources, as written by a previous discovery run.
pub fn load_resources(path: impl AsRef<Path>) -> Result<Vec<Resource>> {
    let path = path.as_ref();
    let data = std::fs::read(path)
        .map_err(|e| PolicyGenerationError::file_system("read resources", path, e))?;
    serde_json::from_slice(&data).map_err(PolicyGenerationError::ResourceParse)
}

/// Human-readable load balancer identifier from its ARN.
///
/// `arn:aws:elasticloadbalancing:us-west-2:123456789012:loadbalancer/app/demo-alb/abcd1234`
/// becomes `demo-alb/abcd1234`.
pub fn lb_name_from_arn(arn: &str) -> String {
    let parts: Vec<&str> = arn.split('/').collect();
    if parts.len() < 2 {
        return arn.to_string();
    }
    format!("{}/{}", parts[parts.len() - 2], parts[parts.len() - 1])
}
