//! Types shared by the plan and apply operations

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use waf_policy_autopilot_policy_generation::{ConfigOverrides, RenderedPolicy};

use crate::aws::fms_client::UpsertOutcome;

pub const OU_ID_ENV: &str = "OU_ID";
pub const CONFIG_SSM_PARAM_ENV: &str = "CONFIG_SSM_PARAM";
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Where the rule table comes from, highest precedence first
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// YAML stored in an SSM parameter
    Ssm(String),
    Path(PathBuf),
    /// Compiled-in default, adjusted by environment overrides
    Embedded(ConfigOverrides),
}

impl ConfigSource {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `CONFIG_SSM_PARAM` wins over `CONFIG_PATH`; neither means the embedded config.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(param) = get(CONFIG_SSM_PARAM_ENV) {
            Self::Ssm(param)
        } else if let Some(path) = get(CONFIG_PATH_ENV) {
            Self::Path(PathBuf::from(path))
        } else {
            Self::Embedded(ConfigOverrides::from_lookup(lookup))
        }
    }
}

/// Outcome of planning a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanResult {
    /// The caller's account is outside the target OU
    NotInOu,
    NoResources,
    Policies(BTreeMap<String, RenderedPolicy>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    pub ou_id: Option<String>,
    pub dry_run: bool,
}

impl ApplyOptions {
    pub(crate) fn ou_id(&self) -> Option<&str> {
        self.ou_id.as_deref().filter(|ou| !ou.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub outcomes: Vec<UpsertOutcome>,
}

impl ApplyReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Result of a full run; its `Display` form is the Lambda response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunSummary {
    NotInOu,
    NoResources,
    Processed(ApplyReport),
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInOu => write!(f, "account not in target OU; skipping"),
            Self::NoResources => write!(f, "no resources"),
            Self::Processed(report) => write!(f, "processed {} resource(s)", report.len()),
        }
    }
}
