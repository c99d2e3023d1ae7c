//! Policy generation: rule selection, merging and `managed_service_data` rendering

use serde::{Deserialize, Serialize};

pub(crate) mod engine;
pub(crate) mod merge;
pub(crate) mod selection;
pub(crate) mod template;

pub use engine::{build_policies, sanitize_name, Engine, POLICY_NAME_PREFIX};
pub use merge::merge_rule_groups;
pub use selection::{select, Selection};
pub use template::{ModelRuleGroup, PolicyModel, WAFV2_POLICY_TYPE};

/// A named FMS policy ready to be written to disk or pushed with `PutPolicy`.
///
/// Serialized with snake_case keys so the generated `policies.json` can be fed
/// straight into infrastructure-as-code tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPolicy {
    pub name: String,
    pub description: String,
    pub resource_type: String,
    pub scope: String,
    /// JSON text of the WAFv2 security service policy data
    pub managed_service_data: String,
}
