//! This crate provides the core business logic for WAF Policy Autopilot:
//! - Rule table loading and validation (tag-keyed rule sets or match variants)
//! - Rule group selection and deduplicated merging per resource
//! - Rendering of FMS WAFv2 `managed_service_data` payloads
//!

pub mod config;
mod embedded_data;
mod errors;
mod policy_generation;
mod resources;


// Re-exports for a small, focused public API
pub use config::{
    ConfigOverrides, DefaultAction, MatchPredicate, PolicyConfig, ResourceDefaults,
    RuleGroupConfig, RuleGroupRef, RuleSelection, RuleSet, RuleSetDefaults, RuleSets, Scope,
    TagKeyedRules, TagKeys, Variant, VariantRules,
};
pub use embedded_data::EmbeddedConfig;
pub use errors::{PolicyGenerationError, Result};
pub use policy_generation::{
    build_policies, merge_rule_groups, sanitize_name, select, Engine as PolicyGenerationEngine,
    ModelRuleGroup, PolicyModel, RenderedPolicy, Selection, POLICY_NAME_PREFIX,
    WAFV2_POLICY_TYPE,
};
pub use resources::{lb_name_from_arn, load_resources, Resource, ResourceKind};
