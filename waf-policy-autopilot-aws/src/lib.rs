//! This crate connects WAF Policy Autopilot to AWS:
//! - Application Load Balancer discovery with tags
//! - Organizational unit membership checks
//! - Rule tables stored in SSM Parameter Store
//! - Firewall Manager policy upserts
//! - The plan/apply service used by the CLI and the Lambda handler
//!

mod aws;
pub mod commands;
mod error;
mod types;

// Re-exports for a small, focused public API
pub use aws::discovery::{
    discover_albs, AwsLoadBalancerSource, LoadBalancerPage, LoadBalancerSource,
    LoadBalancerSummary, LoadBalancerTags, DESCRIBE_TAGS_BATCH_SIZE,
};
pub use aws::fms_client::{
    find_policy_by_name, upsert_policy, AwsFirewallManager, FirewallManagerApi, PolicyPage,
    PolicyRequest, PolicySummary, UpsertAction, UpsertOutcome,
};
pub use aws::organizations::{
    account_in_ou, AccountPage, AwsOrganizationDirectory, OrganizationDirectory,
};
pub use aws::ssm::{fetch_config_yaml, AwsParameterStore, ParameterStore};
pub use aws::{load_sdk_config, AwsError, AwsResult};
pub use commands::plan::plan_resources;
pub use commands::WafPolicyAutopilotService;
pub use error::{WafPolicyAutopilotError, WafPolicyAutopilotResult};
pub use types::{
    ApplyOptions, ApplyReport, ConfigSource, PlanResult, RunSummary, CONFIG_PATH_ENV,
    CONFIG_SSM_PARAM_ENV, OU_ID_ENV,
};
