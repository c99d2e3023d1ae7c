//! AWS Firewall Manager client wrapper for policy upserts

use std::fmt;

use async_trait::async_trait;
use aws_sdk_fms::error::DisplayErrorContext;
use aws_sdk_fms::types::{
    CustomerPolicyScopeIdType, Policy, SecurityServicePolicyData, SecurityServiceType,
};
use aws_sdk_fms::Client as FmsClient;
use log::info;
use serde::Serialize;
use waf_policy_autopilot_policy_generation::RenderedPolicy;

use crate::aws::{AwsError, AwsResult};

/// Summary entry of `ListPolicies`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySummary {
    pub policy_id: Option<String>,
    pub policy_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyPage {
    pub policies: Vec<PolicySummary>,
    pub next_token: Option<String>,
}

/// Everything `PutPolicy` needs for one WAFv2 policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRequest {
    pub name: String,
    pub description: String,
    pub resource_type: String,
    pub managed_service_data: String,
    /// Organizational unit the policy is scoped to, if any
    pub org_unit: Option<String>,
    pub policy_id: Option<String>,
    pub update_token: Option<String>,
}

impl PolicyRequest {
    pub fn from_rendered(policy: &RenderedPolicy, ou_id: Option<&str>) -> Self {
        Self {
            name: policy.name.clone(),
            description: policy.description.clone(),
            resource_type: policy.resource_type.clone(),
            managed_service_data: policy.managed_service_data.clone(),
            org_unit: ou_id.filter(|ou| !ou.is_empty()).map(str::to_string),
            policy_id: None,
            update_token: None,
        }
    }

    fn to_sdk_policy(&self) -> AwsResult<Policy> {
        let service_data = SecurityServicePolicyData::builder()
            .r#type(SecurityServiceType::Wafv2)
            .managed_service_data(&self.managed_service_data)
            .build()
            .map_err(|e| {
                AwsError::FmsError(format!("Invalid service data for {}: {e}", self.name))
            })?;

        let mut builder = Policy::builder()
            .policy_name(&self.name)
            .policy_description(&self.description)
            .security_service_policy_data(service_data)
            .resource_type(&self.resource_type)
            .resource_type_list(&self.resource_type)
            .exclude_resource_tags(false)
            .remediation_enabled(true)
            .set_policy_id(self.policy_id.clone())
            .set_policy_update_token(self.update_token.clone());

        if let Some(ou) = &self.org_unit {
            builder = builder.include_map(CustomerPolicyScopeIdType::OrgUnit, vec![ou.clone()]);
        }

        builder
            .build()
            .map_err(|e| AwsError::FmsError(format!("Invalid policy {}: {e}", self.name)))
    }
}

/// Firewall Manager policy operations
#[async_trait]
pub trait FirewallManagerApi: Send + Sync {
    async fn list_policies(&self, next_token: Option<String>) -> AwsResult<PolicyPage>;

    /// Update token of an existing policy, if FMS returned one
    async fn get_policy_update_token(&self, policy_id: &str) -> AwsResult<Option<String>>;

    async fn put_policy(&self, request: &PolicyRequest) -> AwsResult<()>;
}

/// [`FirewallManagerApi`] backed by the AWS SDK
pub struct AwsFirewallManager {
    client: FmsClient,
}

impl AwsFirewallManager {
    pub fn new(client: FmsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FirewallManagerApi for AwsFirewallManager {
    async fn list_policies(&self, next_token: Option<String>) -> AwsResult<PolicyPage> {
        let output = self
            .client
            .list_policies()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| {
                AwsError::FmsError(format!(
                    "Failed to list policies: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(PolicyPage {
            policies: output
                .policy_list()
                .iter()
                .map(|summary| PolicySummary {
                    policy_id: summary.policy_id().map(str::to_string),
                    policy_name: summary.policy_name().map(str::to_string),
                })
                .collect(),
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn get_policy_update_token(&self, policy_id: &str) -> AwsResult<Option<String>> {
        let output = self
            .client
            .get_policy()
            .policy_id(policy_id)
            .send()
            .await
            .map_err(|e| {
                AwsError::FmsError(format!(
                    "Failed to get policy {policy_id}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(output
            .policy()
            .and_then(|policy| policy.policy_update_token())
            .map(str::to_string))
    }

    async fn put_policy(&self, request: &PolicyRequest) -> AwsResult<()> {
        let policy = request.to_sdk_policy()?;
        self.client
            .put_policy()
            .policy(policy)
            .send()
            .await
            .map_err(|e| {
                AwsError::FmsError(format!(
                    "Failed to put policy {}: {}",
                    request.name,
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }
}

/// Whether an upsert creates a new policy or updates an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    Create,
    Update,
}

impl fmt::Display for UpsertAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
        }
    }
}

/// Result of [`upsert_policy`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created { policy_name: String },
    Updated {
        policy_name: String,
        policy_id: String,
    },
    DryRun {
        policy_name: String,
        action: UpsertAction,
    },
}

impl UpsertOutcome {
    pub fn policy_name(&self) -> &str {
        match self {
            Self::Created { policy_name }
            | Self::Updated { policy_name, .. }
            | Self::DryRun { policy_name, .. } => policy_name,
        }
    }
}

/// Existing policy id and update token for a policy with exactly `name`.
pub async fn find_policy_by_name(
    api: &dyn FirewallManagerApi,
    name: &str,
) -> AwsResult<Option<(String, Option<String>)>> {
    let mut next_token = None;

    loop {
        let page = api.list_policies(next_token.take()).await?;
        if let Some(summary) = page
            .policies
            .into_iter()
            .find(|summary| summary.policy_name.as_deref() == Some(name))
        {
            let policy_id = summary.policy_id.ok_or_else(|| {
                AwsError::FmsError(format!("policy {name} found without id"))
            })?;
            let update_token = api.get_policy_update_token(&policy_id).await?;
            return Ok(Some((policy_id, update_token)));
        }

        match page.next_token.filter(|t| !t.is_empty()) {
            Some(token) => next_token = Some(token),
            None => return Ok(None),
        }
    }
}

/// Create or update the FMS policy for a rendered policy.
///
/// With `dry_run` the intended change is logged and `PutPolicy` is skipped.
pub async fn upsert_policy(
    api: &dyn FirewallManagerApi,
    policy: &RenderedPolicy,
    ou_id: Option<&str>,
    dry_run: bool,
) -> AwsResult<UpsertOutcome> {
    let mut request = PolicyRequest::from_rendered(policy, ou_id);

    let action = match find_policy_by_name(api, &policy.name).await? {
        Some((policy_id, update_token)) => {
            let update_token = update_token.ok_or_else(|| {
                AwsError::FmsError(format!(
                    "existing policy {} missing update token",
                    policy.name
                ))
            })?;
            info!("Updating existing policy {}", policy.name);
            request.policy_id = Some(policy_id);
            request.update_token = Some(update_token);
            UpsertAction::Update
        }
        None => {
            info!("Creating new policy {}", policy.name);
            UpsertAction::Create
        }
    };

    if dry_run {
        info!("Dry run enabled; skipping PutPolicy for {}", policy.name);
        return Ok(UpsertOutcome::DryRun {
            policy_name: policy.name.clone(),
            action,
        });
    }

    api.put_policy(&request).await?;

    Ok(match request.policy_id {
        Some(policy_id) => UpsertOutcome::Updated {
            policy_name: request.name,
            policy_id,
        },
        None => UpsertOutcome::Created {
            policy_name: request.name,
        },
    })
}
