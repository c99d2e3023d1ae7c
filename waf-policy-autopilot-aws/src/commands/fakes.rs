//! In-memory stand-ins for the AWS clients

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::WafPolicyAutopilotService;
use crate::aws::discovery::{
    LoadBalancerPage, LoadBalancerSource, LoadBalancerSummary, LoadBalancerTags,
};
use crate::aws::fms_client::{FirewallManagerApi, PolicyPage, PolicyRequest, PolicySummary};
use crate::aws::organizations::{AccountPage, OrganizationDirectory};
use crate::aws::ssm::ParameterStore;
use crate::aws::{AwsError, AwsResult};

pub(crate) fn alb_arn(i: usize) -> String {
    format!(
        "arn:aws:elasticloadbalancing:us-west-2:123456789012:loadbalancer/app/alb-{i}/{i:04}"
    )
}

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub account: String,
    pub ou_accounts: Vec<String>,
    pub albs: usize,
    pub describe_calls: usize,
    /// (name, id) of policies that already exist in FMS
    pub existing_policies: Vec<(String, String)>,
    pub put_requests: Vec<PolicyRequest>,
    pub fail_put_for: Option<String>,
    pub ssm_value: Option<String>,
    pub fail_discovery: bool,
    pub fail_org_lookup: bool,
}

/// One shared state behind every client trait
#[derive(Clone, Default)]
pub(crate) struct FakeAws(Arc<Mutex<FakeState>>);

impl FakeAws {
    pub fn new(account: &str, ou_accounts: Vec<&str>) -> Self {
        Self(Arc::new(Mutex::new(FakeState {
            account: account.to_string(),
            ou_accounts: ou_accounts.into_iter().map(str::to_string).collect(),
            ..FakeState::default()
        })))
    }

    pub fn with_albs(self, count: usize) -> Self {
        self.state().albs = count;
        self
    }

    pub fn with_existing_policy(self, name: &str, id: &str) -> Self {
        self.state()
            .existing_policies
            .push((name.to_string(), id.to_string()));
        self
    }

    pub fn failing_put_for(self, name: &str) -> Self {
        self.state().fail_put_for = Some(name.to_string());
        self
    }

    pub fn with_ssm_value(self, value: &str) -> Self {
        self.state().ssm_value = Some(value.to_string());
        self
    }

    /// Every ELBv2 call fails
    pub fn failing_discovery(self) -> Self {
        self.state().fail_discovery = true;
        self
    }

    /// Every STS and Organizations call fails
    pub fn failing_org_lookup(self) -> Self {
        self.state().fail_org_lookup = true;
        self
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.0.lock().expect("fake state lock")
    }

    pub fn service(&self) -> WafPolicyAutopilotService {
        WafPolicyAutopilotService::with_clients(
            Box::new(self.clone()),
            Box::new(self.clone()),
            Box::new(self.clone()),
            Box::new(self.clone()),
        )
    }
}

#[async_trait]
impl LoadBalancerSource for FakeAws {
    async fn describe_load_balancers(
        &self,
        _marker: Option<String>,
    ) -> AwsResult<LoadBalancerPage> {
        let mut state = self.state();
        state.describe_calls += 1;
        if state.fail_discovery {
            return Err(AwsError::ElbError(
                "Failed to describe load balancers: access denied".to_string(),
            ));
        }
        Ok(LoadBalancerPage {
            load_balancers: (0..state.albs)
                .map(|i| LoadBalancerSummary {
                    arn: Some(alb_arn(i)),
                    is_application: true,
                })
                .collect(),
            next_marker: None,
        })
    }

    async fn describe_tags(
        &self,
        resource_arns: Vec<String>,
    ) -> AwsResult<Vec<LoadBalancerTags>> {
        if self.state().fail_discovery {
            return Err(AwsError::ElbError(
                "Failed to describe tags: access denied".to_string(),
            ));
        }
        Ok(resource_arns
            .into_iter()
            .map(|arn| LoadBalancerTags {
                resource_arn: Some(arn),
                tags: vec![(
                    Some("fms:waf-primary".to_string()),
                    Some("ou-shared-edge".to_string()),
                )],
            })
            .collect())
    }
}

#[async_trait]
impl OrganizationDirectory for FakeAws {
    async fn caller_account_id(&self) -> AwsResult<String> {
        let state = self.state();
        if state.fail_org_lookup {
            return Err(AwsError::StsError(
                "Failed to get caller identity: expired token".to_string(),
            ));
        }
        Ok(state.account.clone())
    }

    async fn list_accounts_for_parent(
        &self,
        _parent_id: &str,
        _next_token: Option<String>,
    ) -> AwsResult<AccountPage> {
        let state = self.state();
        if state.fail_org_lookup {
            return Err(AwsError::OrganizationsError(
                "Failed to list accounts for parent: access denied".to_string(),
            ));
        }
        Ok(AccountPage {
            account_ids: state.ou_accounts.clone(),
            next_token: None,
        })
    }
}

#[async_trait]
impl FirewallManagerApi for FakeAws {
    async fn list_policies(&self, _next_token: Option<String>) -> AwsResult<PolicyPage> {
        Ok(PolicyPage {
            policies: self
                .state()
                .existing_policies
                .iter()
                .map(|(name, id)| PolicySummary {
                    policy_id: Some(id.clone()),
                    policy_name: Some(name.clone()),
                })
                .collect(),
            next_token: None,
        })
    }

    async fn get_policy_update_token(&self, policy_id: &str) -> AwsResult<Option<String>> {
        Ok(Some(format!("token-{policy_id}")))
    }

    async fn put_policy(&self, request: &PolicyRequest) -> AwsResult<()> {
        let mut state = self.state();
        if state.fail_put_for.as_deref() == Some(request.name.as_str()) {
            return Err(AwsError::FmsError(format!(
                "Failed to put policy {}: throttled",
                request.name
            )));
        }
        state.put_requests.push(request.clone());
        Ok(())
    }
}

#[async_trait]
impl ParameterStore for FakeAws {
    async fn get_parameter(&self, _name: &str) -> AwsResult<Option<String>> {
        Ok(self.state().ssm_value.clone())
    }
}
