//! WAF Policy Autopilot Service Layer
//!
//! The service holds the AWS clients behind async traits and exposes the
//! high-level operations (load config, plan, apply, run) used by the CLI and
//! the Lambda handler.

use log::info;
use waf_policy_autopilot_policy_generation::{PolicyConfig, Resource};

use crate::aws::discovery::{discover_albs, AwsLoadBalancerSource, LoadBalancerSource};
use crate::aws::fms_client::{AwsFirewallManager, FirewallManagerApi};
use crate::aws::organizations::{AwsOrganizationDirectory, OrganizationDirectory};
use crate::aws::ssm::{fetch_config_yaml, AwsParameterStore, ParameterStore};
use crate::aws::{load_sdk_config, AwsError};
use crate::error::{WafPolicyAutopilotError, WafPolicyAutopilotResult};
use crate::types::ConfigSource;

/// Main service struct that holds AWS clients and provides business logic operations
pub struct WafPolicyAutopilotService {
    pub(crate) load_balancers: Box<dyn LoadBalancerSource>,
    pub(crate) organizations: Box<dyn OrganizationDirectory>,
    pub(crate) firewall_manager: Box<dyn FirewallManagerApi>,
    pub(crate) parameters: Box<dyn ParameterStore>,
}

impl WafPolicyAutopilotService {
    /// Create a service backed by the AWS SDK
    ///
    /// Credentials come from the default provider chain. `region` pins the
    /// region, otherwise the chain's region is used.
    ///
    /// # Errors
    ///
    /// Returns an error if no region can be resolved.
    pub async fn new(region: Option<&str>) -> WafPolicyAutopilotResult<Self> {
        let config = load_sdk_config(region).await;
        if config.region().is_none() {
            return Err(AwsError::ConfigError(
                "no AWS region configured; pass a region or set AWS_REGION".to_string(),
            )
            .into());
        }

        Ok(Self::with_clients(
            Box::new(AwsLoadBalancerSource::new(
                aws_sdk_elasticloadbalancingv2::Client::new(&config),
            )),
            Box::new(AwsOrganizationDirectory::new(
                aws_sdk_organizations::Client::new(&config),
                aws_sdk_sts::Client::new(&config),
            )),
            Box::new(AwsFirewallManager::new(aws_sdk_fms::Client::new(&config))),
            Box::new(AwsParameterStore::new(aws_sdk_ssm::Client::new(&config))),
        ))
    }

    /// Create a service from explicit client implementations
    pub fn with_clients(
        load_balancers: Box<dyn LoadBalancerSource>,
        organizations: Box<dyn OrganizationDirectory>,
        firewall_manager: Box<dyn FirewallManagerApi>,
        parameters: Box<dyn ParameterStore>,
    ) -> Self {
        Self {
            load_balancers,
            organizations,
            firewall_manager,
            parameters,
        }
    }

    /// Load and validate the rule table from `source`.
    ///
    /// Environment overrides only apply to the embedded config.
    pub async fn load_config(
        &self,
        source: &ConfigSource,
    ) -> WafPolicyAutopilotResult<PolicyConfig> {
        match source {
            ConfigSource::Ssm(param) => {
                let yaml = fetch_config_yaml(self.parameters.as_ref(), param)
                    .await
                    .map_err(|e| {
                        WafPolicyAutopilotError::step(format!("load config from SSM {param}"), e)
                    })?;
                PolicyConfig::from_yaml(yaml.as_bytes()).map_err(|e| {
                    WafPolicyAutopilotError::step(format!("load config from SSM {param}"), e)
                })
            }
            ConfigSource::Path(path) => {
                info!("Loading config from {}", path.display());
                Ok(PolicyConfig::load(path)?)
            }
            ConfigSource::Embedded(overrides) => {
                let mut config = PolicyConfig::embedded()?;
                config.apply_overrides(overrides);
                Ok(config)
            }
        }
    }

    /// Discover application load balancers in the configured region
    pub async fn discover(&self) -> WafPolicyAutopilotResult<Vec<Resource>> {
        let resources = discover_albs(self.load_balancers.as_ref())
            .await
            .map_err(|e| WafPolicyAutopilotError::step("discover resources", e))?;
        info!("Discovered {} ALB resource(s)", resources.len());
        Ok(resources)
    }

    // plan() method implementation is in plan.rs
    // apply() and run() method implementations are in apply.rs
}
