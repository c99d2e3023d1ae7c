//! Plan creation logic for WAF Policy Autopilot service

use log::{info, warn};
use waf_policy_autopilot_policy_generation::{build_policies, PolicyConfig, Resource};

use crate::aws::organizations::account_in_ou;
use crate::error::{WafPolicyAutopilotError, WafPolicyAutopilotResult};
use crate::types::PlanResult;

impl super::service::WafPolicyAutopilotService {
    /// Create a plan: check OU membership, discover ALBs and render their policies.
    pub async fn plan(
        &self,
        config: &PolicyConfig,
        ou_id: Option<&str>,
    ) -> WafPolicyAutopilotResult<PlanResult> {
        let in_ou = account_in_ou(self.organizations.as_ref(), ou_id)
            .await
            .map_err(|e| WafPolicyAutopilotError::step("verify OU membership", e))?;
        if !in_ou {
            return Ok(PlanResult::NotInOu);
        }

        let resources = self.discover().await?;
        plan_resources(config, &resources)
    }
}

/// Render policies for already known resources.
pub fn plan_resources(
    config: &PolicyConfig,
    resources: &[Resource],
) -> WafPolicyAutopilotResult<PlanResult> {
    if resources.is_empty() {
        warn!("No resources discovered or loaded; nothing to do");
        return Ok(PlanResult::NoResources);
    }

    let policies = build_policies(resources, config)
        .map_err(|e| WafPolicyAutopilotError::step("build policies", e))?;
    info!(
        "Rendered {} policies from {} resource(s)",
        policies.len(),
        resources.len()
    );
    Ok(PlanResult::Policies(policies))
}
