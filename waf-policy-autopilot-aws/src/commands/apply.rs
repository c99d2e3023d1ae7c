//! Apply logic for WAF Policy Autopilot service

use log::info;

use crate::aws::fms_client::upsert_policy;
use crate::error::{WafPolicyAutopilotError, WafPolicyAutopilotResult};
use crate::types::{ApplyOptions, ApplyReport, ConfigSource, PlanResult, RunSummary};

impl super::service::WafPolicyAutopilotService {
    /// Push every planned policy to Firewall Manager, stopping at the first failure.
    pub async fn apply(
        &self,
        plan: &PlanResult,
        options: &ApplyOptions,
    ) -> WafPolicyAutopilotResult<ApplyReport> {
        let PlanResult::Policies(policies) = plan else {
            return Ok(ApplyReport::default());
        };

        let mut report = ApplyReport::default();
        for policy in policies.values() {
            let outcome = upsert_policy(
                self.firewall_manager.as_ref(),
                policy,
                options.ou_id(),
                options.dry_run,
            )
            .await
            .map_err(|e| {
                WafPolicyAutopilotError::step(format!("upsert policy {}", policy.name), e)
            })?;
            report.outcomes.push(outcome);
        }

        info!("Applied {} policies", report.len());
        Ok(report)
    }

    /// Load the rule table, plan and apply in one go.
    pub async fn run(
        &self,
        source: &ConfigSource,
        options: &ApplyOptions,
    ) -> WafPolicyAutopilotResult<RunSummary> {
        let config = self.load_config(source).await?;
        let plan = self.plan(&config, options.ou_id()).await?;

        Ok(match plan {
            PlanResult::NotInOu => RunSummary::NotInOu,
            PlanResult::NoResources => RunSummary::NoResources,
            PlanResult::Policies(_) => RunSummary::Processed(self.apply(&plan, options).await?),
        })
    }
}
