//! Error types for the WAF Policy Autopilot service layer

use thiserror::Error;
use waf_policy_autopilot_policy_generation::PolicyGenerationError;

use crate::aws::AwsError;

#[derive(Error, Debug)]
pub enum WafPolicyAutopilotError {
    #[error(transparent)]
    Aws(#[from] AwsError),

    #[error(transparent)]
    PolicyGeneration(#[from] PolicyGenerationError),

    #[error("{context}: {source}")]
    Step {
        context: String,
        #[source]
        source: Box<WafPolicyAutopilotError>,
    },
}

impl WafPolicyAutopilotError {
    /// Wrap an error with the name of the step that failed
    pub fn step(context: impl Into<String>, source: impl Into<Self>) -> Self {
        Self::Step {
            context: context.into(),
            source: Box::new(source.into()),
        }
    }
}

pub type WafPolicyAutopilotResult<T> = Result<T, WafPolicyAutopilotError>;
