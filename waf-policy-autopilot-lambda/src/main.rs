//! Lambda handler: verify OU membership, discover ALBs and upsert their FMS policies.
//!
//! Configuration comes from the environment (`OU_ID`, `CONFIG_SSM_PARAM`,
//! `CONFIG_PATH` and the rule table overrides); the event only carries
//! per-invocation switches.

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use log::{error, info};
use serde::Deserialize;
use waf_policy_autopilot_aws::{
    ApplyOptions, ConfigSource, WafPolicyAutopilotResult, WafPolicyAutopilotService, OU_ID_ENV,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Event {
    /// Skip PutPolicy and only log intended changes
    dry_run: bool,
    /// Region override for this invocation
    region: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // CloudWatch adds its own timestamps
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    run(service_fn(handler)).await
}

async fn handler(event: LambdaEvent<Event>) -> Result<String, Error> {
    let (event, context) = event.into_parts();
    info!(
        "Invocation {} (dry run: {})",
        context.request_id, event.dry_run
    );

    process(&event).await.map_err(|e| {
        error!("{}", e);
        e.into()
    })
}

async fn process(event: &Event) -> WafPolicyAutopilotResult<String> {
    let service = WafPolicyAutopilotService::new(event.region.as_deref()).await?;
    let options = ApplyOptions {
        ou_id: std::env::var(OU_ID_ENV).ok(),
        dry_run: event.dry_run,
    };

    let summary = service.run(&ConfigSource::from_env(), &options).await?;
    info!("{}", summary);
    Ok(summary.to_string())
}
