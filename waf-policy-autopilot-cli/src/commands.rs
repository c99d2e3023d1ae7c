//! Subcommand implementations

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use waf_policy_autopilot_aws::{
    plan_resources, ApplyOptions, ConfigSource, PlanResult, RunSummary, WafPolicyAutopilotService,
};
use waf_policy_autopilot_policy_generation::{
    load_resources, ConfigOverrides, PolicyConfig, RenderedPolicy, RuleSelection,
};

use crate::cli::{ApplyArgs, RenderArgs};

pub async fn render(args: RenderArgs) -> Result<()> {
    let config = load_render_config(args.config.as_deref(), &ConfigOverrides::from_env())?;

    let resources = if args.discover {
        info!("Discovering resources from AWS");
        let service = WafPolicyAutopilotService::new(args.region.as_deref())
            .await
            .context("load AWS config")?;
        service.discover().await?
    } else {
        info!("Reading resources from {}", args.input.display());
        let resources = load_resources(&args.input).context("read input resources")?;
        info!("Loaded {} resources from file", resources.len());
        resources
    };

    match plan_resources(&config, &resources)? {
        PlanResult::Policies(policies) => write_policies(&args.output, &policies),
        PlanResult::NoResources | PlanResult::NotInOu => Ok(()),
    }
}

/// A config file is used as written; the built-in config takes environment overrides.
fn load_render_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<PolicyConfig> {
    match path {
        Some(path) => {
            info!("Loading policy config from {}", path.display());
            PolicyConfig::load(path).context("load config")
        }
        None => {
            info!("Loading built-in policy config");
            let mut config = PolicyConfig::embedded().context("load config")?;
            config.apply_overrides(overrides);
            Ok(config)
        }
    }
}

fn write_policies(output: &Path, policies: &BTreeMap<String, RenderedPolicy>) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("ensure output directory {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(policies)
        .context("marshal policies to JSON")?;
    fs::write(output, json)
        .with_context(|| format!("write output file {}", output.display()))?;

    info!("Wrote {} policies to {}", policies.len(), output.display());
    Ok(())
}

pub async fn apply(args: ApplyArgs) -> Result<()> {
    let source = match args.config {
        Some(path) => ConfigSource::Path(path),
        None => ConfigSource::from_env(),
    };
    let options = ApplyOptions {
        ou_id: args.ou_id,
        dry_run: args.dry_run,
    };

    let service = WafPolicyAutopilotService::new(args.region.as_deref())
        .await
        .context("load AWS config")?;
    let summary = service.run(&source, &options).await?;

    if let RunSummary::Processed(report) = &summary {
        println!(
            "{}",
            serde_json::to_string_pretty(report).context("marshal apply report")?
        );
    }
    println!("{summary}");
    Ok(())
}

pub fn validate_config(path: &Path) -> Result<()> {
    let config = PolicyConfig::load(path)
        .with_context(|| format!("invalid config {}", path.display()))?;

    println!("{}: OK", path.display());
    println!(
        "  resource defaults: {}",
        config
            .resource_defaults
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    );
    match &config.selection {
        RuleSelection::TagKeyed(rules) => {
            println!(
                "  primary tag {}: {} rule set(s), default {}",
                rules.tag_keys.primary,
                rules.rule_sets.primary.len(),
                rules.defaults.primary
            );
            println!(
                "  secondary tag {}: {} rule set(s), default {}",
                rules.tag_keys.secondary,
                rules.rule_sets.secondary.len(),
                rules.defaults.secondary
            );
        }
        RuleSelection::Variants(rules) => {
            println!(
                "  {} variant(s), default {}",
                rules.variants.len(),
                rules.default_variant
            );
        }
    }
    Ok(())
}
