//! Policy rendering engine
//!
//! Turns discovered resources into named FMS policy records. For each resource
//! the engine selects rule groups from the rule table, merges them behind the
//! resource type's baseline groups, renders the `managed_service_data` template
//! and checks the result is well-formed JSON.

use std::collections::BTreeMap;

use log::{debug, warn};

use super::merge::merge_rule_groups;
use super::selection::select;
use super::template::{ModelRuleGroup, PolicyModel};
use super::RenderedPolicy;
use crate::config::{PolicyConfig, ResourceDefaults};
use crate::errors::{PolicyGenerationError, Result};
use crate::resources::{Resource, ResourceKind};

/// Prefix of every generated policy name
pub const POLICY_NAME_PREFIX: &str = "auto";

/// Renders policies against a validated rule table
#[derive(Debug, Clone, Copy)]
pub struct Engine<'a> {
    config: &'a PolicyConfig,
}

impl<'a> Engine<'a> {
    pub fn new(config: &'a PolicyConfig) -> Self {
        Self { config }
    }

    /// Render policies for every supported resource, keyed by policy name.
    ///
    /// Resources of unsupported kinds, or kinds without `resourceDefaults`,
    /// are skipped with a warning.
    pub fn build_policies(
        &self,
        resources: &[Resource],
    ) -> Result<BTreeMap<String, RenderedPolicy>> {
        let mut policies = BTreeMap::new();

        for resource in resources {
            let Some(policy) = self.render(resource)? else {
                continue;
            };
            if policies.contains_key(&policy.name) {
                warn!(
                    "Policy name {} is generated by more than one resource; keeping the one for {}",
                    policy.name, resource.arn
                );
            }
            policies.insert(policy.name.clone(), policy);
        }

        Ok(policies)
    }

    /// Render the policy for a single resource, or `None` if it is skipped.
    pub fn render(&self, resource: &Resource) -> Result<Option<RenderedPolicy>> {
        if resource.kind == ResourceKind::Unsupported {
            warn!("Unknown resource type for {}, skipping", resource.arn);
            return Ok(None);
        }

        let key = resource.kind.defaults_key();
        let Some(defaults) = self.config.resource_defaults.get(key) else {
            warn!(
                "No resourceDefaults for '{}'; skipping resource {}",
                key, resource.arn
            );
            return Ok(None);
        };

        let (model, label) = self.assemble(resource, defaults)?;
        let managed_service_data = model.render_managed_service_data().map_err(|e| {
            PolicyGenerationError::render(&resource.arn, format!("template rendering failed: {e}"))
        })?;
        validate_json(&managed_service_data, resource)?;

        let policy = RenderedPolicy {
            name: policy_name(resource),
            description: format!("Auto-generated WAFv2 policy ({label})"),
            resource_type: defaults.resource_type.clone(),
            scope: defaults.scope.to_string(),
            managed_service_data,
        };
        debug!("Rendered policy {} for {}", policy.name, resource.arn);
        Ok(Some(policy))
    }

    /// Build the intermediate policy model for a resource.
    ///
    /// Unlike [`Engine::render`], unsupported or unconfigured kinds are errors.
    pub fn build_model(&self, resource: &Resource) -> Result<PolicyModel> {
        if resource.kind == ResourceKind::Unsupported {
            return Err(PolicyGenerationError::render(
                &resource.arn,
                "unsupported resource type",
            ));
        }

        let key = resource.kind.defaults_key();
        let defaults = self.config.resource_defaults.get(key).ok_or_else(|| {
            PolicyGenerationError::render(&resource.arn, format!("no resourceDefaults for '{key}'"))
        })?;

        self.assemble(resource, defaults).map(|(model, _)| model)
    }

    /// Select, merge and convert rule groups; returns the model and the selection label.
    fn assemble(
        &self,
        resource: &Resource,
        defaults: &ResourceDefaults,
    ) -> Result<(PolicyModel, String)> {
        let selection = select(&self.config.selection, resource)?;
        let layers = std::iter::once(defaults.managed_rule_groups.as_slice())
            .chain(selection.layers.iter().copied());

        let rule_groups = merge_rule_groups(layers)
            .into_iter()
            .map(|group| {
                ModelRuleGroup::from_config(group).map_err(|reason| {
                    PolicyGenerationError::render(
                        &resource.arn,
                        format!("rule group {}: {reason}", group.identity_key()),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let model = PolicyModel::new(
            selection.default_action.unwrap_or(defaults.default_action),
            defaults.scope,
            rule_groups,
        );
        Ok((model, selection.label))
    }
}

/// Render policies for `resources` using `config`.
pub fn build_policies(
    resources: &[Resource],
    config: &PolicyConfig,
) -> Result<BTreeMap<String, RenderedPolicy>> {
    Engine::new(config).build_policies(resources)
}

fn validate_json(text: &str, resource: &Resource) -> Result<()> {
    serde_json::from_str::<serde_json::Value>(text)
        .map(|_| ())
        .map_err(|e| {
            PolicyGenerationError::render(
                &resource.arn,
                format!("rendered managed_service_data is not valid JSON: {e}"),
            )
        })
}

fn policy_name(resource: &Resource) -> String {
    format!(
        "{POLICY_NAME_PREFIX}-{}-{}",
        resource.kind,
        sanitize_name(&resource.id)
    )
}

/// Replace every character outside `[A-Za-z0-9_-]` with `-`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const PRIMARY: &str = "fms:waf-primary";
    const SECONDARY: &str = "fms:waf-secondary";

    fn alb(id: &str, tags: &[(&str, &str)]) -> Resource {
        Resource::alb(
            format!("arn:aws:elasticloadbalancing:us-west-2:123456789012:loadbalancer/app/{id}"),
            tags.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn keys(model: &PolicyModel) -> Vec<String> {
        model
            .rule_groups
            .iter()
            .map(|g| match g {
                ModelRuleGroup::RuleGroup { arn } => arn.clone(),
                ModelRuleGroup::ManagedRuleGroup { vendor, name } => format!("{vendor}/{name}"),
            })
            .collect()
    }

    #[rstest]
    #[case("demo-alb/abcd", "demo-alb-abcd")]
    #[case("my_alb-01", "my_alb-01")]
    #[case("a.b c/d:é", "a-b-c-d--")]
    #[case("", "")]
    fn test_sanitize_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_name(input), expected);
    }

    #[test]
    fn test_model_merges_defaults_then_primary_then_secondary() {
        let config = PolicyConfig::embedded().expect("embedded config");
        let resource = alb(
            "api/1",
            &[(PRIMARY, "ou-shared-api"), (SECONDARY, "ou-shared-bot")],
        );
        let model = Engine::new(&config).build_model(&resource).expect("model");

        // ou-shared-api repeats the baseline common rule set, which is dropped
        assert_eq!(
            keys(&model),
            vec![
                "AWS/AWSManagedRulesCommonRuleSet",
                "AWS/AWSManagedRulesKnownBadInputsRuleSet",
                "AWS/AWSManagedRulesSQLiRuleSet",
                "arn:aws:wafv2:us-west-2:123456789012:regional/rulegroup/ou-shared-bot/cccccccc-dddd-eeee-ffff-111111111111",
            ]
        );
        assert_eq!(model.policy_type, "WAFV2");
        assert_eq!(model.default_action.as_str(), "ALLOW");
    }

    #[test]
    fn test_render_names_and_describes_policy() {
        let config = PolicyConfig::embedded().expect("embedded config");
        let policy = Engine::new(&config)
            .render(&alb("demo-alb/abcd", &[(PRIMARY, "ou-shared-edge")]))
            .expect("render")
            .expect("policy");

        assert_eq!(policy.name, "auto-alb-demo-alb-abcd");
        assert_eq!(
            policy.description,
            "Auto-generated WAFv2 policy (primary=ou-shared-edge, secondary=ou-shared-bot)"
        );
        assert_eq!(
            policy.resource_type,
            "AWS::ElasticLoadBalancingV2::LoadBalancer"
        );
        assert_eq!(policy.scope, "REGIONAL");
    }

    #[test]
    fn test_variant_default_action_override() {
        let yaml = r#"
resourceDefaults:
  alb:
    resourceType: AWS::ElasticLoadBalancingV2::LoadBalancer
    scope: REGIONAL
    defaultAction: ALLOW
variants:
  - name: locked
    match:
      tags:
        locked: "true"
    defaultAction: BLOCK
  - name: open
defaultVariant: open
"#;
        let config = PolicyConfig::from_yaml(yaml.as_bytes()).expect("config");
        let engine = Engine::new(&config);

        let locked = engine
            .build_model(&alb("a/1", &[("locked", "true")]))
            .expect("model");
        assert_eq!(locked.default_action.as_str(), "BLOCK");

        let open = engine.build_model(&alb("a/2", &[])).expect("model");
        assert_eq!(open.default_action.as_str(), "ALLOW");
    }

    #[test]
    fn test_unsupported_and_unconfigured_kinds_are_skipped() {
        let config = PolicyConfig::embedded().expect("embedded config");
        let mut unsupported = alb("x/1", &[]);
        unsupported.kind = ResourceKind::Unsupported;
        assert!(Engine::new(&config)
            .render(&unsupported)
            .expect("render")
            .is_none());

        let mut without_defaults = config.clone();
        without_defaults.resource_defaults.clear();
        assert!(Engine::new(&without_defaults)
            .render(&alb("x/2", &[]))
            .expect("render")
            .is_none());
    }

    #[test]
    fn test_build_model_rejects_unsupported_kind() {
        // even a table that configures the placeholder kind must not model it
        let mut config = PolicyConfig::embedded().expect("embedded config");
        let alb_defaults = config.resource_defaults["alb"].clone();
        config
            .resource_defaults
            .insert("unsupported".to_string(), alb_defaults);
        let mut unsupported = alb("x/1", &[]);
        unsupported.kind = ResourceKind::Unsupported;

        let err = Engine::new(&config)
            .build_model(&unsupported)
            .expect_err("should fail");
        assert!(err.to_string().contains("unsupported resource type"));

        config.resource_defaults.clear();
        let err = Engine::new(&config)
            .build_model(&alb("x/2", &[]))
            .expect_err("should fail");
        assert!(err.to_string().contains("no resourceDefaults for 'alb'"));
    }

    #[test]
    fn test_build_policies_is_deterministic() {
        let config = PolicyConfig::embedded().expect("embedded config");
        let resources = vec![
            alb("b/2", &[(PRIMARY, "ou-shared-edge")]),
            alb("a/1", &[(SECONDARY, "none")]),
        ];

        let first = build_policies(&resources, &config).expect("build");
        let second = build_policies(&resources, &config).expect("build");
        assert_eq!(first, second);
        assert_eq!(
            first.keys().collect::<Vec<_>>(),
            vec!["auto-alb-a-1", "auto-alb-b-2"]
        );
        assert_eq!(
            serde_json::to_string(&first).expect("serialize"),
            serde_json::to_string(&second).expect("serialize")
        );
    }
}
