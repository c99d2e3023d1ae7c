//! Rule selection: which configured rule groups apply to a resource

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::config::{
    DefaultAction, RuleGroupConfig, RuleSelection, RuleSet, TagKeyedRules, VariantRules,
};
use crate::errors::{PolicyGenerationError, Result};
use crate::resources::Resource;

/// Outcome of rule selection for one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<'a> {
    /// Human-readable summary used in the policy description
    pub label: String,
    /// Selected rule group lists, in merge order after the resource defaults
    pub layers: Vec<&'a [RuleGroupConfig]>,
    /// Replaces the resource type's default action when set
    pub default_action: Option<DefaultAction>,
}

/// Select the rule groups for `resource` according to the configured schema.
pub fn select<'a>(selection: &'a RuleSelection, resource: &Resource) -> Result<Selection<'a>> {
    match selection {
        RuleSelection::TagKeyed(rules) => select_tag_keyed(rules, resource),
        RuleSelection::Variants(rules) => select_variant(rules, resource),
    }
}

fn select_tag_keyed<'a>(rules: &'a TagKeyedRules, resource: &Resource) -> Result<Selection<'a>> {
    let primary = select_rule_set_name(
        resource,
        &rules.tag_keys.primary,
        &rules.defaults.primary,
        &rules.rule_sets.primary,
    );
    let secondary = select_rule_set_name(
        resource,
        &rules.tag_keys.secondary,
        &rules.defaults.secondary,
        &rules.rule_sets.secondary,
    );

    let primary_set = lookup(&rules.rule_sets.primary, primary, "primary", resource)?;
    let secondary_set = lookup(&rules.rule_sets.secondary, secondary, "secondary", resource)?;

    Ok(Selection {
        label: format!("primary={primary}, secondary={secondary}"),
        layers: vec![&primary_set.rule_groups, &secondary_set.rule_groups],
        default_action: None,
    })
}

/// Tag value if it names a configured rule set, else the configured default.
fn select_rule_set_name<'a>(
    resource: &'a Resource,
    tag_key: &str,
    default: &'a str,
    available: &BTreeMap<String, RuleSet>,
) -> &'a str {
    let Some(value) = resource.tag(tag_key) else {
        debug!(
            "Resource {} has no {} tag; using default {}",
            resource.arn, tag_key, default
        );
        return default;
    };
    if available.contains_key(value) {
        return value;
    }
    warn!(
        "Resource {} has tag {}={} which is not configured; using default {}",
        resource.arn, tag_key, value, default
    );
    default
}

fn lookup<'a>(
    rule_sets: &'a BTreeMap<String, RuleSet>,
    name: &str,
    which: &str,
    resource: &Resource,
) -> Result<&'a RuleSet> {
    rule_sets.get(name).ok_or_else(|| {
        PolicyGenerationError::render(
            &resource.arn,
            format!("rule set {name:?} not found in ruleSets.{which}"),
        )
    })
}

fn select_variant<'a>(rules: &'a VariantRules, resource: &Resource) -> Result<Selection<'a>> {
    let variant = match rules
        .variants
        .iter()
        .find(|v| v.matcher.matches(&resource.tags))
    {
        Some(variant) => variant,
        None => {
            warn!(
                "Resource {} matches no variant; using default variant {}",
                resource.arn, rules.default_variant
            );
            rules.variant(&rules.default_variant).ok_or_else(|| {
                PolicyGenerationError::render(
                    &resource.arn,
                    format!(
                        "default variant {:?} not found in variants",
                        rules.default_variant
                    ),
                )
            })?
        }
    };

    Ok(Selection {
        label: format!("variant={}", variant.name),
        layers: vec![&variant.rule_groups],
        default_action: variant.default_action,
    })
}
