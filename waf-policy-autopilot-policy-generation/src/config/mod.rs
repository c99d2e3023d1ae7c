//! Policy rule table loaded from YAML
//!
//! The rule table describes baseline WAF settings per resource type and how the
//! extra rule groups for a resource are chosen. Two selection schemas exist:
//!
//! - **tag-keyed**: two tag names (`tagKeys.primary`/`tagKeys.secondary`) each
//!   select a named rule set from `ruleSets`, falling back to `defaults`.
//! - **variants**: an ordered list of match predicates, each carrying override
//!   rule groups and an optional default action, falling back to `defaultVariant`.
//!
//! A config must use exactly one schema. All structural problems are rejected
//! at load time so rendering never has to deal with a dangling reference.

mod overrides;

pub use overrides::ConfigOverrides;

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::embedded_data::EmbeddedConfig;
use crate::errors::{PolicyGenerationError, Result};

/// WAFv2 scope of the web ACL created by Firewall Manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    Regional,
    Cloudfront,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regional => "REGIONAL",
            Self::Cloudfront => "CLOUDFRONT",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action taken by the web ACL when no rule matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefaultAction {
    Allow,
    Block,
}

impl DefaultAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "ALLOW",
            Self::Block => "BLOCK",
        }
    }
}

impl fmt::Display for DefaultAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a rule group: either customer-managed (ARN) or AWS-managed (vendor + name).
///
/// Exactly one of `arn` or (`vendor` and `name`) must be set. Empty strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleGroupConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Validated view of a [`RuleGroupConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleGroupRef<'a> {
    Customer { arn: &'a str },
    Managed { vendor: &'a str, name: &'a str },
}

impl RuleGroupConfig {
    pub fn customer(arn: impl Into<String>) -> Self {
        Self {
            arn: Some(arn.into()),
            ..Self::default()
        }
    }

    pub fn managed(vendor: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            arn: None,
            vendor: Some(vendor.into()),
            name: Some(name.into()),
        }
    }

    /// Resolve which kind of rule group this is, or why it is malformed.
    pub fn reference(&self) -> std::result::Result<RuleGroupRef<'_>, &'static str> {
        let arn = non_empty(self.arn.as_deref());
        let vendor = non_empty(self.vendor.as_deref());
        let name = non_empty(self.name.as_deref());

        match (arn, vendor, name) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                Err("specify either arn OR vendor/name, not both")
            }
            (Some(arn), None, None) => Ok(RuleGroupRef::Customer { arn }),
            (None, Some(vendor), Some(name)) => Ok(RuleGroupRef::Managed { vendor, name }),
            _ => Err("must provide arn or vendor/name"),
        }
    }

    /// Deduplication key: the ARN when present, else `vendor/name`.
    pub fn identity_key(&self) -> String {
        match non_empty(self.arn.as_deref()) {
            Some(arn) => arn.to_string(),
            None => format!(
                "{}/{}",
                self.vendor.as_deref().unwrap_or_default(),
                self.name.as_deref().unwrap_or_default()
            ),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Baseline WAF/FMS settings for one logical resource type (e.g. `alb`)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResourceDefaults {
    /// FMS resource type, e.g. `AWS::ElasticLoadBalancingV2::LoadBalancer`
    pub resource_type: String,
    pub scope: Scope,
    pub default_action: DefaultAction,
    /// Rule groups applied to every resource of this type
    #[serde(default)]
    pub managed_rule_groups: Vec<RuleGroupConfig>,
}

/// Named collection of rule groups chosen by tag value
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RuleSet {
    #[serde(default)]
    pub rule_groups: Vec<RuleGroupConfig>,
}

/// Tag names read from each resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TagKeys {
    pub primary: String,
    pub secondary: String,
}

/// Rule sets keyed by tag value, one table per tag key
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSets {
    pub primary: BTreeMap<String, RuleSet>,
    pub secondary: BTreeMap<String, RuleSet>,
}

/// Rule set names used when a tag is missing or names an unknown rule set
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleSetDefaults {
    pub primary: String,
    pub secondary: String,
}

/// Tag-keyed selection schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagKeyedRules {
    pub tag_keys: TagKeys,
    pub rule_sets: RuleSets,
    pub defaults: RuleSetDefaults,
}

/// Tag predicates a resource must satisfy for a variant to apply.
///
/// Every listed tag must be present with the given value; the value `*`
/// accepts any value. An empty predicate matches every resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchPredicate {
    pub tags: BTreeMap<String, String>,
}

impl MatchPredicate {
    pub const ANY_VALUE: &'static str = "*";

    pub fn matches(&self, tags: &BTreeMap<String, String>) -> bool {
        self.tags.iter().all(|(key, expected)| {
            tags.get(key)
                .is_some_and(|actual| expected == Self::ANY_VALUE || actual == expected)
        })
    }
}

/// One entry of the variants schema
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Variant {
    pub name: String,
    #[serde(default, rename = "match")]
    pub matcher: MatchPredicate,
    #[serde(default)]
    pub rule_groups: Vec<RuleGroupConfig>,
    /// Replaces the resource type's default action when set
    #[serde(default)]
    pub default_action: Option<DefaultAction>,
}

/// Variants selection schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRules {
    pub variants: Vec<Variant>,
    pub default_variant: String,
}

impl VariantRules {
    pub fn variant(&self, name: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.name == name)
    }
}

/// How the extra rule groups of a resource are chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSelection {
    TagKeyed(TagKeyedRules),
    Variants(VariantRules),
}

/// Root of the rule table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Baseline behavior per logical resource type (`alb`, ...)
    pub resource_defaults: BTreeMap<String, ResourceDefaults>,
    pub selection: RuleSelection,
}

/// On-disk layout; both schemas are optional here and reconciled in `TryFrom`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PolicyConfigDocument {
    #[serde(default)]
    resource_defaults: BTreeMap<String, ResourceDefaults>,
    tag_keys: Option<TagKeys>,
    rule_sets: Option<RuleSets>,
    defaults: Option<RuleSetDefaults>,
    variants: Option<Vec<Variant>>,
    default_variant: Option<String>,
}

impl TryFrom<PolicyConfigDocument> for PolicyConfig {
    type Error = PolicyGenerationError;

    fn try_from(doc: PolicyConfigDocument) -> Result<Self> {
        let has_tag_keyed =
            doc.tag_keys.is_some() || doc.rule_sets.is_some() || doc.defaults.is_some();
        let has_variants = doc.variants.is_some() || doc.default_variant.is_some();

        let selection = match (has_tag_keyed, has_variants) {
            (true, true) => {
                return Err(PolicyGenerationError::invalid_config(
                    "tagKeys/ruleSets/defaults and variants/defaultVariant cannot be combined; choose one schema",
                ))
            }
            (false, false) => {
                return Err(PolicyGenerationError::invalid_config(
                    "config must define either tagKeys/ruleSets/defaults or variants/defaultVariant",
                ))
            }
            (true, false) => RuleSelection::TagKeyed(TagKeyedRules {
                tag_keys: doc.tag_keys.unwrap_or_default(),
                rule_sets: doc.rule_sets.ok_or_else(|| {
                    PolicyGenerationError::invalid_config(
                        "ruleSets.primary and ruleSets.secondary must be provided",
                    )
                })?,
                defaults: doc.defaults.unwrap_or_default(),
            }),
            (false, true) => RuleSelection::Variants(VariantRules {
                variants: doc.variants.unwrap_or_default(),
                default_variant: doc.default_variant.unwrap_or_default(),
            }),
        };

        Ok(Self {
            resource_defaults: doc.resource_defaults,
            selection,
        })
    }
}

impl PolicyConfig {
    /// Load and validate a rule table from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| PolicyGenerationError::file_system("read config", path, e))?;
        Self::from_yaml(&data)
    }

    /// Parse and validate a rule table from YAML bytes.
    pub fn from_yaml(data: &[u8]) -> Result<Self> {
        let doc: PolicyConfigDocument = serde_yaml::from_slice(data)?;
        let config = Self::try_from(doc)?;
        config.validate()?;
        debug!(
            "Loaded policy config with {} resource type(s)",
            config.resource_defaults.len()
        );
        Ok(config)
    }

    /// Load the default rule table compiled into the binary.
    pub fn embedded() -> Result<Self> {
        Self::from_yaml(&EmbeddedConfig::default_policy_variants()?)
    }

    /// Check the invariants rendering relies on. Returns the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.resource_defaults.is_empty() {
            return Err(PolicyGenerationError::invalid_config(
                "resourceDefaults must not be empty",
            ));
        }
        for (key, defaults) in &self.resource_defaults {
            if defaults.resource_type.trim().is_empty() {
                return Err(PolicyGenerationError::invalid_config(format!(
                    "resourceDefaults[{key}].resourceType is required"
                )));
            }
            validate_rule_groups(
                &format!("resourceDefaults[{key}].managedRuleGroups"),
                &defaults.managed_rule_groups,
            )?;
        }

        match &self.selection {
            RuleSelection::TagKeyed(rules) => rules.validate(),
            RuleSelection::Variants(rules) => rules.validate(),
        }
    }
}

impl TagKeyedRules {
    fn validate(&self) -> Result<()> {
        if self.tag_keys.primary.is_empty() || self.tag_keys.secondary.is_empty() {
            return Err(PolicyGenerationError::invalid_config(
                "tagKeys.primary and tagKeys.secondary are required",
            ));
        }

        check_default("primary", &self.defaults.primary, &self.rule_sets.primary)?;
        check_default(
            "secondary",
            &self.defaults.secondary,
            &self.rule_sets.secondary,
        )?;

        for (name, rule_set) in &self.rule_sets.primary {
            validate_rule_groups(
                &format!("ruleSets.primary[{name}].ruleGroups"),
                &rule_set.rule_groups,
            )?;
        }
        for (name, rule_set) in &self.rule_sets.secondary {
            validate_rule_groups(
                &format!("ruleSets.secondary[{name}].ruleGroups"),
                &rule_set.rule_groups,
            )?;
        }
        Ok(())
    }
}

fn check_default(which: &str, default: &str, available: &BTreeMap<String, RuleSet>) -> Result<()> {
    if default.is_empty() {
        return Err(PolicyGenerationError::invalid_config(format!(
            "defaults.{which} is required"
        )));
    }
    if !available.contains_key(default) {
        return Err(PolicyGenerationError::invalid_config(format!(
            "defaults.{which} {default:?} not found in ruleSets.{which}"
        )));
    }
    Ok(())
}

impl VariantRules {
    fn validate(&self) -> Result<()> {
        if self.variants.is_empty() {
            return Err(PolicyGenerationError::invalid_config(
                "variants must not be empty",
            ));
        }

        let mut seen = HashSet::new();
        for (i, variant) in self.variants.iter().enumerate() {
            if variant.name.is_empty() {
                return Err(PolicyGenerationError::invalid_config(format!(
                    "variants[{i}].name is required"
                )));
            }
            if !seen.insert(variant.name.as_str()) {
                return Err(PolicyGenerationError::invalid_config(format!(
                    "variants[{i}]: duplicate variant name {:?}",
                    variant.name
                )));
            }
            if variant.matcher.tags.keys().any(|k| k.is_empty()) {
                return Err(PolicyGenerationError::invalid_config(format!(
                    "variants[{}].match.tags: tag key must not be empty",
                    variant.name
                )));
            }
            validate_rule_groups(
                &format!("variants[{}].ruleGroups", variant.name),
                &variant.rule_groups,
            )?;
        }

        if self.default_variant.is_empty() {
            return Err(PolicyGenerationError::invalid_config(
                "defaultVariant is required",
            ));
        }
        if self.variant(&self.default_variant).is_none() {
            return Err(PolicyGenerationError::invalid_config(format!(
                "defaultVariant {:?} not found in variants",
                self.default_variant
            )));
        }
        Ok(())
    }
}

fn validate_rule_groups(prefix: &str, groups: &[RuleGroupConfig]) -> Result<()> {
    for (i, group) in groups.iter().enumerate() {
        group.reference().map_err(|reason| {
            PolicyGenerationError::invalid_config(format!("{prefix}[{i}]: {reason}"))
        })?;
    }
    Ok(())
}
