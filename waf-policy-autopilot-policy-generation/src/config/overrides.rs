//! Environment-driven adjustments to a loaded rule table

use log::{info, warn};

use super::{PolicyConfig, RuleSelection};

pub const PRIMARY_TAG_KEY_ENV: &str = "PRIMARY_TAG_KEY";
pub const SECONDARY_TAG_KEY_ENV: &str = "SECONDARY_TAG_KEY";
pub const DEFAULT_PRIMARY_RULES_ENV: &str = "DEFAULT_PRIMARY_RULES";
pub const DEFAULT_SECONDARY_RULES_ENV: &str = "DEFAULT_SECONDARY_RULES";
pub const DEFAULT_VARIANT_ENV: &str = "DEFAULT_VARIANT";

/// Overrides for tag names and fallback rule sets.
///
/// Default overrides only take effect when they name an existing rule set or
/// variant, so applying them never breaks a validated config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub primary_tag_key: Option<String>,
    pub secondary_tag_key: Option<String>,
    pub default_primary_rules: Option<String>,
    pub default_secondary_rules: Option<String>,
    pub default_variant: Option<String>,
}

impl ConfigOverrides {
    /// Read overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides from an arbitrary key/value source. Empty values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            primary_tag_key: get(PRIMARY_TAG_KEY_ENV),
            secondary_tag_key: get(SECONDARY_TAG_KEY_ENV),
            default_primary_rules: get(DEFAULT_PRIMARY_RULES_ENV),
            default_secondary_rules: get(DEFAULT_SECONDARY_RULES_ENV),
            default_variant: get(DEFAULT_VARIANT_ENV),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl PolicyConfig {
    /// Apply environment overrides in place.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        match &mut self.selection {
            RuleSelection::TagKeyed(rules) => {
                if let Some(key) = &overrides.primary_tag_key {
                    info!("Overriding primary tag key with {}", key);
                    rules.tag_keys.primary = key.clone();
                }
                if let Some(key) = &overrides.secondary_tag_key {
                    info!("Overriding secondary tag key with {}", key);
                    rules.tag_keys.secondary = key.clone();
                }
                if let Some(name) = &overrides.default_primary_rules {
                    if rules.rule_sets.primary.contains_key(name) {
                        rules.defaults.primary = name.clone();
                    } else {
                        warn!(
                            "{} {} not found in ruleSets.primary; keeping {}",
                            DEFAULT_PRIMARY_RULES_ENV, name, rules.defaults.primary
                        );
                    }
                }
                if let Some(name) = &overrides.default_secondary_rules {
                    if rules.rule_sets.secondary.contains_key(name) {
                        rules.defaults.secondary = name.clone();
                    } else {
                        warn!(
                            "{} {} not found in ruleSets.secondary; keeping {}",
                            DEFAULT_SECONDARY_RULES_ENV, name, rules.defaults.secondary
                        );
                    }
                }
                if overrides.default_variant.is_some() {
                    warn!(
                        "{} is set but the config uses tag-keyed rule sets; ignoring",
                        DEFAULT_VARIANT_ENV
                    );
                }
            }
            RuleSelection::Variants(rules) => {
                if let Some(name) = &overrides.default_variant {
                    if rules.variant(name).is_some() {
                        rules.default_variant = name.clone();
                    } else {
                        warn!(
                            "{} {} not found in variants; keeping {}",
                            DEFAULT_VARIANT_ENV, name, rules.default_variant
                        );
                    }
                }
                let tag_keyed_only = [
                    (PRIMARY_TAG_KEY_ENV, &overrides.primary_tag_key),
                    (SECONDARY_TAG_KEY_ENV, &overrides.secondary_tag_key),
                    (DEFAULT_PRIMARY_RULES_ENV, &overrides.default_primary_rules),
                    (
                        DEFAULT_SECONDARY_RULES_ENV,
                        &overrides.default_secondary_rules,
                    ),
                ];
                for (env, value) in tag_keyed_only {
                    if value.is_some() {
                        warn!("{} is set but the config uses variants; ignoring", env);
                    }
                }
            }
        }
    }
}
