//! Ordered, deduplicated concatenation of rule group lists

use std::collections::HashSet;

use crate::config::RuleGroupConfig;

/// Concatenate `layers` in order, keeping the first occurrence of each identity key.
pub fn merge_rule_groups<'a, I>(layers: I) -> Vec<&'a RuleGroupConfig>
where
    I: IntoIterator<Item = &'a [RuleGroupConfig]>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for layer in layers {
        for group in layer {
            if seen.insert(group.identity_key()) {
                merged.push(group);
            }
        }
    }

    merged
}
