//! Policy model and the fixed FMS `managed_service_data` template

use serde::{Deserialize, Serialize};

use crate::config::{DefaultAction, RuleGroupConfig, RuleGroupRef, Scope};

/// Security service type of every rendered policy
pub const WAFV2_POLICY_TYPE: &str = "WAFV2";

/// Intermediate, resource-specific policy document.
///
/// Serializes to `{type, defaultAction, scope, ruleGroups}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyModel {
    #[serde(rename = "type")]
    pub policy_type: String,
    pub default_action: DefaultAction,
    pub scope: Scope,
    pub rule_groups: Vec<ModelRuleGroup>,
}

/// A rule group entry, tagged by kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ModelRuleGroup {
    /// Customer-managed rule group
    RuleGroup { arn: String },
    /// AWS- or marketplace-managed rule group
    ManagedRuleGroup { vendor: String, name: String },
}

impl ModelRuleGroup {
    /// Convert a validated rule group reference.
    pub fn from_config(group: &RuleGroupConfig) -> Result<Self, &'static str> {
        Ok(match group.reference()? {
            RuleGroupRef::Customer { arn } => Self::RuleGroup {
                arn: arn.to_string(),
            },
            RuleGroupRef::Managed { vendor, name } => Self::ManagedRuleGroup {
                vendor: vendor.to_string(),
                name: name.to_string(),
            },
        })
    }
}

impl PolicyModel {
    pub fn new(
        default_action: DefaultAction,
        scope: Scope,
        rule_groups: Vec<ModelRuleGroup>,
    ) -> Self {
        Self {
            policy_type: WAFV2_POLICY_TYPE.to_string(),
            default_action,
            scope,
            rule_groups,
        }
    }

    /// Render the FMS `managed_service_data` JSON text for this model.
    pub fn render_managed_service_data(&self) -> serde_json::Result<String> {
        serde_json::to_string(&ManagedServiceData::from(self))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ManagedServiceData<'a> {
    #[serde(rename = "type")]
    service_type: &'a str,
    pre_process_rule_groups: Vec<ProcessRuleGroup<'a>>,
    post_process_rule_groups: Vec<ProcessRuleGroup<'a>>,
    default_action: TypedAction<'a>,
    #[serde(rename = "overrideCustomerWebACLAssociation")]
    override_customer_web_acl_association: bool,
    logging_configuration: Option<()>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRuleGroup<'a> {
    rule_group_arn: Option<&'a str>,
    override_action: TypedAction<'a>,
    managed_rule_group_identifier: Option<ManagedRuleGroupIdentifier<'a>>,
    rule_group_type: &'a str,
    exclude_rules: Vec<()>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ManagedRuleGroupIdentifier<'a> {
    vendor_name: &'a str,
    managed_rule_group_name: &'a str,
    version: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct TypedAction<'a> {
    #[serde(rename = "type")]
    action: &'a str,
}

impl<'a> From<&'a PolicyModel> for ManagedServiceData<'a> {
    fn from(model: &'a PolicyModel) -> Self {
        Self {
            service_type: &model.policy_type,
            pre_process_rule_groups: model
                .rule_groups
                .iter()
                .map(ProcessRuleGroup::from)
                .collect(),
            post_process_rule_groups: Vec::new(),
            default_action: TypedAction {
                action: model.default_action.as_str(),
            },
            override_customer_web_acl_association: false,
            logging_configuration: None,
        }
    }
}

impl<'a> From<&'a ModelRuleGroup> for ProcessRuleGroup<'a> {
    fn from(group: &'a ModelRuleGroup) -> Self {
        let (rule_group_arn, managed_rule_group_identifier, rule_group_type) = match group {
            ModelRuleGroup::RuleGroup { arn } => (Some(arn.as_str()), None, "RuleGroup"),
            ModelRuleGroup::ManagedRuleGroup { vendor, name } => (
                None,
                Some(ManagedRuleGroupIdentifier {
                    vendor_name: vendor,
                    managed_rule_group_name: name,
                    version: None,
                }),
                "ManagedRuleGroup",
            ),
        };
        Self {
            rule_group_arn,
            override_action: TypedAction { action: "NONE" },
            managed_rule_group_identifier,
            rule_group_type,
            exclude_rules: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    const EDGE_ARN: &str = "arn:aws:wafv2:us-west-2:123456789012:regional/rulegroup/edge/1";

    fn model() -> PolicyModel {
        PolicyModel::new(
            DefaultAction::Allow,
            Scope::Regional,
            vec![
                ModelRuleGroup::ManagedRuleGroup {
                    vendor: "AWS".into(),
                    name: "AWSManagedRulesCommonRuleSet".into(),
                },
                ModelRuleGroup::RuleGroup {
                    arn: EDGE_ARN.into(),
                },
            ],
        )
    }

    #[test]
    fn test_model_shape() {
        let value = serde_json::to_value(model()).expect("serialize");
        assert_eq!(
            value,
            json!({
                "type": "WAFV2",
                "defaultAction": "ALLOW",
                "scope": "REGIONAL",
                "ruleGroups": [
                    {
                        "type": "ManagedRuleGroup",
                        "vendor": "AWS",
                        "name": "AWSManagedRulesCommonRuleSet"
                    },
                    {
                        "type": "RuleGroup",
                        "arn": EDGE_ARN
                    }
                ]
            })
        );
    }

    #[test]
    fn test_managed_service_data_shape() {
        let text = model().render_managed_service_data().expect("render");
        let value: Value = serde_json::from_str(&text).expect("valid JSON");
        assert_eq!(
            value,
            json!({
                "type": "WAFV2",
                "preProcessRuleGroups": [
                    {
                        "ruleGroupArn": null,
                        "overrideAction": {"type": "NONE"},
                        "managedRuleGroupIdentifier": {
                            "vendorName": "AWS",
                            "managedRuleGroupName": "AWSManagedRulesCommonRuleSet",
                            "version": null
                        },
                        "ruleGroupType": "ManagedRuleGroup",
                        "excludeRules": []
                    },
                    {
                        "ruleGroupArn": EDGE_ARN,
                        "overrideAction": {"type": "NONE"},
                        "managedRuleGroupIdentifier": null,
                        "ruleGroupType": "RuleGroup",
                        "excludeRules": []
                    }
                ],
                "postProcessRuleGroups": [],
                "defaultAction": {"type": "ALLOW"},
                "overrideCustomerWebACLAssociation": false,
                "loggingConfiguration": null
            })
        );
    }

    #[test]
    fn test_from_config_rejects_malformed_group() {
        let group = RuleGroupConfig {
            vendor: Some("AWS".into()),
            ..RuleGroupConfig::default()
        };
        assert!(ModelRuleGroup::from_config(&group).is_err());
    }
}
