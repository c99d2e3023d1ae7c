use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

const BIN: &str = "waf-policy-autopilot";

const RESOURCES: &str = r#"[
  {
    "id": "demo-alb/abcd",
    "arn": "arn:aws:elasticloadbalancing:us-west-2:123456789012:loadbalancer/app/demo-alb/abcd",
    "type": "alb",
    "tags": { "fms:waf-primary": "ou-shared-edge" }
  },
  {
    "id": "cdn/1",
    "arn": "arn:aws:cloudfront::123456789012:distribution/1",
    "type": "cloudfront",
    "tags": {}
  }
]"#;

const DEFAULT_CONFIG: &str =
    include_str!("../../waf-policy-autopilot-policy-generation/resources/config/policy-variants.yaml");

const BAD_CONFIG: &str = r#"
resourceDefaults:
  alb:
    resourceType: AWS::ElasticLoadBalancingV2::LoadBalancer
    scope: REGIONAL
    defaultAction: ALLOW
tagKeys:
  primary: fms:waf-primary
  secondary: fms:waf-secondary
ruleSets:
  primary:
    edge:
      ruleGroups:
        - arn: arn:aws:wafv2:us-west-2:123456789012:regional/rulegroup/edge/1
          vendor: AWS
          name: AWSManagedRulesCommonRuleSet
  secondary:
    none: {}
defaults:
  primary: edge
  secondary: none
"#;

fn cli() -> Command {
    Command::cargo_bin(BIN).expect("binary should be built")
}

#[test]
fn help_lists_subcommands() {
    let out = Command::new(env!("CARGO_BIN_EXE_waf-policy-autopilot"))
        .arg("--help")
        .output()
        .expect("failed to run --help");
    let s = String::from_utf8_lossy(&out.stdout);
    for subcommand in ["render", "apply", "validate-config"] {
        assert!(s.contains(subcommand), "help should list {subcommand}: {s}");
    }
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn render_from_input_file_writes_policies() {
    let dir = TempDir::new().expect("tempdir");
    let input = dir.path().join("resources.json");
    fs::write(&input, RESOURCES).expect("write input");
    let output = dir.path().join("nested/out/policies.json");

    cli()
        .args(["render", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).expect("output written"))
            .expect("output is JSON");
    let policies = written.as_object().expect("JSON object");
    assert_eq!(policies.len(), 1, "unsupported resource types are skipped");

    let policy = &policies["auto-alb-demo-alb-abcd"];
    assert_eq!(policy["scope"], "REGIONAL");
    assert_eq!(
        policy["description"],
        "Auto-generated WAFv2 policy (primary=ou-shared-edge, secondary=ou-shared-bot)"
    );
    let data: serde_json::Value = serde_json::from_str(
        policy["managed_service_data"]
            .as_str()
            .expect("managed_service_data is a string"),
    )
    .expect("managed_service_data is JSON");
    assert_eq!(data["type"], "WAFV2");
}

#[test]
fn render_applies_environment_overrides_to_built_in_config() {
    let dir = TempDir::new().expect("tempdir");
    let input = dir.path().join("resources.json");
    fs::write(&input, RESOURCES).expect("write input");
    let output = dir.path().join("policies.json");

    // the demo ALB's primary tag no longer matches, so the fallback applies
    cli()
        .env("PRIMARY_TAG_KEY", "team")
        .env("DEFAULT_PRIMARY_RULES", "ou-shared-api")
        .args(["render", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).expect("output written"))
            .expect("output is JSON");
    assert_eq!(
        written["auto-alb-demo-alb-abcd"]["description"],
        "Auto-generated WAFv2 policy (primary=ou-shared-api, secondary=ou-shared-bot)"
    );
}

#[test]
fn render_with_empty_input_does_nothing() {
    let dir = TempDir::new().expect("tempdir");
    let input = dir.path().join("resources.json");
    fs::write(&input, "[]").expect("write input");
    let output = dir.path().join("policies.json");

    cli()
        .args(["render", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();
    assert!(!output.exists());
}

#[test]
fn render_with_missing_input_fails() {
    let dir = TempDir::new().expect("tempdir");

    cli()
        .args(["render", "--input"])
        .arg(dir.path().join("missing.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("read input resources"));
}

#[test]
fn validate_config_accepts_good_config() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("policy-variants.yaml");
    fs::write(&path, DEFAULT_CONFIG).expect("write config");

    cli()
        .arg("validate-config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"))
        .stdout(predicate::str::contains("primary tag fms:waf-primary"));
}

#[test]
fn validate_config_rejects_arn_with_vendor() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("bad.yaml");
    fs::write(&path, BAD_CONFIG).expect("write config");

    cli()
        .arg("validate-config")
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "ruleSets.primary[edge].ruleGroups[0]: specify either arn OR vendor/name, not both",
        ));
}

#[test]
fn unknown_subcommand_is_rejected() {
    cli().arg("frobnicate").assert().failure();
}
