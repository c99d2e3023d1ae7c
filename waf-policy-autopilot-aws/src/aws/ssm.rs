//! Rule tables stored in SSM Parameter Store

use async_trait::async_trait;
use aws_sdk_ssm::error::DisplayErrorContext;
use aws_sdk_ssm::Client as SsmClient;
use log::info;

use crate::aws::{AwsError, AwsResult};

#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Decrypted value of a parameter, `None` if the parameter has no value
    async fn get_parameter(&self, name: &str) -> AwsResult<Option<String>>;
}

pub struct AwsParameterStore {
    client: SsmClient,
}

impl AwsParameterStore {
    pub fn new(client: SsmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ParameterStore for AwsParameterStore {
    async fn get_parameter(&self, name: &str) -> AwsResult<Option<String>> {
        let output = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| {
                AwsError::SsmError(format!(
                    "Failed to get parameter {name}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(output
            .parameter()
            .and_then(|parameter| parameter.value())
            .map(str::to_string))
    }
}

/// Fetch the raw YAML rule table stored under `name`.
pub async fn fetch_config_yaml(store: &dyn ParameterStore, name: &str) -> AwsResult<String> {
    info!("Loading config from SSM parameter {}", name);
    store
        .get_parameter(name)
        .await?
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AwsError::SsmError(format!("parameter {name} has no value")))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeStore(Option<&'static str>);

    #[async_trait]
    impl ParameterStore for FakeStore {
        async fn get_parameter(&self, name: &str) -> AwsResult<Option<String>> {
            assert_eq!(name, "/waf/policy-config");
            Ok(self.0.map(str::to_string))
        }
    }

    #[tokio::test]
    async fn test_fetch_config_yaml_returns_value() {
        let store = FakeStore(Some("resourceDefaults: {}"));
        let yaml = fetch_config_yaml(&store, "/waf/policy-config")
            .await
            .expect("value");
        assert_eq!(yaml, "resourceDefaults: {}");
    }

    #[tokio::test]
    async fn test_fetch_config_yaml_missing_value() {
        for store in [FakeStore(None), FakeStore(Some(""))] {
            let err = fetch_config_yaml(&store, "/waf/policy-config")
                .await
                .expect_err("should fail");
            assert!(matches!(
                err,
                AwsError::SsmError(ref msg) if msg.contains("has no value")
            ));
        }
    }
}
