//! AWS SDK integration: ALB discovery, OU membership, FMS policies, SSM parameters.
//!
//! Each AWS dependency sits behind a small async trait so the orchestration
//! logic can be exercised without credentials.

pub(crate) mod discovery;
pub(crate) mod fms_client;
pub(crate) mod organizations;
pub(crate) mod ssm;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("AWS configuration error: {0}")]
    ConfigError(String),
    #[error("Load balancer discovery error: {0}")]
    ElbError(String),
    #[error("Organizations error: {0}")]
    OrganizationsError(String),
    #[error("STS error: {0}")]
    StsError(String),
    #[error("Firewall Manager error: {0}")]
    FmsError(String),
    #[error("SSM error: {0}")]
    SsmError(String),
}

pub type AwsResult<T> = Result<T, AwsError>;

/// Load the shared AWS config, optionally pinning a region.
pub async fn load_sdk_config(region: Option<&str>) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = region.filter(|r| !r.is_empty()) {
        loader = loader.region(aws_config::Region::new(region.to_string()));
    }
    loader.load().await
}
