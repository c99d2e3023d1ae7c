//! Application Load Balancer discovery

use async_trait::async_trait;
use aws_sdk_elasticloadbalancingv2::error::DisplayErrorContext;
use aws_sdk_elasticloadbalancingv2::types::LoadBalancerTypeEnum;
use aws_sdk_elasticloadbalancingv2::Client as ElbClient;
use log::{debug, warn};
use waf_policy_autopilot_policy_generation::Resource;

use crate::aws::{AwsError, AwsResult};

/// Maximum number of ARNs `DescribeTags` accepts per call
pub const DESCRIBE_TAGS_BATCH_SIZE: usize = 20;

/// One page of `DescribeLoadBalancers`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadBalancerPage {
    pub load_balancers: Vec<LoadBalancerSummary>,
    pub next_marker: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancerSummary {
    pub arn: Option<String>,
    pub is_application: bool,
}

/// Tags of a single load balancer; a missing key or value is kept as `None`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancerTags {
    pub resource_arn: Option<String>,
    pub tags: Vec<(Option<String>, Option<String>)>,
}

/// Read access to Elastic Load Balancing v2
#[async_trait]
pub trait LoadBalancerSource: Send + Sync {
    async fn describe_load_balancers(&self, marker: Option<String>) -> AwsResult<LoadBalancerPage>;

    async fn describe_tags(&self, resource_arns: Vec<String>) -> AwsResult<Vec<LoadBalancerTags>>;
}

/// [`LoadBalancerSource`] backed by the AWS SDK
pub struct AwsLoadBalancerSource {
    client: ElbClient,
}

impl AwsLoadBalancerSource {
    pub fn new(client: ElbClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LoadBalancerSource for AwsLoadBalancerSource {
    async fn describe_load_balancers(
        &self,
        marker: Option<String>,
    ) -> AwsResult<LoadBalancerPage> {
        let output = self
            .client
            .describe_load_balancers()
            .set_marker(marker)
            .send()
            .await
            .map_err(|e| {
                AwsError::ElbError(format!(
                    "Failed to describe load balancers: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        let load_balancers = output
            .load_balancers()
            .iter()
            .map(|lb| LoadBalancerSummary {
                arn: lb.load_balancer_arn().map(str::to_string),
                is_application: lb.r#type() == Some(&LoadBalancerTypeEnum::Application),
            })
            .collect();

        Ok(LoadBalancerPage {
            load_balancers,
            next_marker: output.next_marker().map(str::to_string),
        })
    }

    async fn describe_tags(
        &self,
        resource_arns: Vec<String>,
    ) -> AwsResult<Vec<LoadBalancerTags>> {
        let output = self
            .client
            .describe_tags()
            .set_resource_arns(Some(resource_arns))
            .send()
            .await
            .map_err(|e| {
                AwsError::ElbError(format!(
                    "Failed to describe tags: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(output
            .tag_descriptions()
            .iter()
            .map(|description| LoadBalancerTags {
                resource_arn: description.resource_arn().map(str::to_string),
                tags: description
                    .tags()
                    .iter()
                    .map(|tag| {
                        (
                            tag.key().map(str::to_string),
                            tag.value().map(str::to_string),
                        )
                    })
                    .collect(),
            })
            .collect())
    }
}

/// Discover application load balancers and their tags.
///
/// Network and gateway load balancers are ignored, as are tags missing a key or value.
pub async fn discover_albs(source: &dyn LoadBalancerSource) -> AwsResult<Vec<Resource>> {
    let mut resources = Vec::new();
    let mut marker: Option<String> = None;

    loop {
        let first_page = marker.is_none();
        let page = source.describe_load_balancers(marker.take()).await?;
        if first_page && page.load_balancers.is_empty() {
            warn!("No load balancers found in this region");
        }

        let alb_arns: Vec<String> = page
            .load_balancers
            .into_iter()
            .filter(|lb| lb.is_application)
            .filter_map(|lb| lb.arn)
            .collect();

        for batch in alb_arns.chunks(DESCRIBE_TAGS_BATCH_SIZE) {
            for description in source.describe_tags(batch.to_vec()).await? {
                let Some(arn) = description.resource_arn else {
                    continue;
                };
                let tags = description
                    .tags
                    .into_iter()
                    .filter_map(|(key, value)| Some((key?, value?)))
                    .collect();
                debug!("Discovered ALB {}", arn);
                resources.push(Resource::alb(arn, tags));
            }
        }

        match page.next_marker.filter(|m| !m.is_empty()) {
            Some(next) => marker = Some(next),
            None => break,
        }
    }

    Ok(resources)
}
