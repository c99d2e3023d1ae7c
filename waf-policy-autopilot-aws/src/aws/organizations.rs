//! Organizational unit membership checks

use async_trait::async_trait;
use aws_sdk_organizations::error::DisplayErrorContext;
use aws_sdk_organizations::Client as OrganizationsClient;
use aws_sdk_sts::Client as StsClient;
use log::{debug, warn};

use crate::aws::{AwsError, AwsResult};

/// One page of `ListAccountsForParent`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountPage {
    pub account_ids: Vec<String>,
    pub next_token: Option<String>,
}

/// Caller identity and organization lookups
#[async_trait]
pub trait OrganizationDirectory: Send + Sync {
    /// Account id of the credentials in use
    async fn caller_account_id(&self) -> AwsResult<String>;

    async fn list_accounts_for_parent(
        &self,
        parent_id: &str,
        next_token: Option<String>,
    ) -> AwsResult<AccountPage>;
}

/// [`OrganizationDirectory`] backed by STS and Organizations
pub struct AwsOrganizationDirectory {
    organizations: OrganizationsClient,
    sts: StsClient,
}

impl AwsOrganizationDirectory {
    pub fn new(organizations: OrganizationsClient, sts: StsClient) -> Self {
        Self { organizations, sts }
    }
}

#[async_trait]
impl OrganizationDirectory for AwsOrganizationDirectory {
    async fn caller_account_id(&self) -> AwsResult<String> {
        let identity = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| {
                AwsError::StsError(format!(
                    "Failed to get caller identity: {}",
                    aws_sdk_sts::error::DisplayErrorContext(&e)
                ))
            })?;

        identity
            .account()
            .filter(|account| !account.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AwsError::StsError("caller identity has no account id".to_string()))
    }

    async fn list_accounts_for_parent(
        &self,
        parent_id: &str,
        next_token: Option<String>,
    ) -> AwsResult<AccountPage> {
        let output = self
            .organizations
            .list_accounts_for_parent()
            .parent_id(parent_id)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| {
                AwsError::OrganizationsError(format!(
                    "Failed to list accounts for parent {parent_id}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(AccountPage {
            account_ids: output
                .accounts()
                .iter()
                .filter_map(|account| account.id().map(str::to_string))
                .collect(),
            next_token: output.next_token().map(str::to_string),
        })
    }
}

/// Whether the caller's account is a direct child of `ou_id`.
///
/// An absent or empty OU means no restriction and makes no API calls.
pub async fn account_in_ou(
    directory: &dyn OrganizationDirectory,
    ou_id: Option<&str>,
) -> AwsResult<bool> {
    let Some(ou_id) = ou_id.filter(|ou| !ou.is_empty()) else {
        return Ok(true);
    };

    let account_id = directory.caller_account_id().await?;
    let mut next_token = None;

    loop {
        let page = directory
            .list_accounts_for_parent(ou_id, next_token.take())
            .await?;
        if page.account_ids.iter().any(|id| id == &account_id) {
            debug!("Account {} is in OU {}", account_id, ou_id);
            return Ok(true);
        }
        match page.next_token.filter(|t| !t.is_empty()) {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    warn!("Account {} not found in OU {}", account_id, ou_id);
    Ok(false)
}
