use async_trait::async_trait;
use neuramail_client::{BackendClient, ClientError};
use neuramail_core::{FetchOutcome, ProfileLookup};

/// The three backend calls a cycle makes, abstracted so the loop can be
/// driven against fakes in tests.
#[async_trait]
pub trait AutomationBackend: Send + Sync {
    async fn check_profile(&self) -> Result<ProfileLookup, ClientError>;
    async fn fetch_emails(&self) -> Result<FetchOutcome, ClientError>;
    async fn send_automated_reply(&self) -> Result<(), ClientError>;
}

#[async_trait]
impl AutomationBackend for BackendClient {
    async fn check_profile(&self) -> Result<ProfileLookup, ClientError> {
        BackendClient::check_profile(self).await
    }

    /// The loop never filters by keyword; that is a manual-search feature.
    async fn fetch_emails(&self) -> Result<FetchOutcome, ClientError> {
        BackendClient::fetch_emails(self, None).await
    }

    async fn send_automated_reply(&self) -> Result<(), ClientError> {
        BackendClient::send_automated_reply(self).await
    }
}
