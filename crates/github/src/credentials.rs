use std::{future::Future, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use checkbot_core::{config::GitHubConfig, models::InstallationId};
use octocrab::{
    DefaultOctocrabBuilderConfig, NoAuth, NoSvc, NotLayerReady, Octocrab, OctocrabBuilder,
    service::middleware::retry::RetryConfig,
};

use crate::{GitHubClient, PlatformClient};

/// Exchanges the app identity for a client scoped to one installation.
pub trait CredentialProvider: Send + Sync + 'static {
    type Client: PlatformClient;

    /// Produces a fresh client for `installation_id`. Clients are never cached or
    /// shared between installations.
    fn obtain(
        &self,
        installation_id: InstallationId,
    ) -> impl Future<Output = Result<Self::Client>> + Send;
}

type ClientBuilder = OctocrabBuilder<NoSvc, DefaultOctocrabBuilderConfig, NoAuth, NotLayerReady>;

/// Every outbound call is attempted exactly once; failures go straight to the caller.
fn client_builder(timeout: Duration) -> ClientBuilder {
    Octocrab::builder()
        .add_retry_config(RetryConfig::None)
        .set_connect_timeout(Some(timeout))
        .set_read_timeout(Some(timeout))
        .set_write_timeout(Some(timeout))
}

pub struct AppCredentials {
    config: Arc<GitHubConfig>,
}

impl AppCredentials {
    pub fn new(config: Arc<GitHubConfig>) -> Self { Self { config } }
}

impl CredentialProvider for AppCredentials {
    type Client = GitHubClient;

    async fn obtain(&self, installation_id: InstallationId) -> Result<GitHubClient> {
        let pem = tokio::fs::read(&self.config.private_key_path).await.with_context(|| {
            format!("Failed to read private key {}", self.config.private_key_path.display())
        })?;
        let key = jsonwebtoken::EncodingKey::from_rsa_pem(&pem)
            .context("Failed to parse private key")?;
        let app_client = client_builder(self.config.request_timeout())
            .app(self.config.app_id.into(), key)
            .build()
            .context("Failed to create GitHub client")?;
        // Exchange eagerly so a rejected installation fails here rather than on first use.
        let (client, _token) = app_client
            .installation_and_token(installation_id.0.into())
            .await
            .with_context(|| format!("Failed to obtain token for installation {installation_id}"))?;
        tracing::debug!("Obtained client for installation {}", installation_id);
        Ok(GitHubClient { client })
    }
}
