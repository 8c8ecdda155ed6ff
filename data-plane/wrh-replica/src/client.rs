use crate::error::ControllerError;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;
use wrh_models::{
    CREDENTIAL_HEADER, ConfigVersion, ControllerSettings, ErrorBody,
    IDENTITY_HEADER,
};

/// Where the convergence engine gets its target versions from.
#[async_trait]
pub trait VersionSource: Send + Sync {
    async fn fetch_current_version(
        &self,
        group: &str,
    ) -> Result<ConfigVersion, ControllerError>;
}

/// HTTP client for the master's version query endpoint.
pub struct HttpControllerClient {
    client: reqwest::Client,
    base_url: String,
    identity: String,
    credential: String,
}

impl HttpControllerClient {
    pub fn new(
        settings: &ControllerSettings,
        timeout: Duration,
    ) -> Result<Self, ControllerError> {
        if settings.master_address.is_empty() {
            return Err(ControllerError::InvalidSettings(
                "master address cannot be empty".into(),
            ));
        }
        if settings.master_port == 0 {
            return Err(ControllerError::InvalidSettings(
                "master port must be greater than zero".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("wrh-replica/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ControllerError::InvalidSettings(e.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.base_url(),
            identity: settings.identity.clone(),
            credential: settings.credential.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl VersionSource for HttpControllerClient {
    async fn fetch_current_version(
        &self,
        group: &str,
    ) -> Result<ConfigVersion, ControllerError> {
        let url = format!("{}/api/v1/groups/{}/current", self.base_url, group);
        debug!(%url, "fetching current version");
        let response = self
            .client
            .get(&url)
            .header(IDENTITY_HEADER, &self.identity)
            .header(CREDENTIAL_HEADER, &self.credential)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return response.json::<ConfigVersion>().await.map_err(|e| {
                ControllerError::Transport(format!("invalid response body: {e}"))
            });
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => status.to_string(),
        };
        match status {
            StatusCode::NOT_FOUND => Err(ControllerError::NotFound(group.into())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ControllerError::Transport(format!(
                    "authentication rejected for `{}`: {}",
                    self.identity, message
                )))
            }
            _ => Err(ControllerError::Transport(format!(
                "master responded with {status}: {message}"
            ))),
        }
    }
}
