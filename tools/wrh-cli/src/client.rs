use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use wrh_models::{CREDENTIAL_HEADER, ErrorBody, IDENTITY_HEADER};

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("{code} ({status}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
}

/// Thin JSON client over the master's administration routes.
pub struct MasterClient {
    client: Client,
    base_url: String,
}

impl MasterClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .user_agent(concat!("wrh-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, group: &str, path: &str) -> String {
        format!("{}/api/v1/groups/{}{}", self.base_url, group, path)
    }

    pub fn get(&self, group: &str, path: &str) -> RequestBuilder {
        self.client.get(self.url(group, path))
    }

    pub fn post(&self, group: &str, path: &str) -> RequestBuilder {
        self.client.post(self.url(group, path))
    }

    pub fn delete(&self, group: &str, path: &str) -> RequestBuilder {
        self.client.delete(self.url(group, path))
    }

    pub fn with_credentials(
        request: RequestBuilder,
        identity: &str,
        credential: &str,
    ) -> RequestBuilder {
        request
            .header(IDENTITY_HEADER, identity)
            .header(CREDENTIAL_HEADER, credential)
    }

    pub async fn send<T: DeserializeOwned>(
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }
        let text = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => (body.error.code, body.error.message),
            Err(_) => ("HTTP_ERROR".to_string(), text),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }
}
