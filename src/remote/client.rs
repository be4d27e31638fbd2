use super::{ProxiedMessage, RemoteError, RemoteLookup};
use crate::config::LookupConfig;
use reqwest::StatusCode;
use std::time::Duration;

/// HTTP client for the remote message lookup endpoint.
#[derive(Clone)]
pub struct PluralKitClient {
    http: reqwest::Client,
    base_url: String,
}

impl PluralKitClient {
    pub fn new(config: &LookupConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(RemoteError::Http)?;

        Ok(Self {
            http: client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn message(&self, message_id: &str) -> Result<ProxiedMessage, RemoteError> {
        let url = format!("{}/v2/messages/{}", self.base_url, message_id);
        log::debug!("remote: GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(RemoteError::Http)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound(message_id.to_string()));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RemoteError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::status(status, body));
        }

        let body = response.bytes().await.map_err(RemoteError::Http)?;
        let parsed: ProxiedMessage = serde_json::from_slice(&body)?;
        Ok(parsed)
    }
}

impl RemoteLookup for PluralKitClient {
    async fn fetch_message(&self, message_id: &str) -> Result<ProxiedMessage, RemoteError> {
        self.message(message_id).await
    }
}
