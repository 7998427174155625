//! Request dispatcher for the local model proxy
//!
//! All model traffic goes through a proxy listening on a fixed local
//! address; the proxy forwards the prompt to the configured Ollama
//! endpoint. The address is part of the contract with the proxy and is
//! deliberately absent from settings and configuration.

use crate::error::{Result, SidekickError};
use crate::settings::Settings;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Address the local proxy listens on
pub const PROXY_URL: &str = "http://localhost:8765";

/// Time allowed for one proxy round trip
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Something that turns a prompt into a model answer
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `prompt` using the endpoint and model from `settings`
    ///
    /// # Errors
    ///
    /// Fails with `SidekickError::Timeout`, `SidekickError::HttpStatus`,
    /// `SidekickError::Proxy` or `SidekickError::Network`.
    async fn complete(&self, prompt: &str, settings: &Settings) -> Result<String>;
}

/// Body posted to the proxy
#[derive(Debug, Serialize)]
struct ProxyRequest<'a> {
    endpoint: &'a str,
    model: &'a str,
    prompt: &'a str,
}

/// Body returned by the proxy
#[derive(Debug, Deserialize)]
struct ProxyResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

/// HTTP client for the local proxy
///
/// # Examples
///
/// ```
/// use sidekick::proxy::{ProxyClient, PROXY_URL, REQUEST_TIMEOUT};
///
/// let client = ProxyClient::new().unwrap();
/// assert_eq!(client.url(), PROXY_URL);
/// assert_eq!(client.timeout(), REQUEST_TIMEOUT);
/// ```
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: Client,
    url: String,
    timeout: Duration,
}

impl ProxyClient {
    /// Client for the proxy at [`PROXY_URL`] with the [`REQUEST_TIMEOUT`]
    pub fn new() -> Result<Self> {
        Self::with_url(PROXY_URL)
    }

    /// Client for a proxy at another address
    ///
    /// Used to point tests at a mock server.
    pub fn with_url(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("sidekick/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SidekickError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            timeout: REQUEST_TIMEOUT,
        })
    }

    /// Replace the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Proxy address
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn send(&self, body: &ProxyRequest<'_>) -> Result<String> {
        let response = self
            .client
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Proxy request failed: {}", e);
                SidekickError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("Proxy returned status {}", status);
            return Err(SidekickError::HttpStatus(status.as_u16()).into());
        }

        let data: ProxyResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse proxy response: {}", e);
            SidekickError::Network(format!("Failed to parse proxy response: {}", e))
        })?;

        if let Some(message) = data.error {
            if let Some(details) = data.details {
                tracing::error!("Error details: {}", details);
            }
            return Err(SidekickError::Proxy { message }.into());
        }

        match data.response {
            Some(answer) => {
                tracing::debug!("Proxy answered with {} characters", answer.len());
                Ok(answer)
            }
            None => Err(SidekickError::Proxy {
                message: "Unexpected response format from proxy".to_string(),
            }
            .into()),
        }
    }
}

#[async_trait]
impl CompletionClient for ProxyClient {
    async fn complete(&self, prompt: &str, settings: &Settings) -> Result<String> {
        let body = ProxyRequest {
            endpoint: &settings.endpoint,
            model: &settings.model,
            prompt,
        };

        tracing::info!(
            "Sending request to proxy: endpoint={}, model={}, prompt_chars={}",
            settings.endpoint,
            settings.model,
            prompt.chars().count()
        );

        match tokio::time::timeout(self.timeout, self.send(&body)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!("Proxy request timed out after {:?}", self.timeout);
                Err(SidekickError::Timeout {
                    seconds: self.timeout.as_secs(),
                }
                .into())
            }
        }
    }
}
