//! HTTP client for the secret store API
//!
//! Used by `secret server ping` and by anything that wants to talk to a
//! running server without hand-building requests.

use anyhow::{bail, Context, Result};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::api::handlers::{SetByKeyRequest, ValueResponse, CIPHER_HEADER};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the server (e.g., "http://localhost:8888")
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { base_url: "http://localhost:8888".to_string(), timeout: 20 }
    }
}

#[derive(Debug, Clone)]
pub struct SecretClient {
    client: Client,
    base_url: String,
}

impl SecretClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::with_client(client, config.base_url))
    }

    /// Use a preconfigured reqwest client
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the plaintext value stored under `key`
    pub async fn get_by_key(&self, key: &str, method: &str, cipher: &str) -> Result<String> {
        let url = format!("{}/", self.base_url);
        debug!(%url, method, "GET secret");

        let response = self
            .client
            .get(&url)
            .query(&[("key", key), ("method", method)])
            .header(CIPHER_HEADER, cipher)
            .send()
            .await
            .context("Failed to send GET request")?;

        let response = expect_status(response, StatusCode::OK).await?;
        let body: ValueResponse =
            response.json().await.context("Failed to parse response body")?;
        Ok(body.value)
    }

    /// Store `value` under `getter`; an empty value deletes the secret
    pub async fn set_by_key(
        &self,
        getter: &str,
        value: &str,
        method: &str,
        cipher: &str,
    ) -> Result<()> {
        let url = format!("{}/", self.base_url);
        debug!(%url, method, "POST secret");

        let request = SetByKeyRequest {
            getter: getter.to_string(),
            method: method.to_string(),
            value: value.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .header(CIPHER_HEADER, cipher)
            .json(&request)
            .send()
            .await
            .context("Failed to send POST request")?;

        expect_status(response, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    /// Request a health route, e.g. `/ping`
    pub async fn ping(&self, route: &str) -> Result<()> {
        let url = if route.starts_with('/') {
            format!("{}{}", self.base_url, route)
        } else {
            format!("{}/{}", self.base_url, route)
        };
        debug!(%url, "Pinging server");

        let response =
            self.client.get(&url).send().await.with_context(|| format!("Failed to reach {}", url))?;
        expect_status(response, StatusCode::OK).await?;
        Ok(())
    }
}

async fn expect_status(response: Response, expected: StatusCode) -> Result<Response> {
    let status = response.status();
    if status == expected {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_else(|_| "<unable to read body>".to_string());
    bail!("unexpected status code {}: {}", status.as_u16(), body.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, 20);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = SecretClient::with_client(Client::new(), "http://localhost:8888/");
        assert_eq!(client.base_url(), "http://localhost:8888");
    }

    #[tokio::test]
    async fn test_ping_unreachable_server_fails() {
        let client = SecretClient::new(ClientConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout: 2,
        })
        .unwrap();

        assert!(client.ping("/ping").await.is_err());
    }
}
