//! `reqwest` client for the Firecrawl API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::api::{Endpoint, FirecrawlApi};
use crate::config::FirecrawlConfig;
use crate::error::{ApiError, ConfigError};
use crate::util::truncate_body;

/// Error bodies longer than this are cut before they reach logs or users.
const MAX_ERROR_BODY: usize = 2048;

/// Authenticated Firecrawl API client.
pub struct FirecrawlClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl FirecrawlClient {
    /// Create a client from resolved configuration.
    ///
    /// Fails when no API key is configured.
    pub fn new(config: &FirecrawlConfig) -> Result<Self, ConfigError> {
        let api_key = SecretString::from(config.api_key()?.to_string());
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "http_client".to_string(),
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Absolute URL for an endpoint.
    pub fn url_for(&self, endpoint: &Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }
}

impl std::fmt::Debug for FirecrawlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirecrawlClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Parse a `Retry-After` header given in whole seconds.
fn parse_retry_after(value: Option<&reqwest::header::HeaderValue>) -> Option<Duration> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl FirecrawlApi for FirecrawlClient {
    async fn call(&self, endpoint: &Endpoint, body: Option<&Value>) -> Result<Value, ApiError> {
        let label = endpoint.to_string();
        let mut request = self
            .client
            .request(endpoint.method(), self.url_for(endpoint))
            .bearer_auth(self.api_key.expose_secret())
            .header(ACCEPT, "application/json");
        if endpoint.has_body() {
            request = request.json(body.unwrap_or(&Value::Object(Default::default())));
        }

        tracing::debug!(endpoint = %label, "Sending Firecrawl request");

        let response = request.send().await.map_err(|e| ApiError::Request {
            endpoint: label.clone(),
            reason: if e.is_timeout() {
                "request timed out".to_string()
            } else {
                e.to_string()
            },
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited {
                retry_after: parse_retry_after(response.headers().get(RETRY_AFTER)),
                endpoint: label,
            });
        }

        let text = response.text().await.map_err(|e| ApiError::Request {
            endpoint: label.clone(),
            reason: format!("failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: label,
                status: status.as_u16(),
                body: truncate_body(&text, MAX_ERROR_BODY),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse {
            endpoint: label,
            reason: format!("body is not JSON: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use reqwest::header::HeaderValue;

    fn config(base_url: &str) -> FirecrawlConfig {
        FirecrawlConfig {
            api_key: Some(SecretString::from("fc-test".to_string())),
            base_url: base_url.to_string(),
            request_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn requires_api_key() {
        let err = FirecrawlClient::new(&FirecrawlConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { .. }));
    }

    #[test]
    fn url_for_joins_base_and_path() {
        let client = FirecrawlClient::new(&config("https://api.firecrawl.dev/v2/")).unwrap();
        assert_eq!(
            client.url_for(&Endpoint::AgentStatus("J1".into())),
            "https://api.firecrawl.dev/v2/agent/J1"
        );
    }

    #[test]
    fn debug_hides_api_key() {
        let client = FirecrawlClient::new(&config("https://api.firecrawl.dev/v2")).unwrap();
        assert!(!format!("{client:?}").contains("fc-test"));
    }

    #[test]
    fn retry_after_seconds() {
        let value = HeaderValue::from_static("7");
        assert_eq!(parse_retry_after(Some(&value)), Some(Duration::from_secs(7)));
        let date = HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(parse_retry_after(Some(&date)), None);
        assert_eq!(parse_retry_after(None), None);
    }
}
