//! HTTP plumbing shared by the page-fetch and extraction clients.

use crate::error::{Error, Result};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Crate version, reported in the User-Agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 3;
const MAX_BACKOFF_SECS: u64 = 30;

/// Build the User-Agent string for outgoing requests.
pub fn build_user_agent(suffix: Option<&str>) -> String {
    let mut ua = format!(
        "genai-scraper/{} ({}; {})",
        VERSION,
        std::env::consts::OS,
        std::env::consts::ARCH
    );

    if let Some(s) = suffix {
        ua.push(' ');
        ua.push_str(s);
    }

    ua
}

/// Builder for constructing a [`Transport`].
pub struct TransportBuilder {
    api_key: String,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    user_agent_suffix: Option<String>,
}

impl TransportBuilder {
    /// Create a new builder with the given API key and base URL.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            user_agent_suffix: None,
        }
    }

    /// Set the service base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum retry attempts.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set a custom User-Agent suffix.
    pub fn user_agent_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.user_agent_suffix = Some(suffix.into());
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<Transport> {
        if self.api_key.is_empty() {
            return Err(Error::Config("API key is required".into()));
        }

        if !self.base_url.starts_with("https://") {
            warn!(
                base_url = %self.base_url,
                "Service base URL is not using HTTPS. This is insecure."
            );
        }

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| Error::Config("API key contains invalid characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let user_agent = build_user_agent(self.user_agent_suffix.as_deref());
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&user_agent)
                .map_err(|_| Error::Config("User-Agent contains invalid characters".into()))?,
        );

        let http_client = reqwest::Client::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .build()
            .map_err(Error::Http)?;

        Ok(Transport {
            base_url: self.base_url,
            http_client,
            max_retries: self.max_retries,
        })
    }
}

/// Authenticated JSON-over-HTTP client for one service.
#[derive(Clone)]
pub struct Transport {
    base_url: String,
    http_client: reqwest::Client,
    max_retries: u32,
}

impl Transport {
    /// Create a new transport builder.
    pub fn builder(api_key: impl Into<String>, base_url: impl Into<String>) -> TransportBuilder {
        TransportBuilder::new(api_key, base_url)
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body and decode the JSON response.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self.execute_with_retry(&url, body).await?;

        if !response.status().is_success() {
            return Err(Error::from_response(response).await);
        }

        let value: serde_json::Value = response.json().await.map_err(Error::Http)?;
        serde_json::from_value(value).map_err(Error::Json)
    }

    async fn execute_with_retry<B: serde::Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let mut attempt = 1;
        loop {
            debug!(url, attempt, "Sending request");
            let response = match self.http_client.post(url).json(body).send().await {
                Ok(r) => r,
                Err(e) => {
                    if e.is_timeout() {
                        return Err(Error::Timeout);
                    }
                    if attempt <= self.max_retries {
                        let backoff = backoff(attempt);
                        warn!(
                            error = %e,
                            attempt = attempt,
                            max_retries = self.max_retries,
                            "Network error. Retrying in {:?}",
                            backoff
                        );
                        sleep(backoff).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(Error::Http(e));
                }
            };

            let status = response.status();

            if status.as_u16() == 429 && attempt <= self.max_retries {
                let retry_after: u64 = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1);
                warn!(
                    retry_after = retry_after,
                    attempt = attempt,
                    max_retries = self.max_retries,
                    "Rate limited. Retrying"
                );
                sleep(Duration::from_secs(retry_after.min(MAX_BACKOFF_SECS))).await;
                attempt += 1;
                continue;
            }

            if status.is_server_error() && attempt <= self.max_retries {
                let backoff = backoff(attempt);
                warn!(
                    status = %status,
                    attempt = attempt,
                    max_retries = self.max_retries,
                    "Server error. Retrying in {:?}",
                    backoff
                );
                sleep(backoff).await;
                attempt += 1;
                continue;
            }

            return Ok(response);
        }
    }
}

/// Exponential backoff with up to 250ms of jitter.
fn backoff(attempt: u32) -> Duration {
    let base = Duration::from_secs(2u64.pow(attempt.saturating_sub(1)).min(MAX_BACKOFF_SECS));
    let jitter = Duration::from_millis(rand::rng().random_range(0..250));
    base + jitter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_user_agent() {
        let ua = build_user_agent(None);
        assert!(ua.starts_with("genai-scraper/"));
        assert!(ua.contains(VERSION));

        let ua_with_suffix = build_user_agent(Some("MyApp/1.0"));
        assert!(ua_with_suffix.ends_with(" MyApp/1.0"));
    }

    #[test]
    fn test_builder_requires_api_key() {
        let err = Transport::builder("", "https://api.example.com").build();
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_trims_base_url() {
        let transport = Transport::builder("key", "https://api.example.com/")
            .build()
            .unwrap();
        assert_eq!(transport.base_url(), "https://api.example.com");

        let transport = Transport::builder("key", "https://a.example.com")
            .base_url("http://localhost:8080//")
            .build()
            .unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        assert!(backoff(1) < Duration::from_secs(2));
        assert!(backoff(3) >= Duration::from_secs(4));
        assert!(backoff(20) < Duration::from_secs(MAX_BACKOFF_SECS + 1));
    }
}
