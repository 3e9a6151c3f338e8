//! JSON-over-HTTP with retry and backoff, shared by every remote service.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Every failure is reported as [`RetrievalError::ServiceUnavailable`]
//! naming the service.

use std::time::Duration;

use rag_harness_core::{Result, RetrievalError};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};

/// A named remote service with its client and retry budget.
pub struct Service {
    name: String,
    client: Client,
    max_retries: u32,
}

impl Service {
    pub fn new(name: impl Into<String>, timeout_secs: u64, max_retries: u32) -> Result<Self> {
        let name = name.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RetrievalError::unavailable(&name, e))?;
        Ok(Self {
            name,
            client,
            max_retries,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// POST `body` as JSON, returning the parsed JSON response.
    pub async fn post_json(&self, url: &str, bearer: Option<&str>, body: &Value) -> Result<Value> {
        self.send_with_retry(|client| {
            let req = client.post(url).json(body);
            match bearer {
                Some(key) => req.bearer_auth(key),
                None => req,
            }
        })
        .await
    }

    /// GET `url` with `query` parameters, returning the parsed JSON response.
    pub async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        self.send_with_retry(|client| client.get(url).query(query)).await
    }

    async fn send_with_retry<F>(&self, build: F) -> Result<Value>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                warn!(service = %self.name, attempt, ?delay, "retrying");
                tokio::time::sleep(delay).await;
            }

            match build(&self.client).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        debug!(service = %self.name, %status, "response");
                        return response
                            .json::<Value>()
                            .await
                            .map_err(|e| self.unavailable(format!("invalid JSON response: {}", e)));
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err = self.unavailable(format!("API error {}: {}", status, body_text));

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    last_err = Some(self.unavailable(format!("connection error: {}", e)));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| self.unavailable("request failed after retries")))
    }

    pub fn unavailable(&self, reason: impl std::fmt::Display) -> RetrievalError {
        RetrievalError::unavailable(&self.name, reason)
    }
}

/// Join a base URL and a path without doubling the slash.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
