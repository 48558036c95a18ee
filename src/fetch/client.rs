//! Outbound JSON client restricted to the allowlist.
//!
//! # Responsibilities
//! - Refuse any target whose host is not allowlisted, before any I/O
//! - Perform exactly one GET with a hard timeout
//! - Parse the body as a JSON object or array
//!
//! # Design Decisions
//! - Redirects are never followed; a 3xx is a transport failure
//! - TLS certificate and hostname verification stay at reqwest defaults (on)
//! - No retries; callers decide how to degrade

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::redirect::Policy;
use serde_json::Value;

use crate::config::FetchConfig;
use crate::fetch::allowlist::{check_policy, Allowlist};
use crate::fetch::FetchError;
use crate::observability::metrics;

/// JSON fetcher bound to one immutable allowlist.
#[derive(Debug, Clone)]
pub struct AllowlistedFetcher {
    client: reqwest::Client,
    allowlist: Allowlist,
    timeout: Duration,
}

impl AllowlistedFetcher {
    /// Build a fetcher from configuration.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let allowlist: Allowlist = config.allowlist.iter().collect();
        let timeout = Duration::from_secs(config.timeout_secs);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers);
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::Transport(format!("client setup failed: {e}")))?;

        tracing::info!(
            allowlist_len = allowlist.len(),
            timeout_secs = config.timeout_secs,
            "Allowlisted fetcher initialized"
        );

        Ok(Self {
            client,
            allowlist,
            timeout,
        })
    }

    pub fn allowlist(&self) -> &Allowlist {
        &self.allowlist
    }

    /// Fetch `url` and parse the response body as JSON.
    pub async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        let result = self.fetch_inner(url).await;
        metrics::record_fetch(match &result {
            Ok(_) => "ok",
            Err(FetchError::BlockedByPolicy { .. }) => "blocked",
            Err(FetchError::Transport(_)) => "transport_error",
            Err(FetchError::InvalidResponse(_)) => "invalid_response",
        });
        result
    }

    async fn fetch_inner(&self, url: &str) -> Result<Value, FetchError> {
        let target = match check_policy(url, &self.allowlist) {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(error = %e, "Outbound request blocked");
                return Err(e);
            }
        };
        let host = target.host_str().unwrap_or_default().to_string();

        let response = self.client.get(target).send().await.map_err(|e| {
            let reason = if e.is_timeout() {
                format!("timed out after {:?}", self.timeout)
            } else {
                e.to_string()
            };
            tracing::warn!(host = %host, error = %reason, "Outbound request failed");
            FetchError::Transport(reason)
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(host = %host, status = %status, "Outbound request rejected by upstream");
            return Err(FetchError::Transport(format!("upstream returned {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(format!("reading body failed: {e}")))?;

        let value: Value = serde_json::from_slice(&body)
            .map_err(|e| FetchError::InvalidResponse(format!("body is not JSON: {e}")))?;
        if !(value.is_object() || value.is_array()) {
            return Err(FetchError::InvalidResponse(
                "expected a JSON object or array".to_string(),
            ));
        }

        tracing::debug!(host = %host, bytes = body.len(), "Outbound request succeeded");
        Ok(value)
    }
}
