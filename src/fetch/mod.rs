//! Allowlisted outbound JSON fetching.
//!
//! # Data Flow
//! ```text
//! domain logic (page enrichment, off the validation path)
//!     → allowlist.rs (parse URL, exact host match, no I/O on failure)
//!     → client.rs (single GET, 3s timeout, no redirects, verified TLS)
//!     → serde_json::Value or FetchError
//! ```
//!
//! Every `FetchError` is recoverable: callers show `note()` instead of
//! failing the page.

pub mod allowlist;
pub mod client;

use thiserror::Error;

pub use allowlist::{check_policy, Allowlist};
pub use client::AllowlistedFetcher;

/// Errors that can occur during an outbound fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Target host missing or not allowlisted. No request was made.
    #[error("Blocked by API allowlist (host {host:?})")]
    BlockedByPolicy { host: String },

    /// Network, TLS, timeout or non-success HTTP status.
    #[error("API request failed: {0}")]
    Transport(String),

    /// Body was not a JSON object or array.
    #[error("Invalid JSON from API: {0}")]
    InvalidResponse(String),
}

impl FetchError {
    /// Short message safe to show to end users.
    pub fn note(&self) -> &'static str {
        match self {
            FetchError::BlockedByPolicy { .. } => "External data is unavailable for this source.",
            FetchError::Transport(_) => "External data could not be loaded right now.",
            FetchError::InvalidResponse(_) => "External data was not in the expected format.",
        }
    }
}
