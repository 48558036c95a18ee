//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the feedback
//! board guard layer. All types derive Serde traits for deserialization from
//! config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Private data locations (outside any public web root).
    pub storage: StorageConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// CSRF token transport.
    pub csrf: CsrfConfig,

    /// Session cookie settings.
    pub session: SessionConfig,

    /// Outbound JSON fetch policy.
    pub fetch: FetchConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Private storage layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory holding `db/`, `storage/` and `data/`.
    pub private_base: PathBuf,
}

impl StorageConfig {
    /// Directory for the comment database.
    pub fn db_dir(&self) -> PathBuf {
        self.private_base.join("db")
    }

    /// Directory for rate limit bucket files.
    pub fn storage_dir(&self) -> PathBuf {
        self.private_base.join("storage")
    }

    /// Directory for operator-managed context files.
    pub fn data_dir(&self) -> PathBuf {
        self.private_base.join("data")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            private_base: PathBuf::from("/var/www/private"),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Action key mixed into every bucket key.
    pub action: String,

    /// Requests allowed per window per client.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Meter GET/HEAD/OPTIONS/TRACE as well as submissions. Page views count
    /// by default; set to false to meter only state-changing methods.
    pub limit_safe_methods: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            action: "comment".to_string(),
            max_requests: 30,
            window_secs: 60,
            limit_safe_methods: true,
        }
    }
}

/// CSRF token transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Urlencoded form field carrying the token.
    pub form_field: String,

    /// Header accepted as an alternative to the form field.
    pub header_name: String,

    /// Largest request body buffered while looking for the form field.
    pub max_body_bytes: usize,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            form_field: "csrf".to_string(),
            header_name: "x-csrf-token".to_string(),
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie holding the session id.
    pub cookie_name: String,

    /// Add the `Secure` attribute; enable whenever the site is served over HTTPS.
    pub secure_cookie: bool,

    /// Seconds without a request after which a stored session is dropped.
    pub idle_ttl_secs: u64,

    /// Most sessions held at once; the least recently seen is evicted beyond it.
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "feedback_sid".to_string(),
            secure_cookie: false,
            idle_ttl_secs: 1440,
            max_sessions: 10_000,
        }
    }
}

/// Outbound fetch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Hosts that may be contacted (exact, case-sensitive).
    pub allowlist: Vec<String>,

    /// Hard timeout for the whole request in seconds.
    pub timeout_secs: u64,

    /// User-Agent sent with every request.
    pub user_agent: String,

    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` from the environment.
    pub use_system_proxy: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            allowlist: Vec::new(),
            timeout_secs: 3,
            user_agent: "secure-feedback".to_string(),
            use_system_proxy: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
