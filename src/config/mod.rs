//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (API_ALLOWLIST / FEEDBACK_PRIVATE_BASE overrides)
//!     → validation.rs (semantic checks)
//!     → FeedbackConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the allowlist never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CsrfConfig, FeedbackConfig, FetchConfig, ObservabilityConfig, RateLimitConfig, SessionConfig,
    StorageConfig,
};
