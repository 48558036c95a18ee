//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (fixed window per action + client IP, persisted
//!                      through bucket_store.rs)
//!     → csrf.rs (token check on state-changing requests, token held
//!                in a session.rs slot)
//!     → Pass to domain handler
//!
//! Rendering:
//!     → escape.rs (HTML escaping of user text)
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Fail closed: a store failure rejects the request
//! - No trust in client input: client ids are hashed before they reach storage
//! - Outcomes are typed errors; the HTTP layer picks status codes

pub mod bucket_store;
pub mod clock;
pub mod csrf;
pub mod escape;
pub mod rate_limit;
pub mod session;

use thiserror::Error;

pub use bucket_store::{BucketStore, FileBucketStore, MemoryBucketStore, RateBucket, StoreError};
pub use clock::{Clock, ManualClock, SystemClock};
pub use csrf::CsrfTokens;
pub use escape::escape_html;
pub use rate_limit::{bucket_key, RateDecision, RateLimiter};
pub use session::{Session, SessionStore};

/// Reasons the guard layer stops a request.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Anti-forgery token missing or wrong.
    #[error("CSRF verification failed")]
    Forbidden,

    /// Too many requests in the current window.
    #[error("Too many requests")]
    RateLimited { retry_after_secs: u64 },

    /// Bucket storage failed; the request is refused rather than unmetered.
    #[error("rate limit store unavailable: {0}")]
    Store(#[from] StoreError),
}
