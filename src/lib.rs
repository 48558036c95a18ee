//! Guard layer for a public feedback board.
//!
//! CSRF tokens, a persisted fixed window rate limiter, an allowlisted JSON
//! fetcher and CSV-injection-safe export, plus the Axum middleware that puts
//! them in front of a caller's routes.

pub mod config;
pub mod export;
pub mod feedback;
pub mod fetch;
pub mod http;
pub mod observability;
pub mod security;
pub mod tags;

pub use config::FeedbackConfig;
pub use fetch::{AllowlistedFetcher, FetchError};
pub use http::{guard_layers, GuardState};
pub use security::{GuardError, RateDecision, RateLimiter};
