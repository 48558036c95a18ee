//! Guard state and router wiring.
//!
//! # Responsibilities
//! - Build the shared guard state (limiter, token store, sessions, config)
//! - Wrap a caller's Axum router with the guard middleware stack
//!
//! # Layer order (outermost first)
//! ```text
//! trace → rate limit → session → csrf → handler
//! ```

use std::sync::Arc;

use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use crate::config::FeedbackConfig;
use crate::http::middleware::{csrf_middleware, rate_limit_middleware, session_middleware};
use crate::security::{
    BucketStore, Clock, CsrfTokens, FileBucketStore, MemoryBucketStore, RateLimiter, SessionStore,
    StoreError, SystemClock,
};

/// Application state injected into the guard middleware.
#[derive(Clone, Debug)]
pub struct GuardState {
    pub limiter: RateLimiter,
    pub tokens: CsrfTokens,
    pub sessions: Arc<SessionStore>,
    pub config: Arc<FeedbackConfig>,
}

impl GuardState {
    /// State with buckets persisted under `<private_base>/storage`.
    pub fn from_config(config: FeedbackConfig) -> Result<Self, StoreError> {
        let store = FileBucketStore::open(config.storage.storage_dir())?;
        Ok(Self::with_store(config, Arc::new(store), Arc::new(SystemClock)))
    }

    /// State with non-durable in-memory buckets.
    pub fn in_memory(config: FeedbackConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryBucketStore::new()), Arc::new(SystemClock))
    }

    pub fn with_store(config: FeedbackConfig, store: Arc<dyn BucketStore>, clock: Arc<dyn Clock>) -> Self {
        let sessions = SessionStore::with_limits(
            clock.clone(),
            config.session.idle_ttl_secs,
            config.session.max_sessions,
        );
        Self {
            limiter: RateLimiter::with_clock(store, clock),
            tokens: CsrfTokens::new(),
            sessions: Arc::new(sessions),
            config: Arc::new(config),
        }
    }
}

/// Apply the guard middleware stack to `router`.
pub fn guard_layers(router: Router, state: GuardState) -> Router {
    router
        .layer(middleware::from_fn_with_state(state.clone(), csrf_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), session_middleware))
        .layer(middleware::from_fn_with_state(state, rate_limit_middleware))
        .layer(TraceLayer::new_for_http())
}
