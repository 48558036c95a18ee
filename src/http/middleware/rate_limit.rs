//! Fixed window rate limiting middleware.

use std::io;
use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::server::GuardState;
use crate::observability::metrics;
use crate::security::{GuardError, RateDecision, StoreError};

/// Peer IP of the request, or `"unknown"` without connect info.
pub fn client_identifier(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// GET, HEAD, OPTIONS and TRACE change no state.
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
}

/// Middleware function for per-client rate limiting.
pub async fn rate_limit_middleware(
    State(state): State<GuardState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let rules = &state.config.rate_limit;
    if !rules.enabled || (!rules.limit_safe_methods && is_safe_method(request.method())) {
        return next.run(request).await;
    }

    let client = client_identifier(&request);
    let limiter = state.limiter.clone();
    let action = rules.action.clone();
    let (max_requests, window_secs) = (rules.max_requests, rules.window_secs);

    // Bucket stores may touch the filesystem.
    let evaluated = tokio::task::spawn_blocking({
        let client = client.clone();
        let action = action.clone();
        move || limiter.check_and_increment(&action, &client, max_requests, window_secs)
    })
    .await
    .unwrap_or_else(|e| Err(StoreError::Io(io::Error::new(io::ErrorKind::Other, e))));

    match evaluated {
        Ok(RateDecision::Allowed { .. }) => next.run(request).await,
        Ok(RateDecision::Limited { count, reset_at }) => {
            tracing::warn!(client = %client, action = %action, count, "Rate limit exceeded");
            metrics::record_rate_limited(&action);
            GuardError::RateLimited {
                retry_after_secs: state.limiter.retry_after_secs(reset_at),
            }
            .into_response()
        }
        Err(e) => GuardError::Store(e).into_response(),
    }
}
