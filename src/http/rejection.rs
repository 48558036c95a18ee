//! Mapping of guard outcomes to HTTP responses.
//!
//! Bodies are short fixed strings; internal error details only go to logs.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::observability::metrics;
use crate::security::GuardError;

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        match self {
            GuardError::Forbidden => (StatusCode::FORBIDDEN, "CSRF verification failed").into_response(),
            GuardError::RateLimited { retry_after_secs } => {
                let mut response = (StatusCode::TOO_MANY_REQUESTS, "Too many requests").into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
            GuardError::Store(e) => {
                // Fail closed: an unmetered request is never let through.
                tracing::error!(error = %e, "Rate limit store failure, rejecting request");
                metrics::record_store_error();
                (StatusCode::SERVICE_UNAVAILABLE, "Service temporarily unavailable").into_response()
            }
        }
    }
}
