//! CSRF verification middleware for state-changing requests.
//!
//! The token is taken from the configured header when present, otherwise
//! from the urlencoded form field of a body buffered up to
//! `csrf.max_body_bytes`. The buffered body is handed on unchanged.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::middleware::rate_limit::is_safe_method;
use crate::http::server::GuardState;
use crate::security::{GuardError, Session};

/// First value of `field` in an urlencoded body.
pub fn form_field(body: &[u8], field: &str) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == field)
        .map(|(_, value)| value.into_owned())
}

pub async fn csrf_middleware(
    State(state): State<GuardState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if is_safe_method(request.method()) {
        return next.run(request).await;
    }

    let Some(session) = request.extensions().get::<Session>().cloned() else {
        tracing::error!("CSRF check ran without a session; session middleware missing");
        return GuardError::Forbidden.into_response();
    };
    let csrf = &state.config.csrf;

    let header_token = request
        .headers()
        .get(csrf.header_name.as_str())
        .map(|v| v.to_str().unwrap_or_default().to_string());
    if let Some(token) = header_token {
        return match state.tokens.require(&session, Some(&token)) {
            Ok(()) => next.run(request).await,
            Err(e) => e.into_response(),
        };
    }

    let (parts, body) = request.into_parts();
    let bytes: Bytes = match axum::body::to_bytes(body, csrf.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, limit = csrf.max_body_bytes, "Rejecting unreadable or oversized body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let submitted = form_field(&bytes, &csrf.form_field);
    if let Err(e) = state.tokens.require(&session, submitted.as_deref()) {
        return e.into_response();
    }
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
