//! Session cookie middleware.
//!
//! Resolves the session cookie to a `Session` and attaches it as a request
//! extension for the CSRF middleware and handlers. A new session is stored,
//! and its cookie set, only once the handler has written to it.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use crate::http::server::GuardState;

/// Value of cookie `name` from the request's `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value for a new session.
pub fn session_cookie(name: &str, id: &str, secure: bool) -> String {
    let mut cookie = format!("{name}={id}; Path=/; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub async fn session_middleware(
    State(state): State<GuardState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let cookie_name = &state.config.session.cookie_name;
    let presented = cookie_value(request.headers(), cookie_name);
    let (session, created) = state.sessions.open(presented.as_deref());

    request.extensions_mut().insert(session.clone());
    let mut response = next.run(request).await;

    if created && !session.is_empty() {
        state.sessions.persist(&session);
        let cookie = session_cookie(cookie_name, session.id(), state.config.session.secure_cookie);
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!(error = %e, "Session cookie is not a valid header value"),
        }
    }
    response
}
