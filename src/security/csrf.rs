//! Per-session anti-forgery tokens.
//!
//! # Responsibilities
//! - Issue one 256-bit token per session on first access
//! - Verify submitted tokens in constant time
//!
//! # Design Decisions
//! - Tokens are never rotated on use; one live token per session
//! - Verification never errors: missing or malformed input is just `false`
//! - `require` turns a failed check into `GuardError::Forbidden` so the
//!   request stops before any state changes

use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::observability::metrics;
use crate::security::session::Session;
use crate::security::GuardError;

/// Session slot holding the token.
pub const CSRF_SESSION_KEY: &str = "csrf";

/// Random bytes per token (hex encoded to twice this length).
pub const TOKEN_BYTES: usize = 32;

/// Generate a fresh token from the OS CSPRNG.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Token store over session slots.
#[derive(Debug, Clone, Default)]
pub struct CsrfTokens;

impl CsrfTokens {
    pub fn new() -> Self {
        Self
    }

    /// The session's token, created on first call.
    pub fn issue_or_get_token(&self, session: &Session) -> String {
        session.get_or_insert_with(CSRF_SESSION_KEY, generate_token)
    }

    /// Whether `submitted` matches the session's stored token.
    pub fn verify(&self, session: &Session, submitted: Option<&str>) -> bool {
        let Some(stored) = session.get(CSRF_SESSION_KEY) else {
            return false;
        };
        match submitted {
            Some(token) if !token.is_empty() => stored.as_bytes().ct_eq(token.as_bytes()).into(),
            _ => false,
        }
    }

    /// Verify or reject with `Forbidden`.
    pub fn require(&self, session: &Session, submitted: Option<&str>) -> Result<(), GuardError> {
        if self.verify(session, submitted) {
            return Ok(());
        }
        tracing::warn!(submitted = submitted.is_some(), "CSRF verification failed");
        metrics::record_csrf_rejected();
        Err(GuardError::Forbidden)
    }
}
