//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows, limits and timeouts > 0)
//! - Reject blank names that would silently disable a guard
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FeedbackConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::FeedbackConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("fetch.allowlist entry {index} is blank")]
    BlankAllowlistEntry { index: usize },
}

/// Check a parsed configuration, collecting every error.
pub fn validate_config(config: &FeedbackConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::Zero { field: "rate_limit.window_secs" });
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::Zero { field: "rate_limit.max_requests" });
    }
    if config.rate_limit.action.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "rate_limit.action" });
    }
    if config.fetch.timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "fetch.timeout_secs" });
    }
    for (index, host) in config.fetch.allowlist.iter().enumerate() {
        if host.trim().is_empty() {
            errors.push(ValidationError::BlankAllowlistEntry { index });
        }
    }
    if config.csrf.form_field.is_empty() {
        errors.push(ValidationError::Empty { field: "csrf.form_field" });
    }
    if config.csrf.header_name.is_empty() {
        errors.push(ValidationError::Empty { field: "csrf.header_name" });
    }
    if config.csrf.max_body_bytes == 0 {
        errors.push(ValidationError::Zero { field: "csrf.max_body_bytes" });
    }
    if config.session.cookie_name.is_empty() {
        errors.push(ValidationError::Empty { field: "session.cookie_name" });
    }
    if config.session.idle_ttl_secs == 0 {
        errors.push(ValidationError::Zero { field: "session.idle_ttl_secs" });
    }
    if config.session.max_sessions == 0 {
        errors.push(ValidationError::Zero { field: "session.max_sessions" });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
