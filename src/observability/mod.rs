//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Whatever metrics recorder the embedding server installs
//! ```
//!
//! # Design Decisions
//! - Structured fields, never interpolated secrets (tokens are not logged)
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
