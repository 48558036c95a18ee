//! HTTP adapter for the guard layer.
//!
//! # Data Flow
//! ```text
//! Request
//!     → middleware/rate_limit.rs (429 on excess, 503 if the store fails)
//!     → middleware/session.rs (attach Session, set cookie when new)
//!     → middleware/csrf.rs (403 on unsafe methods without a valid token)
//!     → caller's handler
//!     → export.rs (CSV attachment responses)
//! ```

pub mod export;
pub mod middleware;
pub mod rejection;
pub mod server;

pub use export::{comments_csv_response, csv_attachment};
pub use server::{guard_layers, GuardState};
