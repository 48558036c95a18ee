//! Guard middleware, applied by `server::guard_layers`.

pub mod csrf;
pub mod rate_limit;
pub mod session;

pub use csrf::csrf_middleware;
pub use rate_limit::{client_identifier, is_safe_method, rate_limit_middleware};
pub use session::{session_cookie, session_middleware};
