// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the secrets server.

pub mod session;

pub use session::{require_login, resolve_identity, CurrentUser};
