// ============================
// secrets-backend-lib/src/auth/mod.rs
// ============================
//! Authentication: password hashing, sessions and the login strategies.
//!
//! Every strategy ends the same way: it resolves (or creates) a `User`,
//! and the caller binds a session to that user's id.

pub mod local;
pub mod oauth;
pub mod password;
pub mod session;
pub mod token_generator;

pub use oauth::{AuthRequest, OAuthProvider, PendingStates, Providers};
pub use password::{hash_password, verify_password};
pub use session::{Session, SessionManager, SESSION_TTL};
