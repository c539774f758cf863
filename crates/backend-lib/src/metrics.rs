// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const SESSION_CREATED: &str = "session.created";
pub const SESSION_EXPIRED: &str = "session.expired";
pub const SESSION_ACTIVE: &str = "session.active";
pub const USER_CREATED: &str = "user.created";
pub const LOGIN_FAILED: &str = "login.failed";
pub const SECRET_SUBMITTED: &str = "secret.submitted";
