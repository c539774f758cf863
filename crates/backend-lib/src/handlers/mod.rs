// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! Route handlers.
//!
//! Failures never reach the browser as error statuses: they are logged and
//! answered with a redirect to the page the user can retry from.

pub mod auth;
pub mod oauth;
pub mod pages;
pub mod secrets;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use secrets_common::UserId;
use tracing::debug;

use crate::storage::Storage;
use crate::AppState;

/// Bind a fresh session to `user_id`, replacing any session the caller held
pub(crate) async fn sign_in<S: Storage>(
    state: &AppState<S>,
    jar: CookieJar,
    user_id: UserId,
) -> CookieJar {
    let name = state.settings.cookie_name.clone();
    if let Some(previous) = jar.get(&name) {
        state.sessions.destroy(previous.value()).await;
    }

    let token = state.sessions.create_session(user_id).await;
    debug!(%user_id, "session established");

    let cookie = Cookie::build((name, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.settings.secure_cookies);
    jar.add(cookie)
}

/// Destroy the caller's session, if any, and expire the cookie
pub(crate) async fn sign_out<S: Storage>(state: &AppState<S>, jar: CookieJar) -> CookieJar {
    let name = state.settings.cookie_name.clone();
    if let Some(current) = jar.get(&name) {
        state.sessions.destroy(current.value()).await;
    }
    jar.remove(Cookie::build((name, "")).path("/"))
}
