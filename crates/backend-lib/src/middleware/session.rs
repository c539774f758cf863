//! Session middleware: who is calling, and may they pass.
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use secrets_common::User;

use crate::storage::Storage;
use crate::AppState;

/// The caller's identity, resolved once per request by [`resolve_identity`]
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<User>);

impl CurrentUser {
    pub fn is_signed_in(&self) -> bool {
        self.0.is_some()
    }
}

// Anonymous when the identity layer did not run.
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Resolve the session cookie to a user and attach it to the request
pub async fn resolve_identity<S: Storage + 'static>(
    State(state): State<Arc<AppState<S>>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let user = match jar.get(&state.settings.cookie_name) {
        Some(cookie) => state.current_user(cookie.value()).await,
        None => None,
    };
    request.extensions_mut().insert(CurrentUser(user));
    next.run(request).await
}

/// Gate: anonymous callers are sent to the login page
pub async fn require_login(user: CurrentUser, request: Request, next: Next) -> Response {
    if user.is_signed_in() {
        next.run(request).await
    } else {
        Redirect::to("/login").into_response()
    }
}
