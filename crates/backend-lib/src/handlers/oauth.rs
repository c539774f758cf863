// ============================
// crates/backend-lib/src/handlers/oauth.rs
// ============================
//! OAuth consent redirect and callback, shared by every provider.
use std::sync::Arc;

use axum::{
    extract::{rejection::PathRejection, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use secrets_common::{OAuthCallback, Provider, User};
use tracing::{info, warn};

use super::sign_in;
use crate::error::AppError;
use crate::storage::Storage;
use crate::AppState;

/// `GET /auth/{provider}`: send the browser to the consent screen
pub async fn begin<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    provider: Result<Path<Provider>, PathRejection>,
) -> Redirect {
    let Ok(Path(provider)) = provider else {
        return Redirect::to("/login");
    };
    let Some(oauth) = state.providers.get(&provider) else {
        warn!(error = %AppError::ProviderNotConfigured(provider), "OAuth login unavailable");
        return Redirect::to("/login");
    };

    let request = oauth.authorize();
    if !state.pending.insert(provider, &request) {
        warn!(%provider, pending = state.pending.len(), "too many OAuth logins in flight");
        return Redirect::to("/login");
    }
    Redirect::to(&request.url)
}

/// `GET /auth/{provider}/secrets`: finish the handshake and log the user in
pub async fn callback<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    jar: CookieJar,
    provider: Result<Path<Provider>, PathRejection>,
    Query(params): Query<OAuthCallback>,
) -> Response {
    let Ok(Path(provider)) = provider else {
        return Redirect::to("/login").into_response();
    };

    match complete(&state, provider, params).await {
        Ok(user) => {
            let jar = sign_in(&state, jar, user.id).await;
            (jar, Redirect::to("/secrets")).into_response()
        },
        Err(e) => {
            warn!(%provider, error = %e, "OAuth login failed");
            Redirect::to("/login").into_response()
        },
    }
}

async fn complete<S: Storage>(
    state: &AppState<S>,
    provider: Provider,
    params: OAuthCallback,
) -> Result<User, AppError> {
    if let Some(error) = params.error {
        return Err(AppError::oauth(provider, format!("provider returned {error}")));
    }
    let oauth = state
        .providers
        .get(&provider)
        .ok_or(AppError::ProviderNotConfigured(provider))?;
    let code = params
        .code
        .ok_or_else(|| AppError::oauth(provider, "missing authorization code"))?;
    let csrf_state = params
        .state
        .ok_or_else(|| AppError::oauth(provider, "missing state"))?;
    let verifier = state
        .pending
        .take(provider, &csrf_state)
        .ok_or_else(|| AppError::oauth(provider, "unknown or expired state"))?;

    let profile = oauth.exchange(&code, &verifier).await?;
    let (user, created) = state
        .storage
        .find_or_create(&profile.key(), profile.username())
        .await?;
    let name = profile.display_name.as_deref().unwrap_or("-");
    if created {
        info!(%provider, user_id = %user.id, name, "user created from OAuth profile");
    } else {
        info!(%provider, user_id = %user.id, name, "OAuth login");
    }
    Ok(user)
}
