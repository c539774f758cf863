// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! Registration, local login and logout.
use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use metrics::counter;
use secrets_common::CredentialsForm;
use tracing::{info, warn};

use super::{sign_in, sign_out};
use crate::auth::local;
use crate::metrics::LOGIN_FAILED;
use crate::storage::Storage;
use crate::AppState;

/// `POST /register`: create the account and log it straight in
pub async fn register<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    jar: CookieJar,
    form: Result<Form<CredentialsForm>, FormRejection>,
) -> Response {
    let Form(form) = match form {
        Ok(form) => form,
        Err(e) => {
            warn!(error = %e, "malformed registration form");
            return Redirect::to("/register").into_response();
        },
    };

    match local::register(&state.storage, &form).await {
        Ok(user) => {
            info!(user_id = %user.id, "user registered");
            let jar = sign_in(&state, jar, user.id).await;
            (jar, Redirect::to("/secrets")).into_response()
        },
        Err(e) => {
            warn!(username = %form.username, error = %e, "registration failed");
            Redirect::to("/register").into_response()
        },
    }
}

/// `POST /login`: every failure lands back on the login page
pub async fn login<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    jar: CookieJar,
    form: Result<Form<CredentialsForm>, FormRejection>,
) -> Response {
    let Form(form) = match form {
        Ok(form) => form,
        Err(e) => {
            warn!(error = %e, "malformed login form");
            return Redirect::to("/login").into_response();
        },
    };

    match local::authenticate(&state.storage, &form).await {
        Ok(user) => {
            let jar = sign_in(&state, jar, user.id).await;
            (jar, Redirect::to("/secrets")).into_response()
        },
        Err(e) => {
            counter!(LOGIN_FAILED).increment(1);
            info!(username = %form.username, error = %e, "login failed");
            Redirect::to("/login").into_response()
        },
    }
}

/// `GET /logout`
pub async fn logout<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    jar: CookieJar,
) -> impl IntoResponse {
    let jar = sign_out(&state, jar).await;
    info!("Done logging out.");
    (jar, Redirect::to("/"))
}
