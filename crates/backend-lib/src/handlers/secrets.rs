// ============================
// crates/backend-lib/src/handlers/secrets.rs
// ============================
//! Secret submission.
use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, State},
    response::Redirect,
    Form,
};
use secrets_common::SecretForm;
use tracing::{error, warn};

use crate::middleware::CurrentUser;
use crate::storage::Storage;
use crate::AppState;

/// `POST /submit`: append the secret to the caller's list
pub async fn submit<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
    form: Result<Form<SecretForm>, FormRejection>,
) -> Redirect {
    let Some(user) = user else {
        return Redirect::to("/login");
    };

    let secret = match form {
        Ok(Form(form)) if !form.secret.trim().is_empty() => form.secret,
        Ok(_) => {
            warn!(user_id = %user.id, "empty secret rejected");
            return Redirect::to("/submit");
        },
        Err(e) => {
            warn!(user_id = %user.id, error = %e, "malformed secret form");
            return Redirect::to("/submit");
        },
    };

    match state.storage.append_secret(user.id, &secret).await {
        Ok(_) => Redirect::to("/secrets"),
        Err(e) => {
            error!(user_id = %user.id, error = %e, "failed to save secret");
            Redirect::to("/submit")
        },
    }
}
