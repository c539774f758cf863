// ============================
// crates/backend-lib/src/handlers/pages.rs
// ============================
//! Plain page renders.
use std::sync::Arc;

use axum::{extract::State, response::Html};
use minijinja::context;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::storage::Storage;
use crate::AppState;

pub async fn home<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Html<String>, AppError> {
    state
        .templates
        .render("home.html", context! { signed_in => user.is_signed_in() })
}

pub async fn login_page<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Html<String>, AppError> {
    state
        .templates
        .render("login.html", context! { providers => state.provider_names() })
}

pub async fn register_page<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Html<String>, AppError> {
    state
        .templates
        .render("register.html", context! { providers => state.provider_names() })
}

/// Every submitted secret, oldest author first
pub async fn secrets_page<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Html<String>, AppError> {
    let secrets: Vec<String> = state
        .storage
        .users_with_secrets()
        .await?
        .into_iter()
        .flat_map(|u| u.secrets)
        .collect();

    state.templates.render(
        "secrets.html",
        context! { secrets => secrets, signed_in => user.is_signed_in() },
    )
}

pub async fn submit_page<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Html<String>, AppError> {
    state.templates.render("submit.html", context! {})
}
