// ============================
// secrets-backend-lib/src/router.rs
// ============================
//! HTTP routes.
use std::sync::Arc;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, oauth, pages, secrets};
use crate::middleware::{require_login, resolve_identity};
use crate::storage::Storage;
use crate::AppState;

/// Create the application router.
///
/// `/submit` is always gated; `/secrets` is gated only when
/// `secrets_public` is off.
pub fn create_router<S: Storage + 'static>(state: Arc<AppState<S>>) -> Router {
    let mut public = Router::new()
        .route("/", get(pages::home::<S>))
        .route("/login", get(pages::login_page::<S>).post(auth::login::<S>))
        .route(
            "/register",
            get(pages::register_page::<S>).post(auth::register::<S>),
        )
        .route("/logout", get(auth::logout::<S>))
        .route("/auth/{provider}", get(oauth::begin::<S>))
        .route("/auth/{provider}/secrets", get(oauth::callback::<S>));

    let mut gated = Router::new().route(
        "/submit",
        get(pages::submit_page::<S>).post(secrets::submit::<S>),
    );

    if state.settings.secrets_public {
        public = public.route("/secrets", get(pages::secrets_page::<S>));
    } else {
        gated = gated.route("/secrets", get(pages::secrets_page::<S>));
    }

    public
        .merge(gated.route_layer(from_fn(require_login)))
        .layer(from_fn_with_state(state.clone(), resolve_identity::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
