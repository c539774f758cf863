// ============================
// secrets-backend-lib/src/lib.rs
// ============================
//! Core functionality for the secrets board server: local and OAuth
//! login, cookie sessions, and the gated secret submission flow.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod render;
pub mod router;
pub mod storage;

use std::sync::Arc;

use parking_lot::Mutex;
use secrets_common::User;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::auth::oauth::providers_from_settings;
use crate::auth::session::CLEANUP_INTERVAL;
use crate::auth::{PendingStates, Providers, SessionManager};
use crate::config::Settings;
use crate::error::AppError;
use crate::render::Templates;
use crate::storage::{FlatFileStorage, Storage};

/// Application state shared across all handlers
pub struct AppState<S> {
    /// User store
    pub storage: S,
    /// Cookie sessions
    pub sessions: SessionManager,
    /// Settings the server was started with
    pub settings: Arc<Settings>,
    /// Configured OAuth providers
    pub providers: Providers,
    /// OAuth consent redirects awaiting their callback
    pub pending: PendingStates,
    /// Page templates
    pub templates: Templates,
    cleanup: Mutex<Option<JoinHandle<()>>>,
}

impl<S: Storage> AppState<S> {
    /// Create a new application state; no background task is started
    pub fn new(storage: S, settings: Settings, providers: Providers) -> Result<Self, AppError> {
        Ok(Self {
            storage,
            sessions: SessionManager::new(settings.session_ttl()),
            settings: Arc::new(settings),
            providers,
            pending: PendingStates::default(),
            templates: Templates::new()?,
            cleanup: Mutex::new(None),
        })
    }

    /// Start the periodic session sweep
    pub fn start(&self) {
        let mut cleanup = self.cleanup.lock();
        if cleanup.is_none() {
            *cleanup = Some(self.sessions.spawn_cleanup(CLEANUP_INTERVAL));
        }
    }

    /// Stop background work and drop every session
    pub async fn shutdown(&self) {
        let handle = self.cleanup.lock().take();
        if let Some(handle) = handle {
            handle.abort();
        }
        let active = self.sessions.len().await;
        self.sessions.flush().await;
        info!(sessions = active, "application state shut down");
    }

    /// Resolve the user behind a session token.
    ///
    /// Only the id lives in the session; the user is re-read from storage so a
    /// session pointing at a vanished user is treated as anonymous.
    pub async fn current_user(&self, token: &str) -> Option<User> {
        let user_id = self.sessions.user_id(token).await?;
        match self.storage.get_user(user_id).await {
            Ok(Some(user)) => Some(user),
            Ok(None) => {
                warn!(%user_id, "session refers to unknown user");
                None
            },
            Err(e) => {
                error!(%user_id, error = %e, "failed to load session user");
                None
            },
        }
    }

    /// Names of the configured OAuth providers, for login links
    pub fn provider_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.providers.keys().map(|p| p.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl AppState<FlatFileStorage> {
    /// Open the store, build the providers and start background tasks
    pub fn init(settings: Settings) -> anyhow::Result<Arc<Self>> {
        let storage = FlatFileStorage::new(&settings.data_dir)?;
        let providers = providers_from_settings(&settings)?;
        let state = Self::new(storage, settings, providers)?;
        state.start();
        Ok(Arc::new(state))
    }
}
