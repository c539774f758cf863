// ============================
// secrets-backend-lib/src/auth/session.rs
// ============================
//! Session token handling and management.
//!
//! A session stores nothing but the user id; the user itself is re-fetched
//! from storage on every request.
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime},
};

use metrics::{counter, gauge};
use secrets_common::UserId;
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::debug;

use super::token_generator::generate_secure_token;
use crate::metrics::{SESSION_ACTIVE, SESSION_CREATED, SESSION_EXPIRED};

/// Default session TTL (time to live)
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7); // 7 days

/// Longest TTL a session may be given
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// How often expired sessions are swept
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Session information
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub expires_at: SystemTime,
}

impl Session {
    fn is_live(&self, now: SystemTime) -> bool {
        now < self.expires_at
    }
}

/// Session manager for handling cookie tokens
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(SESSION_TTL)
    }
}

impl SessionManager {
    /// Create a new session manager; `ttl` is clamped to [`MAX_SESSION_TTL`]
    pub fn new(ttl: Duration) -> Self {
        SessionManager {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: ttl.min(MAX_SESSION_TTL),
        }
    }

    /// Create a session for `user_id`, returning its token
    pub async fn create_session(&self, user_id: UserId) -> String {
        let token = generate_secure_token();
        let now = SystemTime::now();
        let expires_at = now
            .checked_add(self.ttl)
            .unwrap_or(SystemTime::UNIX_EPOCH + MAX_SESSION_TTL * 200);
        let session = Session {
            user_id,
            expires_at,
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(token.clone(), session);

        counter!(SESSION_CREATED).increment(1);
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);

        token
    }

    /// Get a live session by token
    pub async fn get(&self, token: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions
            .get(token)
            .filter(|s| s.is_live(SystemTime::now()))
            .cloned()
    }

    /// The user a live session belongs to
    pub async fn user_id(&self, token: &str) -> Option<UserId> {
        self.get(token).await.map(|s| s.user_id)
    }

    /// Destroy a session; returns whether it existed
    pub async fn destroy(&self, token: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(token).is_some();
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
        removed
    }

    /// Drop every session
    pub async fn flush(&self) {
        let mut sessions = self.sessions.write().await;
        sessions.clear();
        gauge!(SESSION_ACTIVE).set(0.0);
    }

    /// Number of stored sessions, expired or not
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Remove expired sessions, returning how many were dropped
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let now = SystemTime::now();
        let before_count = sessions.len();

        sessions.retain(|_, session| session.is_live(now));

        let after_count = sessions.len();
        let removed = before_count - after_count;

        if removed > 0 {
            counter!(SESSION_EXPIRED).increment(removed as u64);
            gauge!(SESSION_ACTIVE).set(after_count as f64);
            debug!(removed, "expired sessions purged");
        }
        removed
    }

    /// Spawn the periodic cleanup task; abort the handle to stop it
    pub fn spawn_cleanup(&self, every: Duration) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                manager.purge_expired().await;
            }
        })
    }
}
