// ============================
// secrets-backend-lib/src/storage.rs
// ============================
//! Storage abstraction with flat-file implementation.
//!
//! Every user is one pretty-printed JSON document under `<root>/users/`.
//! The whole collection is indexed in memory at startup; mutations hold the
//! index write lock while the document is written, so find-or-create and
//! secret appends are atomic with respect to each other.
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use secrets_common::{User, UserId, UserKey};
use tokio::{fs as tokio_fs, sync::RwLock};
use tracing::{debug, info};

use crate::error::AppError;
use crate::metrics::{SECRET_SUBMITTED, USER_CREATED};

/// Trait for user storage backends
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch a user by identifier
    async fn get_user(&self, id: UserId) -> Result<Option<User>, AppError>;

    /// Resolve a user by key
    async fn find_user(&self, key: &UserKey) -> Result<Option<User>, AppError>;

    /// Insert a new user.
    ///
    /// Fails with [`AppError::DuplicateUsername`] when the username is taken,
    /// or [`AppError::InvalidInput`] when a provider id is already linked.
    async fn create_user(&self, user: User) -> Result<User, AppError>;

    /// Resolve the user for `key`, creating it when absent.
    ///
    /// `username` is only recorded on creation. Returns the user and whether
    /// it was created by this call.
    async fn find_or_create(
        &self,
        key: &UserKey,
        username: Option<&str>,
    ) -> Result<(User, bool), AppError>;

    /// Append a secret to a user's list and persist it
    async fn append_secret(&self, id: UserId, secret: &str) -> Result<User, AppError>;

    /// All users with at least one secret, oldest user first
    async fn users_with_secrets(&self) -> Result<Vec<User>, AppError>;
}

/// Flat-file implementation of the Storage trait
#[derive(Clone)]
pub struct FlatFileStorage {
    root: PathBuf,
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl FlatFileStorage {
    /// Open (or create) the store rooted at `root`, loading every user document
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let dir = root.join("users");
        fs::create_dir_all(&dir)?;

        let mut users = HashMap::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read_to_string(&path)?;
            let user: User = serde_json::from_str(&content)?;
            users.insert(user.id, user);
        }
        info!(path = %root.display(), users = users.len(), "opened user store");

        Ok(Self {
            root,
            users: Arc::new(RwLock::new(users)),
        })
    }

    fn user_path(&self, id: UserId) -> PathBuf {
        self.root.join("users").join(format!("{id}.json"))
    }

    /// Write a user document, replacing any previous version atomically
    async fn write_user(&self, user: &User) -> Result<(), AppError> {
        let path = self.user_path(user.id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(user)?;
        tokio_fs::write(&tmp, json).await?;
        tokio_fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Uniqueness checks against the current collection
    fn check_conflicts(users: &HashMap<UserId, User>, candidate: &User) -> Result<(), AppError> {
        for existing in users.values() {
            if candidate.username.is_some() && existing.username == candidate.username {
                return Err(AppError::DuplicateUsername(
                    candidate.username.clone().unwrap_or_default(),
                ));
            }
            if candidate.google_id.is_some() && existing.google_id == candidate.google_id {
                return Err(AppError::InvalidInput(
                    "Google account already linked".to_string(),
                ));
            }
            if candidate.github_id.is_some() && existing.github_id == candidate.github_id {
                return Err(AppError::InvalidInput(
                    "GitHub account already linked".to_string(),
                ));
            }
        }
        Ok(())
    }

    async fn insert_locked(
        &self,
        users: &mut HashMap<UserId, User>,
        user: User,
    ) -> Result<User, AppError> {
        Self::check_conflicts(users, &user)?;
        self.write_user(&user).await?;
        users.insert(user.id, user.clone());
        counter!(USER_CREATED).increment(1);
        debug!(user_id = %user.id, "user created");
        Ok(user)
    }
}

#[async_trait]
impl Storage for FlatFileStorage {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user(&self, key: &UserKey) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| key.matches(u)).cloned())
    }

    async fn create_user(&self, user: User) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        self.insert_locked(&mut users, user).await
    }

    async fn find_or_create(
        &self,
        key: &UserKey,
        username: Option<&str>,
    ) -> Result<(User, bool), AppError> {
        let mut users = self.users.write().await;
        if let Some(existing) = users.values().find(|u| key.matches(u)) {
            return Ok((existing.clone(), false));
        }

        let mut user = User::from_key(key);
        if let (None, Some(name)) = (&user.username, username) {
            user.username = Some(name.to_string());
        }
        let user = self.insert_locked(&mut users, user).await?;
        Ok((user, true))
    }

    async fn append_secret(&self, id: UserId, secret: &str) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        let mut updated = users.get(&id).cloned().ok_or(AppError::UserNotFound(id))?;
        updated.secrets.push(secret.to_string());

        self.write_user(&updated).await?;
        users.insert(id, updated.clone());
        counter!(SECRET_SUBMITTED).increment(1);
        Ok(updated)
    }

    async fn users_with_secrets(&self) -> Result<Vec<User>, AppError> {
        let users = self.users.read().await;
        let mut found: Vec<User> = users.values().filter(|u| u.has_secrets()).cloned().collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }
}
