// ================
// common/src/lib.rs
// ================
//! Common types shared by the secrets server crates: the persisted
//! [`User`] document, the typed lookup keys used for find-or-create, and the
//! form/query payloads the HTTP layer decodes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque user identifier
pub type UserId = Uuid;

/// Third-party identity providers
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    #[serde(rename = "google")]
    Google,
    #[serde(rename = "github")]
    GitHub,
}

impl Provider {
    /// Lower-case name, as used in routes and logs
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::GitHub => "github",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key a user is resolved by.
///
/// A user is uniquely resolvable by its local username or by exactly one
/// provider identifier. Google and GitHub keys are never reconciled with each
/// other, so one person signing in through both providers owns two users.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserKey {
    /// Local account, by username
    Local(String),
    /// Google account, by Google profile id
    Google(String),
    /// GitHub account, by GitHub profile id
    GitHub(String),
}

impl UserKey {
    /// Build the key for a provider identifier
    pub fn oauth(provider: Provider, id: impl Into<String>) -> Self {
        match provider {
            Provider::Google => UserKey::Google(id.into()),
            Provider::GitHub => UserKey::GitHub(id.into()),
        }
    }

    /// Whether `user` is the one this key resolves to
    pub fn matches(&self, user: &User) -> bool {
        match self {
            UserKey::Local(name) => user.username.as_deref() == Some(name.as_str()),
            UserKey::Google(id) => user.google_id.as_deref() == Some(id.as_str()),
            UserKey::GitHub(id) => user.github_id.as_deref() == Some(id.as_str()),
        }
    }
}

/// Persisted user document
#[derive(Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    /// Unique across all users when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// PHC-format hash, local accounts only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_id: Option<String>,
    /// Submitted secrets, in submission order
    #[serde(default)]
    pub secrets: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A fresh user carrying only the identity named by `key`
    pub fn from_key(key: &UserKey) -> Self {
        let mut user = User {
            id: Uuid::new_v4(),
            username: None,
            password_hash: None,
            google_id: None,
            github_id: None,
            secrets: Vec::new(),
            created_at: Utc::now(),
        };
        match key {
            UserKey::Local(name) => user.username = Some(name.clone()),
            UserKey::Google(id) => user.google_id = Some(id.clone()),
            UserKey::GitHub(id) => user.github_id = Some(id.clone()),
        }
        user
    }

    pub fn has_secrets(&self) -> bool {
        !self.secrets.is_empty()
    }
}

// Hand-written so password hashes never end up in logs.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field(
                "password_hash",
                &self.password_hash.as_ref().map(|_| "<redacted>"),
            )
            .field("google_id", &self.google_id)
            .field("github_id", &self.github_id)
            .field("secrets", &self.secrets.len())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Profile returned by a provider after a successful code exchange
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OAuthProfile {
    pub provider: Provider,
    /// Provider-specific account id
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl OAuthProfile {
    /// Find-or-create key for this profile
    pub fn key(&self) -> UserKey {
        UserKey::oauth(self.provider, self.id.clone())
    }

    /// Username recorded when the user is first created.
    ///
    /// Google accounts take their email as username; GitHub accounts carry none.
    pub fn username(&self) -> Option<&str> {
        match self.provider {
            Provider::Google => self.email.as_deref(),
            Provider::GitHub => None,
        }
    }
}

/// `POST /register` and `POST /login` body
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CredentialsForm {
    pub username: String,
    pub password: String,
}

/// `POST /submit` body
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SecretForm {
    pub secret: String,
}

/// Query string of an OAuth redirect back to us
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct OAuthCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set when the user denied consent or the provider failed
    pub error: Option<String>,
}
