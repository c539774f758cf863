// ============================
// secrets-backend-lib/src/config.rs
// ============================
//! Configuration management.
//!
//! Settings are layered: built-in defaults, then a TOML file, then
//! `SECRETS_`-prefixed environment variables. OAuth client credentials not
//! given in the file are read from `GOOGLE_CLIENT_ID`/`GOOGLE_CLIENT_SECRET`
//! and `GITHUB_CLIENT_ID`/`GITHUB_CLIENT_SECRET` (a `.env` file is honoured).
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use oauth2::url::Url;
use secrets_common::Provider;
use serde::{Deserialize, Serialize};

use crate::auth::session::MAX_SESSION_TTL;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Directory holding the user documents
    pub data_dir: PathBuf,
    /// Log level
    pub log_level: String,
    /// Session TTL in seconds
    pub session_ttl_secs: u64,
    /// Externally visible base URL, used to build OAuth callback URLs
    pub public_url: String,
    /// Name of the session cookie
    pub cookie_name: String,
    /// Mark the session cookie `Secure`
    pub secure_cookies: bool,
    /// Whether `/secrets` is visible without logging in
    pub secrets_public: bool,
    /// Google OAuth client, if enabled
    #[serde(default)]
    pub google: Option<OAuthCredentials>,
    /// GitHub OAuth client, if enabled
    #[serde(default)]
    pub github: Option<OAuthCredentials>,
}

/// OAuth client identifier/secret pair
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl OAuthCredentials {
    /// Read `<PREFIX>_CLIENT_ID` and `<PREFIX>_CLIENT_SECRET`; `None` unless both are set
    pub fn from_env(prefix: &str) -> Option<Self> {
        let client_id = std::env::var(format!("{prefix}_CLIENT_ID")).ok()?;
        let client_secret = std::env::var(format!("{prefix}_CLIENT_SECRET")).ok()?;
        if client_id.is_empty() || client_secret.is_empty() {
            return None;
        }
        Some(Self {
            client_id,
            client_secret,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            data_dir: PathBuf::from("data"),
            log_level: "info".to_string(),
            session_ttl_secs: 60 * 60 * 24 * 7, // 7 days
            public_url: "http://localhost:3000".to_string(),
            cookie_name: "sid".to_string(),
            secure_cookies: false,
            secrets_public: true,
            google: None,
            github: None,
        }
    }
}

impl Settings {
    /// Load settings from the given TOML file; a missing file is not an error
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("SECRETS_"))
            .extract()
            .with_context(|| format!("loading settings from {}", path.as_ref().display()))?;

        if settings.google.is_none() {
            settings.google = OAuthCredentials::from_env("GOOGLE");
        }
        if settings.github.is_none() {
            settings.github = OAuthCredentials::from_env("GITHUB");
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            bail!("invalid log level: {}", self.log_level);
        }
        if self.session_ttl_secs == 0 {
            bail!("session_ttl_secs must be greater than zero");
        }
        if self.session_ttl() > MAX_SESSION_TTL {
            bail!(
                "session_ttl_secs must be at most {}",
                MAX_SESSION_TTL.as_secs()
            );
        }
        if self.cookie_name.trim().is_empty() {
            bail!("cookie_name must not be empty");
        }
        Url::parse(&self.public_url)
            .with_context(|| format!("invalid public_url: {}", self.public_url))?;
        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Credentials for `provider`, if configured
    pub fn oauth(&self, provider: Provider) -> Option<&OAuthCredentials> {
        match provider {
            Provider::Google => self.google.as_ref(),
            Provider::GitHub => self.github.as_ref(),
        }
    }

    /// Where `provider` sends the browser back to
    pub fn callback_url(&self, provider: Provider) -> String {
        format!(
            "{}/auth/{}/secrets",
            self.public_url.trim_end_matches('/'),
            provider
        )
    }
}
