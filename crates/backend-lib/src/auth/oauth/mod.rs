//! OAuth2 strategies (Authorization Code flow with PKCE).
//!
//! A provider only knows how to build a consent URL and how to turn an
//! authorization code into an [`OAuthProfile`]. CSRF state bookkeeping lives
//! in [`PendingStates`] and the find-or-create step in the handlers, so both
//! are shared by every provider.

mod github;
mod google;

pub use github::GitHubOAuth;
pub use google::GoogleOAuth;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use secrets_common::{OAuthProfile, Provider};
use tracing::info;

use crate::config::{OAuthCredentials, Settings};
use crate::error::AppError;

/// How long a consent redirect may take before its state is forgotten
pub const PENDING_STATE_TTL: Duration = Duration::from_secs(10 * 60);

/// Most consent redirects that may be outstanding at once
pub const MAX_PENDING_STATES: usize = 10_000;

/// Where to send the browser, plus what must be remembered until it returns
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub url: String,
    pub csrf_state: String,
    pub pkce_verifier: String,
}

/// An OAuth2 identity provider
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    fn provider(&self) -> Provider;

    /// Build the consent URL with a fresh CSRF state and PKCE challenge
    fn authorize(&self) -> AuthRequest;

    /// Exchange an authorization code for the caller's profile
    async fn exchange(&self, code: &str, pkce_verifier: &str) -> Result<OAuthProfile, AppError>;
}

/// Configured providers, keyed by provider
pub type Providers = HashMap<Provider, Arc<dyn OAuthProvider>>;

/// Build every provider that has credentials configured
pub fn providers_from_settings(settings: &Settings) -> Result<Providers, AppError> {
    let mut providers: Providers = HashMap::new();
    if let Some(creds) = settings.oauth(Provider::Google) {
        let google = GoogleOAuth::new(creds, settings.callback_url(Provider::Google))?;
        providers.insert(Provider::Google, Arc::new(google));
    }
    if let Some(creds) = settings.oauth(Provider::GitHub) {
        let github = GitHubOAuth::new(creds, settings.callback_url(Provider::GitHub))?;
        providers.insert(Provider::GitHub, Arc::new(github));
    }
    let mut enabled: Vec<_> = providers.keys().map(|p| p.as_str()).collect();
    enabled.sort_unstable();
    info!(?enabled, "OAuth providers configured");
    Ok(providers)
}

/// OAuth client type with auth URL and token URL set.
pub(crate) type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Provider-agnostic half of a strategy: client, HTTP transport, scopes
pub(crate) struct OAuthClient {
    provider: Provider,
    client: ConfiguredClient,
    http: reqwest::Client,
    scopes: &'static [&'static str],
}

impl OAuthClient {
    pub(crate) fn new(
        provider: Provider,
        creds: &OAuthCredentials,
        auth_url: &str,
        token_url: &str,
        redirect_url: String,
        scopes: &'static [&'static str],
    ) -> Result<Self, AppError> {
        let invalid = |e: oauth2::url::ParseError| AppError::oauth(provider, e.to_string());
        let client = BasicClient::new(ClientId::new(creds.client_id.clone()))
            .set_client_secret(ClientSecret::new(creds.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(auth_url.to_string()).map_err(invalid)?)
            .set_token_uri(TokenUrl::new(token_url.to_string()).map_err(invalid)?)
            .set_redirect_uri(RedirectUrl::new(redirect_url).map_err(invalid)?);

        // no redirects on the token endpoint
        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AppError::oauth(provider, e.to_string()))?;

        Ok(Self {
            provider,
            client,
            http,
            scopes,
        })
    }

    pub(crate) fn authorize(&self) -> AuthRequest {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let mut request = self.client.authorize_url(CsrfToken::new_random);
        for scope in self.scopes {
            request = request.add_scope(Scope::new((*scope).to_string()));
        }
        let (url, csrf_state) = request.set_pkce_challenge(pkce_challenge).url();

        AuthRequest {
            url: url.to_string(),
            csrf_state: csrf_state.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        }
    }

    /// Exchange the code, returning the access token
    pub(crate) async fn access_token(
        &self,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<String, AppError> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| AppError::oauth(self.provider, format!("Token exchange failed: {e}")))?;
        Ok(token.access_token().secret().clone())
    }

    /// GET a JSON document from the provider API with the access token
    pub(crate) async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, AppError> {
        let failed = |e: reqwest::Error| AppError::oauth(self.provider, e.to_string());
        self.http
            .get(url)
            .bearer_auth(access_token)
            .header(reqwest::header::USER_AGENT, concat!("secrets/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(failed)?
            .error_for_status()
            .map_err(failed)?
            .json()
            .await
            .map_err(failed)
    }
}

struct Pending {
    provider: Provider,
    pkce_verifier: String,
    expires_at: Instant,
}

/// CSRF states awaiting their callback; each is consumed at most once
pub struct PendingStates {
    states: DashMap<String, Pending>,
    ttl: Duration,
    capacity: usize,
}

impl Default for PendingStates {
    fn default() -> Self {
        Self::new(PENDING_STATE_TTL, MAX_PENDING_STATES)
    }
}

impl PendingStates {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            states: DashMap::new(),
            ttl,
            capacity,
        }
    }

    /// Remember the verifier for a consent redirect that is about to happen.
    ///
    /// Returns `false` without storing anything when `capacity` live states
    /// are already outstanding.
    pub fn insert(&self, provider: Provider, request: &AuthRequest) -> bool {
        let now = Instant::now();
        self.states.retain(|_, p| p.expires_at > now);
        if self.states.len() >= self.capacity {
            return false;
        }
        self.states.insert(
            request.csrf_state.clone(),
            Pending {
                provider,
                pkce_verifier: request.pkce_verifier.clone(),
                expires_at: now + self.ttl,
            },
        );
        true
    }

    /// Consume a state, yielding its PKCE verifier if it is live and was
    /// issued for `provider`
    pub fn take(&self, provider: Provider, state: &str) -> Option<String> {
        let (_, pending) = self.states.remove(state)?;
        if pending.provider != provider || pending.expires_at <= Instant::now() {
            return None;
        }
        Some(pending.pkce_verifier)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(state: &str) -> AuthRequest {
        AuthRequest {
            url: "https://example.com".to_string(),
            csrf_state: state.to_string(),
            pkce_verifier: format!("verifier-{state}"),
        }
    }

    #[test]
    fn test_state_is_consumed_once() {
        let pending = PendingStates::default();
        pending.insert(Provider::Google, &request("abc"));

        assert_eq!(
            pending.take(Provider::Google, "abc"),
            Some("verifier-abc".to_string())
        );
        assert_eq!(pending.take(Provider::Google, "abc"), None);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_state_bound_to_provider() {
        let pending = PendingStates::default();
        pending.insert(Provider::Google, &request("abc"));
        assert_eq!(pending.take(Provider::GitHub, "abc"), None);
        // a mismatched attempt still burns the state
        assert_eq!(pending.take(Provider::Google, "abc"), None);
    }

    #[test]
    fn test_expired_state_rejected() {
        let pending = PendingStates::new(Duration::from_millis(0), MAX_PENDING_STATES);
        pending.insert(Provider::GitHub, &request("late"));
        assert_eq!(pending.take(Provider::GitHub, "late"), None);
    }

    #[test]
    fn test_outstanding_states_are_capped() {
        let pending = PendingStates::new(PENDING_STATE_TTL, 2);
        assert!(pending.insert(Provider::Google, &request("a")));
        assert!(pending.insert(Provider::Google, &request("b")));
        assert!(!pending.insert(Provider::Google, &request("c")));
        assert_eq!(pending.len(), 2);
        assert_eq!(pending.take(Provider::Google, "c"), None);

        // consuming a state frees its slot
        assert!(pending.take(Provider::Google, "a").is_some());
        assert!(pending.insert(Provider::Google, &request("c")));
    }

    #[test]
    fn test_expired_states_free_capacity() {
        let pending = PendingStates::new(Duration::from_millis(0), 1);
        assert!(pending.insert(Provider::GitHub, &request("old")));
        assert!(pending.insert(Provider::GitHub, &request("new")));
    }

    #[test]
    fn test_providers_from_settings_only_builds_configured() {
        let mut settings = Settings::default();
        assert!(providers_from_settings(&settings).unwrap().is_empty());

        settings.github = Some(OAuthCredentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
        });
        let providers = providers_from_settings(&settings).unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[&Provider::GitHub].provider(), Provider::GitHub);
    }
}
