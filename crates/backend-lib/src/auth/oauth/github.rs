//! GitHub OAuth 2.0 strategy.
//!
//! Requests the `user:email` scope and resolves users by their numeric
//! GitHub id. No username is recorded for GitHub users.

use async_trait::async_trait;
use secrets_common::{OAuthProfile, Provider};
use serde::Deserialize;

use super::{AuthRequest, OAuthClient, OAuthProvider};
use crate::config::OAuthCredentials;
use crate::error::AppError;

const AUTH_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const USER_URL: &str = "https://api.github.com/user";
const SCOPES: &[&str] = &["user:email"];

/// GitHub user info from API.
#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    email: Option<String>,
    name: Option<String>,
}

impl From<GitHubUser> for OAuthProfile {
    fn from(user: GitHubUser) -> Self {
        OAuthProfile {
            provider: Provider::GitHub,
            id: user.id.to_string(),
            email: user.email,
            display_name: user.name.or(Some(user.login)),
        }
    }
}

/// GitHub OAuth handler.
pub struct GitHubOAuth {
    client: OAuthClient,
}

impl GitHubOAuth {
    pub fn new(creds: &OAuthCredentials, redirect_url: String) -> Result<Self, AppError> {
        let client = OAuthClient::new(
            Provider::GitHub,
            creds,
            AUTH_URL,
            TOKEN_URL,
            redirect_url,
            SCOPES,
        )?;
        Ok(Self { client })
    }
}

#[async_trait]
impl OAuthProvider for GitHubOAuth {
    fn provider(&self) -> Provider {
        Provider::GitHub
    }

    fn authorize(&self) -> AuthRequest {
        self.client.authorize()
    }

    async fn exchange(&self, code: &str, pkce_verifier: &str) -> Result<OAuthProfile, AppError> {
        let access_token = self.client.access_token(code, pkce_verifier).await?;
        let user: GitHubUser = self.client.fetch_json(USER_URL, &access_token).await?;
        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url() {
        let creds = OAuthCredentials {
            client_id: "gh-client".to_string(),
            client_secret: "gh-secret".to_string(),
        };
        let oauth =
            GitHubOAuth::new(&creds, "http://localhost:3000/auth/github/secrets".to_string())
                .unwrap();
        let request = oauth.authorize();
        assert!(request.url.starts_with(AUTH_URL));
        assert!(request.url.contains("client_id=gh-client"));
        assert!(request.url.contains("scope=user%3Aemail"));
        assert!(!request.pkce_verifier.is_empty());
    }

    #[test]
    fn test_user_to_profile() {
        let user: GitHubUser =
            serde_json::from_str(r#"{"id":583231,"login":"octocat","email":null,"name":null}"#)
                .unwrap();
        let profile = OAuthProfile::from(user);
        assert_eq!(profile.id, "583231");
        assert_eq!(profile.display_name.as_deref(), Some("octocat"));
        assert_eq!(profile.username(), None);
    }
}
