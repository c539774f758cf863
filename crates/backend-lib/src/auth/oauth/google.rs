//! Google OAuth 2.0 strategy.
//!
//! Requests the `profile` and `email` scopes and resolves users by their
//! Google account id. The account email becomes the username of a newly
//! created user.

use async_trait::async_trait;
use secrets_common::{OAuthProfile, Provider};
use serde::Deserialize;

use super::{AuthRequest, OAuthClient, OAuthProvider};
use crate::config::OAuthCredentials;
use crate::error::AppError;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const SCOPES: &[&str] = &["profile", "email"];

/// Google user info from API.
#[derive(Debug, Deserialize)]
struct GoogleUser {
    id: String,
    email: Option<String>,
    name: Option<String>,
}

impl From<GoogleUser> for OAuthProfile {
    fn from(user: GoogleUser) -> Self {
        OAuthProfile {
            provider: Provider::Google,
            id: user.id,
            email: user.email,
            display_name: user.name,
        }
    }
}

/// Google OAuth handler.
pub struct GoogleOAuth {
    client: OAuthClient,
}

impl GoogleOAuth {
    pub fn new(creds: &OAuthCredentials, redirect_url: String) -> Result<Self, AppError> {
        let client = OAuthClient::new(
            Provider::Google,
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
impl OAuthProvider for GoogleOAuth {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn authorize(&self) -> AuthRequest {
        self.client.authorize()
    }

    async fn exchange(&self, code: &str, pkce_verifier: &str) -> Result<OAuthProfile, AppError> {
        let access_token = self.client.access_token(code, pkce_verifier).await?;
        let user: GoogleUser = self.client.fetch_json(USERINFO_URL, &access_token).await?;
        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oauth() -> GoogleOAuth {
        let creds = OAuthCredentials {
            client_id: "google-client".to_string(),
            client_secret: "google-secret".to_string(),
        };
        GoogleOAuth::new(&creds, "http://localhost:3000/auth/google/secrets".to_string()).unwrap()
    }

    #[test]
    fn test_authorize_url() {
        let request = oauth().authorize();
        assert!(request.url.starts_with(AUTH_URL));
        assert!(request.url.contains("client_id=google-client"));
        assert!(request.url.contains("scope=profile+email"));
        assert!(request.url.contains("code_challenge_method=S256"));
        assert!(request
            .url
            .contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fgoogle%2Fsecrets"));
        assert!(request.url.contains(&format!("state={}", request.csrf_state)));
    }

    #[test]
    fn test_userinfo_to_profile() {
        let user: GoogleUser = serde_json::from_str(
            r#"{"id":"1098","email":"a@x.com","verified_email":true,"name":"A"}"#,
        )
        .unwrap();
        let profile = OAuthProfile::from(user);
        assert_eq!(profile.id, "1098");
        assert_eq!(profile.username(), Some("a@x.com"));
    }
}
