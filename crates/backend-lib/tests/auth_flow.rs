//! End-to-end flows through the router: registration, login, the session
//! gate, secret submission and the OAuth callback.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use secrets_backend_lib::{
    auth::{AuthRequest, OAuthProvider, Providers},
    config::Settings,
    error::AppError,
    router::create_router,
    storage::{FlatFileStorage, Storage},
    AppState,
};
use secrets_common::{OAuthProfile, Provider, UserKey};
use tempfile::TempDir;
use tower::ServiceExt;

/// Provider that skips the network: any code but "bad" yields a fixed profile
struct StubProvider {
    provider: Provider,
    id: &'static str,
    email: Option<&'static str>,
}

#[async_trait]
impl OAuthProvider for StubProvider {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn authorize(&self) -> AuthRequest {
        let state = uuid::Uuid::new_v4().simple().to_string();
        AuthRequest {
            url: format!("https://idp.test/authorize?state={state}"),
            csrf_state: state,
            pkce_verifier: "verifier".to_string(),
        }
    }

    async fn exchange(&self, code: &str, pkce_verifier: &str) -> Result<OAuthProfile, AppError> {
        if code == "bad" || pkce_verifier != "verifier" {
            return Err(AppError::oauth(self.provider, "exchange refused"));
        }
        Ok(OAuthProfile {
            provider: self.provider,
            id: self.id.to_string(),
            email: self.email.map(str::to_string),
            display_name: None,
        })
    }
}

struct TestApp {
    app: Router,
    state: Arc<AppState<FlatFileStorage>>,
    _dir: TempDir,
}

impl TestApp {
    fn new() -> Self {
        Self::with_settings(Settings::default(), HashMap::new())
    }

    fn with_settings(settings: Settings, providers: Providers) -> Self {
        let dir = TempDir::new().unwrap();
        let storage = FlatFileStorage::new(dir.path()).unwrap();
        let state = Arc::new(AppState::new(storage, settings, providers).unwrap());
        let app = create_router(state.clone());
        Self {
            app,
            state,
            _dir: dir,
        }
    }

    fn with_stub_providers() -> Self {
        let mut providers: Providers = HashMap::new();
        providers.insert(
            Provider::GitHub,
            Arc::new(StubProvider {
                provider: Provider::GitHub,
                id: "583231",
                email: None,
            }),
        );
        providers.insert(
            Provider::Google,
            Arc::new(StubProvider {
                provider: Provider::Google,
                id: "1098",
                email: Some("g@x.com"),
            }),
        );
        Self::with_settings(Settings::default(), providers)
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Register `username` with password `p1`, returning the session cookie
    async fn register(&self, username: &str) -> String {
        let body = format!("username={}&password=p1", username.replace('@', "%40"));
        let response = self.post_form("/register", &body, None).await;
        assert_eq!(location(&response), "/secrets");
        session_cookie(&response).expect("registration sets a session cookie")
    }

    /// Walk the OAuth redirect and callback for `provider` with `code`
    async fn oauth_login(&self, provider: &str, code: &str) -> Response<Body> {
        let consent = self.get(&format!("/auth/{provider}"), None).await;
        assert_eq!(consent.status(), StatusCode::SEE_OTHER);
        let url = location(&consent).to_string();
        assert!(url.starts_with("https://idp.test/authorize"));
        let state = url.split("state=").nth(1).unwrap().to_string();

        self.get(
            &format!("/auth/{provider}/secrets?code={code}&state={state}"),
            None,
        )
        .await
    }
}

fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// The `sid=<token>` pair of a non-empty session cookie being set
fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with("sid=") && pair.len() > "sid=".len())
        .map(str::to_string)
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_public_pages_render() {
    let app = TestApp::new();
    for uri in ["/", "/login", "/register", "/secrets"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
    }
}

#[tokio::test]
async fn test_registration_logs_the_user_in() {
    let app = TestApp::new();
    let cookie = app.register("a@x.com").await;

    let response = app.get("/submit", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("action=\"/submit\""));
}

#[tokio::test]
async fn test_unauthenticated_submit_redirects_to_login() {
    let app = TestApp::new();

    let response = app.get("/submit", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let response = app.post_form("/submit", "secret=s1", None).await;
    assert_eq!(location(&response), "/login");

    let response = app.get("/submit", Some("sid=forged")).await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_duplicate_registration_redirects_back() {
    let app = TestApp::new();
    let first = app.register("a@x.com").await;

    let response = app
        .post_form("/register", "username=a%40x.com&password=other", None)
        .await;
    assert_eq!(location(&response), "/register");
    assert!(session_cookie(&response).is_none());

    // the original account is untouched and still logs in with its password
    let user = app
        .state
        .storage
        .find_user(&UserKey::Local("a@x.com".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(app.state.sessions.user_id(&first[4..]).await, Some(user.id));
    let response = app
        .post_form("/login", "username=a%40x.com&password=p1", None)
        .await;
    assert_eq!(location(&response), "/secrets");
}

#[tokio::test]
async fn test_malformed_registration_redirects_back() {
    let app = TestApp::new();
    let response = app.post_form("/register", "username=a%40x.com", None).await;
    assert_eq!(location(&response), "/register");

    let response = app
        .post_form("/register", "username=&password=p1", None)
        .await;
    assert_eq!(location(&response), "/register");
}

#[tokio::test]
async fn test_login_success_and_failure() {
    let app = TestApp::new();
    app.register("a@x.com").await;

    let response = app
        .post_form("/login", "username=a%40x.com&password=p1", None)
        .await;
    assert_eq!(location(&response), "/secrets");
    let cookie = session_cookie(&response).unwrap();
    assert_eq!(app.get("/submit", Some(&cookie)).await.status(), StatusCode::OK);

    for body in [
        "username=a%40x.com&password=wrong",
        "username=nobody%40x.com&password=p1",
        "password=p1",
    ] {
        let response = app.post_form("/login", body, None).await;
        assert_eq!(location(&response), "/login", "POST /login {body}");
        assert!(session_cookie(&response).is_none());
    }
}

#[tokio::test]
async fn test_logout_revokes_the_session() {
    let app = TestApp::new();
    let cookie = app.register("a@x.com").await;

    let response = app.get("/logout", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let response = app.get("/submit", Some(&cookie)).await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_submitted_secret_is_listed() {
    let app = TestApp::new();
    let cookie = app.register("a@x.com").await;

    let response = app.post_form("/submit", "secret=s1", Some(&cookie)).await;
    assert_eq!(location(&response), "/secrets");

    // listing is public by default
    let page = body_text(app.get("/secrets", None).await).await;
    assert!(page.contains("s1"));
}

#[tokio::test]
async fn test_secrets_keep_submission_order() {
    let app = TestApp::new();
    let cookie = app.register("a@x.com").await;
    app.post_form("/submit", "secret=first+secret", Some(&cookie))
        .await;
    app.post_form("/submit", "secret=second+secret", Some(&cookie))
        .await;

    let page = body_text(app.get("/secrets", Some(&cookie)).await).await;
    let first = page.find("first secret").unwrap();
    let second = page.find("second secret").unwrap();
    assert!(first < second);
}

#[tokio::test]
async fn test_blank_secret_is_rejected() {
    let app = TestApp::new();
    let cookie = app.register("a@x.com").await;

    let response = app.post_form("/submit", "secret=+++", Some(&cookie)).await;
    assert_eq!(location(&response), "/submit");
    assert!(app.state.storage.users_with_secrets().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_secrets_can_be_gated() {
    let settings = Settings {
        secrets_public: false,
        ..Settings::default()
    };
    let app = TestApp::with_settings(settings, HashMap::new());

    let response = app.get("/secrets", None).await;
    assert_eq!(location(&response), "/login");

    let cookie = app.register("a@x.com").await;
    let response = app.get("/secrets", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_oauth_login_is_find_or_create() {
    let app = TestApp::with_stub_providers();

    let response = app.oauth_login("github", "ok").await;
    assert_eq!(location(&response), "/secrets");
    let cookie = session_cookie(&response).unwrap();
    assert_eq!(app.get("/submit", Some(&cookie)).await.status(), StatusCode::OK);

    let key = UserKey::GitHub("583231".to_string());
    let first = app.state.storage.find_user(&key).await.unwrap().unwrap();
    assert_eq!(first.username, None);

    let response = app.oauth_login("github", "ok").await;
    let again = session_cookie(&response).unwrap();
    let token = again.trim_start_matches("sid=");
    assert_eq!(app.state.sessions.user_id(token).await, Some(first.id));
}

#[tokio::test]
async fn test_google_login_records_email_as_username() {
    let app = TestApp::with_stub_providers();

    let response = app.oauth_login("google", "ok").await;
    assert_eq!(location(&response), "/secrets");

    let user = app
        .state
        .storage
        .find_user(&UserKey::Google("1098".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.username.as_deref(), Some("g@x.com"));

    // Google and GitHub identities stay separate users
    app.oauth_login("github", "ok").await;
    let github = app
        .state
        .storage
        .find_user(&UserKey::GitHub("583231".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_ne!(github.id, user.id);
}

#[tokio::test]
async fn test_oauth_failures_redirect_to_login() {
    let app = TestApp::with_stub_providers();

    let response = app.oauth_login("github", "bad").await;
    assert_eq!(location(&response), "/login");
    assert!(session_cookie(&response).is_none());

    let response = app
        .get("/auth/github/secrets?code=ok&state=never-issued", None)
        .await;
    assert_eq!(location(&response), "/login");

    let response = app
        .get("/auth/google/secrets?error=access_denied", None)
        .await;
    assert_eq!(location(&response), "/login");

    let response = app.get("/auth/myspace", None).await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_oauth_state_is_single_use() {
    let app = TestApp::with_stub_providers();

    let consent = app.get("/auth/google", None).await;
    let state = location(&consent).split("state=").nth(1).unwrap().to_string();
    let callback = format!("/auth/google/secrets?code=ok&state={state}");

    assert_eq!(location(&app.get(&callback, None).await), "/secrets");
    assert_eq!(location(&app.get(&callback, None).await), "/login");
}

#[tokio::test]
async fn test_unconfigured_provider_redirects_to_login() {
    let app = TestApp::new();
    let response = app.get("/auth/google", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}
