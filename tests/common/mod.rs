//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use chrono::Utc;
use gitscope::auth::{Session, TokenClaims, UserProfile, create_session_token};
use gitscope::{AppState, config};
use tokio::net::TcpListener;

static METRICS_INIT: Once = Once::new();

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance with the default test config
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Create a test server whose token endpoint points at a stub
    pub async fn with_token_url(token_url: &str) -> Self {
        let mut config = test_config();
        config.github.token_url = token_url.to_string();
        Self::with_config(config).await
    }

    pub async fn with_config(config: config::AppConfig) -> Self {
        // The registry is process-global; register instruments once.
        METRICS_INIT.call_once(gitscope::metrics::init_metrics);

        // Initialize app state
        let state = AppState::new(config).unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = gitscope::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Sign `claims` into a session cookie the server will accept.
    pub fn session_cookie(&self, claims: TokenClaims) -> String {
        let session = Session::new(claims, self.state.config.auth.session_max_age);
        let token = create_session_token(&session, &self.state.config.auth.session_secret)
            .expect("session token created");
        format!("session={token}")
    }
}

/// Create test configuration
pub fn test_config() -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            domain: "localhost".to_string(),
            protocol: "http".to_string(),
        },
        auth: config::AuthConfig {
            session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
            session_max_age: 604800,
            github: config::GitHubOAuthConfig {
                client_id: "test-client-id".to_string(),
                client_secret: "test-client-secret".to_string(),
                scope: "read:user user:email repo".to_string(),
            },
        },
        github: config::GitHubConfig {
            api_base_url: "https://api.github.com".to_string(),
            graphql_url: "https://api.github.com/graphql".to_string(),
            authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

pub fn test_profile() -> UserProfile {
    UserProfile {
        login: "octocat".to_string(),
        id: 583231,
        name: Some("The Octocat".to_string()),
        email: None,
        avatar_url: "https://avatars.githubusercontent.com/u/583231".to_string(),
    }
}

/// Claims with an access token well inside its lifetime.
pub fn fresh_claims() -> TokenClaims {
    TokenClaims {
        access_token: Some("a1".to_string()),
        refresh_token: Some("r1".to_string()),
        access_token_expires_at: Some(Utc::now().timestamp_millis() + 3_600_000),
        user: Some(test_profile()),
        error: None,
    }
}

/// Claims whose access token expired a second ago.
pub fn expired_claims() -> TokenClaims {
    TokenClaims {
        access_token_expires_at: Some(Utc::now().timestamp_millis() - 1000),
        ..fresh_claims()
    }
}

/// Local stand-in for the provider's token endpoint. Returns the
/// endpoint URL and a counter of received requests.
pub async fn spawn_token_endpoint(
    status: u16,
    body: serde_json::Value,
) -> (String, Arc<AtomicUsize>) {
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::post;

    let hits = Arc::new(AtomicUsize::new(0));

    let app = Router::new().route(
        "/token",
        post({
            let hits = hits.clone();
            move || {
                let hits = hits.clone();
                let body = body.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::from_u16(status).unwrap(), axum::Json(body))
                }
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/token"), hits)
}
