//! GitScope - a server-side GitHub browser
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - GitHub proxy endpoints (/api/github/*)                   │
//! │  - OAuth sign-in flow and session endpoint                  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Claims Core                              │
//! │  - Token state evaluation (pass-through / sign-in / refresh)│
//! │  - Provider token-endpoint exchange                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     GitHub Clients                           │
//! │  - REST (profile, repos, activity, commit diffs)            │
//! │  - GraphQL (commit objects, history pages)                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers for the GitHub proxy and metrics
//! - `auth`: token claims core, OAuth flow, sessions, middleware
//! - `github`: REST and GraphQL data-fetch clients
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod github;
pub mod metrics;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains the shared
/// HTTP client and the clients built on top of it. There is no other
/// shared state: token claims travel with each request's session.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// HTTP client shared by all outbound calls
    pub http_client: Arc<reqwest::Client>,

    /// GitHub REST + GraphQL clients
    pub github: Arc<github::GitHubClient>,

    /// Provider token-endpoint refresher for the claims core
    pub refresher: Arc<auth::TokenRefresher>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Build the shared HTTP client
    /// 2. Build the GitHub clients on top of it
    /// 3. Build the token refresher with the configured credentials
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let http_client = Arc::new(
            reqwest::Client::builder()
                .user_agent("GitScope/0.1.0")
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .map_err(|e| error::AppError::Internal(e.into()))?,
        );

        let github = Arc::new(github::GitHubClient::new(http_client.clone(), &config.github));

        let refresher = Arc::new(auth::TokenRefresher::new(
            http_client.clone(),
            config.github.token_url.clone(),
            config.auth.github.client_id.clone(),
            config.auth.github.client_secret.clone(),
        ));

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            http_client,
            github,
            refresher,
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use axum::routing::get;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);

    // Every session-bearing route goes through one claims evaluation
    // per request; the middleware also re-persists refreshed claims.
    let protected = Router::new()
        .route("/auth/session", get(auth::current_session))
        .nest("/api/github", api::github_router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(auth::auth_router())
        .merge(protected)
        .layer(axum::middleware::from_fn(api::track_http_metrics))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
        .merge(api::metrics_router())
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
