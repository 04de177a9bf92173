//! Error types for GitScope
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.
//!
//! Token refresh failures are deliberately NOT represented here: the
//! claims core records them as data on the claims themselves (see
//! `auth::claims::AuthErrorKind`) and never raises them as errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
///
/// This enum represents all possible errors that can occur
/// in the application. It implements `IntoResponse` to
/// automatically convert errors to appropriate HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Protected route accessed without a usable GitHub session (401)
    #[error("Not authenticated with GitHub")]
    NotAuthenticated,

    /// Authentication required (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Session token signature verification failed (401)
    #[error("Invalid signature")]
    InvalidSignature,

    /// Validation error (400)
    #[error("{0}")]
    Validation(String),

    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// GitHub API rate limit exhausted (429)
    #[error("GitHub API rate limit exceeded")]
    RateLimited,

    /// GitHub rejected the access token (502)
    #[error("GitHub token expired or invalid")]
    TokenRejected,

    /// GitHub REST API error (502)
    #[error("GitHub REST API error ({status}): {message}")]
    GitHub { status: u16, message: String },

    /// GitHub GraphQL API error (502)
    #[error("GitHub GraphQL error: {0}")]
    GraphQl(String),

    /// OAuth authorization-code exchange failed (502)
    #[error("OAuth code exchange failed: {0}")]
    OAuthExchange(String),

    /// HTTP client error (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Encryption/signing error (500)
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message, error_type) = match &self {
            AppError::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                self.to_string(),
                "not_authenticated",
            ),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string(), "unauthorized"),
            AppError::InvalidSignature => (
                StatusCode::UNAUTHORIZED,
                self.to_string(),
                "invalid_signature",
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "validation"),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), "not_found"),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                self.to_string(),
                "rate_limited",
            ),
            AppError::TokenRejected => {
                (StatusCode::BAD_GATEWAY, self.to_string(), "token_rejected")
            }
            AppError::GitHub { .. } => (StatusCode::BAD_GATEWAY, self.to_string(), "github"),
            AppError::GraphQl(_) => (StatusCode::BAD_GATEWAY, self.to_string(), "graphql"),
            AppError::OAuthExchange(_) => {
                (StatusCode::BAD_GATEWAY, self.to_string(), "oauth_exchange")
            }
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, self.to_string(), "http_client"),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), "config"),
            AppError::Encryption(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), "encryption")
            }
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "internal",
            ),
        };

        // Record error metric
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL
            .with_label_values(&[error_type, "unknown"])
            .inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
