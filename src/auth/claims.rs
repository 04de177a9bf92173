//! Token claims carried across requests
//!
//! `TokenClaims` is the unit of state the session layer persists between
//! requests: the GitHub credentials, their expiry, the identity snapshot
//! captured at sign-in, and (when a refresh failed) an error marker.
//! Refresh failures are data here, never exceptions.

use serde::{Deserialize, Serialize};

/// Default access-token lifetime when the provider omits one: 8 hours.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 8 * 60 * 60;

/// Why the last refresh attempt produced no usable access token.
///
/// Both are recoverable: a full re-sign-in always clears them, and
/// `RefreshAccessTokenError` is also retried on the next request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthErrorKind {
    /// Claims expired and no refresh token was ever stored; the only
    /// remedy is a full re-sign-in. No network call was made.
    RefreshTokenMissing,
    /// A refresh attempt was made and failed (provider rejection,
    /// malformed response, or transport failure).
    RefreshAccessTokenError,
}

/// Identity snapshot captured at sign-in time.
///
/// Carried through unchanged on every refresh; only a new sign-in
/// replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub login: String,
    pub id: u64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: String,
}

/// Credentials granted by GitHub at the authorization-code exchange.
///
/// Input-only: produced by the OAuth callback, consumed by the
/// evaluator's sign-in path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Absolute expiry instant in seconds since epoch, if the provider
    /// supplied a token lifetime.
    pub expires_at: Option<i64>,
}

/// The token/session state record persisted across requests.
///
/// All fields are optional so that absence round-trips as absence on
/// the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Current bearer credential for the GitHub API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Credential used to mint a new access token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Absolute access-token expiry instant, ms since epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_expires_at: Option<i64>,

    /// Identity snapshot from sign-in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,

    /// Set when a refresh attempt failed or was impossible; absent on
    /// success. Consumers must treat error-bearing claims as having no
    /// access token, even though stale token fields may still be present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AuthErrorKind>,
}

impl TokenClaims {
    /// Whether the stored access token is still inside its lifetime at
    /// instant `now_ms`. A missing expiry counts as not fresh.
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        self.access_token_expires_at
            .is_some_and(|expires_at| now_ms < expires_at)
    }
}
