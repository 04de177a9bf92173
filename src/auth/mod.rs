//! GitHub OAuth authentication
//!
//! Handles:
//! - Token claims and their per-request evaluation (the core)
//! - GitHub OAuth flow
//! - Session management
//! - Authentication middleware

pub mod claims;
mod middleware;
mod oauth;
pub mod session;
mod token;

pub use claims::{AccountGrant, AuthErrorKind, TokenClaims, UserProfile};
pub use middleware::{CurrentSession, OAUTH_STATE_COOKIE, SESSION_COOKIE, require_session};
pub use oauth::{auth_router, current_session};
pub use session::{
    Session, SessionView, create_session_token, session_view, verify_session_token,
};
pub use token::{RefreshTokens, TokenRefresher, evaluate};
