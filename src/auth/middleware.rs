//! Authentication middleware
//!
//! Protects routes that require a GitHub session. This is the caller
//! the claims core is written for: it reads the stored claims out of
//! the signed cookie, runs one evaluation (which may transparently
//! refresh the access token), and re-persists the claims when they
//! changed.

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};

use super::session::{Session, create_session_token, verify_session_token};
use super::token::evaluate;
use crate::AppState;
use crate::error::AppError;

/// Cookie carrying the signed session token
pub const SESSION_COOKIE: &str = "session";

/// Cookie carrying the OAuth CSRF state during the sign-in round trip
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// Build the session cookie around a signed token.
pub(crate) fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie used to clear `name` on the client.
pub(crate) fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}

/// Middleware to require a GitHub session
///
/// Verifies the session cookie, evaluates the stored token claims
/// (refreshing the access token when it expired), exposes the session
/// to handlers through request extensions, and writes the refreshed
/// claims back into the cookie when the evaluation changed them.
///
/// Requests without a usable session get the 401 body protected routes
/// are contracted to return.
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/api/github/...", ...)
///     .layer(middleware::from_fn_with_state(state, require_session));
/// ```
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .ok_or(AppError::NotAuthenticated)?;

    // Any invalid or expired session token is indistinguishable from a
    // missing one as far as callers are concerned.
    let session = verify_session_token(&token, &state.config.auth.session_secret)
        .map_err(|_| AppError::NotAuthenticated)?;

    // One evaluation per request; no grant outside the sign-in flow.
    let evaluated = evaluate(session.claims.clone(), None, None, state.refresher.as_ref()).await;
    let changed = evaluated != session.claims;
    let session = Session {
        claims: evaluated,
        ..session
    };

    // Add session to request extensions
    request.extensions_mut().insert(session.clone());

    let response = next.run(request).await;

    // Re-persist the claims the evaluation produced. Error-bearing
    // claims are persisted too: the next request re-evaluates them.
    if changed {
        let token = create_session_token(&session, &state.config.auth.session_secret)?;
        let cookie = session_cookie(token, state.config.should_use_secure_cookies());
        return Ok((jar.add(cookie), response).into_response());
    }

    Ok(response)
}

/// Extractor for the current session
///
/// Use in handlers behind [`require_session`] to get the evaluated
/// session.
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentSession(session): CurrentSession,
/// ) -> impl IntoResponse {
///     format!("token: {:?}", session.access_token())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(CurrentSession)
            .ok_or(AppError::NotAuthenticated)
    }
}
