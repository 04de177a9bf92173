//! GitHub OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with GitHub. The
//! callback is where an [`AccountGrant`] is born: the code exchange
//! response plus a profile fetch feed the claims evaluator's sign-in
//! path, and the resulting claims are sealed into the session cookie.

use axum::{
    Json, Router,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Utc;
use rand::{Rng, distributions::Alphanumeric};
use serde::Deserialize;

use super::claims::{AccountGrant, TokenClaims};
use super::middleware::{
    CurrentSession, OAUTH_STATE_COOKIE, removal_cookie, session_cookie,
};
use super::session::{Session, create_session_token, session_view};
use super::token::evaluate;
use crate::AppState;
use crate::error::AppError;
use crate::metrics::SESSIONS_ISSUED_TOTAL;

/// Create authentication router
///
/// Routes:
/// - GET / - Landing page
/// - GET /login - Login page
/// - GET /auth/github - Redirect to GitHub
/// - GET /auth/github/callback - OAuth callback
/// - POST /logout - Logout
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/", get(index_page))
        .route("/login", get(login_page))
        .route("/auth/github", get(github_redirect))
        .route("/auth/github/callback", get(github_callback))
        .route("/logout", post(logout))
}

// =============================================================================
// Pages
// =============================================================================

/// GET /
async fn index_page() -> impl IntoResponse {
    Html(
        r#"
        <!DOCTYPE html>
        <html>
        <head><title>GitScope</title></head>
        <body>
            <h1>GitScope</h1>
            <p>Browse your repositories and commits through the API under <code>/api/github</code>.</p>
            <p><a href="/login">Sign in</a> &middot; <a href="/auth/session">Session</a></p>
        </body>
        </html>
    "#,
    )
}

/// GET /login
///
/// Renders a simple login page with GitHub sign-in button.
async fn login_page() -> impl IntoResponse {
    Html(
        r#"
        <!DOCTYPE html>
        <html>
        <head><title>Login - GitScope</title></head>
        <body>
            <h1>GitScope</h1>
            <p>Please sign in with GitHub</p>
            <a href="/auth/github">Sign in with GitHub</a>
        </body>
        </html>
    "#,
    )
}

// =============================================================================
// GitHub OAuth
// =============================================================================

/// GET /auth/github
///
/// Redirects user to GitHub authorization page.
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state in cookie
/// 3. Redirect to GitHub with client_id, redirect_uri, scope, state
async fn github_redirect(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let oauth_state = generate_csrf_state();

    let state_cookie = Cookie::build((OAUTH_STATE_COOKIE, oauth_state.clone()))
        .path("/")
        .http_only(true)
        .secure(state.config.should_use_secure_cookies())
        .same_site(SameSite::Lax)
        .build();

    let redirect_uri = format!("{}/auth/github/callback", state.config.server.base_url());
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", &state.config.auth.github.client_id)
        .append_pair("redirect_uri", &redirect_uri)
        .append_pair("scope", &state.config.auth.github.scope)
        .append_pair("state", &oauth_state)
        .finish();
    let location = format!("{}?{}", state.config.github.authorize_url, query);

    Ok((jar.add(state_cookie), Redirect::to(&location)))
}

/// Query parameters from GitHub callback
#[derive(Debug, Deserialize)]
struct GitHubCallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// CSRF state token
    state: Option<String>,
    /// Error code when the user denied authorization
    error: Option<String>,
}

/// Token endpoint response for the authorization-code exchange
#[derive(Debug, Deserialize)]
struct CodeExchangeResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
    error_description: Option<String>,
}

/// GET /auth/github/callback
///
/// Handles OAuth callback from GitHub.
///
/// # Steps
/// 1. Verify CSRF state
/// 2. Exchange code for an account grant
/// 3. Fetch user profile from GitHub
/// 4. Run the sign-in claims evaluation
/// 5. Create session and set cookie
/// 6. Redirect to home
async fn github_callback(
    State(state): State<AppState>,
    Query(query): Query<GitHubCallbackQuery>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    if let Some(error) = query.error {
        return Err(AppError::Validation(format!(
            "GitHub authorization failed: {error}"
        )));
    }

    let callback_state = query.state.ok_or(AppError::Unauthorized)?;
    verify_csrf_state(&callback_state, &jar)?;

    let code = query
        .code
        .ok_or_else(|| AppError::Validation("Missing authorization code".to_string()))?;

    let grant = exchange_code(&state, &code).await?;

    let github_user = state.github.rest.get_user(&grant.access_token).await?;
    let profile = github_user.into();

    // Sign-in path of the claims evaluation: a full overwrite, which
    // also clears any error a previous session carried.
    let claims = evaluate(
        TokenClaims::default(),
        Some(&grant),
        Some(&profile),
        state.refresher.as_ref(),
    )
    .await;

    let session = Session::new(claims, state.config.auth.session_max_age);
    let token = create_session_token(&session, &state.config.auth.session_secret)?;
    SESSIONS_ISSUED_TOTAL.inc();
    tracing::info!(login = %profile.login, "GitHub sign-in completed");

    let jar = jar
        .add(session_cookie(
            token,
            state.config.should_use_secure_cookies(),
        ))
        .remove(removal_cookie(OAUTH_STATE_COOKIE));

    Ok((jar, Redirect::to("/")))
}

/// Exchange an authorization code for an account grant at the token
/// endpoint.
async fn exchange_code(state: &AppState, code: &str) -> Result<AccountGrant, AppError> {
    let redirect_uri = format!("{}/auth/github/callback", state.config.server.base_url());

    let response = state
        .http_client
        .post(&state.config.github.token_url)
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&[
            ("client_id", state.config.auth.github.client_id.as_str()),
            (
                "client_secret",
                state.config.auth.github.client_secret.as_str(),
            ),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
        ])
        .send()
        .await?;

    let status = response.status();
    let body: CodeExchangeResponse = response
        .json()
        .await
        .map_err(|e| AppError::OAuthExchange(format!("unreadable token response: {e}")))?;

    if !status.is_success() || body.error.is_some() {
        let detail = body
            .error_description
            .or(body.error)
            .unwrap_or_else(|| status.to_string());
        return Err(AppError::OAuthExchange(detail));
    }

    let access_token = body
        .access_token
        .ok_or_else(|| AppError::OAuthExchange("response carried no access token".to_string()))?;

    Ok(AccountGrant {
        access_token,
        refresh_token: body.refresh_token,
        expires_at: body.expires_in.map(|secs| Utc::now().timestamp() + secs),
    })
}

// =============================================================================
// Session endpoint
// =============================================================================

/// GET /auth/session
///
/// Returns the externally visible projection of the current session.
/// Routed behind `require_session`, so the claims it reports have been
/// evaluated (and possibly refreshed) for this request. A session whose
/// refresh failed still answers 200 here, with the `error` field set,
/// so the UI can prompt for a re-sign-in.
pub async fn current_session(CurrentSession(session): CurrentSession) -> impl IntoResponse {
    Json(session_view(&session))
}

// =============================================================================
// Logout
// =============================================================================

/// POST /logout
///
/// Clears session cookie and redirects to login. This is where claims
/// are discarded; the claims core never deletes state itself.
async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar
        .remove(removal_cookie(super::middleware::SESSION_COOKIE))
        .remove(removal_cookie(OAUTH_STATE_COOKIE));

    (jar, Redirect::to("/login"))
}

// =============================================================================
// Helpers
// =============================================================================

/// Generate a random CSRF state token
fn generate_csrf_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Verify CSRF state from cookie matches callback state
fn verify_csrf_state(state: &str, jar: &CookieJar) -> Result<(), AppError> {
    let stored = jar.get(OAUTH_STATE_COOKIE).ok_or(AppError::Unauthorized)?;
    if stored.value() != state {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}
