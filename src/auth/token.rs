//! Token state evaluation and refresh
//!
//! The one piece of this application with real state transitions. On
//! every session-bearing request the session layer hands the stored
//! [`TokenClaims`] to [`evaluate`], which decides between three
//! mutually exclusive paths:
//!
//! ```text
//! [no claims] --(sign-in grant)--> [valid]
//! [valid] --(now < expiry)--> [valid]  (no-op)
//! [valid] --(expired, refresh token present)--> refresh --ok--> [valid]
//!                                                       --err--> [errored]
//! [valid] --(expired, refresh token absent)--> [errored: RefreshTokenMissing]
//! [errored] --(sign-in grant)--> [valid]
//! ```
//!
//! `[errored]` is not terminal: every later request re-evaluates and may
//! re-attempt the refresh, and a full re-sign-in always resets to
//! `[valid]`. No backoff, no attempt counter, and at most one network
//! call per evaluation.

use std::sync::Arc;

use axum::async_trait;
use chrono::Utc;
use serde::Deserialize;

use super::claims::{AccountGrant, AuthErrorKind, DEFAULT_TOKEN_LIFETIME_SECS, TokenClaims, UserProfile};
use crate::metrics::TOKEN_REFRESHES_TOTAL;

/// Seam between the evaluator and the provider exchange.
///
/// The result is total: refresh failures come back as error-bearing
/// claims, never as an `Err`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RefreshTokens: Send + Sync {
    async fn refresh(&self, claims: TokenClaims) -> TokenClaims;
}

/// Decide what to do with the claims carried by the current request.
///
/// - `grant` and `profile` both present (initial sign-in): prior claims
///   are discarded and fully overwritten from the grant.
/// - Unexpired access token: the claims pass through unchanged.
/// - Otherwise: the refresher decides, and its result is returned
///   verbatim.
pub async fn evaluate<R>(
    claims: TokenClaims,
    grant: Option<&AccountGrant>,
    profile: Option<&UserProfile>,
    refresher: &R,
) -> TokenClaims
where
    R: RefreshTokens + ?Sized,
{
    if let (Some(grant), Some(profile)) = (grant, profile) {
        let expires_at = grant
            .expires_at
            .map(|secs| secs * 1000)
            .unwrap_or_else(|| Utc::now().timestamp_millis() + DEFAULT_TOKEN_LIFETIME_SECS * 1000);

        return TokenClaims {
            access_token: Some(grant.access_token.clone()),
            refresh_token: grant.refresh_token.clone(),
            access_token_expires_at: Some(expires_at),
            user: Some(profile.clone()),
            error: None,
        };
    }

    if claims.is_fresh(Utc::now().timestamp_millis()) {
        return claims;
    }

    refresher.refresh(claims).await
}

/// Success/error body of the provider's token endpoint.
///
/// GitHub signals failure inside a 200 body (`error` member) as often
/// as through the status code, so both are checked.
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Exchanges a refresh token for new credentials against the provider's
/// token endpoint.
///
/// Credentials and endpoint are injected at construction; nothing here
/// reads process environment.
pub struct TokenRefresher {
    http: Arc<reqwest::Client>,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl TokenRefresher {
    pub fn new(
        http: Arc<reqwest::Client>,
        token_url: String,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            http,
            token_url,
            client_id,
            client_secret,
        }
    }

    /// Preserve the incoming claims and mark the refresh as failed.
    fn refresh_failed(claims: TokenClaims) -> TokenClaims {
        TokenClaims {
            error: Some(AuthErrorKind::RefreshAccessTokenError),
            ..claims
        }
    }
}

#[async_trait]
impl RefreshTokens for TokenRefresher {
    async fn refresh(&self, claims: TokenClaims) -> TokenClaims {
        // Fast-fail guard: "nothing to refresh with" is distinct from
        // "refresh attempted and failed" and makes no network call.
        let Some(refresh_token) = claims.refresh_token.clone() else {
            TOKEN_REFRESHES_TOTAL
                .with_label_values(&["missing_refresh_token"])
                .inc();
            return TokenClaims {
                error: Some(AuthErrorKind::RefreshTokenMissing),
                ..claims
            };
        };

        // Exactly one outbound call per invocation. Retry policy lives in
        // the request cycle: an expired token simply triggers another
        // evaluation next time.
        let response = self
            .http
            .post(&self.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(%error, "Token refresh request failed in transit");
                TOKEN_REFRESHES_TOTAL
                    .with_label_values(&["transport_error"])
                    .inc();
                return Self::refresh_failed(claims);
            }
        };

        let status = response.status();
        let body = match response.json::<TokenEndpointResponse>().await {
            Ok(body) => body,
            Err(error) => {
                tracing::warn!(%status, %error, "Token endpoint returned an unreadable body");
                TOKEN_REFRESHES_TOTAL
                    .with_label_values(&["provider_rejected"])
                    .inc();
                return Self::refresh_failed(claims);
            }
        };

        if !status.is_success() || body.error.is_some() {
            tracing::warn!(
                %status,
                provider_error = body.error.as_deref().unwrap_or("none"),
                detail = body.error_description.as_deref().unwrap_or(""),
                "Token endpoint rejected the refresh"
            );
            TOKEN_REFRESHES_TOTAL
                .with_label_values(&["provider_rejected"])
                .inc();
            return Self::refresh_failed(claims);
        }

        let Some(access_token) = body.access_token else {
            tracing::warn!("Token endpoint response carried no access token");
            TOKEN_REFRESHES_TOTAL
                .with_label_values(&["provider_rejected"])
                .inc();
            return Self::refresh_failed(claims);
        };

        let lifetime_secs = body.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        TOKEN_REFRESHES_TOTAL.with_label_values(&["refreshed"]).inc();
        tracing::debug!("Access token refreshed");

        TokenClaims {
            access_token: Some(access_token),
            // Providers are not required to rotate refresh tokens every
            // cycle; keep the previous one unless a new one arrived.
            refresh_token: body.refresh_token.or(claims.refresh_token),
            access_token_expires_at: Some(Utc::now().timestamp_millis() + lifetime_secs * 1000),
            user: claims.user,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::post;

    fn profile() -> UserProfile {
        UserProfile {
            login: "octocat".to_string(),
            id: 583231,
            name: Some("The Octocat".to_string()),
            email: None,
            avatar_url: "https://avatars.githubusercontent.com/u/583231".to_string(),
        }
    }

    fn expired_claims() -> TokenClaims {
        TokenClaims {
            access_token: Some("a1".to_string()),
            refresh_token: Some("r1".to_string()),
            access_token_expires_at: Some(Utc::now().timestamp_millis() - 1000),
            user: Some(profile()),
            error: None,
        }
    }

    /// Local stand-in for the provider's token endpoint.
    struct TokenEndpointStub {
        url: String,
        hits: Arc<AtomicUsize>,
        last_body: Arc<Mutex<String>>,
    }

    async fn spawn_token_endpoint(status: u16, body: serde_json::Value) -> TokenEndpointStub {
        let hits = Arc::new(AtomicUsize::new(0));
        let last_body = Arc::new(Mutex::new(String::new()));

        let app = Router::new().route(
            "/token",
            post({
                let hits = hits.clone();
                let last_body = last_body.clone();
                move |request_body: String| {
                    let hits = hits.clone();
                    let last_body = last_body.clone();
                    let body = body.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        *last_body.lock().unwrap() = request_body;
                        (StatusCode::from_u16(status).unwrap(), axum::Json(body))
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TokenEndpointStub {
            url: format!("http://{addr}/token"),
            hits,
            last_body,
        }
    }

    fn refresher_for(stub_url: &str) -> TokenRefresher {
        TokenRefresher::new(
            Arc::new(reqwest::Client::new()),
            stub_url.to_string(),
            "test-client-id".to_string(),
            "test-client-secret".to_string(),
        )
    }

    #[tokio::test]
    async fn unexpired_claims_pass_through_unchanged() {
        let claims = TokenClaims {
            access_token: Some("a1".to_string()),
            refresh_token: Some("r1".to_string()),
            access_token_expires_at: Some(Utc::now().timestamp_millis() + 3_600_000),
            user: Some(profile()),
            error: None,
        };

        // No expectations set: any delegation to the refresher panics.
        let refresher = MockRefreshTokens::new();
        let result = evaluate(claims.clone(), None, None, &refresher).await;

        assert_eq!(result, claims);
    }

    #[tokio::test]
    async fn sign_in_grant_overwrites_prior_claims() {
        let prior = TokenClaims {
            access_token: Some("stale".to_string()),
            refresh_token: None,
            access_token_expires_at: Some(0),
            user: None,
            error: Some(AuthErrorKind::RefreshAccessTokenError),
        };
        let expires_at = Utc::now().timestamp() + 3600;
        let grant = AccountGrant {
            access_token: "granted-access".to_string(),
            refresh_token: Some("granted-refresh".to_string()),
            expires_at: Some(expires_at),
        };

        let refresher = MockRefreshTokens::new();
        let result = evaluate(prior, Some(&grant), Some(&profile()), &refresher).await;

        assert_eq!(result.access_token.as_deref(), Some("granted-access"));
        assert_eq!(result.refresh_token.as_deref(), Some("granted-refresh"));
        assert_eq!(result.access_token_expires_at, Some(expires_at * 1000));
        assert_eq!(result.user, Some(profile()));
        assert_eq!(result.error, None);
    }

    #[tokio::test]
    async fn sign_in_without_provider_lifetime_defaults_to_eight_hours() {
        let grant = AccountGrant {
            access_token: "granted-access".to_string(),
            refresh_token: None,
            expires_at: None,
        };

        let refresher = MockRefreshTokens::new();
        let before = Utc::now().timestamp_millis();
        let result = evaluate(TokenClaims::default(), Some(&grant), Some(&profile()), &refresher).await;
        let after = Utc::now().timestamp_millis();

        let expires_at = result.access_token_expires_at.expect("expiry is set");
        assert!(expires_at > before + 7 * 3_600_000);
        assert!(expires_at < after + 9 * 3_600_000);
        assert_eq!(result.refresh_token, None);
        assert_eq!(result.error, None);
    }

    #[tokio::test]
    async fn expired_claims_are_delegated_and_returned_verbatim() {
        let claims = expired_claims();
        let refreshed = TokenClaims {
            access_token: Some("fresh".to_string()),
            ..claims.clone()
        };

        let mut refresher = MockRefreshTokens::new();
        let delegated = claims.clone();
        let returned = refreshed.clone();
        refresher
            .expect_refresh()
            .times(1)
            .withf(move |c| *c == delegated)
            .returning(move |_| returned.clone());

        let result = evaluate(claims, None, None, &refresher).await;
        assert_eq!(result, refreshed);
    }

    #[tokio::test]
    async fn missing_refresh_token_fails_fast_without_network() {
        let stub = spawn_token_endpoint(200, serde_json::json!({"access_token": "x"})).await;
        let refresher = refresher_for(&stub.url);

        let claims = TokenClaims {
            refresh_token: None,
            ..expired_claims()
        };
        let result = refresher.refresh(claims).await;

        assert_eq!(result.error, Some(AuthErrorKind::RefreshTokenMissing));
        assert_eq!(result.access_token.as_deref(), Some("a1"));
        assert_eq!(result.user, Some(profile()));
        assert_eq!(stub.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_refresh_replaces_tokens() {
        let stub = spawn_token_endpoint(
            200,
            serde_json::json!({
                "access_token": "new-access-token",
                "refresh_token": "new-refresh-token",
                "expires_in": 3600,
            }),
        )
        .await;
        let refresher = refresher_for(&stub.url);

        let before = Utc::now().timestamp_millis();
        let result = refresher.refresh(expired_claims()).await;

        assert_eq!(result.access_token.as_deref(), Some("new-access-token"));
        assert_eq!(result.refresh_token.as_deref(), Some("new-refresh-token"));
        assert!(result.access_token_expires_at.expect("expiry is set") > before);
        assert_eq!(result.error, None);
        assert_eq!(result.user, Some(profile()));
        assert_eq!(stub.hits.load(Ordering::SeqCst), 1);

        let sent = stub.last_body.lock().unwrap().clone();
        assert!(sent.contains("grant_type=refresh_token"));
        assert!(sent.contains("refresh_token=r1"));
        assert!(sent.contains("client_id=test-client-id"));
        assert!(sent.contains("client_secret=test-client-secret"));
    }

    #[tokio::test]
    async fn refresh_token_is_retained_when_provider_does_not_rotate() {
        // Response also omits expires_in, exercising the 8 hour default.
        let stub =
            spawn_token_endpoint(200, serde_json::json!({"access_token": "new-access-token"})).await;
        let refresher = refresher_for(&stub.url);

        let before = Utc::now().timestamp_millis();
        let result = refresher.refresh(expired_claims()).await;

        assert_eq!(result.access_token.as_deref(), Some("new-access-token"));
        assert_eq!(result.refresh_token.as_deref(), Some("r1"));
        assert_eq!(result.error, None);

        let expires_at = result.access_token_expires_at.expect("expiry is set");
        assert!(expires_at > before + 7 * 3_600_000);
        assert!(expires_at < before + 9 * 3_600_000);
    }

    #[tokio::test]
    async fn provider_rejection_preserves_stale_fields() {
        let stub = spawn_token_endpoint(
            400,
            serde_json::json!({"error": "bad_refresh_token", "error_description": "The refresh token passed is incorrect"}),
        )
        .await;
        let refresher = refresher_for(&stub.url);

        let result = refresher.refresh(expired_claims()).await;

        assert_eq!(result.error, Some(AuthErrorKind::RefreshAccessTokenError));
        assert_eq!(result.access_token.as_deref(), Some("a1"));
        assert_eq!(result.refresh_token.as_deref(), Some("r1"));
        assert_eq!(result.user, Some(profile()));
        assert_eq!(stub.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn error_body_inside_ok_status_is_a_rejection() {
        // GitHub reports bad grants in a 200 body.
        let stub = spawn_token_endpoint(200, serde_json::json!({"error": "bad_refresh_token"})).await;
        let refresher = refresher_for(&stub.url);

        let result = refresher.refresh(expired_claims()).await;

        assert_eq!(result.error, Some(AuthErrorKind::RefreshAccessTokenError));
        assert_eq!(result.access_token.as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn transport_failure_preserves_stale_fields() {
        // Nothing listens on the discard port; the call never completes.
        let refresher = refresher_for("http://127.0.0.1:9/token");

        let result = refresher.refresh(expired_claims()).await;

        assert_eq!(result.error, Some(AuthErrorKind::RefreshAccessTokenError));
        assert_eq!(result.access_token.as_deref(), Some("a1"));
        assert_eq!(result.refresh_token.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn expired_claims_refresh_end_to_end() {
        let stub = spawn_token_endpoint(
            200,
            serde_json::json!({
                "access_token": "new-access-token",
                "refresh_token": "new-refresh-token",
                "expires_in": 3600,
            }),
        )
        .await;
        let refresher = refresher_for(&stub.url);

        let before = Utc::now().timestamp_millis();
        let result = evaluate(expired_claims(), None, None, &refresher).await;
        let after = Utc::now().timestamp_millis();

        assert_eq!(result.access_token.as_deref(), Some("new-access-token"));
        assert_eq!(result.refresh_token.as_deref(), Some("new-refresh-token"));
        let expires_at = result.access_token_expires_at.expect("expiry is set");
        assert!(expires_at >= before + 3_600_000);
        assert!(expires_at <= after + 3_600_000);
        assert_eq!(result.error, None);
    }
}
