//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed: the signed payload carries
//! the token claims themselves, and every request hands them back for
//! re-evaluation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::claims::{AuthErrorKind, TokenClaims, UserProfile};

/// User session data
///
/// Stored in a signed cookie. Wraps the [`TokenClaims`] persisted
/// across requests, plus the session's own lifetime (independent of
/// the access token's expiry: an unexpired session with an expired
/// access token is the refresh case, an expired session is a 401).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Token claims carried across requests
    pub claims: TokenClaims,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a session around freshly evaluated claims.
    pub fn new(claims: TokenClaims, max_age_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            claims,
            created_at: now,
            expires_at: now + Duration::seconds(max_age_secs),
        }
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// The access token, if the claims are usable.
    ///
    /// Error-bearing claims count as having no token even when a stale
    /// token string is still present.
    pub fn access_token(&self) -> Option<&str> {
        if self.claims.error.is_some() {
            return None;
        }
        self.claims.access_token.as_deref()
    }
}

/// Externally visible projection of a session.
///
/// What `/auth/session` returns to the UI: identity, the current
/// access token copy, and the refresh error (if any) so the client can
/// prompt for a re-sign-in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AuthErrorKind>,
    pub expires_at: DateTime<Utc>,
}

/// Project a session into its externally visible shape.
pub fn session_view(session: &Session) -> SessionView {
    SessionView {
        user: session.claims.user.clone(),
        access_token: session.claims.access_token.clone(),
        error: session.claims.error,
        expires_at: session.expires_at,
    }
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
///
/// # Arguments
/// * `session` - Session data to encode
/// * `secret` - HMAC secret key
///
/// # Returns
/// Signed token string
pub fn create_session_token(
    session: &Session,
    secret: &str,
) -> Result<String, crate::error::AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    // 1. Serialize session to JSON
    let payload =
        serde_json::to_string(session).map_err(|e| crate::error::AppError::Internal(e.into()))?;

    // 2. Base64 encode the payload
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    // 3. Create HMAC-SHA256 signature
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::error::AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    // 4. Return "{payload}.{signature}"
    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Arguments
/// * `token` - Token string to verify
/// * `secret` - HMAC secret key
///
/// # Returns
/// Decoded session if valid
///
/// # Errors
/// Returns error if signature is invalid, token is malformed,
/// or the session has expired
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, crate::error::AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    // 1. Split token into payload and signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 2 {
        return Err(crate::error::AppError::Unauthorized);
    }

    let payload_b64 = parts[0];
    let signature_b64 = parts[1];

    // 2. Verify HMAC signature
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::error::AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());

    let expected_signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| crate::error::AppError::Unauthorized)?;

    mac.verify_slice(&expected_signature)
        .map_err(|_| crate::error::AppError::InvalidSignature)?;

    // 3. Decode and deserialize payload
    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| crate::error::AppError::Unauthorized)?;

    let payload_str =
        String::from_utf8(payload_bytes).map_err(|_| crate::error::AppError::Unauthorized)?;

    let session: Session =
        serde_json::from_str(&payload_str).map_err(|_| crate::error::AppError::Unauthorized)?;

    // 4. Check if session is expired
    if session.is_expired() {
        return Err(crate::error::AppError::Unauthorized);
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-32-bytes-long!!!";

    fn session_with_token(access_token: &str) -> Session {
        Session::new(
            TokenClaims {
                access_token: Some(access_token.to_string()),
                refresh_token: Some("r1".to_string()),
                access_token_expires_at: Some(Utc::now().timestamp_millis() + 3_600_000),
                user: None,
                error: None,
            },
            604_800,
        )
    }

    #[test]
    fn token_round_trips() {
        let session = session_with_token("a1");
        let token = create_session_token(&session, SECRET).expect("token created");

        let decoded = verify_session_token(&token, SECRET).expect("token verifies");
        assert_eq!(decoded, session);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let session = session_with_token("a1");
        let token = create_session_token(&session, SECRET).expect("token created");

        let forged_payload = {
            use base64::{Engine as _, engine::general_purpose};
            let forged = session_with_token("forged");
            let json = serde_json::to_string(&forged).unwrap();
            general_purpose::URL_SAFE_NO_PAD.encode(json.as_bytes())
        };
        let signature = token.split('.').nth(1).unwrap();
        let tampered = format!("{forged_payload}.{signature}");

        let error = verify_session_token(&tampered, SECRET).expect_err("tampering must fail");
        assert!(matches!(error, crate::error::AppError::InvalidSignature));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let session = session_with_token("a1");
        let token = create_session_token(&session, SECRET).expect("token created");

        let error = verify_session_token(&token, "another-secret-key-32-bytes-long")
            .expect_err("wrong secret must fail");
        assert!(matches!(error, crate::error::AppError::InvalidSignature));
    }

    #[test]
    fn expired_session_is_rejected() {
        let session = Session {
            expires_at: Utc::now() - Duration::seconds(1),
            ..session_with_token("a1")
        };
        let token = create_session_token(&session, SECRET).expect("token created");

        let error = verify_session_token(&token, SECRET).expect_err("expired session must fail");
        assert!(matches!(error, crate::error::AppError::Unauthorized));
    }

    #[test]
    fn error_bearing_claims_have_no_usable_token() {
        let mut session = session_with_token("a1");
        session.claims.error = Some(super::super::claims::AuthErrorKind::RefreshAccessTokenError);

        assert_eq!(session.access_token(), None);

        let view = session_view(&session);
        assert_eq!(view.access_token.as_deref(), Some("a1"));
        assert!(view.error.is_some());
    }
}
