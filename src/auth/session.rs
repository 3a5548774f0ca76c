//! Short-lived session tokens.
//!
//! A token is an HS256 JWT signed with a server-held secret that no client
//! ever sees. It is stateless: validity is decided entirely by its own
//! signature and `exp` claim, so there is no revocation short of rotating
//! the session secret.
//!
//! Lifecycle: issued, valid while `now < exp`, expired from `now >= exp` on.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::clock::Clock;
use crate::error::{AuthError, AuthErrorKind, AuthResult};
use crate::protocol::{bearer_token, LoginResponse};

/// Default session lifetime.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(1200);

/// The only token type this crate issues or accepts.
pub const ACCESS_TOKEN_TYPE: &str = "access";

/// Claims carried by a session token.
///
/// Fixed shape: a token carrying any other claim fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionClaims {
    /// Client id the session belongs to.
    pub sub: String,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expires at (unix seconds).
    pub exp: i64,
    /// Always [`ACCESS_TOKEN_TYPE`].
    pub token_type: String,
}

/// Mints session tokens after a login request passed signature checks.
pub struct SessionTokenIssuer {
    key: EncodingKey,
    ttl: i64,
    clock: Arc<dyn Clock>,
}

impl SessionTokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            key: EncodingKey::from_secret(secret),
            ttl: ttl.as_secs() as i64,
            clock,
        }
    }

    /// Issue a token for `client_id`.
    ///
    /// Performs no secret verification itself; the caller gates this on a
    /// verified login request.
    pub fn issue(&self, client_id: &str) -> AuthResult<LoginResponse> {
        let now = self.clock.now();
        let claims = SessionClaims {
            sub: client_id.to_string(),
            iat: now,
            exp: now + self.ttl,
            token_type: ACCESS_TOKEN_TYPE.to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.key).map_err(|e| {
            AuthError::Internal {
                message: format!("Failed to encode session token: {}", e),
            }
        })?;

        debug!(client_id = %client_id, expires_at = claims.exp, "Issued session token");

        Ok(LoginResponse::bearer(token, self.ttl as u64))
    }
}

/// Checks session tokens.
pub struct SessionTokenVerifier {
    key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl SessionTokenVerifier {
    pub fn new(secret: &[u8], clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock, without leeway
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
            clock,
        }
    }

    /// Verify `token` and return its claims.
    ///
    /// Integrity is checked before expiry, so a forged token that also
    /// happens to be stale reports `TokenInvalid`.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthErrorKind> {
        let data = decode::<SessionClaims>(token, &self.key, &self.validation).map_err(|e| {
            debug!(error = %e, "Session token failed integrity check");
            AuthErrorKind::TokenInvalid
        })?;
        let claims = data.claims;

        if claims.token_type != ACCESS_TOKEN_TYPE || claims.sub.is_empty() {
            return Err(AuthErrorKind::TokenInvalid);
        }

        if self.clock.now() >= claims.exp {
            return Err(AuthErrorKind::TokenExpired);
        }

        Ok(claims)
    }

    /// Verify an `Authorization` header value for a request signed by
    /// `client_id`.
    ///
    /// A missing or non-bearer header, or a token issued to another client,
    /// is `TokenInvalid`.
    pub fn verify_bearer(
        &self,
        authorization: Option<&str>,
        client_id: &str,
    ) -> Result<SessionClaims, AuthErrorKind> {
        let token = authorization
            .and_then(bearer_token)
            .ok_or(AuthErrorKind::TokenInvalid)?;
        let claims = self.verify(token)?;
        if claims.sub != client_id {
            debug!(client_id = %client_id, subject = %claims.sub, "Session subject mismatch");
            return Err(AuthErrorKind::TokenInvalid);
        }
        Ok(claims)
    }
}
