//! Login and error bodies.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::AuthErrorKind;

/// Sanitize error messages before sending to clients.
///
/// Only the kind's code leaves the server; the detailed reason (which
/// client, how much skew) is logged instead.
fn sanitize_error_message(kind: &AuthErrorKind) -> &'static str {
    match kind {
        AuthErrorKind::TokenExpired => "Session expired",
        AuthErrorKind::LoginRateLimited => "Too many requests",
        _ => "Authentication failed",
    }
}

/// Login request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub client_id: String,
}

/// Successful login response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

impl LoginResponse {
    /// Create a bearer token response.
    pub fn bearer(access_token: String, expires_in: u64) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            expires_in,
        }
    }
}

/// Error details in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "TOKEN_EXPIRED", "REPLAYED_NONCE").
    pub code: String,

    /// Human-readable error message.
    pub message: String,
}

/// Error body returned for an authentication failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Correlates with the server-side log line.
    pub request_id: Uuid,

    pub error: ErrorResponse,
}

impl ErrorBody {
    /// Build a sanitized error body for `kind`.
    ///
    /// The full kind (including detail fields) is logged server-side.
    pub fn from_kind(request_id: Uuid, kind: &AuthErrorKind) -> Self {
        debug!(
            request_id = %request_id,
            code = kind.code(),
            detail = %kind,
            "Error response (sanitized for client)"
        );

        Self {
            request_id,
            error: ErrorResponse {
                code: kind.code().to_string(),
                message: sanitize_error_message(kind).to_string(),
            },
        }
    }

    /// Recover the error kind from the wire code, if it is one we know.
    pub fn kind(&self) -> Option<AuthErrorKind> {
        AuthErrorKind::from_code(&self.error.code)
    }
}
