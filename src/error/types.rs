//! Error types for the authentication core.

use thiserror::Error;

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Configuration-related errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Authentication errors.
    #[error("Authentication error: {kind}")]
    Auth { kind: AuthErrorKind },

    /// Client-side transport errors.
    #[error("Transport error: {kind}")]
    Transport { kind: TransportErrorKind },

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unexpected internal failures (crypto backend, RNG).
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AuthError {
    /// Returns the authentication kind, if this is an authentication failure.
    pub fn auth_kind(&self) -> Option<&AuthErrorKind> {
        match self {
            AuthError::Auth { kind } => Some(kind),
            _ => None,
        }
    }

    /// A copy of this error that can be handed to another caller.
    ///
    /// I/O errors keep their kind and message; serde errors keep only the
    /// message.
    pub fn duplicate(&self) -> Self {
        match self {
            AuthError::Config { message } => AuthError::Config {
                message: message.clone(),
            },
            AuthError::Auth { kind } => AuthError::Auth { kind: kind.clone() },
            AuthError::Transport { kind } => AuthError::Transport { kind: kind.clone() },
            AuthError::Io(e) => AuthError::Io(std::io::Error::new(e.kind(), e.to_string())),
            AuthError::Serialization(_) => AuthError::Internal {
                message: self.to_string(),
            },
            AuthError::Internal { message } => AuthError::Internal {
                message: message.clone(),
            },
        }
    }
}

impl From<AuthErrorKind> for AuthError {
    fn from(kind: AuthErrorKind) -> Self {
        AuthError::Auth { kind }
    }
}

/// Authentication error kinds.
///
/// These are the only failure reasons that cross the wire. Each kind has a
/// stable code so a remote caller can tell "refresh and retry" apart from
/// "fatal, do not retry".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthErrorKind {
    #[error("Missing signature headers")]
    MissingHeaders,

    #[error("Unknown client: {client_id}")]
    UnknownClient { client_id: String },

    #[error("Timestamp outside acceptance window (skew {skew_seconds}s)")]
    TimestampOutOfWindow { skew_seconds: i64 },

    #[error("Nonce already used (replay attack detected)")]
    ReplayedNonce,

    #[error("Signature mismatch")]
    SignatureMismatch,

    #[error("Session token expired")]
    TokenExpired,

    #[error("Session token invalid")]
    TokenInvalid,

    #[error("Too many login attempts")]
    LoginRateLimited,
}

impl AuthErrorKind {
    /// Stable wire code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            AuthErrorKind::MissingHeaders => "MISSING_HEADERS",
            AuthErrorKind::UnknownClient { .. } => "UNKNOWN_CLIENT",
            AuthErrorKind::TimestampOutOfWindow { .. } => "TIMESTAMP_OUT_OF_WINDOW",
            AuthErrorKind::ReplayedNonce => "REPLAYED_NONCE",
            AuthErrorKind::SignatureMismatch => "SIGNATURE_MISMATCH",
            AuthErrorKind::TokenExpired => "TOKEN_EXPIRED",
            AuthErrorKind::TokenInvalid => "TOKEN_INVALID",
            AuthErrorKind::LoginRateLimited => "LOGIN_RATE_LIMITED",
        }
    }

    /// Rebuild a kind from its wire code.
    ///
    /// Detail fields that never cross the wire are left empty.
    pub fn from_code(code: &str) -> Option<Self> {
        let kind = match code {
            "MISSING_HEADERS" => AuthErrorKind::MissingHeaders,
            "UNKNOWN_CLIENT" => AuthErrorKind::UnknownClient {
                client_id: String::new(),
            },
            "TIMESTAMP_OUT_OF_WINDOW" => AuthErrorKind::TimestampOutOfWindow { skew_seconds: 0 },
            "REPLAYED_NONCE" => AuthErrorKind::ReplayedNonce,
            "SIGNATURE_MISMATCH" => AuthErrorKind::SignatureMismatch,
            "TOKEN_EXPIRED" => AuthErrorKind::TokenExpired,
            "TOKEN_INVALID" => AuthErrorKind::TokenInvalid,
            "LOGIN_RATE_LIMITED" => AuthErrorKind::LoginRateLimited,
            _ => return None,
        };
        Some(kind)
    }

    /// Suggested HTTP status for the surrounding web layer.
    ///
    /// 401 when identity was never established or the session is bad, 403
    /// when a known client sent a replayed or forged request.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthErrorKind::MissingHeaders
            | AuthErrorKind::UnknownClient { .. }
            | AuthErrorKind::TimestampOutOfWindow { .. }
            | AuthErrorKind::TokenExpired
            | AuthErrorKind::TokenInvalid => 401,
            AuthErrorKind::ReplayedNonce | AuthErrorKind::SignatureMismatch => 403,
            AuthErrorKind::LoginRateLimited => 429,
        }
    }

    /// Whether the client transport may recover by re-authenticating.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AuthErrorKind::TokenExpired)
    }
}

/// Client-side transport error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportErrorKind {
    #[error("Request timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error("Request failed: {message}")]
    RequestFailed { message: String },

    #[error("Unexpected response status {status}")]
    UnexpectedStatus { status: u16 },

    #[error("Invalid login response: {message}")]
    InvalidLoginResponse { message: String },
}

/// Result type alias for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        let kinds = [
            AuthErrorKind::MissingHeaders,
            AuthErrorKind::ReplayedNonce,
            AuthErrorKind::SignatureMismatch,
            AuthErrorKind::TokenExpired,
            AuthErrorKind::TokenInvalid,
            AuthErrorKind::LoginRateLimited,
        ];
        for kind in kinds {
            assert_eq!(AuthErrorKind::from_code(kind.code()), Some(kind.clone()));
        }
        assert!(matches!(
            AuthErrorKind::from_code("UNKNOWN_CLIENT"),
            Some(AuthErrorKind::UnknownClient { .. })
        ));
        assert!(AuthErrorKind::from_code("AUTH_ERROR").is_none());
    }

    #[test]
    fn test_duplicate_keeps_kind() {
        let err = AuthError::from(AuthErrorKind::LoginRateLimited);
        assert_eq!(err.duplicate().auth_kind(), Some(&AuthErrorKind::LoginRateLimited));

        let err = AuthError::Transport {
            kind: TransportErrorKind::Timeout { timeout_secs: 15 },
        };
        assert!(matches!(
            err.duplicate(),
            AuthError::Transport {
                kind: TransportErrorKind::Timeout { timeout_secs: 15 }
            }
        ));

        let err = AuthError::from(serde_json::from_str::<u8>("x").unwrap_err());
        let copy = err.duplicate();
        assert!(matches!(copy, AuthError::Internal { .. }));
        assert!(copy.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_status_split() {
        assert_eq!(AuthErrorKind::MissingHeaders.status_code(), 401);
        assert_eq!(AuthErrorKind::TokenExpired.status_code(), 401);
        assert_eq!(AuthErrorKind::ReplayedNonce.status_code(), 403);
        assert_eq!(AuthErrorKind::SignatureMismatch.status_code(), 403);
    }

    #[test]
    fn test_only_expiry_is_recoverable() {
        assert!(AuthErrorKind::TokenExpired.is_recoverable());
        assert!(!AuthErrorKind::TokenInvalid.is_recoverable());
        assert!(!AuthErrorKind::SignatureMismatch.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err: AuthError = AuthErrorKind::ReplayedNonce.into();
        assert_eq!(
            err.to_string(),
            "Authentication error: Nonce already used (replay attack detected)"
        );
        assert_eq!(err.auth_kind(), Some(&AuthErrorKind::ReplayedNonce));
    }
}
