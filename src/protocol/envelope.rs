//! Signed request envelope.

use crate::auth::RequestSignature;

/// Bearer session token header.
pub const AUTHORIZATION: &str = "Authorization";
/// Client identity header.
pub const CLIENT_ID_HEADER: &str = "X-Client-Id";
/// Request creation time header (unix seconds).
pub const TIMESTAMP_HEADER: &str = "X-Timestamp";
/// Replay-protection nonce header.
pub const NONCE_HEADER: &str = "X-Nonce";
/// Base64 HMAC-SHA256 signature header.
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Everything a protected request carries that the verifier looks at.
///
/// The four signature fields are optional because they arrive as headers
/// that may be absent; the verifier rejects the envelope if any is missing.
/// `body` holds the literal bytes received, never a re-serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedRequestEnvelope {
    pub client_id: Option<String>,
    pub timestamp: Option<String>,
    pub nonce: Option<String>,
    pub signature: Option<String>,
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

impl SignedRequestEnvelope {
    /// Build an envelope from a request, looking headers up through
    /// `header` (case-insensitive lookups are the caller's concern).
    ///
    /// Empty header values count as absent.
    pub fn from_headers<'a, F>(method: &str, path: &str, body: Vec<u8>, header: F) -> Self
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let get = |name: &str| {
            header(name)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        Self {
            client_id: get(CLIENT_ID_HEADER),
            timestamp: get(TIMESTAMP_HEADER),
            nonce: get(NONCE_HEADER),
            signature: get(SIGNATURE_HEADER),
            method: method.to_string(),
            path: path.to_string(),
            body,
        }
    }

    /// Build an envelope from a freshly computed signature.
    pub fn signed(
        method: &str,
        path: &str,
        body: Vec<u8>,
        signature: RequestSignature,
    ) -> Self {
        Self {
            client_id: Some(signature.client_id),
            timestamp: Some(signature.timestamp),
            nonce: Some(signature.nonce),
            signature: Some(signature.signature),
            method: method.to_string(),
            path: path.to_string(),
            body,
        }
    }

    /// Header name/value pairs for the signature fields that are present.
    pub fn signature_headers(&self) -> Vec<(&'static str, String)> {
        [
            (CLIENT_ID_HEADER, &self.client_id),
            (TIMESTAMP_HEADER, &self.timestamp),
            (NONCE_HEADER, &self.nonce),
            (SIGNATURE_HEADER, &self.signature),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.clone().map(|v| (name, v)))
        .collect()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` value.
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
