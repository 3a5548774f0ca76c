//! HMAC-SHA256 request canonicalization and signing.
//!
//! Client and server both call into this module, so a request signed on one
//! side is recomputed byte for byte on the other.
//!
//! Canonical message:
//! ```text
//! {METHOD}|{path}|{hex(sha256(body))}|{timestamp}|{nonce}
//! ```

use base64::{engine::general_purpose::STANDARD, Engine};
use ring::digest::{digest, SHA256};
use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{AuthError, AuthResult};

/// Number of random bytes in a generated nonce.
pub const NONCE_BYTES: usize = 16;

/// Hex-encoded SHA-256 of `body`.
///
/// `body` must be the exact bytes sent on the wire. Hashing a
/// re-serialization of the same data breaks verification.
pub fn body_digest(body: &[u8]) -> String {
    hex::encode(digest(&SHA256, body).as_ref())
}

/// Build the canonical message for a request.
pub fn canonical_message(
    method: &str,
    path: &str,
    body: &[u8],
    timestamp: &str,
    nonce: &str,
) -> String {
    format!(
        "{}|{}|{}|{}|{}",
        method.to_ascii_uppercase(),
        path,
        body_digest(body),
        timestamp,
        nonce
    )
}

/// Sign `message` with `secret`, returning the base64 HMAC-SHA256 tag.
pub fn sign(secret: &[u8], message: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
    let tag = hmac::sign(&key, message.as_bytes());
    STANDARD.encode(tag.as_ref())
}

/// Check a base64 signature against `message` in constant time.
///
/// Goes through `ring::hmac::verify`, which never short-circuits on the
/// first differing byte. Undecodable signatures simply fail.
pub fn verify(secret: &[u8], message: &str, signature: &str) -> bool {
    let Ok(signature_bytes) = STANDARD.decode(signature) else {
        return false;
    };
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
    hmac::verify(&key, message.as_bytes(), &signature_bytes).is_ok()
}

/// Current unix time in seconds as a decimal string.
pub fn timestamp_string(now: i64) -> String {
    now.to_string()
}

/// Fresh hex-encoded nonce of [`NONCE_BYTES`] random bytes.
pub fn generate_nonce() -> AuthResult<String> {
    let mut bytes = [0u8; NONCE_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AuthError::Internal {
            message: "System random number generator unavailable".to_string(),
        })?;
    Ok(hex::encode(bytes))
}

/// The four signature header values for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSignature {
    pub client_id: String,
    pub timestamp: String,
    pub nonce: String,
    pub signature: String,
}

/// Signs outgoing requests for one client identity.
pub struct RequestSigner {
    client_id: String,
    key: hmac::Key,
}

impl RequestSigner {
    /// Create a signer for `client_id` holding `secret`.
    pub fn new(client_id: impl Into<String>, secret: &[u8]) -> Self {
        Self {
            client_id: client_id.into(),
            key: hmac::Key::new(hmac::HMAC_SHA256, secret),
        }
    }

    /// The identity this signer signs as.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Sign with an explicit timestamp and nonce.
    pub fn sign_with(
        &self,
        method: &str,
        path: &str,
        body: &[u8],
        timestamp: &str,
        nonce: &str,
    ) -> RequestSignature {
        let message = canonical_message(method, path, body, timestamp, nonce);
        let tag = hmac::sign(&self.key, message.as_bytes());
        RequestSignature {
            client_id: self.client_id.clone(),
            timestamp: timestamp.to_string(),
            nonce: nonce.to_string(),
            signature: STANDARD.encode(tag.as_ref()),
        }
    }

    /// Sign with the given time and a fresh nonce.
    pub fn sign_request(
        &self,
        method: &str,
        path: &str,
        body: &[u8],
        now: i64,
    ) -> AuthResult<RequestSignature> {
        let nonce = generate_nonce()?;
        Ok(self.sign_with(method, path, body, &timestamp_string(now), &nonce))
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("client_id", &self.client_id)
            .field("key", &"<redacted>")
            .finish()
    }
}
