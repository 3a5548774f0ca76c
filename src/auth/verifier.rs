//! Server-side verification of signed requests.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use super::clock::Clock;
use super::registry::ClientRegistry;
use super::replay::ReplayGuard;
use super::signer::{canonical_message, verify};
use crate::error::AuthErrorKind;
use crate::protocol::SignedRequestEnvelope;

/// Default timestamp acceptance window.
pub const DEFAULT_TIMESTAMP_WINDOW: Duration = Duration::from_secs(60);

/// Accepts or rejects a [`SignedRequestEnvelope`].
pub struct SignatureVerifier {
    registry: Arc<ClientRegistry>,
    replay_guard: Arc<ReplayGuard>,
    window: i64,
    clock: Arc<dyn Clock>,
}

impl SignatureVerifier {
    /// Create a new verifier.
    pub fn new(
        registry: Arc<ClientRegistry>,
        replay_guard: Arc<ReplayGuard>,
        window: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            replay_guard,
            window: window.as_secs() as i64,
            clock,
        }
    }

    /// Validate a signed request, returning the authenticated client id.
    ///
    /// Checks, stopping at the first failure:
    /// 1. All four signature fields are present
    /// 2. The client id is provisioned
    /// 3. The timestamp is within the window of now
    /// 4. The nonce has not been used (consumes it)
    /// 5. The signature matches, compared in constant time
    ///
    /// A request failing step 5 has already spent its nonce, so a forged
    /// body cannot be retried under the same nonce.
    pub fn verify(&self, envelope: &SignedRequestEnvelope) -> Result<String, AuthErrorKind> {
        // 1. Required fields
        let (Some(client_id), Some(timestamp), Some(nonce), Some(signature)) = (
            envelope.client_id.as_deref(),
            envelope.timestamp.as_deref(),
            envelope.nonce.as_deref(),
            envelope.signature.as_deref(),
        ) else {
            warn!(
                path = %envelope.path,
                has_client_id = envelope.client_id.is_some(),
                has_timestamp = envelope.timestamp.is_some(),
                has_nonce = envelope.nonce.is_some(),
                has_signature = envelope.signature.is_some(),
                "Rejected request: missing signature headers"
            );
            return Err(AuthErrorKind::MissingHeaders);
        };

        // 2. Known client
        let Some(credential) = self.registry.get(client_id) else {
            warn!(client_id = %client_id, "Rejected request: unknown client");
            return Err(AuthErrorKind::UnknownClient {
                client_id: client_id.to_string(),
            });
        };

        // 3. Timestamp freshness, both directions
        let now = self.clock.now();
        let skew = match timestamp.parse::<i64>() {
            Ok(ts) => now.saturating_sub(ts),
            Err(_) => {
                warn!(client_id = %client_id, "Rejected request: unparseable timestamp");
                return Err(AuthErrorKind::TimestampOutOfWindow { skew_seconds: i64::MAX });
            }
        };
        if skew.saturating_abs() > self.window {
            warn!(
                client_id = %client_id,
                skew_seconds = skew,
                window_seconds = self.window,
                "Rejected request: timestamp outside window"
            );
            return Err(AuthErrorKind::TimestampOutOfWindow { skew_seconds: skew });
        }

        // 4. Replay prevention
        if !self.replay_guard.check_and_record(nonce) {
            warn!(client_id = %client_id, "Rejected request: nonce reused");
            return Err(AuthErrorKind::ReplayedNonce);
        }

        // 5. Signature
        let message = canonical_message(
            &envelope.method,
            &envelope.path,
            &envelope.body,
            timestamp,
            nonce,
        );
        if !verify(credential.shared_secret(), &message, signature) {
            error!(
                client_id = %client_id,
                method = %envelope.method,
                path = %envelope.path,
                "Signature mismatch (possible forgery or secret mismatch)"
            );
            return Err(AuthErrorKind::SignatureMismatch);
        }

        debug!(client_id = %client_id, path = %envelope.path, "Signature verified");
        Ok(client_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::auth::registry::ClientCredential;
    use crate::auth::signer::RequestSigner;

    const T0: i64 = 1_700_000_000;

    struct Fixture {
        verifier: SignatureVerifier,
        guard: Arc<ReplayGuard>,
        clock: Arc<ManualClock>,
        signer: RequestSigner,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(T0));
        let registry = Arc::new(
            ClientRegistry::new([ClientCredential::new("desktop-main", b"s3cr3t".to_vec())])
                .unwrap(),
        );
        let guard = Arc::new(ReplayGuard::new(
            Duration::from_secs(300),
            10_000,
            clock.clone(),
        ));
        let verifier = SignatureVerifier::new(
            registry,
            Arc::clone(&guard),
            DEFAULT_TIMESTAMP_WINDOW,
            clock.clone(),
        );
        Fixture {
            verifier,
            guard,
            clock,
            signer: RequestSigner::new("desktop-main", b"s3cr3t"),
        }
    }

    fn signed_at(f: &Fixture, ts: i64, nonce: &str) -> SignedRequestEnvelope {
        let sig = f
            .signer
            .sign_with("GET", "/api/games", b"", &ts.to_string(), nonce);
        SignedRequestEnvelope::signed("GET", "/api/games", Vec::new(), sig)
    }

    #[test]
    fn test_valid_signature() {
        let f = fixture();
        let envelope = signed_at(&f, T0, "aa11bb22cc33dd44");
        assert_eq!(f.verifier.verify(&envelope).unwrap(), "desktop-main");
    }

    #[test]
    fn test_nonce_reuse() {
        let f = fixture();
        let envelope = signed_at(&f, T0, "aa11bb22cc33dd44");

        assert!(f.verifier.verify(&envelope).is_ok());
        assert_eq!(f.verifier.verify(&envelope), Err(AuthErrorKind::ReplayedNonce));
    }

    #[test]
    fn test_missing_headers() {
        let f = fixture();
        let mut envelope = signed_at(&f, T0, "n1");
        envelope.nonce = None;

        assert_eq!(f.verifier.verify(&envelope), Err(AuthErrorKind::MissingHeaders));
        assert!(f.guard.is_empty());
    }

    #[test]
    fn test_unknown_client() {
        let f = fixture();
        let sig = RequestSigner::new("intruder", b"s3cr3t").sign_with(
            "GET",
            "/api/games",
            b"",
            &T0.to_string(),
            "n1",
        );
        let envelope = SignedRequestEnvelope::signed("GET", "/api/games", Vec::new(), sig);

        assert!(matches!(
            f.verifier.verify(&envelope),
            Err(AuthErrorKind::UnknownClient { client_id }) if client_id == "intruder"
        ));
        assert!(f.guard.is_empty());
    }

    #[test]
    fn test_timestamp_window_boundaries() {
        let f = fixture();

        assert!(f.verifier.verify(&signed_at(&f, T0 - 60, "past-edge")).is_ok());
        assert!(matches!(
            f.verifier.verify(&signed_at(&f, T0 - 61, "past-over")),
            Err(AuthErrorKind::TimestampOutOfWindow { skew_seconds: 61 })
        ));

        assert!(f.verifier.verify(&signed_at(&f, T0 + 60, "future-edge")).is_ok());
        assert!(matches!(
            f.verifier.verify(&signed_at(&f, T0 + 61, "future-over")),
            Err(AuthErrorKind::TimestampOutOfWindow { skew_seconds: -61 })
        ));

        // Out-of-window requests never reach the nonce cache
        assert_eq!(f.guard.len(), 2);
    }

    #[test]
    fn test_unparseable_timestamp() {
        let f = fixture();
        let mut envelope = signed_at(&f, T0, "n1");
        envelope.timestamp = Some("yesterday".to_string());

        assert!(matches!(
            f.verifier.verify(&envelope),
            Err(AuthErrorKind::TimestampOutOfWindow { .. })
        ));
    }

    #[test]
    fn test_stale_after_clock_moves() {
        let f = fixture();
        let envelope = signed_at(&f, T0, "n1");
        f.clock.advance(61);

        assert!(matches!(
            f.verifier.verify(&envelope),
            Err(AuthErrorKind::TimestampOutOfWindow { .. })
        ));
    }

    #[test]
    fn test_tampered_fields_mismatch() {
        let f = fixture();
        let body = b"{\"game\":7}".to_vec();

        // Each case signs under its own nonce, then alters exactly one field
        let tamper: [fn(&mut SignedRequestEnvelope); 5] = [
            |e| e.body[8] = b'8',
            |e| e.method = "PUT".to_string(),
            |e| e.path = "/api/watchlisT".to_string(),
            |e| e.timestamp = Some((T0 + 1).to_string()),
            |e| e.nonce = Some("tampered-nonce".to_string()),
        ];

        for (i, alter) in tamper.iter().enumerate() {
            let nonce = format!("n-tamper-{}", i);
            let sig = f
                .signer
                .sign_with("POST", "/api/watchlist", &body, &T0.to_string(), &nonce);
            let mut envelope =
                SignedRequestEnvelope::signed("POST", "/api/watchlist", body.clone(), sig);
            alter(&mut envelope);

            assert_eq!(
                f.verifier.verify(&envelope),
                Err(AuthErrorKind::SignatureMismatch),
                "case {}",
                i
            );
        }
    }

    #[test]
    fn test_failed_signature_still_consumes_nonce() {
        let f = fixture();
        let mut forged = signed_at(&f, T0, "n-forged");
        forged.signature = Some("AAAA".to_string());

        assert_eq!(f.verifier.verify(&forged), Err(AuthErrorKind::SignatureMismatch));

        // The genuine request under the same nonce is now a replay
        let genuine = signed_at(&f, T0, "n-forged");
        assert_eq!(f.verifier.verify(&genuine), Err(AuthErrorKind::ReplayedNonce));
    }

    #[test]
    fn test_wrong_secret() {
        let f = fixture();
        let sig = RequestSigner::new("desktop-main", b"guessed").sign_with(
            "GET",
            "/api/games",
            b"",
            &T0.to_string(),
            "n1",
        );
        let envelope = SignedRequestEnvelope::signed("GET", "/api/games", Vec::new(), sig);

        assert_eq!(f.verifier.verify(&envelope), Err(AuthErrorKind::SignatureMismatch));
    }
}
