//! HTTP-agnostic entry points for the backend's auth middleware.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::auth::{
    Clock, ClientRegistry, LoginRateLimiter, ReplayGuard, SessionClaims,
    SessionTokenIssuer, SessionTokenVerifier, SignatureVerifier, DEFAULT_NONCE_CAPACITY,
    DEFAULT_NONCE_TTL, DEFAULT_SESSION_TTL, DEFAULT_TIMESTAMP_WINDOW,
};
use crate::config::Settings;
use crate::error::{AuthError, AuthErrorKind, AuthResult};
use crate::protocol::{ErrorBody, LoginRequest, LoginResponse, SignedRequestEnvelope};

/// Tunables for an [`AuthGate`].
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub session_ttl: Duration,
    pub timestamp_window: Duration,
    pub nonce_ttl: Duration,
    pub nonce_capacity: usize,
    pub login_requests: usize,
    pub login_window: Duration,
    /// Period of the nonce and rate limit sweeps.
    pub cleanup_interval: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            session_ttl: DEFAULT_SESSION_TTL,
            timestamp_window: DEFAULT_TIMESTAMP_WINDOW,
            nonce_ttl: DEFAULT_NONCE_TTL,
            nonce_capacity: DEFAULT_NONCE_CAPACITY,
            login_requests: 10,
            login_window: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl GateConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            session_ttl: settings.session.ttl(),
            timestamp_window: settings.signature.timestamp_window(),
            nonce_ttl: settings.signature.nonce_ttl(),
            nonce_capacity: settings.signature.nonce_capacity,
            login_requests: settings.login_rate_limit.requests,
            login_window: settings.login_rate_limit.window(),
            cleanup_interval: settings.signature.cleanup_interval(),
        }
    }
}

/// A request that passed every required check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedClient {
    pub client_id: String,
    /// Present when the route required a session.
    pub session: Option<SessionClaims>,
}

/// A rejected request, ready for the web layer to send back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: u16,
    pub body: ErrorBody,
}

impl Rejection {
    pub fn new(request_id: Uuid, kind: &AuthErrorKind) -> Self {
        Self {
            status: kind.status_code(),
            body: ErrorBody::from_kind(request_id, kind),
        }
    }
}

/// Composes signature verification, session checks and login.
pub struct AuthGate {
    verifier: SignatureVerifier,
    issuer: SessionTokenIssuer,
    sessions: SessionTokenVerifier,
    replay_guard: Arc<ReplayGuard>,
    login_limiter: Arc<LoginRateLimiter>,
    cleanup_interval: Duration,
}

impl AuthGate {
    /// Create a gate over `registry`, signing sessions with `session_secret`.
    pub fn new(
        registry: Arc<ClientRegistry>,
        session_secret: &[u8],
        config: &GateConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let replay_guard = Arc::new(ReplayGuard::new(
            config.nonce_ttl,
            config.nonce_capacity,
            Arc::clone(&clock),
        ));
        Self {
            verifier: SignatureVerifier::new(
                registry,
                Arc::clone(&replay_guard),
                config.timestamp_window,
                Arc::clone(&clock),
            ),
            issuer: SessionTokenIssuer::new(session_secret, config.session_ttl, Arc::clone(&clock)),
            sessions: SessionTokenVerifier::new(session_secret, Arc::clone(&clock)),
            replay_guard,
            login_limiter: Arc::new(LoginRateLimiter::new(
                config.login_requests,
                config.login_window,
                clock,
            )),
            cleanup_interval: config.cleanup_interval,
        }
    }

    /// Build a gate from settings, loading every secret.
    pub fn from_settings(settings: &Settings, clock: Arc<dyn Clock>) -> AuthResult<Self> {
        let registry = settings.client_registry()?;
        if registry.is_empty() {
            return Err(AuthError::Config {
                message: "No clients provisioned".to_string(),
            });
        }
        let session_secret = settings.session_secret()?;
        Ok(Self::new(
            Arc::new(registry),
            &session_secret,
            &GateConfig::from_settings(settings),
            clock,
        ))
    }

    /// Spawn the background sweeps for the nonce cache and login limiter.
    ///
    /// Both run every [`GateConfig::cleanup_interval`]. Must be called from
    /// inside a tokio runtime.
    pub fn start_maintenance(&self) {
        debug!(
            interval_secs = self.cleanup_interval.as_secs(),
            "Starting auth maintenance tasks"
        );
        self.replay_guard.start_cleanup_task(self.cleanup_interval);
        self.login_limiter.start_cleanup_task(self.cleanup_interval);
    }

    /// Build a gate from settings and start its background sweeps.
    pub fn start(settings: &Settings, clock: Arc<dyn Clock>) -> AuthResult<Self> {
        let gate = Self::from_settings(settings, clock)?;
        gate.start_maintenance();
        Ok(gate)
    }

    /// Live nonce records (for monitoring).
    pub fn tracked_nonces(&self) -> usize {
        self.replay_guard.len()
    }

    fn verify_signature(
        &self,
        request_id: Uuid,
        envelope: &SignedRequestEnvelope,
    ) -> Result<String, Rejection> {
        self.verifier.verify(envelope).map_err(|kind| {
            warn!(
                request_id = %request_id,
                method = %envelope.method,
                path = %envelope.path,
                code = kind.code(),
                "Request rejected"
            );
            Rejection::new(request_id, &kind)
        })
    }

    /// Handle a login request.
    ///
    /// The request must pass full signature verification; the body must
    /// name the same client that signed it.
    pub fn login(
        &self,
        request_id: Uuid,
        envelope: &SignedRequestEnvelope,
    ) -> Result<LoginResponse, Rejection> {
        let reject = |kind: AuthErrorKind| Rejection::new(request_id, &kind);

        let client_id = self.verify_signature(request_id, envelope)?;

        let body: LoginRequest = serde_json::from_slice(&envelope.body).map_err(|e| {
            warn!(
                request_id = %request_id,
                client_id = %client_id,
                error = %e,
                "Malformed login body"
            );
            reject(AuthErrorKind::SignatureMismatch)
        })?;
        if body.client_id != client_id {
            warn!(
                request_id = %request_id,
                client_id = %client_id,
                body_client_id = %body.client_id,
                "Login body names a different client"
            );
            return Err(reject(AuthErrorKind::SignatureMismatch));
        }

        if !self.login_limiter.check_and_record(&client_id) {
            warn!(request_id = %request_id, client_id = %client_id, "Login rate limit exceeded");
            return Err(reject(AuthErrorKind::LoginRateLimited));
        }

        match self.issuer.issue(&client_id) {
            Ok(response) => {
                debug!(request_id = %request_id, client_id = %client_id, "Session issued");
                Ok(response)
            }
            Err(e) => {
                // Encoding an HS256 token only fails on a broken crypto
                // backend; report it as an invalid session to the client.
                error!(request_id = %request_id, error = %e, "Failed to issue session");
                Err(reject(AuthErrorKind::TokenInvalid))
            }
        }
    }

    /// Authenticate a protected request.
    ///
    /// Signature checks always run first. When `require_session` is set,
    /// `authorization` must carry a valid bearer token whose subject is the
    /// signing client.
    pub fn authenticate(
        &self,
        request_id: Uuid,
        envelope: &SignedRequestEnvelope,
        authorization: Option<&str>,
        require_session: bool,
    ) -> Result<AuthenticatedClient, Rejection> {
        let reject = |kind: AuthErrorKind| Rejection::new(request_id, &kind);

        let client_id = self.verify_signature(request_id, envelope)?;

        let session = if require_session {
            let claims = self
                .sessions
                .verify_bearer(authorization, &client_id)
                .map_err(|kind| {
                    warn!(
                        request_id = %request_id,
                        client_id = %client_id,
                        code = kind.code(),
                        "Session check failed"
                    );
                    reject(kind)
                })?;
            Some(claims)
        } else {
            None
        };

        debug!(request_id = %request_id, client_id = %client_id, "Request authenticated");
        Ok(AuthenticatedClient { client_id, session })
    }
}
