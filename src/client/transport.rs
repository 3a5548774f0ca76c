//! Client-side orchestration of the two auth layers.
//!
//! Session lifecycle: `NoSession -> Authenticating -> Authenticated`, back to
//! `Authenticating` when the token nears expiry or the backend reports it
//! expired. Logins are singleflight: concurrent callers that find no usable
//! session queue on one async mutex, and every caller that queued behind a
//! login takes that login's result, failure included, instead of starting
//! another one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::http::{HttpClient, InboundResponse, OutboundRequest, ReqwestClient};
use crate::auth::{Clock, RequestSigner, SystemClock};
use crate::config::DesktopClientConfig;
use crate::error::{AuthError, AuthErrorKind, AuthResult, TransportErrorKind};
use crate::protocol::{
    ErrorBody, LoginRequest, LoginResponse, SignedRequestEnvelope, AUTHORIZATION,
};

const CONTENT_TYPE: &str = "Content-Type";
const JSON: &str = "application/json";

/// Transport tunables.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub login_path: String,
    /// Upper bound for every network call, login included.
    pub request_timeout: Duration,
    /// Log in again this long before the session expires.
    pub refresh_margin: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            login_path: "/api/auth/login".to_string(),
            request_timeout: Duration::from_secs(15),
            refresh_margin: Duration::from_secs(60),
        }
    }
}

impl TransportConfig {
    pub fn from_client_config(config: &DesktopClientConfig) -> Self {
        Self {
            login_path: config.login_path.clone(),
            request_timeout: config.request_timeout(),
            refresh_margin: config.refresh_margin(),
        }
    }
}

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    Authenticating,
    Authenticated { expires_at: i64 },
}

struct Session {
    token: String,
    expires_at: i64,
}

/// Result of the most recent login, kept for callers queued behind it.
type LastLogin = Option<AuthResult<String>>;

/// Signs every request and keeps a session alive on behalf of its callers.
pub struct AuthenticatedTransport<C = ReqwestClient> {
    http: C,
    signer: RequestSigner,
    clock: Arc<dyn Clock>,
    config: TransportConfig,
    session: RwLock<Option<Session>>,
    login_lock: Mutex<LastLogin>,
    /// Completed login attempts, successful or not.
    login_rounds: AtomicU64,
}

impl AuthenticatedTransport<ReqwestClient> {
    /// Build a reqwest-backed transport from the `[client]` config section.
    pub fn from_config(config: &DesktopClientConfig) -> AuthResult<Self> {
        let secret = config.secret()?;
        let http = ReqwestClient::new(&config.base_url, config.request_timeout())?;
        Ok(Self::new(
            http,
            RequestSigner::new(config.client_id.clone(), &secret),
            TransportConfig::from_client_config(config),
            Arc::new(SystemClock),
        ))
    }
}

impl<C: HttpClient> AuthenticatedTransport<C> {
    pub fn new(
        http: C,
        signer: RequestSigner,
        config: TransportConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            http,
            signer,
            clock,
            config,
            session: RwLock::new(None),
            login_lock: Mutex::new(None),
            login_rounds: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.login_lock.try_lock().is_err() {
            return SessionState::Authenticating;
        }
        match self.session.read().unwrap_or_else(|e| e.into_inner()).as_ref() {
            Some(session) => SessionState::Authenticated {
                expires_at: session.expires_at,
            },
            None => SessionState::NoSession,
        }
    }

    /// Return a usable session token, logging in first if needed.
    pub async fn ensure_session(&self) -> AuthResult<String> {
        if let Some(token) = self.fresh_token() {
            return Ok(token);
        }

        let observed = self.login_rounds.load(Ordering::SeqCst);
        let mut last = self.login_lock.lock().await;
        // Whoever held the lock before us may have just logged in
        if let Some(token) = self.fresh_token() {
            return Ok(token);
        }
        if let Some(outcome) = self.joined_outcome(&last, observed, None) {
            return outcome;
        }
        self.run_login(&mut last).await
    }

    /// Send a signed request carrying the session token.
    ///
    /// The body is sent as raw bytes with no `Content-Type`. A `TokenExpired`
    /// rejection triggers exactly one re-login and retry. Every other auth
    /// rejection is returned as `AuthError::Auth`. Non-auth responses, errors
    /// included, are returned to the caller as-is.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Vec<u8>,
    ) -> AuthResult<InboundResponse> {
        self.dispatch(method, path, body, None).await
    }

    /// Like [`request`](Self::request), with `body` serialized as JSON.
    pub async fn request_json<T: Serialize + ?Sized>(
        &self,
        method: &str,
        path: &str,
        body: &T,
    ) -> AuthResult<InboundResponse> {
        let body = serde_json::to_vec(body)?;
        self.dispatch(method, path, body, Some(JSON)).await
    }

    async fn dispatch(
        &self,
        method: &str,
        path: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> AuthResult<InboundResponse> {
        let token = self.ensure_session().await?;
        let response = self
            .send_signed(method, path, body.clone(), Some(&token), content_type)
            .await?;

        match rejection_kind(&response) {
            Some(AuthErrorKind::TokenExpired) => {
                info!(
                    client_id = %self.signer.client_id(),
                    path = %path,
                    "Session rejected as expired, re-authenticating"
                );
                let token = self.refresh_after_rejection(&token).await?;
                let retry = self
                    .send_signed(method, path, body, Some(&token), content_type)
                    .await?;
                match rejection_kind(&retry) {
                    Some(kind) => Err(kind.into()),
                    None => Ok(retry),
                }
            }
            Some(kind) => Err(kind.into()),
            None => Ok(response),
        }
    }

    /// Token of the current session, unless it is inside the refresh margin.
    fn fresh_token(&self) -> Option<String> {
        let margin = self.config.refresh_margin.as_secs() as i64;
        let now = self.clock.now();
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .filter(|session| now < session.expires_at - margin)
            .map(|session| session.token.clone())
    }

    async fn refresh_after_rejection(&self, rejected: &str) -> AuthResult<String> {
        let observed = self.login_rounds.load(Ordering::SeqCst);
        let mut last = self.login_lock.lock().await;
        if let Some(token) = self.fresh_token() {
            if token != rejected {
                return Ok(token);
            }
        }
        if let Some(outcome) = self.joined_outcome(&last, observed, Some(rejected)) {
            return outcome;
        }
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = None;
        self.run_login(&mut last).await
    }

    /// Result of a login that completed after `observed` was read.
    ///
    /// `None` means the caller has to log in itself: no login finished while
    /// it queued, or the one that did handed out the `rejected` token.
    fn joined_outcome(
        &self,
        last: &LastLogin,
        observed: u64,
        rejected: Option<&str>,
    ) -> Option<AuthResult<String>> {
        if self.login_rounds.load(Ordering::SeqCst) == observed {
            return None;
        }
        match last.as_ref()? {
            Ok(token) if Some(token.as_str()) == rejected => None,
            Ok(token) => Some(Ok(token.clone())),
            Err(e) => {
                debug!(
                    client_id = %self.signer.client_id(),
                    error = %e,
                    "Sharing failed login with queued caller"
                );
                Some(Err(e.duplicate()))
            }
        }
    }

    /// Log in and publish the result to queued callers.
    async fn run_login(&self, last: &mut LastLogin) -> AuthResult<String> {
        let result = self.login().await;
        *last = Some(match &result {
            Ok(token) => Ok(token.clone()),
            Err(e) => Err(e.duplicate()),
        });
        self.login_rounds.fetch_add(1, Ordering::SeqCst);
        result
    }

    /// Perform a login. Callers hold `login_lock`.
    ///
    /// The session is only written after a complete, well-formed response.
    async fn login(&self) -> AuthResult<String> {
        let client_id = self.signer.client_id().to_string();
        let body = serde_json::to_vec(&LoginRequest {
            client_id: client_id.clone(),
        })?;

        debug!(client_id = %client_id, "Logging in");
        let response = self
            .send_signed("POST", &self.config.login_path, body, None, Some(JSON))
            .await?;

        if !response.is_success() {
            let error = match rejection_kind(&response) {
                Some(kind) => AuthError::from(kind),
                None => AuthError::Transport {
                    kind: TransportErrorKind::UnexpectedStatus {
                        status: response.status,
                    },
                },
            };
            warn!(
                client_id = %client_id,
                status = response.status,
                error = %error,
                "Login rejected"
            );
            return Err(error);
        }

        let login: LoginResponse =
            serde_json::from_slice(&response.body).map_err(|e| invalid_login(e.to_string()))?;
        if !login.token_type.eq_ignore_ascii_case("bearer") {
            return Err(invalid_login(format!(
                "unsupported token type '{}'",
                login.token_type
            )));
        }
        if login.access_token.is_empty() {
            return Err(invalid_login("empty access token".to_string()));
        }

        let expires_in = i64::try_from(login.expires_in).unwrap_or(i64::MAX);
        let expires_at = self.clock.now().saturating_add(expires_in);
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = Some(Session {
            token: login.access_token.clone(),
            expires_at,
        });

        info!(client_id = %client_id, expires_at = expires_at, "Session established");
        Ok(login.access_token)
    }

    async fn send_signed(
        &self,
        method: &str,
        path: &str,
        body: Vec<u8>,
        token: Option<&str>,
        content_type: Option<&str>,
    ) -> AuthResult<InboundResponse> {
        let method = method.to_ascii_uppercase();
        let signature = self
            .signer
            .sign_request(&method, path, &body, self.clock.now())?;
        let envelope = SignedRequestEnvelope::signed(&method, path, body, signature);

        let mut headers: Vec<(String, String)> = envelope
            .signature_headers()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        if let Some(token) = token {
            headers.push((AUTHORIZATION.to_string(), format!("Bearer {}", token)));
        }
        if let Some(content_type) = content_type {
            headers.push((CONTENT_TYPE.to_string(), content_type.to_string()));
        }

        let request = OutboundRequest {
            method,
            path: envelope.path,
            headers,
            body: envelope.body,
        };

        let timeout = self.config.request_timeout;
        match tokio::time::timeout(timeout, self.http.send(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    client_id = %self.signer.client_id(),
                    path = %path,
                    timeout_secs = timeout.as_secs(),
                    "Request timed out"
                );
                Err(AuthError::Transport {
                    kind: TransportErrorKind::Timeout {
                        timeout_secs: timeout.as_secs(),
                    },
                })
            }
        }
    }
}

/// Decode an auth rejection from a response, if it is one.
fn rejection_kind(response: &InboundResponse) -> Option<AuthErrorKind> {
    if !matches!(response.status, 401 | 403 | 429) {
        return None;
    }
    serde_json::from_slice::<ErrorBody>(&response.body)
        .ok()
        .and_then(|body| body.kind())
}

fn invalid_login(message: String) -> AuthError {
    AuthError::Transport {
        kind: TransportErrorKind::InvalidLoginResponse { message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{canonical_message, verify, ManualClock};
    use crate::protocol::{CLIENT_ID_HEADER, NONCE_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    const T0: i64 = 1_700_000_000;
    const SECRET: &[u8] = b"s3cr3t";

    /// Scripted backend: logins hand out `token-N`, API calls pop scripted
    /// responses and default to 200.
    #[derive(Default)]
    struct MockBackend {
        logins: AtomicUsize,
        login_delay: Duration,
        /// Only this login is delayed; every login when unset.
        slow_login: Option<usize>,
        login_failure: Option<AuthErrorKind>,
        api: std::sync::Mutex<VecDeque<InboundResponse>>,
        seen: std::sync::Mutex<Vec<OutboundRequest>>,
    }

    impl MockBackend {
        fn script(&self, responses: Vec<InboundResponse>) {
            self.api.lock().unwrap().extend(responses);
        }

        fn seen(&self) -> Vec<OutboundRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClient for MockBackend {
        async fn send(&self, request: OutboundRequest) -> AuthResult<InboundResponse> {
            self.seen.lock().unwrap().push(request.clone());

            if request.path == "/api/auth/login" {
                let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
                if self.slow_login.map_or(true, |slow| slow == n) {
                    tokio::time::sleep(self.login_delay).await;
                }
                if let Some(kind) = &self.login_failure {
                    return Ok(rejection(kind.clone()));
                }
                let body = LoginResponse::bearer(format!("token-{}", n), 1200);
                return Ok(InboundResponse {
                    status: 200,
                    body: serde_json::to_vec(&body).unwrap(),
                });
            }

            let scripted = self.api.lock().unwrap().pop_front();
            Ok(scripted.unwrap_or(InboundResponse {
                status: 200,
                body: b"[]".to_vec(),
            }))
        }
    }

    fn rejection(kind: AuthErrorKind) -> InboundResponse {
        InboundResponse {
            status: kind.status_code(),
            body: serde_json::to_vec(&ErrorBody::from_kind(Uuid::new_v4(), &kind)).unwrap(),
        }
    }

    fn transport(
        backend: Arc<MockBackend>,
        clock: Arc<ManualClock>,
        config: TransportConfig,
    ) -> AuthenticatedTransport<Arc<MockBackend>> {
        AuthenticatedTransport::new(
            backend,
            RequestSigner::new("desktop-main", SECRET),
            config,
            clock,
        )
    }

    fn default_transport(backend: Arc<MockBackend>) -> AuthenticatedTransport<Arc<MockBackend>> {
        transport(backend, Arc::new(ManualClock::new(T0)), TransportConfig::default())
    }

    #[tokio::test]
    async fn test_request_logs_in_and_signs() {
        let backend = Arc::new(MockBackend::default());
        let transport = default_transport(backend.clone());
        assert_eq!(transport.state(), SessionState::NoSession);

        let response = transport.request("get", "/api/games", Vec::new()).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(
            transport.state(),
            SessionState::Authenticated {
                expires_at: T0 + 1200
            }
        );

        let seen = backend.seen();
        assert_eq!(seen.len(), 2);

        let login = &seen[0];
        assert_eq!(login.method, "POST");
        assert!(login.header(AUTHORIZATION).is_none());
        let body: LoginRequest = serde_json::from_slice(&login.body).unwrap();
        assert_eq!(body.client_id, "desktop-main");

        let call = &seen[1];
        assert_eq!(call.method, "GET");
        assert_eq!(call.header(AUTHORIZATION), Some("Bearer token-1"));
        assert_eq!(call.header(CLIENT_ID_HEADER), Some("desktop-main"));
        assert_eq!(call.header(TIMESTAMP_HEADER), Some("1700000000"));

        let nonce = call.header(NONCE_HEADER).unwrap();
        assert_ne!(Some(nonce), login.header(NONCE_HEADER));
        let message = canonical_message("GET", "/api/games", b"", "1700000000", nonce);
        assert!(verify(SECRET, &message, call.header(SIGNATURE_HEADER).unwrap()));
    }

    #[tokio::test]
    async fn test_session_reused_until_margin() {
        let backend = Arc::new(MockBackend::default());
        let clock = Arc::new(ManualClock::new(T0));
        let transport = transport(backend.clone(), clock.clone(), TransportConfig::default());

        for _ in 0..3 {
            transport.request("GET", "/api/games", Vec::new()).await.unwrap();
        }
        assert_eq!(backend.logins.load(Ordering::SeqCst), 1);

        // One second before the margin starts
        clock.advance(1200 - 60 - 1);
        transport.request("GET", "/api/games", Vec::new()).await.unwrap();
        assert_eq!(backend.logins.load(Ordering::SeqCst), 1);

        clock.advance(1);
        transport.request("GET", "/api/games", Vec::new()).await.unwrap();
        assert_eq!(backend.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_rejection_retries_once() {
        let backend = Arc::new(MockBackend::default());
        backend.script(vec![rejection(AuthErrorKind::TokenExpired)]);
        let transport = default_transport(backend.clone());

        let response = transport.request("GET", "/api/games", Vec::new()).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(backend.logins.load(Ordering::SeqCst), 2);

        let seen = backend.seen();
        let retried = seen.last().unwrap();
        assert_eq!(retried.header(AUTHORIZATION), Some("Bearer token-2"));
        // The retry is a fresh request, not a replay of the rejected one
        assert_ne!(retried.header(NONCE_HEADER), seen[1].header(NONCE_HEADER));
    }

    #[tokio::test]
    async fn test_second_expired_rejection_surfaces() {
        let backend = Arc::new(MockBackend::default());
        backend.script(vec![
            rejection(AuthErrorKind::TokenExpired),
            rejection(AuthErrorKind::TokenExpired),
        ]);
        let transport = default_transport(backend.clone());

        let err = transport.request("GET", "/api/games", Vec::new()).await.unwrap_err();
        assert_eq!(err.auth_kind(), Some(&AuthErrorKind::TokenExpired));
        assert_eq!(backend.logins.load(Ordering::SeqCst), 2);
        assert_eq!(backend.seen().len(), 4);
    }

    #[tokio::test]
    async fn test_invalid_token_not_retried() {
        let backend = Arc::new(MockBackend::default());
        backend.script(vec![rejection(AuthErrorKind::TokenInvalid)]);
        let transport = default_transport(backend.clone());

        let err = transport.request("GET", "/api/games", Vec::new()).await.unwrap_err();
        assert_eq!(err.auth_kind(), Some(&AuthErrorKind::TokenInvalid));
        assert_eq!(backend.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_auth_response_passes_through() {
        let backend = Arc::new(MockBackend::default());
        backend.script(vec![InboundResponse {
            status: 404,
            body: b"not found".to_vec(),
        }]);
        let transport = default_transport(backend);

        let response = transport.request("GET", "/api/nope", Vec::new()).await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_concurrent_callers_single_login() {
        let backend = Arc::new(MockBackend {
            login_delay: Duration::from_millis(50),
            ..MockBackend::default()
        });
        let transport = Arc::new(default_transport(backend.clone()));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let transport = Arc::clone(&transport);
            handles.push(tokio::spawn(async move {
                transport.request("GET", "/api/games", Vec::new()).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().status, 200);
        }

        assert_eq!(backend.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_login_failure() {
        let backend = Arc::new(MockBackend {
            login_delay: Duration::from_millis(50),
            login_failure: Some(AuthErrorKind::LoginRateLimited),
            ..MockBackend::default()
        });
        let transport = Arc::new(default_transport(backend.clone()));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let transport = Arc::clone(&transport);
            handles.push(tokio::spawn(async move {
                transport.request("GET", "/api/games", Vec::new()).await
            }));
        }
        for handle in handles {
            let err = handle.await.unwrap().unwrap_err();
            assert_eq!(err.auth_kind(), Some(&AuthErrorKind::LoginRateLimited));
        }
        assert_eq!(backend.logins.load(Ordering::SeqCst), 1);
        assert_eq!(backend.seen().len(), 1);

        // A caller arriving after the failure starts a new attempt
        let err = transport.ensure_session().await.unwrap_err();
        assert_eq!(err.auth_kind(), Some(&AuthErrorKind::LoginRateLimited));
        assert_eq!(backend.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_login_timeout() {
        let backend = Arc::new(MockBackend {
            login_delay: Duration::from_millis(200),
            slow_login: Some(1),
            ..MockBackend::default()
        });
        let config = TransportConfig {
            request_timeout: Duration::from_millis(50),
            ..TransportConfig::default()
        };
        let transport = Arc::new(transport(
            backend.clone(),
            Arc::new(ManualClock::new(T0)),
            config,
        ));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let transport = Arc::clone(&transport);
            handles.push(tokio::spawn(async move { transport.ensure_session().await }));
        }
        for handle in handles {
            let err = handle.await.unwrap().unwrap_err();
            assert!(matches!(
                err,
                AuthError::Transport {
                    kind: TransportErrorKind::Timeout { .. }
                }
            ));
        }
        assert_eq!(backend.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_login_timeout_leaves_no_session() {
        let backend = Arc::new(MockBackend {
            login_delay: Duration::from_millis(200),
            ..MockBackend::default()
        });
        let config = TransportConfig {
            request_timeout: Duration::from_millis(50),
            ..TransportConfig::default()
        };
        let transport = transport(backend, Arc::new(ManualClock::new(T0)), config);

        let err = transport.ensure_session().await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Transport {
                kind: TransportErrorKind::Timeout { .. }
            }
        ));
        assert_eq!(transport.state(), SessionState::NoSession);
    }

    #[tokio::test]
    async fn test_login_rejection_surfaced() {
        let backend = Arc::new(MockBackend {
            login_failure: Some(AuthErrorKind::SignatureMismatch),
            ..MockBackend::default()
        });
        let transport = default_transport(backend.clone());

        let err = transport.request("GET", "/api/games", Vec::new()).await.unwrap_err();
        assert_eq!(err.auth_kind(), Some(&AuthErrorKind::SignatureMismatch));
        assert_eq!(transport.state(), SessionState::NoSession);
        // The business call is never sent without a session
        assert_eq!(backend.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_timeout_discards_rejected_session() {
        let backend = Arc::new(MockBackend {
            login_delay: Duration::from_millis(200),
            slow_login: Some(2),
            ..MockBackend::default()
        });
        backend.script(vec![rejection(AuthErrorKind::TokenExpired)]);
        let config = TransportConfig {
            request_timeout: Duration::from_millis(50),
            ..TransportConfig::default()
        };
        let transport = transport(backend.clone(), Arc::new(ManualClock::new(T0)), config);

        let err = transport.request("GET", "/api/games", Vec::new()).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Transport {
                kind: TransportErrorKind::Timeout { .. }
            }
        ));
        assert_eq!(transport.state(), SessionState::NoSession);
        assert_eq!(backend.logins.load(Ordering::SeqCst), 2);

        // token-1 is never sent again
        let response = transport.request("GET", "/api/games", Vec::new()).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(backend.logins.load(Ordering::SeqCst), 3);
        let seen = backend.seen();
        assert_eq!(seen.last().unwrap().header(AUTHORIZATION), Some("Bearer token-3"));
    }

    #[tokio::test]
    async fn test_content_type_only_on_json_bodies() {
        let backend = Arc::new(MockBackend::default());
        let transport = default_transport(backend.clone());

        transport
            .request("PUT", "/api/saves/1", b"\x00\x01raw".to_vec())
            .await
            .unwrap();
        transport
            .request_json("POST", "/api/games", &serde_json::json!({ "title": "Celeste" }))
            .await
            .unwrap();

        let seen = backend.seen();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].header("content-type"), Some("application/json"));
        assert_eq!(seen[1].header("content-type"), None);
        assert_eq!(seen[2].header("content-type"), Some("application/json"));
        assert_eq!(seen[2].body, br#"{"title":"Celeste"}"#.to_vec());
    }
}
