//! Authentication module.
//!
//! Handles request signing and verification, nonce tracking, session
//! tokens, the client registry and per-client login rate limiting.

pub mod clock;
mod rate_limit;
mod registry;
mod replay;
mod session;
mod signer;
mod verifier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use rate_limit::LoginRateLimiter;
pub use registry::{load_secret, ClientCredential, ClientRegistry};
pub use replay::{ReplayGuard, DEFAULT_NONCE_CAPACITY, DEFAULT_NONCE_TTL};
pub use session::{
    SessionClaims, SessionTokenIssuer, SessionTokenVerifier, ACCESS_TOKEN_TYPE,
    DEFAULT_SESSION_TTL,
};
pub use signer::{
    body_digest, canonical_message, generate_nonce, sign, timestamp_string, verify,
    RequestSignature, RequestSigner, NONCE_BYTES,
};
pub use verifier::{SignatureVerifier, DEFAULT_TIMESTAMP_WINDOW};
