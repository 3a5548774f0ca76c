//! Wire protocol module.
//!
//! Defines the header contract, the signed request envelope and the JSON
//! bodies exchanged between the desktop client and the backend.
//!
//! ## Headers
//!
//! ```text
//! Authorization: Bearer <session token>     (session routes only)
//! X-Client-Id:   <client id>
//! X-Timestamp:   <unix seconds>
//! X-Nonce:       <hex, >= 16 random bytes>
//! X-Signature:   <base64 HMAC-SHA256>
//! ```

mod envelope;
mod response;

pub use envelope::{
    bearer_token, SignedRequestEnvelope, AUTHORIZATION, CLIENT_ID_HEADER, NONCE_HEADER,
    SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
pub use response::{ErrorBody, ErrorResponse, LoginRequest, LoginResponse};
