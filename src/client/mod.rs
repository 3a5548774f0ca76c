//! Desktop side of the protocol.
//!
//! [`AuthenticatedTransport`] wraps an [`HttpClient`] and makes both auth
//! layers invisible to callers: it logs in on demand, signs every request
//! and recovers once from a server-side session expiry.

mod http;
mod transport;

pub use http::{HttpClient, InboundResponse, OutboundRequest, ReqwestClient};
pub use transport::{AuthenticatedTransport, SessionState, TransportConfig};
