//! Backend side of the protocol.
//!
//! [`AuthGate`] is what the web framework's middleware calls: it turns a
//! [`crate::protocol::SignedRequestEnvelope`] into either an authenticated
//! client or a [`Rejection`] carrying the status code and JSON body to send.

mod gate;

pub use gate::{AuthGate, AuthenticatedClient, GateConfig, Rejection};
