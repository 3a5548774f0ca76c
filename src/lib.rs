//! GameDash Auth Library
//!
//! Dual-layer client authentication shared by the GameDash desktop client
//! and its backend: every request carries an HMAC-SHA256 signature over a
//! canonical message (replay-protected by timestamp window and nonce), and
//! protected routes additionally require a short-lived HS256 session token
//! obtained through a signed login.
//!
//! - [`server::AuthGate`] is what backend middleware calls.
//! - [`client::AuthenticatedTransport`] is what desktop code sends through.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
