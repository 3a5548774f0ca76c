//! Error types for the authentication core.
//!
//! Provides a unified error handling system using thiserror.

mod types;

pub use types::*;
