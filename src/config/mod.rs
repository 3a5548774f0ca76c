//! Configuration module.
//!
//! Handles loading and validating configuration from TOML files, with a
//! small set of environment overrides.

mod settings;

pub use settings::*;
