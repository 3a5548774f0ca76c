//! Configuration settings for the authentication core.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use zeroize::Zeroizing;

use crate::auth::{load_secret, ClientCredential, ClientRegistry};
use crate::error::AuthError;

/// Environment variable holding the raw session-signing secret.
pub const SESSION_SECRET_ENV: &str = "GAMEDASH_SESSION_SECRET";

/// Environment variable overriding the log level.
pub const LOG_LEVEL_ENV: &str = "GAMEDASH_LOG_LEVEL";

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub signature: SignatureConfig,
    #[serde(default)]
    pub login_rate_limit: LoginRateLimitConfig,
    /// Provisioned clients (server side).
    #[serde(default)]
    pub clients: Vec<ClientConfig>,
    /// This machine's own identity (desktop side).
    pub client: Option<DesktopClientConfig>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Session token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Path to the session-signing secret. `GAMEDASH_SESSION_SECRET` wins.
    pub secret_path: Option<PathBuf>,
    /// Session lifetime in seconds.
    #[serde(default = "default_session_ttl")]
    pub ttl_seconds: u64,
}

/// Request signature configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SignatureConfig {
    /// Accepted clock skew in seconds, either direction.
    #[serde(default = "default_timestamp_window")]
    pub timestamp_window_seconds: u64,
    /// Nonce time-to-live in seconds.
    #[serde(default = "default_nonce_ttl")]
    pub nonce_ttl_seconds: u64,
    /// Maximum number of remembered nonces.
    #[serde(default = "default_nonce_capacity")]
    pub nonce_capacity: usize,
    /// Background nonce sweep interval in seconds.
    #[serde(default = "default_cleanup_interval")]
    pub nonce_cleanup_interval_seconds: u64,
}

/// Login rate limit configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRateLimitConfig {
    /// Maximum logins per client per window.
    #[serde(default = "default_login_requests")]
    pub requests: usize,
    /// Window in seconds.
    #[serde(default = "default_login_window")]
    pub window_seconds: u64,
}

/// One provisioned client.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,
    /// Path to the shared secret file.
    pub secret_path: PathBuf,
}

/// Desktop-side identity and transport settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DesktopClientConfig {
    /// Backend base URL, e.g. `https://api.example.com`.
    pub base_url: String,
    pub client_id: String,
    /// Path to this client's shared secret file.
    pub secret_path: PathBuf,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Timeout for every network call, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Refresh this many seconds before the session expires.
    #[serde(default = "default_refresh_margin")]
    pub refresh_margin_seconds: u64,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_session_ttl() -> u64 {
    1200
}

fn default_timestamp_window() -> u64 {
    60
}

fn default_nonce_ttl() -> u64 {
    300
}

fn default_nonce_capacity() -> usize {
    10_000
}

fn default_cleanup_interval() -> u64 {
    60
}

fn default_login_requests() -> usize {
    10
}

fn default_login_window() -> u64 {
    60
}

fn default_login_path() -> String {
    "/api/auth/login".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

fn default_refresh_margin() -> u64 {
    60
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret_path: None,
            ttl_seconds: default_session_ttl(),
        }
    }
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            timestamp_window_seconds: default_timestamp_window(),
            nonce_ttl_seconds: default_nonce_ttl(),
            nonce_capacity: default_nonce_capacity(),
            nonce_cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

impl Default for LoginRateLimitConfig {
    fn default() -> Self {
        Self {
            requests: default_login_requests(),
            window_seconds: default_login_window(),
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl SignatureConfig {
    pub fn timestamp_window(&self) -> Duration {
        Duration::from_secs(self.timestamp_window_seconds)
    }

    pub fn nonce_ttl(&self) -> Duration {
        Duration::from_secs(self.nonce_ttl_seconds)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.nonce_cleanup_interval_seconds)
    }
}

impl LoginRateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

impl DesktopClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.refresh_margin_seconds)
    }

    /// Load this client's shared secret.
    pub fn secret(&self) -> Result<Zeroizing<Vec<u8>>, AuthError> {
        load_secret(&self.secret_path)
    }
}

impl Settings {
    /// Load settings from a TOML configuration file, then apply
    /// environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| AuthError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        let mut settings: Settings = toml::from_str(&content).map_err(|e| AuthError::Config {
            message: format!("Failed to parse config file '{}': {}", path.display(), e),
        })?;

        settings.apply_env_overrides(|name| std::env::var(name).ok());
        settings.validate()?;

        Ok(settings)
    }

    /// Parse settings from a TOML string without touching the environment.
    pub fn from_toml_str(content: &str) -> Result<Self, AuthError> {
        let settings: Settings = toml::from_str(content).map_err(|e| AuthError::Config {
            message: format!("Failed to parse configuration: {}", e),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    fn apply_env_overrides<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = env(LOG_LEVEL_ENV).filter(|l| !l.is_empty()) {
            self.logging.level = level;
        }
    }

    /// Resolve the session-signing secret.
    ///
    /// `GAMEDASH_SESSION_SECRET` takes precedence over `session.secret_path`.
    pub fn session_secret(&self) -> Result<Zeroizing<Vec<u8>>, AuthError> {
        self.session_secret_from(|name| std::env::var(name).ok())
    }

    fn session_secret_from<F>(&self, env: F) -> Result<Zeroizing<Vec<u8>>, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = env(SESSION_SECRET_ENV).filter(|s| !s.is_empty()) {
            return Ok(Zeroizing::new(secret.into_bytes()));
        }
        match &self.session.secret_path {
            Some(path) => load_secret(path),
            None => Err(AuthError::Config {
                message: format!(
                    "No session secret: set {} or session.secret_path",
                    SESSION_SECRET_ENV
                ),
            }),
        }
    }

    /// Load every provisioned client secret into a registry.
    pub fn client_registry(&self) -> Result<ClientRegistry, AuthError> {
        let credentials = self
            .clients
            .iter()
            .map(|client| {
                let secret = load_secret(&client.secret_path)?;
                Ok(ClientCredential::new(client.client_id.clone(), secret.to_vec()))
            })
            .collect::<Result<Vec<_>, AuthError>>()?;
        ClientRegistry::new(credentials)
    }

    /// Validate the settings.
    fn validate(&self) -> Result<(), AuthError> {
        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(AuthError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        // Validate log format
        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(AuthError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        let non_zero = [
            ("session.ttl_seconds", self.session.ttl_seconds),
            (
                "signature.timestamp_window_seconds",
                self.signature.timestamp_window_seconds,
            ),
            ("signature.nonce_ttl_seconds", self.signature.nonce_ttl_seconds),
            ("signature.nonce_capacity", self.signature.nonce_capacity as u64),
            (
                "signature.nonce_cleanup_interval_seconds",
                self.signature.nonce_cleanup_interval_seconds,
            ),
            ("login_rate_limit.requests", self.login_rate_limit.requests as u64),
            ("login_rate_limit.window_seconds", self.login_rate_limit.window_seconds),
        ];
        for (name, value) in non_zero {
            if value == 0 {
                return Err(AuthError::Config {
                    message: format!("{} must be greater than zero", name),
                });
            }
        }

        // Validate client ids
        let mut seen = std::collections::HashSet::new();
        for client in &self.clients {
            if client.client_id.trim().is_empty() {
                return Err(AuthError::Config {
                    message: "Client id must not be empty".to_string(),
                });
            }
            if !seen.insert(client.client_id.as_str()) {
                return Err(AuthError::Config {
                    message: format!("Duplicate client id '{}'", client.client_id),
                });
            }
        }

        if let Some(client) = &self.client {
            if client.client_id.trim().is_empty() {
                return Err(AuthError::Config {
                    message: "client.client_id must not be empty".to_string(),
                });
            }
            if client.request_timeout_seconds == 0 {
                return Err(AuthError::Config {
                    message: "client.request_timeout_seconds must be greater than zero"
                        .to_string(),
                });
            }
            if client.refresh_margin_seconds >= self.session.ttl_seconds {
                return Err(AuthError::Config {
                    message: format!(
                        "client.refresh_margin_seconds ({}) must be smaller than \
                         session.ttl_seconds ({})",
                        client.refresh_margin_seconds, self.session.ttl_seconds
                    ),
                });
            }
        }

        Ok(())
    }
}
