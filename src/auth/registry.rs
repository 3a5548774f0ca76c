//! Statically provisioned client credentials.

use std::collections::HashMap;
use std::path::Path;

use zeroize::Zeroizing;

use crate::error::AuthError;

/// One provisioned client.
pub struct ClientCredential {
    client_id: String,
    shared_secret: Zeroizing<Vec<u8>>,
}

impl ClientCredential {
    /// Create a credential.
    pub fn new(client_id: impl Into<String>, shared_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            client_id: client_id.into(),
            shared_secret: Zeroizing::new(shared_secret.into()),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn shared_secret(&self) -> &[u8] {
        &self.shared_secret
    }
}

impl std::fmt::Debug for ClientCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredential")
            .field("client_id", &self.client_id)
            .field("shared_secret", &"<redacted>")
            .finish()
    }
}

/// Read-only registry of credentials keyed by client id.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<String, ClientCredential>,
}

impl ClientRegistry {
    /// Build a registry, rejecting duplicate or empty ids.
    pub fn new(credentials: impl IntoIterator<Item = ClientCredential>) -> Result<Self, AuthError> {
        let mut clients = HashMap::new();
        for credential in credentials {
            if credential.client_id.is_empty() {
                return Err(AuthError::Config {
                    message: "Client id must not be empty".to_string(),
                });
            }
            if credential.shared_secret.is_empty() {
                return Err(AuthError::Config {
                    message: format!("Client '{}' has an empty secret", credential.client_id),
                });
            }
            if clients.contains_key(&credential.client_id) {
                return Err(AuthError::Config {
                    message: format!("Duplicate client id '{}'", credential.client_id),
                });
            }
            clients.insert(credential.client_id.clone(), credential);
        }
        Ok(Self { clients })
    }

    /// Look up a client.
    pub fn get(&self, client_id: &str) -> Option<&ClientCredential> {
        self.clients.get(client_id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

/// Load a secret from a file.
///
/// Security: Verifies the file has restrictive permissions (0600 or 0400)
/// before loading to prevent secrets from being readable by other users.
/// A single trailing newline is stripped.
pub fn load_secret(path: &Path) -> Result<Zeroizing<Vec<u8>>, AuthError> {
    // Check file permissions first
    let metadata = std::fs::metadata(path).map_err(|e| AuthError::Config {
        message: format!(
            "Failed to read secret metadata from {}: {}",
            path.display(),
            e
        ),
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = metadata.permissions().mode();
        // Check that group and world bits are all zero (only owner can access)
        if mode & 0o077 != 0 {
            return Err(AuthError::Config {
                message: format!(
                    "Secret file {} has insecure permissions {:04o}, expected 0600 or 0400",
                    path.display(),
                    mode & 0o777
                ),
            });
        }
    }
    #[cfg(not(unix))]
    let _ = metadata;

    let mut secret = Zeroizing::new(std::fs::read(path).map_err(|e| AuthError::Config {
        message: format!("Failed to read secret from {}: {}", path.display(), e),
    })?);

    if secret.last() == Some(&b'\n') {
        secret.pop();
        if secret.last() == Some(&b'\r') {
            secret.pop();
        }
    }

    if secret.is_empty() {
        return Err(AuthError::Config {
            message: format!("Secret file {} is empty", path.display()),
        });
    }

    Ok(secret)
}
