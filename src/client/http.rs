//! HTTP seam for the transport.
//!
//! The transport only needs "send these bytes, get a status and bytes
//! back", so it talks to an [`HttpClient`] rather than to reqwest directly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};

use crate::error::{AuthError, AuthResult, TransportErrorKind};

/// A fully built request, headers included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: String,
    /// Path relative to the backend base URL, e.g. `/api/games`.
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl OutboundRequest {
    /// Look up a header by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A response as the transport sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl InboundResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to the backend.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> AuthResult<InboundResponse>;
}

#[async_trait]
impl<T: HttpClient + ?Sized> HttpClient for Arc<T> {
    async fn send(&self, request: OutboundRequest) -> AuthResult<InboundResponse> {
        (**self).send(request).await
    }
}

/// [`HttpClient`] backed by reqwest.
pub struct ReqwestClient {
    client: Client,
    base_url: String,
}

impl ReqwestClient {
    pub fn new(base_url: &str, timeout: Duration) -> AuthResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gamedash-auth/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AuthError::Config {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: OutboundRequest) -> AuthResult<InboundResponse> {
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|e| {
            AuthError::Transport {
                kind: TransportErrorKind::RequestFailed {
                    message: format!("Invalid method '{}': {}", request.method, e),
                },
            }
        })?;

        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(method, url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .body(request.body)
            .send()
            .await
            .map_err(request_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(request_error)?;

        Ok(InboundResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn request_error(e: reqwest::Error) -> AuthError {
    let message = e.to_string();
    AuthError::Transport {
        kind: TransportErrorKind::RequestFailed { message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = OutboundRequest {
            method: "GET".to_string(),
            path: "/api/games".to_string(),
            headers: vec![("X-Nonce".to_string(), "abc".to_string())],
            body: Vec::new(),
        };
        assert_eq!(request.header("x-nonce"), Some("abc"));
        assert_eq!(request.header("X-Signature"), None);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client =
            ReqwestClient::new("https://api.example.com/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url, "https://api.example.com");
    }
}
