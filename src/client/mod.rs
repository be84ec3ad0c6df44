//! Authenticated delivery of reports to the downstream API.
//!
//! [`DeliveryClient`] is the seam the rest of the crate talks to;
//! [`HttpDeliveryClient`] is the `reqwest`-backed implementation.
//!
//! A client owns at most one [`AuthSession`]. Sessions are never persisted
//! and never shared between client instances.

mod http;

pub use http::HttpDeliveryClient;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while authenticating or sending.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// Credentials were rejected or the token response was unusable.
    #[error("could not authenticate: {0}")]
    Authentication(String),

    /// The request never produced a response (connection, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered outside the 2xx range.
    #[error("unexpected status code: {status}")]
    UnexpectedStatus {
        /// Status line, e.g. `404 Not Found`.
        status: String,
        /// Numeric status code.
        code: u16,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Bearer credential returned by the token endpoint.
#[derive(Clone, Deserialize)]
pub struct AuthSession {
    /// The bearer token.
    #[serde(default)]
    pub access_token: String,
    /// Token type advertised by the server. Requests always use `Bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds, when advertised.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl AuthSession {
    /// Create a session from a raw token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: None,
            expires_in: None,
        }
    }

    /// The `Authorization` header value for this session.
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Client for the downstream report API.
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    /// Exchange client credentials for a session.
    ///
    /// On success the session is kept for subsequent [`send`](Self::send)
    /// calls. No retry is attempted.
    ///
    /// # Errors
    ///
    /// - [`DeliveryError::Authentication`] on a non-success status, an
    ///   unparseable response or an empty access token.
    /// - [`DeliveryError::Transport`] when the endpoint is unreachable.
    async fn authenticate(
        &self,
        client_id: &str,
        client_secret: &str,
        endpoint: &str,
    ) -> Result<(), DeliveryError>;

    /// Send a JSON body and return the raw response body.
    ///
    /// A bearer header is attached when a session exists. An empty success
    /// body is returned as an empty vector, not an error.
    ///
    /// # Errors
    ///
    /// - [`DeliveryError::Transport`] when no response was received.
    /// - [`DeliveryError::UnexpectedStatus`] for statuses outside 200..=299.
    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: &[u8],
    ) -> Result<Vec<u8>, DeliveryError>;
}

#[async_trait]
impl<T: DeliveryClient + ?Sized> DeliveryClient for Arc<T> {
    async fn authenticate(
        &self,
        client_id: &str,
        client_secret: &str,
        endpoint: &str,
    ) -> Result<(), DeliveryError> {
        (**self)
            .authenticate(client_id, client_secret, endpoint)
            .await
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: &[u8],
    ) -> Result<Vec<u8>, DeliveryError> {
        (**self).send(method, endpoint, body).await
    }
}
