//! `reqwest`-backed delivery client.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;

use super::{AuthSession, DeliveryClient, DeliveryError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Delivery client speaking HTTP to the report API.
///
/// # Examples
///
/// ```no_run
/// use tide_audit::client::{DeliveryClient, HttpDeliveryClient};
/// use reqwest::Method;
///
/// # async fn run() -> Result<(), tide_audit::client::DeliveryError> {
/// let client = HttpDeliveryClient::new()?;
/// client
///     .authenticate("client-id", "client-secret", "https://api.example.org/auth")
///     .await?;
/// let body = client
///     .send(Method::POST, "https://api.example.org/audit", br#"{"title":""}"#)
///     .await?;
/// # let _ = body;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HttpDeliveryClient {
    http: reqwest::Client,
    session: RwLock<Option<AuthSession>>,
}

impl HttpDeliveryClient {
    /// Create a client with the default 30 second request timeout.
    pub fn new() -> Result<Self, DeliveryError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DeliveryError::Client)?;
        Ok(Self::with_http_client(http))
    }

    /// Wrap an existing `reqwest` client.
    pub fn with_http_client(http: reqwest::Client) -> Self {
        Self {
            http,
            session: RwLock::new(None),
        }
    }

    /// The current session, if authenticated.
    pub fn session(&self) -> Option<AuthSession> {
        self.session.read().clone()
    }

    /// Returns `true` once [`authenticate`](DeliveryClient::authenticate)
    /// has succeeded.
    pub fn is_authenticated(&self) -> bool {
        self.session.read().is_some()
    }
}

#[async_trait]
impl DeliveryClient for HttpDeliveryClient {
    async fn authenticate(
        &self,
        client_id: &str,
        client_secret: &str,
        endpoint: &str,
    ) -> Result<(), DeliveryError> {
        tracing::debug!(endpoint = %endpoint, "Requesting access token");

        let form = [("api_key", client_id), ("api_secret", client_secret)];
        let response = self.http.post(endpoint).form(&form).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(endpoint = %endpoint, status = %status, "Token endpoint rejected credentials");
            return Err(DeliveryError::Authentication(format!(
                "token endpoint returned {status}"
            )));
        }

        let body = response.bytes().await?;
        let session: AuthSession = serde_json::from_slice(&body).map_err(|e| {
            DeliveryError::Authentication(format!("unreadable token response: {e}"))
        })?;

        if session.access_token.is_empty() {
            return Err(DeliveryError::Authentication(
                "token response carried an empty access token".to_string(),
            ));
        }

        *self.session.write() = Some(session);
        tracing::info!(endpoint = %endpoint, "Authenticated against report API");
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: &[u8],
    ) -> Result<Vec<u8>, DeliveryError> {
        let mut request = self
            .http
            .request(method.clone(), endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_vec());

        let authorization = self.session.read().as_ref().map(AuthSession::header_value);
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(method = %method, endpoint = %endpoint, error = %e, "Request failed");
            DeliveryError::Transport(e)
        })?;

        let status = response.status();
        if !(200..=299).contains(&status.as_u16()) {
            tracing::warn!(method = %method, endpoint = %endpoint, status = %status, "Unexpected status");
            return Err(DeliveryError::UnexpectedStatus {
                status: status.to_string(),
                code: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        tracing::debug!(
            method = %method,
            endpoint = %endpoint,
            status = %status,
            bytes = bytes.len(),
            "Request delivered"
        );
        Ok(bytes.to_vec())
    }
}
