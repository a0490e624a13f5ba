//! Transport to the collection endpoint.
//!
//! One fire-and-forget GET per hit. The response body is never read.

use crate::config::HttpConfig;
use crate::error::TransportError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::trace;

/// HTTP GET collaborator
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one GET to `url` with `query` appended in order.
    async fn get(&self, url: &str, query: &[(&'static str, String)]) -> Result<(), TransportError>;
}

// Helper function to map HTTP errors to TransportError
fn map_http_error(error: reqwest::Error) -> TransportError {
    if let Some(status) = error.status() {
        TransportError::Status(status.as_u16())
    } else if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Request(error.to_string())
    }
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig, user_agent: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(user_agent)
            .build()
            .map_err(|e| TransportError::Request(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing client (shared connection pool, custom TLS, ...).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, query: &[(&'static str, String)]) -> Result<(), TransportError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(map_http_error)?;
        let status = response.status();
        trace!(status = status.as_u16(), "Collector responded");
        response.error_for_status().map_err(map_http_error)?;
        Ok(())
    }
}
