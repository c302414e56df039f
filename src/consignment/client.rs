//! HTTP client for the logistics provider
//!
//! Issues exactly one POST per call. Redirects are not followed and nothing
//! is retried here; the caller classifies whatever status comes back.

use crate::config::ProviderSection;
use crate::consignment::request::ConsignmentRequest;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{redirect, Client};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Path appended to the provider base URL
pub const CONSIGNMENT_REQUEST_PATH: &str = "/consignment/request";

/// Status and body exactly as the provider returned them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Network-level failures talking to the provider
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("invalid provider endpoint: {0}")]
    InvalidEndpoint(String),
}

impl TransportError {
    /// Short name of the failure kind, used in failure report details
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Timeout(_) => "Timeout",
            TransportError::Connect(_) => "Connect",
            TransportError::Request(_) => "Request",
            TransportError::Body(_) => "Body",
            TransportError::InvalidEndpoint(_) => "InvalidEndpoint",
        }
    }

    fn from_send(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Provider API seam so the processor can run against mocks
#[async_trait]
pub trait ConsignmentApi: Send + Sync {
    /// Full endpoint URL, for logging
    fn endpoint(&self) -> &str;

    /// Submit one consignment request
    async fn send(&self, request: &ConsignmentRequest) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed provider client
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct ConsignmentClient {
    client: Client,
    endpoint: String,
}

impl ConsignmentClient {
    /// Build a client for the configured provider
    pub fn new(config: &ProviderSection) -> Result<Self, TransportError> {
        let endpoint = Self::build_endpoint(&config.base_url)?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    /// `<base>/consignment/request`, tolerating a trailing slash on the base
    fn build_endpoint(base_url: &str) -> Result<String, TransportError> {
        let base = base_url.trim().trim_end_matches('/');
        let endpoint = format!("{base}{CONSIGNMENT_REQUEST_PATH}");

        Url::parse(&endpoint)
            .map_err(|e| TransportError::InvalidEndpoint(format!("{endpoint}: {e}")))?;

        Ok(endpoint)
    }
}

#[async_trait]
impl ConsignmentApi for ConsignmentClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, request: &ConsignmentRequest) -> Result<RawResponse, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                let error = TransportError::from_send(e);
                warn!(kind = error.kind(), "Logistics API network error: {}", error);
                error
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        debug!(status, body_length = body.len(), "Logistics API responded");

        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_base_and_path() {
        assert_eq!(
            ConsignmentClient::build_endpoint("http://logistics.local:8080/v1").unwrap(),
            "http://logistics.local:8080/v1/consignment/request"
        );
        assert_eq!(
            ConsignmentClient::build_endpoint("http://logistics.local:8080/v1/").unwrap(),
            "http://logistics.local:8080/v1/consignment/request"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let err = ConsignmentClient::build_endpoint("logistics without scheme").unwrap_err();
        assert!(matches!(err, TransportError::InvalidEndpoint(_)));
    }

    #[test]
    fn test_client_uses_configured_endpoint() {
        let config = ProviderSection {
            base_url: "https://logistics.example.com/v1".to_string(),
            ..Default::default()
        };
        let client = ConsignmentClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://logistics.example.com/v1/consignment/request"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(TransportError::Timeout("t".into()).kind(), "Timeout");
        assert_eq!(TransportError::Connect("c".into()).kind(), "Connect");
        assert_eq!(TransportError::Body("b".into()).kind(), "Body");
    }
}
