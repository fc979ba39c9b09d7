//! HTTP client seam for origin access.

use async_trait::async_trait;
use futures::TryStreamExt;
use tracing::{debug, warn};

use super::request::OriginRequest;
use super::response::OriginResponse;
use crate::config::{TransportConfig, TrustPolicy};
use crate::error::TransportError;

/// Sends origin requests.
///
/// Implementations return non-success statuses as ordinary responses; only
/// failures to obtain a response at all are errors.
#[async_trait]
pub trait OriginClient: Send + Sync {
    /// Sends one request and returns the response head with a lazy body.
    ///
    /// # Errors
    ///
    /// - `TransportError::Connect` - Origin unreachable
    /// - `TransportError::Timeout` - Configured timeout elapsed
    /// - `TransportError::Request` - Any other HTTP stack failure
    async fn send(&self, request: OriginRequest) -> Result<OriginResponse, TransportError>;
}

/// Production origin client backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpOriginClient {
    client: reqwest::Client,
}

impl HttpOriginClient {
    /// Creates a client honoring the transport configuration.
    ///
    /// # Errors
    ///
    /// - `TransportError::ClientBuild` - TLS backend or client setup failed
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.redirect_limit));

        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if config.trust_policy == TrustPolicy::TrustAll {
            warn!("Origin certificate validation is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::ClientBuild {
                reason: e.to_string(),
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl OriginClient for HttpOriginClient {
    async fn send(&self, request: OriginRequest) -> Result<OriginResponse, TransportError> {
        let (method, url, headers) = request.into_parts();

        let response = self
            .client
            .request(method, url.clone())
            .headers(headers)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        debug!(%url, %status, "Origin responded");

        let body = response.bytes_stream().map_err(TransportError::from);
        Ok(OriginResponse::new(status, headers, Box::pin(body)))
    }
}
