//! Caller-supplied hooks.
//!
//! Both hooks are awaited in-line: a slow hook delays the loading request it
//! runs for, and nothing else.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use tracing::error;

use crate::error::{HookError, RelayError};
use crate::origin::OriginRequest;

/// Last chance to adjust an origin request before it is sent.
///
/// Runs exactly once per outgoing request. A failure fails the loading
/// request the origin request was built for.
#[async_trait]
pub trait RequestOverride: Send + Sync {
    /// Mutates the request in place, typically adding authentication headers.
    ///
    /// # Errors
    ///
    /// - `HookError` - The request must not be sent
    async fn override_request(&self, request: &mut OriginRequest) -> Result<(), HookError>;
}

/// Observer for failures of the interception machinery itself.
///
/// Never sees per-request origin failures; those go to the loading request.
/// A failing reporter is logged and otherwise ignored.
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    /// Records one unexpected failure.
    ///
    /// # Errors
    ///
    /// - `HookError` - Reporting failed; the relay logs it and moves on
    async fn report_error(&self, error: &RelayError) -> Result<(), HookError>;
}

/// Request override that sets a fixed set of headers on every request.
#[derive(Debug, Clone, Default)]
pub struct HeaderOverride {
    headers: HeaderMap,
}

impl HeaderOverride {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header to set on every request.
    ///
    /// # Errors
    ///
    /// - `RelayError::Configuration` - Invalid header name or value
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, RelayError> {
        let name =
            HeaderName::from_bytes(name.trim().as_bytes()).map_err(|e| RelayError::Configuration {
                reason: format!("invalid header name {name:?}: {e}"),
            })?;
        let value = HeaderValue::from_str(value.trim()).map_err(|e| RelayError::Configuration {
            reason: format!("invalid value for header {name}: {e}"),
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Adds `Authorization: Bearer <token>`.
    ///
    /// # Errors
    ///
    /// - `RelayError::Configuration` - Token is not a valid header value
    pub fn with_bearer_token(self, token: &str) -> Result<Self, RelayError> {
        self.with_header(AUTHORIZATION.as_str(), &format!("Bearer {token}"))
    }

    /// Parses a `Name: value` pair as written on a command line.
    ///
    /// # Errors
    ///
    /// - `RelayError::Configuration` - Missing colon or invalid header
    pub fn with_header_line(self, line: &str) -> Result<Self, RelayError> {
        let (name, value) = line.split_once(':').ok_or_else(|| RelayError::Configuration {
            reason: format!("header {line:?} is not in 'Name: value' form"),
        })?;
        self.with_header(name, value)
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

#[async_trait]
impl RequestOverride for HeaderOverride {
    async fn override_request(&self, request: &mut OriginRequest) -> Result<(), HookError> {
        for (name, value) in &self.headers {
            request.set_header(name.clone(), value.clone());
        }
        Ok(())
    }
}

/// Error reporter that logs through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogErrorReporter;

#[async_trait]
impl ErrorReporter for LogErrorReporter {
    async fn report_error(&self, error: &RelayError) -> Result<(), HookError> {
        error!(%error, "Relay interception failure");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::origin::ByteWindow;

    #[tokio::test]
    async fn test_header_override_keeps_range() {
        let hook = HeaderOverride::new()
            .with_bearer_token("X")
            .unwrap()
            .with_header_line("X-Client: relay-tests")
            .unwrap();

        let url = Url::parse("https://example.com/video.mp4").unwrap();
        let mut request = OriginRequest::build(
            &url,
            Some(ByteWindow::Bounded {
                offset: 0,
                length: 10,
            }),
        );
        hook.override_request(&mut request).await.unwrap();

        assert_eq!(request.headers()["authorization"], "Bearer X");
        assert_eq!(request.headers()["x-client"], "relay-tests");
        assert_eq!(request.range(), Some("bytes=0-9"));
    }

    #[test]
    fn test_header_line_requires_colon() {
        let result = HeaderOverride::new().with_header_line("Authorization Bearer X");
        assert!(matches!(result, Err(RelayError::Configuration { .. })));
    }
}
