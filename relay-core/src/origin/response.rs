//! Origin response interpretation.

use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, stream};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};

use crate::error::TransportError;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Status and headers from the origin, with the body not yet read.
///
/// Dropping the response without calling [`OriginResponse::read_body`]
/// abandons the body, which is what a range-capable probe wants.
pub struct OriginResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: ByteStream,
}

impl OriginResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: ByteStream) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Creates a response whose body is already in memory.
    pub fn from_bytes(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self::new(status, headers, Box::pin(stream::once(async move { Ok(body) })))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// 2xx statuses, including `206 Partial Content`.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Media type from `Content-Type`, with parameters stripped.
    pub fn content_type(&self) -> Option<String> {
        let value = self.headers.get(CONTENT_TYPE)?.to_str().ok()?;
        let media_type = value.split(';').next().unwrap_or_default().trim();
        (!media_type.is_empty()).then(|| media_type.to_string())
    }

    /// `Content-Length`, or 0 when absent or malformed.
    pub fn content_length(&self) -> u64 {
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Whether the origin sent a non-empty `Accept-Ranges` header.
    pub fn accepts_ranges(&self) -> bool {
        self.headers.get_all(ACCEPT_RANGES).iter().any(|value| {
            value
                .to_str()
                .is_ok_and(|units| units.split(',').any(|unit| !unit.trim().is_empty()))
        })
    }

    /// Reads the whole body into memory.
    ///
    /// # Errors
    ///
    /// - `TransportError::Body` - The body stream failed part way
    pub async fn read_body(self) -> Result<Bytes, TransportError> {
        let mut body = self.body;
        let mut buffer = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }
}

impl std::fmt::Debug for OriginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OriginResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
