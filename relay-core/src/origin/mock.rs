//! Scripted origin client for tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use parking_lot::Mutex;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use super::client::OriginClient;
use super::request::OriginRequest;
use super::response::OriginResponse;
use crate::error::TransportError;

/// One scripted answer from [`MockOriginClient`].
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Origin answers with this status, headers and body
    Response {
        status: u16,
        headers: Vec<(String, String)>,
        body: Bytes,
    },
    /// Headers arrive, then the body stream fails after `partial` bytes
    BrokenBody { status: u16, partial: Bytes },
    /// Origin cannot be reached
    Unreachable,
}

impl MockReply {
    /// `200 OK` with the given body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::status(200, body)
    }

    /// Arbitrary status with the given body.
    pub fn status(status: u16, body: impl Into<Bytes>) -> Self {
        MockReply::Response {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Adds a response header. No effect on failure replies.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let MockReply::Response { headers, .. } = &mut self {
            headers.push((name.to_string(), value.to_string()));
        }
        self
    }

    fn into_response(self, url: &str) -> Result<OriginResponse, TransportError> {
        match self {
            MockReply::Response {
                status,
                headers,
                body,
            } => {
                let mut map = HeaderMap::new();
                for (name, value) in headers {
                    let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                        TransportError::Request {
                            reason: e.to_string(),
                        }
                    })?;
                    let value =
                        HeaderValue::from_str(&value).map_err(|e| TransportError::Request {
                            reason: e.to_string(),
                        })?;
                    map.append(name, value);
                }
                Ok(OriginResponse::from_bytes(status_code(status)?, map, body))
            }
            MockReply::BrokenBody { status, partial } => {
                let chunks = stream::iter(vec![
                    Ok(partial),
                    Err(TransportError::Body {
                        reason: "connection reset by origin".to_string(),
                    }),
                ]);
                Ok(OriginResponse::new(
                    status_code(status)?,
                    HeaderMap::new(),
                    Box::pin(chunks),
                ))
            }
            MockReply::Unreachable => Err(TransportError::Connect {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}

fn status_code(status: u16) -> Result<StatusCode, TransportError> {
    StatusCode::from_u16(status).map_err(|e| TransportError::Request {
        reason: e.to_string(),
    })
}

/// Origin client that replays scripted replies and records every request.
///
/// Replies are consumed in order; once exhausted, every further request
/// fails as unreachable.
#[derive(Debug, Default)]
pub struct MockOriginClient {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<OriginRequest>>,
}

impl MockOriginClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply for the next unanswered request.
    pub fn with_reply(self, reply: MockReply) -> Self {
        self.replies.lock().push_back(reply);
        self
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<OriginRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl OriginClient for MockOriginClient {
    async fn send(&self, request: OriginRequest) -> Result<OriginResponse, TransportError> {
        let url = request.url().to_string();
        self.requests.lock().push(request);

        let reply = self
            .replies
            .lock()
            .pop_front()
            .unwrap_or(MockReply::Unreachable);
        reply.into_response(&url)
    }
}
