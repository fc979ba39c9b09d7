use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use super::{ContentInfo, LoadingRequest};
use crate::error::RelayError;

/// How a loading request ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// `finish_loading` was signaled
    Succeeded,
    /// `finish_loading_with_error` was signaled
    Failed,
    /// The engine cancelled the request; nothing was signaled
    Cancelled,
}

/// Exclusive right to complete one loading request.
///
/// `finish` consumes the handle, so a resolver cannot signal twice. A handle
/// dropped without finishing (a panicking resolver, a runtime shutting down)
/// fails the request so the engine is never left waiting.
pub(crate) struct Completion {
    request: Option<Arc<dyn LoadingRequest>>,
}

impl Completion {
    /// Takes ownership of a pending request.
    ///
    /// # Errors
    ///
    /// - `RelayError::ProtocolViolation` - The request was already resolved
    pub(crate) fn begin(request: Arc<dyn LoadingRequest>) -> Result<Self, RelayError> {
        if request.is_finished() {
            return Err(RelayError::ProtocolViolation {
                reason: "loading request was already finished".to_string(),
            });
        }
        Ok(Self {
            request: Some(request),
        })
    }

    fn request(&self) -> Option<&Arc<dyn LoadingRequest>> {
        self.request.as_ref().filter(|request| !request.is_cancelled())
    }

    pub(crate) fn data_request(&self) -> Option<super::DataRequest> {
        self.request.as_ref().and_then(|request| request.data_request())
    }

    pub(crate) fn fill_content_info(&self, info: ContentInfo) {
        if let Some(request) = self.request() {
            trace!(?info, "Filling content information");
            request.fill_content_info(info);
        }
    }

    pub(crate) fn deliver(&self, data: Bytes) {
        if let Some(request) = self.request() {
            trace!(bytes = data.len(), "Delivering data");
            request.respond_with_data(data);
        }
    }

    /// Signals the single terminal completion for this request.
    pub(crate) fn finish(mut self, outcome: Result<(), RelayError>) -> Resolution {
        let Some(request) = self.request.take() else {
            return Resolution::Cancelled;
        };

        if request.is_cancelled() {
            debug!("Loading request cancelled, skipping completion");
            return Resolution::Cancelled;
        }

        match outcome {
            Ok(()) => {
                request.finish_loading();
                Resolution::Succeeded
            }
            Err(error) => {
                warn!(%error, "Loading request failed");
                request.finish_loading_with_error(error);
                Resolution::Failed
            }
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(request) = self.request.take() {
            if request.is_cancelled() || request.is_finished() {
                return;
            }
            warn!("Loading request abandoned before completion");
            request.finish_loading_with_error(RelayError::Interception {
                reason: "resolution abandoned before completion".to_string(),
            });
        }
    }
}
