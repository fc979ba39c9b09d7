//! Playback engine loading requests.
//!
//! The engine hands the relay one [`LoadingRequest`] per fetch need. A request
//! may ask for content information, for a byte window, or for both (a probe
//! that also names the bytes it is interested in). Exactly one of
//! `finish_loading` / `finish_loading_with_error` is signaled on every request
//! the relay accepts.

mod buffered;
mod completion;

use bytes::Bytes;

pub use buffered::{BufferedLoadingRequest, LoadOutcome};
pub(crate) use completion::Completion;
pub use completion::Resolution;

use crate::error::RelayError;
use crate::origin::ByteWindow;

/// Byte window the engine wants delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRequest {
    /// First byte of the window
    pub requested_offset: u64,
    /// Number of bytes wanted; meaningless when `requests_all_data_to_end` is set
    pub requested_length: u64,
    /// Window extends from the offset to the end of the resource
    pub requests_all_data_to_end: bool,
}

impl DataRequest {
    /// Creates a request for `length` bytes starting at `offset`.
    pub fn bounded(offset: u64, length: u64) -> Self {
        Self {
            requested_offset: offset,
            requested_length: length,
            requests_all_data_to_end: false,
        }
    }

    /// Creates a request for everything from `offset` to the end of the resource.
    pub fn to_end(offset: u64) -> Self {
        Self {
            requested_offset: offset,
            requested_length: 0,
            requests_all_data_to_end: true,
        }
    }

    /// Window to request from the origin.
    ///
    /// Returns `None` for a bounded request of zero bytes: there is nothing a
    /// `Range` header could describe.
    pub fn window(&self) -> Option<ByteWindow> {
        if self.requests_all_data_to_end {
            Some(ByteWindow::ToEnd {
                offset: self.requested_offset,
            })
        } else if self.requested_length == 0 {
            None
        } else {
            Some(ByteWindow::Bounded {
                offset: self.requested_offset,
                length: self.requested_length,
            })
        }
    }
}

/// Metadata about the whole resource, filled in answer to a probe.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentInfo {
    /// Media type from `Content-Type`, without parameters
    pub content_type: Option<String>,
    /// Value of `Content-Length`, 0 when the origin did not send one
    pub content_length: u64,
    /// Whether the origin advertised `Accept-Ranges`
    pub byte_range_access_supported: bool,
}

/// What a loading request asks the relay for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    /// Content information probe, possibly with an attached data window
    ContentInfo,
    /// Plain byte window
    Data,
}

impl LoadKind {
    /// Classifies a loading request; `None` means the relay does not handle it.
    pub fn of(request: &dyn LoadingRequest) -> Option<Self> {
        if request.wants_content_info() {
            Some(LoadKind::ContentInfo)
        } else if request.data_request().is_some() {
            Some(LoadKind::Data)
        } else {
            None
        }
    }
}

/// Engine-side handle for one unit of loading work.
///
/// Implemented by the playback engine integration. All methods are called from
/// relay worker threads.
pub trait LoadingRequest: Send + Sync {
    /// Whether the engine attached a content information request.
    fn wants_content_info(&self) -> bool;

    /// Byte window attached to this request, if any.
    fn data_request(&self) -> Option<DataRequest>;

    /// Stores the content information answer.
    fn fill_content_info(&self, info: ContentInfo);

    /// Hands bytes for the attached data request to the engine.
    fn respond_with_data(&self, data: Bytes);

    /// Marks the request as successfully resolved.
    fn finish_loading(&self);

    /// Marks the request as failed.
    fn finish_loading_with_error(&self, error: RelayError);

    /// Whether a completion has already been signaled.
    fn is_finished(&self) -> bool;

    /// Whether the engine gave up on this request.
    fn is_cancelled(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_length_window_is_empty() {
        assert_eq!(DataRequest::bounded(100, 0).window(), None);
        assert_eq!(
            DataRequest::bounded(100, 50).window(),
            Some(ByteWindow::Bounded {
                offset: 100,
                length: 50
            })
        );
        assert_eq!(
            DataRequest::to_end(7).window(),
            Some(ByteWindow::ToEnd { offset: 7 })
        );
    }

    #[test]
    fn test_classification_prefers_content_info() {
        let probe = BufferedLoadingRequest::content_info_with_data(DataRequest::bounded(0, 2));
        assert_eq!(LoadKind::of(&probe), Some(LoadKind::ContentInfo));

        let data = BufferedLoadingRequest::data(DataRequest::to_end(0));
        assert_eq!(LoadKind::of(&data), Some(LoadKind::Data));

        let neither = BufferedLoadingRequest::empty();
        assert_eq!(LoadKind::of(&neither), None);
    }
}
