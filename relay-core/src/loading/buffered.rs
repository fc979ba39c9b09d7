use std::sync::atomic::{AtomicBool, Ordering};

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;

use super::{ContentInfo, DataRequest, LoadingRequest};
use crate::error::RelayError;

/// Terminal state of a [`BufferedLoadingRequest`].
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Succeeded,
    Failed(RelayError),
}

impl LoadOutcome {
    /// Checks if the request finished successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, LoadOutcome::Succeeded)
    }

    /// Gets the failure, if any.
    pub fn error(&self) -> Option<&RelayError> {
        match self {
            LoadOutcome::Succeeded => None,
            LoadOutcome::Failed(error) => Some(error),
        }
    }
}

#[derive(Debug, Default)]
struct BufferedState {
    content_info: Option<ContentInfo>,
    chunks: Vec<Bytes>,
    outcome: Option<LoadOutcome>,
}

/// In-memory loading request that records everything the relay signals.
///
/// Engine adapters that assemble responses themselves, the CLI and tests use
/// this instead of a real playback engine.
#[derive(Debug)]
pub struct BufferedLoadingRequest {
    content_info_requested: bool,
    data_request: Option<DataRequest>,
    cancelled: AtomicBool,
    state: Mutex<BufferedState>,
}

impl BufferedLoadingRequest {
    fn new(content_info_requested: bool, data_request: Option<DataRequest>) -> Self {
        Self {
            content_info_requested,
            data_request,
            cancelled: AtomicBool::new(false),
            state: Mutex::new(BufferedState::default()),
        }
    }

    /// Content information probe without a byte window.
    pub fn content_info() -> Self {
        Self::new(true, None)
    }

    /// Content information probe describing the bytes of interest.
    pub fn content_info_with_data(data: DataRequest) -> Self {
        Self::new(true, Some(data))
    }

    /// Plain data request.
    pub fn data(data: DataRequest) -> Self {
        Self::new(false, Some(data))
    }

    /// Request carrying neither sub-request.
    pub fn empty() -> Self {
        Self::new(false, None)
    }

    /// Marks the request as abandoned by the engine.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Content information filled by the relay, if any.
    pub fn filled_content_info(&self) -> Option<ContentInfo> {
        self.state.lock().content_info.clone()
    }

    /// All delivered bytes, concatenated in delivery order.
    pub fn delivered_bytes(&self) -> Bytes {
        let state = self.state.lock();
        match state.chunks.as_slice() {
            [] => Bytes::new(),
            [single] => single.clone(),
            chunks => {
                let total = chunks.iter().map(Bytes::len).sum();
                let mut buffer = BytesMut::with_capacity(total);
                for chunk in chunks {
                    buffer.extend_from_slice(chunk);
                }
                buffer.freeze()
            }
        }
    }

    /// Number of `respond_with_data` calls received.
    pub fn delivery_count(&self) -> usize {
        self.state.lock().chunks.len()
    }

    /// Terminal state, `None` while pending.
    pub fn outcome(&self) -> Option<LoadOutcome> {
        self.state.lock().outcome.clone()
    }

    fn record_outcome(&self, outcome: LoadOutcome) {
        let mut state = self.state.lock();
        assert!(
            state.outcome.is_none(),
            "loading request finished twice (previous outcome: {:?})",
            state.outcome
        );
        state.outcome = Some(outcome);
    }
}

impl LoadingRequest for BufferedLoadingRequest {
    fn wants_content_info(&self) -> bool {
        self.content_info_requested
    }

    fn data_request(&self) -> Option<DataRequest> {
        self.data_request
    }

    fn fill_content_info(&self, info: ContentInfo) {
        self.state.lock().content_info = Some(info);
    }

    fn respond_with_data(&self, data: Bytes) {
        self.state.lock().chunks.push(data);
    }

    /// # Panics
    ///
    /// Panics if the request was already finished.
    fn finish_loading(&self) {
        self.record_outcome(LoadOutcome::Succeeded);
    }

    /// # Panics
    ///
    /// Panics if the request was already finished.
    fn finish_loading_with_error(&self, error: RelayError) {
        self.record_outcome(LoadOutcome::Failed(error));
    }

    fn is_finished(&self) -> bool {
        self.state.lock().outcome.is_some()
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
