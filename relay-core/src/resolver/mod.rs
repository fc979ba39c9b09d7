//! Resolvers turn one loading request into origin requests and a completion.
//!
//! Each resolver computes a `Result` for the whole exchange and hands it to
//! `Completion::finish`, the single place where the engine is signaled.

mod content_info;
mod data;

use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::error::{RelayError, Result};
use crate::hooks::RequestOverride;
use crate::origin::{ByteWindow, OriginClient, OriginRequest, OriginResponse};

/// Shared, immutable state for resolving loading requests of one asset.
pub(crate) struct OriginResolver {
    origin_url: Url,
    client: Arc<dyn OriginClient>,
    request_override: Option<Arc<dyn RequestOverride>>,
}

impl OriginResolver {
    pub(crate) fn new(
        origin_url: Url,
        client: Arc<dyn OriginClient>,
        request_override: Option<Arc<dyn RequestOverride>>,
    ) -> Self {
        Self {
            origin_url,
            client,
            request_override,
        }
    }

    /// Sends exactly one origin request for `window` and checks its status.
    ///
    /// # Errors
    ///
    /// - `RelayError::Hook` - Request override rejected the request
    /// - `RelayError::Transport` - Origin unreachable
    /// - `RelayError::HttpStatus` - Origin answered with a non-2xx status
    async fn fetch(&self, window: Option<ByteWindow>) -> Result<OriginResponse> {
        let mut request = OriginRequest::build(&self.origin_url, window);

        if let Some(hook) = &self.request_override {
            hook.override_request(&mut request).await?;
        }

        debug!(
            url = %request.url(),
            range = request.range().unwrap_or("none"),
            "Requesting from origin"
        );

        let response = self.client.send(request).await?;
        if !response.is_success() {
            return Err(RelayError::http_status(
                response.status().as_u16(),
                self.origin_url.as_str(),
            ));
        }

        Ok(response)
    }
}
