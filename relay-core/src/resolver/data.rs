use tracing::debug;

use super::OriginResolver;
use crate::error::{RelayError, Result};
use crate::loading::{Completion, Resolution};

impl OriginResolver {
    /// Fetches the requested byte window and delivers it.
    pub(crate) async fn resolve_data(&self, completion: Completion) -> Resolution {
        let outcome = self.load_data(&completion).await;
        completion.finish(outcome)
    }

    async fn load_data(&self, completion: &Completion) -> Result<()> {
        let data_request = completion
            .data_request()
            .ok_or_else(|| RelayError::ProtocolViolation {
                reason: "data resolution without a data request".to_string(),
            })?;

        let Some(window) = data_request.window() else {
            debug!(
                offset = data_request.requested_offset,
                "Zero-length data request, nothing to fetch"
            );
            return Ok(());
        };

        let response = self.fetch(Some(window)).await?;
        let body = response.read_body().await?;

        debug!(
            offset = data_request.requested_offset,
            requested = data_request.requested_length,
            to_end = data_request.requests_all_data_to_end,
            received = body.len(),
            "Delivering data window"
        );
        completion.deliver(body);

        Ok(())
    }
}
