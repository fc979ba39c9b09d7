use tracing::{debug, info};

use super::OriginResolver;
use crate::error::Result;
use crate::loading::{Completion, ContentInfo, Resolution};

impl OriginResolver {
    /// Answers a content information probe.
    ///
    /// An origin without range support cannot be asked for a sub-window
    /// later, so in that case the body fetched by the probe is delivered to
    /// the attached data request right away.
    pub(crate) async fn resolve_content_info(&self, completion: Completion) -> Resolution {
        let outcome = self.load_content_info(&completion).await;
        completion.finish(outcome)
    }

    async fn load_content_info(&self, completion: &Completion) -> Result<()> {
        let data_request = completion.data_request();
        let window = data_request.and_then(|data| data.window());

        let response = self.fetch(window).await?;

        let info = ContentInfo {
            content_type: response.content_type(),
            content_length: response.content_length(),
            byte_range_access_supported: response.accepts_ranges(),
        };
        info!(
            content_type = info.content_type.as_deref().unwrap_or("unknown"),
            content_length = info.content_length,
            range_access = info.byte_range_access_supported,
            "Resolved content information"
        );

        if info.byte_range_access_supported {
            completion.fill_content_info(info);
            return Ok(());
        }

        // Content information is only filled once the whole exchange succeeded
        let body = response.read_body().await?;
        completion.fill_content_info(info);
        debug!(bytes = body.len(), "Origin lacks range support, delivering probe body");
        if data_request.is_some() {
            completion.deliver(body);
        }

        Ok(())
    }
}
