//! Relay-backed media assets.
//!
//! A [`RelayAsset`] pairs the URL handed to the playback engine with the
//! interceptor that serves it. The engine URL uses a custom scheme so that the
//! engine routes every fetch through the loading request callback instead of
//! its own HTTP stack.

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::info;
use url::Url;

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::hooks::{ErrorReporter, RequestOverride};
use crate::interceptor::RequestInterceptor;
use crate::loading::LoadingRequest;
use crate::origin::OriginClient;

/// Scheme of the engine-facing URL unless overridden.
pub const DEFAULT_ENGINE_SCHEME: &str = "relay";

/// Construction options for a relay asset.
#[derive(Clone)]
pub struct AssetOptions {
    pub config: RelayConfig,
    engine_scheme: String,
    request_override: Option<Arc<dyn RequestOverride>>,
    error_reporter: Option<Arc<dyn ErrorReporter>>,
    runtime: Option<Handle>,
}

impl Default for AssetOptions {
    fn default() -> Self {
        Self {
            config: RelayConfig::default(),
            engine_scheme: DEFAULT_ENGINE_SCHEME.to_string(),
            request_override: None,
            error_reporter: None,
            runtime: None,
        }
    }
}

impl AssetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    /// Installs a hook that adjusts every origin request before it is sent.
    pub fn with_request_override(mut self, hook: Arc<dyn RequestOverride>) -> Self {
        self.request_override = Some(hook);
        self
    }

    /// Installs an observer for interception machinery failures.
    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.error_reporter = Some(reporter);
        self
    }

    /// Overrides the scheme of the engine-facing URL.
    pub fn with_engine_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.engine_scheme = scheme.into();
        self
    }

    /// Runs resolver I/O on an existing runtime instead of a dedicated pool.
    ///
    /// The engine must then never call `intercept` from that runtime's threads.
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn engine_scheme(&self) -> &str {
        &self.engine_scheme
    }

    pub(crate) fn request_override(&self) -> Option<Arc<dyn RequestOverride>> {
        self.request_override.clone()
    }

    pub(crate) fn error_reporter(&self) -> Option<Arc<dyn ErrorReporter>> {
        self.error_reporter.clone()
    }

    pub(crate) fn runtime_handle(&self) -> Option<Handle> {
        self.runtime.clone()
    }
}

impl fmt::Debug for AssetOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetOptions")
            .field("config", &self.config)
            .field("engine_scheme", &self.engine_scheme)
            .field("request_override", &self.request_override.is_some())
            .field("error_reporter", &self.error_reporter.is_some())
            .field("shared_runtime", &self.runtime.is_some())
            .finish()
    }
}

/// Media asset whose bytes are relayed from an HTTP origin.
pub struct RelayAsset {
    engine_url: Url,
    origin_url: Url,
    interceptor: RequestInterceptor,
}

impl RelayAsset {
    /// Creates an asset relaying `origin_url` over HTTP.
    ///
    /// # Errors
    ///
    /// - `RelayError::Configuration` - Invalid origin URL, engine scheme or worker pool
    /// - `RelayError::Transport` - HTTP client could not be built
    pub fn create(origin_url: &str, options: AssetOptions) -> Result<Self> {
        let (origin_url, engine_url) = Self::urls(origin_url, &options)?;
        let interceptor = RequestInterceptor::new(origin_url.clone(), options)?;
        Ok(Self::assemble(engine_url, origin_url, interceptor))
    }

    /// Creates an asset served by a custom origin client.
    ///
    /// # Errors
    ///
    /// - `RelayError::Configuration` - Invalid origin URL, engine scheme or worker pool
    pub fn with_client(
        origin_url: &str,
        options: AssetOptions,
        client: Arc<dyn OriginClient>,
    ) -> Result<Self> {
        let (origin_url, engine_url) = Self::urls(origin_url, &options)?;
        let interceptor = RequestInterceptor::with_client(origin_url.clone(), options, client)?;
        Ok(Self::assemble(engine_url, origin_url, interceptor))
    }

    fn urls(origin_url: &str, options: &AssetOptions) -> Result<(Url, Url)> {
        let origin_url = parse_origin_url(origin_url)?;
        let engine_url = engine_url(options.engine_scheme())?;
        Ok((origin_url, engine_url))
    }

    fn assemble(engine_url: Url, origin_url: Url, interceptor: RequestInterceptor) -> Self {
        info!(engine = %engine_url, origin = %origin_url, "Created relay asset");
        Self {
            engine_url,
            origin_url,
            interceptor,
        }
    }

    /// URL to hand to the playback engine.
    pub fn engine_url(&self) -> &Url {
        &self.engine_url
    }

    /// Origin every loading request is relayed to.
    pub fn origin_url(&self) -> &Url {
        &self.origin_url
    }

    pub fn interceptor(&self) -> &RequestInterceptor {
        &self.interceptor
    }

    /// Shorthand for `interceptor().intercept(request)`.
    pub fn intercept(&self, request: Arc<dyn LoadingRequest>) -> bool {
        self.interceptor.intercept(request)
    }
}

impl fmt::Debug for RelayAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayAsset")
            .field("engine_url", &self.engine_url.as_str())
            .field("origin_url", &self.origin_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Parses and validates an origin URL.
///
/// # Errors
///
/// - `RelayError::Configuration` - Not a URL, or not http/https
pub fn parse_origin_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| RelayError::Configuration {
        reason: format!("invalid origin URL {raw:?}: {e}"),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(RelayError::Configuration {
            reason: format!("origin URL must be http or https, got {scheme}"),
        }),
    }
}

fn engine_url(scheme: &str) -> Result<Url> {
    if matches!(scheme, "http" | "https") {
        return Err(RelayError::Configuration {
            reason: format!("engine scheme {scheme} would bypass the relay"),
        });
    }
    Url::parse(&format!("{scheme}://me")).map_err(|e| RelayError::Configuration {
        reason: format!("invalid engine scheme {scheme:?}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HeaderOverride;
    use crate::loading::{BufferedLoadingRequest, DataRequest};
    use crate::origin::{MockOriginClient, MockReply};

    fn testing_options() -> AssetOptions {
        AssetOptions::new().with_config(RelayConfig::for_testing())
    }

    #[test]
    fn test_engine_url_uses_custom_scheme() {
        let asset = RelayAsset::with_client(
            "https://example.com/video.mp4",
            testing_options(),
            Arc::new(MockOriginClient::new()),
        )
        .unwrap();

        assert_eq!(asset.engine_url().as_str(), "relay://me");
        assert_eq!(asset.origin_url().as_str(), "https://example.com/video.mp4");
    }

    #[test]
    fn test_engine_scheme_is_configurable() {
        let asset = RelayAsset::with_client(
            "http://example.com/a.mp3",
            testing_options().with_engine_scheme("myapp-relay"),
            Arc::new(MockOriginClient::new()),
        )
        .unwrap();

        assert_eq!(asset.engine_url().scheme(), "myapp-relay");
    }

    #[test]
    fn test_http_engine_scheme_is_rejected() {
        let result = RelayAsset::with_client(
            "https://example.com/video.mp4",
            testing_options().with_engine_scheme("https"),
            Arc::new(MockOriginClient::new()),
        );
        assert!(matches!(result, Err(RelayError::Configuration { .. })));
    }

    #[test]
    fn test_origin_url_validation() {
        assert!(parse_origin_url("https://example.com/video.mp4").is_ok());
        assert!(matches!(
            parse_origin_url("ftp://example.com/video.mp4"),
            Err(RelayError::Configuration { .. })
        ));
        assert!(matches!(
            parse_origin_url("not a url"),
            Err(RelayError::Configuration { .. })
        ));
    }

    #[test]
    fn test_asset_relays_with_request_override() {
        let client = Arc::new(MockOriginClient::new().with_reply(MockReply::status(206, "hi")));
        let hook = HeaderOverride::new().with_bearer_token("X").unwrap();
        let asset = RelayAsset::with_client(
            "https://example.com/video.mp4",
            testing_options().with_request_override(Arc::new(hook)),
            client.clone(),
        )
        .unwrap();

        let request = Arc::new(BufferedLoadingRequest::data(DataRequest::bounded(0, 2)));
        assert!(asset.intercept(request.clone()));

        assert_eq!(&request.delivered_bytes()[..], b"hi");
        assert_eq!(client.requests()[0].headers()["authorization"], "Bearer X");
    }

    #[test]
    fn test_options_debug_hides_hooks() {
        let options = testing_options().with_request_override(Arc::new(HeaderOverride::new()));
        let rendered = format!("{options:?}");
        assert!(rendered.contains("request_override: true"));
        assert!(rendered.contains("error_reporter: false"));
    }
}
