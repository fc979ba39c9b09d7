//! Relay Core - HTTP origin relay for playback engine resource loading
//!
//! A playback engine that cannot fetch a resource itself (custom transport,
//! authentication, certificate handling) hands each fetch need to the relay
//! as a loading request. The relay answers content information probes and
//! byte-window requests from a remote HTTP origin using `Range` requests,
//! then signals exactly one completion per request.

pub mod asset;
pub mod config;
pub mod error;
pub mod hooks;
pub mod interceptor;
pub mod loading;
pub mod origin;
mod resolver;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use asset::{AssetOptions, RelayAsset};
pub use config::{RelayConfig, TrustPolicy};
pub use error::{HookError, RelayError, Result, TransportError};
pub use hooks::{ErrorReporter, HeaderOverride, LogErrorReporter, RequestOverride};
pub use interceptor::RequestInterceptor;
pub use loading::{
    BufferedLoadingRequest, ContentInfo, DataRequest, LoadKind, LoadOutcome, LoadingRequest,
    Resolution,
};
pub use origin::{ByteWindow, HttpOriginClient, OriginClient, OriginRequest, OriginResponse};
