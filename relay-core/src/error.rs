//! Error types for origin relaying.
//!
//! Per-request failures end up on the loading request's failure channel;
//! only `Interception` and `ProtocolViolation` ever reach the error reporter.

use thiserror::Error;

/// Connection-level failure while talking to the origin.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Origin could not be reached (DNS, refused connection, TLS failure)
    #[error("Failed to connect to {url}: {reason}")]
    Connect {
        /// Origin URL that was being contacted
        url: String,
        /// Description from the HTTP stack
        reason: String,
    },

    /// Request or connect timeout elapsed
    #[error("Request to {url} timed out")]
    Timeout {
        /// Origin URL that timed out
        url: String,
    },

    /// Response body stream was interrupted
    #[error("Failed to read response body: {reason}")]
    Body {
        /// Description from the HTTP stack
        reason: String,
    },

    /// Any other request failure reported by the HTTP stack
    #[error("Request failed: {reason}")]
    Request {
        /// Description from the HTTP stack
        reason: String,
    },

    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client: {reason}")]
    ClientBuild {
        /// Description from the HTTP stack
        reason: String,
    },
}

impl TransportError {
    /// Maps a reqwest error onto the transport taxonomy.
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        let url = error
            .url()
            .map(|url| url.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());

        if error.is_timeout() {
            TransportError::Timeout { url }
        } else if error.is_connect() {
            TransportError::Connect {
                url,
                reason: error.to_string(),
            }
        } else if error.is_body() || error.is_decode() {
            TransportError::Body {
                reason: error.to_string(),
            }
        } else if error.is_builder() {
            TransportError::ClientBuild {
                reason: error.to_string(),
            }
        } else {
            TransportError::Request {
                reason: error.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        Self::from_reqwest(error)
    }
}

/// Failure raised by a caller-supplied hook.
#[derive(Debug, Clone, Error)]
#[error("{hook} hook failed: {reason}")]
pub struct HookError {
    /// Which hook failed ("request override", "error reporter")
    pub hook: &'static str,
    /// Description supplied by the hook
    pub reason: String,
}

impl HookError {
    /// Creates a failure for the request override hook.
    pub fn request_override(reason: impl Into<String>) -> Self {
        Self {
            hook: "request override",
            reason: reason.into(),
        }
    }

    /// Creates a failure for the error reporter hook.
    pub fn error_reporter(reason: impl Into<String>) -> Self {
        Self {
            hook: "error reporter",
            reason: reason.into(),
        }
    }
}

/// Errors that can bubble up from any relay subsystem.
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Origin answered with a non-success status
    #[error("Origin returned HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Hook error: {0}")]
    Hook(#[from] HookError),

    /// Engine integration broke the loading request protocol
    #[error("Loading protocol violation: {reason}")]
    ProtocolViolation { reason: String },

    /// Interception machinery failed outside of the resolvers
    #[error("Interception failed: {reason}")]
    Interception { reason: String },

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },
}

impl RelayError {
    /// Creates an HTTP status error.
    pub fn http_status(status: u16, url: impl Into<String>) -> Self {
        RelayError::HttpStatus {
            status,
            url: url.into(),
        }
    }

    /// Gets the HTTP status code if this is an HTTP status error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RelayError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Checks if the origin could not be reached at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, RelayError::Transport(_))
    }

    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            RelayError::Transport(TransportError::Timeout { .. }) => {
                "The media server took too long to respond".to_string()
            }
            RelayError::Transport(_) => "Could not reach the media server".to_string(),
            RelayError::HttpStatus { status: 404, .. } => "Media not found".to_string(),
            RelayError::HttpStatus { status, .. } => {
                format!("Media server responded with HTTP {status}")
            }
            RelayError::Hook(e) => format!("Request customization failed: {}", e.reason),
            RelayError::ProtocolViolation { .. } | RelayError::Interception { .. } => {
                "Playback integration error".to_string()
            }
            RelayError::Configuration { reason } => format!("Invalid configuration: {reason}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
