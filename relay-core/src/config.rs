//! Centralized configuration for relay.
//!
//! Every tunable used when talking to an origin or scheduling resolver work
//! lives here so that nothing is hard-coded at the call sites.

use std::time::Duration;

/// TLS certificate handling for origin connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrustPolicy {
    /// Validate origin certificates against the system trust store
    #[default]
    VerifyCertificates,
    /// Accept any certificate, including self-signed and expired ones
    TrustAll,
}

/// Central configuration for all relay components.
///
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
    pub transport: TransportConfig,
    pub workers: WorkerConfig,
}

/// HTTP transport settings for origin requests.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Certificate validation behavior
    pub trust_policy: TrustPolicy,
    /// Whole-request timeout (None = wait indefinitely)
    pub request_timeout: Option<Duration>,
    /// Connection establishment timeout (None = HTTP stack default)
    pub connect_timeout: Option<Duration>,
    /// User agent sent to the origin
    pub user_agent: &'static str,
    /// Maximum redirects followed before giving up
    pub redirect_limit: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            trust_policy: TrustPolicy::VerifyCertificates,
            request_timeout: None,
            connect_timeout: None,
            user_agent: "relay/0.1.0",
            redirect_limit: 10,
        }
    }
}

/// Worker pool that runs resolver I/O off the engine's calling thread.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of runtime worker threads
    pub worker_threads: usize,
    /// Name given to worker threads
    pub thread_name: &'static str,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            thread_name: "relay-worker",
        }
    }
}

impl RelayConfig {
    /// Creates configuration with environment variable overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(trust_all) = std::env::var("RELAY_TRUST_ALL_CERTIFICATES") {
            if trust_all.parse().unwrap_or(false) {
                config.transport.trust_policy = TrustPolicy::TrustAll;
            }
        }

        if let Ok(timeout) = std::env::var("RELAY_REQUEST_TIMEOUT_SECS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.transport.request_timeout = Some(Duration::from_secs(seconds));
            }
        }

        if let Ok(timeout) = std::env::var("RELAY_CONNECT_TIMEOUT_SECS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.transport.connect_timeout = Some(Duration::from_secs(seconds));
            }
        }

        if let Ok(threads) = std::env::var("RELAY_WORKER_THREADS") {
            if let Ok(count) = threads.parse::<usize>() {
                config.workers.worker_threads = count.max(1);
            }
        }

        config
    }

    /// Creates a configuration for tests against loopback origins.
    pub fn for_testing() -> Self {
        Self {
            transport: TransportConfig {
                request_timeout: Some(Duration::from_secs(5)),
                connect_timeout: Some(Duration::from_secs(1)),
                ..Default::default()
            },
            workers: WorkerConfig {
                worker_threads: 2,
                thread_name: "relay-test-worker",
            },
        }
    }
}
