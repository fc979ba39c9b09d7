//! Engine-facing entry point.
//!
//! The playback engine asks synchronously whether the relay will handle a
//! loading request and expects the work to be done when the answer arrives.
//! Resolver I/O runs on a dedicated worker pool; the engine thread only waits
//! on a channel, so it never drives the runtime it is waiting for.

use std::any::Any;
use std::cell::Cell;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio::runtime::{Handle, Runtime};
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::asset::AssetOptions;
use crate::config::WorkerConfig;
use crate::error::{RelayError, Result};
use crate::hooks::ErrorReporter;
use crate::loading::{Completion, LoadKind, LoadingRequest};
use crate::origin::{HttpOriginClient, OriginClient};
use crate::resolver::OriginResolver;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Id of the owned worker pool this thread belongs to, 0 elsewhere.
    static CURRENT_POOL: Cell<u64> = const { Cell::new(0) };
}

struct WorkerPool {
    handle: Handle,
    /// Set only for pools this interceptor started itself
    owned_id: Option<u64>,
    runtime: Option<Runtime>,
}

impl WorkerPool {
    fn start(config: &WorkerConfig) -> Result<Self> {
        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_threads.max(1))
            .thread_name(config.thread_name)
            .on_thread_start(move || CURRENT_POOL.with(|pool| pool.set(id)))
            .enable_all()
            .build()
            .map_err(|e| RelayError::Configuration {
                reason: format!("failed to start worker pool: {e}"),
            })?;

        Ok(Self {
            handle: runtime.handle().clone(),
            owned_id: Some(id),
            runtime: Some(runtime),
        })
    }

    fn shared(handle: Handle) -> Self {
        Self {
            handle,
            owned_id: None,
            runtime: None,
        }
    }

    /// Whether the current thread is one of this pool's workers.
    fn is_current_thread_worker(&self) -> bool {
        self.owned_id
            .is_some_and(|id| CURRENT_POOL.with(Cell::get) == id)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // A blocking shutdown panics when dropped from async code
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Routes loading requests to the resolvers and reports machinery failures.
#[derive(Clone)]
struct Dispatcher {
    resolver: Arc<OriginResolver>,
    error_reporter: Option<Arc<dyn ErrorReporter>>,
}

impl Dispatcher {
    async fn dispatch(self, request: Arc<dyn LoadingRequest>) -> bool {
        match self.route(request).await {
            Ok(handled) => handled,
            Err(error) => {
                self.report(&error).await;
                false
            }
        }
    }

    async fn route(&self, request: Arc<dyn LoadingRequest>) -> Result<bool> {
        let Some(kind) = LoadKind::of(request.as_ref()) else {
            trace!("No content information or data request, declining");
            return Ok(false);
        };

        let completion = Completion::begin(request)?;
        let resolver = Arc::clone(&self.resolver);
        let outcome = AssertUnwindSafe(async move {
            match kind {
                LoadKind::ContentInfo => resolver.resolve_content_info(completion).await,
                LoadKind::Data => resolver.resolve_data(completion).await,
            }
        })
        .catch_unwind()
        .await;

        match outcome {
            Ok(resolution) => debug!(?kind, ?resolution, "Loading request resolved"),
            Err(panic) => {
                // Unwinding dropped the completion, which already failed the request
                let error = RelayError::Interception {
                    reason: format!("resolver panicked: {}", panic_message(panic.as_ref())),
                };
                self.report(&error).await;
            }
        }
        Ok(true)
    }

    async fn report(&self, error: &RelayError) {
        error!(%error, "Interception failed");

        let Some(reporter) = &self.error_reporter else {
            return;
        };
        match AssertUnwindSafe(reporter.report_error(error))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(hook_error)) => warn!(%hook_error, "Error reporter failed"),
            Err(panic) => warn!(
                reason = %panic_message(panic.as_ref()),
                "Error reporter panicked"
            ),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Serves one asset's loading requests from its origin.
///
/// Holds no per-request state; any number of requests may be intercepted
/// concurrently from different engine threads.
pub struct RequestInterceptor {
    dispatcher: Dispatcher,
    workers: WorkerPool,
}

impl RequestInterceptor {
    /// Creates an interceptor talking to `origin_url` over HTTP.
    ///
    /// # Errors
    ///
    /// - `RelayError::Transport` - HTTP client could not be built
    /// - `RelayError::Configuration` - Worker pool could not be started
    pub fn new(origin_url: Url, options: AssetOptions) -> Result<Self> {
        let client = HttpOriginClient::new(&options.config.transport)?;
        Self::with_client(origin_url, options, Arc::new(client))
    }

    /// Creates an interceptor using a custom origin client.
    ///
    /// # Errors
    ///
    /// - `RelayError::Configuration` - Worker pool could not be started
    pub fn with_client(
        origin_url: Url,
        options: AssetOptions,
        client: Arc<dyn OriginClient>,
    ) -> Result<Self> {
        let workers = match options.runtime_handle() {
            Some(handle) => WorkerPool::shared(handle),
            None => WorkerPool::start(&options.config.workers)?,
        };

        let resolver = OriginResolver::new(origin_url, client, options.request_override());
        Ok(Self {
            dispatcher: Dispatcher {
                resolver: Arc::new(resolver),
                error_reporter: options.error_reporter(),
            },
            workers,
        })
    }

    /// Handles a loading request, blocking until it has been resolved.
    ///
    /// Returns `true` when the relay took the request; by then exactly one
    /// completion has been signaled on it, even if a resolver panicked (the
    /// panic is also reported to the error reporter). Returns `false` when
    /// the request carries nothing to load, or when the interception
    /// machinery failed before taking it (reported to the error reporter).
    ///
    /// Must not be called from a thread of the worker pool it would wait on.
    /// With the owned pool this is detected and refused; workers of other
    /// pools may call in freely.
    pub fn intercept(&self, request: Arc<dyn LoadingRequest>) -> bool {
        if self.workers.is_current_thread_worker() {
            let dispatcher = self.dispatcher.clone();
            // Waiting here could starve the pool; report without blocking
            self.workers.handle.spawn(async move {
                let error = RelayError::Interception {
                    reason: "intercept called from a relay worker thread".to_string(),
                };
                dispatcher.report(&error).await;
            });
            return false;
        }

        let (sender, receiver) = std::sync::mpsc::sync_channel(1);
        let dispatcher = self.dispatcher.clone();
        self.workers.handle.spawn(async move {
            let handled = dispatcher.dispatch(request).await;
            let _ = sender.send(handled);
        });

        receiver.recv().unwrap_or_else(|_| {
            self.report_on_caller("worker pool dropped the resolver task");
            false
        })
    }

    /// Reports a machinery failure when no worker is left to do it.
    fn report_on_caller(&self, reason: &str) {
        let error = RelayError::Interception {
            reason: reason.to_string(),
        };
        futures::executor::block_on(self.dispatcher.report(&error));
    }

    /// Handles a loading request from async code on the caller's runtime.
    pub async fn intercept_async(&self, request: Arc<dyn LoadingRequest>) -> bool {
        self.dispatcher.clone().dispatch(request).await
    }
}
