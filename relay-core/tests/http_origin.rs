//! End-to-end relaying against a loopback axum origin.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use parking_lot::Mutex;
use relay_core::{
    AssetOptions, BufferedLoadingRequest, DataRequest, HeaderOverride, LoadOutcome, RelayAsset,
    RelayConfig, RelayError, TransportError, TrustPolicy,
};
use tokio::net::TcpListener;
use url::Url;

const RESOURCE_LEN: usize = 1_000_000;

#[derive(Clone)]
struct Origin {
    payload: Arc<Vec<u8>>,
    seen: Arc<Mutex<Vec<HeaderMap>>>,
}

impl Origin {
    fn new() -> Self {
        Self {
            payload: Arc::new((0..RESOURCE_LEN).map(|i| (i % 251) as u8).collect()),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn seen_header(&self, index: usize, name: header::HeaderName) -> Option<String> {
        self.seen.lock()[index]
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }
}

struct TestServer {
    base_url: Url,
    origin: Origin,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let origin = Origin::new();
        let router = Router::new()
            .route("/video.mp4", get(ranged_endpoint))
            .route("/plain.mp3", get(plain_endpoint))
            .route("/missing.mp4", get(missing_endpoint))
            .route("/slow.mp4", get(slow_endpoint))
            .with_state(origin.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let server = axum::serve(listener, router).with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        });
        tokio::spawn(async move {
            server.await.unwrap();
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}")).unwrap(),
            origin,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    fn url(&self, path: &str) -> String {
        self.base_url.join(path).unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

fn parse_range(headers: &HeaderMap, len: usize) -> Option<(usize, usize)> {
    let range = headers.get(header::RANGE)?.to_str().ok()?;
    let (start, end) = range.strip_prefix("bytes=")?.split_once('-')?;
    let start = start.parse::<usize>().ok()?;
    let end = if end.is_empty() {
        len - 1
    } else {
        end.parse::<usize>().ok()?.min(len - 1)
    };
    (start <= end).then_some((start, end))
}

async fn ranged_endpoint(State(origin): State<Origin>, headers: HeaderMap) -> impl IntoResponse {
    origin.seen.lock().push(headers.clone());

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::CONTENT_TYPE, "video/mp4".parse().unwrap());
    response_headers.insert(header::ACCEPT_RANGES, "bytes".parse().unwrap());

    match parse_range(&headers, origin.payload.len()) {
        Some((start, end)) => {
            response_headers.insert(
                header::CONTENT_RANGE,
                format!("bytes {start}-{end}/{}", origin.payload.len())
                    .parse()
                    .unwrap(),
            );
            (
                StatusCode::PARTIAL_CONTENT,
                response_headers,
                origin.payload[start..=end].to_vec(),
            )
        }
        None => (StatusCode::OK, response_headers, origin.payload.to_vec()),
    }
}

async fn plain_endpoint(State(origin): State<Origin>, headers: HeaderMap) -> impl IntoResponse {
    origin.seen.lock().push(headers);
    (
        [(header::CONTENT_TYPE, "audio/mpeg; charset=binary")],
        &b"not seekable"[..],
    )
}

async fn missing_endpoint(State(origin): State<Origin>, headers: HeaderMap) -> impl IntoResponse {
    origin.seen.lock().push(headers);
    StatusCode::NOT_FOUND
}

async fn slow_endpoint() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(3)).await;
    "too late"
}

fn options() -> AssetOptions {
    AssetOptions::new().with_config(RelayConfig::for_testing())
}

/// Runs the engine-side blocking call off the test runtime.
async fn intercept(asset: &Arc<RelayAsset>, request: &Arc<BufferedLoadingRequest>) -> bool {
    let asset = Arc::clone(asset);
    let request = Arc::clone(request);
    tokio::task::spawn_blocking(move || asset.intercept(request))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_probe_reports_content_information() {
    let server = TestServer::start().await;
    let asset = Arc::new(RelayAsset::create(&server.url("/video.mp4"), options()).unwrap());
    let request = Arc::new(BufferedLoadingRequest::content_info());

    assert!(intercept(&asset, &request).await);

    let info = request.filled_content_info().unwrap();
    assert_eq!(info.content_type.as_deref(), Some("video/mp4"));
    assert_eq!(info.content_length, RESOURCE_LEN as u64);
    assert!(info.byte_range_access_supported);
    assert!(request.outcome().unwrap().is_success());
    assert_eq!(request.delivery_count(), 0);
    assert_eq!(server.origin.seen_header(0, header::RANGE), None);
}

#[tokio::test]
async fn test_bounded_window_is_relayed_exactly() {
    let server = TestServer::start().await;
    let asset = Arc::new(RelayAsset::create(&server.url("/video.mp4"), options()).unwrap());
    let request = Arc::new(BufferedLoadingRequest::data(DataRequest::bounded(100, 50)));

    assert!(intercept(&asset, &request).await);

    assert_eq!(
        server.origin.seen_header(0, header::RANGE).as_deref(),
        Some("bytes=100-149")
    );
    assert_eq!(&request.delivered_bytes()[..], &server.origin.payload[100..150]);
    assert!(request.outcome().unwrap().is_success());
}

#[tokio::test]
async fn test_to_end_window_fetches_whole_resource() {
    let server = TestServer::start().await;
    let asset = Arc::new(RelayAsset::create(&server.url("/video.mp4"), options()).unwrap());
    let request = Arc::new(BufferedLoadingRequest::data(DataRequest::to_end(0)));

    assert!(intercept(&asset, &request).await);

    assert_eq!(server.origin.seen_header(0, header::RANGE), None);
    assert_eq!(request.delivered_bytes().len(), RESOURCE_LEN);
}

#[tokio::test]
async fn test_missing_resource_fails_request() {
    let server = TestServer::start().await;
    let asset = Arc::new(RelayAsset::create(&server.url("/missing.mp4"), options()).unwrap());
    let request = Arc::new(BufferedLoadingRequest::data(DataRequest::bounded(0, 10)));

    assert!(intercept(&asset, &request).await);

    assert_eq!(request.delivery_count(), 0);
    assert!(matches!(
        request.outcome(),
        Some(LoadOutcome::Failed(RelayError::HttpStatus { status: 404, .. }))
    ));
}

#[tokio::test]
async fn test_bearer_override_reaches_origin() {
    let server = TestServer::start().await;
    let hook = HeaderOverride::new().with_bearer_token("X").unwrap();
    let asset = Arc::new(
        RelayAsset::create(
            &server.url("/video.mp4"),
            options().with_request_override(Arc::new(hook)),
        )
        .unwrap(),
    );
    let request = Arc::new(BufferedLoadingRequest::data(DataRequest::bounded(0, 4)));

    assert!(intercept(&asset, &request).await);

    assert_eq!(
        server.origin.seen_header(0, header::AUTHORIZATION).as_deref(),
        Some("Bearer X")
    );
    assert_eq!(
        server.origin.seen_header(0, header::RANGE).as_deref(),
        Some("bytes=0-3")
    );
}

#[tokio::test]
async fn test_origin_without_ranges_delivers_probe_body() {
    let server = TestServer::start().await;
    let asset = Arc::new(RelayAsset::create(&server.url("/plain.mp3"), options()).unwrap());
    let request = Arc::new(BufferedLoadingRequest::content_info_with_data(
        DataRequest::bounded(0, 2),
    ));

    assert!(intercept(&asset, &request).await);

    let info = request.filled_content_info().unwrap();
    assert_eq!(info.content_type.as_deref(), Some("audio/mpeg"));
    assert!(!info.byte_range_access_supported);
    assert_eq!(&request.delivered_bytes()[..], b"not seekable");
    assert!(request.outcome().unwrap().is_success());
}

#[tokio::test]
async fn test_unreachable_origin_fails_with_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let asset =
        Arc::new(RelayAsset::create(&format!("http://{addr}/video.mp4"), options()).unwrap());
    let request = Arc::new(BufferedLoadingRequest::content_info());

    assert!(intercept(&asset, &request).await);

    assert!(request.filled_content_info().is_none());
    assert!(matches!(
        request.outcome(),
        Some(LoadOutcome::Failed(RelayError::Transport(_)))
    ));
}

#[tokio::test]
async fn test_trust_all_policy_still_relays() {
    let server = TestServer::start().await;
    let mut config = RelayConfig::for_testing();
    config.transport.trust_policy = TrustPolicy::TrustAll;
    let asset = Arc::new(
        RelayAsset::create(
            &server.url("/video.mp4"),
            AssetOptions::new().with_config(config),
        )
        .unwrap(),
    );
    let request = Arc::new(BufferedLoadingRequest::data(DataRequest::bounded(10, 5)));

    assert!(intercept(&asset, &request).await);
    assert_eq!(&request.delivered_bytes()[..], &server.origin.payload[10..15]);
}

#[tokio::test]
async fn test_request_timeout_fails_request() {
    let server = TestServer::start().await;
    let mut config = RelayConfig::for_testing();
    config.transport.request_timeout = Some(Duration::from_millis(200));
    let asset = Arc::new(
        RelayAsset::create(
            &server.url("/slow.mp4"),
            AssetOptions::new().with_config(config),
        )
        .unwrap(),
    );
    let request = Arc::new(BufferedLoadingRequest::data(DataRequest::bounded(0, 8)));

    assert!(intercept(&asset, &request).await);

    assert!(matches!(
        request.outcome(),
        Some(LoadOutcome::Failed(RelayError::Transport(
            TransportError::Timeout { .. }
        )))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shared_runtime_with_async_interception() {
    let server = TestServer::start().await;
    let asset = RelayAsset::create(
        &server.url("/video.mp4"),
        options().with_runtime(tokio::runtime::Handle::current()),
    )
    .unwrap();

    let windows = [(0, 10), (500, 10), (999_990, 10)];
    let requests: Vec<_> = windows
        .iter()
        .map(|&(offset, length)| {
            Arc::new(BufferedLoadingRequest::data(DataRequest::bounded(
                offset, length,
            )))
        })
        .collect();

    let handled = futures::future::join_all(
        requests
            .iter()
            .map(|request| asset.interceptor().intercept_async(request.clone())),
    )
    .await;

    assert!(handled.into_iter().all(|handled| handled));
    for (request, &(offset, length)) in requests.iter().zip(&windows) {
        let offset = offset as usize;
        assert_eq!(
            &request.delivered_bytes()[..],
            &server.origin.payload[offset..offset + length as usize]
        );
    }
    assert_eq!(server.origin.seen.lock().len(), 3);
}
