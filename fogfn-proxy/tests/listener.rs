use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use fogfn_proxy::{ClusterDispatcher, EdgeListener, LocalRouter, OperatingMode, ASYNC_HEADER};
use fogfn_registry::{Node, NodeRegistry};
use http::{Method, Request, StatusCode, Uri};
use hyper::{Body, Client};
use test_helper::{get_unused_addr, Responder};

struct TestNode {
    addr: std::net::SocketAddr,
    _listener: EdgeListener,
}

async fn start_node(
    mode: OperatingMode,
    router: LocalRouter,
    registry: Arc<NodeRegistry>,
) -> TestNode {
    let addr = get_unused_addr();
    let dispatcher = Arc::new(ClusterDispatcher::new(registry));
    let listener = EdgeListener::listen(addr, mode, Arc::new(router), dispatcher)
        .await
        .unwrap();

    TestNode {
        addr,
        _listener: listener,
    }
}

async fn invoke(
    node: &TestNode,
    function: &str,
    payload: &'static [u8],
    fire_and_forget: bool,
) -> (StatusCode, Bytes) {
    let uri: Uri = format!("http://{}/{function}", node.addr).parse().unwrap();
    let mut request = Request::builder().method(Method::POST).uri(uri);
    if fire_and_forget {
        request = request.header(ASYNC_HEADER, "true");
    }

    let response = Client::new()
        .request(request.body(Body::from(payload)).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
    (status, body)
}

#[tokio::test]
async fn test_local_invocation_roundtrip() {
    let _ = tracing_subscriber::fmt::try_init();

    let replica = Responder::start(StatusCode::OK, "pong").await;
    let router = LocalRouter::new().with_replica_port(replica.addr().port());
    router
        .add_route("hello", vec![replica.addr().ip().to_string()])
        .unwrap();

    let node = start_node(OperatingMode::Local, router, Arc::new(NodeRegistry::new())).await;

    let (status, body) = invoke(&node, "hello", b"ping", false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Bytes::from_static(b"pong"));

    // Replica calls always target the fixed invocation path.
    assert_eq!(replica.last_path().as_deref(), Some("/fn"));
    assert_eq!(replica.last_body(), Some(Bytes::from_static(b"ping")));
}

#[tokio::test]
async fn test_unknown_function_is_not_found() {
    let _ = tracing_subscriber::fmt::try_init();

    let node = start_node(
        OperatingMode::Local,
        LocalRouter::new(),
        Arc::new(NodeRegistry::new()),
    )
    .await;

    let (status, _) = invoke(&node, "missing", b"", false).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_replica_error_reply_is_surfaced_as_ok() {
    let _ = tracing_subscriber::fmt::try_init();

    let replica = Responder::start(StatusCode::INTERNAL_SERVER_ERROR, "boom").await;
    let router = LocalRouter::new().with_replica_port(replica.addr().port());
    router
        .add_route("hello", vec![replica.addr().ip().to_string()])
        .unwrap();

    let node = start_node(OperatingMode::Local, router, Arc::new(NodeRegistry::new())).await;

    // The local path does not inspect the replica's status code: any reply is
    // an OK invocation carrying the raw body.
    let (status, body) = invoke(&node, "hello", b"", false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Bytes::from_static(b"boom"));
}

#[tokio::test]
async fn test_unreachable_replica_is_an_error() {
    let _ = tracing_subscriber::fmt::try_init();

    let dead = get_unused_addr();
    let router = LocalRouter::new().with_replica_port(dead.port());
    router.add_route("hello", vec![dead.ip().to_string()]).unwrap();

    let node = start_node(OperatingMode::Local, router, Arc::new(NodeRegistry::new())).await;

    let (status, _) = invoke(&node, "hello", b"", false).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_async_invocation_is_insensitive_to_replica_latency() {
    let _ = tracing_subscriber::fmt::try_init();

    let replica =
        Responder::start_with_delay(StatusCode::OK, "late", Duration::from_secs(1)).await;
    let router = LocalRouter::new().with_replica_port(replica.addr().port());
    router
        .add_route("hello", vec![replica.addr().ip().to_string()])
        .unwrap();

    let node = start_node(OperatingMode::Local, router, Arc::new(NodeRegistry::new())).await;

    let started = std::time::Instant::now();
    let (status, body) = invoke(&node, "hello", b"ping", true).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body.is_empty());
    assert!(
        started.elapsed() < Duration::from_millis(300),
        "async invocation blocked on the replica"
    );
}

#[tokio::test]
async fn test_cluster_mode_forwards_to_peer() {
    let _ = tracing_subscriber::fmt::try_init();

    let peer = Responder::start(StatusCode::OK, "from-peer").await;
    let registry = Arc::new(NodeRegistry::new());
    registry
        .register(Node::new(
            peer.addr().ip().to_string(),
            0,
            peer.addr().port(),
        ))
        .unwrap();

    let node = start_node(OperatingMode::Cluster, LocalRouter::new(), registry).await;

    let (status, body) = invoke(&node, "hello", b"ping", false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Bytes::from_static(b"from-peer"));

    // The peer sees the original invocation path, not the replica path.
    assert_eq!(peer.last_path().as_deref(), Some("/hello"));
    assert_eq!(peer.last_body(), Some(Bytes::from_static(b"ping")));
}

#[tokio::test]
async fn test_cluster_mode_surfaces_peer_application_error() {
    let _ = tracing_subscriber::fmt::try_init();

    let peer = Responder::start(StatusCode::BAD_GATEWAY, "nope").await;
    let registry = Arc::new(NodeRegistry::new());
    registry
        .register(Node::new(
            peer.addr().ip().to_string(),
            0,
            peer.addr().port(),
        ))
        .unwrap();

    let node = start_node(OperatingMode::Cluster, LocalRouter::new(), registry).await;

    let (status, _) = invoke(&node, "hello", b"", false).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
