use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, Method, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use hyper::client::HttpConnector;
use hyper::{Body, Client};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use fogfn_registry::{Node, NodeRegistry, RegistryError};

const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// The cluster control plane of a node's management endpoint.
///
/// Peers register themselves here, administrators inspect and prune the
/// membership, and the health probe measures round trips to every peer. All
/// handlers are thin translations onto the [NodeRegistry].
pub struct ControlPlane {
    state: ControlState,
}

#[derive(Clone)]
struct ControlState {
    registry: Arc<NodeRegistry>,
    client: Client<HttpConnector>,
}

impl ControlPlane {
    /// Creates the control plane over the given membership registry.
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            state: ControlState {
                registry,
                client: Client::new(),
            },
        }
    }

    /// The control-plane routes, ready to be merged into a management router.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/cluster/register", post(register_node))
            .route("/cluster/list", get(list_nodes))
            .route("/cluster/echo", post(echo))
            .route("/cluster/health", post(ping_nodes))
            .route("/cluster/delete", post(delete_node))
            .with_state(self.state.clone())
    }

    /// Binds the control plane and starts serving it.
    pub async fn listen(self, bind_addr: SocketAddr) -> hyper::Result<ControlServer> {
        let app = self.router();
        let server = axum::Server::try_bind(&bind_addr)?.serve(app.into_make_service());

        info!(listen_addr = %bind_addr, "Cluster control plane started.");

        let handle = tokio::spawn(async move {
            if let Err(error) = server.await {
                error!(error = ?error, "Control plane failed to serve requests.");
            }
        });

        Ok(ControlServer { handle })
    }
}

/// Handle to a running control-plane server.
pub struct ControlServer {
    handle: JoinHandle<()>,
}

impl ControlServer {
    /// Signals the server to shut down.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

/// Reads the node identity triple from the `nodeip`, `managerport` and
/// `rproxyport` headers.
fn node_from_headers(headers: &HeaderMap) -> Option<Node> {
    let addr = headers.get("nodeip")?.to_str().ok()?;
    if addr.is_empty() {
        return None;
    }

    let manager_port = headers.get("managerport")?.to_str().ok()?.parse().ok()?;
    let rproxy_port = headers.get("rproxyport")?.to_str().ok()?.parse().ok()?;

    Some(Node::new(addr, manager_port, rproxy_port))
}

async fn register_node(State(state): State<ControlState>, headers: HeaderMap) -> StatusCode {
    let Some(node) = node_from_headers(&headers) else {
        warn!("Register request with missing or invalid node headers.");
        return StatusCode::BAD_REQUEST;
    };

    match state.registry.register(node) {
        Ok(()) => StatusCode::ACCEPTED,
        Err(RegistryError::AlreadyRegistered(node)) => {
            warn!(node = %node, "Node attempted to register twice.");
            StatusCode::FORBIDDEN
        },
        Err(RegistryError::NodeNotFound(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn list_nodes(State(state): State<ControlState>) -> Json<Vec<Node>> {
    Json(state.registry.nodes())
}

async fn echo(body: Bytes) -> Bytes {
    body
}

async fn delete_node(State(state): State<ControlState>, headers: HeaderMap) -> StatusCode {
    let Some(node) = node_from_headers(&headers) else {
        warn!("Delete request with missing or invalid node headers.");
        return StatusCode::BAD_REQUEST;
    };

    match state.registry.delete(&node) {
        Ok(()) => StatusCode::OK,
        Err(RegistryError::NodeNotFound(node)) => {
            warn!(node = %node, "Attempted to delete an unregistered node.");
            StatusCode::NOT_FOUND
        },
        Err(RegistryError::AlreadyRegistered(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Pings every peer's echo endpoint and reports the round-trip duration, or
/// an error string, keyed by peer address.
async fn ping_nodes(State(state): State<ControlState>, headers: HeaderMap) -> Response {
    let ping_timeout = match headers.get("timeout") {
        None => DEFAULT_HEALTH_TIMEOUT,
        Some(raw) => {
            let Some(secs) = raw.to_str().ok().and_then(|raw| raw.parse::<u64>().ok()) else {
                warn!("Health request with an invalid timeout header.");
                return StatusCode::BAD_REQUEST.into_response();
            };
            Duration::from_secs(secs)
        },
    };

    let mut results = HashMap::new();
    for node in state.registry.nodes() {
        let outcome = ping_node(&state.client, &node, ping_timeout).await;
        debug!(node = %node, outcome = %outcome, "Pinged cluster node.");
        results.insert(node.addr, outcome);
    }

    if results.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }

    Json(results).into_response()
}

async fn ping_node(client: &Client<HttpConnector>, node: &Node, ping_timeout: Duration) -> String {
    let uri: Uri = match format!("http://{}:{}/cluster/echo", node.addr, node.manager_port).parse()
    {
        Ok(uri) => uri,
        Err(_) => return "could not build request".to_string(),
    };

    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::from("hello world"))
        .expect("request parts are statically valid");

    let started = std::time::Instant::now();
    match timeout(ping_timeout, client.request(request)).await {
        Err(_) => "request timed out".to_string(),
        Ok(Err(_)) => "error with request".to_string(),
        Ok(Ok(_)) => format!("{:?}", started.elapsed()),
    }
}
