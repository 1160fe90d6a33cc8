use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http::{Request, Response, StatusCode};
use hyper::service::{make_service_fn, service_fn};
use hyper::Body;
use tokio::task::JoinHandle;

use crate::dispatch::ClusterDispatcher;
use crate::outcome::CallOutcome;
use crate::router::LocalRouter;
use crate::ASYNC_HEADER;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How a node resolves inbound invocations.
pub enum OperatingMode {
    /// Invocations run against the node's own function replicas.
    Local,

    /// Invocations are forwarded to peer nodes.
    Cluster,
}

/// The single HTTP entry point for function invocations.
///
/// Every path under `/` is treated as a function name. The mode is fixed at
/// startup: it decides once whether calls go through the [LocalRouter] or the
/// [ClusterDispatcher].
pub struct EdgeListener {
    handle: JoinHandle<()>,
}

impl EdgeListener {
    /// Binds the listener and starts serving invocations.
    pub async fn listen(
        bind_addr: SocketAddr,
        mode: OperatingMode,
        router: Arc<LocalRouter>,
        dispatcher: Arc<ClusterDispatcher>,
    ) -> hyper::Result<Self> {
        let state = ListenerState {
            mode,
            router,
            dispatcher,
        };

        let make_service = make_service_fn(move |_socket| {
            let state = state.clone();
            async move {
                let service = move |req| handle_request(req, state.clone());
                Ok::<_, Infallible>(service_fn(service))
            }
        });

        let server = hyper::Server::try_bind(&bind_addr)?.serve(make_service);

        info!(listen_addr = %bind_addr, mode = ?mode, "Edge listener started.");

        let handle = tokio::spawn(async move {
            if let Err(error) = server.await {
                error!(error = ?error, "Edge listener failed to serve requests.");
            }
        });

        Ok(Self { handle })
    }

    /// Signals the listener to shut down.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

#[derive(Clone)]
struct ListenerState {
    mode: OperatingMode,
    router: Arc<LocalRouter>,
    dispatcher: Arc<ClusterDispatcher>,
}

async fn handle_request(
    req: Request<Body>,
    state: ListenerState,
) -> Result<Response<Body>, Infallible> {
    let (parts, body) = req.into_parts();

    let path = parts.uri.path().to_string();
    let name = path.trim_start_matches('/').to_string();
    let fire_and_forget = parts.headers.contains_key(ASYNC_HEADER);

    debug!(function = %name, fire_and_forget = fire_and_forget, "Received invocation request.");

    // The whole payload is needed up front: forwarding re-sends it and
    // request bodies can only be read once.
    let payload = match hyper::body::to_bytes(body).await {
        Ok(payload) => payload,
        Err(error) => {
            warn!(function = %name, error = %error, "Failed to read request body.");
            return Ok(status_response(StatusCode::INTERNAL_SERVER_ERROR));
        },
    };

    let outcome = match state.mode {
        OperatingMode::Local => state.router.invoke(&name, payload, fire_and_forget).await,
        OperatingMode::Cluster => state.dispatcher.dispatch(&path, payload, fire_and_forget).await,
    };

    Ok(outcome_response(outcome))
}

fn outcome_response(outcome: CallOutcome) -> Response<Body> {
    match outcome {
        CallOutcome::Ok(body) => Response::new(Body::from(body)),
        CallOutcome::Accepted => status_response(StatusCode::ACCEPTED),
        CallOutcome::NotFound => status_response(StatusCode::NOT_FOUND),
        CallOutcome::Error => status_response(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

fn status_response(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    (*response.status_mut()) = status;
    response
}
