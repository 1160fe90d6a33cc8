use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use hyper::service::{make_service_fn, service_fn};
use hyper::Body;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// A scripted HTTP server that always answers with one fixed response.
///
/// Tracks how often it was hit and what the last request looked like, so
/// failover and fan-out tests can assert exactly which backends were
/// contacted.
pub struct Responder {
    addr: SocketAddr,
    state: Arc<ResponderState>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct ResponderState {
    hits: AtomicUsize,
    last_path: Mutex<Option<String>>,
    last_body: Mutex<Option<Bytes>>,
}

impl Responder {
    /// Starts a responder answering every request with the given status and
    /// body.
    pub async fn start(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self::serve(status, body.into(), None).await
    }

    /// Starts a responder that sleeps before answering.
    pub async fn start_with_delay(
        status: StatusCode,
        body: impl Into<Bytes>,
        delay: Duration,
    ) -> Self {
        Self::serve(status, body.into(), Some(delay)).await
    }

    async fn serve(status: StatusCode, body: Bytes, delay: Option<Duration>) -> Self {
        let state = Arc::new(ResponderState::default());

        let make_service = {
            let state = state.clone();
            make_service_fn(move |_socket| {
                let state = state.clone();
                let body = body.clone();
                async move {
                    let service = move |req| handle(req, state.clone(), status, body.clone(), delay);
                    Ok::<_, Infallible>(service_fn(service))
                }
            })
        };

        let bind_addr: SocketAddr = ([127, 0, 0, 1], 0).into();
        let server = hyper::Server::bind(&bind_addr).serve(make_service);
        let addr = server.local_addr();

        let handle = tokio::spawn(async move {
            if let Err(e) = server.await {
                eprintln!("responder failed: {e}");
            }
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// The address the responder is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// How many requests the responder has received so far.
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    /// The path and query of the most recent request, if any.
    pub fn last_path(&self) -> Option<String> {
        self.state.last_path.lock().clone()
    }

    /// The body of the most recent request, if any.
    pub fn last_body(&self) -> Option<Bytes> {
        self.state.last_body.lock().clone()
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle(
    req: Request<Body>,
    state: Arc<ResponderState>,
    status: StatusCode,
    body: Bytes,
    delay: Option<Duration>,
) -> Result<Response<Body>, Infallible> {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    (*state.last_path.lock()) = Some(path);

    let payload = hyper::body::to_bytes(req.into_body())
        .await
        .unwrap_or_default();
    (*state.last_body.lock()) = Some(payload);

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut response = Response::new(Body::from(body));
    (*response.status_mut()) = status;
    Ok(response)
}
