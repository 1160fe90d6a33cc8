use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Method, Request, StatusCode, Uri};
use hyper::client::HttpConnector;
use hyper::{Body, Client};
use rand::seq::SliceRandom;
use tokio::time::timeout;

use fogfn_registry::{Node, NodeRegistry};

use crate::outcome::CallOutcome;

/// How long a single peer attempt may take before the dispatcher moves on.
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Forwards invocations to peer nodes when the node runs in cluster mode.
///
/// Peers are tried in a freshly shuffled order per dispatch, which spreads
/// load across the cluster without any stateful load balancer. Transport
/// failures advance to the next peer; an application-level response stops the
/// loop immediately (see [ClusterDispatcher::dispatch_ordered]).
///
/// There is no overall deadline: the worst case for a synchronous dispatch
/// with every peer unreachable is the sum of the per-peer timeouts, and no
/// cancellation is propagated into attempts already in flight.
pub struct ClusterDispatcher {
    registry: Arc<NodeRegistry>,
    client: Client<HttpConnector>,
    attempt_timeout: Duration,
}

impl ClusterDispatcher {
    /// Creates a dispatcher over the given membership registry.
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            registry,
            client: Client::new(),
            attempt_timeout: DEFAULT_DISPATCH_TIMEOUT,
        }
    }

    /// Overrides the per-peer attempt timeout.
    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    /// Forwards an invocation to the cluster.
    ///
    /// Takes a snapshot of the current membership, shuffles it uniformly and
    /// attempts the peers in that order. The request body must already be
    /// captured: it is reused across retries, which an in-flight request
    /// stream would not allow.
    ///
    /// A fire-and-forget dispatch detaches the whole retry loop onto a
    /// background task and returns [CallOutcome::Accepted] before any peer
    /// has been contacted.
    pub async fn dispatch(&self, path: &str, body: Bytes, fire_and_forget: bool) -> CallOutcome {
        let mut peers = self.registry.nodes();
        peers.shuffle(&mut rand::thread_rng());

        debug!(
            path = %path,
            num_peers = peers.len(),
            fire_and_forget = fire_and_forget,
            "Dispatching invocation to cluster."
        );

        if fire_and_forget {
            let client = self.client.clone();
            let attempt_timeout = self.attempt_timeout;
            let path = path.to_string();

            tokio::spawn(async move {
                let outcome = attempt_peers(&client, &peers, &path, body, attempt_timeout).await;
                debug!(path = %path, outcome = ?outcome, "Detached cluster dispatch finished.");
            });

            return CallOutcome::Accepted;
        }

        attempt_peers(&self.client, &peers, path, body, self.attempt_timeout).await
    }

    /// Attempts the given peers in exactly the given order.
    ///
    /// This is the failover loop [ClusterDispatcher::dispatch] runs after
    /// shuffling. Per peer:
    ///
    /// - a transport failure (timeout, refused connection, DNS failure)
    ///   advances to the next peer;
    /// - HTTP 200 stops with [CallOutcome::Ok] and the response body;
    /// - HTTP 202 stops with [CallOutcome::Accepted];
    /// - any other status stops with [CallOutcome::Error] and the request is
    ///   **not** retried against the remaining peers. The function may already
    ///   have produced a side effect on that peer, re-invoking another one
    ///   could duplicate it.
    ///
    /// Exhausting the list on transport failures alone yields
    /// [CallOutcome::Error].
    pub async fn dispatch_ordered(&self, peers: &[Node], path: &str, body: Bytes) -> CallOutcome {
        attempt_peers(&self.client, peers, path, body, self.attempt_timeout).await
    }
}

async fn attempt_peers(
    client: &Client<HttpConnector>,
    peers: &[Node],
    path: &str,
    body: Bytes,
    attempt_timeout: Duration,
) -> CallOutcome {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    for peer in peers {
        let uri: Uri = match format!("http://{}:{}{path}", peer.addr, peer.rproxy_port).parse() {
            Ok(uri) => uri,
            Err(error) => {
                warn!(peer = %peer, error = %error, "Peer produced an invalid invocation URI, skipping.");
                continue;
            },
        };

        // Every attempt gets a fresh request built from the captured body.
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::from(body.clone()))
            .expect("request parts are statically valid");

        let response = match timeout(attempt_timeout, client.request(request)).await {
            Err(_) => {
                warn!(peer = %peer, "Peer timed out, trying next peer.");
                continue;
            },
            Ok(Err(error)) => {
                warn!(peer = %peer, error = %error, "Could not reach peer, trying next peer.");
                continue;
            },
            Ok(Ok(response)) => response,
        };

        match response.status() {
            StatusCode::OK => {
                return match hyper::body::to_bytes(response.into_body()).await {
                    Ok(body) => CallOutcome::Ok(body),
                    Err(error) => {
                        warn!(peer = %peer, error = %error, "Failed to read peer response.");
                        CallOutcome::Error
                    },
                };
            },
            StatusCode::ACCEPTED => {
                debug!(peer = %peer, "Peer accepted the invocation.");
                return CallOutcome::Accepted;
            },
            status => {
                // The request reached a node but came back with an error. The
                // function may have had a side effect there already, so the
                // error goes straight back to the caller instead of being
                // retried against another peer.
                warn!(peer = %peer, status = %status, "Peer returned an application error, not retrying.");
                return CallOutcome::Error;
            },
        }
    }

    warn!(path = %path, "No peer could be reached for invocation.");
    CallOutcome::Error
}
