use std::collections::HashMap;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, Request, Uri};
use hyper::client::HttpConnector;
use hyper::{Body, Client};
use parking_lot::RwLock;
use rand::seq::SliceRandom;

use crate::error::RouterError;
use crate::outcome::CallOutcome;

/// The port replicas listen on for invocations.
///
/// Part of the wire contract: replica calls always target
/// `http://<replica>:8000/fn`.
pub const DEFAULT_REPLICA_PORT: u16 = 8000;

/// The per-node mapping of function names to their local replica endpoints.
///
/// Invocations pick one replica uniformly at random, there is no health
/// tracking or weighting. Route lookups may run concurrently while route
/// updates are exclusive.
pub struct LocalRouter {
    routes: RwLock<HashMap<String, Vec<String>>>,
    client: Client<HttpConnector>,
    replica_port: u16,
}

impl Default for LocalRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalRouter {
    /// Creates a new router with no routes.
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
            client: Client::new(),
            replica_port: DEFAULT_REPLICA_PORT,
        }
    }

    /// Overrides the port replicas are contacted on.
    pub fn with_replica_port(mut self, port: u16) -> Self {
        self.replica_port = port;
        self
    }

    /// Sets or overwrites the route for a function.
    ///
    /// Fails with [RouterError::EmptyEndpointList] if no endpoints are given,
    /// a route never maps to an empty replica list.
    pub fn add_route(
        &self,
        name: impl Into<String>,
        endpoints: Vec<String>,
    ) -> Result<(), RouterError> {
        let name = name.into();
        if endpoints.is_empty() {
            return Err(RouterError::EmptyEndpointList(name));
        }

        debug!(function = %name, num_replicas = endpoints.len(), "Route added.");
        self.routes.write().insert(name, endpoints);
        Ok(())
    }

    /// Removes the route for a function.
    pub fn remove_route(&self, name: &str) -> Result<(), RouterError> {
        self.routes
            .write()
            .remove(name)
            .map(|_| debug!(function = %name, "Route removed."))
            .ok_or_else(|| RouterError::RouteNotFound(name.to_string()))
    }

    /// Returns the names of all currently routed functions.
    pub fn functions(&self) -> Vec<String> {
        self.routes.read().keys().cloned().collect()
    }

    /// Invokes a function against one of its local replicas.
    ///
    /// One endpoint is selected uniformly at random. A fire-and-forget call
    /// detaches the outbound request onto a background task and returns
    /// [CallOutcome::Accepted] immediately, the caller never learns its
    /// outcome.
    ///
    /// A synchronous call surfaces any transport failure as
    /// [CallOutcome::Error], but deliberately does *not* inspect the replica's
    /// status code: any reply, even one signalling an application error, comes
    /// back as [CallOutcome::Ok] with the full response body. The cluster
    /// dispatch path behaves differently here, and the asymmetry is part of
    /// the contract.
    pub async fn invoke(&self, name: &str, payload: Bytes, fire_and_forget: bool) -> CallOutcome {
        let endpoint = {
            let routes = self.routes.read();
            let Some(replicas) = routes.get(name) else {
                debug!(function = %name, "Function not found.");
                return CallOutcome::NotFound;
            };

            replicas
                .choose(&mut rand::thread_rng())
                .cloned()
                .expect("routes never hold an empty replica list")
        };

        let uri: Uri = match format!("http://{endpoint}:{}/fn", self.replica_port).parse() {
            Ok(uri) => uri,
            Err(error) => {
                warn!(function = %name, replica = %endpoint, error = %error, "Invalid replica endpoint.");
                return CallOutcome::Error;
            },
        };

        debug!(function = %name, replica = %endpoint, "Invoking function replica.");

        if fire_and_forget {
            let client = self.client.clone();
            tokio::spawn(async move {
                if let Err(error) = client.request(replica_request(uri, payload)).await {
                    debug!(error = %error, "Detached replica call failed.");
                }
            });
            return CallOutcome::Accepted;
        }

        let response = match self.client.request(replica_request(uri, payload)).await {
            Ok(response) => response,
            Err(error) => {
                warn!(function = %name, replica = %endpoint, error = %error, "Replica call failed.");
                return CallOutcome::Error;
            },
        };

        match hyper::body::to_bytes(response.into_body()).await {
            Ok(body) => CallOutcome::Ok(body),
            Err(error) => {
                warn!(function = %name, replica = %endpoint, error = %error, "Failed to read replica response.");
                CallOutcome::Error
            },
        }
    }
}

fn replica_request(uri: Uri, payload: Bytes) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/binary")
        .body(Body::from(payload))
        .expect("request parts are statically valid")
}
