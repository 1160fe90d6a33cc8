use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{Method, Request, Uri};
use hyper::client::HttpConnector;
use hyper::{Body, Client};
use parking_lot::Mutex;

use fogfn_registry::{Node, NodeRegistry};

use crate::backend::FunctionHandler;
use crate::error::DeployError;
use crate::wire::{DeletePayload, UploadPayload};

#[derive(Clone)]
/// Manages one function's deployments across the cluster.
///
/// The handler keeps a list of every node the function was ever uploaded to.
/// The list only grows: nodes that leave the cluster stay on it, it records
/// "ever deployed to", not "currently reachable". Between refreshes the list
/// may lag the live membership; `refresh` closes the gap by diffing against a
/// fresh registry snapshot.
///
/// Cheap to clone, all clones share the same deployment state.
pub struct ClusterFunction {
    inner: Arc<FunctionInner>,
}

struct FunctionInner {
    name: String,
    environment: String,
    threads: usize,
    /// Base64 encoding of the packaged function source.
    source: String,
    envs: HashMap<String, String>,
    deployed: Mutex<Vec<Node>>,
    registry: Arc<NodeRegistry>,
    client: Client<HttpConnector>,
}

impl ClusterFunction {
    pub(crate) fn new(
        name: impl Into<String>,
        environment: impl Into<String>,
        threads: usize,
        source: String,
        envs: HashMap<String, String>,
        registry: Arc<NodeRegistry>,
        client: Client<HttpConnector>,
    ) -> Self {
        Self {
            inner: Arc::new(FunctionInner {
                name: name.into(),
                environment: environment.into(),
                threads,
                source,
                envs,
                deployed: Mutex::new(Vec::new()),
                registry,
                client,
            }),
        }
    }

    /// The function's name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// A snapshot of every node the function was ever uploaded to.
    pub fn deployed_nodes(&self) -> Vec<Node> {
        self.inner.deployed.lock().clone()
    }

    /// Discovers peers that joined since the last refresh.
    ///
    /// Diffs the known-node list against a fresh membership snapshot, appends
    /// the nodes not yet known and returns exactly those. Nodes that left the
    /// cluster are deliberately kept on the known list.
    pub fn refresh(&self) -> Vec<Node> {
        let current = self.inner.registry.nodes();
        let mut deployed = self.inner.deployed.lock();

        let discovered: Vec<Node> = current
            .into_iter()
            .filter(|node| !deployed.contains(node))
            .collect();

        deployed.extend(discovered.iter().cloned());
        discovered
    }

    /// Deploys the function to every currently known node.
    ///
    /// Runs a `refresh` first to pick up peers registered since the handler
    /// was created. Aborts on the first failing upload and returns that
    /// error: the remaining nodes are left without the function until an
    /// external refresh cycle retries. There is no rollback.
    pub async fn start(&self) -> Result<(), DeployError> {
        self.refresh();

        let targets = self.deployed_nodes();
        info!(
            function = %self.inner.name,
            num_nodes = targets.len(),
            "Deploying function to cluster."
        );

        for node in &targets {
            self.upload_to_node(node).await?;
        }

        Ok(())
    }

    /// Pushes the function to peers that joined since the last refresh.
    ///
    /// No new peers means no work. This is the mechanism by which functions
    /// reach late-joining nodes; driving it periodically (or on demand) is
    /// the job of an external scheduler.
    pub async fn refresh_and_upload(&self) -> Result<(), DeployError> {
        let discovered = self.refresh();
        if discovered.is_empty() {
            debug!(function = %self.inner.name, "No new nodes to deploy to.");
            return Ok(());
        }

        info!(
            function = %self.inner.name,
            num_nodes = discovered.len(),
            "Deploying function to newly joined nodes."
        );

        for node in &discovered {
            self.upload_to_node(node).await?;
        }

        Ok(())
    }

    /// Uploads the function to a single node's management endpoint.
    ///
    /// Fails with [DeployError::UploadFailed] if the node answers with a
    /// non-success status; a deploy that reached the node but was rejected is
    /// not a deploy.
    pub async fn upload_to_node(&self, node: &Node) -> Result<(), DeployError> {
        let payload = UploadPayload::new(
            &self.inner.name,
            &self.inner.environment,
            self.inner.threads,
            &self.inner.source,
            &self.inner.envs,
        );
        let body = serde_json::to_vec(&payload)?;

        let uri: Uri = format!("http://{}:{}/upload", node.addr, node.manager_port).parse()?;
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .expect("request parts are statically valid");

        debug!(function = %self.inner.name, node = %node, "Uploading function to node.");
        let response = self.inner.client.request(request).await?;

        if !response.status().is_success() {
            return Err(DeployError::UploadFailed {
                node: node.to_string(),
                status: response.status(),
            });
        }

        Ok(())
    }

    /// Collects this function's logs from every known node.
    ///
    /// All-or-nothing: a single failing node aborts the whole call and no
    /// partial logs are returned.
    pub async fn logs(&self) -> Result<String, DeployError> {
        let mut combined = String::new();

        for node in self.deployed_nodes() {
            let uri: Uri = format!(
                "http://{}:{}/logs?name={}",
                node.addr, node.manager_port, self.inner.name
            )
            .parse()?;

            let response = self.inner.client.get(uri).await?;
            if !response.status().is_success() {
                return Err(DeployError::LogsFailed {
                    node: node.to_string(),
                    status: response.status(),
                });
            }

            let body = hyper::body::to_bytes(response.into_body()).await?;
            combined.push_str(&String::from_utf8_lossy(&body));
        }

        Ok(combined)
    }

    /// Broadcasts a delete for this function to every known node.
    pub async fn destroy(&self) -> Result<(), DeployError> {
        let payload = serde_json::to_vec(&DeletePayload {
            name: self.inner.name.clone(),
        })?;

        for node in self.deployed_nodes() {
            let uri: Uri = format!("http://{}:{}/delete", node.addr, node.manager_port).parse()?;
            let request = Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(payload.clone()))
                .expect("request parts are statically valid");

            debug!(function = %self.inner.name, node = %node, "Deleting function from node.");
            let response = self.inner.client.request(request).await?;

            if !response.status().is_success() {
                return Err(DeployError::DeleteFailed {
                    node: node.to_string(),
                    status: response.status(),
                });
            }
        }

        Ok(())
    }
}

#[async_trait]
impl FunctionHandler for ClusterFunction {
    async fn start(&self) -> Result<(), DeployError> {
        ClusterFunction::start(self).await
    }

    async fn destroy(&self) -> Result<(), DeployError> {
        ClusterFunction::destroy(self).await
    }

    async fn logs(&self) -> Result<String, DeployError> {
        ClusterFunction::logs(self).await
    }

    fn ips(&self) -> Vec<String> {
        self.deployed_nodes()
            .into_iter()
            .map(|node| node.addr)
            .collect()
    }
}
