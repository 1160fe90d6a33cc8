use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use hyper::Client;

use fogfn_registry::NodeRegistry;

use crate::error::DeployError;
use crate::function::ClusterFunction;

#[async_trait]
/// Access to already-packaged function sources.
///
/// Packaging (zipping and base64 encoding the source directory) happens
/// outside this crate; the store only hands out the finished artifact.
pub trait FunctionStore: Send + Sync + 'static {
    /// Returns the base64-encoded packaged source for the given reference.
    ///
    /// Fails with [DeployError::SourceUnavailable] if nothing is stored under
    /// the reference.
    async fn packaged_source(&self, source_ref: &str) -> Result<String, DeployError>;
}

#[async_trait]
/// The per-function deployment handle a backend hands out.
///
/// This is the narrow contract the management layer drives function
/// lifecycles through, regardless of whether functions run locally or across
/// the cluster.
pub trait FunctionHandler: Send + Sync {
    /// Deploys the function and brings it into a callable state.
    async fn start(&self) -> Result<(), DeployError>;

    /// Tears the function down everywhere it was deployed.
    async fn destroy(&self) -> Result<(), DeployError>;

    /// Collects the function's logs.
    async fn logs(&self) -> Result<String, DeployError>;

    /// The addresses the function is deployed on.
    fn ips(&self) -> Vec<String>;
}

impl std::fmt::Debug for dyn FunctionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FunctionHandler")
    }
}

#[async_trait]
/// A function runtime backend.
pub trait Backend: Send + Sync {
    /// Creates a deployment handle for a function.
    async fn create(
        &self,
        name: &str,
        env: &str,
        threads: usize,
        source_ref: &str,
        envs: HashMap<String, String>,
    ) -> Result<Box<dyn FunctionHandler>, DeployError>;

    /// Shuts the backend down.
    async fn stop(&self) -> Result<(), DeployError>;
}

/// The backend used when a node runs in cluster mode.
///
/// Instead of starting replicas locally it pushes functions to the peer nodes
/// found in the membership registry, each of which then deploys the function
/// with its own local backend.
pub struct ClusterBackend {
    store: Arc<dyn FunctionStore>,
    registry: Arc<NodeRegistry>,
}

impl ClusterBackend {
    /// Creates a new cluster backend over the given source store and
    /// membership registry.
    pub fn new(store: Arc<dyn FunctionStore>, registry: Arc<NodeRegistry>) -> Self {
        Self { store, registry }
    }

    /// Creates the cluster handler for a function.
    ///
    /// The packaged source is loaded up front so a missing source fails the
    /// deploy here rather than on the first peer upload. The handler starts
    /// with an empty known-node list; peers are discovered by `refresh`.
    pub async fn create_function(
        &self,
        name: &str,
        env: &str,
        threads: usize,
        source_ref: &str,
        envs: HashMap<String, String>,
    ) -> Result<ClusterFunction, DeployError> {
        let source = self.store.packaged_source(source_ref).await?;

        info!(
            function = %name,
            environment = %env,
            threads = threads,
            "Created cluster function handler."
        );

        Ok(ClusterFunction::new(
            name,
            env,
            threads,
            source,
            envs,
            self.registry.clone(),
            Client::new(),
        ))
    }
}

#[async_trait]
impl Backend for ClusterBackend {
    async fn create(
        &self,
        name: &str,
        env: &str,
        threads: usize,
        source_ref: &str,
        envs: HashMap<String, String>,
    ) -> Result<Box<dyn FunctionHandler>, DeployError> {
        let function = self
            .create_function(name, env, threads, source_ref, envs)
            .await?;
        Ok(Box::new(function))
    }

    /// Cluster peers are managed independently and are not remotely shut
    /// down, so stopping the backend is a no-op.
    async fn stop(&self) -> Result<(), DeployError> {
        Ok(())
    }
}
