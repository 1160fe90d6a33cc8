#[macro_use]
extern crate tracing;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use fogfn_node::{apply_port_overrides, ControlPlane, NodeConfig, Protocol};
use fogfn_proxy::{ClusterDispatcher, EdgeListener, LocalRouter, OperatingMode};
use fogfn_registry::NodeRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args: Args = Args::parse();

    let config = match &args.config {
        Some(path) => NodeConfig::load_or_default(path),
        None => NodeConfig::default(),
    };

    let mut ports = config.protocol_ports();
    apply_port_overrides(&mut ports)?;

    // The backend choice is resolved once here; components receive the mode
    // explicitly instead of consulting the environment themselves.
    let backend = args
        .backend
        .or_else(|| std::env::var("TF_BACKEND").ok())
        .unwrap_or_else(|| "docker".to_string());
    let mode = match backend.as_str() {
        "docker" => OperatingMode::Local,
        "cluster" => OperatingMode::Cluster,
        other => bail!("invalid backend {other} (expected docker or cluster)"),
    };

    let registry = Arc::new(NodeRegistry::new());
    let router = Arc::new(LocalRouter::new());
    let dispatcher = Arc::new(ClusterDispatcher::new(registry.clone()));

    // This binary only serves the HTTP invocation protocol; coap and grpc
    // listeners come from separate protocol adapters.
    let listener = match ports.get(&Protocol::Http) {
        Some(port) => {
            let addr = SocketAddr::from(([0, 0, 0, 0], *port));
            let listener =
                EdgeListener::listen(addr, mode, router.clone(), dispatcher.clone()).await?;
            Some(listener)
        },
        None => {
            info!("HTTP invocation listener disabled by port override.");
            None
        },
    };

    let control_addr = SocketAddr::from(([0, 0, 0, 0], config.manager_port));
    let control = ControlPlane::new(registry.clone()).listen(control_addr).await?;

    info!(mode = ?mode, manager_port = config.manager_port, "fogfn node running.");

    tokio::signal::ctrl_c().await?;
    info!("Received interrupt, shutting down.");

    if let Some(listener) = listener {
        listener.shutdown();
    }
    control.shutdown();

    Ok(())
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long)]
    /// The path of the optional node configuration file.
    ///
    /// A missing or malformed file falls back to the documented defaults.
    config: Option<PathBuf>,

    #[arg(long)]
    /// The function runtime backend: `docker` (run replicas locally) or
    /// `cluster` (forward invocations to peer nodes).
    ///
    /// Falls back to the `TF_BACKEND` environment variable, then to `docker`.
    backend: Option<String>,
}
