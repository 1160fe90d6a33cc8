//! # fogfn
//! A lightweight function-as-a-service platform for edge and fog environments.
//!
//! This is a convenience package which includes all of the sub-projects within
//! fogfn, realistically you probably only want some of these projects:
//!
//! ### Features
//! - `fogfn-registry` - The cluster node identity and membership registry.
//! - `fogfn-proxy` - The invocation plane: local load-balancing router,
//!   cluster dispatcher with failover, and the HTTP edge listener.
//! - `fogfn-deploy` - Function deployment across the cluster: the per-function
//!   cluster handler and the collaborator interfaces it consumes.
//! - `fogfn-node` - Node configuration and the cluster control-plane service.

#[cfg(feature = "fogfn-registry")]
pub use fogfn_registry as registry;
#[cfg(feature = "fogfn-proxy")]
pub use fogfn_proxy as proxy;
#[cfg(feature = "fogfn-deploy")]
pub use fogfn_deploy as deploy;
#[cfg(feature = "fogfn-node")]
pub use fogfn_node as node;
