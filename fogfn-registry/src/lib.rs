//! # fogfn Registry
//! The cluster membership registry for fogfn nodes.
//!
//! Peers join the cluster by registering their identity triple with a node's
//! management endpoint and leave it by an explicit delete. Membership is not
//! gossiped and no consensus protocol is involved: each node owns its own view
//! of the cluster and other components converge on it by taking snapshots and
//! diffing against what they last saw.

#[macro_use]
extern crate tracing;

mod error;
mod node;
mod registry;

pub use error::RegistryError;
pub use node::Node;
pub use registry::NodeRegistry;
