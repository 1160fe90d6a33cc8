//! # fogfn Deploy
//! Keeps function deployments aligned across a fogfn cluster.
//!
//! A [ClusterFunction] tracks which peer nodes have ever received a copy of a
//! function and pushes the packaged source to peers that joined the cluster
//! after the initial deployment. Discovery is refresh/diff based: the handler
//! compares its own known-node list against a fresh membership snapshot, there
//! is no gossip and no consensus.
//!
//! The pieces this crate does *not* implement, the store of packaged function
//! sources and the runtime that actually executes replicas, are consumed
//! through the [FunctionStore], [Backend] and [FunctionHandler] interfaces.

#[macro_use]
extern crate tracing;

mod backend;
mod error;
mod function;
mod wire;

pub use async_trait::async_trait;
pub use backend::{Backend, ClusterBackend, FunctionHandler, FunctionStore};
pub use error::DeployError;
pub use function::ClusterFunction;
pub use wire::{DeletePayload, UploadPayload};
