//! # fogfn Proxy
//! The invocation plane of a fogfn node.
//!
//! Every inbound function call enters through the [EdgeListener], which either
//! resolves it against the node's own replicas via the [LocalRouter] or fans
//! it out to peer nodes via the [ClusterDispatcher], depending on the
//! operating mode the node was started in.
//!
//! Both paths report their result as a [CallOutcome] so the listener needs a
//! single translation table back to HTTP.

#[macro_use]
extern crate tracing;

mod dispatch;
mod error;
mod listener;
mod outcome;
mod router;

pub use dispatch::{ClusterDispatcher, DEFAULT_DISPATCH_TIMEOUT};
pub use error::RouterError;
pub use listener::{EdgeListener, OperatingMode};
pub use outcome::CallOutcome;
pub use router::{LocalRouter, DEFAULT_REPLICA_PORT};

/// Presence of this header (with any value) requests fire-and-forget
/// semantics for an invocation.
pub const ASYNC_HEADER: &str = "X-tinyFaaS-Async";
