//! # fogfn Node
//! The management side of a fogfn node: persisted configuration with
//! environment overrides, and the cluster control plane peers register
//! themselves against.

#[macro_use]
extern crate tracing;

mod config;
mod control;

pub use config::{
    apply_port_overrides,
    apply_port_overrides_from,
    ConfigError,
    NodeConfig,
    Protocol,
    ProtocolPorts,
};
pub use control::{ControlPlane, ControlServer};
