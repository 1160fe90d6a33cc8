use thiserror::Error;

use crate::node::Node;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("node {0} is already registered")]
    /// The exact identity triple is already present in the registry.
    AlreadyRegistered(Node),

    #[error("no node registered as {0}")]
    /// The identity triple does not match any registered node.
    NodeNotFound(Node),
}
