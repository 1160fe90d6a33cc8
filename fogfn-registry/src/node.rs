use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A peer node participating in the cluster.
///
/// A node is identified purely by its `(address, manager port, proxy port)`
/// triple, there is no separate node ID. Two nodes are considered the same
/// node if and only if all three fields match.
///
/// The serialized form is the wire contract of the `/cluster/list` endpoint.
pub struct Node {
    #[serde(rename = "ip")]
    /// The address the node is reachable on.
    pub addr: String,

    /// The port of the node's management endpoint.
    pub manager_port: u16,

    /// The port of the node's invocation proxy.
    pub rproxy_port: u16,
}

impl Node {
    /// Creates a new node identity.
    pub fn new(addr: impl Into<String>, manager_port: u16, rproxy_port: u16) -> Self {
        Self {
            addr: addr.into(),
            manager_port,
            rproxy_port,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:({}/{})",
            self.addr, self.manager_port, self.rproxy_port
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_equality_is_full_triple() {
        let node = Node::new("10.0.0.1", 8080, 8000);
        assert_eq!(node, Node::new("10.0.0.1", 8080, 8000));
        assert_ne!(node, Node::new("10.0.0.2", 8080, 8000));
        assert_ne!(node, Node::new("10.0.0.1", 8081, 8000));
        assert_ne!(node, Node::new("10.0.0.1", 8080, 8001));
    }

    #[test]
    fn test_node_wire_format() {
        let node = Node::new("10.0.0.1", 8080, 8000);
        let raw = serde_json::to_string(&node).unwrap();
        assert_eq!(
            raw,
            r#"{"ip":"10.0.0.1","manager_port":8080,"rproxy_port":8000}"#
        );

        let parsed: Node = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, node);
    }
}
