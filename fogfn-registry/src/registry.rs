use parking_lot::Mutex;

use crate::error::RegistryError;
use crate::node::Node;

#[derive(Debug, Default)]
/// The process-wide set of peer nodes participating in the cluster.
///
/// One registry is constructed per process and shared (via `Arc`) with every
/// component that needs a view of the membership. All access is serialized by
/// a single mutex which is only ever held for the duration of the in-memory
/// operation, never across a network call.
pub struct NodeRegistry {
    nodes: Mutex<Vec<Node>>,
}

impl NodeRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new peer node.
    ///
    /// Fails with [RegistryError::AlreadyRegistered] if the identical identity
    /// triple is already present.
    pub fn register(&self, node: Node) -> Result<(), RegistryError> {
        let mut nodes = self.nodes.lock();

        if nodes.contains(&node) {
            return Err(RegistryError::AlreadyRegistered(node));
        }

        info!(node = %node, "Cluster node registered.");
        nodes.push(node);
        Ok(())
    }

    /// Checks whether the given node is currently registered.
    pub fn is_registered(&self, node: &Node) -> bool {
        self.nodes.lock().contains(node)
    }

    /// Returns a snapshot of the current membership.
    ///
    /// The copy is taken under the lock so callers never observe the live
    /// backing structure while it is concurrently modified.
    pub fn nodes(&self) -> Vec<Node> {
        self.nodes.lock().clone()
    }

    /// Removes a node from the registry.
    ///
    /// Removal swaps the last entry into the removed slot, so the order of the
    /// remaining entries is not a client-visible invariant.
    ///
    /// Fails with [RegistryError::NodeNotFound] if the triple is absent.
    pub fn delete(&self, node: &Node) -> Result<(), RegistryError> {
        let mut nodes = self.nodes.lock();

        let position = nodes
            .iter()
            .position(|existing| existing == node)
            .ok_or_else(|| RegistryError::NodeNotFound(node.clone()))?;

        nodes.swap_remove(position);
        info!(node = %node, "Cluster node removed.");
        Ok(())
    }

    /// The number of currently registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.lock().len()
    }

    /// Whether the registry holds no nodes at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let registry = NodeRegistry::new();
        let node = Node::new("10.0.0.1", 8080, 8000);

        registry.register(node.clone()).unwrap();
        assert!(registry.is_registered(&node));
        assert_eq!(registry.nodes(), vec![node]);
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let registry = NodeRegistry::new();
        let node = Node::new("10.0.0.1", 8080, 8000);

        registry.register(node.clone()).unwrap();
        let err = registry.register(node.clone()).unwrap_err();
        assert_eq!(err, RegistryError::AlreadyRegistered(node));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_addr_different_ports_is_a_different_node() {
        let registry = NodeRegistry::new();

        registry.register(Node::new("10.0.0.1", 8080, 8000)).unwrap();
        registry.register(Node::new("10.0.0.1", 9080, 9000)).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_delete_unknown_node() {
        let registry = NodeRegistry::new();
        registry.register(Node::new("10.0.0.1", 8080, 8000)).unwrap();

        let stranger = Node::new("10.0.0.9", 8080, 8000);
        let err = registry.delete(&stranger).unwrap_err();
        assert_eq!(err, RegistryError::NodeNotFound(stranger));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_delete_keeps_remaining_nodes() {
        let registry = NodeRegistry::new();
        let node1 = Node::new("10.0.0.1", 8080, 8000);
        let node2 = Node::new("10.0.0.2", 8080, 8000);
        let node3 = Node::new("10.0.0.3", 8080, 8000);

        for node in [&node1, &node2, &node3] {
            registry.register(node.clone()).unwrap();
        }

        registry.delete(&node2).unwrap();
        assert!(!registry.is_registered(&node2));

        // Removal is unordered, so compare as sets.
        let mut remaining = registry.nodes();
        remaining.sort_by(|a, b| a.addr.cmp(&b.addr));
        assert_eq!(remaining, vec![node1, node3]);
    }

    #[test]
    fn test_snapshot_is_detached_from_live_state() {
        let registry = NodeRegistry::new();
        let node = Node::new("10.0.0.1", 8080, 8000);
        registry.register(node.clone()).unwrap();

        let snapshot = registry.nodes();
        registry.delete(&node).unwrap();

        assert_eq!(snapshot, vec![node]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = Arc::new(NodeRegistry::new());

        let handles: Vec<_> = (0..8u16)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for port in 0..100u16 {
                        let node = Node::new(format!("10.0.{i}.1"), port, port);
                        registry.register(node).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 800);
    }
}
