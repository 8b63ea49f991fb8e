//! Colocation groups
//!
//! The partition assignment of one distributed query: which node scans
//! which partitions. Computed by the topology layer; scans only read it.

use std::collections::BTreeMap;

use crate::index::PartitionId;

use super::context::NodeId;

/// Node to partitions mapping for one query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColocationGroup {
    assignments: BTreeMap<NodeId, Vec<PartitionId>>,
}

impl ColocationGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a node's partitions. Partitions are kept sorted and
    /// unique.
    pub fn with_node(mut self, node: NodeId, partitions: impl IntoIterator<Item = PartitionId>) -> Self {
        self.assign(node, partitions);
        self
    }

    pub fn assign(&mut self, node: NodeId, partitions: impl IntoIterator<Item = PartitionId>) {
        let mut parts: Vec<PartitionId> = partitions.into_iter().collect();
        parts.sort_unstable();
        parts.dedup();
        self.assignments.insert(node, parts);
    }

    /// Member nodes, ascending
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.assignments.keys()
    }

    pub fn contains(&self, node: &NodeId) -> bool {
        self.assignments.contains_key(node)
    }

    /// Partitions owned by `node`, ascending; `None` if it is not a member
    pub fn partitions(&self, node: &NodeId) -> Option<&[PartitionId]> {
        self.assignments.get(node).map(|p| p.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}
