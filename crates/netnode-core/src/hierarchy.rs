//! # Supplier Hierarchy
//!
//! Hierarchy level is derived, never stored: it is the number of supplier
//! hops from a node to a node with no supplier. Levels are computed over a
//! [`SupplierIndex`] snapshot of `(node, supplier)` links so the walk never
//! holds a store lock.
//!
//! Walks are iterative with a visited set. A cycle that made it into storage
//! surfaces as [`HierarchyError::Cycle`] instead of looping forever.

use std::collections::{HashMap, HashSet};

use crate::error::HierarchyError;
use crate::identity::NodeId;
use crate::node::NetworkNode;

/// Snapshot of supplier links.
#[derive(Debug, Clone, Default)]
pub struct SupplierIndex {
    links: HashMap<NodeId, Option<NodeId>>,
}

impl SupplierIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(node, supplier)` pairs.
    pub fn from_links(links: impl IntoIterator<Item = (NodeId, Option<NodeId>)>) -> Self {
        Self {
            links: links.into_iter().collect(),
        }
    }

    /// Build from full node records.
    pub fn from_nodes<'a>(nodes: impl IntoIterator<Item = &'a NetworkNode>) -> Self {
        Self::from_links(nodes.into_iter().map(|n| (n.id, n.supplier)))
    }

    /// Insert or replace a node's supplier link.
    pub fn set(&mut self, node: NodeId, supplier: Option<NodeId>) {
        self.links.insert(node, supplier);
    }

    pub fn contains(&self, node: &NodeId) -> bool {
        self.links.contains_key(node)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Supplier hops from `node` to a root.
    ///
    /// A supplier id missing from the index is reported as unknown; deletes
    /// clear supplier references, so a dangling link means corrupted state.
    pub fn hierarchy_level(&self, node: NodeId) -> Result<u32, HierarchyError> {
        let mut current = match self.links.get(&node) {
            Some(supplier) => *supplier,
            None => return Err(HierarchyError::UnknownNode(node)),
        };
        let mut visited = HashSet::from([node]);
        let mut level = 0u32;
        while let Some(supplier) = current {
            if !visited.insert(supplier) {
                return Err(HierarchyError::Cycle {
                    start: node,
                    repeated: supplier,
                });
            }
            level += 1;
            current = match self.links.get(&supplier) {
                Some(next) => *next,
                None => return Err(HierarchyError::UnknownNode(supplier)),
            };
        }
        Ok(level)
    }

    /// Whether making `candidate` the supplier of `node` would close a loop.
    ///
    /// True when `candidate` is `node` itself or when `node` already appears
    /// on `candidate`'s supplier chain.
    pub fn would_create_cycle(&self, node: NodeId, candidate: NodeId) -> bool {
        if node == candidate {
            return true;
        }
        let mut visited = HashSet::new();
        let mut current = Some(candidate);
        while let Some(id) = current {
            if id == node {
                return true;
            }
            if !visited.insert(id) {
                // Pre-existing loop that does not pass through `node`.
                return false;
            }
            current = self.links.get(&id).copied().flatten();
        }
        false
    }

    /// Nodes whose supplier is exactly `node`.
    pub fn dependents_of(&self, node: NodeId) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .links
            .iter()
            .filter(|(_, supplier)| **supplier == Some(node))
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Count of direct dependents.
    pub fn dependents_count(&self, node: NodeId) -> usize {
        self.links
            .values()
            .filter(|supplier| **supplier == Some(node))
            .count()
    }

    /// Level of every indexed node. Nodes caught in a cycle are reported in
    /// the error list instead.
    pub fn levels(&self) -> (Vec<(NodeId, u32)>, Vec<HierarchyError>) {
        let mut ids: Vec<NodeId> = self.links.keys().copied().collect();
        ids.sort();
        let mut levels = Vec::with_capacity(ids.len());
        let mut errors = Vec::new();
        for id in ids {
            match self.hierarchy_level(id) {
                Ok(level) => levels.push((id, level)),
                Err(e) => errors.push(e),
            }
        }
        (levels, errors)
    }
}
