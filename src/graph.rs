//! The mutable computation graph.
//!
//! [`Graph`] owns a set of [`Node`]s and the edges derived from their input
//! references. A successor index is maintained incrementally so that
//! predecessor and successor queries are O(degree). Node storage is keyed by
//! id in a `BTreeMap`, which makes plain iteration, topological iteration,
//! and successor ordering deterministic.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::node::Node;

/// Directed acyclic computation graph with an ordered results list.
///
/// Results designate the externally observable outputs; membership in the
/// results list protects a node from retroactive pruning.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: BTreeMap<u64, Arc<Node>>,
    /// node id -> ids of in-graph consumers
    consumers: BTreeMap<u64, BTreeSet<u64>>,
    results: Vec<Arc<Node>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, deriving edges from whichever of its inputs are
    /// already present. Inputs added later are wired up when the consumer's
    /// inputs are next rewritten through [`Graph::set_inputs`].
    pub fn add_node(&mut self, node: Arc<Node>) {
        self.consumers.entry(node.id).or_default();
        for input in node.inputs() {
            if self.nodes.contains_key(&input.id) {
                self.consumers.entry(input.id).or_default().insert(node.id);
            }
        }
        self.nodes.insert(node.id, node);
    }

    /// Remove a node and its incident edges. Consumers keep their (now
    /// dangling) input references; repairing those is the caller's job.
    pub fn remove_node(&mut self, node: &Arc<Node>) {
        self.nodes.remove(&node.id);
        self.consumers.remove(&node.id);
        for input in node.inputs() {
            if let Some(set) = self.consumers.get_mut(&input.id) {
                set.remove(&node.id);
            }
        }
    }

    pub fn contains(&self, node: &Arc<Node>) -> bool {
        self.nodes.contains_key(&node.id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate nodes in ascending id order.
    pub fn iter_nodes(&self) -> impl Iterator<Item = &Arc<Node>> {
        self.nodes.values()
    }

    /// In-graph producers of `node`, in input order, deduplicated.
    pub fn predecessors(&self, node: &Arc<Node>) -> Vec<Arc<Node>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for input in node.inputs() {
            if self.nodes.contains_key(&input.id) && seen.insert(input.id) {
                out.push(input);
            }
        }
        out
    }

    /// In-graph consumers of `node`, in ascending id order.
    pub fn successors(&self, node: &Arc<Node>) -> Vec<Arc<Node>> {
        self.consumers
            .get(&node.id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.nodes.get(id).cloned())
            .collect()
    }

    /// Replace a node's input list, keeping the successor index consistent.
    pub fn set_inputs(&mut self, node: &Arc<Node>, inputs: SmallVec<[Arc<Node>; 2]>) {
        debug_assert!(self.nodes.contains_key(&node.id), "set_inputs on node outside graph");
        for old in node.inputs() {
            if let Some(set) = self.consumers.get_mut(&old.id) {
                set.remove(&node.id);
            }
        }
        for input in &inputs {
            if self.nodes.contains_key(&input.id) {
                self.consumers.entry(input.id).or_default().insert(node.id);
            }
        }
        node.store_inputs(inputs);
    }

    /// Deterministic topological order (Kahn's algorithm, smallest id first
    /// among ready nodes).
    pub fn topo_nodes(&self) -> Vec<Arc<Node>> {
        let mut indegree: BTreeMap<u64, usize> = BTreeMap::new();
        for node in self.nodes.values() {
            indegree.insert(node.id, self.predecessors(node).len());
        }

        let mut ready: BTreeSet<u64> =
            indegree.iter().filter(|(_, deg)| **deg == 0).map(|(&id, _)| id).collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(&id) = ready.iter().next() {
            ready.remove(&id);
            let node = self.nodes[&id].clone();
            if let Some(succs) = self.consumers.get(&id) {
                for succ in succs {
                    if let Some(deg) = indegree.get_mut(succ) {
                        *deg -= 1;
                        if *deg == 0 {
                            ready.insert(*succ);
                        }
                    }
                }
            }
            order.push(node);
        }

        debug_assert_eq!(order.len(), self.nodes.len(), "graph contains a cycle");
        order
    }

    /// The ordered, externally observable outputs.
    pub fn results(&self) -> &[Arc<Node>] {
        &self.results
    }

    pub fn set_results(&mut self, results: Vec<Arc<Node>>) {
        self.results = results;
    }

    pub fn add_result(&mut self, node: Arc<Node>) {
        self.results.push(node);
    }
}
