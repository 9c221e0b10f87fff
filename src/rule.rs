//! Rewrite rules and the structural editing primitives they build on.
//!
//! A rule is anything implementing [`RewriteRule`]: scan the graph, commit
//! edits, report whether anything changed. All structural surgery goes
//! through a [`GraphEditor`], which borrows the graph and the provenance log
//! for the duration of one `apply` call and owns the collapsible-predecessor
//! bookkeeping for that call.
//!
//! The safety-critical primitive is [`GraphEditor::replace_subgraph`]: it
//! validates every precondition *before* touching the graph, so a failing
//! call observably does nothing. Rules composing several primitive calls get
//! no such guarantee and are responsible for their own atomicity.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use smallvec::SmallVec;
use snafu::ensure;

use crate::error::{MissingInputSnafu, ReplacementAlsoRemovedSnafu, Result, UnknownResultSnafu};
use crate::graph::Graph;
use crate::node::{Node, NodeKey, OutputKey};
use crate::provenance::{BackwardResolution, ForwardResolution, RewriteLog, RewriteRecord};

/// A graph rewrite pass.
///
/// `apply` scans the graph once and returns true iff it changed anything.
/// Instances live for a single optimization call.
pub trait RewriteRule {
    fn apply(&mut self, editor: &mut GraphEditor<'_>) -> Result<bool>;
}

/// Structural editing surface handed to one rule application.
///
/// Owns the collapsible-predecessor map for the call; the map is an explicit
/// id-keyed `HashMap` dropped with the editor, so bookkeeping never leaks
/// across rules or across `optimize` calls.
pub struct GraphEditor<'a> {
    graph: &'a mut Graph,
    log: &'a mut RewriteLog,
    /// original predecessor id -> successors a rewrite has accounted for
    collapsible: HashMap<u64, HashSet<NodeKey>>,
}

impl<'a> GraphEditor<'a> {
    pub fn new(graph: &'a mut Graph, log: &'a mut RewriteLog) -> Self {
        Self { graph, log, collapsible: HashMap::new() }
    }

    pub fn graph(&self) -> &Graph {
        &*self.graph
    }

    pub fn log(&self) -> &RewriteLog {
        &*self.log
    }

    /// Record that a rule replaced `original` with `replacement`.
    pub fn record_replace(&mut self, original: &Arc<Node>, replacement: &Arc<Node>) -> Result<()> {
        self.log.append(RewriteRecord::Replace {
            original: original.clone(),
            replacement: replacement.clone(),
        })
    }

    /// Record a node created without a pre-optimization counterpart.
    pub fn record_new(&mut self, replacement: &Arc<Node>) -> Result<()> {
        self.log.append(RewriteRecord::New { replacement: replacement.clone() })
    }

    /// Record that `original` was removed for good.
    pub fn record_delete(&mut self, original: &Arc<Node>) -> Result<()> {
        self.log.append(RewriteRecord::Delete { original: original.clone() })
    }

    /// Swap a single node: `new` takes over `old`'s exact inputs, every
    /// consumer of `old` is rewired to `new`, and `old` is removed.
    ///
    /// No validation beyond what the graph itself enforces; callers append
    /// the Replace record themselves.
    pub fn replace_node(&mut self, old: &Arc<Node>, new: &Arc<Node>) {
        let successors = self.graph.successors(old);
        self.graph.remove_node(old);
        new.store_inputs(old.inputs());
        self.graph.add_node(new.clone());
        for succ in successors {
            let rewired = succ
                .inputs()
                .into_iter()
                .map(|input| if input.id == old.id { new.clone() } else { input })
                .collect();
            self.graph.set_inputs(&succ, rewired);
        }
    }

    /// Replace a set of nodes with the contents of `replacement`.
    ///
    /// 1. The tentative final result set is the current results minus
    ///    `results_to_remove`, plus `new_results`.
    /// 2. An output-key -> producer index is merged over the replacement
    ///    graph and the surviving original nodes.
    /// 3. Every new result must have a producer in that index.
    /// 4. Every input of every affected successor (a survivor currently
    ///    consuming from a removed node), and of every replacement node,
    ///    must resolve in that index.
    /// 5. Only then: removed nodes and their edges vanish; with no
    ///    replacement graph this is a pure deletion and only the result list
    ///    is still updated. Otherwise replacement nodes are added and every
    ///    input of (replacement nodes ∪ affected successors) is reconnected
    ///    against the index.
    ///
    /// Any precondition failure aborts before the first removal, leaving the
    /// graph unmodified.
    pub fn replace_subgraph(
        &mut self,
        replacement: Option<&Graph>,
        nodes_to_remove: &[Arc<Node>],
        new_results: &[Arc<Node>],
        results_to_remove: &[Arc<Node>],
    ) -> Result<()> {
        let remove_ids: HashSet<u64> = nodes_to_remove.iter().map(|n| n.id).collect();
        let dropped_result_ids: HashSet<u64> = results_to_remove.iter().map(|n| n.id).collect();

        let mut final_results: Vec<Arc<Node>> = self
            .graph
            .results()
            .iter()
            .filter(|r| !dropped_result_ids.contains(&r.id))
            .cloned()
            .collect();

        // Merged output-key index: replacement nodes first, survivors second.
        let mut producers: HashMap<OutputKey, Arc<Node>> = HashMap::new();
        if let Some(sub) = replacement {
            for node in sub.iter_nodes() {
                ensure!(!remove_ids.contains(&node.id), ReplacementAlsoRemovedSnafu { id: node.id });
                producers.insert(node.key(), node.clone());
            }
        }
        for node in self.graph.iter_nodes() {
            if !remove_ids.contains(&node.id) {
                producers.insert(node.key(), node.clone());
            }
        }

        for result in new_results {
            ensure!(
                producers.contains_key(&result.key()),
                UnknownResultSnafu { id: result.id, key: result.key() }
            );
        }
        let mut result_ids: HashSet<u64> = final_results.iter().map(|r| r.id).collect();
        for result in new_results {
            if result_ids.insert(result.id) {
                final_results.push(result.clone());
            }
        }

        // Survivors that consume from a removed node, deduplicated, id order.
        let mut affected: BTreeMap<u64, Arc<Node>> = BTreeMap::new();
        for node in nodes_to_remove {
            for succ in self.graph.successors(node) {
                if !remove_ids.contains(&succ.id) {
                    affected.insert(succ.id, succ);
                }
            }
        }
        for succ in affected.values() {
            for input in succ.inputs() {
                ensure!(
                    producers.contains_key(&input.key()),
                    MissingInputSnafu { consumer: succ.id, key: input.key() }
                );
            }
        }
        if let Some(sub) = replacement {
            for node in sub.iter_nodes() {
                for input in node.inputs() {
                    ensure!(
                        producers.contains_key(&input.key()),
                        MissingInputSnafu { consumer: node.id, key: input.key() }
                    );
                }
            }
        }

        // All pre-checks passed; start mutating.
        for node in nodes_to_remove {
            self.graph.remove_node(node);
        }

        if let Some(sub) = replacement {
            for node in sub.iter_nodes() {
                self.graph.add_node(node.clone());
            }
            let reconnect: Vec<Arc<Node>> =
                sub.iter_nodes().cloned().chain(affected.into_values()).collect();
            for node in reconnect {
                let inputs: SmallVec<[Arc<Node>; 2]> = node
                    .inputs()
                    .iter()
                    .map(|input| {
                        producers
                            .get(&input.key())
                            .cloned()
                            .expect("input key validated against merged index")
                    })
                    .collect();
                self.graph.set_inputs(&node, inputs);
            }
        }

        self.graph.set_results(final_results);
        Ok(())
    }

    /// Note that a rewrite of `accounted` has made it stop needing
    /// `predecessor`. Bookkeeping is keyed by the predecessor's
    /// backward-resolved original, so repeated rewrites of the same producer
    /// accumulate into one entry.
    pub fn mark_collapsible(&mut self, predecessor: &Arc<Node>, accounted: &Arc<Node>) {
        let original = match self.log.resolve_backward(predecessor) {
            BackwardResolution::Original(node) => node,
            _ => predecessor.clone(),
        };
        self.collapsible.entry(original.id).or_default().insert(NodeKey(accounted.clone()));
    }

    /// Remove predecessors of `node` whose every current successor has been
    /// accounted for, appending a Delete record per removal. A predecessor
    /// that is (or originally was) a current graph result is never pruned.
    pub fn prune_collapsible(&mut self, node: &Arc<Node>) -> Result<()> {
        let node = match self.log.resolve_forward(node) {
            ForwardResolution::Replaced(current) => current,
            _ => node.clone(),
        };
        let result_ids: HashSet<u64> = self.graph.results().iter().map(|r| r.id).collect();

        let mut doomed: Vec<(Arc<Node>, Arc<Node>)> = Vec::new();
        for pred in self.graph.predecessors(&node) {
            let pred_original = match self.log.resolve_backward(&pred) {
                BackwardResolution::Original(original) => original,
                _ => pred.clone(),
            };
            let pred_current = match self.log.resolve_forward(&pred) {
                ForwardResolution::Replaced(current) => current,
                _ => pred.clone(),
            };
            if result_ids.contains(&pred_current.id) || result_ids.contains(&pred_original.id) {
                continue;
            }

            let accounted: HashSet<u64> = self
                .collapsible
                .get(&pred_original.id)
                .map(|set| {
                    set.iter()
                        .map(|key| match self.log.resolve_forward(&key.0) {
                            ForwardResolution::Replaced(current) => current.id,
                            _ => key.0.id,
                        })
                        .collect()
                })
                .unwrap_or_default();

            if self.graph.successors(&pred).iter().all(|succ| accounted.contains(&succ.id)) {
                doomed.push((pred_original, pred_current));
            }
        }

        for (original, current) in doomed {
            tracing::trace!(node.id = current.id, "pruning collapsible predecessor");
            self.graph.remove_node(&current);
            self.record_delete(&original)?;
        }
        Ok(())
    }

    /// The composed edit most rules want: swap `original` for the single
    /// node `new` (which should reuse `original`'s output key), carry over
    /// result status, append the Replace record, then prune predecessors
    /// that this rewrite left without consumers.
    pub fn replace_with_new_node(&mut self, original: &Arc<Node>, new: Arc<Node>) -> Result<()> {
        let original = match self.log.resolve_forward(original) {
            ForwardResolution::Replaced(current) => current,
            _ => original.clone(),
        };

        let mut sub = Graph::new();
        sub.add_node(new.clone());

        let was_result = self.graph.results().iter().any(|r| r.id == original.id);
        let (new_results, results_to_remove) = if was_result {
            (vec![new.clone()], vec![original.clone()])
        } else {
            (Vec::new(), Vec::new())
        };

        self.replace_subgraph(Some(&sub), &[original.clone()], &new_results, &results_to_remove)?;
        self.record_replace(&original, &new)?;
        self.prune_collapsible(&new)
    }
}
