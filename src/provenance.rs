//! Rewrite provenance.
//!
//! Every structural edit a rule commits appends one [`RewriteRecord`] to the
//! [`RewriteLog`]. The log is append-only and created fresh per optimization
//! run; two derived indices make identity translation cheap in both
//! directions:
//!
//! - forward: what did this pre-optimization node become?
//! - backward: which pre-optimization node does this one stand for?
//!
//! Resolution walks chains of Replace hops. A Delete hop dominates the whole
//! chain (the node is gone, not merely renamed), and a node known only from
//! a New record has no original at all. Both outcomes are distinct from a
//! node the log has never seen.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{DoubleReplaceSnafu, Result};
use crate::node::Node;

/// Discriminant of a [`RewriteRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Replace,
    New,
    Delete,
}

/// One provenance event. Records never mutate once appended.
#[derive(Debug, Clone)]
pub enum RewriteRecord {
    /// `original` was structurally replaced by `replacement`.
    Replace { original: Arc<Node>, replacement: Arc<Node> },
    /// `replacement` was created with no pre-optimization counterpart.
    New { replacement: Arc<Node> },
    /// `original` was removed for good.
    Delete { original: Arc<Node> },
}

impl RewriteRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Replace { .. } => RecordKind::Replace,
            Self::New { .. } => RecordKind::New,
            Self::Delete { .. } => RecordKind::Delete,
        }
    }

    pub fn original(&self) -> Option<&Arc<Node>> {
        match self {
            Self::Replace { original, .. } | Self::Delete { original } => Some(original),
            Self::New { .. } => None,
        }
    }

    pub fn replacement(&self) -> Option<&Arc<Node>> {
        match self {
            Self::Replace { replacement, .. } | Self::New { replacement } => Some(replacement),
            Self::Delete { .. } => None,
        }
    }
}

/// Outcome of forward resolution (pre-optimization identity -> current).
#[derive(Debug, Clone)]
pub enum ForwardResolution {
    /// The log has never seen this node; callers fall back to the node itself.
    Untracked,
    /// The node's current stand-in after following every Replace hop.
    Replaced(Arc<Node>),
    /// The node (or something it became) was deleted.
    Deleted,
}

impl ForwardResolution {
    /// Resolve with a fallback, treating Deleted as "no current node".
    pub fn node_or(self, fallback: &Arc<Node>) -> Option<Arc<Node>> {
        match self {
            Self::Untracked => Some(fallback.clone()),
            Self::Replaced(node) => Some(node),
            Self::Deleted => None,
        }
    }
}

/// Outcome of backward resolution (current identity -> pre-optimization).
#[derive(Debug, Clone)]
pub enum BackwardResolution {
    /// The log has never seen this node.
    Untracked,
    /// The pre-optimization node this one stands for.
    Original(Arc<Node>),
    /// The node was created during optimization; it has no original.
    Created,
}

impl BackwardResolution {
    pub fn node_or(self, fallback: &Arc<Node>) -> Option<Arc<Node>> {
        match self {
            Self::Untracked => Some(fallback.clone()),
            Self::Original(node) => Some(node),
            Self::Created => None,
        }
    }
}

/// Hop bound for chain walks. Exceeding it means a rule wrote a resolution
/// cycle, which is an internal bug, not a recoverable condition.
const MAX_HOPS: usize = 10_000;

/// Append-only log of rewrite records with derived lookup indices.
#[derive(Debug, Default)]
pub struct RewriteLog {
    records: Vec<RewriteRecord>,
    /// original node id -> index of its latest Replace/Delete record
    by_original: HashMap<u64, usize>,
    /// replacement node id -> index of its latest New/Replace record
    by_replacement: HashMap<u64, usize>,
}

impl RewriteLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, updating the indices.
    ///
    /// A second Replace of an already-replaced original is rejected; a
    /// Delete may overwrite an earlier entry for the same original. That is
    /// the retroactive-pruning path: a producer first survives a rewrite,
    /// then loses its last consumer.
    pub fn append(&mut self, record: RewriteRecord) -> Result<()> {
        let idx = self.records.len();
        match &record {
            RewriteRecord::Replace { original, replacement } => {
                if let Some(&prev) = self.by_original.get(&original.id) {
                    snafu::ensure!(
                        !matches!(self.records[prev], RewriteRecord::Replace { .. }),
                        DoubleReplaceSnafu { id: original.id }
                    );
                }
                self.by_original.insert(original.id, idx);
                self.by_replacement.insert(replacement.id, idx);
            }
            RewriteRecord::New { replacement } => {
                self.by_replacement.insert(replacement.id, idx);
            }
            RewriteRecord::Delete { original } => {
                self.by_original.insert(original.id, idx);
            }
        }
        self.records.push(record);
        Ok(())
    }

    /// Translate a pre-optimization node to its current form.
    pub fn resolve_forward(&self, node: &Arc<Node>) -> ForwardResolution {
        if !self.by_original.contains_key(&node.id) {
            return ForwardResolution::Untracked;
        }

        let mut current = node.clone();
        for _ in 0..MAX_HOPS {
            match self.by_original.get(&current.id) {
                None => return ForwardResolution::Replaced(current),
                Some(&idx) => match &self.records[idx] {
                    RewriteRecord::Replace { replacement, .. } => current = replacement.clone(),
                    RewriteRecord::Delete { .. } => return ForwardResolution::Deleted,
                    RewriteRecord::New { .. } => {
                        unreachable!("New record indexed by original id")
                    }
                },
            }
        }
        panic!(
            "forward resolution of node {} exceeded {} hops: a rule introduced a replacement cycle",
            node.id, MAX_HOPS
        );
    }

    /// Translate a current node back to its pre-optimization form.
    pub fn resolve_backward(&self, node: &Arc<Node>) -> BackwardResolution {
        if !self.by_replacement.contains_key(&node.id) {
            return BackwardResolution::Untracked;
        }

        let mut current = node.clone();
        for _ in 0..MAX_HOPS {
            match self.by_replacement.get(&current.id) {
                None => return BackwardResolution::Original(current),
                Some(&idx) => match &self.records[idx] {
                    RewriteRecord::Replace { original, .. } => current = original.clone(),
                    RewriteRecord::New { .. } => return BackwardResolution::Created,
                    RewriteRecord::Delete { .. } => {
                        unreachable!("Delete record indexed by replacement id")
                    }
                },
            }
        }
        panic!(
            "backward resolution of node {} exceeded {} hops: a rule introduced a replacement cycle",
            node.id, MAX_HOPS
        );
    }

    pub fn records(&self) -> &[RewriteRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
