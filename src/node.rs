//! Graph vertices.
//!
//! A [`Node`] is one operation instance: a stable opaque identity, a typed
//! operand (shareable among sibling nodes of a multi-output operand), the
//! [`OutputKey`] it produces, and an ordered list of input references to
//! producer nodes. Inputs are the only mutable part; the rewrite engine
//! repairs them in place, so they sit behind a lock and every mutation goes
//! through [`Graph::set_inputs`](crate::graph::Graph::set_inputs).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use derive_more::Display;
use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::operand::{Operand, OperandKind};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(0);
static NEXT_OUTPUT_KEY: AtomicU64 = AtomicU64::new(0);

/// Identity of one produced value.
///
/// Fresh keys come from a process-wide counter. A replacement node may
/// deliberately reuse the key of the node it replaces (via
/// [`Node::with_key`]) so that surviving consumers keep resolving during
/// subgraph replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("k{_0}")]
pub struct OutputKey(u64);

impl OutputKey {
    /// Allocate a key never handed out before.
    pub fn fresh() -> Self {
        Self(NEXT_OUTPUT_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

/// One vertex of the computation graph.
///
/// Identity is the stable `id`, unique for the lifetime of the process.
/// Edges are implicit: a node's inputs reference the producers it consumes
/// from, in order.
pub struct Node {
    /// Unique stable identity. Never reused.
    pub id: u64,
    key: OutputKey,
    operand: Arc<dyn Operand>,
    inputs: RwLock<SmallVec<[Arc<Node>; 2]>>,
}

impl Node {
    /// Create a node with a fresh output key.
    pub fn new(operand: Arc<dyn Operand>, inputs: impl IntoIterator<Item = Arc<Node>>) -> Arc<Self> {
        Self::with_key(operand, inputs, OutputKey::fresh())
    }

    /// Create a node producing an existing output key.
    ///
    /// Used by rewrite rules so the replacement takes over the original's
    /// output, keeping consumer inputs resolvable.
    pub fn with_key(
        operand: Arc<dyn Operand>,
        inputs: impl IntoIterator<Item = Arc<Node>>,
        key: OutputKey,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
            key,
            operand,
            inputs: RwLock::new(inputs.into_iter().collect()),
        })
    }

    /// The output this node produces.
    pub fn key(&self) -> OutputKey {
        self.key
    }

    pub fn operand(&self) -> &Arc<dyn Operand> {
        &self.operand
    }

    /// Operation kind, delegated to the operand.
    pub fn kind(&self) -> OperandKind {
        self.operand.kind()
    }

    /// Snapshot of the ordered input references.
    pub fn inputs(&self) -> SmallVec<[Arc<Node>; 2]> {
        self.inputs.read().clone()
    }

    /// Identity token of the operand *instance*.
    ///
    /// Sibling nodes of one multi-output operand share the same token; the
    /// dispatch loop dedups on it.
    pub fn operand_token(&self) -> usize {
        Arc::as_ptr(&self.operand) as *const () as usize
    }

    /// Overwrite the input list. Callers owning a graph must go through
    /// `Graph::set_inputs` so the successor index stays consistent.
    pub(crate) fn store_inputs(&self, inputs: SmallVec<[Arc<Node>; 2]>) {
        *self.inputs.write() = inputs;
    }
}

// Manual Debug: printing inputs as full nodes would walk the whole graph.
impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("key", &self.key)
            .field("inputs", &self.inputs.read().iter().map(|n| n.id).collect::<Vec<_>>())
            .finish()
    }
}

/// Wrapper for `Arc<Node>` that implements Hash and Eq based on stable ID.
///
/// Lets nodes serve as map keys without hashing their (lock-guarded) input
/// lists.
#[allow(clippy::mutable_key_type)]
#[derive(Clone)]
pub struct NodeKey(pub Arc<Node>);

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeKey(id={})", self.0.id)
    }
}

impl PartialEq for NodeKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for NodeKey {}

impl Hash for NodeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}
