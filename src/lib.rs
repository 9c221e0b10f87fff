//! In-place DAG rewrite engine with provenance tracking.
//!
//! `dagopt` mutates a directed acyclic computation graph in place by
//! applying an ordered sequence of pluggable rewrite rules, while keeping an
//! append-only provenance log that translates any node identity between its
//! pre-optimization and post-optimization form.
//!
//! # Module Organization
//!
//! - [`operand`] - Typed operation payloads and the operand-kind registry
//! - [`node`] - Graph vertices with stable identity and output keys
//! - [`graph`] - The mutable DAG: derived edges, results, topological iteration
//! - [`provenance`] - Rewrite records and forward/backward identity resolution
//! - [`rule`] - The `RewriteRule` trait and the `GraphEditor` primitives
//! - [`dispatch`] - Operand-kind based rule dispatch
//! - [`optimizer`] - The driver: registration, per-pass execution, repair
//! - [`error`] - Error types and result handling
//!
//! # Guarantees
//!
//! The subgraph-replacement primitive validates every precondition before
//! the first removal, so a failing call leaves the graph unmodified. The
//! driver repairs all surviving inputs and the result list after each
//! changing rule, so no dangling edge or orphaned result survives an
//! `optimize` call that returns `Ok`.

pub mod dispatch;
pub mod error;
pub mod graph;
pub mod node;
pub mod operand;
pub mod optimizer;
pub mod provenance;
pub mod rule;


// Re-exports: all core types remain accessible at the crate root.
pub use dispatch::{OperandDispatch, OperandRule};
pub use error::{Error, Result};
pub use graph::Graph;
pub use node::{Node, NodeKey, OutputKey};
pub use operand::{KindRegistry, Operand, OperandKind};
pub use optimizer::Optimizer;
pub use provenance::{
    BackwardResolution, ForwardResolution, RecordKind, RewriteLog, RewriteRecord,
};
pub use rule::{GraphEditor, RewriteRule};
