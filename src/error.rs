use snafu::Snafu;

use crate::node::OutputKey;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    // =========================================================================
    // Structural violations (rejected pre-checks in `replace_subgraph`; the
    // failing call leaves the graph unmodified)
    // =========================================================================
    /// A replacement-graph node is also listed in the removal set.
    #[snafu(display("replacement node {id} is also marked for removal"))]
    ReplacementAlsoRemoved { id: u64 },

    /// A new result has no producer in the merged graph.
    #[snafu(display("new result {id} has no producer for output {key} in the merged graph"))]
    UnknownResult { id: u64, key: OutputKey },

    /// A surviving consumer would be left with an unsatisfiable input.
    #[snafu(display("input {key} of surviving node {consumer} is missing from the merged graph"))]
    MissingInput { consumer: u64, key: OutputKey },

    // =========================================================================
    // Invariant violations (a rule misbehaved; fatal, never retried)
    // =========================================================================
    /// A second Replace record was appended for an original that already has one.
    #[snafu(display("node {id} was already replaced; a second replacement is not allowed"))]
    DoubleReplace { id: u64 },

    /// A surviving node consumes from a producer that forward-resolves to deleted.
    #[snafu(display("input of node {consumer} resolves to deleted producer {producer}"))]
    DanglingInput { consumer: u64, producer: u64 },

    /// A current graph result forward-resolves to deleted.
    #[snafu(display("graph result {id} resolves to a deleted node"))]
    DeletedResult { id: u64 },
}
