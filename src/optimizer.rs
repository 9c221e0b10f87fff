//! The optimization driver.
//!
//! An [`Optimizer`] holds an ordered list of rule factories, populated by
//! the host before any call. `optimize` runs each rule exactly once, in
//! registration order, against a fresh [`RewriteLog`]; after any rule that
//! changed the graph, it repairs every surviving node's inputs and the
//! result list by resolving them through the log. There is no fixpoint
//! iteration: rules with dependencies must be registered in dependency
//! order.

use std::sync::Arc;

use crate::dispatch::{OperandDispatch, OperandRule};
use crate::error::{DanglingInputSnafu, DeletedResultSnafu, Result};
use crate::graph::Graph;
use crate::node::Node;
use crate::operand::{KindRegistry, OperandKind};
use crate::provenance::{ForwardResolution, RewriteLog};
use crate::rule::{GraphEditor, RewriteRule};

type RuleFactory = Box<dyn Fn() -> Box<dyn RewriteRule>>;

struct RuleEntry {
    name: String,
    factory: RuleFactory,
}

/// Ordered registry of rewrite rules plus the operand-kind registry used to
/// expand interest sets at registration time.
#[derive(Default)]
pub struct Optimizer {
    kinds: KindRegistry,
    rules: Vec<RuleEntry>,
}

impl Optimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kinds(kinds: KindRegistry) -> Self {
        Self { kinds, rules: Vec::new() }
    }

    pub fn kinds(&self) -> &KindRegistry {
        &self.kinds
    }

    pub fn kinds_mut(&mut self) -> &mut KindRegistry {
        &mut self.kinds
    }

    /// Register a rule; it will run after every rule registered before it.
    /// The factory is invoked once per `optimize` call, so rule state never
    /// survives across calls.
    pub fn register_rule(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn RewriteRule> + 'static,
    ) {
        self.rules.push(RuleEntry { name: name.into(), factory: Box::new(factory) });
    }

    /// Register an operand-dispatched rule. The interest set is expanded
    /// against the kind registry *now*; refinements declared later are not
    /// picked up.
    pub fn register_operand_rule(
        &mut self,
        name: impl Into<String>,
        interests: &[OperandKind],
        factory: impl Fn() -> Box<dyn OperandRule> + 'static,
    ) {
        let expanded = self.kinds.expand(interests);
        self.register_rule(name, move || {
            Box::new(OperandDispatch::new(expanded.clone(), factory()))
        });
    }

    /// Run every registered rule once, in registration order.
    ///
    /// Returns the provenance log so the caller can translate externally
    /// held node identities across the optimization boundary. An error
    /// aborts the whole call; the graph may retain edits committed before
    /// the failure.
    pub fn optimize(&self, graph: &mut Graph) -> Result<RewriteLog> {
        let mut log = RewriteLog::new();

        for entry in &self.rules {
            let mut rule = (entry.factory)();
            let changed = {
                let mut editor = GraphEditor::new(graph, &mut log);
                rule.apply(&mut editor)?
            };
            tracing::debug!(rule = %entry.name, changed, "rewrite rule finished");

            if changed {
                Self::repair_inputs(graph, &log)?;
                Self::repair_results(graph, &log)?;
            }
        }

        Ok(log)
    }

    /// Rewrite every surviving node's inputs to their forward resolution.
    /// An input resolving to a deleted node means a rule removed a producer
    /// that still has a consumer.
    fn repair_inputs(graph: &mut Graph, log: &RewriteLog) -> Result<()> {
        let nodes: Vec<Arc<Node>> = graph.iter_nodes().cloned().collect();
        for node in nodes {
            let mut rewired = false;
            let mut inputs = node.inputs();
            for slot in inputs.iter_mut() {
                match log.resolve_forward(slot) {
                    ForwardResolution::Untracked => {}
                    ForwardResolution::Replaced(current) => {
                        if current.id != slot.id {
                            rewired = true;
                            *slot = current;
                        }
                    }
                    ForwardResolution::Deleted => {
                        return DanglingInputSnafu { consumer: node.id, producer: slot.id }.fail();
                    }
                }
            }
            if rewired {
                tracing::trace!(node.id = node.id, "rewired inputs through provenance");
                graph.set_inputs(&node, inputs);
            }
        }
        Ok(())
    }

    /// Recompute the result list through the log, falling back to each
    /// result itself.
    fn repair_results(graph: &mut Graph, log: &RewriteLog) -> Result<()> {
        let mut repaired = Vec::with_capacity(graph.results().len());
        for result in graph.results() {
            match log.resolve_forward(result) {
                ForwardResolution::Untracked => repaired.push(result.clone()),
                ForwardResolution::Replaced(current) => repaired.push(current),
                ForwardResolution::Deleted => {
                    return DeletedResultSnafu { id: result.id }.fail();
                }
            }
        }
        graph.set_results(repaired);
        Ok(())
    }
}
