//! Operand-kind based rule dispatch.
//!
//! Most rules care about a handful of operation kinds. [`OperandDispatch`]
//! wraps such a rule and drives it over the graph in topological order,
//! visiting each operand *instance* at most once per pass (sibling nodes of
//! one multi-output operand are deduplicated) and skipping nodes an earlier
//! match already removed.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Result;
use crate::node::Node;
use crate::operand::{Operand, OperandKind};
use crate::rule::{GraphEditor, RewriteRule};

/// A rule driven by operand-kind dispatch.
///
/// `matches` is a pure predicate over the operand payload; `transform`
/// performs the structural edit, typically through
/// [`GraphEditor::replace_subgraph`] or
/// [`GraphEditor::replace_with_new_node`].
pub trait OperandRule {
    fn matches(&self, operand: &dyn Operand) -> bool;

    fn transform(&mut self, node: &Arc<Node>, editor: &mut GraphEditor<'_>) -> Result<()>;
}

/// Topological application loop around an [`OperandRule`].
///
/// The interest set is already expanded (refinements resolved at
/// registration time, see
/// [`Optimizer::register_operand_rule`](crate::optimizer::Optimizer::register_operand_rule)).
pub struct OperandDispatch {
    interests: HashSet<OperandKind>,
    rule: Box<dyn OperandRule>,
}

impl OperandDispatch {
    pub fn new(interests: HashSet<OperandKind>, rule: Box<dyn OperandRule>) -> Self {
        Self { interests, rule }
    }
}

impl RewriteRule for OperandDispatch {
    fn apply(&mut self, editor: &mut GraphEditor<'_>) -> Result<bool> {
        let mut visited: HashSet<usize> = HashSet::new();
        let mut changed = false;

        for node in editor.graph().topo_nodes() {
            if !visited.insert(node.operand_token()) {
                continue;
            }
            // An earlier match in this same pass may have removed the node.
            if !editor.graph().contains(&node) {
                continue;
            }
            if !self.interests.contains(&node.kind()) {
                continue;
            }
            if self.rule.matches(node.operand().as_ref()) {
                changed = true;
                self.rule.transform(&node, editor)?;
            }
        }

        Ok(changed)
    }
}
