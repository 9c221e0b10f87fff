//! Typed operation payloads and the operand-kind registry.
//!
//! An [`Operand`] describes *what* a node computes: its kind plus whatever
//! parameters the host domain attaches. The engine never interprets the
//! payload; it only dispatches on [`OperandKind`] and on operand instance
//! identity (several nodes may share one multi-output operand).
//!
//! Refinement relations between kinds are declared explicitly in a
//! [`KindRegistry`] and expanded at rule-registration time.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;

use derive_more::Display;

/// Name of an operation kind.
///
/// Kinds are compared by their static name; refinement relations between
/// kinds live in the [`KindRegistry`], not in the kind itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{_0}")]
pub struct OperandKind(pub &'static str);

/// Typed payload describing a node's operation kind and parameters.
///
/// Implementations are supplied by the host domain. `as_any` lets concrete
/// rewrite rules downcast to the parameter type they matched on.
pub trait Operand: fmt::Debug + Send + Sync + 'static {
    /// The operation kind of this operand.
    fn kind(&self) -> OperandKind;

    /// Downcast hook for concrete rules.
    fn as_any(&self) -> &dyn Any;
}

/// Explicit registry of operand kinds and their refinements.
///
/// A refinement is a kind that specializes another (e.g. a fused elementwise
/// kind refining a generic elementwise kind). Rules declare interest in base
/// kinds; [`KindRegistry::expand`] resolves the declared set to all concrete
/// kinds it covers. The registry is host-populated before rule registration,
/// replacing any runtime subclass enumeration.
#[derive(Debug, Default, Clone)]
pub struct KindRegistry {
    /// kind -> directly declared refinements
    refinements: HashMap<OperandKind, Vec<OperandKind>>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a kind with no parent.
    pub fn register(&mut self, kind: OperandKind) {
        self.refinements.entry(kind).or_default();
    }

    /// Declare `kind` as a refinement of `parent`.
    pub fn register_refinement(&mut self, kind: OperandKind, parent: OperandKind) {
        self.register(kind);
        let children = self.refinements.entry(parent).or_default();
        if !children.contains(&kind) {
            children.push(kind);
        }
    }

    /// Expand a declared interest set to include all transitive refinements.
    pub fn expand(&self, kinds: &[OperandKind]) -> HashSet<OperandKind> {
        let mut out: HashSet<OperandKind> = HashSet::new();
        let mut stack: Vec<OperandKind> = kinds.to_vec();

        while let Some(kind) = stack.pop() {
            if !out.insert(kind) {
                continue;
            }
            if let Some(children) = self.refinements.get(&kind) {
                stack.extend(children.iter().copied());
            }
        }

        out
    }

    /// Whether the kind has been declared.
    pub fn is_registered(&self, kind: OperandKind) -> bool {
        self.refinements.contains_key(&kind)
    }
}
