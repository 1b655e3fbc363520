//! The result of checking every registered constraint.

use crate::store::{NodeId, Value};
use serde::Serialize;
use std::fmt;

/// Outcome of a single constraint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintOutcome {
    /// Position of the constraint in registration order.
    pub index: usize,
    pub label: String,
    pub node: NodeId,
    pub computed: Value,
    pub expected: Value,
    /// Set when the expectation is another node's computed value.
    pub expected_node: Option<NodeId>,
    pub passed: bool,
}

impl fmt::Display for ConstraintOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed { "ok" } else { "FAILED" };
        write!(
            f,
            "[{}] {} ({}): computed {}, expected {}",
            status, self.label, self.node, self.computed, self.expected
        )?;
        if let Some(other) = self.expected_node {
            write!(f, " (from {})", other)?;
        }
        Ok(())
    }
}

/// One outcome per constraint, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConstraintReport {
    outcomes: Vec<ConstraintOutcome>,
}

impl ConstraintReport {
    pub(crate) fn new(outcomes: Vec<ConstraintOutcome>) -> Self {
        Self { outcomes }
    }

    /// True iff every constraint passed. Vacuously true with no constraints.
    pub fn is_satisfied(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    pub fn outcomes(&self) -> &[ConstraintOutcome] {
        &self.outcomes
    }

    pub fn violations(&self) -> impl Iterator<Item = &ConstraintOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }

    /// The outcome of the first constraint registered on `node`.
    pub fn outcome_for(&self, node: NodeId) -> Option<&ConstraintOutcome> {
        self.outcomes.iter().find(|o| o.node == node)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

impl fmt::Display for ConstraintReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.violations().count();
        writeln!(f, "{} constraint(s), {} failed", self.outcomes.len(), failed)?;
        for outcome in &self.outcomes {
            writeln!(f, "  {}", outcome)?;
        }
        Ok(())
    }
}
