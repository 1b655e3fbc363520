//! Compares computed values against registered constraints.
use super::report::{ConstraintOutcome, ConstraintReport};
use crate::compute::kernel::values_equal;
use crate::compute::EvaluationResult;
use crate::config::Tolerance;
use crate::error::GraphError;
use crate::store::{Constraint, Expected, GraphStore};

/// Checks every constraint of a store against one evaluation.
///
/// Never stops at the first violation: the report covers all constraints so
/// the caller sees every failure in one pass.
pub struct ConstraintChecker<'a> {
    store: &'a GraphStore,
    tolerance: Tolerance,
}

impl<'a> ConstraintChecker<'a> {
    pub fn new(store: &'a GraphStore, tolerance: Tolerance) -> Self {
        Self { store, tolerance }
    }

    /// Fails only if a constrained node is missing from `result`.
    pub fn check(&self, result: &EvaluationResult) -> Result<ConstraintReport, GraphError> {
        let mut outcomes = Vec::with_capacity(self.store.constraints().len());

        for (index, constraint) in self.store.constraints().iter().enumerate() {
            let outcome = self.check_one(index, constraint, result)?;
            if !outcome.passed {
                tracing::warn!(
                    constraint = %outcome.label,
                    node = %outcome.node,
                    computed = %outcome.computed,
                    expected = %outcome.expected,
                    "constraint violated"
                );
            }
            outcomes.push(outcome);
        }

        Ok(ConstraintReport::new(outcomes))
    }

    fn check_one(
        &self,
        index: usize,
        constraint: &Constraint,
        result: &EvaluationResult,
    ) -> Result<ConstraintOutcome, GraphError> {
        let computed = result
            .get(constraint.node)
            .ok_or(GraphError::NotEvaluated(constraint.node))?;
        let (expected, expected_node) = match constraint.expected {
            Expected::Value(v) => (v, None),
            Expected::Node(other) => {
                (result.get(other).ok_or(GraphError::NotEvaluated(other))?, Some(other))
            }
        };

        let label = match &constraint.label {
            Some(label) => label.clone(),
            None => match expected_node {
                Some(other) => format!(
                    "{} == {}",
                    self.store.display_name(constraint.node),
                    self.store.display_name(other)
                ),
                None => format!("{} == {}", self.store.display_name(constraint.node), expected),
            },
        };

        Ok(ConstraintOutcome {
            index,
            label,
            node: constraint.node,
            computed,
            expected,
            expected_node,
            passed: values_equal(&computed, &expected, &self.tolerance),
        })
    }
}
