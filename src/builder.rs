//! The public construction API.
//!
//! A `Builder` owns exactly one `GraphStore` for its whole lifetime, together
//! with the current input binding. Nodes and constraints are only ever added;
//! evaluation and checking read the store and never mutate it.

use crate::analysis::topology;
use crate::compute::{Binding, EvaluationResult, Evaluator};
use crate::config::EvalConfig;
use crate::display::{format_trace, GraphSnapshot};
use crate::error::{GraphError, Result};
use crate::store::{Constraint, Expected, GraphStore, NodeId, NodeKind, NodeMetadata, Operator, Value};
use crate::validation::{ConstraintChecker, ConstraintReport};
use smallvec::SmallVec;

/// An operation argument: an existing node, or a literal that the builder
/// turns into a constant node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Node(NodeId),
    Literal(Value),
}

impl From<NodeId> for Operand {
    fn from(id: NodeId) -> Self { Operand::Node(id) }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self { Operand::Literal(v) }
}

impl From<i64> for Operand {
    fn from(v: i64) -> Self { Operand::Literal(v.into()) }
}

impl From<i32> for Operand {
    fn from(v: i32) -> Self { Operand::Literal(v.into()) }
}

impl From<f64> for Operand {
    fn from(v: f64) -> Self { Operand::Literal(v.into()) }
}

impl From<bool> for Operand {
    fn from(v: bool) -> Self { Operand::Literal(v.into()) }
}

#[derive(Debug, Default)]
pub struct Builder {
    store: GraphStore,
    binding: Binding,
    config: EvalConfig,
}

impl Builder {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(config: EvalConfig) -> Self {
        Self { config, ..Self::default() }
    }

    pub fn config(&self) -> &EvalConfig { &self.config }

    /// Read-only access to the underlying store.
    pub fn graph(&self) -> &GraphStore { &self.store }

    pub fn binding(&self) -> &Binding { &self.binding }

    pub fn node_count(&self) -> usize { self.store.count() }

    pub fn constraint_count(&self) -> usize { self.store.constraints().len() }

    // --- Nodes ---

    /// Creates an input node. It must be bound with `fill_nodes` before evaluation.
    pub fn init(&mut self) -> NodeId {
        self.add_input(None)
    }

    pub fn init_labeled(&mut self, label: impl Into<String>) -> NodeId {
        self.add_input(Some(label.into()))
    }

    fn add_input(&mut self, label: Option<String>) -> NodeId {
        let id = self.store.add_node(NodeKind::Input, &[], NodeMetadata { label });
        tracing::debug!(node = %id, "added input");
        id
    }

    pub fn constant(&mut self, value: impl Into<Value>) -> NodeId {
        self.add_constant(value.into(), None)
    }

    pub fn constant_labeled(&mut self, value: impl Into<Value>, label: impl Into<String>) -> NodeId {
        self.add_constant(value.into(), Some(label.into()))
    }

    fn add_constant(&mut self, value: Value, label: Option<String>) -> NodeId {
        let id = self.store.add_node(NodeKind::Constant(value), &[], NodeMetadata { label });
        tracing::debug!(node = %id, %value, "added constant");
        id
    }

    // --- Operations ---

    /// Creates an operation node over `operands`.
    ///
    /// Fails with `Arity` if the operand count does not match the operator and
    /// with `UnknownNode` if an operand belongs to another graph. Validation
    /// happens before any literal is materialised, so a failed call leaves the
    /// graph untouched.
    pub fn apply(&mut self, op: Operator, operands: &[Operand]) -> Result<NodeId> {
        self.apply_inner(op, operands, None)
    }

    pub fn apply_labeled(&mut self, op: Operator, operands: &[Operand], label: impl Into<String>) -> Result<NodeId> {
        self.apply_inner(op, operands, Some(label.into()))
    }

    pub fn add(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> Result<NodeId> {
        self.apply(Operator::Add, &[a.into(), b.into()])
    }

    pub fn sub(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> Result<NodeId> {
        self.apply(Operator::Sub, &[a.into(), b.into()])
    }

    pub fn mul(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> Result<NodeId> {
        self.apply(Operator::Mul, &[a.into(), b.into()])
    }

    pub fn div(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> Result<NodeId> {
        self.apply(Operator::Div, &[a.into(), b.into()])
    }

    pub fn neg(&mut self, a: impl Into<Operand>) -> Result<NodeId> {
        self.apply(Operator::Neg, &[a.into()])
    }

    /// A boolean node that is true when both operands compare equal.
    pub fn equal(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> Result<NodeId> {
        self.apply(Operator::Equal, &[a.into(), b.into()])
    }

    /// Registers `func` as an operator over `operands` and returns its result node.
    ///
    /// The hint's arity is fixed to `operands.len()`. The returned node's
    /// operator can be reused through `apply` with the same operand count.
    pub fn hint<F>(&mut self, name: impl Into<String>, operands: &[Operand], func: F) -> Result<NodeId>
    where
        F: Fn(&[Value]) -> std::result::Result<Value, String> + 'static,
    {
        let name = name.into();
        if operands.is_empty() {
            return Err(GraphError::Arity { operator: name, expected: 1, actual: 0 });
        }
        self.check_operands(operands)?;

        let id = self.store.add_hint(name, operands.len(), Box::new(func));
        let op = Operator::Hint { id, arity: operands.len() as u32 };
        self.apply_inner(op, operands, None)
    }

    fn apply_inner(&mut self, op: Operator, operands: &[Operand], label: Option<String>) -> Result<NodeId> {
        let (op, expected) = match op {
            Operator::Hint { id, .. } => {
                let hint = self.store.get_hint(id).ok_or(GraphError::UnknownHint(id))?;
                (Operator::Hint { id, arity: hint.arity as u32 }, hint.arity)
            }
            other => (other, other.arity()),
        };
        if operands.len() != expected {
            return Err(GraphError::Arity {
                operator: self.store.operator_name(&op),
                expected,
                actual: operands.len(),
            });
        }
        self.check_operands(operands)?;

        let parents: SmallVec<[NodeId; 4]> = operands
            .iter()
            .map(|operand| match *operand {
                Operand::Node(id) => id,
                Operand::Literal(value) => self.add_constant(value, None),
            })
            .collect();

        let id = self.store.add_node(NodeKind::Operation(op), &parents, NodeMetadata { label });
        tracing::debug!(node = %id, op = %self.store.operator_name(&op), "added operation");
        Ok(id)
    }

    fn check_operands(&self, operands: &[Operand]) -> Result<()> {
        for operand in operands {
            if let Operand::Node(id) = *operand {
                self.ensure_known(id)?;
            }
        }
        Ok(())
    }

    fn ensure_known(&self, id: NodeId) -> Result<()> {
        if self.store.contains(id) {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(id))
        }
    }

    // --- Constraints ---

    /// Records that `node` must evaluate to `expected`. Nothing is evaluated now.
    pub fn assert_equal(&mut self, node: NodeId, expected: impl Into<Value>) -> Result<()> {
        self.push_constraint(node, Expected::Value(expected.into()), None)
    }

    pub fn assert_equal_labeled(
        &mut self,
        node: NodeId,
        expected: impl Into<Value>,
        label: impl Into<String>,
    ) -> Result<()> {
        self.push_constraint(node, Expected::Value(expected.into()), Some(label.into()))
    }

    /// Records that two nodes must evaluate to equal values.
    pub fn assert_nodes_equal(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        self.ensure_known(b)?;
        self.push_constraint(a, Expected::Node(b), None)
    }

    pub fn assert_nodes_equal_labeled(&mut self, a: NodeId, b: NodeId, label: impl Into<String>) -> Result<()> {
        self.ensure_known(b)?;
        self.push_constraint(a, Expected::Node(b), Some(label.into()))
    }

    fn push_constraint(&mut self, node: NodeId, expected: Expected, label: Option<String>) -> Result<()> {
        self.ensure_known(node)?;
        tracing::debug!(node = %node, expected = ?expected, "added constraint");
        self.store.add_constraint(Constraint { node, expected, label });
        Ok(())
    }

    // --- Binding ---

    /// Binds values to input nodes.
    ///
    /// Every key must be an input of this graph, otherwise nothing is bound and
    /// `UnknownNode` is returned. Binding an input again replaces its value.
    pub fn fill_nodes<I, V>(&mut self, inputs: I) -> Result<()>
    where
        I: IntoIterator<Item = (NodeId, V)>,
        V: Into<Value>,
    {
        let staged: Vec<(NodeId, Value)> = inputs.into_iter().map(|(id, v)| (id, v.into())).collect();
        for (id, _) in &staged {
            match self.store.node(*id) {
                Some(node) if node.is_input() => {}
                _ => return Err(GraphError::UnknownNode(*id)),
            }
        }
        for (id, value) in staged {
            if let Some(previous) = self.binding.insert(id, value) {
                tracing::debug!(node = %id, %previous, %value, "rebound input");
            }
        }
        Ok(())
    }

    // --- Evaluation ---

    /// Computes every node of the graph. All inputs must be bound.
    pub fn evaluate(&self) -> Result<EvaluationResult> {
        let targets: Vec<NodeId> = self.store.node_ids().collect();
        self.require_bound(&targets)?;
        Evaluator::new(&self.store, &self.config).evaluate(&self.binding)
    }

    /// Evaluates everything the constraints depend on and checks them all.
    ///
    /// Fails with `UnboundInput` naming the earliest-created unbound input that
    /// some constraint depends on. On failure no partial report is produced.
    pub fn check_constraints(&self) -> Result<ConstraintReport> {
        let targets = self.constraint_targets();
        self.require_bound(&targets)?;

        let result = Evaluator::new(&self.store, &self.config).evaluate_targets(&targets, &self.binding)?;
        let report = ConstraintChecker::new(&self.store, self.config.tolerance).check(&result)?;
        tracing::debug!(
            constraints = report.len(),
            satisfied = report.is_satisfied(),
            "checked constraints"
        );
        Ok(report)
    }

    fn constraint_targets(&self) -> Vec<NodeId> {
        self.store.constraints().iter().flat_map(Constraint::targets).collect()
    }

    fn require_bound(&self, targets: &[NodeId]) -> Result<()> {
        let upstream = topology::upstream_from(&self.store, targets);
        match self.store.inputs().find(|id| upstream.contains(id) && !self.binding.contains_key(id)) {
            Some(node) => Err(GraphError::UnboundInput { node, label: self.store.display_name(node) }),
            None => Ok(()),
        }
    }

    // --- Inspection ---

    /// Nodes that consume `node` directly, in creation order.
    pub fn dependents(&self, node: NodeId) -> Result<Vec<NodeId>> {
        self.ensure_known(node)?;
        Ok(self.store.get_children(node))
    }

    /// Text audit trace of `node`.
    ///
    /// Values are shown where the current binding allows. If `node` itself
    /// cannot be evaluated the trace is still produced and names the error.
    pub fn trace(&self, node: NodeId) -> Result<String> {
        self.ensure_known(node)?;
        let mut targets = vec![node];
        targets.extend(self.constraint_targets());

        let evaluator = Evaluator::new(&self.store, &self.config);
        let result = evaluator.evaluate_targets(&targets, &self.binding).or_else(|e| {
            tracing::debug!(error = %e, "constraint values unavailable for trace");
            evaluator.evaluate_targets(&[node], &self.binding)
        });
        if let Err(e) = &result {
            tracing::debug!(error = %e, "tracing without values");
        }

        Ok(format_trace(&self.store, result.as_ref(), &self.config.tolerance, node))
    }

    /// Read-only export for visualizers.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::capture(&self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Operator::Add, 2)]
    #[case(Operator::Sub, 2)]
    #[case(Operator::Mul, 2)]
    #[case(Operator::Div, 2)]
    #[case(Operator::Equal, 2)]
    #[case(Operator::Neg, 1)]
    fn test_arity_is_enforced(#[case] op: Operator, #[case] arity: usize) {
        let mut builder = Builder::new();
        let x = builder.init();

        for count in 0..=3 {
            let before = builder.node_count();
            let operands = vec![Operand::Node(x); count];
            let result = builder.apply(op, &operands);
            if count == arity {
                assert!(result.is_ok());
                assert_eq!(builder.node_count(), before + 1);
            } else {
                assert_eq!(
                    result.unwrap_err(),
                    GraphError::Arity { operator: op.symbol().into(), expected: arity, actual: count }
                );
                assert_eq!(builder.node_count(), before);
            }
        }
    }

    #[test]
    fn test_failed_call_does_not_materialise_literals() {
        let mut other = Builder::new();
        let foreign = other.init();

        let mut builder = Builder::new();
        let _x = builder.init();
        let err = builder.add(5, foreign).unwrap_err();

        assert_eq!(err, GraphError::UnknownNode(foreign));
        assert_eq!(builder.node_count(), 1);
    }

    #[test]
    fn test_literals_become_constants() {
        let mut builder = Builder::new();
        let x = builder.init();
        let sum = builder.add(x, 5).unwrap();

        let node = builder.graph().node(sum).unwrap();
        let five = node.dependencies()[1];
        assert_eq!(builder.graph().node(five).unwrap().value(), Some(Value::Int(5)));
        assert_eq!(builder.dependents(x).unwrap(), vec![sum]);
    }

    #[test]
    fn test_hint_arity_is_fixed_at_registration() {
        let mut builder = Builder::new();
        let a = builder.init();
        let b = builder.init();
        let first = builder
            .hint("max", &[a.into(), b.into()], |args| {
                let x = args[0].as_f64().ok_or("not a number")?;
                let y = args[1].as_f64().ok_or("not a number")?;
                Ok(Value::Float(x.max(y)))
            })
            .unwrap();

        let op = builder.graph().node(first).unwrap().operator().unwrap();
        assert_eq!(op.arity(), 2);
        assert!(builder.apply(op, &[a.into(), 1.5.into()]).is_ok());
        assert_eq!(
            builder.apply(op, &[a.into()]).unwrap_err(),
            GraphError::Arity { operator: "max".into(), expected: 2, actual: 1 }
        );
        assert!(matches!(
            builder.hint("nothing", &[], |_| Ok(Value::Int(0))),
            Err(GraphError::Arity { expected: 1, actual: 0, .. })
        ));
    }

    #[test]
    fn test_hint_from_another_builder_is_rejected() {
        let mut other = Builder::new();
        let y = other.init();
        let node = other.hint("id", &[y.into()], |args| Ok(args[0])).unwrap();
        let op = other.graph().node(node).unwrap().operator().unwrap();

        let mut builder = Builder::new();
        let x = builder.init();
        assert!(matches!(builder.apply(op, &[x.into()]), Err(GraphError::UnknownHint(_))));
    }

    #[test]
    fn test_fill_nodes_rejects_non_inputs_atomically() {
        let mut builder = Builder::new();
        let x = builder.init();
        let one = builder.constant(1);

        let err = builder.fill_nodes([(x, 3), (one, 2)]).unwrap_err();
        assert_eq!(err, GraphError::UnknownNode(one));
        assert!(builder.binding().is_empty());
    }

    #[test]
    fn test_unbound_input_reported_in_creation_order() {
        let mut builder = Builder::new();
        let a = builder.init_labeled("a");
        let b = builder.init_labeled("b");
        let unused = builder.init_labeled("unused");
        let sum = builder.add(b, a).unwrap();
        builder.assert_equal(sum, 3).unwrap();

        let err = builder.check_constraints().unwrap_err();
        assert_eq!(err, GraphError::UnboundInput { node: a, label: "a".into() });

        builder.fill_nodes([(a, 1), (b, 2)]).unwrap();
        assert!(builder.check_constraints().unwrap().is_satisfied());

        // `evaluate` covers the whole graph, so the unused input now matters.
        assert_eq!(
            builder.evaluate().unwrap_err(),
            GraphError::UnboundInput { node: unused, label: "unused".into() }
        );
    }

    #[test]
    fn test_trace_uses_current_binding() {
        let mut builder = Builder::new();
        let x = builder.init_labeled("x");
        let sum = builder.add(x, 1).unwrap();
        builder.assert_equal(sum, 2).unwrap();

        let text = builder.trace(sum).unwrap();
        assert!(text.contains("x[?] -> Input"), "{text}");
        assert!(text.contains("(values unavailable: Input 'x' (n0) is unbound)"), "{text}");

        builder.fill_nodes([(x, 1)]).unwrap();
        let text = builder.trace(sum).unwrap();
        assert!(text.contains("[L1] n2[2] = x[1] + 1[1]"), "{text}");
        assert!(text.contains("[ok]"), "{text}");
        assert!(!text.contains("values unavailable"));
    }

    #[test]
    fn test_trace_names_the_evaluation_error() {
        let mut builder = Builder::new();
        let x = builder.init_labeled("x");
        let quotient = builder.div(x, 0).unwrap();

        builder.fill_nodes([(x, 1)]).unwrap();
        let text = builder.trace(quotient).unwrap();
        assert!(text.contains("(values unavailable: Division by zero at node 'n2' (n2))"), "{text}");
    }
}
