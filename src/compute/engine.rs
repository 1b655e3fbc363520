//! A synchronous, single-threaded evaluator.
use crate::analysis::topology;
use crate::compute::kernel::{self, Fault};
use crate::compute::ledger::{Binding, EvaluationResult};
use crate::config::EvalConfig;
use crate::error::GraphError;
use crate::store::{GraphStore, NodeId, NodeKind, Operator, Value};
use smallvec::SmallVec;

pub struct Evaluator<'a> {
    store: &'a GraphStore,
    config: &'a EvalConfig,
}

impl<'a> Evaluator<'a> {
    pub fn new(store: &'a GraphStore, config: &'a EvalConfig) -> Self {
        Self { store, config }
    }

    /// Computes a value for every node in the graph.
    pub fn evaluate(&self, binding: &Binding) -> Result<EvaluationResult, GraphError> {
        let order = topology::sort(self.store)?;
        self.run(&order, binding)
    }

    /// Computes `targets` and everything they depend on, nothing else.
    pub fn evaluate_targets(
        &self,
        targets: &[NodeId],
        binding: &Binding,
    ) -> Result<EvaluationResult, GraphError> {
        if let Some(&foreign) = targets.iter().find(|id| !self.store.contains(**id)) {
            return Err(GraphError::UnknownNode(foreign));
        }
        let order = topology::sort_from(self.store, targets.iter().copied())?;
        self.run(&order, binding)
    }

    /// Walks a topological order once. Parents always precede their consumers,
    /// so every operand is already in the result when a node is reached.
    fn run(&self, order: &[NodeId], binding: &Binding) -> Result<EvaluationResult, GraphError> {
        tracing::debug!(nodes = order.len(), "evaluating graph");
        let mut result = EvaluationResult::new(self.store.graph_id(), self.store.count());

        for &node_id in order {
            let value = self.evaluate_node(node_id, &result, binding)?;
            tracing::trace!(node = %node_id, %value, "computed");
            result.insert(node_id, value);
        }

        Ok(result)
    }

    fn evaluate_node(
        &self,
        node_id: NodeId,
        result: &EvaluationResult,
        binding: &Binding,
    ) -> Result<Value, GraphError> {
        match &self.store.kinds[node_id.index()] {
            NodeKind::Input => binding.get(&node_id).copied().ok_or_else(|| GraphError::UnboundInput {
                node: node_id,
                label: self.store.display_name(node_id),
            }),
            NodeKind::Constant(value) => Ok(*value),
            NodeKind::Operation(op) => {
                let parents = self.store.get_parents(node_id);
                let mut args: SmallVec<[Value; 4]> = SmallVec::with_capacity(parents.len());
                for &pid in parents {
                    args.push(result.get(pid).ok_or(GraphError::NotEvaluated(pid))?);
                }
                self.apply(node_id, *op, parents, &args)
            }
        }
    }

    fn apply(
        &self,
        node_id: NodeId,
        op: Operator,
        parents: &[NodeId],
        args: &[Value],
    ) -> Result<Value, GraphError> {
        if let Operator::Hint { id, .. } = op {
            let hint = self.store.hint(id);
            return hint.call(args).map_err(|message| GraphError::Hint {
                node: node_id,
                name: hint.name.clone(),
                message,
            });
        }

        kernel::execute_instruction(op, args, &self.config.tolerance).map_err(|fault| match fault {
            Fault::Arity { expected, actual } => GraphError::Arity {
                operator: op.symbol().to_string(),
                expected,
                actual,
            },
            Fault::TypeMismatch { positions } => GraphError::TypeMismatch {
                operator: op.symbol().to_string(),
                operands: positions.into_iter().map(|i| parents[i]).collect(),
            },
            Fault::DivisionByZero => GraphError::DivisionByZero {
                node: node_id,
                label: self.store.display_name(node_id),
            },
            Fault::Overflow => GraphError::Overflow {
                node: node_id,
                label: self.store.display_name(node_id),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NodeMetadata;
    use std::cell::Cell;
    use std::rc::Rc;

    fn meta(label: &str) -> NodeMetadata {
        NodeMetadata { label: Some(label.into()) }
    }

    fn op(o: Operator) -> NodeKind { NodeKind::Operation(o) }

    #[test]
    fn test_diamond_is_computed_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();

        let mut store = GraphStore::new();
        let x = store.add_node(NodeKind::Input, &[], meta("x"));
        let hint = store.add_hint(
            "double".into(),
            1,
            Box::new(move |args: &[Value]| {
                counter.set(counter.get() + 1);
                match args[0] {
                    Value::Int(i) => Ok(Value::Int(i * 2)),
                    other => Err(format!("unsupported {}", other.type_name())),
                }
            }),
        );
        let shared = store.add_node(op(Operator::Hint { id: hint, arity: 1 }), &[x], meta("2x"));
        let left = store.add_node(op(Operator::Neg), &[shared], meta("-2x"));
        let right = store.add_node(op(Operator::Mul), &[shared, shared], meta("4x^2"));
        let top = store.add_node(op(Operator::Add), &[left, right], meta("top"));

        let config = EvalConfig::default();
        let binding = Binding::from([(x, Value::Int(3))]);
        let result = Evaluator::new(&store, &config).evaluate(&binding).unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(result[top], Value::Int(30));
        assert_eq!(result.len(), 5);
    }

    #[test]
    fn test_targets_limit_the_evaluated_set() {
        let mut store = GraphStore::new();
        let x = store.add_node(NodeKind::Input, &[], meta("x"));
        let y = store.add_node(NodeKind::Input, &[], meta("y"));
        let neg_x = store.add_node(op(Operator::Neg), &[x], meta("-x"));
        let neg_y = store.add_node(op(Operator::Neg), &[y], meta("-y"));

        let config = EvalConfig::default();
        // `y` is unbound, but only `-x` is requested.
        let binding = Binding::from([(x, Value::Int(4))]);
        let result = Evaluator::new(&store, &config).evaluate_targets(&[neg_x], &binding).unwrap();

        assert_eq!(result.get(neg_x), Some(Value::Int(-4)));
        assert_eq!(result.get(neg_y), None);
    }

    #[test]
    fn test_unbound_input_is_named() {
        let mut store = GraphStore::new();
        let x = store.add_node(NodeKind::Input, &[], meta("x"));
        let _ = store.add_node(op(Operator::Neg), &[x], meta("-x"));

        let config = EvalConfig::default();
        let err = Evaluator::new(&store, &config).evaluate(&Binding::new()).unwrap_err();
        assert_eq!(err, GraphError::UnboundInput { node: x, label: "x".into() });
    }

    #[test]
    fn test_type_mismatch_names_offending_operands() {
        let mut store = GraphStore::new();
        let one = store.add_node(NodeKind::Constant(Value::Int(1)), &[], meta("1"));
        let flag = store.add_node(NodeKind::Constant(Value::Bool(true)), &[], meta("flag"));
        let _ = store.add_node(op(Operator::Mul), &[one, flag], meta("bad"));

        let config = EvalConfig::default();
        let err = Evaluator::new(&store, &config).evaluate(&Binding::new()).unwrap_err();
        assert_eq!(err, GraphError::TypeMismatch { operator: "*".into(), operands: vec![flag] });
    }

    #[test]
    fn test_hint_failure_is_reported_with_its_name() {
        let mut store = GraphStore::new();
        let x = store.add_node(NodeKind::Constant(Value::Float(-1.0)), &[], meta("x"));
        let hint = store.add_hint(
            "sqrt".into(),
            1,
            Box::new(|args: &[Value]| match args[0].as_f64() {
                Some(v) if v >= 0.0 => Ok(Value::Float(v.sqrt())),
                _ => Err("negative operand".to_string()),
            }),
        );
        let root = store.add_node(op(Operator::Hint { id: hint, arity: 1 }), &[x], meta("root"));

        let config = EvalConfig::default();
        let err = Evaluator::new(&store, &config).evaluate(&Binding::new()).unwrap_err();
        assert_eq!(
            err,
            GraphError::Hint { node: root, name: "sqrt".into(), message: "negative operand".into() }
        );
        assert_eq!(hint.index(), 0);
    }

    #[test]
    fn test_injected_cycle_fails_evaluation() {
        let mut store = GraphStore::new();
        let x = store.add_node(NodeKind::Input, &[], meta("x"));
        let a = store.add_node(op(Operator::Neg), &[x], meta("a"));
        let b = store.add_node(op(Operator::Neg), &[a], meta("b"));

        // Rewire `a` to depend on `b`, closing a -> b -> a.
        store.parents_flat.push(b);
        let start = (store.parents_flat.len() - 1) as u32;
        store.parents_ranges[a.index()] = (start, 1);

        let config = EvalConfig::default();
        let binding = Binding::from([(x, Value::Int(1))]);
        let err = Evaluator::new(&store, &config).evaluate(&binding).unwrap_err();
        assert!(matches!(err, GraphError::Cycle(id) if id == a || id == b), "{err}");
    }
}
