use crate::analysis::topology;
use crate::compute::kernel::values_equal;
use crate::compute::EvaluationResult;
use crate::config::Tolerance;
use crate::error::GraphError;
use crate::store::{Expected, GraphStore, NodeId, NodeKind, Operator, Value};
use std::collections::HashMap;
use std::fmt::Write;

/// Levels printed below the target before a branch is cut off.
pub const MAX_TRACE_DEPTH: usize = 64;

/// Renders the derivation of `target` as an indented text tree.
///
/// Values come from `values` when evaluation succeeded. Otherwise the error is
/// shown under the header and every value prints as `[?]`. Constraints on
/// `target` or on anything derived from it are listed last.
pub fn format_trace(
    store: &GraphStore,
    values: Result<&EvaluationResult, &GraphError>,
    tolerance: &Tolerance,
    target: NodeId,
) -> String {
    let mut tracer = Tracer {
        store,
        result: values.ok(),
        tolerance,
        visited_at_level: HashMap::new(),
        output: String::new(),
    };

    if store.contains(target) {
        let name = store.display_name(target);
        let _ = writeln!(tracer.output, "AUDIT TRACE for node '{}':", name);
        if let Err(e) = values {
            let _ = writeln!(tracer.output, "(values unavailable: {})", e);
        }
        let _ = writeln!(tracer.output, "--------------------------------------------------");
        tracer.trace_tree(target);
        tracer.print_constraints(target);
    } else {
        let _ = writeln!(tracer.output, "Error: Invalid Node ID {}", target);
    }
    tracer.output
}

struct Tracer<'a> {
    store: &'a GraphStore,
    result: Option<&'a EvaluationResult>,
    tolerance: &'a Tolerance,
    visited_at_level: HashMap<NodeId, usize>,
    output: String,
}

impl<'a> Tracer<'a> {
    /// Depth-first, operands in order. Uses an explicit stack so deep chains
    /// cannot exhaust the thread stack.
    fn trace_tree(&mut self, target: NodeId) {
        let store = self.store;
        let mut stack: Vec<(NodeId, usize, String)> = vec![(target, 1, String::new())];

        while let Some((node_id, level, prefix)) = stack.pop() {
            let name = store.display_name(node_id);
            if let Some(&first_seen) = self.visited_at_level.get(&node_id) {
                let _ = writeln!(self.output, "{}{} -> (Ref to L{})", prefix, name, first_seen);
                continue;
            }
            if level > MAX_TRACE_DEPTH {
                let _ = writeln!(self.output, "{}{} -> ... (deeper levels omitted)", prefix, name);
                continue;
            }
            self.visited_at_level.insert(node_id, level);

            let line_header = format!("[L{}] {}{}", level, name, self.format_value(node_id));

            match &store.kinds[node_id.index()] {
                NodeKind::Input => {
                    let _ = writeln!(self.output, "{}{} -> Input", prefix, line_header);
                }
                NodeKind::Constant(_) => {
                    let _ = writeln!(self.output, "{}{} -> Const", prefix, line_header);
                }
                NodeKind::Operation(op) => {
                    let parents = store.get_parents(node_id);
                    let formula_str = self.format_formula(op, parents);
                    let _ = writeln!(self.output, "{}{} = {}", prefix, line_header, formula_str);

                    let stem = self.build_child_stem(&prefix);
                    // Reversed so the first operand is popped first.
                    for (i, &child) in parents.iter().enumerate().rev() {
                        let connector = if i == parents.len() - 1 { "`--" } else { "|--" };
                        stack.push((child, level + 1, format!("{}{}", stem, connector)));
                    }
                }
            }
        }
    }

    fn print_constraints(&mut self, target: NodeId) {
        let downstream = topology::downstream_from(self.store, &[target]);
        let relevant: Vec<_> = self
            .store
            .constraints()
            .iter()
            .filter(|c| c.targets().any(|id| downstream.contains(&id)))
            .collect();
        if relevant.is_empty() {
            return;
        }

        let _ = writeln!(self.output, "|");
        let _ = writeln!(self.output, "`-- Constraints:");
        for (i, constraint) in relevant.iter().enumerate() {
            let connector = if i == relevant.len() - 1 { "`--" } else { "|--" };
            let computed = self.value_of(constraint.node);
            let (expected, expected_name) = match constraint.expected {
                Expected::Value(v) => (Some(v), v.to_string()),
                Expected::Node(other) => (self.value_of(other), self.store.display_name(other)),
            };
            let status = match (computed, expected) {
                (Some(c), Some(e)) if values_equal(&c, &e, self.tolerance) => "ok",
                (Some(_), Some(_)) => "FAILED",
                _ => "?",
            };
            let name = constraint.label.clone().unwrap_or_else(|| {
                format!("{} == {}", self.store.display_name(constraint.node), expected_name)
            });
            let _ = writeln!(
                self.output,
                "   {} {}: {}{} vs {}{} [{}]",
                connector,
                name,
                self.store.display_name(constraint.node),
                self.format_value(constraint.node),
                expected_name,
                Self::format_optional(expected),
                status
            );
        }
    }

    fn format_formula(&self, op: &Operator, parents: &[NodeId]) -> String {
        let refs: Vec<String> = parents.iter().map(|&p| self.format_parent_ref(p)).collect();
        match op {
            Operator::Neg if refs.len() == 1 => format!("-{}", refs[0]),
            Operator::Hint { .. } => format!("{}({})", self.store.operator_name(op), refs.join(", ")),
            _ if refs.len() == 2 => format!("{} {} {}", refs[0], op.symbol(), refs[1]),
            _ => op.symbol().to_string(),
        }
    }

    fn format_parent_ref(&self, id: NodeId) -> String {
        format!("{}{}", self.store.display_name(id), self.format_value(id))
    }

    fn value_of(&self, id: NodeId) -> Option<Value> {
        self.result.and_then(|r| r.get(id))
    }

    fn format_value(&self, id: NodeId) -> String {
        Self::format_optional(self.value_of(id))
    }

    fn format_optional(value: Option<Value>) -> String {
        match value {
            Some(v) => format!("[{}]", v),
            None => "[?]".to_string(),
        }
    }

    fn build_child_stem(&self, current_prefix: &str) -> String {
        current_prefix.replace("`--", "   ").replace("|--", "|  ")
    }
}
