//! Read-only snapshot of a graph for external renderers.
//!
//! The snapshot carries everything needed to lay out and label a diagram:
//! nodes with kind, label and operator tag, the full edge list and the
//! constraints. Producing an image from it is left to the caller.

use crate::store::{Expected, GraphStore, NodeKind, Value};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    Input,
    Constant,
    Operation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotNode {
    /// Creation index; also the position in `GraphSnapshot::nodes`.
    pub id: usize,
    pub kind: SnapshotKind,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Ordered operand ids.
    pub dependencies: Vec<usize>,
}

/// A dependency edge, pointing from operand to consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotEdge {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotConstraint {
    pub node: usize,
    pub expected: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_node: Option<usize>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<SnapshotNode>,
    pub edges: Vec<SnapshotEdge>,
    pub constraints: Vec<SnapshotConstraint>,
}

impl GraphSnapshot {
    pub fn capture(store: &GraphStore) -> Self {
        let mut nodes = Vec::with_capacity(store.count());
        let mut edges = Vec::new();

        for id in store.node_ids() {
            let kind = &store.kinds[id.index()];
            let (snapshot_kind, operator, value) = match kind {
                NodeKind::Input => (SnapshotKind::Input, None, None),
                NodeKind::Constant(v) => (SnapshotKind::Constant, None, Some(*v)),
                NodeKind::Operation(op) => (SnapshotKind::Operation, Some(store.operator_name(op)), None),
            };
            let dependencies: Vec<usize> = store.get_parents(id).iter().map(|p| p.index()).collect();
            edges.extend(dependencies.iter().map(|&from| SnapshotEdge { from, to: id.index() }));
            nodes.push(SnapshotNode {
                id: id.index(),
                kind: snapshot_kind,
                label: store.display_name(id),
                operator,
                value,
                dependencies,
            });
        }

        let constraints = store
            .constraints()
            .iter()
            .map(|c| {
                let (expected, expected_node) = match c.expected {
                    Expected::Value(v) => (v.to_string(), None),
                    Expected::Node(other) => (store.display_name(other), Some(other.index())),
                };
                SnapshotConstraint { node: c.node.index(), expected, expected_node, label: c.label.clone() }
            })
            .collect();

        Self { nodes, edges, constraints }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Graphviz DOT text. Operation nodes are labelled with their operator tag.
    pub fn to_dot(&self) -> String {
        let mut graph: DiGraph<String, &'static str> = DiGraph::with_capacity(self.nodes.len(), self.edges.len());
        for node in &self.nodes {
            let text = match &node.operator {
                Some(op) if op != &node.label => format!("{} ({})", node.label, op),
                _ => node.label.clone(),
            };
            graph.add_node(text);
        }
        for edge in &self.edges {
            graph.add_edge(NodeIndex::new(edge.from), NodeIndex::new(edge.to), "");
        }
        format!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Constraint, NodeMetadata, Operator};

    fn sample() -> GraphStore {
        let mut store = GraphStore::new();
        let x = store.add_node(NodeKind::Input, &[], NodeMetadata { label: Some("x".into()) });
        let one = store.add_node(NodeKind::Constant(Value::Int(1)), &[], NodeMetadata::default());
        let sum = store.add_node(NodeKind::Operation(Operator::Add), &[x, one], NodeMetadata::default());
        store.add_constraint(Constraint { node: sum, expected: Expected::Value(Value::Int(2)), label: None });
        store
    }

    #[test]
    fn test_snapshot_lists_nodes_edges_and_constraints() {
        let snapshot = GraphSnapshot::capture(&sample());

        assert_eq!(snapshot.nodes.len(), 3);
        assert_eq!(snapshot.nodes[1].kind, SnapshotKind::Constant);
        assert_eq!(snapshot.nodes[2].operator.as_deref(), Some("+"));
        assert_eq!(snapshot.nodes[2].dependencies, vec![0, 1]);
        assert_eq!(snapshot.edges, vec![SnapshotEdge { from: 0, to: 2 }, SnapshotEdge { from: 1, to: 2 }]);
        assert_eq!(snapshot.constraints[0].expected, "2");
    }

    #[test]
    fn test_json_export_is_tagged_in_snake_case() {
        let json = GraphSnapshot::capture(&sample()).to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["nodes"][0]["kind"], "input");
        assert_eq!(parsed["nodes"][1]["value"]["Int"], 1);
        assert!(parsed["nodes"][0].get("operator").is_none());
    }

    #[test]
    fn test_dot_export_contains_every_node_and_edge() {
        let dot = GraphSnapshot::capture(&sample()).to_dot();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("label = \"x\""));
        assert!(dot.contains("label = \"n2 (+)\""));
        assert!(dot.contains("0 -> 2"));
        assert!(dot.contains("1 -> 2"));
    }
}
