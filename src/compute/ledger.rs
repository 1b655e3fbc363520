//! ledger.rs
//! Per-evaluation storage of computed node values.

use crate::store::{GraphId, NodeId, Value};
use serde::Serialize;
use std::collections::BTreeMap;

/// Client-supplied values for input nodes.
pub type Binding = BTreeMap<NodeId, Value>;

/// Values computed by one evaluation, indexed by node.
///
/// Fresh for every evaluation and never retained by the graph. Each slot is
/// written once, which is what makes a diamond dependency cost one computation.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    #[serde(skip)]
    graph: GraphId,
    values: Vec<Option<Value>>,
}

impl EvaluationResult {
    pub(crate) fn new(graph: GraphId, node_count: usize) -> Self {
        Self { graph, values: vec![None; node_count] }
    }

    pub fn get(&self, node_id: NodeId) -> Option<Value> {
        if node_id.graph() != self.graph {
            return None;
        }
        self.values.get(node_id.index()).copied().flatten()
    }

    pub(crate) fn insert(&mut self, node_id: NodeId, value: Value) {
        let idx = node_id.index();
        if idx >= self.values.len() {
            self.values.resize(idx + 1, None);
        }
        self.values[idx] = Some(value);
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.get(node_id).is_some()
    }

    /// Number of nodes that received a value.
    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Computed values in node creation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Value)> + '_ {
        let graph = self.graph;
        self.values
            .iter()
            .enumerate()
            .filter_map(move |(i, v)| v.map(|v| (NodeId::new(graph, i), v)))
    }
}

impl std::ops::Index<NodeId> for EvaluationResult {
    type Output = Value;

    fn index(&self, node_id: NodeId) -> &Value {
        match self.values.get(node_id.index()) {
            Some(Some(v)) if node_id.graph() == self.graph => v,
            _ => panic!("node {} has no computed value", node_id),
        }
    }
}
