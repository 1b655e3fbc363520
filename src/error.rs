//! Errors raised by graph construction, evaluation and constraint checking.

use crate::store::{HintId, NodeId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Operator '{operator}' expects {expected} operand(s), got {actual}")]
    Arity { operator: String, expected: usize, actual: usize },

    /// The id was not produced by this graph, or is not a node of the kind the call requires.
    #[error("Node {0} is not a valid node of this graph for this call")]
    UnknownNode(NodeId),

    #[error("Hint {0:?} was not registered with this graph")]
    UnknownHint(HintId),

    #[error("Input '{label}' ({node}) is unbound")]
    UnboundInput { node: NodeId, label: String },

    #[error("Cycle detected involving node {0}")]
    Cycle(NodeId),

    #[error("Operator '{operator}' cannot be applied to operand(s) {operands:?}")]
    TypeMismatch { operator: String, operands: Vec<NodeId> },

    #[error("Division by zero at node '{label}' ({node})")]
    DivisionByZero { node: NodeId, label: String },

    #[error("Integer overflow at node '{label}' ({node})")]
    Overflow { node: NodeId, label: String },

    #[error("Hint '{name}' failed at node {node}: {message}")]
    Hint { node: NodeId, name: String, message: String },

    #[error("Node {0} has no computed value")]
    NotEvaluated(NodeId),
}

pub type Result<T, E = GraphError> = std::result::Result<T, E>;
