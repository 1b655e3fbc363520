//! Plain data describing graph vertices. Nodes carry no logic beyond identity
//! and metadata; construction is validated by the `Builder`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Identity of one `GraphStore`. Lets a store reject ids minted by another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphId(u32);

impl GraphId {
    /// Allocates an id that no other store in this process has used.
    pub(crate) fn fresh() -> Self {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Opaque handle to a node. Assigned once by the owning graph, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    graph: GraphId,
    index: u32,
}

impl NodeId {
    pub(crate) fn new(graph: GraphId, idx: usize) -> Self {
        Self { graph, index: idx as u32 }
    }

    /// Position of the node in creation order.
    #[inline(always)]
    pub fn index(&self) -> usize { self.index as usize }

    pub fn graph(&self) -> GraphId { self.graph }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.index)
    }
}

/// Handle into the hint table of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HintId {
    graph: GraphId,
    index: u32,
}

impl HintId {
    pub(crate) fn new(graph: GraphId, idx: usize) -> Self {
        Self { graph, index: idx as u32 }
    }

    #[inline(always)]
    pub fn index(&self) -> usize { self.index as usize }

    pub fn graph(&self) -> GraphId { self.graph }
}

/// A concrete node value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Value {
    /// Numeric view of the value. `None` for booleans.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Bool(_) => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self { Value::Int(v) }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self { Value::Int(v as i64) }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self { Value::Float(v) }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self { Value::Bool(v) }
}

/// The calculation performed by an operation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    /// True division; always yields a float.
    Div,
    Neg,
    /// Compares its two operands and yields a boolean.
    Equal,
    /// Client-supplied function. The arity is fixed when the hint is registered.
    Hint { id: HintId, arity: u32 },
}

impl Operator {
    pub fn arity(&self) -> usize {
        match self {
            Operator::Add | Operator::Sub | Operator::Mul | Operator::Div | Operator::Equal => 2,
            Operator::Neg => 1,
            Operator::Hint { arity, .. } => *arity as usize,
        }
    }

    /// Short tag used in errors, traces and exports.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Neg => "neg",
            Operator::Equal => "==",
            Operator::Hint { .. } => "hint",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Free variable; receives its value from a binding.
    Input,
    Constant(Value),
    Operation(Operator),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Human-readable label. Not required to be unique.
    pub label: Option<String>,
}

/// What a constraint's node is compared against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expected {
    Value(Value),
    /// The computed value of another node in the same graph.
    Node(NodeId),
}

/// An equality assertion, checked only on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub node: NodeId,
    pub expected: Expected,
    pub label: Option<String>,
}

impl Constraint {
    /// Every node whose value is needed to check this constraint.
    pub fn targets(&self) -> impl Iterator<Item = NodeId> {
        let other = match self.expected {
            Expected::Node(id) => Some(id),
            Expected::Value(_) => None,
        };
        std::iter::once(self.node).chain(other)
    }
}

/// Read-only view of a single node inside a store.
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    pub(crate) id: NodeId,
    pub(crate) kind: &'a NodeKind,
    pub(crate) dependencies: &'a [NodeId],
    pub(crate) meta: &'a NodeMetadata,
}

impl<'a> Node<'a> {
    pub fn id(&self) -> NodeId { self.id }
    pub fn kind(&self) -> &'a NodeKind { self.kind }

    /// Ordered operands. Empty for inputs and constants.
    pub fn dependencies(&self) -> &'a [NodeId] { self.dependencies }

    pub fn value(&self) -> Option<Value> {
        match self.kind {
            NodeKind::Constant(v) => Some(*v),
            _ => None,
        }
    }

    pub fn operator(&self) -> Option<Operator> {
        match self.kind {
            NodeKind::Operation(op) => Some(*op),
            _ => None,
        }
    }

    pub fn label(&self) -> Option<&'a str> { self.meta.label.as_deref() }

    pub fn is_input(&self) -> bool { matches!(self.kind, NodeKind::Input) }
}
