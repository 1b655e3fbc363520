//! Node model and the arena that owns it.
pub mod registry;
pub mod types;

pub use registry::{GraphStore, Hint, HintFn};
pub use types::{
    Constraint, Expected, GraphId, HintId, Node, NodeId, NodeKind, NodeMetadata, Operator, Value,
};
