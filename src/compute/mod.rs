//! Evaluates the computation graph.
pub mod engine;
pub mod kernel;
pub mod ledger;

pub use engine::Evaluator;
pub use ledger::{Binding, EvaluationResult};
