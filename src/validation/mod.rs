//! Constraint checking over a finished evaluation.
pub mod checker;
pub mod report;

pub use checker::ConstraintChecker;
pub use report::{ConstraintOutcome, ConstraintReport};
