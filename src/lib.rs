//! Computation graphs with deferred constraint checking.
//!
//! A [`Builder`] records inputs, constants and operations as an append-only
//! DAG, together with equality assertions on its nodes. Binding input values
//! and calling [`Builder::check_constraints`] evaluates everything the
//! assertions depend on, each node exactly once, and reports every outcome.
//!
//! ```
//! use constraint_graph::Builder;
//!
//! let mut builder = Builder::new();
//! let x = builder.init();
//! let y = builder.add(x, 1).unwrap();
//! builder.assert_equal(y, 2).unwrap();
//!
//! builder.fill_nodes([(x, 1)]).unwrap();
//! assert!(builder.check_constraints().unwrap().is_satisfied());
//! ```

pub mod analysis;
pub mod builder;
pub mod compute;
pub mod config;
pub mod display;
pub mod error;
pub mod store;
pub mod validation;

pub use builder::{Builder, Operand};
pub use compute::{Binding, EvaluationResult};
pub use config::{EvalConfig, Tolerance};
pub use display::GraphSnapshot;
pub use error::{GraphError, Result};
pub use store::{Expected, HintId, NodeId, NodeKind, Operator, Value};
pub use validation::{ConstraintOutcome, ConstraintReport};
