//! Structural algorithms over the graph store.
pub mod topology;
