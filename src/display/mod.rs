//! Text views of a graph: audit traces and renderer snapshots.
pub mod export;
pub mod trace;

pub use export::{GraphSnapshot, SnapshotConstraint, SnapshotEdge, SnapshotKind, SnapshotNode};
pub use trace::format_trace;
