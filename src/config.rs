//! Evaluation settings carried by a `Builder`.

use serde::{Deserialize, Serialize};

/// Float comparison used by `Equal` nodes and the constraint checker.
///
/// Integer and boolean pairs always compare exactly. Any pair involving a
/// float is considered equal when
/// `|a - b| <= max(relative * max(|a|, |b|), absolute)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub relative: f64,
    pub absolute: f64,
}

impl Tolerance {
    /// Bitwise-value equality for floats, no slack at all.
    pub fn exact() -> Self {
        Self { relative: 0.0, absolute: 0.0 }
    }

    pub fn is_close(&self, a: f64, b: f64) -> bool {
        if a == b {
            return true;
        }
        if !a.is_finite() || !b.is_finite() {
            return false;
        }
        let diff = (a - b).abs();
        diff <= (self.relative * a.abs().max(b.abs())).max(self.absolute)
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self { relative: 1e-9, absolute: 0.0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    pub tolerance: Tolerance,
}

impl EvalConfig {
    pub fn with_tolerance(tolerance: Tolerance) -> Self {
        Self { tolerance }
    }
}
