//! Piecewise-constant threshold weight functions.
//!
//! Every node and edge carries an ordered sequence of `(breakpoint, count)`
//! pairs. Consecutive entries bound half-open intervals
//! `[previous breakpoint, breakpoint)`; the count of the interval containing
//! the current threshold is the entity's display weight at that threshold.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Ordered `(breakpoint, count)` pairs of a step function over the
/// threshold range.
///
/// Serializes as the wire shape `[[breakpoint, count], ...]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdCounts(pub Vec<(f64, u64)>);

impl ThresholdCounts {
    /// Returns the count of the first half-open interval
    /// `[previous breakpoint, breakpoint)` that contains `threshold`.
    ///
    /// Returns 0 for an empty sequence, or when `threshold` sits at or past
    /// the final breakpoint -- no interval includes its right edge.
    pub fn value_at(&self, threshold: f64) -> u64 {
        let mut range_start = 0.0;
        for &(range_end, count) in &self.0 {
            if range_start <= threshold && threshold < range_end {
                return count;
            }
            range_start = range_end;
        }
        0
    }

    /// Checks that breakpoints strictly increase. `entity` names the owning
    /// node or edge in the error message.
    pub(crate) fn validate(&self, entity: &str) -> Result<(), CoreError> {
        let mut previous = f64::NEG_INFINITY;
        for &(breakpoint, _) in &self.0 {
            if breakpoint <= previous {
                return Err(CoreError::BreakpointsNotIncreasing {
                    entity: entity.to_string(),
                });
            }
            previous = breakpoint;
        }
        Ok(())
    }
}
