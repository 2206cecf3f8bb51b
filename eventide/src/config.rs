//! Configuration for a simulation context.

use std::time::Duration;

use crate::time::TimeDelta;

/// Tunables for a [`SimContext`](crate::SimContext).
///
/// Plain data with a [`Default`]; construct one, adjust fields, and hand
/// it to [`SimContext::with_config`](crate::SimContext::with_config).
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Wall-clock span one tick stands for. Only consulted when
    /// converting [`Duration`]s at the API boundary; tick arithmetic
    /// itself never looks at it. Must be non-zero. Defaults to 1 ns.
    pub resolution: Duration,

    /// Emit a `tracing` event for every dispatched callback.
    pub trace_dispatch: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            resolution: Duration::from_nanos(1),
            trace_dispatch: false,
        }
    }
}

impl SimConfig {
    /// Convert a wall-clock duration into ticks at this resolution,
    /// truncating any sub-tick remainder.
    pub fn delta_of(&self, duration: Duration) -> TimeDelta {
        let res = self.resolution.as_nanos().max(1);
        TimeDelta::from_ticks((duration.as_nanos() / res) as i64)
    }
}
