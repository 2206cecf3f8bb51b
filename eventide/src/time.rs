//! Virtual time for the deterministic scheduling core.
//!
//! Time advances only when the run loop dispatches events, never from
//! wall-clock observation. Absolute points on the clock are
//! [`VirtualTime`]; spans between points are [`TimeDelta`]. Both are
//! signed tick counts so that negative delays can be detected and
//! rejected at the scheduling boundary.

use std::ops::{Add, Sub};

/// An absolute point on the simulation clock, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualTime(i64);

impl VirtualTime {
    /// The zero-point of simulation time.
    pub const ZERO: VirtualTime = VirtualTime(0);

    /// Create a `VirtualTime` from a raw tick value.
    #[inline]
    pub fn from_ticks(ticks: i64) -> Self {
        VirtualTime(ticks)
    }

    /// Return the raw tick value.
    #[inline]
    pub fn ticks(self) -> i64 {
        self.0
    }
}

impl Add<TimeDelta> for VirtualTime {
    type Output = VirtualTime;

    /// # Panics
    ///
    /// Panics on tick overflow. Overflow means the simulation has run
    /// past the representable horizon, which is a fatal setup error.
    fn add(self, rhs: TimeDelta) -> VirtualTime {
        VirtualTime(
            self.0
                .checked_add(rhs.0)
                .expect("virtual time overflowed the tick horizon"),
        )
    }
}

impl Sub for VirtualTime {
    type Output = TimeDelta;

    fn sub(self, rhs: VirtualTime) -> TimeDelta {
        TimeDelta(self.0 - rhs.0)
    }
}

impl std::fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T={}", self.0)
    }
}

/// A signed span of simulation time, in ticks.
///
/// Delays handed to the scheduler are `TimeDelta`s; a negative delta is
/// rejected with a panic at the scheduling call site rather than being
/// silently clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeDelta(i64);

impl TimeDelta {
    /// A span of zero ticks.
    pub const ZERO: TimeDelta = TimeDelta(0);

    /// Create a `TimeDelta` from a raw tick value.
    #[inline]
    pub fn from_ticks(ticks: i64) -> Self {
        TimeDelta(ticks)
    }

    /// Return the raw tick value.
    #[inline]
    pub fn ticks(self) -> i64 {
        self.0
    }

    /// Returns `true` if this span is strictly negative.
    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl Add for TimeDelta {
    type Output = TimeDelta;

    fn add(self, rhs: TimeDelta) -> TimeDelta {
        TimeDelta(self.0 + rhs.0)
    }
}

impl Sub for TimeDelta {
    type Output = TimeDelta;

    fn sub(self, rhs: TimeDelta) -> TimeDelta {
        TimeDelta(self.0 - rhs.0)
    }
}

impl std::fmt::Display for TimeDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_constants() {
        assert_eq!(VirtualTime::ZERO.ticks(), 0);
        assert_eq!(TimeDelta::ZERO.ticks(), 0);
    }

    #[test]
    fn ordering_is_total() {
        let t1 = VirtualTime::from_ticks(10);
        let t2 = VirtualTime::from_ticks(20);
        assert!(t1 < t2);
        assert_eq!(t1, VirtualTime::from_ticks(10));
    }

    #[test]
    fn add_delta_advances_time() {
        let t = VirtualTime::from_ticks(100);
        assert_eq!((t + TimeDelta::from_ticks(50)).ticks(), 150);
    }

    #[test]
    fn subtracting_times_yields_delta() {
        let t1 = VirtualTime::from_ticks(30);
        let t2 = VirtualTime::from_ticks(10);
        assert_eq!(t1 - t2, TimeDelta::from_ticks(20));
        assert!((t2 - t1).is_negative());
    }

    #[test]
    #[should_panic(expected = "tick horizon")]
    fn overflow_is_fatal() {
        let _ = VirtualTime::from_ticks(i64::MAX) + TimeDelta::from_ticks(1);
    }

    #[test]
    fn display_formats() {
        assert_eq!(VirtualTime::from_ticks(42).to_string(), "T=42");
        assert_eq!(TimeDelta::from_ticks(-3).to_string(), "-3");
    }
}
