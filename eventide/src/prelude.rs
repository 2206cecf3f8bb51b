//! Prelude module for common eventide imports.
//!
//! Re-exports the types most programs need, so a single glob import is
//! enough to schedule events and drive timers.
//!
//! # Usage
//!
//! ```rust
//! use eventide::prelude::*;
//!
//! let sim = SimContext::new();
//! let mut timer = Timer::new(&sim, DestroyPolicy::CancelOnDestroy);
//! timer.set_callback(|| {});
//! timer.schedule_with(TimeDelta::from_ticks(5)).unwrap();
//! sim.run();
//! assert!(timer.is_expired());
//! ```

// Core simulation types
pub use crate::error::{SimulationError, SimulationResult};
pub use crate::sim::{SimContext, WeakSimContext};

// Time types
pub use crate::time::{TimeDelta, VirtualTime};

// Event handles
pub use crate::events::{EventId, EventState};

// Timers
pub use crate::timer::{DestroyPolicy, Timer, TimerState};

// Configuration
pub use crate::config::SimConfig;
