//! # Eventide
//!
//! A deterministic discrete-event scheduling core with suspendable timers.
//!
//! The crate provides:
//! - Virtual time as an integer tick count, advanced only by dispatch
//! - An event queue ordered by time with FIFO tie-break at equal times
//! - A simulator facade for scheduling, cancelling, running and stopping
//! - Handle pattern for avoiding borrow checker conflicts in callbacks
//! - A reusable [`Timer`] with suspend/resume and destroy policies
//!
//! Execution is strictly single-threaded: determinism comes from the
//! total order on `(time, insertion sequence)`, and no synchronization
//! is needed or provided.
//!
//! ```rust
//! use eventide::{SimContext, TimeDelta};
//!
//! let sim = SimContext::new();
//! let event = sim.schedule(TimeDelta::from_ticks(10), || {
//!     println!("fired");
//! });
//! assert!(event.is_pending());
//! sim.run();
//! assert!(event.is_expired());
//! assert_eq!(sim.now().ticks(), 10);
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

/// Simulation configuration and wall-clock resolution mapping.
pub mod config;
/// Error types and utilities for simulation operations.
pub mod error;
/// Event identity, state tracking and the time-ordered queue.
pub mod events;
/// Commonly used types, importable in one line.
pub mod prelude;
/// Core simulation context and event dispatch loop.
pub mod sim;
/// Virtual time points and signed tick deltas.
pub mod time;
/// Reusable timers with suspend/resume over raw events.
pub mod timer;

// Public API exports
pub use config::SimConfig;
pub use error::{SimulationError, SimulationResult};
pub use events::{ContextId, EventId, EventState, NO_CONTEXT};
pub use sim::{SimContext, WeakSimContext};
pub use time::{TimeDelta, VirtualTime};
pub use timer::{DestroyPolicy, Timer, TimerState};
