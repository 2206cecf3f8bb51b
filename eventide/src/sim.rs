//! The simulation context: scheduling facade and run loop.
//!
//! [`SimContext`] owns all mutable scheduler state behind an
//! `Rc<RefCell<_>>` and hands out [`WeakSimContext`] handles for code
//! (timers, callbacks) that must not keep the simulation alive. The
//! model is strictly single-threaded and cooperative: the only supported
//! "concurrency" is a callback re-entrantly scheduling or cancelling
//! events on the context that is dispatching it.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
    time::Duration,
};
use tracing::instrument;

use crate::{
    config::SimConfig,
    error::{SimulationError, SimulationResult},
    events::{ContextId, EventId, EventQueue, EventState, ScheduledEvent, NO_CONTEXT},
    time::{TimeDelta, VirtualTime},
};

#[derive(Debug)]
struct SimInner {
    current_time: VirtualTime,
    queue: EventQueue,
    next_sequence: u64,
    stop_requested: bool,
    current_context: ContextId,
    events_processed: u64,
    config: SimConfig,
}

impl SimInner {
    fn new(config: SimConfig) -> Self {
        Self {
            current_time: VirtualTime::ZERO,
            queue: EventQueue::new(),
            next_sequence: 0,
            stop_requested: false,
            current_context: NO_CONTEXT,
            events_processed: 0,
            config,
        }
    }
}

/// An explicit, owned simulation context.
///
/// One `SimContext` is one independent virtual clock plus the queue of
/// callbacks scheduled against it; a test process may hold several at
/// once. Scheduling misuse (negative delays, non-causal times) aborts
/// with a panic rather than being silently corrected; see the `Panics`
/// sections on the individual methods.
#[derive(Debug)]
pub struct SimContext {
    inner: Rc<RefCell<SimInner>>,
}

impl SimContext {
    /// Create a context with default configuration, starting at time
    /// zero with an empty queue.
    pub fn new() -> Self {
        Self::with_config(SimConfig::default())
    }

    /// Create a context with the given configuration.
    pub fn with_config(config: SimConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SimInner::new(config))),
        }
    }

    /// Create a weak handle to this context.
    ///
    /// Weak handles let timers and callbacks reach the scheduler without
    /// keeping it alive or forming reference cycles through the queue.
    pub fn downgrade(&self) -> WeakSimContext {
        WeakSimContext {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Current virtual time. Zero before the first event dispatches.
    pub fn now(&self) -> VirtualTime {
        self.inner.borrow().current_time
    }

    /// Context tag of the event being dispatched right now, or
    /// [`NO_CONTEXT`] outside dispatch.
    pub fn context(&self) -> ContextId {
        self.inner.borrow().current_context
    }

    /// Convert a wall-clock duration into ticks at this context's
    /// configured resolution.
    pub fn delta_of(&self, duration: Duration) -> TimeDelta {
        self.inner.borrow().config.delta_of(duration)
    }

    /// Schedule `callback` to fire `delay` ticks from now.
    ///
    /// The event inherits the context tag of the currently dispatching
    /// event, so work a simulated entity schedules for itself stays
    /// attributed to that entity.
    ///
    /// # Panics
    ///
    /// Panics if `delay` is negative: a negative delay is a caller bug,
    /// and scheduling into the past would break time monotonicity.
    #[instrument(skip(self, callback))]
    pub fn schedule<F>(&self, delay: TimeDelta, callback: F) -> EventId
    where
        F: FnOnce() + 'static,
    {
        assert!(
            !delay.is_negative(),
            "cannot schedule an event with negative delay {delay}"
        );
        let mut inner = self.inner.borrow_mut();
        let time = inner.current_time + delay;
        let context = inner.current_context;
        Self::insert_event(&mut inner, time, context, Box::new(callback))
    }

    /// Schedule `callback` at the current virtual time.
    ///
    /// It fires after every event already queued for this time (FIFO
    /// tie-break), never before the current callback returns.
    pub fn schedule_now<F>(&self, callback: F) -> EventId
    where
        F: FnOnce() + 'static,
    {
        self.schedule(TimeDelta::ZERO, callback)
    }

    /// Schedule `callback` at an absolute virtual time.
    ///
    /// # Panics
    ///
    /// Panics if `time` is before the current time.
    #[instrument(skip(self, callback))]
    pub fn schedule_at<F>(&self, time: VirtualTime, callback: F) -> EventId
    where
        F: FnOnce() + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        assert!(
            time >= inner.current_time,
            "cannot schedule an event at {time}, which is before the current time {}",
            inner.current_time
        );
        let context = inner.current_context;
        Self::insert_event(&mut inner, time, context, Box::new(callback))
    }

    /// Schedule `callback` to fire `delay` ticks from now, tagged with
    /// an explicit execution context.
    ///
    /// The tag is opaque metadata exposed through [`SimContext::context`]
    /// while the callback runs; it has no effect on dispatch ordering.
    ///
    /// # Panics
    ///
    /// Panics if `delay` is negative.
    #[instrument(skip(self, callback))]
    pub fn schedule_with_context<F>(
        &self,
        context: ContextId,
        delay: TimeDelta,
        callback: F,
    ) -> EventId
    where
        F: FnOnce() + 'static,
    {
        assert!(
            !delay.is_negative(),
            "cannot schedule an event with negative delay {delay}"
        );
        let mut inner = self.inner.borrow_mut();
        let time = inner.current_time + delay;
        Self::insert_event(&mut inner, time, context, Box::new(callback))
    }

    fn insert_event(
        inner: &mut SimInner,
        time: VirtualTime,
        context: ContextId,
        callback: Box<dyn FnOnce()>,
    ) -> EventId {
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;

        let (event, id) = ScheduledEvent::new(time, sequence, context, callback);
        inner.queue.insert(event);
        tracing::trace!(time = time.ticks(), sequence, context, "event scheduled");
        id
    }

    /// Remaining ticks until `event` fires.
    ///
    /// # Panics
    ///
    /// Panics if the event is not pending. Asking how long a fired or
    /// cancelled event has left is an invariant violation; there is no
    /// meaningful fallback value.
    pub fn delay_left(&self, event: &EventId) -> TimeDelta {
        assert!(
            event.is_pending(),
            "delay_left queried on an event that is not pending"
        );
        event.time() - self.now()
    }

    /// Returns `true` if `event` is still waiting to fire.
    pub fn is_pending(&self, event: &EventId) -> bool {
        event.is_pending()
    }

    /// Returns `true` if `event` will never fire in the future.
    pub fn is_expired(&self, event: &EventId) -> bool {
        event.is_expired()
    }

    /// Logically cancel `event`.
    ///
    /// Immediate from the caller's perspective; the queue reclaims the
    /// entry's storage lazily when it reaches it.
    pub fn cancel(&self, event: &EventId) {
        event.cancel();
    }

    /// Cancel `event` and eagerly reclaim its queue storage.
    ///
    /// No-op if the event already fired or was already removed.
    pub fn remove(&self, event: &EventId) {
        event.cancel();
        self.inner.borrow_mut().queue.remove(event.sequence());
    }

    /// Dispatch the earliest pending event, if any.
    ///
    /// Advances the clock to the event's fire time, marks it `Running`,
    /// invokes its callback with no internal borrow held (so the
    /// callback may schedule, cancel, or remove events on this context),
    /// then marks it `Expired`. Returns `true` if an event was
    /// dispatched.
    ///
    /// # Panics
    ///
    /// Panics if dispatch would move virtual time backward; the insert
    /// paths reject past times, so this indicates internal corruption.
    pub fn step(&self) -> bool {
        let (time, sequence, context, state, callback, trace) = {
            let mut inner = self.inner.borrow_mut();
            let Some(event) = inner.queue.pop_next() else {
                return false;
            };
            let (time, sequence, context, state, callback) = event.into_parts();
            assert!(
                time >= inner.current_time,
                "virtual time would move backward: current {}, event {time}",
                inner.current_time
            );
            inner.current_time = time;
            inner.current_context = context;
            inner.events_processed += 1;
            (
                time,
                sequence,
                context,
                state,
                callback,
                inner.config.trace_dispatch,
            )
        };

        if trace {
            tracing::debug!(time = time.ticks(), sequence, context, "dispatching event");
        }

        state.set(EventState::Running);
        callback();
        state.set(EventState::Expired);

        self.inner.borrow_mut().current_context = NO_CONTEXT;
        true
    }

    /// Run until the queue is logically empty or a stop is requested.
    ///
    /// Clears any previously latched stop request on entry, so a context
    /// stopped by [`stop`](SimContext::stop) or
    /// [`stop_in`](SimContext::stop_in) can be resumed by calling `run`
    /// again.
    #[instrument(skip(self))]
    pub fn run(&self) {
        self.inner.borrow_mut().stop_requested = false;
        loop {
            if self.inner.borrow().stop_requested {
                tracing::debug!("run loop halted by stop request");
                break;
            }
            if !self.step() {
                break;
            }
        }
        tracing::debug!(
            time = self.now().ticks(),
            events = self.events_processed(),
            "run loop finished"
        );
    }

    /// Request that the run loop halt before dispatching another event.
    pub fn stop(&self) {
        self.inner.borrow_mut().stop_requested = true;
    }

    /// Schedule a sentinel event that halts the run loop `delay` ticks
    /// from now. Events queued for later times stay pending and can be
    /// dispatched by a subsequent [`run`](SimContext::run).
    ///
    /// Returns the sentinel's handle so the stop can itself be
    /// cancelled.
    ///
    /// # Panics
    ///
    /// Panics if `delay` is negative.
    pub fn stop_in(&self, delay: TimeDelta) -> EventId {
        let weak = self.downgrade();
        self.schedule(delay, move || {
            if let Ok(sim) = weak.upgrade() {
                sim.stop();
            }
        })
    }

    /// Returns `true` if a stop request is latched.
    pub fn is_stopped(&self) -> bool {
        self.inner.borrow().stop_requested
    }

    /// Discard all pending events and reset the clock to zero.
    ///
    /// Every outstanding handle reports not-pending as soon as this
    /// returns. Idempotent, and safe to never call at all.
    #[instrument(skip(self))]
    pub fn destroy(&self) {
        let mut inner = self.inner.borrow_mut();
        let discarded = inner.queue.len();
        inner.queue.clear();
        inner.current_time = VirtualTime::ZERO;
        inner.current_context = NO_CONTEXT;
        inner.stop_requested = false;
        tracing::debug!(discarded, "simulation context destroyed");
    }

    /// Total number of events dispatched so far.
    pub fn events_processed(&self) -> u64 {
        self.inner.borrow().events_processed
    }

    /// Number of events still logically pending.
    pub fn pending_event_count(&self) -> usize {
        self.inner.borrow().queue.pending_len()
    }

    /// Returns `true` if any event is still waiting to fire.
    pub fn has_pending_events(&self) -> bool {
        self.inner.borrow_mut().queue.peek_next_time().is_some()
    }
}

impl Default for SimContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A weak handle to a [`SimContext`].
///
/// Lets timers and callbacks reach the scheduler without keeping it
/// alive; upgrading after the context is dropped yields
/// [`SimulationError::ContextDropped`].
#[derive(Debug, Clone)]
pub struct WeakSimContext {
    inner: Weak<RefCell<SimInner>>,
}

impl WeakSimContext {
    /// Attempt to recover a strong handle to the simulation context.
    pub fn upgrade(&self) -> SimulationResult<SimContext> {
        self.inner
            .upgrade()
            .map(|inner| SimContext { inner })
            .ok_or(SimulationError::ContextDropped)
    }
}
