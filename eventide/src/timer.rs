//! A reusable timer with suspend/resume semantics over raw events.
//!
//! [`Timer`] binds one callback to a delay and manages the lifecycle of
//! the event currently scheduled for it: start, cancel, suspend (cache
//! the remaining delay and pull the event out of the queue), resume
//! (re-arm with the cached remainder), and a construction-time policy
//! for what happens to an outstanding event when the timer is dropped.

use std::{cell::RefCell, rc::Rc};

use crate::{
    error::SimulationResult,
    events::EventId,
    sim::{SimContext, WeakSimContext},
    time::TimeDelta,
};

/// What a [`Timer`] does with a still-pending event when dropped.
///
/// Fixed at construction and not changeable later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyPolicy {
    /// Panic if an event is pending at drop time. Forces callers to stop
    /// timers explicitly before letting them go out of scope.
    CheckOnDestroy,
    /// Silently cancel a pending event (storage reclaimed lazily).
    CancelOnDestroy,
    /// Silently remove a pending event (storage reclaimed eagerly).
    RemoveOnDestroy,
}

/// Externally observable state of a [`Timer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// An event is pending in the scheduler.
    Running,
    /// Nothing is pending; the last scheduled event (if any) has fired
    /// or been discarded.
    Expired,
    /// Explicitly paused; the remaining delay is cached and no event is
    /// pending.
    Suspended,
}

/// The timer's type-erased bound callback.
///
/// Shared between the timer and the events it schedules: each schedule
/// re-boxes a clone of this into a fresh one-shot event callback, so the
/// same bound callback can fire any number of times.
type TimerCallback = Rc<RefCell<dyn FnMut()>>;

/// A stateful wrapper binding one callback to a delay.
///
/// Misuse (re-scheduling while an event is pending, suspending a timer
/// that is not running, resuming one that is not suspended) panics: such
/// calls indicate a bug in the caller's lifecycle handling, and silent
/// correction would mask it.
pub struct Timer {
    sim: WeakSimContext,
    policy: DestroyPolicy,
    delay: TimeDelta,
    callback: Option<TimerCallback>,
    event: Option<EventId>,
    suspended: bool,
    suspended_delay_left: TimeDelta,
}

impl Timer {
    /// Create a timer bound to `sim` with the given destroy policy.
    ///
    /// The new timer is [`Expired`](TimerState::Expired): nothing has
    /// ever been scheduled.
    pub fn new(sim: &SimContext, policy: DestroyPolicy) -> Self {
        Self {
            sim: sim.downgrade(),
            policy,
            delay: TimeDelta::ZERO,
            callback: None,
            event: None,
            suspended: false,
            suspended_delay_left: TimeDelta::ZERO,
        }
    }

    /// Bind the callback this timer fires. Replaces any previous
    /// binding; the pending event (if any) is unaffected and still fires
    /// the callback it captured.
    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: FnMut() + 'static,
    {
        self.callback = Some(Rc::new(RefCell::new(callback)));
    }

    /// Set the default delay used by [`schedule`](Timer::schedule).
    pub fn set_delay(&mut self, delay: TimeDelta) {
        self.delay = delay;
    }

    /// The default delay.
    pub fn delay(&self) -> TimeDelta {
        self.delay
    }

    /// Schedule the bound callback to fire after the default delay.
    ///
    /// # Panics
    ///
    /// Panics if no callback is bound, or if an event for this timer is
    /// still pending; re-scheduling a running timer is a fatal usage
    /// error.
    pub fn schedule(&mut self) -> SimulationResult<()> {
        self.schedule_with(self.delay)
    }

    /// Schedule the bound callback to fire after `delay` ticks.
    ///
    /// # Panics
    ///
    /// Same conditions as [`schedule`](Timer::schedule), plus a negative
    /// `delay`.
    pub fn schedule_with(&mut self, delay: TimeDelta) -> SimulationResult<()> {
        let callback = self
            .callback
            .as_ref()
            .expect("no callback bound to this timer");
        if let Some(event) = &self.event {
            assert!(
                !event.is_pending(),
                "timer event is still pending while re-scheduling"
            );
        }
        let sim = self.sim.upgrade()?;
        self.event = Some(Self::arm(&sim, callback, delay));
        // A schedule while suspended supersedes the cached remainder.
        self.suspended = false;
        Ok(())
    }

    /// Cancel the pending event, if any. Leaves suspension bookkeeping
    /// untouched: cancelling discards the pending fire, it is not a
    /// pause primitive.
    pub fn cancel(&self) {
        if let Some(event) = &self.event {
            event.cancel();
        }
    }

    /// Remove the pending event, if any, reclaiming queue storage
    /// eagerly. Falls back to a logical cancel when the simulation
    /// context is already gone.
    pub fn remove(&self) {
        if let Some(event) = &self.event {
            match self.sim.upgrade() {
                Ok(sim) => sim.remove(event),
                Err(_) => event.cancel(),
            }
        }
    }

    /// Pause a running timer.
    ///
    /// Caches the remaining delay and pulls the live event from the
    /// scheduler (cancel, or eager removal under
    /// [`RemoveOnDestroy`](DestroyPolicy::RemoveOnDestroy)) so it cannot
    /// fire while suspended.
    ///
    /// # Panics
    ///
    /// Panics unless the timer is currently running.
    pub fn suspend(&mut self) -> SimulationResult<()> {
        assert!(
            self.is_running(),
            "suspend called on a timer that is not running"
        );
        let sim = self.sim.upgrade()?;
        let event = self
            .event
            .as_ref()
            .expect("running timer always has an event");
        self.suspended_delay_left = sim.delay_left(event);
        match self.policy {
            DestroyPolicy::RemoveOnDestroy => sim.remove(event),
            DestroyPolicy::CheckOnDestroy | DestroyPolicy::CancelOnDestroy => sim.cancel(event),
        }
        self.suspended = true;
        Ok(())
    }

    /// Resume a suspended timer with the delay that was left when it was
    /// suspended.
    ///
    /// # Panics
    ///
    /// Panics unless the timer is currently suspended.
    pub fn resume(&mut self) -> SimulationResult<()> {
        assert!(
            self.suspended,
            "resume called on a timer that is not suspended"
        );
        let callback = self
            .callback
            .as_ref()
            .expect("suspended timer always has a callback");
        let sim = self.sim.upgrade()?;
        self.event = Some(Self::arm(&sim, callback, self.suspended_delay_left));
        self.suspended = false;
        Ok(())
    }

    /// Remaining ticks before the callback fires.
    ///
    /// Running: computed from the scheduler. Expired: zero. Suspended:
    /// the value cached by the last [`suspend`](Timer::suspend).
    pub fn delay_left(&self) -> TimeDelta {
        match self.state() {
            TimerState::Running => {
                let sim = self
                    .sim
                    .upgrade()
                    .expect("running timer implies a live simulation context");
                let event = self
                    .event
                    .as_ref()
                    .expect("running timer always has an event");
                sim.delay_left(event)
            }
            TimerState::Expired => TimeDelta::ZERO,
            TimerState::Suspended => self.suspended_delay_left,
        }
    }

    /// Returns `true` if an event is pending and the timer is not
    /// suspended.
    pub fn is_running(&self) -> bool {
        !self.suspended && self.event.as_ref().is_some_and(EventId::is_pending)
    }

    /// Returns `true` if nothing is pending and the timer is not
    /// suspended.
    pub fn is_expired(&self) -> bool {
        !self.suspended && self.event.as_ref().is_none_or(EventId::is_expired)
    }

    /// Returns `true` if the timer is explicitly paused.
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Derive the externally visible state. Pure read; never mutates.
    pub fn state(&self) -> TimerState {
        if self.is_running() {
            TimerState::Running
        } else if self.is_expired() {
            TimerState::Expired
        } else {
            debug_assert!(self.suspended);
            TimerState::Suspended
        }
    }

    fn arm(sim: &SimContext, callback: &TimerCallback, delay: TimeDelta) -> EventId {
        let callback = Rc::clone(callback);
        sim.schedule(delay, move || (callback.borrow_mut())())
    }
}

impl Drop for Timer {
    /// Apply the destroy policy to any outstanding event.
    ///
    /// # Panics
    ///
    /// Panics under [`CheckOnDestroy`](DestroyPolicy::CheckOnDestroy)
    /// if an event is still pending.
    fn drop(&mut self) {
        match self.policy {
            DestroyPolicy::CheckOnDestroy => {
                if self.event.as_ref().is_some_and(EventId::is_pending) {
                    panic!("timer dropped while its event is still pending");
                }
            }
            DestroyPolicy::CancelOnDestroy => self.cancel(),
            DestroyPolicy::RemoveOnDestroy => self.remove(),
        }
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("policy", &self.policy)
            .field("delay", &self.delay)
            .field("state", &self.state())
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}
