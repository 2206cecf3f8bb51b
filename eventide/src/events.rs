//! Event identity and the priority queue that orders pending events.
//!
//! Events are keyed by `(fire time, insertion sequence)`: distinct times
//! dispatch in increasing order, equal times dispatch in insertion (FIFO)
//! order. The sequence numbers are minted by the owning simulation
//! context and never reused, which makes dispatch order deterministic
//! and reproducible across runs with identical inputs.
//!
//! Cancellation is logical first, physical later: cancelling flips a
//! status cell shared between the queue entry and every [`EventId`]
//! handle, and the dead entry is skipped (and dropped) lazily when the
//! queue reaches it. Removal additionally reclaims the entry's storage
//! eagerly. Either way, handles stay valid and answer pending/expired
//! queries safely after the storage is gone.

use std::{
    cell::Cell,
    cmp::Ordering,
    collections::BinaryHeap,
    rc::Rc,
};

use crate::time::VirtualTime;

/// Tag identifying which simulated entity an event runs as.
///
/// Opaque metadata with no effect on dispatch ordering.
pub type ContextId = u64;

/// Context tag for events scheduled outside any dispatching callback.
pub const NO_CONTEXT: ContextId = ContextId::MAX;

/// Lifecycle status of a scheduled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventState {
    /// Sitting in the queue, waiting to fire.
    Pending,
    /// Its callback is executing right now.
    Running,
    /// Its callback has finished.
    Expired,
    /// Cancelled or removed before firing.
    Cancelled,
}

/// The type-erased callback an event invokes when it fires.
pub(crate) type EventCallback = Box<dyn FnOnce()>;

/// A lightweight handle to a scheduled event.
///
/// Handles may outlive the queue's bookkeeping for the event: the status
/// lives in a shared cell, so [`is_pending`](EventId::is_pending) and
/// [`is_expired`](EventId::is_expired) remain safe to query after the
/// underlying storage has been reclaimed.
///
/// Cloning a handle is cheap and both clones observe the same event.
#[derive(Debug, Clone)]
pub struct EventId {
    time: VirtualTime,
    sequence: u64,
    state: Rc<Cell<EventState>>,
}

impl EventId {
    /// The virtual time this event fires (or would have fired) at.
    #[inline]
    pub fn time(&self) -> VirtualTime {
        self.time
    }

    /// The unique insertion sequence number, used for FIFO tie-breaking.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Current lifecycle status.
    #[inline]
    pub fn state(&self) -> EventState {
        self.state.get()
    }

    /// Returns `true` if the event is still waiting to fire.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.state.get() == EventState::Pending
    }

    /// Returns `true` if the event will never fire in the future: it has
    /// fired, is firing right now, or was cancelled.
    #[inline]
    pub fn is_expired(&self) -> bool {
        !self.is_pending()
    }

    /// Logically cancel the event.
    ///
    /// Immediate from the caller's perspective: the handle reports
    /// not-pending as soon as this returns, even though the queue may
    /// reclaim the entry's storage later. No-op unless pending.
    pub fn cancel(&self) {
        if self.is_pending() {
            self.state.set(EventState::Cancelled);
        }
    }
}

impl PartialEq for EventId {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl Eq for EventId {}

/// A queue-owned record of one scheduled callback.
pub(crate) struct ScheduledEvent {
    time: VirtualTime,
    sequence: u64,
    context: ContextId,
    state: Rc<Cell<EventState>>,
    callback: EventCallback,
}

impl ScheduledEvent {
    /// Create an event record together with its public handle.
    pub(crate) fn new(
        time: VirtualTime,
        sequence: u64,
        context: ContextId,
        callback: EventCallback,
    ) -> (Self, EventId) {
        let state = Rc::new(Cell::new(EventState::Pending));
        let event = Self {
            time,
            sequence,
            context,
            state: Rc::clone(&state),
            callback,
        };
        let id = EventId {
            time,
            sequence,
            state,
        };
        (event, id)
    }

    pub(crate) fn time(&self) -> VirtualTime {
        self.time
    }

    pub(crate) fn sequence(&self) -> u64 {
        self.sequence
    }

    fn is_cancelled(&self) -> bool {
        self.state.get() == EventState::Cancelled
    }

    /// Decompose into the pieces the run loop needs.
    pub(crate) fn into_parts(
        self,
    ) -> (VirtualTime, u64, ContextId, Rc<Cell<EventState>>, EventCallback) {
        (
            self.time,
            self.sequence,
            self.context,
            self.state,
            self.callback,
        )
    }
}

impl std::fmt::Debug for ScheduledEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledEvent")
            .field("time", &self.time)
            .field("sequence", &self.sequence)
            .field("context", &self.context)
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse both keys so the earliest
        // time pops first and equal times pop in insertion order.
        match other.time.cmp(&self.time) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            ord => ord,
        }
    }
}

/// A priority queue of pending events keyed by `(time, sequence)`.
///
/// Insert and extract-min are O(log n). Cancelled entries are skipped
/// lazily at extraction; [`remove`](EventQueue::remove) reclaims a
/// single entry eagerly at O(n) cost.
#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    heap: BinaryHeap<ScheduledEvent>,
}

impl EventQueue {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    /// Insert an event record.
    pub(crate) fn insert(&mut self, event: ScheduledEvent) {
        self.heap.push(event);
    }

    /// Pop the earliest live event, dropping any cancelled entries
    /// encountered on the way.
    pub(crate) fn pop_next(&mut self) -> Option<ScheduledEvent> {
        while let Some(event) = self.heap.pop() {
            if event.is_cancelled() {
                continue;
            }
            return Some(event);
        }
        None
    }

    /// The fire time of the earliest live event, if any. Reclaims any
    /// cancelled entries sitting at the head of the queue.
    pub(crate) fn peek_next_time(&mut self) -> Option<VirtualTime> {
        while let Some(head) = self.heap.peek() {
            if head.is_cancelled() {
                self.heap.pop();
                continue;
            }
            return Some(head.time());
        }
        None
    }

    /// Eagerly reclaim the entry with the given sequence number.
    ///
    /// Returns `false` (no-op) if no such entry is stored, which covers
    /// events that already fired or were previously removed.
    pub(crate) fn remove(&mut self, sequence: u64) -> bool {
        if !self.heap.iter().any(|e| e.sequence() == sequence) {
            return false;
        }
        let entries = std::mem::take(&mut self.heap).into_vec();
        let mut kept = Vec::with_capacity(entries.len().saturating_sub(1));
        for event in entries {
            if event.sequence() == sequence {
                event.state.set(EventState::Cancelled);
            } else {
                kept.push(event);
            }
        }
        self.heap = BinaryHeap::from(kept);
        true
    }

    /// Cancel and drop every stored entry.
    pub(crate) fn clear(&mut self) {
        for event in self.heap.drain() {
            if event.state.get() == EventState::Pending {
                event.state.set(EventState::Cancelled);
            }
        }
    }

    /// Number of physically stored entries, including tombstones.
    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    /// Number of entries still logically pending.
    pub(crate) fn pending_len(&self) -> usize {
        self.heap
            .iter()
            .filter(|e| e.state.get() == EventState::Pending)
            .count()
    }
}

impl Drop for EventQueue {
    fn drop(&mut self) {
        // Handles outlive the queue; make them report not-pending for a
        // simulation that no longer exists.
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::VirtualTime;

    fn noop() -> EventCallback {
        Box::new(|| {})
    }

    #[test]
    fn pops_in_time_order() {
        let mut queue = EventQueue::new();
        for (seq, ticks) in [(0, 30), (1, 10), (2, 20)] {
            let (event, _id) =
                ScheduledEvent::new(VirtualTime::from_ticks(ticks), seq, NO_CONTEXT, noop());
            queue.insert(event);
        }

        let order: Vec<i64> = std::iter::from_fn(|| queue.pop_next())
            .map(|e| e.time().ticks())
            .collect();
        assert_eq!(order, vec![10, 20, 30]);
    }

    #[test]
    fn equal_times_pop_in_insertion_order() {
        let mut queue = EventQueue::new();
        let time = VirtualTime::from_ticks(5);
        for seq in [7, 8, 9] {
            let (event, _id) = ScheduledEvent::new(time, seq, NO_CONTEXT, noop());
            queue.insert(event);
        }

        let order: Vec<u64> = std::iter::from_fn(|| queue.pop_next())
            .map(|e| e.sequence())
            .collect();
        assert_eq!(order, vec![7, 8, 9]);
    }

    #[test]
    fn cancelled_entries_are_skipped_lazily() {
        let mut queue = EventQueue::new();
        let (first, first_id) =
            ScheduledEvent::new(VirtualTime::from_ticks(1), 0, NO_CONTEXT, noop());
        let (second, _) = ScheduledEvent::new(VirtualTime::from_ticks(2), 1, NO_CONTEXT, noop());
        queue.insert(first);
        queue.insert(second);

        first_id.cancel();
        assert!(!first_id.is_pending());
        assert_eq!(queue.len(), 2, "cancel must not reclaim storage");

        let popped = queue.pop_next().unwrap();
        assert_eq!(popped.sequence(), 1);
        assert!(queue.pop_next().is_none());
    }

    #[test]
    fn remove_reclaims_storage_eagerly() {
        let mut queue = EventQueue::new();
        let (event, id) = ScheduledEvent::new(VirtualTime::from_ticks(1), 0, NO_CONTEXT, noop());
        queue.insert(event);

        assert!(queue.remove(0));
        assert_eq!(queue.len(), 0);
        assert!(id.is_expired());

        // Already reclaimed: no-op.
        assert!(!queue.remove(0));
    }

    #[test]
    fn peek_next_time_skims_tombstones() {
        let mut queue = EventQueue::new();
        let (first, first_id) =
            ScheduledEvent::new(VirtualTime::from_ticks(1), 0, NO_CONTEXT, noop());
        let (second, _) = ScheduledEvent::new(VirtualTime::from_ticks(9), 1, NO_CONTEXT, noop());
        queue.insert(first);
        queue.insert(second);

        first_id.cancel();
        assert_eq!(queue.peek_next_time(), Some(VirtualTime::from_ticks(9)));
        assert_eq!(queue.len(), 1, "tombstone at the head is reclaimed");
    }

    #[test]
    fn dropping_the_queue_cancels_pending_handles() {
        let id = {
            let mut queue = EventQueue::new();
            let (event, id) =
                ScheduledEvent::new(VirtualTime::from_ticks(1), 0, NO_CONTEXT, noop());
            queue.insert(event);
            id
        };
        assert!(!id.is_pending());
        assert!(id.is_expired());
    }

    #[test]
    fn pending_len_ignores_tombstones() {
        let mut queue = EventQueue::new();
        let (first, first_id) =
            ScheduledEvent::new(VirtualTime::from_ticks(1), 0, NO_CONTEXT, noop());
        let (second, _) = ScheduledEvent::new(VirtualTime::from_ticks(2), 1, NO_CONTEXT, noop());
        queue.insert(first);
        queue.insert(second);

        first_id.cancel();
        assert_eq!(queue.pending_len(), 1);
        assert_eq!(queue.len(), 2);
    }
}
