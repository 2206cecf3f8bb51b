//! Determinism properties checked over randomized workloads.
//!
//! The dispatch order must be a pure function of the schedule calls:
//! sorted by fire time, with insertion order breaking ties. Running the
//! same workload twice must produce the identical trace.

use std::cell::RefCell;
use std::rc::Rc;

use eventide::prelude::*;
use proptest::prelude::*;

/// Run one workload: schedule every delay in order, run to completion,
/// and return (insertion index, fire time) pairs in dispatch order.
fn dispatch_trace(delays: &[i64]) -> Vec<(usize, i64)> {
    let sim = SimContext::new();
    let trace = Rc::new(RefCell::new(Vec::new()));

    for (index, &delay) in delays.iter().enumerate() {
        let weak = sim.downgrade();
        let slot = Rc::clone(&trace);
        sim.schedule(TimeDelta::from_ticks(delay), move || {
            let now = weak
                .upgrade()
                .expect("context alive during dispatch")
                .now()
                .ticks();
            slot.borrow_mut().push((index, now));
        });
    }

    sim.run();
    let result = trace.borrow().clone();
    result
}

proptest! {
    #[test]
    fn dispatch_order_is_time_then_insertion(delays in prop::collection::vec(0i64..50, 1..64)) {
        let trace = dispatch_trace(&delays);
        prop_assert_eq!(trace.len(), delays.len());

        // Expected order: stable sort by delay keeps insertion order
        // within equal times.
        let mut expected: Vec<usize> = (0..delays.len()).collect();
        expected.sort_by_key(|&i| delays[i]);

        let observed: Vec<usize> = trace.iter().map(|&(i, _)| i).collect();
        prop_assert_eq!(observed, expected);

        // Every event fires at exactly its scheduled time.
        for &(index, at) in &trace {
            prop_assert_eq!(at, delays[index]);
        }
    }

    #[test]
    fn identical_workloads_replay_identically(delays in prop::collection::vec(0i64..1000, 1..64)) {
        let first = dispatch_trace(&delays);
        let second = dispatch_trace(&delays);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn cancelling_a_subset_never_perturbs_the_survivors(
        delays in prop::collection::vec(0i64..50, 2..32),
        cancel_mask in prop::collection::vec(any::<bool>(), 2..32),
    ) {
        let sim = SimContext::new();
        let trace = Rc::new(RefCell::new(Vec::new()));

        let mut handles = Vec::new();
        for (index, &delay) in delays.iter().enumerate() {
            let slot = Rc::clone(&trace);
            handles.push(sim.schedule(TimeDelta::from_ticks(delay), move || {
                slot.borrow_mut().push(index);
            }));
        }
        for (handle, &cancel) in handles.iter().zip(cancel_mask.iter()) {
            if cancel {
                sim.cancel(handle);
            }
        }

        sim.run();

        let mut expected: Vec<usize> = (0..delays.len())
            .filter(|&i| !cancel_mask.get(i).copied().unwrap_or(false))
            .collect();
        expected.sort_by_key(|&i| delays[i]);

        prop_assert_eq!(trace.borrow().clone(), expected);
    }
}
