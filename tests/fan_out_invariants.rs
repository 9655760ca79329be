//! Fan-out Invariant Tests
//!
//! Tests for the batch engine under concurrent push delivery:
//! - Exactly-once completion
//! - Completion only after every unit settled
//! - Unit failures keep defaults
//! - Late and duplicate reports are ignored

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

use healthbridge::engine::{
    Batch, Collect, FanOutCoordinator, Finalized, SealReason, UnitHandle, UnitOutcome,
};
use healthbridge::observability::{Diagnostics, MetricsRegistry};

const WAIT: Duration = Duration::from_secs(5);

/// Positional collector with `-1` as default
struct Slots(Vec<i64>);

impl Slots {
    fn new(n: usize) -> Self {
        Slots(vec![-1; n])
    }
}

impl Collect for Slots {
    type Item = i64;
    type Output = Vec<i64>;

    fn slots(&self) -> usize {
        self.0.len()
    }

    fn accept(&mut self, slot: usize, item: i64) {
        self.0[slot] = item;
    }

    fn seal(self) -> Vec<i64> {
        self.0
    }
}

fn channel_completion() -> (
    Box<dyn FnOnce(Finalized<Vec<i64>>) + Send>,
    mpsc::Receiver<Finalized<Vec<i64>>>,
    Arc<AtomicUsize>,
) {
    let (tx, rx) = mpsc::channel();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let completion = Box::new(move |finalized: Finalized<Vec<i64>>| {
        counter.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(finalized);
    });
    (completion, rx, calls)
}

// =============================================================================
// Exactly-once Tests
// =============================================================================

/// Many units settling at the same instant still complete exactly once.
#[test]
fn test_simultaneous_settlement_completes_once() {
    for _ in 0..50 {
        let units = 16;
        let (completion, rx, calls) = channel_completion();
        let batch = Batch::open("race", Slots::new(units), Diagnostics::default(), completion);
        let barrier = Arc::new(Barrier::new(units));

        let workers: Vec<_> = (0..units)
            .map(|slot| {
                let unit = batch.unit(slot);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    unit.fill(slot as i64 * 10);
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let finalized = rx.recv_timeout(WAIT).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(finalized.report.filled, units);
        assert_eq!(finalized.report.reason, SealReason::Complete);
        let expected: Vec<i64> = (0..units as i64).map(|i| i * 10).collect();
        assert_eq!(finalized.value, expected);
    }
}

/// The completion never fires while a unit is outstanding.
#[test]
fn test_no_completion_before_last_unit() {
    let (completion, rx, calls) = channel_completion();
    let batch = Batch::open("partial", Slots::new(3), Diagnostics::default(), completion);

    batch.unit(0).fill(1);
    batch.unit(2).fill(3);
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    assert_eq!(batch.pending(), 1);

    batch.unit(1).fill(2);
    let finalized = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(finalized.value, vec![1, 2, 3]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Tolerance Tests
// =============================================================================

/// Every flavor of unit failure keeps the slot default.
#[test]
fn test_failures_keep_defaults() {
    let (completion, rx, _calls) = channel_completion();
    let batch = Batch::open("tolerant", Slots::new(5), Diagnostics::default(), completion);

    batch.unit(0).fill(7);
    batch.unit(1).empty();
    batch.unit(2).fail("sensor offline");
    batch.unit(3).complete(UnitOutcome::Unsupported);
    drop(batch.unit(4));

    let finalized = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(finalized.value, vec![7, -1, -1, -1, -1]);
    assert_eq!(finalized.report.filled, 1);
    assert_eq!(finalized.report.tolerated, 4);
    assert!(finalized.report.is_complete());
}

/// A handle dropped on another thread without reporting still settles.
#[test]
fn test_lost_callback_cannot_stall_batch() {
    let metrics = Arc::new(MetricsRegistry::new());
    let diagnostics = Diagnostics::new(Arc::clone(&metrics), false);
    let (completion, rx, _calls) = channel_completion();
    let batch = Batch::open("lost", Slots::new(2), diagnostics, completion);

    let lost = batch.unit(0);
    thread::spawn(move || drop(lost)).join().unwrap();
    batch.unit(1).fill(5);

    let finalized = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(finalized.value, vec![-1, 5]);
    assert_eq!(metrics.snapshot().units_abandoned, 1);
}

// =============================================================================
// Sealing Tests
// =============================================================================

/// Reports after an early seal are dropped and counted as late.
#[test]
fn test_late_reports_after_seal_are_ignored() {
    let metrics = Arc::new(MetricsRegistry::new());
    let diagnostics = Diagnostics::new(Arc::clone(&metrics), false);
    let (completion, rx, calls) = channel_completion();
    let batch = Batch::open("sealed", Slots::new(3), diagnostics, completion);
    let control = batch.control();

    batch.unit(0).fill(1);
    let late = batch.unit(1);

    assert!(control.seal(SealReason::DeadlineExpired));
    assert!(!control.cancel());

    late.fill(2);
    batch.unit(2).fill(3);

    let finalized = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(finalized.value, vec![1, -1, -1]);
    assert_eq!(finalized.report.reason, SealReason::DeadlineExpired);
    assert_eq!(finalized.report.unsettled, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(metrics.snapshot().late_completions, 2);
    assert_eq!(metrics.snapshot().batches_sealed_early, 1);
}

/// A handle dropped after the seal is late, not abandoned.
#[test]
fn test_drop_after_seal_counts_late_only() {
    let metrics = Arc::new(MetricsRegistry::new());
    let diagnostics = Diagnostics::new(Arc::clone(&metrics), false);
    let (completion, rx, _calls) = channel_completion();
    let batch = Batch::open("dropped", Slots::new(2), diagnostics, completion);
    let control = batch.control();

    let kept = batch.unit(0);
    assert!(control.cancel());
    drop(kept);
    drop(batch.unit(1));

    let finalized = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(finalized.report.reason, SealReason::Cancelled);
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.units_abandoned, 0);
    assert_eq!(snapshot.late_completions, 2);
}

/// A control outliving its batch reports nothing pending and seals nothing.
#[test]
fn test_control_after_batch_dropped() {
    let (completion, rx, _calls) = channel_completion();
    let batch = Batch::open("gone", Slots::new(1), Diagnostics::default(), completion);
    let control = batch.control();

    batch.unit(0).fill(9);
    drop(batch);

    assert_eq!(rx.recv_timeout(WAIT).unwrap().value, vec![9]);
    assert_eq!(control.pending(), 0);
    assert!(!control.cancel());
}

// =============================================================================
// Coordinator Tests
// =============================================================================

/// Results land in request order however the units finish.
#[test]
fn test_coordinator_preserves_order_under_jitter() {
    let coordinator = FanOutCoordinator::default();
    let requests: Vec<u64> = vec![40, 5, 25, 0, 15, 30, 10];
    let (completion, rx, _calls) = channel_completion();

    coordinator.run(
        "jitter",
        &requests,
        Slots::new(requests.len()),
        |delay: &u64, unit: UnitHandle<Slots>| {
            let delay = *delay;
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(delay));
                unit.fill(delay as i64);
            });
        },
        completion,
    );

    let finalized = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(finalized.value, vec![40, 5, 25, 0, 15, 30, 10]);
}

/// Units that settle synchronously complete inside `run`.
#[test]
fn test_coordinator_synchronous_units() {
    let coordinator = FanOutCoordinator::default();
    let requests = [1i64, 2, 3];
    let (completion, rx, _calls) = channel_completion();

    let control = coordinator.run(
        "sync",
        &requests,
        Slots::new(3),
        |value: &i64, unit: UnitHandle<Slots>| unit.fill(*value),
        completion,
    );

    assert_eq!(rx.try_recv().unwrap().value, vec![1, 2, 3]);
    assert_eq!(control.pending(), 0);
}
