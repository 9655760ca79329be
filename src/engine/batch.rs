//! # Fan-out Batch
//!
//! Transient coordination state for one fan-out: a pending counter, one
//! settled flag per slot, the collector holding pre-filled defaults, and the
//! completion callback.
//!
//! All mutation goes through a single mutex, so a slot write and the counter
//! decrement are one atomic step. The completion callback is taken out of
//! the state under the lock and invoked after the lock is released, which
//! makes it fire exactly once and only after every write is visible.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use uuid::Uuid;

use crate::observability::{Diagnostics, Event};

/// Destination of unit results.
///
/// A collector is created with every slot already holding its default, so
/// sealing it at any point yields a complete, well-formed output.
pub trait Collect: Send + 'static {
    type Item: Send + 'static;
    type Output: Send + 'static;

    /// Number of units the batch tracks
    fn slots(&self) -> usize;

    /// Overwrite the default at `slot`
    fn accept(&mut self, slot: usize, item: Self::Item);

    fn seal(self) -> Self::Output;
}

/// How one unit settled
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome<T> {
    Filled(T),
    /// Query answered without data
    Empty,
    Failed(String),
    /// The store cannot run this kind of query
    Unsupported,
    /// The handle was dropped without a report
    Abandoned,
}

impl<T> UnitOutcome<T> {
    /// Why the unit kept its default; `None` when it was filled
    pub fn tolerated_reason(&self) -> Option<String> {
        match self {
            UnitOutcome::Filled(_) => None,
            UnitOutcome::Empty => Some("no data".to_string()),
            UnitOutcome::Failed(reason) => Some(format!("failed: {}", reason)),
            UnitOutcome::Unsupported => Some("unsupported type".to_string()),
            UnitOutcome::Abandoned => Some("abandoned".to_string()),
        }
    }
}

/// Why a batch delivered its result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealReason {
    /// Every unit settled
    Complete,
    Cancelled,
    DeadlineExpired,
}

impl SealReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SealReason::Complete => "complete",
            SealReason::Cancelled => "cancelled",
            SealReason::DeadlineExpired => "deadline_expired",
        }
    }
}

/// Summary handed to the completion callback next to the value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub label: &'static str,
    pub units: usize,
    pub filled: usize,
    pub tolerated: usize,
    /// Units still outstanding when the batch sealed
    pub unsettled: usize,
    pub reason: SealReason,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.reason == SealReason::Complete
    }
}

/// Final value of a batch
#[derive(Debug)]
pub struct Finalized<T> {
    pub value: T,
    pub report: BatchReport,
}

pub type Completion<T> = Box<dyn FnOnce(Finalized<T>) + Send + 'static>;

struct BatchState<C: Collect> {
    pending: usize,
    settled: Vec<bool>,
    filled: usize,
    tolerated: usize,
    collector: Option<C>,
    on_complete: Option<Completion<C::Output>>,
}

type Delivery<T> = (Completion<T>, Finalized<T>);

/// One fan-out batch, shared by its unit handles
pub struct Batch<C: Collect> {
    id: Uuid,
    label: &'static str,
    units: usize,
    state: Mutex<BatchState<C>>,
    diagnostics: Diagnostics,
}

impl<C: Collect> Batch<C> {
    /// Create a batch over `collector`'s slots.
    ///
    /// # Panics
    ///
    /// Panics if the collector has no slots: an empty batch could never
    /// complete.
    pub fn open(
        label: &'static str,
        collector: C,
        diagnostics: Diagnostics,
        on_complete: Completion<C::Output>,
    ) -> Arc<Self> {
        let units = collector.slots();
        assert!(units > 0, "fan-out batch '{}' needs at least one unit", label);

        diagnostics.metrics().increment_batches_started();

        Arc::new(Self {
            id: Uuid::new_v4(),
            label,
            units,
            state: Mutex::new(BatchState {
                pending: units,
                settled: vec![false; units],
                filled: 0,
                tolerated: 0,
                collector: Some(collector),
                on_complete: Some(on_complete),
            }),
            diagnostics,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn units(&self) -> usize {
        self.units
    }

    pub fn pending(&self) -> usize {
        self.lock().pending
    }

    pub fn is_sealed(&self) -> bool {
        self.lock().collector.is_none()
    }

    /// Handle through which the unit at `slot` reports
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    pub fn unit(self: &Arc<Self>, slot: usize) -> UnitHandle<C> {
        assert!(
            slot < self.units,
            "slot {} out of range for batch of {}",
            slot,
            self.units
        );
        UnitHandle {
            batch: Some(Arc::clone(self)),
            slot,
        }
    }

    /// Type-erased control for cancellation and deadlines
    pub fn control(self: &Arc<Self>) -> BatchControl {
        let sealable: Arc<dyn Sealable> = Arc::clone(self) as Arc<dyn Sealable>;
        BatchControl {
            id: self.id,
            batch: Arc::downgrade(&sealable),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BatchState<C>> {
        // A panicking collector must not wedge the remaining units.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settle(&self, slot: usize, outcome: UnitOutcome<C::Item>) {
        let tolerated = outcome.tolerated_reason();
        let abandoned = matches!(outcome, UnitOutcome::Abandoned);

        let delivery = {
            let mut state = self.lock();
            if state.collector.is_none() || state.settled[slot] {
                drop(state);
                self.diagnostics.late_completion(&self.id.to_string(), slot);
                return;
            }

            state.settled[slot] = true;
            match outcome {
                UnitOutcome::Filled(item) => {
                    if let Some(collector) = state.collector.as_mut() {
                        collector.accept(slot, item);
                    }
                    state.filled += 1;
                }
                _ => state.tolerated += 1,
            }
            state.pending -= 1;

            if state.pending == 0 {
                self.take_delivery(&mut state, SealReason::Complete)
            } else {
                None
            }
        };

        if abandoned {
            self.diagnostics.metrics().increment_units_abandoned();
        }
        match tolerated {
            Some(reason) => {
                self.diagnostics
                    .unit_tolerated(&self.id.to_string(), self.label, slot, &reason)
            }
            None => self.diagnostics.metrics().increment_units_filled(),
        }

        if let Some(delivery) = delivery {
            self.deliver(delivery);
        }
    }

    fn take_delivery(
        &self,
        state: &mut BatchState<C>,
        reason: SealReason,
    ) -> Option<Delivery<C::Output>> {
        let collector = state.collector.take()?;
        let on_complete = state.on_complete.take()?;

        let report = BatchReport {
            batch_id: self.id,
            label: self.label,
            units: self.units,
            filled: state.filled,
            tolerated: state.tolerated,
            unsettled: state.pending,
            reason,
        };

        Some((
            on_complete,
            Finalized {
                value: collector.seal(),
                report,
            },
        ))
    }

    fn deliver(&self, (on_complete, finalized): Delivery<C::Output>) {
        let id = self.id.to_string();
        let filled = finalized.report.filled.to_string();
        let tolerated = finalized.report.tolerated.to_string();
        let fields = [
            ("batch", id.as_str()),
            ("filled", filled.as_str()),
            ("label", self.label),
            ("reason", finalized.report.reason.as_str()),
            ("tolerated", tolerated.as_str()),
        ];

        if finalized.report.is_complete() {
            self.diagnostics.metrics().increment_batches_completed();
            self.diagnostics.event(Event::BatchCompleted, &fields);
        } else {
            self.diagnostics.metrics().increment_batches_sealed_early();
            self.diagnostics.event(Event::BatchSealed, &fields);
        }

        on_complete(finalized);
    }

    /// Deliver the collector as it stands. Returns `false` if the batch had
    /// already delivered.
    pub fn seal(&self, reason: SealReason) -> bool {
        let delivery = {
            let mut state = self.lock();
            self.take_delivery(&mut state, reason)
        };
        match delivery {
            Some(delivery) => {
                self.deliver(delivery);
                true
            }
            None => false,
        }
    }
}

impl<C: Collect> fmt::Debug for Batch<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("units", &self.units)
            .field("pending", &self.pending())
            .finish()
    }
}

/// Reporting handle for one unit.
///
/// Consumed by the first report. Dropping it unreported settles the unit as
/// [`UnitOutcome::Abandoned`], so a lost store callback cannot stall the
/// batch.
pub struct UnitHandle<C: Collect> {
    batch: Option<Arc<Batch<C>>>,
    slot: usize,
}

impl<C: Collect> UnitHandle<C> {
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn complete(mut self, outcome: UnitOutcome<C::Item>) {
        if let Some(batch) = self.batch.take() {
            batch.settle(self.slot, outcome);
        }
    }

    pub fn fill(self, item: C::Item) {
        self.complete(UnitOutcome::Filled(item));
    }

    pub fn empty(self) {
        self.complete(UnitOutcome::Empty);
    }

    pub fn fail(self, reason: impl Into<String>) {
        self.complete(UnitOutcome::Failed(reason.into()));
    }
}

impl<C: Collect> Drop for UnitHandle<C> {
    fn drop(&mut self) {
        if let Some(batch) = self.batch.take() {
            batch.settle(self.slot, UnitOutcome::Abandoned);
        }
    }
}

impl<C: Collect> fmt::Debug for UnitHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitHandle")
            .field("slot", &self.slot)
            .field("reported", &self.batch.is_none())
            .finish()
    }
}

trait Sealable: Send + Sync {
    fn seal_now(&self, reason: SealReason) -> bool;
    fn pending_units(&self) -> usize;
}

impl<C: Collect> Sealable for Batch<C> {
    fn seal_now(&self, reason: SealReason) -> bool {
        self.seal(reason)
    }

    fn pending_units(&self) -> usize {
        self.pending()
    }
}

/// Weak, type-erased control over a running batch
#[derive(Clone)]
pub struct BatchControl {
    id: Uuid,
    batch: Weak<dyn Sealable>,
}

impl BatchControl {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Force-seal with `reason`. `false` if the batch already delivered.
    pub fn seal(&self, reason: SealReason) -> bool {
        self.batch
            .upgrade()
            .map(|batch| batch.seal_now(reason))
            .unwrap_or(false)
    }

    pub fn cancel(&self) -> bool {
        self.seal(SealReason::Cancelled)
    }

    /// Units still outstanding; 0 once the batch is gone
    pub fn pending(&self) -> usize {
        self.batch
            .upgrade()
            .map(|batch| batch.pending_units())
            .unwrap_or(0)
    }
}

impl fmt::Debug for BatchControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchControl").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    /// Positional collector over `u32` slots defaulting to 0
    struct Slots(Vec<u32>);

    impl Collect for Slots {
        type Item = u32;
        type Output = Vec<u32>;

        fn slots(&self) -> usize {
            self.0.len()
        }

        fn accept(&mut self, slot: usize, item: u32) {
            self.0[slot] = item;
        }

        fn seal(self) -> Vec<u32> {
            self.0
        }
    }

    fn open(
        n: usize,
        diagnostics: Diagnostics,
    ) -> (Arc<Batch<Slots>>, mpsc::Receiver<Finalized<Vec<u32>>>) {
        let (tx, rx) = mpsc::channel();
        let batch = Batch::open(
            "test",
            Slots(vec![0; n]),
            diagnostics,
            Box::new(move |f: Finalized<Vec<u32>>| {
                let _ = tx.send(f);
            }),
        );
        (batch, rx)
    }

    #[test]
    fn test_completes_after_last_unit() {
        let (batch, rx) = open(3, Diagnostics::default());

        batch.unit(0).fill(10);
        batch.unit(2).empty();
        assert!(rx.try_recv().is_err());
        assert_eq!(batch.pending(), 1);

        batch.unit(1).fill(11);
        let finalized = rx.recv_timeout(Duration::from_secs(1)).unwrap();

        assert_eq!(finalized.value, vec![10, 11, 0]);
        assert_eq!(finalized.report.filled, 2);
        assert_eq!(finalized.report.tolerated, 1);
        assert!(finalized.report.is_complete());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_duplicate_report_ignored() {
        let diagnostics = Diagnostics::default();
        let (batch, rx) = open(2, diagnostics.clone());

        batch.unit(0).fill(1);
        batch.unit(0).fill(99);
        assert_eq!(batch.pending(), 1);

        batch.unit(1).fill(2);
        assert_eq!(rx.recv().unwrap().value, vec![1, 2]);
        assert_eq!(diagnostics.metrics().snapshot().late_completions, 1);
    }

    #[test]
    fn test_dropped_handle_settles_as_abandoned() {
        let diagnostics = Diagnostics::default();
        let (batch, rx) = open(2, diagnostics.clone());

        batch.unit(0).fill(5);
        drop(batch.unit(1));

        let finalized = rx.recv().unwrap();
        assert_eq!(finalized.value, vec![5, 0]);
        assert_eq!(finalized.report.tolerated, 1);
        assert_eq!(diagnostics.metrics().snapshot().units_abandoned, 1);
    }

    #[test]
    fn test_seal_keeps_defaults_and_ignores_late_units() {
        let (batch, rx) = open(3, Diagnostics::default());
        let control = batch.control();

        let late = batch.unit(2);
        batch.unit(0).fill(7);
        assert!(control.cancel());

        let finalized = rx.recv().unwrap();
        assert_eq!(finalized.value, vec![7, 0, 0]);
        assert_eq!(finalized.report.reason, SealReason::Cancelled);
        assert_eq!(finalized.report.unsettled, 2);

        late.fill(3);
        assert!(!control.cancel());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_control_outlives_batch() {
        let (batch, rx) = open(1, Diagnostics::default());
        let control = batch.control();
        batch.unit(0).fill(1);
        drop(batch);

        rx.recv().unwrap();
        assert!(!control.cancel());
        assert_eq!(control.pending(), 0);
    }

    #[test]
    fn test_concurrent_units_fire_once() {
        let (batch, rx) = open(64, Diagnostics::default());

        let handles: Vec<_> = (0..64)
            .map(|slot| {
                let unit = batch.unit(slot);
                thread::spawn(move || unit.fill(slot as u32 + 1))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let finalized = rx.recv().unwrap();
        assert_eq!(finalized.value, (1..=64).collect::<Vec<u32>>());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    #[should_panic(expected = "at least one unit")]
    fn test_empty_batch_is_a_programming_error() {
        let _ = open(0, Diagnostics::default());
    }
}
