//! # Health Store Boundary
//!
//! The store is the push-style query subsystem the engine is driven by.
//! Every query takes a callback and returns immediately; the store invokes
//! the callback later, on a worker context of its own choosing, possibly
//! concurrently with callbacks of other queries.
//!
//! Delivery contract:
//! - authorization, statistics and enumeration callbacks fire exactly once
//! - a voltage stream delivers zero or more `Measurement`s in order, then
//!   exactly one `Done` or `Failed`
//!
//! A callback the store drops without invoking is treated by the engine as a
//! settled, tolerated failure.

pub mod errors;
pub mod fixture;
pub mod types;

pub use errors::{StoreError, StoreResult};
pub use fixture::{Fixture, FixtureStore, QueryCounts};
pub use types::{
    Classification, ClassificationLocale, DataType, DayWindow, EcgSample, SampleId, SampleQuery,
    SortOrder, StatisticsOutcome, StatisticsQuery, VoltageEvent,
};

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::catalog::MetricKind;

pub type AuthorizationCallback = Box<dyn FnOnce(StoreResult<bool>) + Send + 'static>;
pub type StatisticsCallback = Box<dyn FnOnce(StatisticsOutcome) + Send + 'static>;
pub type SamplesCallback = Box<dyn FnOnce(StoreResult<Vec<EcgSample>>) + Send + 'static>;
pub type VoltageCallback = Box<dyn FnMut(VoltageEvent) + Send + 'static>;

/// Asynchronous health data source
pub trait HealthStore: Send + Sync {
    /// Whether health data exists on this platform at all
    fn is_available(&self) -> bool;

    /// Whether the store knows how to query `kind`
    fn supports(&self, kind: MetricKind) -> bool;

    /// Ask for read access to `read`. `Ok(false)` means the user declined.
    fn request_authorization(&self, read: &[DataType], done: AuthorizationCallback);

    /// Run one cumulative statistics query
    fn execute_statistics(&self, query: StatisticsQuery, done: StatisticsCallback);

    /// Enumerate electrocardiogram samples
    fn execute_samples(&self, query: SampleQuery, done: SamplesCallback);

    /// Stream the voltage measurements of one sample
    fn execute_voltages(&self, sample: &EcgSample, on_event: VoltageCallback);
}

type StoreFactory = dyn Fn() -> Arc<dyn HealthStore> + Send + Sync;

/// Process-wide, lazily initialized store handle.
///
/// Clones share the same underlying store; the factory runs at most once.
#[derive(Clone)]
pub struct StoreHandle {
    cell: Arc<OnceLock<Arc<dyn HealthStore>>>,
    factory: Arc<StoreFactory>,
}

impl StoreHandle {
    /// Handle whose store is created on first use
    pub fn lazy<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<dyn HealthStore> + Send + Sync + 'static,
    {
        Self {
            cell: Arc::new(OnceLock::new()),
            factory: Arc::new(factory),
        }
    }

    /// Handle around an existing store
    pub fn ready(store: Arc<dyn HealthStore>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Arc::clone(&store));
        Self {
            cell: Arc::new(cell),
            factory: Arc::new(move || Arc::clone(&store)),
        }
    }

    pub fn get(&self) -> Arc<dyn HealthStore> {
        Arc::clone(self.cell.get_or_init(|| (self.factory)()))
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_lazy_handle_initializes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handle = StoreHandle::lazy(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(FixtureStore::new(Fixture::default())) as Arc<dyn HealthStore>
        });

        assert!(!handle.is_initialized());
        let clone = handle.clone();
        let a = handle.get();
        let b = clone.get();

        assert!(handle.is_initialized());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ready_handle() {
        let store: Arc<dyn HealthStore> = Arc::new(FixtureStore::new(Fixture::default()));
        let handle = StoreHandle::ready(Arc::clone(&store));
        assert!(handle.is_initialized());
        assert!(Arc::ptr_eq(&handle.get(), &store));
    }
}
