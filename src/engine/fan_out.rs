//! # Fan-out Coordinator
//!
//! Issues one unit per request, each with its own reporting handle, and
//! delivers the merged collector exactly once when every unit has settled.
//!
//! Unit failures never abort the batch: the unit's slot keeps its default.
//! Nothing is retried.

use crate::catalog::{AggregationResult, MetricCatalog, MetricRequest};
use crate::observability::{Diagnostics, Event};
use crate::store::{DayWindow, EcgSample, HealthStore, StatisticsOutcome, StatisticsQuery};

use super::batch::{Batch, BatchControl, Collect, Completion, UnitHandle, UnitOutcome};
use super::collectors::{MetricCollector, RecordCollector};
use super::joiner::NestedSampleJoiner;
use super::record::EkgRecord;

#[derive(Debug, Clone, Default)]
pub struct FanOutCoordinator {
    diagnostics: Diagnostics,
}

impl FanOutCoordinator {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self { diagnostics }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Run one batch.
    ///
    /// `issue` is called once per request, in order, with the handle for
    /// that request's slot. It must start the unit's query and return; the
    /// handle reports whenever the query answers. `on_complete` may run on
    /// whichever thread settles the last unit, or inside this call if every
    /// unit settles synchronously.
    ///
    /// # Panics
    ///
    /// Panics if `requests` is empty or its length differs from the
    /// collector's slot count.
    pub fn run<C, R, I>(
        &self,
        label: &'static str,
        requests: &[R],
        collector: C,
        mut issue: I,
        on_complete: Completion<C::Output>,
    ) -> BatchControl
    where
        C: Collect,
        I: FnMut(&R, UnitHandle<C>),
    {
        assert!(!requests.is_empty(), "fan-out '{}' issued with no requests", label);
        assert_eq!(
            requests.len(),
            collector.slots(),
            "fan-out '{}' request count must match collector slots",
            label
        );

        let batch = Batch::open(label, collector, self.diagnostics.clone(), on_complete);
        let control = batch.control();

        let id = batch.id().to_string();
        let units = requests.len().to_string();
        self.diagnostics.event(
            Event::BatchOpened,
            &[("batch", id.as_str()), ("label", label), ("units", units.as_str())],
        );

        for (slot, request) in requests.iter().enumerate() {
            issue(request, batch.unit(slot));
        }

        control
    }

    /// One statistics query per catalog entry over `window`.
    ///
    /// Kinds the store does not support settle immediately without a query.
    pub fn run_metrics(
        &self,
        store: &dyn HealthStore,
        catalog: &MetricCatalog,
        window: DayWindow,
        on_complete: Completion<AggregationResult>,
    ) -> BatchControl {
        self.run(
            "metrics",
            catalog.requests(),
            MetricCollector::new(catalog),
            |request: &MetricRequest, unit: UnitHandle<MetricCollector>| {
                if !store.supports(request.kind) {
                    unit.complete(UnitOutcome::Unsupported);
                    return;
                }

                let query = StatisticsQuery {
                    kind: request.kind,
                    aggregation: request.aggregation,
                    unit: request.unit,
                    window,
                };
                let request = request.clone();
                store.execute_statistics(
                    query,
                    Box::new(move |outcome| match outcome {
                        StatisticsOutcome::Sum(sum) => unit.fill(request.value_from_sum(sum)),
                        StatisticsOutcome::NoData => unit.empty(),
                        StatisticsOutcome::Failed(e) => unit.fail(e.to_string()),
                    }),
                );
            },
            on_complete,
        )
    }

    /// One joiner per sample; record `i` is sample `i`.
    pub fn run_records(
        &self,
        joiner: &NestedSampleJoiner,
        samples: &[EcgSample],
        on_complete: Completion<Vec<EkgRecord>>,
    ) -> BatchControl {
        self.run(
            "records",
            samples,
            RecordCollector::new(samples),
            |sample: &EcgSample, unit: UnitHandle<RecordCollector>| {
                joiner.collect(sample, move |result| match result {
                    Ok(voltages) => unit.fill(voltages),
                    Err(e) => unit.fail(e.to_string()),
                });
            },
            on_complete,
        )
    }
}
