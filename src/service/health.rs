//! # Health Service
//!
//! The three commands of the bridge, each as a callback operation that
//! returns immediately with an [`OperationHandle`] and as an async wrapper.
//!
//! Flow of every command:
//!
//! ```text
//! Idle → AuthorizationPending → Denied (error)
//!                             → Granted → QueryingBatch → Complete (result)
//! ```
//!
//! A snapshot skips the gate when `engine.authorize_snapshot` is off.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;
use tokio::sync::oneshot;

use super::errors::{CommandError, CommandResult};
use super::operation::{OperationHandle, Reply, Responder};
use crate::auth::{AuthScope, AuthorizationGate};
use crate::catalog::{AggregationResult, MetricCatalog};
use crate::config::EngineConfig;
use crate::engine::{EkgRecord, FanOutCoordinator, NestedSampleJoiner};
use crate::observability::{Diagnostics, Event, OperationScope};
use crate::store::{
    ClassificationLocale, DayWindow, HealthStore, SampleQuery, SortOrder, StoreHandle,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse the `fetchHealthData` argument.
///
/// Anything but a string is a missing argument; a string that is not a
/// calendar date in `YYYY-MM-DD` form is an invalid date.
pub fn parse_date(arguments: &Value) -> CommandResult<NaiveDate> {
    let input = arguments
        .as_str()
        .ok_or_else(CommandError::missing_argument)?;

    if !has_date_shape(input) {
        return Err(CommandError::invalid_date(input));
    }
    NaiveDate::parse_from_str(input, DATE_FORMAT).map_err(|_| CommandError::invalid_date(input))
}

/// `DDDD-DD-DD` with ASCII digits. chrono alone would accept padded or
/// single-digit fields.
fn has_date_shape(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

#[derive(Debug)]
struct ServiceInner {
    store: StoreHandle,
    catalog: Arc<MetricCatalog>,
    coordinator: FanOutCoordinator,
    gate: AuthorizationGate,
    engine: EngineConfig,
    locale: ClassificationLocale,
    diagnostics: Diagnostics,
}

/// Command layer over a health store
#[derive(Debug, Clone)]
pub struct HealthService {
    inner: Arc<ServiceInner>,
}

impl HealthService {
    pub fn new(
        store: StoreHandle,
        catalog: Arc<MetricCatalog>,
        engine: EngineConfig,
        locale: ClassificationLocale,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                store,
                catalog,
                coordinator: FanOutCoordinator::new(diagnostics.clone()),
                gate: AuthorizationGate::new(diagnostics.clone()),
                engine,
                locale,
                diagnostics,
            }),
        }
    }

    /// Service over the standard catalog with default engine settings
    pub fn with_store(store: Arc<dyn HealthStore>) -> Self {
        Self::new(
            StoreHandle::ready(store),
            Arc::new(MetricCatalog::standard()),
            EngineConfig::default(),
            ClassificationLocale::default(),
            Diagnostics::default(),
        )
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.inner.catalog
    }

    pub fn locale(&self) -> ClassificationLocale {
        self.inner.locale
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.inner.diagnostics
    }

    pub fn store(&self) -> &StoreHandle {
        &self.inner.store
    }

    // ==================
    // Callback operations
    // ==================

    /// Prompt for every catalog quantity type plus electrocardiograms.
    /// Answers `true` or fails with `AUTH_ERROR`.
    pub fn start_request_authorization(&self, reply: Reply<bool>) -> OperationHandle {
        let responder = Responder::new(self.inner.instrument("REQUEST_AUTHORIZATION", reply));
        let handle = OperationHandle::new("requestAuthorization", Arc::clone(&responder));

        let store = self.inner.store.get();
        let operation = handle.clone();
        self.inner.gate.request(
            store.as_ref(),
            &self.inner.catalog,
            AuthScope::All,
            move |result| {
                if !operation.is_pending() {
                    return;
                }
                operation.finish();
                responder.respond(
                    result
                        .map(|()| true)
                        .map_err(|e| CommandError::from_authorization(&e)),
                );
            },
        );
        handle
    }

    /// Daily metric snapshot for the date in `arguments`
    pub fn start_fetch_health_data(
        &self,
        arguments: &Value,
        reply: Reply<AggregationResult>,
    ) -> OperationHandle {
        let responder = Responder::new(self.inner.instrument("FETCH_HEALTH_DATA", reply));
        let handle = OperationHandle::new("fetchHealthData", Arc::clone(&responder));

        let window = parse_date(arguments).and_then(|date| {
            DayWindow::for_date(date, self.inner.engine.utc_offset())
                .ok_or_else(|| CommandError::invalid_date(&date.to_string()))
        });
        let window = match window {
            Ok(window) => window,
            Err(e) => {
                handle.finish();
                responder.respond(Err(e));
                return handle;
            }
        };

        let store = self.inner.store.get();
        if !self.inner.engine.authorize_snapshot {
            self.inner
                .run_snapshot(store.as_ref(), window, &handle, responder);
            return handle;
        }

        let inner = Arc::clone(&self.inner);
        let operation = handle.clone();
        let gated = Arc::clone(&store);
        self.inner.gate.request(
            store.as_ref(),
            &self.inner.catalog,
            AuthScope::Metrics,
            move |result| {
                if !operation.is_pending() {
                    return;
                }
                match result {
                    Ok(()) => inner.run_snapshot(gated.as_ref(), window, &operation, responder),
                    Err(e) => {
                        operation.finish();
                        responder.respond(Err(CommandError::from_gate(&e, "activity data")));
                    }
                }
            },
        );
        handle
    }

    /// Every electrocardiogram, most recent first, each with its complete
    /// voltage sequence
    pub fn start_get_ekg(&self, reply: Reply<Vec<EkgRecord>>) -> OperationHandle {
        let responder = Responder::new(self.inner.instrument("GET_EKG", reply));
        let handle = OperationHandle::new("getEKG", Arc::clone(&responder));

        let store = self.inner.store.get();
        let inner = Arc::clone(&self.inner);
        let operation = handle.clone();
        let gated = Arc::clone(&store);
        self.inner.gate.request(
            store.as_ref(),
            &self.inner.catalog,
            AuthScope::Electrocardiogram,
            move |result| {
                if !operation.is_pending() {
                    return;
                }
                match result {
                    Ok(()) => inner.enumerate(gated, operation, responder),
                    Err(e) => {
                        operation.finish();
                        responder.respond(Err(CommandError::from_gate(&e, "electrocardiograms")));
                    }
                }
            },
        );
        handle
    }

    // ==================
    // Async operations
    // ==================

    pub async fn request_authorization(&self) -> CommandResult<bool> {
        let (tx, rx) = oneshot::channel();
        let handle = self.start_request_authorization(Box::new(move |result| {
            let _ = tx.send(result);
        }));
        self.await_reply(handle, rx).await
    }

    pub async fn fetch_health_data(&self, arguments: &Value) -> CommandResult<AggregationResult> {
        let (tx, rx) = oneshot::channel();
        let handle = self.start_fetch_health_data(
            arguments,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        );
        self.await_reply(handle, rx).await
    }

    pub async fn get_ekg(&self) -> CommandResult<Vec<EkgRecord>> {
        let (tx, rx) = oneshot::channel();
        let handle = self.start_get_ekg(Box::new(move |result| {
            let _ = tx.send(result);
        }));
        self.await_reply(handle, rx).await
    }

    /// Wait for the reply, expiring the operation at the configured
    /// deadline. Expiry answers `TIMEOUT` before the batch starts and seals
    /// a running batch with its defaults.
    async fn await_reply<T>(
        &self,
        handle: OperationHandle,
        mut rx: oneshot::Receiver<CommandResult<T>>,
    ) -> CommandResult<T> {
        if let Some(deadline) = self.inner.engine.deadline() {
            match tokio::time::timeout(deadline, &mut rx).await {
                Ok(reply) => return reply.unwrap_or_else(|_| Err(dropped_reply())),
                Err(_) => {
                    handle.expire();
                }
            }
        }
        rx.await.unwrap_or_else(|_| Err(dropped_reply()))
    }
}

fn dropped_reply() -> CommandError {
    CommandError::internal("Operation ended without a reply")
}

impl ServiceInner {
    /// Wrap `reply` with the command's operation scope and counters
    fn instrument<T: Send + 'static>(&self, name: &'static str, reply: Reply<T>) -> Reply<T> {
        let scope = OperationScope::new(name);
        let metrics = self.diagnostics.shared_metrics();
        Box::new(move |result: CommandResult<T>| {
            match &result {
                Ok(_) => {
                    metrics.increment_commands_succeeded();
                    scope.complete();
                }
                Err(e) => {
                    metrics.increment_commands_failed();
                    scope.fail(e.code_str());
                }
            }
            reply(result);
        })
    }

    fn run_snapshot(
        &self,
        store: &dyn HealthStore,
        window: DayWindow,
        handle: &OperationHandle,
        responder: Arc<Responder<AggregationResult>>,
    ) {
        let operation = handle.clone();
        let control = self.coordinator.run_metrics(
            store,
            &self.catalog,
            window,
            Box::new(move |finalized| {
                operation.finish();
                responder.respond(Ok(finalized.value));
            }),
        );
        handle.attach(control);
    }

    fn enumerate(
        self: Arc<Self>,
        store: Arc<dyn HealthStore>,
        handle: OperationHandle,
        responder: Arc<Responder<Vec<EkgRecord>>>,
    ) {
        let query = SampleQuery {
            order: SortOrder::StartDateDescending,
            limit: self.engine.ecg_sample_limit,
        };

        let inner = Arc::clone(&self);
        let sampled = Arc::clone(&store);
        store.execute_samples(
            query,
            Box::new(move |result| {
                if !handle.is_pending() {
                    return;
                }
                let samples = match result {
                    Ok(samples) => samples,
                    Err(e) => {
                        handle.finish();
                        responder.respond(Err(CommandError::from_store(&e)));
                        return;
                    }
                };

                let count = samples.len().to_string();
                inner
                    .diagnostics
                    .event(Event::EnumerationComplete, &[("samples", count.as_str())]);

                if samples.is_empty() {
                    handle.finish();
                    responder.respond(Ok(Vec::new()));
                    return;
                }

                let joiner = NestedSampleJoiner::new(sampled, inner.diagnostics.clone());
                let operation = handle.clone();
                let control = inner.coordinator.run_records(
                    &joiner,
                    &samples,
                    Box::new(move |finalized| {
                        operation.finish();
                        responder.respond(Ok(finalized.value));
                    }),
                );
                handle.attach(control);
            }),
        );
    }
}
