//! # Nested Sample Joiner
//!
//! Turns one sample's incremental voltage stream into a single completion
//! carrying the whole ordered sequence.
//!
//! The stream for one sample is delivered serially, so the accumulator is
//! owned by the stream callback itself and needs no lock. After the terminal
//! event the accumulator is sealed and ignores anything further.

use std::mem;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::observability::{Diagnostics, Event};
use crate::store::{EcgSample, HealthStore, SampleId, StoreError, VoltageEvent};

pub type JoinResult<T> = Result<T, JoinError>;

/// Why a voltage stream produced no sequence
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("Permission to read voltages was denied")]
    PermissionDenied,

    #[error("Voltage query failed: {0}")]
    QueryFailed(String),
}

impl From<StoreError> for JoinError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::PermissionDenied => JoinError::PermissionDenied,
            other => JoinError::QueryFailed(other.to_string()),
        }
    }
}

type JoinCallback = Box<dyn FnOnce(JoinResult<Vec<f64>>) + Send + 'static>;

struct VoltageAccumulator {
    sample: SampleId,
    readings: Vec<f64>,
    done: Option<JoinCallback>,
    diagnostics: Diagnostics,
}

impl VoltageAccumulator {
    fn push(&mut self, event: VoltageEvent) {
        if self.done.is_none() {
            return;
        }

        match event {
            VoltageEvent::Measurement { lead_i: Some(microvolts) } => {
                self.readings.push(microvolts);
            }
            VoltageEvent::Measurement { lead_i: None } => {}
            VoltageEvent::Done => {
                let readings = mem::take(&mut self.readings);
                let sample = self.sample.to_string();
                let count = readings.len().to_string();
                self.diagnostics
                    .metrics()
                    .add_voltage_readings(readings.len() as u64);
                self.diagnostics.event(
                    Event::VoltageStreamSealed,
                    &[("readings", count.as_str()), ("sample", sample.as_str())],
                );
                if let Some(done) = self.done.take() {
                    done(Ok(readings));
                }
            }
            VoltageEvent::Failed(e) => {
                self.readings.clear();
                let sample = self.sample.to_string();
                let reason = e.to_string();
                self.diagnostics.event(
                    Event::VoltageStreamFailed,
                    &[("reason", reason.as_str()), ("sample", sample.as_str())],
                );
                if let Some(done) = self.done.take() {
                    done(Err(e.into()));
                }
            }
        }
    }
}

/// Collects voltage streams from a store
#[derive(Clone)]
pub struct NestedSampleJoiner {
    store: Arc<dyn HealthStore>,
    diagnostics: Diagnostics,
}

impl NestedSampleJoiner {
    pub fn new(store: Arc<dyn HealthStore>, diagnostics: Diagnostics) -> Self {
        Self { store, diagnostics }
    }

    /// Start the voltage stream for `sample`; `done` receives the sealed
    /// sequence or the failure, exactly once.
    ///
    /// If the store drops the stream without a terminal event, `done` is
    /// dropped uninvoked.
    pub fn collect<F>(&self, sample: &EcgSample, done: F)
    where
        F: FnOnce(JoinResult<Vec<f64>>) + Send + 'static,
    {
        let mut accumulator = VoltageAccumulator {
            sample: sample.id,
            readings: Vec::new(),
            done: Some(Box::new(done)),
            diagnostics: self.diagnostics.clone(),
        };
        self.store
            .execute_voltages(sample, Box::new(move |event| accumulator.push(event)));
    }

    /// Awaitable form of [`collect`](Self::collect)
    pub async fn join(&self, sample: &EcgSample) -> JoinResult<Vec<f64>> {
        let (tx, rx) = oneshot::channel();
        self.collect(sample, move |result| {
            let _ = tx.send(result);
        });
        rx.await
            .unwrap_or_else(|_| Err(JoinError::QueryFailed("voltage stream dropped".into())))
    }
}
