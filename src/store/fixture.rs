//! # Fixture Store
//!
//! In-memory `HealthStore` backed by a JSON fixture. Every callback is
//! delivered from a freshly spawned worker thread after an optional delay
//! plus random jitter, so callers see genuinely concurrent, out-of-order
//! push delivery.
//!
//! Stalled queries keep their callbacks parked forever, which models a
//! store that never answers.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::errors::{StoreError, StoreResult};
use super::types::{
    Classification, DataType, EcgSample, SampleId, SampleQuery, SortOrder, StatisticsOutcome,
    StatisticsQuery, VoltageEvent,
};
use super::{
    AuthorizationCallback, HealthStore, SamplesCallback, StatisticsCallback, VoltageCallback,
};
use crate::catalog::{MetricKind, Quantity};

/// Outcome of the authorization prompt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum AuthorizationFixture {
    #[default]
    Granted,
    Denied,
    Error { message: String },
}

/// Recorded value of one metric on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DayEntry {
    Quantity(Quantity),
    Failure { error: String },
}

/// One recorded electrocardiogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcgFixture {
    #[serde(default = "SampleId::new")]
    pub id: SampleId,
    pub start: DateTime<Utc>,
    pub classification: Classification,
    #[serde(default)]
    pub average_heart_rate: Option<f64>,
    /// Lead-I readings in µV; `null` is a measurement without lead I
    #[serde(default)]
    pub voltages: Vec<Option<f64>>,
    /// Fail the voltage stream after delivering the readings
    #[serde(default)]
    pub voltage_error: Option<String>,
    /// Extra delay before the voltage stream starts
    #[serde(default)]
    pub delay_ms: u64,
}

/// Complete fixture document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub authorization: AuthorizationFixture,
    /// Kinds the store reports as unsupported
    #[serde(default)]
    pub unsupported: Vec<MetricKind>,
    /// Kinds whose statistics queries never answer
    #[serde(default)]
    pub stalled: Vec<MetricKind>,
    /// Enumeration never answers
    #[serde(default)]
    pub stall_enumeration: bool,
    #[serde(default)]
    pub enumeration_error: Option<String>,
    #[serde(default)]
    pub days: BTreeMap<NaiveDate, BTreeMap<MetricKind, DayEntry>>,
    #[serde(default)]
    pub ecg: Vec<EcgFixture>,
    /// Upper bound of the random delay added to every delivery
    #[serde(default)]
    pub jitter_ms: u64,
}

fn default_available() -> bool {
    true
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            available: true,
            authorization: AuthorizationFixture::default(),
            unsupported: Vec::new(),
            stalled: Vec::new(),
            stall_enumeration: false,
            enumeration_error: None,
            days: BTreeMap::new(),
            ecg: Vec::new(),
            jitter_ms: 0,
        }
    }
}

impl Fixture {
    /// Load a fixture from a JSON file
    pub fn load(path: &Path) -> StoreResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StoreError::Fixture(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| StoreError::Fixture(format!("Invalid fixture JSON: {}", e)))
    }
}

/// Number of queries issued against the store, per query type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryCounts {
    pub authorizations: usize,
    pub statistics: usize,
    pub enumerations: usize,
    pub voltage_streams: usize,
}

#[derive(Debug, Default)]
struct Counters {
    authorizations: AtomicUsize,
    statistics: AtomicUsize,
    enumerations: AtomicUsize,
    voltage_streams: AtomicUsize,
}

/// Callbacks of stalled queries, held so they are never dropped
#[derive(Default)]
struct Parked {
    statistics: Vec<StatisticsCallback>,
    samples: Vec<SamplesCallback>,
}

/// Fixture-backed store with threaded push delivery
pub struct FixtureStore {
    fixture: Arc<Fixture>,
    counters: Counters,
    parked: Mutex<Parked>,
}

impl FixtureStore {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            fixture: Arc::new(fixture),
            counters: Counters::default(),
            parked: Mutex::new(Parked::default()),
        }
    }

    pub fn from_path(path: &Path) -> StoreResult<Self> {
        Ok(Self::new(Fixture::load(path)?))
    }

    pub fn fixture(&self) -> &Fixture {
        &self.fixture
    }

    pub fn counts(&self) -> QueryCounts {
        QueryCounts {
            authorizations: self.counters.authorizations.load(Ordering::SeqCst),
            statistics: self.counters.statistics.load(Ordering::SeqCst),
            enumerations: self.counters.enumerations.load(Ordering::SeqCst),
            voltage_streams: self.counters.voltage_streams.load(Ordering::SeqCst),
        }
    }

    /// Number of callbacks held by stalled queries
    pub fn parked(&self) -> usize {
        self.parked
            .lock()
            .map(|p| p.statistics.len() + p.samples.len())
            .unwrap_or(0)
    }

    fn delay(&self, extra_ms: u64) -> Duration {
        let jitter = if self.fixture.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.fixture.jitter_ms)
        } else {
            0
        };
        Duration::from_millis(extra_ms + jitter)
    }

    fn deliver<F>(&self, extra_ms: u64, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let delay = self.delay(extra_ms);
        thread::spawn(move || {
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            f();
        });
    }

    fn statistics_outcome(fixture: &Fixture, query: &StatisticsQuery) -> StatisticsOutcome {
        let entry = fixture
            .days
            .get(&query.window.date)
            .and_then(|day| day.get(&query.kind));

        match entry {
            None => StatisticsOutcome::NoData,
            Some(DayEntry::Failure { error }) => {
                StatisticsOutcome::Failed(StoreError::QueryFailed(error.clone()))
            }
            Some(DayEntry::Quantity(quantity)) => match quantity.value_in(query.unit) {
                Some(sum) => StatisticsOutcome::Sum(sum),
                None => StatisticsOutcome::Failed(StoreError::IncompatibleUnit {
                    from: quantity.unit.to_string(),
                    to: query.unit.to_string(),
                }),
            },
        }
    }

    fn enumerate(fixture: &Fixture, query: SampleQuery) -> Vec<EcgSample> {
        let mut samples: Vec<EcgSample> = fixture
            .ecg
            .iter()
            .map(|e| EcgSample {
                id: e.id,
                start: e.start,
                classification: e.classification,
                average_heart_rate: e.average_heart_rate,
            })
            .collect();

        match query.order {
            SortOrder::StartDateDescending => samples.sort_by(|a, b| b.start.cmp(&a.start)),
            SortOrder::StartDateAscending => samples.sort_by(|a, b| a.start.cmp(&b.start)),
        }
        if let Some(limit) = query.limit {
            samples.truncate(limit);
        }
        samples
    }
}

impl HealthStore for FixtureStore {
    fn is_available(&self) -> bool {
        self.fixture.available
    }

    fn supports(&self, kind: MetricKind) -> bool {
        !self.fixture.unsupported.contains(&kind)
    }

    fn request_authorization(&self, _read: &[DataType], done: AuthorizationCallback) {
        self.counters.authorizations.fetch_add(1, Ordering::SeqCst);
        let result = match &self.fixture.authorization {
            AuthorizationFixture::Granted => Ok(true),
            AuthorizationFixture::Denied => Ok(false),
            AuthorizationFixture::Error { message } => {
                Err(StoreError::AuthorizationFailed(message.clone()))
            }
        };
        self.deliver(0, move || done(result));
    }

    fn execute_statistics(&self, query: StatisticsQuery, done: StatisticsCallback) {
        self.counters.statistics.fetch_add(1, Ordering::SeqCst);

        if self.fixture.stalled.contains(&query.kind) {
            if let Ok(mut parked) = self.parked.lock() {
                parked.statistics.push(done);
            }
            return;
        }

        let outcome = if self.supports(query.kind) {
            Self::statistics_outcome(&self.fixture, &query)
        } else {
            StatisticsOutcome::Failed(StoreError::UnsupportedType(query.kind.to_string()))
        };
        self.deliver(0, move || done(outcome));
    }

    fn execute_samples(&self, query: SampleQuery, done: SamplesCallback) {
        self.counters.enumerations.fetch_add(1, Ordering::SeqCst);

        if self.fixture.stall_enumeration {
            if let Ok(mut parked) = self.parked.lock() {
                parked.samples.push(done);
            }
            return;
        }

        let result = match &self.fixture.enumeration_error {
            Some(message) => Err(StoreError::QueryFailed(message.clone())),
            None => Ok(Self::enumerate(&self.fixture, query)),
        };
        self.deliver(0, move || done(result));
    }

    fn execute_voltages(&self, sample: &EcgSample, mut on_event: VoltageCallback) {
        self.counters.voltage_streams.fetch_add(1, Ordering::SeqCst);

        let Some(recording) = self.fixture.ecg.iter().find(|e| e.id == sample.id).cloned() else {
            let id = sample.id;
            self.deliver(0, move || {
                on_event(VoltageEvent::Failed(StoreError::QueryFailed(format!(
                    "unknown sample {}",
                    id
                ))))
            });
            return;
        };

        // One thread per stream keeps the stream's own events ordered.
        self.deliver(recording.delay_ms, move || {
            for lead_i in recording.voltages {
                on_event(VoltageEvent::Measurement { lead_i });
            }
            match recording.voltage_error {
                Some(message) => on_event(VoltageEvent::Failed(StoreError::QueryFailed(message))),
                None => on_event(VoltageEvent::Done),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Aggregation, Unit};
    use crate::store::DayWindow;
    use chrono::FixedOffset;
    use std::sync::mpsc;

    const WAIT: Duration = Duration::from_secs(5);

    fn fixture_json() -> &'static str {
        r#"{
            "days": {
                "2024-03-01": {
                    "step_count": {"value": 8421, "unit": "count"},
                    "stand_time": {"value": 600, "unit": "minute"},
                    "active_energy_burned": {"error": "sensor offline"}
                }
            },
            "ecg": [
                {"start": "2024-03-01T08:00:00Z", "classification": "sinus_rhythm",
                 "voltages": [1.0, null, 2.0]},
                {"start": "2024-03-02T08:00:00Z", "classification": "unknown"}
            ]
        }"#
    }

    fn store() -> FixtureStore {
        FixtureStore::new(serde_json::from_str(fixture_json()).unwrap())
    }

    fn query(kind: MetricKind, unit: Unit) -> StatisticsQuery {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        StatisticsQuery {
            kind,
            aggregation: Aggregation::CumulativeSum,
            unit,
            window: DayWindow::for_date(date, FixedOffset::east_opt(0)).unwrap(),
        }
    }

    fn run_statistics(store: &FixtureStore, q: StatisticsQuery) -> StatisticsOutcome {
        let (tx, rx) = mpsc::channel();
        store.execute_statistics(q, Box::new(move |o| tx.send(o).unwrap()));
        rx.recv_timeout(WAIT).unwrap()
    }

    #[test]
    fn test_statistics_converts_units() {
        let store = store();
        assert_eq!(
            run_statistics(&store, query(MetricKind::StandTime, Unit::Hour)),
            StatisticsOutcome::Sum(10.0)
        );
        assert_eq!(
            run_statistics(&store, query(MetricKind::StepCount, Unit::Count)),
            StatisticsOutcome::Sum(8421.0)
        );
    }

    #[test]
    fn test_statistics_missing_and_failed() {
        let store = store();
        assert_eq!(
            run_statistics(&store, query(MetricKind::ExerciseTime, Unit::Minute)),
            StatisticsOutcome::NoData
        );
        assert!(matches!(
            run_statistics(&store, query(MetricKind::ActiveEnergyBurned, Unit::Kilocalorie)),
            StatisticsOutcome::Failed(StoreError::QueryFailed(_))
        ));
        assert!(matches!(
            run_statistics(&store, query(MetricKind::StepCount, Unit::Meter)),
            StatisticsOutcome::Failed(StoreError::IncompatibleUnit { .. })
        ));
        assert_eq!(store.counts().statistics, 3);
    }

    #[test]
    fn test_enumeration_sorted_descending() {
        let store = store();
        let (tx, rx) = mpsc::channel();
        store.execute_samples(SampleQuery::default(), Box::new(move |r| tx.send(r).unwrap()));
        let samples = rx.recv_timeout(WAIT).unwrap().unwrap();

        assert_eq!(samples.len(), 2);
        assert!(samples[0].start > samples[1].start);
    }

    #[test]
    fn test_voltage_stream_in_order_then_done() {
        let store = store();
        let sample = FixtureStore::enumerate(store.fixture(), SampleQuery::default())
            .pop()
            .unwrap();

        let (tx, rx) = mpsc::channel();
        store.execute_voltages(&sample, Box::new(move |e| tx.send(e).unwrap()));

        let events: Vec<_> = (0..4).map(|_| rx.recv_timeout(WAIT).unwrap()).collect();
        assert_eq!(
            events,
            vec![
                VoltageEvent::Measurement { lead_i: Some(1.0) },
                VoltageEvent::Measurement { lead_i: None },
                VoltageEvent::Measurement { lead_i: Some(2.0) },
                VoltageEvent::Done,
            ]
        );
    }

    #[test]
    fn test_stalled_statistics_are_parked() {
        let fixture = Fixture {
            stalled: vec![MetricKind::StepCount],
            ..Fixture::default()
        };
        let store = FixtureStore::new(fixture);
        store.execute_statistics(query(MetricKind::StepCount, Unit::Count), Box::new(|_| {}));
        assert_eq!(store.parked(), 1);
    }

    #[test]
    fn test_load_fixture_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.json");
        fs::write(&path, fixture_json()).unwrap();

        let store = FixtureStore::from_path(&path).unwrap();
        assert_eq!(store.fixture().ecg.len(), 2);

        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            FixtureStore::from_path(&path),
            Err(StoreError::Fixture(_))
        ));
    }
}
