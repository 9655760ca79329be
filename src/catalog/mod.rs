//! Metric catalog
//!
//! Static declaration of the metrics a daily snapshot reports: which
//! quantity is queried, which unit it is read in, which key(s) it fills and
//! the value used when the query yields nothing.
//!
//! The catalog is built once and shared read-only. Key uniqueness is checked
//! at construction so the aggregation engine can rely on it.

mod metric;
mod units;

pub use metric::{Aggregation, MetricKind, MetricRequest, MetricValue, ValueKind};
pub use units::{Dimension, Quantity, Unit};

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use thiserror::Error;

/// Output of a snapshot: output key to value
pub type AggregationResult = BTreeMap<String, MetricValue>;

/// Catalog construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Catalog must declare at least one metric")]
    Empty,

    #[error("Duplicate output key: {0}")]
    DuplicateKey(String),

    #[error("Default for '{0}' does not match its value kind")]
    DefaultKindMismatch(String),
}

/// Immutable list of metric requests with unique output keys
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    requests: Vec<MetricRequest>,
}

impl MetricCatalog {
    /// Build a catalog, rejecting empty lists and duplicate keys
    pub fn new(requests: Vec<MetricRequest>) -> Result<Self, CatalogError> {
        if requests.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for request in &requests {
            if request.default.kind() != request.value_kind {
                return Err(CatalogError::DefaultKindMismatch(
                    request.result_key.to_string(),
                ));
            }
            for key in request.output_keys() {
                if !seen.insert(key) {
                    return Err(CatalogError::DuplicateKey(key.to_string()));
                }
            }
        }

        Ok(Self { requests })
    }

    /// The daily activity catalog.
    ///
    /// Active energy fills both `calories` and `moveCalories`.
    pub fn standard() -> Self {
        let requests = vec![
            MetricRequest {
                kind: MetricKind::StepCount,
                aggregation: Aggregation::CumulativeSum,
                unit: Unit::Count,
                value_kind: ValueKind::Integer,
                result_key: "steps",
                mirror_keys: &[],
                default: MetricValue::Int(0),
            },
            MetricRequest {
                kind: MetricKind::DistanceWalkingRunning,
                aggregation: Aggregation::CumulativeSum,
                unit: Unit::Meter,
                value_kind: ValueKind::Float,
                result_key: "distance",
                mirror_keys: &[],
                default: MetricValue::Float(0.0),
            },
            MetricRequest {
                kind: MetricKind::ActiveEnergyBurned,
                aggregation: Aggregation::CumulativeSum,
                unit: Unit::Kilocalorie,
                value_kind: ValueKind::Float,
                result_key: "calories",
                mirror_keys: &["moveCalories"],
                default: MetricValue::Float(0.0),
            },
            MetricRequest {
                kind: MetricKind::ExerciseTime,
                aggregation: Aggregation::CumulativeSum,
                unit: Unit::Minute,
                value_kind: ValueKind::Integer,
                result_key: "exerciseMinutes",
                mirror_keys: &[],
                default: MetricValue::Int(0),
            },
            MetricRequest {
                kind: MetricKind::StandTime,
                aggregation: Aggregation::CumulativeSum,
                unit: Unit::Hour,
                value_kind: ValueKind::Integer,
                result_key: "standHours",
                mirror_keys: &[],
                default: MetricValue::Int(0),
            },
        ];

        match Self::new(requests) {
            Ok(catalog) => catalog,
            Err(e) => panic!("standard catalog is malformed: {}", e),
        }
    }

    /// Process-wide standard catalog, built on first use
    pub fn global() -> &'static MetricCatalog {
        static CATALOG: OnceLock<MetricCatalog> = OnceLock::new();
        CATALOG.get_or_init(MetricCatalog::standard)
    }

    pub fn requests(&self) -> &[MetricRequest] {
        &self.requests
    }

    /// Quantity types the catalog reads
    pub fn kinds(&self) -> Vec<MetricKind> {
        self.requests.iter().map(|r| r.kind).collect()
    }

    /// Every output key, in declaration order
    pub fn output_keys(&self) -> Vec<&'static str> {
        self.requests.iter().flat_map(|r| r.output_keys()).collect()
    }

    /// Result pre-populated with every key at its default
    pub fn defaults(&self) -> AggregationResult {
        let mut result = AggregationResult::new();
        for request in &self.requests {
            for key in request.output_keys() {
                result.insert(key.to_string(), request.default);
            }
        }
        result
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
