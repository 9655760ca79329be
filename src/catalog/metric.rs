//! Metric declarations

use std::fmt;

use serde::{Deserialize, Serialize};

use super::units::Unit;

/// Quantity types the store can aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    StepCount,
    DistanceWalkingRunning,
    ActiveEnergyBurned,
    ExerciseTime,
    StandTime,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::StepCount => "step_count",
            MetricKind::DistanceWalkingRunning => "distance_walking_running",
            MetricKind::ActiveEnergyBurned => "active_energy_burned",
            MetricKind::ExerciseTime => "exercise_time",
            MetricKind::StandTime => "stand_time",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a statistics sum is aggregated over the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    CumulativeSum,
}

/// Numeric shape of a result value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Truncated toward zero
    Integer,
    Float,
}

/// A single result value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
}

impl MetricValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            MetricValue::Int(v) => *v as f64,
            MetricValue::Float(v) => *v,
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            MetricValue::Int(_) => ValueKind::Integer,
            MetricValue::Float(_) => ValueKind::Float,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Int(v) => write!(f, "{}", v),
            MetricValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// One catalog entry: which quantity to query and where its value lands
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRequest {
    pub kind: MetricKind,
    pub aggregation: Aggregation,
    /// Unit the store must report the sum in
    pub unit: Unit,
    pub value_kind: ValueKind,
    pub result_key: &'static str,
    /// Extra output keys that receive the same value as `result_key`
    pub mirror_keys: &'static [&'static str],
    pub default: MetricValue,
}

impl MetricRequest {
    /// Build the output value from a raw sum already expressed in `self.unit`
    pub fn value_from_sum(&self, sum: f64) -> MetricValue {
        match self.value_kind {
            ValueKind::Integer => MetricValue::Int(sum.trunc() as i64),
            ValueKind::Float => MetricValue::Float(sum),
        }
    }

    /// All keys this request writes, primary key first
    pub fn output_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.result_key).chain(self.mirror_keys.iter().copied())
    }
}
