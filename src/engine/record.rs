//! Finalized electrocardiogram records

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::store::{Classification, ClassificationLocale, EcgSample};

/// One recording with its complete voltage sequence
#[derive(Debug, Clone, PartialEq)]
pub struct EkgRecord {
    pub timestamp: DateTime<Utc>,
    pub classification: Classification,
    /// Beats per minute, 0 when the recording has none
    pub average_heart_rate: f64,
    /// Lead-I voltages in µV, in delivery order
    pub voltages: Vec<f64>,
}

impl EkgRecord {
    /// Record for `sample` with an empty voltage sequence
    pub fn from_sample(sample: &EcgSample) -> Self {
        Self {
            timestamp: sample.start,
            classification: sample.classification,
            average_heart_rate: sample.average_heart_rate.unwrap_or(0.0),
            voltages: Vec::new(),
        }
    }

    pub fn to_wire(&self, locale: ClassificationLocale) -> WireEkgRecord {
        WireEkgRecord {
            date: self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            classification: self.classification.label(locale).to_string(),
            average_heart_rate: self.average_heart_rate,
            voltages: self.voltages.clone(),
        }
    }
}

/// Wire shape of a record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEkgRecord {
    pub date: String,
    pub classification: String,
    pub average_heart_rate: f64,
    pub voltages: Vec<f64>,
}
