//! Query and sample types exchanged with a health store

use std::fmt;

use chrono::{DateTime, Days, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::StoreError;
use crate::catalog::{Aggregation, MetricKind, Unit};

/// A readable data type, used when requesting authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Quantity(MetricKind),
    Electrocardiogram,
}

/// Half-open interval `[start, end)` covering one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Window for `date`, starting at the first instant of that day.
    ///
    /// With `offset` the day is taken in that fixed zone, otherwise in the
    /// process's local zone. The end is the first instant of the next day,
    /// so a DST transition yields a 23 or 25 hour window.
    pub fn for_date(date: NaiveDate, offset: Option<FixedOffset>) -> Option<Self> {
        let next = date.checked_add_days(Days::new(1))?;
        let (start, end) = match offset {
            Some(offset) => (start_of_day(&offset, date)?, start_of_day(&offset, next)?),
            None => (start_of_day(&Local, date)?, start_of_day(&Local, next)?),
        };
        Some(Self { date, start, end })
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    // Midnight can be skipped by a DST jump; fall back to the first hour.
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            let one_am = date.and_hms_opt(1, 0, 0)?;
            tz.from_local_datetime(&one_am).earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
}

/// Cumulative statistics query over one window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticsQuery {
    pub kind: MetricKind,
    pub aggregation: Aggregation,
    /// Unit the sum must be reported in
    pub unit: Unit,
    pub window: DayWindow,
}

/// Terminal answer to one statistics query
#[derive(Debug, Clone, PartialEq)]
pub enum StatisticsOutcome {
    Sum(f64),
    NoData,
    Failed(StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    StartDateDescending,
    StartDateAscending,
}

/// Enumeration query over electrocardiogram samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleQuery {
    pub order: SortOrder,
    /// `None` means no limit
    pub limit: Option<usize>,
}

/// Opaque sample identifier, valid for the duration of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleId(pub Uuid);

impl SampleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SampleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rhythm classification attached to a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Not set by the recording device
    Unknown,
    SinusRhythm,
    AtrialFibrillation,
    InconclusiveLowRate,
    InconclusiveHighRate,
    InconclusivePoorReading,
    InconclusiveOther,
    Unrecognized,
}

/// Language used for classification labels on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationLocale {
    #[default]
    Turkish,
    English,
}

impl Classification {
    pub fn label(&self, locale: ClassificationLocale) -> &'static str {
        match locale {
            ClassificationLocale::Turkish => match self {
                Classification::Unknown => "Bilinmiyor",
                Classification::SinusRhythm => "Sinüs Ritmi",
                Classification::AtrialFibrillation => "Atriyal Fibrilasyon",
                Classification::InconclusiveLowRate => "Düşük Nabız - Belirsiz",
                Classification::InconclusiveHighRate => "Yüksek Nabız - Belirsiz",
                Classification::InconclusivePoorReading => "Zayıf Okuma",
                Classification::InconclusiveOther => "Belirsiz",
                Classification::Unrecognized => "Tanımlanamayan",
            },
            ClassificationLocale::English => match self {
                Classification::Unknown => "Unknown",
                Classification::SinusRhythm => "Sinus Rhythm",
                Classification::AtrialFibrillation => "Atrial Fibrillation",
                Classification::InconclusiveLowRate => "Inconclusive - Low Heart Rate",
                Classification::InconclusiveHighRate => "Inconclusive - High Heart Rate",
                Classification::InconclusivePoorReading => "Poor Reading",
                Classification::InconclusiveOther => "Inconclusive",
                Classification::Unrecognized => "Unrecognized",
            },
        }
    }
}

/// One electrocardiogram returned by the enumeration query
#[derive(Debug, Clone, PartialEq)]
pub struct EcgSample {
    pub id: SampleId,
    pub start: DateTime<Utc>,
    pub classification: Classification,
    /// Beats per minute, if the device recorded one
    pub average_heart_rate: Option<f64>,
}

/// Incremental delivery from a voltage sub-query
#[derive(Debug, Clone, PartialEq)]
pub enum VoltageEvent {
    /// One measurement; `lead_i` is `None` when the measurement has no
    /// lead-I reading, in microvolts otherwise
    Measurement { lead_i: Option<f64> },
    /// Stream finished normally
    Done,
    /// Stream aborted
    Failed(StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_window_in_fixed_offset() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let window = DayWindow::for_date(date("2024-03-01"), Some(offset)).unwrap();

        assert_eq!(window.start.to_rfc3339(), "2024-02-29T21:00:00+00:00");
        assert_eq!(window.end.to_rfc3339(), "2024-03-01T21:00:00+00:00");
        assert_eq!(window.end - window.start, chrono::Duration::days(1));
    }

    #[test]
    fn test_window_contains_is_half_open() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let window = DayWindow::for_date(date("2024-03-01"), Some(utc)).unwrap();
        assert!(window.contains(window.start));
        assert!(!window.contains(window.end));
    }

    #[test]
    fn test_local_window_spans_a_day() {
        let window = DayWindow::for_date(date("2024-06-15"), None).unwrap();
        let hours = (window.end - window.start).num_hours();
        assert!((23..=25).contains(&hours));
    }

    #[test]
    fn test_classification_labels() {
        assert_eq!(
            Classification::SinusRhythm.label(ClassificationLocale::Turkish),
            "Sinüs Ritmi"
        );
        assert_eq!(
            Classification::InconclusivePoorReading.label(ClassificationLocale::English),
            "Poor Reading"
        );
    }
}
