//! Collectors for the two kinds of batches

use crate::catalog::{AggregationResult, MetricCatalog, MetricRequest, MetricValue};
use crate::store::EcgSample;

use super::batch::Collect;
use super::record::EkgRecord;

/// Keyed collector for a metric snapshot.
///
/// Starts with every output key at its default; slot `i` writes the keys of
/// the catalog's `i`-th request.
#[derive(Debug, Clone)]
pub struct MetricCollector {
    requests: Vec<MetricRequest>,
    result: AggregationResult,
}

impl MetricCollector {
    pub fn new(catalog: &MetricCatalog) -> Self {
        Self {
            requests: catalog.requests().to_vec(),
            result: catalog.defaults(),
        }
    }
}

impl Collect for MetricCollector {
    type Item = MetricValue;
    type Output = AggregationResult;

    fn slots(&self) -> usize {
        self.requests.len()
    }

    fn accept(&mut self, slot: usize, value: MetricValue) {
        for key in self.requests[slot].output_keys() {
            self.result.insert(key.to_string(), value);
        }
    }

    fn seal(self) -> AggregationResult {
        self.result
    }
}

/// Positional collector for a record listing.
///
/// Slot `i` is the `i`-th sample of the enumeration, so the output keeps
/// enumeration order however the joiners finish. Each record starts with an
/// empty voltage sequence and receives its whole sequence in one write.
#[derive(Debug, Clone)]
pub struct RecordCollector {
    records: Vec<EkgRecord>,
}

impl RecordCollector {
    pub fn new(samples: &[EcgSample]) -> Self {
        Self {
            records: samples.iter().map(EkgRecord::from_sample).collect(),
        }
    }
}

impl Collect for RecordCollector {
    type Item = Vec<f64>;
    type Output = Vec<EkgRecord>;

    fn slots(&self) -> usize {
        self.records.len()
    }

    fn accept(&mut self, slot: usize, voltages: Vec<f64>) {
        self.records[slot].voltages = voltages;
    }

    fn seal(self) -> Vec<EkgRecord> {
        self.records
    }
}
