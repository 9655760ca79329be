//! Diagnostics sink shared by the engine and the command layer
//!
//! Counters are always updated. Tolerated-failure events are only logged
//! when `report_tolerated` is set, since a day without exercise data is the
//! normal case and would otherwise warn on every snapshot.

use std::sync::Arc;

use super::events::Event;
use super::logger::Logger;
use super::metrics::MetricsRegistry;

#[derive(Debug, Clone)]
pub struct Diagnostics {
    metrics: Arc<MetricsRegistry>,
    report_tolerated: bool,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(Arc::new(MetricsRegistry::new()), false)
    }
}

impl Diagnostics {
    pub fn new(metrics: Arc<MetricsRegistry>, report_tolerated: bool) -> Self {
        Self {
            metrics,
            report_tolerated,
        }
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    pub fn shared_metrics(&self) -> Arc<MetricsRegistry> {
        Arc::clone(&self.metrics)
    }

    pub fn reports_tolerated(&self) -> bool {
        self.report_tolerated
    }

    pub fn event(&self, event: Event, fields: &[(&str, &str)]) {
        Logger::log(event.severity(), event.as_str(), fields);
    }

    /// A unit settled without a value
    pub fn unit_tolerated(&self, batch: &str, label: &str, slot: usize, reason: &str) {
        self.metrics.increment_units_tolerated();
        if self.report_tolerated {
            let slot = slot.to_string();
            self.event(
                Event::UnitTolerated,
                &[
                    ("batch", batch),
                    ("label", label),
                    ("reason", reason),
                    ("slot", slot.as_str()),
                ],
            );
        }
    }

    /// A report arrived for a unit that had already settled
    pub fn late_completion(&self, batch: &str, slot: usize) {
        self.metrics.increment_late_completions();
        let slot = slot.to_string();
        self.event(
            Event::LateCompletion,
            &[("batch", batch), ("slot", slot.as_str())],
        );
    }
}
