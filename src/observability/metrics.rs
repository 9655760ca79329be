//! Metrics registry
//!
//! - Counters only
//! - Monotonic increase, reset only on process start
//! - Atomic increments with Relaxed ordering; totals are exact, cross-counter
//!   consistency of a snapshot is not guaranteed

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for the engine and the command surface
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    batches_started: AtomicU64,
    batches_completed: AtomicU64,
    batches_sealed_early: AtomicU64,
    units_filled: AtomicU64,
    units_tolerated: AtomicU64,
    units_abandoned: AtomicU64,
    late_completions: AtomicU64,
    voltage_readings: AtomicU64,
    commands_succeeded: AtomicU64,
    commands_failed: AtomicU64,
    commands_not_implemented: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Batches

    pub fn increment_batches_started(&self) {
        self.batches_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_batches_completed(&self) {
        self.batches_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_batches_sealed_early(&self) {
        self.batches_sealed_early.fetch_add(1, Ordering::Relaxed);
    }

    // Units

    pub fn increment_units_filled(&self) {
        self.units_filled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_units_tolerated(&self) {
        self.units_tolerated.fetch_add(1, Ordering::Relaxed);
    }

    /// A unit whose handle was dropped without a report
    pub fn increment_units_abandoned(&self) {
        self.units_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_late_completions(&self) {
        self.late_completions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_voltage_readings(&self, count: u64) {
        self.voltage_readings.fetch_add(count, Ordering::Relaxed);
    }

    // Commands

    pub fn increment_commands_succeeded(&self) {
        self.commands_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_commands_failed(&self) {
        self.commands_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_commands_not_implemented(&self) {
        self.commands_not_implemented.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_started: self.batches_started.load(Ordering::Relaxed),
            batches_completed: self.batches_completed.load(Ordering::Relaxed),
            batches_sealed_early: self.batches_sealed_early.load(Ordering::Relaxed),
            units_filled: self.units_filled.load(Ordering::Relaxed),
            units_tolerated: self.units_tolerated.load(Ordering::Relaxed),
            units_abandoned: self.units_abandoned.load(Ordering::Relaxed),
            late_completions: self.late_completions.load(Ordering::Relaxed),
            voltage_readings: self.voltage_readings.load(Ordering::Relaxed),
            commands_succeeded: self.commands_succeeded.load(Ordering::Relaxed),
            commands_failed: self.commands_failed.load(Ordering::Relaxed),
            commands_not_implemented: self.commands_not_implemented.load(Ordering::Relaxed),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or(serde_json::Value::Null)
    }
}

/// A point-in-time copy of all counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub batches_started: u64,
    pub batches_completed: u64,
    pub batches_sealed_early: u64,
    pub units_filled: u64,
    pub units_tolerated: u64,
    pub units_abandoned: u64,
    pub late_completions: u64,
    pub voltage_readings: u64,
    pub commands_succeeded: u64,
    pub commands_failed: u64,
    pub commands_not_implemented: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_is_zero() {
        assert_eq!(MetricsRegistry::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_increment_counters() {
        let registry = MetricsRegistry::new();
        registry.increment_batches_started();
        registry.increment_units_filled();
        registry.increment_units_filled();
        registry.increment_units_tolerated();
        registry.add_voltage_readings(50);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.batches_started, 1);
        assert_eq!(snapshot.units_filled, 2);
        assert_eq!(snapshot.units_tolerated, 1);
        assert_eq!(snapshot.voltage_readings, 50);
    }

    #[test]
    fn test_to_json() {
        let registry = MetricsRegistry::new();
        registry.increment_commands_failed();

        let json = registry.to_json();
        assert_eq!(json["commands_failed"], 1);
        assert_eq!(json["batches_completed"], 0);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..100 {
                        reg.increment_units_filled();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.snapshot().units_filled, 800);
    }
}
