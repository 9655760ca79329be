//! Observability subsystem
//!
//! - Structured logging (JSON lines)
//! - Counters for batches, units and commands
//! - Typed lifecycle events
//! - Per-command operation scopes
//!
//! Observability never changes engine results and never fails a caller.
//!
//! ```ignore
//! use healthbridge::observability::{Logger, OperationScope};
//!
//! Logger::info("COMMAND_RECEIVED", &[("method", "getEKG")]);
//!
//! let scope = OperationScope::new("GET_EKG");
//! // ... run the batch ...
//! scope.complete();
//! ```

mod diagnostics;
mod events;
mod logger;
mod metrics;
mod scope;

pub use diagnostics::Diagnostics;
pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::OperationScope;

/// Log a lifecycle event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::BootStart);
        log_event_with_fields(Event::ConfigLoaded, &[("path", "/tmp/healthbridge.json")]);
    }
}
