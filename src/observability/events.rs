//! Observable events
//!
//! Events are explicit and typed; the string form is what appears in the
//! `event` field of a log line.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Process startup begins
    BootStart,
    /// Configuration loaded and validated
    ConfigLoaded,
    /// Fixture store loaded
    StoreLoaded,
    /// Transport ready for requests
    Serving,
    /// Transport stopped
    ShutdownComplete,

    // Commands
    /// Method call received on a channel
    CommandReceived,
    /// Unknown channel/method pair
    CommandNotImplemented,

    // Authorization
    /// Authorization prompt issued
    AuthorizationRequested,
    /// Read access granted
    AuthorizationGranted,
    /// Read access denied or prompt failed
    AuthorizationDenied,

    // Engine
    /// Fan-out batch created and units issued
    BatchOpened,
    /// Every unit settled, result delivered
    BatchCompleted,
    /// Batch force-sealed before every unit settled
    BatchSealed,
    /// Unit settled without a value, default kept
    UnitTolerated,
    /// Report for an already-settled unit or sealed batch
    LateCompletion,
    /// Enumeration query answered
    EnumerationComplete,
    /// Voltage stream finished and sealed
    VoltageStreamSealed,
    /// Voltage stream failed
    VoltageStreamFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "HEALTHBRIDGE_STARTUP_BEGIN",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::StoreLoaded => "STORE_LOADED",
            Event::Serving => "HEALTHBRIDGE_SERVING",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",

            Event::CommandReceived => "COMMAND_RECEIVED",
            Event::CommandNotImplemented => "COMMAND_NOT_IMPLEMENTED",

            Event::AuthorizationRequested => "AUTHORIZATION_REQUESTED",
            Event::AuthorizationGranted => "AUTHORIZATION_GRANTED",
            Event::AuthorizationDenied => "AUTHORIZATION_DENIED",

            Event::BatchOpened => "BATCH_OPENED",
            Event::BatchCompleted => "BATCH_COMPLETED",
            Event::BatchSealed => "BATCH_SEALED",
            Event::UnitTolerated => "BATCH_UNIT_TOLERATED",
            Event::LateCompletion => "BATCH_LATE_COMPLETION",
            Event::EnumerationComplete => "ENUMERATION_COMPLETE",
            Event::VoltageStreamSealed => "VOLTAGE_STREAM_SEALED",
            Event::VoltageStreamFailed => "VOLTAGE_STREAM_FAILED",
        }
    }

    /// Severity an event is logged at
    pub fn severity(&self) -> super::Severity {
        use super::Severity;
        match self {
            Event::UnitTolerated | Event::LateCompletion | Event::BatchSealed => Severity::Warn,
            Event::VoltageStreamFailed | Event::AuthorizationDenied => Severity::Warn,
            Event::BatchOpened | Event::VoltageStreamSealed => Severity::Trace,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
