//! # Aggregation Engine
//!
//! Concurrent fan-out over push-style store queries.
//!
//! ## Guarantees
//! - A batch finalizes exactly once, after every unit settled or after a
//!   forced seal
//! - Every slot holds its default until a unit fills it
//! - Unit failures are tolerated, never retried, never abort the batch
//! - Record output follows enumeration order; voltages follow delivery order
//!
//! The engine owns no threads. Whatever thread settles the last unit runs
//! the completion callback.

pub mod batch;
pub mod collectors;
pub mod fan_out;
pub mod joiner;
pub mod record;

pub use batch::{
    Batch, BatchControl, BatchReport, Collect, Completion, Finalized, SealReason, UnitHandle,
    UnitOutcome,
};
pub use collectors::{MetricCollector, RecordCollector};
pub use fan_out::FanOutCoordinator;
pub use joiner::{JoinError, JoinResult, NestedSampleJoiner};
pub use record::{EkgRecord, WireEkgRecord};
