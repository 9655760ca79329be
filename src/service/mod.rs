//! # Command Service
//!
//! `requestAuthorization`, `fetchHealthData` and `getEKG` on top of the
//! authorization gate and the aggregation engine.

mod errors;
mod health;
mod operation;

pub use errors::{CommandError, CommandResult, ErrorCode};
pub use health::{parse_date, HealthService};
pub use operation::{OperationHandle, Reply};
