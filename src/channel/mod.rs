//! # Method Channels
//!
//! Named channels carrying method calls, in the shape the mobile client
//! sends them. The health channel carries `fetchHealthData` and
//! `requestAuthorization`; the EKG channel carries `getEKG`. Anything else
//! answers not implemented.

mod call;
mod response;
mod router;

pub use call::{Method, MethodCall};
pub use response::MethodResponse;
pub use router::MethodRouter;
