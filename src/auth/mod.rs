//! # Authorization
//!
//! Read-access gate in front of every store batch. No batch starts before
//! the gate has answered with a grant.

pub mod errors;
pub mod gate;

pub use errors::{AuthError, AuthResult};
pub use gate::{AuthScope, AuthorizationGate};
