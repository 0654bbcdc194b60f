//! Reservation/Order Gateway.
//!
//! The single entry point for staff and customer actions. Every operation
//! checks the caller's role, serializes work on the affected table and
//! order, and commits multi-aggregate changes in one atomic append so no
//! table is left occupied without its order or the other way round.

pub mod error;
pub mod gateway;
pub mod locks;
mod orders;
mod reports;
mod tables;

pub use error::{ErrorKind, GatewayError, Result};
pub use gateway::CafeGateway;
pub use locks::{LockKey, LockManager};
