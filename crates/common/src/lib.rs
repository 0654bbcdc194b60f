//! Shared types used across the cafe workflow crates.

mod types;

pub use types::{Actor, AggregateId, ParseRoleError, Role, UserId};
