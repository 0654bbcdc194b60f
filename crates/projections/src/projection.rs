//! The projection trait and its progress marker.

use async_trait::async_trait;
use event_store::RecordedEvent;

use crate::Result;

/// Log position of the last event a projection has applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProjectionPosition {
    pub log_position: u64,
}

impl ProjectionPosition {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn at(log_position: u64) -> Self {
        Self { log_position }
    }

    /// True if the event at `log_position` has not been applied yet.
    pub fn is_behind(&self, log_position: u64) -> bool {
        self.log_position < log_position
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "position({})", self.log_position)
    }
}

/// Folds committed events into a query model.
///
/// A projection sees every event in log order, including events of
/// aggregates it does not care about, and moves its position to each one
/// once handled so catch-up can resume where it stopped.
#[async_trait]
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, recorded: &RecordedEvent) -> Result<()>;

    async fn position(&self) -> ProjectionPosition;

    /// Drops all folded state and rewinds to position zero.
    async fn reset(&self) -> Result<()>;
}
