//! Aggregate and domain event traits.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// A fact recorded against an aggregate, named in the past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Event type name stored in the envelope and used for filtering.
    fn event_type(&self) -> &'static str;
}

/// An event-sourced entity.
///
/// State is rebuilt by folding events through [`Aggregate::apply`]. Command
/// methods on the concrete types inspect the current state and either return
/// new events or reject the request; they never mutate `self`.
pub trait Aggregate: Default + Send + Sync + Sized {
    type Event: DomainEvent;

    type Error: std::error::Error + Send + Sync;

    /// Aggregate type name, stored alongside every event.
    fn aggregate_type() -> &'static str;

    /// Returns None until the creation event has been applied.
    fn id(&self) -> Option<AggregateId>;

    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    /// Applies an event. Must be deterministic and infallible.
    fn apply(&mut self, event: Self::Event);

    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}

/// Aggregates whose state can be persisted as a snapshot.
pub trait SnapshotCapable: Aggregate + Serialize + DeserializeOwned {
    /// Number of events between snapshots.
    fn snapshot_interval() -> usize {
        100
    }

    fn should_snapshot(&self) -> bool {
        self.version().as_i64() > 0
            && (self.version().as_i64() as usize).is_multiple_of(Self::snapshot_interval())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Table, TableStatus};
    use common::{Actor, UserId};

    #[test]
    fn apply_events_folds_in_order() {
        let mut table = Table::default();
        let id = AggregateId::new();
        let actor = Actor::user(UserId::new("guest-1"));

        table.apply_events(table.create(id, 4, 2).unwrap());
        table.apply_events(table.reserve(&actor, None, None).unwrap());

        assert_eq!(table.id(), Some(id));
        assert_eq!(table.status(), TableStatus::Reserved);
    }

    #[test]
    fn table_snapshots_on_interval_boundaries() {
        let mut table = Table::default();
        assert!(!table.should_snapshot());

        let interval = Table::snapshot_interval() as i64;
        table.set_version(Version::new(interval));
        assert!(table.should_snapshot());

        table.set_version(Version::new(interval + 1));
        assert!(!table.should_snapshot());
    }
}
