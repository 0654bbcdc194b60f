use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{AggregateId, EventEnvelope, EventQuery, EventStoreError, Result, Snapshot, Version};

/// Options for appending events to the store.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Expected version of the aggregate for optimistic concurrency control.
    /// If None, no version check is performed.
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects the aggregate to be at `version`.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Expects the aggregate to have no events yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// Events for one aggregate, staged as part of a multi-aggregate commit.
#[derive(Debug, Clone)]
pub struct AppendBatch {
    pub events: Vec<EventEnvelope>,
    pub options: AppendOptions,
}

impl AppendBatch {
    pub fn new(events: Vec<EventEnvelope>, options: AppendOptions) -> Self {
        Self { events, options }
    }

    pub fn aggregate_id(&self) -> Option<AggregateId> {
        self.events.first().map(|e| e.aggregate_id)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// A stream of events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// An event and its position in the global log.
///
/// Positions start at 1 and grow in commit order, so every event committed
/// after another has a higher position.
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub position: u64,
    pub event: EventEnvelope,
}

/// A stream of events with their log positions.
pub type RecordedEventStream = Pin<Box<dyn Stream<Item = Result<RecordedEvent>> + Send>>;

/// Core trait for event store implementations.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends events for a single aggregate.
    ///
    /// Either all events are stored or none are. Fails with
    /// `ConcurrencyConflict` if `options.expected_version` does not match.
    ///
    /// Returns the new version of the aggregate.
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version>;

    /// Appends events for several aggregates as one unit.
    ///
    /// Every batch is checked against its expected version before anything
    /// is written. A conflict on any batch leaves the store untouched.
    /// Returns the new version of each aggregate, in batch order.
    async fn append_atomic(&self, batches: Vec<AppendBatch>) -> Result<Vec<Version>>;

    /// Retrieves all events for an aggregate in version order.
    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>>;

    /// Retrieves events for an aggregate starting at `from_version`.
    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>>;

    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>>;

    /// Retrieves events by type, oldest first.
    async fn get_events_by_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>>;

    /// Streams all events in commit order.
    async fn stream_all_events(&self) -> Result<EventStream>;

    /// Streams events committed after `position`, in position order.
    async fn stream_events_after(&self, position: u64) -> Result<RecordedEventStream>;

    /// Gets the current version of an aggregate, or None if it has no events.
    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>>;

    /// Saves a snapshot, replacing any previous one for the aggregate.
    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()>;

    async fn get_snapshot(&self, aggregate_id: AggregateId) -> Result<Option<Snapshot>>;
}

/// Convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    async fn append_event(&self, event: EventEnvelope, options: AppendOptions) -> Result<Version> {
        self.append(vec![event], options).await
    }

    async fn aggregate_exists(&self, aggregate_id: AggregateId) -> Result<bool> {
        Ok(self.get_aggregate_version(aggregate_id).await?.is_some())
    }

    /// Loads an aggregate's events, starting after the latest snapshot if one
    /// exists.
    async fn load_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<(Option<Snapshot>, Vec<EventEnvelope>)> {
        if let Some(snapshot) = self.get_snapshot(aggregate_id).await? {
            let events = self
                .get_events_for_aggregate_from_version(aggregate_id, snapshot.version.next())
                .await?;
            Ok((Some(snapshot), events))
        } else {
            let events = self.get_events_for_aggregate(aggregate_id).await?;
            Ok((None, events))
        }
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Checks that `events` form a contiguous run for one aggregate.
pub fn validate_events_for_append(events: &[EventEnvelope]) -> Result<()> {
    let Some(first) = events.first() else {
        return Err(EventStoreError::InvalidAppend(
            "cannot append an empty event list".to_string(),
        ));
    };

    let mut expected_version = first.version;
    for event in events.iter().skip(1) {
        if event.aggregate_id != first.aggregate_id {
            return Err(EventStoreError::InvalidAppend(
                "all events must be for the same aggregate".to_string(),
            ));
        }
        if event.aggregate_type != first.aggregate_type {
            return Err(EventStoreError::InvalidAppend(
                "all events must have the same aggregate type".to_string(),
            ));
        }
        expected_version = expected_version.next();
        if event.version != expected_version {
            return Err(EventStoreError::InvalidAppend(format!(
                "event versions must be sequential: expected {}, got {}",
                expected_version, event.version
            )));
        }
    }

    Ok(())
}

/// Checks every batch and rejects two batches targeting the same aggregate.
pub fn validate_batches_for_append(batches: &[AppendBatch]) -> Result<()> {
    if batches.is_empty() {
        return Err(EventStoreError::InvalidAppend(
            "cannot append an empty batch list".to_string(),
        ));
    }

    let mut seen = Vec::with_capacity(batches.len());
    for batch in batches {
        validate_events_for_append(&batch.events)?;
        let id = batch.events[0].aggregate_id;
        if seen.contains(&id) {
            return Err(EventStoreError::InvalidAppend(format!(
                "aggregate {id} appears in more than one batch"
            )));
        }
        seen.push(id);
    }

    Ok(())
}
