use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventQuery, EventStoreError, Result, Snapshot, Version,
    store::{
        AppendBatch, AppendOptions, EventStore, EventStream, RecordedEvent, RecordedEventStream,
        validate_batches_for_append, validate_events_for_append,
    },
};

/// In-memory event store.
///
/// Behaves like [`crate::PostgresEventStore`]; used by tests and by the
/// service when no database is configured.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<Vec<EventEnvelope>>>,
    snapshots: Arc<RwLock<HashMap<AggregateId, Snapshot>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Clears all events and snapshots.
    pub async fn clear(&self) {
        self.events.write().await.clear();
        self.snapshots.write().await.clear();
    }

    /// Checks a batch against the current log without writing anything.
    fn check_batch(
        log: &[EventEnvelope],
        events: &[EventEnvelope],
        options: &AppendOptions,
    ) -> Result<Version> {
        let first_event = &events[0];
        let aggregate_id = first_event.aggregate_id;

        let current_version = log
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.version)
            .max()
            .unwrap_or(Version::initial());

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current_version,
            });
        }

        // Unique (aggregate_id, version) constraint.
        if first_event.version <= current_version {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: options.expected_version.unwrap_or(current_version),
                actual: current_version,
            });
        }

        Ok(events
            .last()
            .map(|e| e.version)
            .unwrap_or(current_version))
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)?;

        let mut store = self.events.write().await;
        let last_version = Self::check_batch(&store, &events, &options)?;
        metrics::counter!("event_store_events_appended_total").increment(events.len() as u64);
        store.extend(events);

        Ok(last_version)
    }

    async fn append_atomic(&self, batches: Vec<AppendBatch>) -> Result<Vec<Version>> {
        validate_batches_for_append(&batches)?;

        let mut store = self.events.write().await;
        let versions = batches
            .iter()
            .map(|batch| Self::check_batch(&store, &batch.events, &batch.options))
            .collect::<Result<Vec<_>>>()?;

        let event_count: usize = batches.iter().map(|b| b.events.len()).sum();
        for batch in batches {
            store.extend(batch.events);
        }

        tracing::debug!(
            aggregates = versions.len(),
            events = event_count,
            "atomic append committed"
        );
        metrics::counter!("event_store_events_appended_total").increment(event_count as u64);

        Ok(versions)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let store = self.events.read().await;
        let mut events: Vec<_> = store
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let store = self.events.read().await;
        let mut events: Vec<_> = store
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id && e.version >= from_version)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>> {
        let store = self.events.read().await;
        let mut events: Vec<_> = store.iter().filter(|e| query.matches(e)).cloned().collect();

        // Stable sort keeps insertion order for equal timestamps.
        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(events.into_iter().skip(offset).take(limit).collect())
    }

    async fn get_events_by_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>> {
        let store = self.events.read().await;
        let mut events: Vec<_> = store
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(events)
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = self.events.read().await.clone();
        let stream = stream::iter(events.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }

    async fn stream_events_after(&self, position: u64) -> Result<RecordedEventStream> {
        use futures_util::stream;

        // The log is append-only, so an event's index is its position.
        let skip = usize::try_from(position).unwrap_or(usize::MAX);
        let tail: Vec<Result<RecordedEvent>> = self
            .events
            .read()
            .await
            .iter()
            .enumerate()
            .skip(skip)
            .map(|(index, event)| {
                Ok(RecordedEvent {
                    position: index as u64 + 1,
                    event: event.clone(),
                })
            })
            .collect();
        Ok(Box::pin(stream::iter(tail)))
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let store = self.events.read().await;
        let version = store
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.version)
            .max();
        Ok(version)
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        snapshots.insert(snapshot.aggregate_id, snapshot);
        Ok(())
    }

    async fn get_snapshot(&self, aggregate_id: AggregateId) -> Result<Option<Snapshot>> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.get(&aggregate_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_event(
        aggregate_id: AggregateId,
        aggregate_type: &str,
        version: Version,
        event_type: &str,
    ) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type(aggregate_type)
            .event_type(event_type)
            .version(version)
            .payload_raw(serde_json::json!({"test": true}))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn append_single_event() {
        let store = InMemoryEventStore::new();
        let table_id = AggregateId::new();
        let event = create_test_event(table_id, "Table", Version::first(), "TableCreated");

        let version = store
            .append(vec![event], AppendOptions::expect_new())
            .await
            .unwrap();
        assert_eq!(version, Version::first());

        let events = store.get_events_for_aggregate(table_id).await.unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn concurrency_conflict_on_stale_version() {
        let store = InMemoryEventStore::new();
        let table_id = AggregateId::new();

        store
            .append(
                vec![create_test_event(table_id, "Table", Version::first(), "TableCreated")],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();

        // Second writer still believes the table is brand new.
        let result = store
            .append(
                vec![create_test_event(table_id, "Table", Version::new(1), "TableReserved")],
                AppendOptions::expect_new(),
            )
            .await;

        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { .. })
        ));
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn append_atomic_writes_every_batch() {
        let store = InMemoryEventStore::new();
        let table_id = AggregateId::new();
        let order_id = AggregateId::new();

        store
            .append(
                vec![create_test_event(table_id, "Table", Version::first(), "TableCreated")],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();

        let versions = store
            .append_atomic(vec![
                AppendBatch::new(
                    vec![create_test_event(order_id, "Order", Version::first(), "OrderPlaced")],
                    AppendOptions::expect_new(),
                ),
                AppendBatch::new(
                    vec![create_test_event(table_id, "Table", Version::new(2), "TableOccupied")],
                    AppendOptions::expect_version(Version::first()),
                ),
            ])
            .await
            .unwrap();

        assert_eq!(versions, vec![Version::first(), Version::new(2)]);
        assert_eq!(store.event_count().await, 3);
    }

    #[tokio::test]
    async fn append_atomic_conflict_leaves_store_untouched() {
        let store = InMemoryEventStore::new();
        let table_id = AggregateId::new();
        let order_id = AggregateId::new();

        store
            .append(
                vec![
                    create_test_event(table_id, "Table", Version::new(1), "TableCreated"),
                    create_test_event(table_id, "Table", Version::new(2), "TableReserved"),
                ],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();

        let result = store
            .append_atomic(vec![
                AppendBatch::new(
                    vec![create_test_event(order_id, "Order", Version::first(), "OrderPlaced")],
                    AppendOptions::expect_new(),
                ),
                AppendBatch::new(
                    vec![create_test_event(table_id, "Table", Version::new(2), "TableOccupied")],
                    AppendOptions::expect_version(Version::first()),
                ),
            ])
            .await;

        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { .. })
        ));
        assert_eq!(store.event_count().await, 2);
        assert!(
            store
                .get_events_for_aggregate(order_id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn append_rejects_empty_list() {
        let store = InMemoryEventStore::new();
        let result = store.append(Vec::new(), AppendOptions::new()).await;
        assert!(matches!(result, Err(EventStoreError::InvalidAppend(_))));
    }

    #[tokio::test]
    async fn get_events_from_version() {
        let store = InMemoryEventStore::new();
        let table_id = AggregateId::new();

        let events = vec![
            create_test_event(table_id, "Table", Version::new(1), "TableCreated"),
            create_test_event(table_id, "Table", Version::new(2), "TableReserved"),
            create_test_event(table_id, "Table", Version::new(3), "TableReleased"),
        ];
        store.append(events, AppendOptions::new()).await.unwrap();

        let from_v2 = store
            .get_events_for_aggregate_from_version(table_id, Version::new(2))
            .await
            .unwrap();
        assert_eq!(from_v2.len(), 2);
        assert_eq!(from_v2[0].version, Version::new(2));
        assert_eq!(from_v2[1].version, Version::new(3));
    }

    #[tokio::test]
    async fn query_events_by_type_pair_with_paging() {
        let store = InMemoryEventStore::new();

        for _ in 0..3 {
            store
                .append(
                    vec![create_test_event(
                        AggregateId::new(),
                        "Order",
                        Version::first(),
                        "OrderPlaced",
                    )],
                    AppendOptions::new(),
                )
                .await
                .unwrap();
        }
        store
            .append(
                vec![create_test_event(
                    AggregateId::new(),
                    "Table",
                    Version::first(),
                    "TableCreated",
                )],
                AppendOptions::new(),
            )
            .await
            .unwrap();

        let all = store
            .query_events(EventQuery::for_event("Order", "OrderPlaced"))
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let page = store
            .query_events(EventQuery::for_event("Order", "OrderPlaced").offset(1).limit(1))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].aggregate_id, all[1].aggregate_id);
    }

    #[tokio::test]
    async fn snapshot_replaces_previous() {
        let store = InMemoryEventStore::new();
        let table_id = AggregateId::new();

        for version in [10, 20] {
            let snapshot = Snapshot::from_state(
                table_id,
                "Table",
                Version::new(version),
                &serde_json::json!({"v": version}),
            )
            .unwrap();
            store.save_snapshot(snapshot).await.unwrap();
        }

        let retrieved = store.get_snapshot(table_id).await.unwrap().unwrap();
        assert_eq!(retrieved.version, Version::new(20));
    }

    #[tokio::test]
    async fn stream_all_events() {
        use futures_util::StreamExt;

        let store = InMemoryEventStore::new();
        for aggregate_type in ["Table", "Order"] {
            store
                .append(
                    vec![create_test_event(
                        AggregateId::new(),
                        aggregate_type,
                        Version::first(),
                        "Created",
                    )],
                    AppendOptions::new(),
                )
                .await
                .unwrap();
        }

        let stream = store.stream_all_events().await.unwrap();
        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn stream_events_after_resumes_from_position() {
        use futures_util::StreamExt;

        let store = InMemoryEventStore::new();
        let table_id = AggregateId::new();
        let order_id = AggregateId::new();
        store
            .append(
                vec![
                    create_test_event(table_id, "Table", Version::new(1), "TableCreated"),
                    create_test_event(table_id, "Table", Version::new(2), "TableReserved"),
                ],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();
        store
            .append_atomic(vec![
                AppendBatch::new(
                    vec![create_test_event(order_id, "Order", Version::first(), "OrderPlaced")],
                    AppendOptions::expect_new(),
                ),
                AppendBatch::new(
                    vec![create_test_event(table_id, "Table", Version::new(3), "TableOccupied")],
                    AppendOptions::expect_version(Version::new(2)),
                ),
            ])
            .await
            .unwrap();

        let tail: Vec<_> = store
            .stream_events_after(2)
            .await
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
            .await;
        let positions: Vec<_> = tail.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![3, 4]);
        assert_eq!(tail[0].event.event_type, "OrderPlaced");

        let past_end = store.stream_events_after(4).await.unwrap();
        assert_eq!(past_end.count().await, 0);
    }
}
