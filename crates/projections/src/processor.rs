//! Feeds committed events from the store to registered projections.

use std::sync::Arc;

use event_store::{EventStore, RecordedEvent};
use futures_util::StreamExt;
use tokio::sync::Mutex;

use crate::Result;
use crate::projection::Projection;

/// Delivers events to projections on demand.
///
/// Catch-up reads the log after the furthest-behind projection and hands
/// each projection only the events past its own position. Catch-ups are
/// serialized so concurrent callers never deliver the same event twice.
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Vec<Arc<dyn Projection>>,
    catch_up: Mutex<()>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
            catch_up: Mutex::new(()),
        }
    }

    pub fn register(&mut self, projection: Arc<dyn Projection>) {
        self.projections.push(projection);
    }

    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Brings every projection up to the end of the log.
    ///
    /// Returns the number of event deliveries made.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<u64> {
        let _guard = self.catch_up.lock().await;

        let mut from = u64::MAX;
        for projection in &self.projections {
            from = from.min(projection.position().await.log_position);
        }
        if from == u64::MAX {
            return Ok(0);
        }

        let mut stream = self.store.stream_events_after(from).await?;
        let mut delivered: u64 = 0;
        let mut last_seen = from;

        while let Some(result) = stream.next().await {
            let recorded = result?;
            last_seen = recorded.position;

            for projection in &self.projections {
                if projection.position().await.is_behind(recorded.position) {
                    projection.handle(&recorded).await?;
                    delivered += 1;
                    metrics::counter!("projections_events_processed", "projection" => projection.name())
                        .increment(1);
                }
            }
        }

        tracing::debug!(from, log_position = last_seen, delivered, "catch-up complete");
        Ok(delivered)
    }

    /// Delivers one event to every projection regardless of position.
    #[tracing::instrument(skip(self, recorded), fields(event_type = %recorded.event.event_type))]
    pub async fn process_event(&self, recorded: &RecordedEvent) -> Result<()> {
        for projection in &self.projections {
            projection.handle(recorded).await?;
        }
        Ok(())
    }

    /// Resets every projection and replays the whole log.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<u64> {
        for projection in &self.projections {
            projection.reset().await?;
        }
        let delivered = self.run_catch_up().await?;
        tracing::info!(delivered, "projections rebuilt");
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ProjectionPosition;
    use async_trait::async_trait;
    use common::AggregateId;
    use event_store::{AppendOptions, EventEnvelope, InMemoryEventStore, Version};
    use tokio::sync::RwLock;

    #[derive(Default)]
    struct CountingProjection {
        count: RwLock<u64>,
        position: RwLock<ProjectionPosition>,
    }

    #[async_trait]
    impl Projection for CountingProjection {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn handle(&self, recorded: &RecordedEvent) -> Result<()> {
            *self.count.write().await += 1;
            *self.position.write().await = ProjectionPosition::at(recorded.position);
            Ok(())
        }

        async fn position(&self) -> ProjectionPosition {
            *self.position.read().await
        }

        async fn reset(&self) -> Result<()> {
            *self.count.write().await = 0;
            *self.position.write().await = ProjectionPosition::zero();
            Ok(())
        }
    }

    fn test_event(aggregate_id: AggregateId, version: i64) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type("Table")
            .event_type("TableReserved")
            .version(Version::new(version))
            .payload_raw(serde_json::json!({"test": true}))
            .build()
            .unwrap()
    }

    async fn store_with_events(n: i64) -> InMemoryEventStore {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        if n > 0 {
            let events = (1..=n).map(|v| test_event(id, v)).collect();
            store.append(events, AppendOptions::new()).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn catch_up_delivers_every_event_once() {
        let projection = Arc::new(CountingProjection::default());
        let mut processor = ProjectionProcessor::new(store_with_events(3).await);
        processor.register(projection.clone());

        assert_eq!(processor.run_catch_up().await.unwrap(), 3);
        assert_eq!(processor.run_catch_up().await.unwrap(), 0);
        assert_eq!(*projection.count.read().await, 3);
    }

    #[tokio::test]
    async fn catch_up_resumes_after_new_commits() {
        let store = store_with_events(2).await;
        let projection = Arc::new(CountingProjection::default());
        let mut processor = ProjectionProcessor::new(store.clone());
        processor.register(projection.clone());
        processor.run_catch_up().await.unwrap();

        store
            .append(vec![test_event(AggregateId::new(), 1)], AppendOptions::new())
            .await
            .unwrap();

        assert_eq!(processor.run_catch_up().await.unwrap(), 1);
        assert_eq!(projection.position().await, ProjectionPosition::at(3));
    }

    #[tokio::test]
    async fn concurrent_catch_ups_do_not_double_deliver() {
        let projection = Arc::new(CountingProjection::default());
        let mut processor = ProjectionProcessor::new(store_with_events(5).await);
        processor.register(projection.clone());
        let processor = Arc::new(processor);

        let a = tokio::spawn({
            let processor = processor.clone();
            async move { processor.run_catch_up().await.unwrap() }
        });
        let b = tokio::spawn({
            let processor = processor.clone();
            async move { processor.run_catch_up().await.unwrap() }
        });
        let total = a.await.unwrap() + b.await.unwrap();

        assert_eq!(total, 5);
        assert_eq!(*projection.count.read().await, 5);
    }

    #[tokio::test]
    async fn rebuild_resets_and_replays() {
        let projection = Arc::new(CountingProjection::default());
        let mut processor = ProjectionProcessor::new(store_with_events(2).await);
        processor.register(projection.clone());

        processor.run_catch_up().await.unwrap();
        assert_eq!(processor.rebuild_all().await.unwrap(), 2);
        assert_eq!(*projection.count.read().await, 2);
    }

    #[tokio::test]
    async fn process_event_ignores_position() {
        let projection = Arc::new(CountingProjection::default());
        let mut processor = ProjectionProcessor::new(InMemoryEventStore::new());
        processor.register(projection.clone());

        let recorded = RecordedEvent {
            position: 1,
            event: test_event(AggregateId::new(), 1),
        };
        processor.process_event(&recorded).await.unwrap();
        assert_eq!(*projection.count.read().await, 1);
    }

    #[tokio::test]
    async fn each_projection_tracks_its_own_position() {
        let store = store_with_events(2).await;
        let early = Arc::new(CountingProjection::default());
        let late = Arc::new(CountingProjection::default());

        let mut processor = ProjectionProcessor::new(store.clone());
        processor.register(early.clone());
        processor.run_catch_up().await.unwrap();

        processor.register(late.clone());
        assert_eq!(processor.projection_count(), 2);
        assert_eq!(processor.run_catch_up().await.unwrap(), 2);

        assert_eq!(*early.count.read().await, 2);
        assert_eq!(*late.count.read().await, 2);
    }

    #[tokio::test]
    async fn catch_up_reads_only_past_the_slowest_projection() {
        let store = store_with_events(4).await;
        let projection = Arc::new(CountingProjection::default());
        *projection.position.write().await = ProjectionPosition::at(3);

        let mut processor = ProjectionProcessor::new(store);
        processor.register(projection.clone());

        assert_eq!(processor.run_catch_up().await.unwrap(), 1);
        assert_eq!(projection.position().await, ProjectionPosition::at(4));
    }

    #[tokio::test]
    async fn catch_up_without_projections_is_a_no_op() {
        let processor = ProjectionProcessor::new(store_with_events(2).await);
        assert_eq!(processor.run_catch_up().await.unwrap(), 0);
    }
}
