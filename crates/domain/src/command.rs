//! Command handling: load, decide, stage, commit.

use std::marker::PhantomData;

use common::{Actor, AggregateId};
use event_store::{
    AppendBatch, AppendOptions, EventEnvelope, EventStore, EventStoreExt, Snapshot, Version,
};
use serde::{Serialize, de::DeserializeOwned};

use crate::aggregate::{Aggregate, DomainEvent, SnapshotCapable};
use crate::error::DomainError;

/// Result of a command that was persisted on its own.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    pub events: Vec<A::Event>,

    pub new_version: Version,
}

/// A command addressed to one aggregate.
pub trait Command: Send + Sync {
    type Aggregate: Aggregate;

    fn aggregate_id(&self) -> AggregateId;
}

/// Events decided against an aggregate but not yet persisted.
///
/// `aggregate` already reflects the new events. Nothing is visible to
/// readers until the envelopes are committed, either alone through
/// [`CommandHandler::commit`] or together with other aggregates through a
/// [`UnitOfWork`].
#[derive(Debug)]
pub struct Staged<A: Aggregate> {
    pub aggregate: A,
    pub events: Vec<A::Event>,
    envelopes: Vec<EventEnvelope>,
    expected_version: Version,
}

impl<A: Aggregate> Staged<A> {
    /// True if the command decided there was nothing to record.
    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    fn into_batch(self) -> (A, Option<AppendBatch>) {
        if self.envelopes.is_empty() {
            return (self.aggregate, None);
        }
        let options = AppendOptions::expect_version(self.expected_version);
        (self.aggregate, Some(AppendBatch::new(self.envelopes, options)))
    }
}

/// Staged changes to several aggregates, committed all-or-nothing.
#[derive(Debug, Default)]
pub struct UnitOfWork {
    batches: Vec<AppendBatch>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a staged command and hands back its resulting aggregate.
    pub fn push<A: Aggregate>(&mut self, staged: Staged<A>) -> A {
        let (aggregate, batch) = staged.into_batch();
        if let Some(batch) = batch {
            self.batches.push(batch);
        }
        aggregate
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Number of aggregates touched.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Appends every staged batch in one atomic store operation.
    pub async fn commit<S: EventStore + ?Sized>(
        self,
        store: &S,
    ) -> Result<Vec<Version>, DomainError> {
        if self.batches.is_empty() {
            return Ok(Vec::new());
        }
        Ok(store.append_atomic(self.batches).await?)
    }
}

/// Loads aggregates of type `A` and turns command decisions into events.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate + DeserializeOwned,
    A::Event: Serialize + DeserializeOwned,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an aggregate, starting from its snapshot when one exists.
    ///
    /// Returns a default instance if the aggregate has no events.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        let (snapshot, events) = self.store.load_aggregate(aggregate_id).await?;

        let mut aggregate = match snapshot {
            Some(snapshot) => Self::restore_from_snapshot(snapshot)?,
            None => A::default(),
        };

        for envelope in events {
            let event: A::Event = serde_json::from_value(envelope.payload)?;
            aggregate.apply(event);
            aggregate.set_version(envelope.version);
        }

        Ok(aggregate)
    }

    /// Loads an aggregate, returning None if it doesn't exist.
    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(aggregate_id).await?;
        Ok(aggregate.id().is_some().then_some(aggregate))
    }

    /// Loads an aggregate that must exist.
    pub async fn load_required(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        self.load_existing(aggregate_id)
            .await?
            .ok_or_else(|| DomainError::AggregateNotFound {
                aggregate_type: A::aggregate_type(),
                aggregate_id: aggregate_id.to_string(),
            })
    }

    /// Runs `command_fn` against an already loaded aggregate and stages the
    /// resulting events.
    pub fn stage_on<F>(
        &self,
        mut aggregate: A,
        aggregate_id: AggregateId,
        actor: &Actor,
        command_fn: F,
    ) -> Result<Staged<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let expected_version = aggregate.version();
        let events = command_fn(&aggregate)?;
        let envelopes = Self::build_envelopes(aggregate_id, expected_version, actor, &events)?;

        if !events.is_empty() {
            aggregate.apply_events(events.iter().cloned());
            aggregate.set_version(Version::new(
                expected_version.as_i64() + events.len() as i64,
            ));
        }

        Ok(Staged {
            aggregate,
            events,
            envelopes,
            expected_version,
        })
    }

    /// Loads an aggregate and stages the events `command_fn` decides on.
    pub async fn stage<F>(
        &self,
        aggregate_id: AggregateId,
        actor: &Actor,
        command_fn: F,
    ) -> Result<Staged<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let aggregate = self.load(aggregate_id).await?;
        self.stage_on(aggregate, aggregate_id, actor, command_fn)
    }

    /// Persists a single staged command.
    pub async fn commit(&self, staged: Staged<A>) -> Result<CommandResult<A>, DomainError> {
        let expected_version = staged.expected_version;
        let events = staged.events;
        if staged.envelopes.is_empty() {
            return Ok(CommandResult {
                aggregate: staged.aggregate,
                events,
                new_version: expected_version,
            });
        }

        let new_version = self
            .store
            .append(
                staged.envelopes,
                AppendOptions::expect_version(expected_version),
            )
            .await?;

        Ok(CommandResult {
            aggregate: staged.aggregate,
            events,
            new_version,
        })
    }

    /// Loads, decides, and persists in one step.
    pub async fn execute<F>(
        &self,
        aggregate_id: AggregateId,
        actor: &Actor,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let staged = self.stage(aggregate_id, actor, command_fn).await?;
        self.commit(staged).await
    }

    fn build_envelopes(
        aggregate_id: AggregateId,
        current_version: Version,
        actor: &Actor,
        events: &[A::Event],
    ) -> Result<Vec<EventEnvelope>, DomainError> {
        let mut envelopes = Vec::with_capacity(events.len());
        let mut version = current_version;

        for event in events {
            version = version.next();
            let envelope = EventEnvelope::builder()
                .aggregate_id(aggregate_id)
                .aggregate_type(A::aggregate_type())
                .event_type(event.event_type())
                .version(version)
                .payload(event)?
                .actor(actor.id.as_str())
                .build()?;
            envelopes.push(envelope);
        }

        Ok(envelopes)
    }

    fn restore_from_snapshot(snapshot: Snapshot) -> Result<A, DomainError> {
        let version = snapshot.version;
        let mut aggregate: A = snapshot.into_state()?;
        aggregate.set_version(version);
        Ok(aggregate)
    }
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: SnapshotCapable,
    A::Event: Serialize + DeserializeOwned,
{
    /// Saves a snapshot if the aggregate has reached its interval.
    pub async fn snapshot_if_due(&self, aggregate: &A) -> Result<bool, DomainError> {
        let Some(aggregate_id) = aggregate.id() else {
            return Ok(false);
        };
        if !aggregate.should_snapshot() {
            return Ok(false);
        }

        let snapshot = Snapshot::from_state(
            aggregate_id,
            A::aggregate_type(),
            aggregate.version(),
            aggregate,
        )?;
        self.store.save_snapshot(snapshot).await?;
        tracing::debug!(%aggregate_id, version = %aggregate.version(), "snapshot saved");
        Ok(true)
    }
}
