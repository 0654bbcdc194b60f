use common::AggregateId;
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use event_store::{
    AppendBatch, AppendOptions, EventEnvelope, EventQuery, EventStore, InMemoryEventStore,
    Snapshot, Version,
};
use tokio::runtime::Runtime;

const TABLE_CYCLE: [&str; 3] = ["TableReserved", "TableOccupied", "TableReleased"];

fn envelope(
    aggregate_id: AggregateId,
    aggregate_type: &str,
    event_type: &str,
    version: i64,
) -> EventEnvelope {
    EventEnvelope::builder()
        .aggregate_id(aggregate_id)
        .aggregate_type(aggregate_type)
        .event_type(event_type)
        .version(Version::new(version))
        .payload_raw(serde_json::json!({ "type": event_type, "data": { "by": "bench" } }))
        .actor("bench")
        .build()
        .unwrap()
}

/// A table created and then taken through `cycles` reserve/occupy/release
/// rounds.
fn table_stream(table_id: AggregateId, cycles: usize) -> Vec<EventEnvelope> {
    let mut events = vec![envelope(table_id, "Table", "TableCreated", 1)];
    for (i, event_type) in TABLE_CYCLE.iter().cycle().take(cycles * 3).enumerate() {
        events.push(envelope(table_id, "Table", event_type, i as i64 + 2));
    }
    events
}

/// A store holding `tables` busy tables and one paid order per cycle.
fn busy_store(rt: &Runtime, tables: usize, cycles: usize) -> (InMemoryEventStore, AggregateId) {
    let store = InMemoryEventStore::new();
    let first = AggregateId::new();
    rt.block_on(async {
        for t in 0..tables {
            let table_id = if t == 0 { first } else { AggregateId::new() };
            store
                .append(table_stream(table_id, cycles), AppendOptions::expect_new())
                .await
                .unwrap();
            for _ in 0..cycles {
                let order_id = AggregateId::new();
                let order = vec![
                    envelope(order_id, "Order", "OrderPlaced", 1),
                    envelope(order_id, "Order", "OrderPaid", 2),
                ];
                store.append(order, AppendOptions::expect_new()).await.unwrap();
            }
        }
    });
    (store, first)
}

fn bench_place_order_atomically(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store = InMemoryEventStore::new();

    c.bench_function("event_store/place_order_atomic", |b| {
        b.iter_batched(
            || {
                let table_id = AggregateId::new();
                let order_id = AggregateId::new();
                vec![
                    AppendBatch::new(
                        vec![envelope(order_id, "Order", "OrderPlaced", 1)],
                        AppendOptions::expect_new(),
                    ),
                    AppendBatch::new(
                        vec![envelope(table_id, "Table", "TableOccupied", 1)],
                        AppendOptions::expect_new(),
                    ),
                ]
            },
            |batches| rt.block_on(store.append_atomic(batches)).unwrap(),
            BatchSize::SmallInput,
        );
    });
}

fn bench_table_cycle_with_version_check(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("event_store/table_cycle_checked", |b| {
        b.iter_batched(
            || (InMemoryEventStore::new(), table_stream(AggregateId::new(), 1)),
            |(store, events)| {
                rt.block_on(async {
                    let mut expected = Version::initial();
                    for event in events {
                        expected = store
                            .append(vec![event], AppendOptions::expect_version(expected))
                            .await
                            .unwrap();
                    }
                });
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_load_busy_table(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (store, table_id) = busy_store(&rt, 4, 50);

    c.bench_function("event_store/load_table_151_events", |b| {
        b.iter(|| rt.block_on(store.get_events_for_aggregate(table_id)).unwrap());
    });

    rt.block_on(async {
        let snapshot =
            Snapshot::from_state(table_id, "Table", Version::new(150), &serde_json::json!({}))
                .unwrap();
        store.save_snapshot(snapshot).await.unwrap();
    });

    c.bench_function("event_store/load_table_after_snapshot", |b| {
        b.iter(|| {
            rt.block_on(async {
                let snapshot = store.get_snapshot(table_id).await.unwrap().unwrap();
                store
                    .get_events_for_aggregate_from_version(table_id, snapshot.version.next())
                    .await
                    .unwrap()
            })
        });
    });
}

fn bench_find_payments(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (store, _) = busy_store(&rt, 10, 20);

    c.bench_function("event_store/query_200_payments", |b| {
        b.iter(|| {
            let paid = rt
                .block_on(store.query_events(EventQuery::for_event("Order", "OrderPaid")))
                .unwrap();
            assert_eq!(paid.len(), 200);
        });
    });
}

fn bench_stream_for_catch_up(c: &mut Criterion) {
    use futures_util::StreamExt;

    let rt = Runtime::new().unwrap();
    let (store, _) = busy_store(&rt, 10, 20);

    c.bench_function("event_store/stream_1010_events", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut stream = store.stream_all_events().await.unwrap();
                let mut count = 0;
                while let Some(result) = stream.next().await {
                    result.unwrap();
                    count += 1;
                }
                assert_eq!(count, 1010);
            });
        });
    });
}

criterion_group!(
    benches,
    bench_place_order_atomically,
    bench_table_cycle_with_version_check,
    bench_load_busy_table,
    bench_find_payments,
    bench_stream_for_catch_up,
);
criterion_main!(benches);
