//! Performance benchmarks for chain-event-bus
//!
//! Run with: cargo bench

use alloy_primitives::{Address, B256, U256};
use chain_event_bus::{DecimalU256, Event, EventBus, EventKind};
use criterion::{criterion_group, criterion_main, Criterion};

fn sample_block(number: u64) -> Event {
    Event::Block {
        number,
        hash: B256::ZERO,
        transaction_count: 0,
        body: serde_json::json!({"gasUsed": 21000}),
        created_at: chrono::Utc::now(),
    }
}

fn sample_transaction(block_number: u64) -> Event {
    Event::Transaction {
        sender: Address::repeat_byte(0x11),
        recipient: Some(Address::repeat_byte(0x22)),
        value: DecimalU256(U256::from(1_000_000_000u64)),
        block_number,
        block_hash: B256::ZERO,
        index: 0,
        receipt: None,
        created_at: chrono::Utc::now(),
    }
}

fn bench_event_serialization(c: &mut Criterion) {
    let event = sample_transaction(1);

    c.bench_function("Event serialize", |b| {
        b.iter(|| serde_json::to_vec(&event).unwrap());
    });

    let bytes = serde_json::to_vec(&event).unwrap();
    c.bench_function("Event deserialize", |b| {
        b.iter(|| serde_json::from_slice::<Event>(&bytes).unwrap());
    });
}

fn bench_publish_no_subscribers(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("publish, no subscribers", |b| {
        b.to_async(&rt).iter(|| async {
            let bus = EventBus::new();
            bus.publish(sample_block(1)).await
        });
    });
}

fn bench_publish_with_subscribers(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("publish_with_subscribers");
    for subscriber_count in [1, 10, 100] {
        group.bench_function(format!("{subscriber_count} subscribers"), |b| {
            b.to_async(&rt).iter(|| async move {
                let bus = EventBus::new();
                let mut subs = Vec::with_capacity(subscriber_count);
                for i in 0..subscriber_count {
                    subs.push(
                        bus.subscribe(format!("sub-{i}"), [EventKind::Block], None, 64)
                            .await
                            .unwrap(),
                    );
                }
                bus.publish(sample_block(1)).await;
                for sub in &mut subs {
                    let _ = sub.recv().await;
                }
            });
        });
    }
    group.finish();
}

fn bench_publish_throughput(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("publish_throughput");
    for count in [10, 100, 1000] {
        group.bench_function(format!("{count} events"), |b| {
            b.to_async(&rt).iter(|| async move {
                let bus = EventBus::new();
                for i in 0..count {
                    bus.publish(sample_block(i)).await;
                }
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_event_serialization,
    bench_publish_no_subscribers,
    bench_publish_with_subscribers,
    bench_publish_throughput,
);
criterion_main!(benches);
