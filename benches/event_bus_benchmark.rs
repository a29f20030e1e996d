use std::sync::Arc;

use bandwidth_router::event_bus::{EventBus, QosLevel};
use criterion::{criterion_group, criterion_main, Criterion};
use tokio::sync::Mutex;

fn publish_to_batched_subscriber(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let bus = Arc::new({
        let bus: EventBus<u64> = EventBus::new();
        bus
    });
    let (_id, rx) = bus.subscribe("bench-topic", QosLevel::Batched);
    let rx = Arc::new(Mutex::new(rx));

    c.bench_function("event_bus publish to one batched subscriber", |b| {
        b.to_async(&rt).iter(|| {
            let bus = Arc::clone(&bus);
            let rx = Arc::clone(&rx);
            async move {
                bus.publish("bench-topic", 1).await.unwrap();
                rx.lock().await.recv().await.unwrap();
            }
        });
    });
}

criterion_group!(benches, publish_to_batched_subscriber);
criterion_main!(benches);
