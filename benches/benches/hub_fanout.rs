//! Benchmarks for hub broadcast fan-out
//!
//! Performance-critical paths:
//! - `Hub::broadcast`: snapshot, bounded writes, failure sweep
//! - `Envelope::encode`: once per broadcast

#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use serde_json::json;
use std::sync::Arc;
use tally_kernel::ws::{ClientId, Envelope, EnvelopeSink, Hub, WsError, kinds};

struct NullSink;

#[async_trait::async_trait]
impl EnvelopeSink for NullSink {
    async fn send_text(&self, text: String) -> Result<(), WsError> {
        black_box(text);
        Ok(())
    }

    fn close(&self) {}

    fn is_closed(&self) -> bool {
        false
    }
}

fn bench_encode(c: &mut Criterion) {
    let envelope = Envelope::new(
        kinds::WHATSAPP_STATUS,
        json!({ "status": "connected", "connected": true, "message": "WhatsApp connected" }),
    );
    c.bench_function("envelope_encode", |b| {
        b.iter(|| black_box(envelope.encode()));
    });
}

fn bench_broadcast(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("broadcast");

    for size in [10_usize, 100, 1000] {
        let hub = Hub::standalone();
        for _ in 0..size {
            hub.registry().insert(ClientId::generate(), Arc::new(NullSink));
        }
        group.bench_with_input(BenchmarkId::from_parameter(size), &hub, |b, hub| {
            b.to_async(&runtime).iter(|| async {
                black_box(hub.notify_device_status("online").await);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_broadcast);
criterion_main!(benches);
