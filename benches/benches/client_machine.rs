//! Benchmarks for the reconnect state machine
//!
//! Performance-critical paths:
//! - `ClientConfig::backoff_delay`: computed on every drop
//! - `ClientMachine::handle`: every frame and timer goes through it

#![allow(missing_docs)]

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;
use tally_client::{ClientConfig, ClientMachine, Event};
use tokio::time::Instant;

fn config() -> ClientConfig {
    ClientConfig::new("ws://127.0.0.1:8080/ws")
        .jitter_range(Duration::from_secs(2))
        .max_attempts(u32::MAX)
}

fn bench_backoff(c: &mut Criterion) {
    let config = config();
    c.bench_function("backoff_delay", |b| {
        b.iter(|| {
            for attempt in 0..40 {
                black_box(config.backoff_delay(black_box(attempt)));
            }
        });
    });
}

fn bench_frames(c: &mut Criterion) {
    let mut machine = ClientMachine::with_seed(config(), 1);
    machine.handle(Event::Start);
    machine.handle(Event::Opened);
    let frames = [
        r#"{"type":"ping","payload":{}}"#,
        r#"{"type":"pong","payload":{}}"#,
        r#"{"type":"device_status","payload":{"status":"online"}}"#,
    ];

    c.bench_function("handle_frames", |b| {
        b.iter(|| {
            for text in frames {
                black_box(machine.handle(Event::Frame {
                    text: text.to_string(),
                    at: Instant::now(),
                }));
            }
        });
    });
}

fn bench_drop_cycle(c: &mut Criterion) {
    let mut machine = ClientMachine::with_seed(config(), 1);
    machine.handle(Event::Start);

    c.bench_function("drop_and_reconnect", |b| {
        b.iter(|| {
            black_box(machine.handle(Event::ConnectFailed("refused".into())));
            black_box(machine.handle(Event::ReconnectDue));
        });
    });
}

criterion_group!(benches, bench_backoff, bench_frames, bench_drop_cycle);
criterion_main!(benches);
