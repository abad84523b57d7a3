//! Benchmarks for per-recipient message preparation
//!
//! Performance-critical paths:
//! - `render`: placeholder substitution for every recipient of a batch
//! - `format_balance`: thousands grouping
//! - `normalize_phone`: raw phone to messaging address

#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tally_kernel::directory::{Period, Recipient};
use tally_kernel::infrastructure::config::DEFAULT_TEMPLATE;
use tally_kernel::notify::address::normalize_phone;
use tally_kernel::notify::{TemplateValues, format_balance, render};

fn recipient(i: i64) -> Recipient {
    Recipient {
        id: i,
        name: format!("Member {i}"),
        phone: Some(format!("0812{i:08}")),
        balance: i * 12_345,
    }
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let period = Period::new(8, 2024);

    for size in [10_i64, 100, 1000] {
        let recipients: Vec<Recipient> = (1..=size).map(recipient).collect();
        group.bench_with_input(
            BenchmarkId::new("default_template", size),
            &recipients,
            |b, recipients| {
                b.iter(|| {
                    for r in recipients {
                        let values = TemplateValues::for_recipient(r, period, None);
                        black_box(render(black_box(DEFAULT_TEMPLATE), &values));
                    }
                });
            },
        );
    }
    group.finish();
}

fn bench_format_balance(c: &mut Criterion) {
    c.bench_function("format_balance", |b| {
        b.iter(|| {
            for amount in [0_i64, 999, 150_000, -5_000, 1_234_567_890] {
                black_box(format_balance(black_box(amount)));
            }
        });
    });
}

fn bench_normalize_phone(c: &mut Criterion) {
    c.bench_function("normalize_phone", |b| {
        b.iter(|| {
            for raw in ["081234567890", "+62 812-3456-7890", "812 3456 789", "n/a"] {
                black_box(normalize_phone(black_box(raw), "62"));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_render,
    bench_format_balance,
    bench_normalize_phone
);
criterion_main!(benches);
