//! Classifier and backoff benchmarks
//!
//! Run with: `cargo bench --bench resilience_bench -p clubhouse-common
//! --features runtime`

use std::time::Duration;

use clubhouse_common::resilience::{BackoffStrategy, ErrorClassifier, RawFailure};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_classifier(c: &mut Criterion) {
    let mut group = c.benchmark_group("classifier");
    let classifier = ErrorClassifier::new();

    let samples = [
        ("network", RawFailure::network("connection reset by peer")),
        ("auth", RawFailure::text("HTTP 401 Unauthorized: token expired")),
        ("server", RawFailure::text("HTTP 503 Service Unavailable: upstream server busy")),
        ("unknown", RawFailure::text("an unremarkable failure with a long tail of text")),
        ("null", RawFailure::null()),
    ];

    for (name, raw) in &samples {
        group.bench_with_input(BenchmarkId::new("online", name), raw, |b, raw| {
            b.iter(|| classifier.classify(black_box(raw), false));
        });
    }

    group.bench_function("offline_override", |b| {
        let raw = RawFailure::text("HTTP 500");
        b.iter(|| classifier.classify(black_box(&raw), true));
    });

    group.finish();
}

fn bench_backoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("backoff");
    let strategies = [
        ("fixed", BackoffStrategy::Fixed(Duration::from_millis(250))),
        (
            "linear",
            BackoffStrategy::Linear {
                initial_delay: Duration::from_millis(100),
                increment: Duration::from_millis(100),
            },
        ),
        (
            "exponential",
            BackoffStrategy::Exponential {
                initial_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(10),
            },
        ),
    ];

    for (name, strategy) in &strategies {
        group.bench_function(*name, |b| {
            b.iter(|| {
                for attempt in 1..=32 {
                    black_box(strategy.calculate_delay(black_box(attempt)));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_classifier, bench_backoff);
criterion_main!(benches);
