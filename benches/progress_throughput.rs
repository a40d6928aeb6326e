//! Progress pipeline throughput benchmark.
//!
//! Measures aggregation cost per event and full event-channel relay
//! throughput using Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::sync::mpsc;

use medley_core::progress::{PhasePlan, ProgressAggregator};
use medley_core::task::protocol::TaskEvent;

fn plan() -> PhasePlan {
    PhasePlan::new(["fetch input", "decode audio", "load model", "transcribe"])
}

fn bench_aggregation(c: &mut Criterion) {
    let event_counts: &[usize] = &[64, 1024, 16384];

    let mut group = c.benchmark_group("aggregate_events");
    for &count in event_counts {
        // Pre-build a raw event stream sweeping all phases
        let events: Vec<(usize, f64)> = (0..count)
            .map(|i| (i * 4 / count, (i % 100) as f64))
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(count), &events, |b, events| {
            b.iter(|| {
                let mut agg = ProgressAggregator::new(plan());
                for &(phase, raw) in events {
                    black_box(agg.observe(phase, raw));
                }
                agg.displayed()
            });
        });
    }
    group.finish();
}

fn bench_channel_relay(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let event_counts: &[usize] = &[64, 1024, 4096];

    let mut group = c.benchmark_group("event_relay");
    for &count in event_counts {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                rt.block_on(async {
                    let (tx, mut rx) = mpsc::channel::<TaskEvent>(64);

                    let producer = tokio::spawn(async move {
                        for i in 0..count {
                            let _ = tx
                                .send(TaskEvent::Progress {
                                    phase: i % 4,
                                    raw_percent: (i % 100) as f64,
                                })
                                .await;
                        }
                    });

                    let mut agg = ProgressAggregator::new(plan());
                    while let Some(event) = rx.recv().await {
                        if let TaskEvent::Progress { phase, raw_percent } = event {
                            black_box(agg.observe(phase, raw_percent));
                        }
                    }
                    let _ = producer.await;
                    agg.displayed()
                })
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_aggregation, bench_channel_relay);
criterion_main!(benches);
