//! Stream Synchronization Benchmarks
//!
//! These benchmarks measure:
//! - Owned stream creation and destruction
//! - Synchronizing an idle stream (owned and default)
//! - Timer overhead with and without an L2 flush
//! - Stream-ordered timing of simulated work, reported by ScopedTimer

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use gpustream::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Benchmark stream creation and destruction
fn bench_stream_lifecycle(c: &mut Criterion) {
    init_tracing();
    let runtime = Arc::new(HostRuntime::new());

    c.bench_function("stream/create_destroy", |b| {
        b.iter(|| {
            let stream = ExecutionStream::with_runtime(runtime.clone()).unwrap();
            black_box(stream.value());
        });
    });
}

/// Benchmark synchronizing idle streams
fn bench_synchronize(c: &mut Criterion) {
    let runtime = Arc::new(HostRuntime::new());
    let stream = ExecutionStream::with_runtime(runtime.clone()).unwrap();
    let mut group = c.benchmark_group("synchronize");

    group.bench_function("owned", |b| {
        b.iter(|| stream.synchronize().unwrap());
    });

    group.bench_function("default", |b| {
        b.iter(|| STREAM_DEFAULT.synchronize_on(runtime.as_ref()).unwrap());
    });

    group.finish();
}

/// Benchmark the cost of an empty timed region
fn bench_timer_overhead(c: &mut Criterion) {
    let runtime = Arc::new(HostRuntime::new());
    let stream = ExecutionStream::with_runtime(runtime.clone()).unwrap();
    let mut group = c.benchmark_group("timer/overhead");

    for flush in [false, true] {
        group.bench_with_input(BenchmarkId::new("flush_cache", flush), &flush, |b, &flush| {
            let mut log = IterationLog::new();
            b.iter(|| {
                let timer =
                    ScopedTimer::with_runtime(runtime.clone(), &mut log, stream.view(), flush)
                        .unwrap();
                black_box(timer.stream());
            });
        });
    }

    group.finish();
}

/// Stream-ordered timing: criterion is fed the durations ScopedTimer reports
fn bench_stream_work(c: &mut Criterion) {
    let runtime = Arc::new(HostRuntime::new());
    let stream = ExecutionStream::with_runtime(runtime.clone()).unwrap();
    let mut group = c.benchmark_group("stream/work");
    group.sample_size(10);

    for micros in [50u64, 200, 1000] {
        let work = Duration::from_micros(micros);
        group.bench_with_input(BenchmarkId::new("micros", micros), &work, |b, &work| {
            b.iter_custom(|iters| {
                let mut log = IterationLog::new();
                for _ in 0..iters {
                    let _timer =
                        ScopedTimer::with_runtime(runtime.clone(), &mut log, stream.view(), true)
                            .unwrap();
                    runtime.enqueue_work(stream.view(), work).unwrap();
                }
                Duration::from_secs_f64(log.total())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_stream_lifecycle,
    bench_synchronize,
    bench_timer_overhead,
    bench_stream_work
);
criterion_main!(benches);
