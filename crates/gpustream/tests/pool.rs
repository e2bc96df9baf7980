//! Integration tests for the stream pool.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gpustream::prelude::*;
use gpustream::testing::NativeOp;

fn pool_of(runtime: &Arc<HostRuntime>, size: usize) -> StreamPool {
    let config = StreamPoolConfigBuilder::new()
        .with_pool_size(size)
        .build()
        .expect("config");
    StreamPool::with_runtime(runtime.clone(), config).expect("pool")
}

#[test]
fn test_default_pool_size() {
    let runtime = Arc::new(HostRuntime::new());
    let pool = StreamPool::with_runtime(runtime.clone(), StreamPoolConfig::default()).unwrap();
    assert_eq!(pool.pool_size(), DEFAULT_POOL_SIZE);
    assert_eq!(runtime.live_streams(), DEFAULT_POOL_SIZE);
}

#[test]
fn test_round_robin_cycles_all_streams() {
    let runtime = Arc::new(HostRuntime::new());
    let pool = pool_of(&runtime, 4);

    let first: Vec<_> = (0..4).map(|_| pool.get_stream()).collect();
    let distinct: HashSet<_> = first.iter().copied().collect();
    assert_eq!(distinct.len(), 4);
    assert!(first.iter().all(|v| pool.contains(*v)));
    assert!(first
        .iter()
        .all(|v| !DefaultStreamRegistry::ACTIVE.is_well_known(*v)));

    // The cycle repeats in the same order.
    let second: Vec<_> = (0..4).map(|_| pool.get_stream()).collect();
    assert_eq!(first, second);
}

#[test]
fn test_stream_by_id_wraps() {
    let runtime = Arc::new(HostRuntime::new());
    let pool = pool_of(&runtime, 3);
    assert_eq!(pool.get_stream_by_id(1), pool.get_stream_by_id(4));
    assert_ne!(pool.get_stream_by_id(0), pool.get_stream_by_id(1));
    assert!(!pool.contains(STREAM_DEFAULT));
}

#[test]
fn test_zero_sized_pool_rejected() {
    let err = StreamPoolConfigBuilder::new()
        .with_pool_size(0)
        .build()
        .unwrap_err();
    assert!(matches!(err, StreamError::InvalidConfig(_)));

    let runtime = Arc::new(HostRuntime::new());
    let config = StreamPoolConfig { pool_size: 0 };
    assert!(StreamPool::with_runtime(runtime.clone(), config).is_err());
    assert_eq!(runtime.calls().get(NativeOp::CreateStream), 0);
}

#[test]
fn test_creation_failure_leaks_nothing() {
    let runtime = Arc::new(HostRuntime::new());
    let config = StreamPoolConfigBuilder::new().with_pool_size(4).build().unwrap();

    runtime.faults().fail_next(NativeOp::CreateStream, 1);
    let err = StreamPool::with_runtime(runtime.clone(), config.clone())
        .err()
        .expect("creation failure");
    assert!(matches!(
        err,
        StreamError::ResourceCreation {
            resource: ResourceKind::Stream,
            ..
        }
    ));
    assert_eq!(runtime.live_streams(), 0);

    let pool = StreamPool::with_runtime(runtime.clone(), config).unwrap();
    assert_eq!(runtime.live_streams(), 4);
    drop(pool);
    assert_eq!(runtime.live_streams(), 0);
}

#[test]
fn test_synchronize_all_waits_for_every_stream() {
    let runtime = Arc::new(HostRuntime::new());
    let pool = pool_of(&runtime, 3);
    let work = Duration::from_millis(10);

    let started = Instant::now();
    for id in 0..3 {
        runtime.enqueue_work(pool.get_stream_by_id(id), work).unwrap();
    }
    pool.synchronize_all().unwrap();
    assert!(started.elapsed() >= work);
}

#[test]
fn test_stats_track_handouts() {
    let runtime = Arc::new(HostRuntime::new());
    let pool = pool_of(&runtime, 2);

    for _ in 0..6 {
        let _ = pool.get_stream();
    }
    let stats = pool.stats();
    assert_eq!(stats.total_handouts, 6);
    assert_eq!(stats.per_stream_handouts, vec![3, 3]);
    assert!((stats.balance_ratio() - 1.0).abs() < 1e-9);
    assert!(stats.to_string().contains("6 hand-outs"));

    for _ in 0..4 {
        let _ = pool.get_stream_by_id(1);
    }
    let stats = pool.stats();
    assert_eq!(stats.most_used_stream(), Some(1));
    assert!(stats.balance_ratio() < 1.0);

    pool.reset_stats();
    assert_eq!(pool.stats().total_handouts, 0);
}

#[test]
fn test_pool_drop_destroys_streams() {
    let runtime = Arc::new(HostRuntime::new());
    {
        let _pool = pool_of(&runtime, 5);
        assert_eq!(runtime.live_streams(), 5);
    }
    assert_eq!(runtime.live_streams(), 0);
    assert_eq!(runtime.calls().get(NativeOp::DestroyStream), 5);
}
