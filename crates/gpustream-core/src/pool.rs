//! Fixed-size pool of owned streams.
//!
//! Hands out views of its streams round-robin so independent work can be
//! spread across streams without every caller creating its own.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::StreamPoolConfig;
use crate::error::StreamResult;
use crate::runtime::{current_runtime, StreamRuntime};
use crate::stream::ExecutionStream;
use crate::view::StreamView;

/// Pool of owned streams handed out as views.
///
/// Views returned by the pool are valid for as long as the pool lives.
pub struct StreamPool {
    streams: Vec<ExecutionStream>,
    next: AtomicUsize,
    /// Views handed out per stream.
    handouts: Vec<AtomicU64>,
    created_at: Instant,
}

impl StreamPool {
    /// Create a pool on the process-wide runtime.
    pub fn new(config: StreamPoolConfig) -> StreamResult<Self> {
        Self::with_runtime(current_runtime()?, config)
    }

    /// Create a pool on `runtime`.
    ///
    /// If any stream fails to create, the ones already created are destroyed
    /// and the error is returned.
    pub fn with_runtime(
        runtime: Arc<dyn StreamRuntime>,
        config: StreamPoolConfig,
    ) -> StreamResult<Self> {
        config.validate()?;

        let mut streams = Vec::with_capacity(config.pool_size);
        for _ in 0..config.pool_size {
            streams.push(ExecutionStream::with_runtime(Arc::clone(&runtime))?);
        }
        let handouts = (0..config.pool_size).map(|_| AtomicU64::new(0)).collect();

        tracing::info!(
            pool_size = config.pool_size,
            backend = %runtime.backend(),
            "Created stream pool"
        );

        Ok(Self {
            streams,
            next: AtomicUsize::new(0),
            handouts,
            created_at: Instant::now(),
        })
    }

    /// Next stream in round-robin order.
    pub fn get_stream(&self) -> StreamView {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.streams.len();
        self.view_at(index)
    }

    /// Stream `stream_id` modulo the pool size.
    ///
    /// The same id always maps to the same stream.
    pub fn get_stream_by_id(&self, stream_id: usize) -> StreamView {
        self.view_at(stream_id % self.streams.len())
    }

    /// Number of streams in the pool.
    pub fn pool_size(&self) -> usize {
        self.streams.len()
    }

    /// Whether `view` names one of this pool's streams.
    pub fn contains(&self, view: StreamView) -> bool {
        self.streams.iter().any(|s| s.view() == view)
    }

    /// Block until every stream in the pool is idle.
    pub fn synchronize_all(&self) -> StreamResult<()> {
        for stream in &self.streams {
            stream.synchronize()?;
        }
        Ok(())
    }

    /// Hand-out statistics.
    #[must_use]
    pub fn stats(&self) -> StreamPoolStats {
        let per_stream: Vec<u64> = self
            .handouts
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect();
        let total = per_stream.iter().sum();
        let elapsed_secs = self.created_at.elapsed().as_secs_f64();

        StreamPoolStats {
            total_handouts: total,
            per_stream_handouts: per_stream,
            handouts_per_second: if elapsed_secs > 0.0 {
                total as f64 / elapsed_secs
            } else {
                0.0
            },
        }
    }

    /// Reset hand-out counters.
    pub fn reset_stats(&self) {
        for counter in &self.handouts {
            counter.store(0, Ordering::Relaxed);
        }
    }

    fn view_at(&self, index: usize) -> StreamView {
        self.handouts[index].fetch_add(1, Ordering::Relaxed);
        self.streams[index].view()
    }
}

/// Statistics for stream pool usage.
#[derive(Debug, Clone)]
pub struct StreamPoolStats {
    /// Views handed out across all streams.
    pub total_handouts: u64,
    /// Views handed out per stream.
    pub per_stream_handouts: Vec<u64>,
    /// Average hand-outs per second since creation.
    pub handouts_per_second: f64,
}

impl StreamPoolStats {
    /// Returns the most used stream index.
    #[must_use]
    pub fn most_used_stream(&self) -> Option<usize> {
        self.per_stream_handouts
            .iter()
            .enumerate()
            .max_by_key(|(_, &count)| count)
            .map(|(idx, _)| idx)
    }

    /// Returns the balance ratio (0.0 = all on one stream, 1.0 = perfectly balanced).
    #[must_use]
    pub fn balance_ratio(&self) -> f64 {
        if self.per_stream_handouts.is_empty() || self.total_handouts == 0 {
            return 1.0;
        }

        let n = self.per_stream_handouts.len() as f64;
        let expected = self.total_handouts as f64 / n;
        let variance: f64 = self
            .per_stream_handouts
            .iter()
            .map(|&count| (count as f64 - expected).powi(2))
            .sum::<f64>()
            / n;

        let max_variance = expected.powi(2) * (n - 1.0);
        if max_variance == 0.0 {
            return 1.0;
        }

        1.0 - (variance / max_variance).sqrt()
    }
}

impl std::fmt::Display for StreamPoolStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "StreamPool: {} hand-outs ({:.1}/s) over {} streams, {:.1}% balanced",
            self.total_handouts,
            self.handouts_per_second,
            self.per_stream_handouts.len(),
            self.balance_ratio() * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_balance_perfect() {
        let stats = StreamPoolStats {
            total_handouts: 8,
            per_stream_handouts: vec![2, 2, 2, 2],
            handouts_per_second: 0.0,
        };
        assert!((stats.balance_ratio() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_stats_balance_skewed() {
        let stats = StreamPoolStats {
            total_handouts: 4,
            per_stream_handouts: vec![4, 0, 0, 0],
            handouts_per_second: 0.0,
        };
        assert!(stats.balance_ratio().abs() < 0.001);
        assert_eq!(stats.most_used_stream(), Some(0));
    }

    #[test]
    fn test_stats_display() {
        let stats = StreamPoolStats {
            total_handouts: 4,
            per_stream_handouts: vec![1, 1, 1, 1],
            handouts_per_second: 2.0,
        };
        let display = stats.to_string();
        assert!(display.contains("4 hand-outs"));
        assert!(display.contains("100.0% balanced"));
    }
}
