//! Event-based timing of a stream region.
//!
//! ```ignore
//! use gpustream_core::{IterationLog, ScopedTimer};
//!
//! let mut log = IterationLog::new();
//! {
//!     let _timer = ScopedTimer::new(&mut log, stream.view(), true)?;
//!     // ... enqueue work on stream ...
//! }
//! println!("{:.6} s", log.last().unwrap_or_default());
//! ```

use std::sync::Arc;

use crate::error::{ResourceKind, StreamError, StreamResult};
use crate::fatal;
use crate::handle::{DevicePtr, EventHandle};
use crate::runtime::{current_runtime, StreamRuntime};
use crate::view::StreamView;

/// Receiver of measured iteration times.
pub trait IterationSink {
    /// Report one measured iteration, in seconds.
    fn record_iteration_seconds(&mut self, seconds: f64);
}

impl<S: IterationSink + ?Sized> IterationSink for &mut S {
    fn record_iteration_seconds(&mut self, seconds: f64) {
        (**self).record_iteration_seconds(seconds);
    }
}

/// Sink collecting every reported iteration.
#[derive(Debug, Clone, Default)]
pub struct IterationLog {
    samples: Vec<f64>,
}

impl IterationLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All samples in report order, in seconds.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Number of samples.
    pub fn count(&self) -> usize {
        self.samples.len()
    }

    /// Most recent sample.
    pub fn last(&self) -> Option<f64> {
        self.samples.last().copied()
    }

    /// Sum of all samples.
    pub fn total(&self) -> f64 {
        self.samples.iter().sum()
    }

    /// Mean sample, or `None` if empty.
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            None
        } else {
            Some(self.total() / self.samples.len() as f64)
        }
    }

    /// Smallest sample.
    pub fn min(&self) -> Option<f64> {
        self.samples.iter().copied().reduce(f64::min)
    }

    /// Largest sample.
    pub fn max(&self) -> Option<f64> {
        self.samples.iter().copied().reduce(f64::max)
    }

    /// Drop all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl IterationSink for IterationLog {
    fn record_iteration_seconds(&mut self, seconds: f64) {
        self.samples.push(seconds);
    }
}

/// Scratch device allocation freed in stream order when dropped.
struct ScratchBuffer<'r> {
    ptr: DevicePtr,
    stream: StreamView,
    runtime: &'r dyn StreamRuntime,
}

impl<'r> ScratchBuffer<'r> {
    fn new(runtime: &'r dyn StreamRuntime, bytes: usize, stream: StreamView) -> StreamResult<Self> {
        let ptr = runtime
            .alloc_async(bytes, stream.value())
            .map_err(|status| StreamError::ResourceCreation {
                resource: ResourceKind::DeviceMemory,
                status,
            })?;
        Ok(Self {
            ptr,
            stream,
            runtime,
        })
    }
}

impl Drop for ScratchBuffer<'_> {
    fn drop(&mut self) {
        fatal::assert_success(
            self.runtime.free_async(self.ptr, self.stream.value()),
            "scratch free",
        );
    }
}

/// Evict the last-level cache by writing a buffer of its size on `stream`.
fn flush_l2_cache(runtime: &dyn StreamRuntime, stream: StreamView) -> StreamResult<()> {
    let device = runtime
        .current_device()
        .map_err(|status| StreamError::Native {
            operation: "device query",
            status,
        })?;
    let bytes = runtime
        .l2_cache_size(device)
        .map_err(|status| StreamError::Native {
            operation: "device attribute query",
            status,
        })?;
    if bytes == 0 {
        return Ok(());
    }

    let scratch = ScratchBuffer::new(runtime, bytes, stream)?;
    runtime
        .memset_async(scratch.ptr, 0, bytes, stream.value())
        .map_err(|status| StreamError::Native {
            operation: "memset",
            status,
        })?;
    tracing::trace!(device, bytes, %stream, "Flushed L2 cache");
    Ok(())
}

/// Owns one event; destroys it unless released into a timer.
struct EventGuard<'r> {
    event: EventHandle,
    runtime: &'r dyn StreamRuntime,
    armed: bool,
}

impl<'r> EventGuard<'r> {
    fn create(runtime: &'r dyn StreamRuntime) -> StreamResult<Self> {
        let event = runtime
            .create_event()
            .map_err(|status| StreamError::ResourceCreation {
                resource: ResourceKind::Event,
                status,
            })?;
        Ok(Self {
            event,
            runtime,
            armed: true,
        })
    }

    fn release(mut self) -> EventHandle {
        self.armed = false;
        self.event
    }
}

impl Drop for EventGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            fatal::assert_success(self.runtime.destroy_event(self.event), "event destroy");
        }
    }
}

/// Times the stream work enqueued during its lifetime.
///
/// A start event is recorded into the stream on construction. On drop, a stop
/// event is recorded, the stream is waited on up to that point and the
/// elapsed time is reported to the sink in seconds, exactly once. Failures on
/// the drop path abort the process.
///
/// The timer borrows its sink mutably, so it lives within the scope that owns
/// the sink.
pub struct ScopedTimer<'a, S: IterationSink + ?Sized> {
    sink: &'a mut S,
    stream: StreamView,
    runtime: Arc<dyn StreamRuntime>,
    start: EventHandle,
    stop: EventHandle,
}

impl<'a, S: IterationSink + ?Sized> ScopedTimer<'a, S> {
    /// Start timing `stream` on the process-wide runtime.
    ///
    /// With `flush_cache`, the device's last-level cache is overwritten on
    /// `stream` before the start event so cached data does not flatter the
    /// measurement.
    pub fn new(sink: &'a mut S, stream: StreamView, flush_cache: bool) -> StreamResult<Self> {
        Self::with_runtime(current_runtime()?, sink, stream, flush_cache)
    }

    /// Start timing `stream` on `runtime`.
    pub fn with_runtime(
        runtime: Arc<dyn StreamRuntime>,
        sink: &'a mut S,
        stream: StreamView,
        flush_cache: bool,
    ) -> StreamResult<Self> {
        if flush_cache {
            flush_l2_cache(runtime.as_ref(), stream)?;
        }

        let start = EventGuard::create(runtime.as_ref())?;
        let stop = EventGuard::create(runtime.as_ref())?;
        runtime
            .record_event(start.event, stream.value())
            .map_err(|status| StreamError::Native {
                operation: "event record",
                status,
            })?;

        Ok(Self {
            start: start.release(),
            stop: stop.release(),
            sink,
            stream,
            runtime,
        })
    }

    /// Stream being timed.
    pub fn stream(&self) -> StreamView {
        self.stream
    }
}

impl<S: IterationSink + ?Sized> Drop for ScopedTimer<'_, S> {
    fn drop(&mut self) {
        let runtime = self.runtime.as_ref();
        fatal::assert_success(
            runtime.record_event(self.stop, self.stream.value()),
            "event record",
        );
        fatal::assert_success(runtime.synchronize_event(self.stop), "event synchronize");

        let milliseconds =
            fatal::expect_success(runtime.elapsed_ms(self.start, self.stop), "event elapsed time");
        let seconds = f64::from(milliseconds) / 1000.0;
        self.sink.record_iteration_seconds(seconds);
        tracing::trace!(stream = %self.stream, seconds, "Timed region");

        fatal::assert_success(runtime.destroy_event(self.start), "event destroy");
        fatal::assert_success(runtime.destroy_event(self.stop), "event destroy");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_log_stats() {
        let mut log = IterationLog::new();
        assert_eq!(log.mean(), None);
        assert_eq!(log.min(), None);

        log.record_iteration_seconds(0.5);
        log.record_iteration_seconds(1.5);
        log.record_iteration_seconds(1.0);

        assert_eq!(log.count(), 3);
        assert_eq!(log.last(), Some(1.0));
        assert!((log.total() - 3.0).abs() < 1e-12);
        assert_eq!(log.mean(), Some(1.0));
        assert_eq!(log.min(), Some(0.5));
        assert_eq!(log.max(), Some(1.5));

        log.clear();
        assert_eq!(log.count(), 0);
    }

    #[test]
    fn test_sink_through_mut_ref() {
        let mut log = IterationLog::new();
        fn report<S: IterationSink>(mut sink: S) {
            sink.record_iteration_seconds(2.0);
        }
        report(&mut log);
        assert_eq!(log.samples(), &[2.0]);
    }
}
