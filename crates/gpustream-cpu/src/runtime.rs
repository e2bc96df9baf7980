//! Host-simulated native runtime.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use gpustream_core::runtime::NativeResult;
use gpustream_core::{
    Backend, DefaultStreamMode, DevicePtr, EventHandle, NativeError, StreamError, StreamHandle,
    StreamResult, StreamRuntime, StreamView,
};

use crate::config::HostRuntimeConfig;
use crate::faults::{CallCounts, FaultPlan, NativeOp};
use crate::status;

/// First handle value handed out for created streams, clear of the
/// well-known constants.
const FIRST_STREAM_HANDLE: usize = 0x1000;

/// Simulated stream: work completes at `tail`.
#[derive(Debug)]
struct StreamState {
    tail: Instant,
}

impl StreamState {
    fn idle() -> Self {
        Self {
            tail: Instant::now(),
        }
    }

    /// Point in time at which everything enqueued so far is done.
    fn completion(&self) -> Instant {
        self.tail.max(Instant::now())
    }

    /// Push the tail out by `work`; `None` if the timeline would overflow.
    fn enqueue(&mut self, work: Duration) -> Option<()> {
        self.tail = self.completion().checked_add(work)?;
        Some(())
    }
}

#[derive(Debug, Default)]
struct EventState {
    recorded_at: Option<Instant>,
}

/// CPU-based implementation of [`StreamRuntime`].
///
/// Streams are timelines: enqueued work pushes a stream's completion time
/// forward, synchronizing sleeps until it. Events capture the completion time
/// at which they were recorded, so elapsed times reflect stream order rather
/// than issue time. Used for tests, benchmarks and as a fallback when no GPU
/// is available.
pub struct HostRuntime {
    config: HostRuntimeConfig,
    next_stream: AtomicUsize,
    next_event: AtomicUsize,
    next_alloc: AtomicU64,
    /// Created and well-known streams.
    streams: Mutex<HashMap<StreamHandle, StreamState>>,
    events: Mutex<HashMap<EventHandle, EventState>>,
    allocations: Mutex<HashMap<DevicePtr, usize>>,
    faults: FaultPlan,
    calls: CallCounts,
}

impl HostRuntime {
    /// Create a host runtime with default configuration.
    pub fn new() -> Self {
        Self::with_config(HostRuntimeConfig::default())
    }

    /// Create a host runtime with `config`.
    pub fn with_config(config: HostRuntimeConfig) -> Self {
        info!(
            device = config.device_ordinal,
            l2_cache_bytes = config.l2_cache_bytes,
            mode = config.mode.label(),
            "Initializing host stream runtime"
        );

        let mut streams = HashMap::new();
        streams.insert(StreamHandle::LEGACY, StreamState::idle());
        streams.insert(StreamHandle::PER_THREAD, StreamState::idle());

        Self {
            config,
            next_stream: AtomicUsize::new(FIRST_STREAM_HANDLE),
            next_event: AtomicUsize::new(1),
            next_alloc: AtomicU64::new(0x7f00_0000_0000),
            streams: Mutex::new(streams),
            events: Mutex::new(HashMap::new()),
            allocations: Mutex::new(HashMap::new()),
            faults: FaultPlan::default(),
            calls: CallCounts::default(),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &HostRuntimeConfig {
        &self.config
    }

    /// Failure schedule for native calls.
    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }

    /// Native call counters.
    pub fn calls(&self) -> &CallCounts {
        &self.calls
    }

    /// Streams created and not yet destroyed.
    pub fn live_streams(&self) -> usize {
        self.streams
            .lock()
            .keys()
            .filter(|h| !Self::is_well_known(**h))
            .count()
    }

    /// Events created and not yet destroyed.
    pub fn live_events(&self) -> usize {
        self.events.lock().len()
    }

    /// Device allocations not yet freed.
    pub fn live_allocations(&self) -> usize {
        self.allocations.lock().len()
    }

    /// Simulate `work` worth of kernels enqueued on `stream`.
    pub fn enqueue_work(&self, stream: StreamView, work: Duration) -> StreamResult<()> {
        let key = self.resolve(stream.value());
        let mut streams = self.streams.lock();
        let state = streams.get_mut(&key).ok_or_else(|| StreamError::Native {
            operation: "enqueue work",
            status: status::invalid_handle(),
        })?;
        state.enqueue(work).ok_or_else(|| StreamError::Native {
            operation: "enqueue work",
            status: status::invalid_value(),
        })
    }

    fn is_well_known(handle: StreamHandle) -> bool {
        handle == StreamHandle::LEGACY || handle == StreamHandle::PER_THREAD
    }

    /// Map the null handle to the stream it denotes under the configured mode.
    fn resolve(&self, handle: StreamHandle) -> StreamHandle {
        if handle.is_null() {
            match self.config.mode {
                DefaultStreamMode::Legacy => StreamHandle::LEGACY,
                DefaultStreamMode::PerThreadDefault => StreamHandle::PER_THREAD,
            }
        } else {
            handle
        }
    }

    fn enter(&self, op: NativeOp) -> NativeResult<()> {
        self.calls.bump(op);
        self.faults.check(op)
    }

    /// Run `f` against the state of `stream`.
    fn with_stream<T>(
        &self,
        stream: StreamHandle,
        f: impl FnOnce(&mut StreamState) -> T,
    ) -> NativeResult<T> {
        let key = self.resolve(stream);
        let mut streams = self.streams.lock();
        streams.get_mut(&key).map(f).ok_or_else(status::invalid_handle)
    }

    /// Simulated time to clear `bytes`. Fails when the configured bandwidth
    /// cannot produce a representable duration.
    fn memset_duration(&self, bytes: usize) -> NativeResult<Duration> {
        let rate = self.config.memset_bytes_per_sec;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(status::invalid_value());
        }
        Duration::try_from_secs_f64(bytes as f64 / rate).map_err(|_| status::invalid_value())
    }

    fn wait_until(deadline: Instant) {
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }
}

impl Default for HostRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamRuntime for HostRuntime {
    fn backend(&self) -> Backend {
        Backend::Cpu
    }

    fn create_stream(&self) -> NativeResult<StreamHandle> {
        self.enter(NativeOp::CreateStream)?;
        let handle = StreamHandle::from_raw(self.next_stream.fetch_add(1, Ordering::Relaxed));
        self.streams.lock().insert(handle, StreamState::idle());
        debug!(stream = %handle, "Host stream created");
        Ok(handle)
    }

    fn destroy_stream(&self, stream: StreamHandle) -> NativeResult<()> {
        self.enter(NativeOp::DestroyStream)?;
        if stream.is_null() || Self::is_well_known(stream) {
            warn!(stream = %stream, "Refusing to destroy a well-known stream");
            return Err(status::invalid_handle());
        }
        // Returns immediately; work already enqueued is not waited for.
        self.streams
            .lock()
            .remove(&stream)
            .ok_or_else(status::invalid_handle)?;
        debug!(stream = %stream, "Host stream destroyed");
        Ok(())
    }

    fn synchronize_stream(&self, stream: StreamHandle) -> NativeResult<()> {
        self.enter(NativeOp::SynchronizeStream)?;
        let deadline = self.with_stream(stream, |s| s.completion())?;
        Self::wait_until(deadline);
        Ok(())
    }

    fn create_event(&self) -> NativeResult<EventHandle> {
        self.enter(NativeOp::CreateEvent)?;
        let event = EventHandle::from_raw(self.next_event.fetch_add(1, Ordering::Relaxed));
        self.events.lock().insert(event, EventState::default());
        Ok(event)
    }

    fn destroy_event(&self, event: EventHandle) -> NativeResult<()> {
        self.enter(NativeOp::DestroyEvent)?;
        self.events
            .lock()
            .remove(&event)
            .map(|_| ())
            .ok_or_else(status::invalid_handle)
    }

    fn record_event(&self, event: EventHandle, stream: StreamHandle) -> NativeResult<()> {
        self.enter(NativeOp::RecordEvent)?;
        let at = self.with_stream(stream, |s| s.completion())?;
        let mut events = self.events.lock();
        let state = events.get_mut(&event).ok_or_else(status::invalid_handle)?;
        state.recorded_at = Some(at);
        Ok(())
    }

    fn synchronize_event(&self, event: EventHandle) -> NativeResult<()> {
        self.enter(NativeOp::SynchronizeEvent)?;
        let recorded_at = self
            .events
            .lock()
            .get(&event)
            .ok_or_else(status::invalid_handle)?
            .recorded_at;
        // Waiting on a never-recorded event succeeds immediately.
        if let Some(at) = recorded_at {
            Self::wait_until(at);
        }
        Ok(())
    }

    fn elapsed_ms(&self, start: EventHandle, stop: EventHandle) -> NativeResult<f32> {
        self.enter(NativeOp::ElapsedTime)?;
        let events = self.events.lock();
        let recorded = |e: EventHandle| -> NativeResult<Instant> {
            events
                .get(&e)
                .ok_or_else(status::invalid_handle)?
                .recorded_at
                .ok_or_else(status::invalid_handle)
        };
        let (start_at, stop_at) = (recorded(start)?, recorded(stop)?);
        if stop_at > Instant::now() {
            return Err(status::not_ready());
        }
        let elapsed = stop_at.saturating_duration_since(start_at);
        Ok((elapsed.as_secs_f64() * 1000.0) as f32)
    }

    fn current_device(&self) -> NativeResult<i32> {
        self.enter(NativeOp::CurrentDevice)?;
        Ok(self.config.device_ordinal)
    }

    fn l2_cache_size(&self, device: i32) -> NativeResult<usize> {
        self.enter(NativeOp::DeviceAttribute)?;
        if device != self.config.device_ordinal {
            return Err(NativeError::new(101, "CUDA_ERROR_INVALID_DEVICE"));
        }
        Ok(self.config.l2_cache_bytes)
    }

    fn alloc_async(&self, bytes: usize, stream: StreamHandle) -> NativeResult<DevicePtr> {
        self.enter(NativeOp::AllocAsync)?;
        self.with_stream(stream, |_| ())?;
        let ptr = DevicePtr::from_raw(self.next_alloc.fetch_add(
            (bytes.max(1) as u64).next_multiple_of(256),
            Ordering::Relaxed,
        ));
        self.allocations.lock().insert(ptr, bytes);
        Ok(ptr)
    }

    fn memset_async(
        &self,
        ptr: DevicePtr,
        _value: u8,
        bytes: usize,
        stream: StreamHandle,
    ) -> NativeResult<()> {
        self.enter(NativeOp::MemsetAsync)?;
        let size = *self
            .allocations
            .lock()
            .get(&ptr)
            .ok_or_else(status::invalid_value)?;
        if bytes > size {
            return Err(status::invalid_value());
        }
        let work = self.memset_duration(bytes)?;
        self.with_stream(stream, |s| s.enqueue(work))?
            .ok_or_else(status::invalid_value)
    }

    fn free_async(&self, ptr: DevicePtr, stream: StreamHandle) -> NativeResult<()> {
        self.enter(NativeOp::FreeAsync)?;
        self.with_stream(stream, |_| ())?;
        self.allocations
            .lock()
            .remove(&ptr)
            .map(|_| ())
            .ok_or_else(status::invalid_value)
    }
}
