//! Native runtime abstraction.
//!
//! Every call that reaches the GPU driver goes through [`StreamRuntime`].
//! Backends (CUDA via cudarc, the host simulation used in tests) implement it;
//! the stream, timer and pool types only ever talk to this trait.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::{NativeError, StreamError, StreamResult};
use crate::handle::{DevicePtr, EventHandle, StreamHandle};

/// Result of a single native call.
pub type NativeResult<T> = Result<T, NativeError>;

/// Backend implementing the native calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Host simulation.
    Cpu,
    /// NVIDIA CUDA driver.
    Cuda,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Cpu => write!(f, "CPU"),
            Backend::Cuda => write!(f, "CUDA"),
        }
    }
}

/// Native GPU runtime calls used by streams, events and timers.
///
/// Implementations must be callable from any thread. Stream ordering is the
/// runtime's business: operations enqueued on one stream complete in issue
/// order.
pub trait StreamRuntime: Send + Sync {
    /// Which backend this is.
    fn backend(&self) -> Backend;

    /// Create a new stream.
    fn create_stream(&self) -> NativeResult<StreamHandle>;

    /// Destroy a stream previously returned by `create_stream`.
    fn destroy_stream(&self, stream: StreamHandle) -> NativeResult<()>;

    /// Block until all work enqueued on `stream` has completed.
    fn synchronize_stream(&self, stream: StreamHandle) -> NativeResult<()>;

    /// Create a timing-capable event.
    fn create_event(&self) -> NativeResult<EventHandle>;

    /// Destroy an event.
    fn destroy_event(&self, event: EventHandle) -> NativeResult<()>;

    /// Record `event` at the current tail of `stream`.
    fn record_event(&self, event: EventHandle, stream: StreamHandle) -> NativeResult<()>;

    /// Block until `event` has been reached.
    fn synchronize_event(&self, event: EventHandle) -> NativeResult<()>;

    /// Milliseconds elapsed between two completed events.
    fn elapsed_ms(&self, start: EventHandle, stop: EventHandle) -> NativeResult<f32>;

    /// Ordinal of the device active on the calling thread.
    fn current_device(&self) -> NativeResult<i32>;

    /// Size of the device's last-level cache in bytes (0 if it has none).
    fn l2_cache_size(&self, device: i32) -> NativeResult<usize>;

    /// Allocate `bytes` of device memory in stream order.
    fn alloc_async(&self, bytes: usize, stream: StreamHandle) -> NativeResult<DevicePtr>;

    /// Set `bytes` bytes at `ptr` to `value` in stream order.
    fn memset_async(
        &self,
        ptr: DevicePtr,
        value: u8,
        bytes: usize,
        stream: StreamHandle,
    ) -> NativeResult<()>;

    /// Free memory from `alloc_async` in stream order.
    fn free_async(&self, ptr: DevicePtr, stream: StreamHandle) -> NativeResult<()>;
}

static RUNTIME: OnceCell<Arc<dyn StreamRuntime>> = OnceCell::new();

/// Install the process-wide runtime used by the no-argument entry points.
///
/// Only the first call wins. Returns the runtime that ends up installed, which
/// is not `runtime` if another one was installed earlier.
pub fn install_runtime(runtime: Arc<dyn StreamRuntime>) -> Arc<dyn StreamRuntime> {
    let backend = runtime.backend();
    let installed = RUNTIME.get_or_init(|| {
        tracing::info!(%backend, "Installed process-wide stream runtime");
        runtime
    });
    Arc::clone(installed)
}

/// The process-wide runtime, if one has been installed.
pub fn try_current_runtime() -> Option<Arc<dyn StreamRuntime>> {
    RUNTIME.get().cloned()
}

/// The process-wide runtime.
pub fn current_runtime() -> StreamResult<Arc<dyn StreamRuntime>> {
    try_current_runtime().ok_or_else(|| {
        StreamError::RuntimeUnavailable("no stream runtime installed".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_display() {
        assert_eq!(Backend::Cpu.to_string(), "CPU");
        assert_eq!(Backend::Cuda.to_string(), "CUDA");
    }
}
