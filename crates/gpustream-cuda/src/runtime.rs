//! CUDA driver implementation of the stream runtime.

use std::sync::Arc;

use cudarc::driver::result as cuda_result;
use cudarc::driver::sys as cuda_sys;
use cudarc::driver::CudaContext;

use gpustream_core::runtime::NativeResult;
use gpustream_core::{
    Backend, DefaultStreamMode, DevicePtr, EventHandle, NativeError, StreamError, StreamHandle,
    StreamResult, StreamRuntime,
};

/// Convert a driver error into a native status.
fn native(err: cuda_result::DriverError) -> NativeError {
    let name = err
        .error_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|_| format!("{:?}", err.0));
    NativeError::new(err.0 as i32, name)
}

/// [`StreamRuntime`] backed by the CUDA driver API through cudarc.
///
/// The device context is bound to the calling thread before every call, so
/// the runtime can be shared across threads.
pub struct CudaStreamRuntime {
    ctx: Arc<CudaContext>,
    ordinal: usize,
    mode: DefaultStreamMode,
}

impl CudaStreamRuntime {
    /// Create a runtime on device `ordinal` for the compiled-in default-stream mode.
    pub fn new(ordinal: usize) -> StreamResult<Self> {
        Self::with_mode(ordinal, DefaultStreamMode::ACTIVE)
    }

    /// Create a runtime on device `ordinal` resolving the null stream under `mode`.
    pub fn with_mode(ordinal: usize, mode: DefaultStreamMode) -> StreamResult<Self> {
        let ctx = CudaContext::new(ordinal).map_err(|e| StreamError::Native {
            operation: "context create",
            status: native(e),
        })?;
        tracing::info!(ordinal, mode = mode.label(), "Initialized CUDA stream runtime");
        Ok(Self { ctx, ordinal, mode })
    }

    /// Device ordinal.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// The underlying cudarc context.
    pub fn context(&self) -> &Arc<CudaContext> {
        &self.ctx
    }

    fn bind(&self) -> NativeResult<()> {
        self.ctx.bind_to_thread().map_err(native)
    }

    /// Driver stream for `handle`.
    ///
    /// The driver API always treats a null stream as the legacy stream, so
    /// under per-thread-default mode it is translated explicitly.
    fn cu_stream(&self, handle: StreamHandle) -> cuda_sys::CUstream {
        let raw = match (handle.is_null(), self.mode) {
            (true, DefaultStreamMode::PerThreadDefault) => StreamHandle::PER_THREAD.as_raw(),
            _ => handle.as_raw(),
        };
        raw as cuda_sys::CUstream
    }

    fn cu_event(event: EventHandle) -> cuda_sys::CUevent {
        event.as_raw() as cuda_sys::CUevent
    }
}

impl StreamRuntime for CudaStreamRuntime {
    fn backend(&self) -> Backend {
        Backend::Cuda
    }

    fn create_stream(&self) -> NativeResult<StreamHandle> {
        self.bind()?;
        let stream =
            cuda_result::stream::create(cuda_result::stream::StreamKind::NonBlocking)
                .map_err(native)?;
        Ok(StreamHandle::from_raw(stream as usize))
    }

    fn destroy_stream(&self, stream: StreamHandle) -> NativeResult<()> {
        self.bind()?;
        // SAFETY: only handles returned by create_stream are destroyed.
        unsafe { cuda_result::stream::destroy(self.cu_stream(stream)) }.map_err(native)
    }

    fn synchronize_stream(&self, stream: StreamHandle) -> NativeResult<()> {
        self.bind()?;
        // SAFETY: the caller keeps the stream alive for the duration of the call.
        unsafe { cuda_result::stream::synchronize(self.cu_stream(stream)) }.map_err(native)
    }

    fn create_event(&self) -> NativeResult<EventHandle> {
        self.bind()?;
        let event = cuda_result::event::create(cuda_sys::CUevent_flags::CU_EVENT_DEFAULT)
            .map_err(native)?;
        Ok(EventHandle::from_raw(event as usize))
    }

    fn destroy_event(&self, event: EventHandle) -> NativeResult<()> {
        self.bind()?;
        // SAFETY: events are destroyed once by their owner.
        unsafe { cuda_result::event::destroy(Self::cu_event(event)) }.map_err(native)
    }

    fn record_event(&self, event: EventHandle, stream: StreamHandle) -> NativeResult<()> {
        self.bind()?;
        // SAFETY: both handles are live for the duration of the call.
        unsafe { cuda_result::event::record(Self::cu_event(event), self.cu_stream(stream)) }
            .map_err(native)
    }

    fn synchronize_event(&self, event: EventHandle) -> NativeResult<()> {
        self.bind()?;
        // SAFETY: the event is live.
        unsafe { cuda_result::event::synchronize(Self::cu_event(event)) }.map_err(native)
    }

    fn elapsed_ms(&self, start: EventHandle, stop: EventHandle) -> NativeResult<f32> {
        self.bind()?;
        // SAFETY: both events are live and have been recorded.
        unsafe { cuda_result::event::elapsed(Self::cu_event(start), Self::cu_event(stop)) }
            .map_err(native)
    }

    fn current_device(&self) -> NativeResult<i32> {
        self.bind()?;
        let mut device: cuda_sys::CUdevice = 0;
        // SAFETY: a context is bound to this thread.
        unsafe { cuda_sys::cuCtxGetDevice(&mut device) }
            .result()
            .map_err(native)?;
        Ok(device)
    }

    fn l2_cache_size(&self, device: i32) -> NativeResult<usize> {
        self.bind()?;
        let dev = cuda_result::device::get(device).map_err(native)?;
        // SAFETY: dev was obtained from the driver.
        let bytes = unsafe {
            cuda_result::device::get_attribute(
                dev,
                cuda_sys::CUdevice_attribute::CU_DEVICE_ATTRIBUTE_L2_CACHE_SIZE,
            )
        }
        .map_err(native)?;
        Ok(usize::try_from(bytes).unwrap_or(0))
    }

    fn alloc_async(&self, bytes: usize, stream: StreamHandle) -> NativeResult<DevicePtr> {
        self.bind()?;
        // SAFETY: the stream is live; the memory is only written before use.
        let ptr = unsafe { cuda_result::malloc_async(self.cu_stream(stream), bytes) }
            .map_err(native)?;
        Ok(DevicePtr::from_raw(ptr))
    }

    fn memset_async(
        &self,
        ptr: DevicePtr,
        value: u8,
        bytes: usize,
        stream: StreamHandle,
    ) -> NativeResult<()> {
        self.bind()?;
        // SAFETY: ptr came from alloc_async with at least `bytes` bytes.
        unsafe {
            cuda_result::memset_d8_async(ptr.as_raw(), value, bytes, self.cu_stream(stream))
        }
        .map_err(native)
    }

    fn free_async(&self, ptr: DevicePtr, stream: StreamHandle) -> NativeResult<()> {
        self.bind()?;
        // SAFETY: ptr came from alloc_async and is freed once.
        unsafe { cuda_result::free_async(ptr.as_raw(), self.cu_stream(stream)) }.map_err(native)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires CUDA hardware
    fn test_cuda_stream_lifecycle() {
        let runtime = CudaStreamRuntime::new(0).expect("Failed to create runtime");
        let stream = runtime.create_stream().expect("Failed to create stream");
        assert!(!stream.is_null());
        runtime.synchronize_stream(stream).expect("Failed to sync");
        runtime.destroy_stream(stream).expect("Failed to destroy");
    }

    #[test]
    #[ignore] // Requires CUDA hardware
    fn test_cuda_event_elapsed() {
        let runtime = CudaStreamRuntime::new(0).expect("Failed to create runtime");
        let start = runtime.create_event().expect("Failed to create event");
        let stop = runtime.create_event().expect("Failed to create event");
        runtime.record_event(start, StreamHandle::NULL).unwrap();
        runtime.record_event(stop, StreamHandle::NULL).unwrap();
        runtime.synchronize_event(stop).unwrap();
        assert!(runtime.elapsed_ms(start, stop).unwrap() >= 0.0);
        runtime.destroy_event(start).unwrap();
        runtime.destroy_event(stop).unwrap();
    }
}
