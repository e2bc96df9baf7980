//! Owning stream wrapper.

use std::fmt;
use std::sync::Arc;

use crate::error::{ResourceKind, StreamError, StreamResult};
use crate::fatal;
use crate::handle::StreamHandle;
use crate::runtime::{current_runtime, StreamRuntime};
use crate::view::StreamView;

/// A stream handle bound to the runtime that must destroy it.
struct OwnedStream {
    handle: StreamHandle,
    runtime: Arc<dyn StreamRuntime>,
}

impl Drop for OwnedStream {
    fn drop(&mut self) {
        tracing::debug!(stream = %self.handle, "Destroying stream");
        fatal::assert_success(self.runtime.destroy_stream(self.handle), "stream destroy");
    }
}

/// Owning wrapper for a native stream.
///
/// Creates a stream on construction and destroys it exactly once on drop.
/// There is one owner per stream: the type is not `Clone`. Ownership moves
/// with the value, or explicitly through [`take`](Self::take), which leaves
/// the source invalid. Accessing the handle of an invalid stream panics.
///
/// Views returned by [`view`](Self::view) alias the owned stream and must not
/// be used after the owner is dropped.
pub struct ExecutionStream {
    inner: Option<OwnedStream>,
}

impl ExecutionStream {
    /// Create a stream on the process-wide runtime.
    pub fn new() -> StreamResult<Self> {
        Self::with_runtime(current_runtime()?)
    }

    /// Create a stream on `runtime`.
    ///
    /// On failure no native stream exists and nothing will be destroyed.
    pub fn with_runtime(runtime: Arc<dyn StreamRuntime>) -> StreamResult<Self> {
        let handle = runtime
            .create_stream()
            .map_err(|status| StreamError::ResourceCreation {
                resource: ResourceKind::Stream,
                status,
            })?;
        tracing::debug!(stream = %handle, backend = %runtime.backend(), "Created stream");
        Ok(Self {
            inner: Some(OwnedStream { handle, runtime }),
        })
    }

    /// False once ownership has been taken out of this instance.
    pub fn is_valid(&self) -> bool {
        self.inner.is_some()
    }

    /// The owned handle.
    ///
    /// # Panics
    ///
    /// Panics if the stream was moved out with [`take`](Self::take).
    #[track_caller]
    pub fn value(&self) -> StreamHandle {
        self.owned().handle
    }

    /// Non-owning view of the owned stream.
    ///
    /// # Panics
    ///
    /// Panics if the stream was moved out with [`take`](Self::take).
    #[track_caller]
    pub fn view(&self) -> StreamView {
        StreamView::new(self.value())
    }

    /// Runtime that owns the native stream.
    #[track_caller]
    pub fn runtime(&self) -> &Arc<dyn StreamRuntime> {
        &self.owned().runtime
    }

    /// Block until all work on the stream has completed.
    #[track_caller]
    pub fn synchronize(&self) -> StreamResult<()> {
        let owned = self.owned();
        self.view().synchronize_on(owned.runtime.as_ref())
    }

    /// Block until all work on the stream has completed, aborting on failure.
    #[track_caller]
    pub fn synchronize_no_throw(&self) {
        let owned = self.owned();
        self.view().synchronize_no_throw_on(owned.runtime.as_ref());
    }

    /// Move ownership out, leaving `self` invalid.
    pub fn take(&mut self) -> ExecutionStream {
        ExecutionStream {
            inner: self.inner.take(),
        }
    }

    /// Move-assign `other` into `self`, destroying the stream `self` owned.
    pub fn replace(&mut self, mut other: ExecutionStream) {
        self.inner = other.inner.take();
    }

    #[track_caller]
    fn owned(&self) -> &OwnedStream {
        match &self.inner {
            Some(owned) => owned,
            None => panic!("ExecutionStream accessed after its stream was moved out"),
        }
    }
}

impl From<&ExecutionStream> for StreamView {
    fn from(stream: &ExecutionStream) -> Self {
        stream.view()
    }
}

impl fmt::Debug for ExecutionStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(owned) => f
                .debug_struct("ExecutionStream")
                .field("stream", &owned.handle)
                .field("backend", &owned.runtime.backend())
                .finish(),
            None => f.write_str("ExecutionStream(<moved>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NativeError;
    use crate::handle::{DevicePtr, EventHandle};
    use crate::runtime::{Backend, NativeResult};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Minimal runtime that hands out sequential handles and logs destroys.
    #[derive(Default)]
    struct CountingRuntime {
        next: AtomicUsize,
        fail_create: bool,
        destroyed: Mutex<Vec<StreamHandle>>,
        synchronized: Mutex<Vec<StreamHandle>>,
    }

    impl StreamRuntime for CountingRuntime {
        fn backend(&self) -> Backend {
            Backend::Cpu
        }

        fn create_stream(&self) -> NativeResult<StreamHandle> {
            if self.fail_create {
                return Err(NativeError::new(2, "OUT_OF_MEMORY"));
            }
            let raw = 0x100 + self.next.fetch_add(1, Ordering::Relaxed);
            Ok(StreamHandle::from_raw(raw))
        }

        fn destroy_stream(&self, stream: StreamHandle) -> NativeResult<()> {
            self.destroyed.lock().push(stream);
            Ok(())
        }

        fn synchronize_stream(&self, stream: StreamHandle) -> NativeResult<()> {
            self.synchronized.lock().push(stream);
            Ok(())
        }

        fn create_event(&self) -> NativeResult<EventHandle> {
            Ok(EventHandle::from_raw(1))
        }

        fn destroy_event(&self, _event: EventHandle) -> NativeResult<()> {
            Ok(())
        }

        fn record_event(&self, _event: EventHandle, _stream: StreamHandle) -> NativeResult<()> {
            Ok(())
        }

        fn synchronize_event(&self, _event: EventHandle) -> NativeResult<()> {
            Ok(())
        }

        fn elapsed_ms(&self, _start: EventHandle, _stop: EventHandle) -> NativeResult<f32> {
            Ok(0.0)
        }

        fn current_device(&self) -> NativeResult<i32> {
            Ok(0)
        }

        fn l2_cache_size(&self, _device: i32) -> NativeResult<usize> {
            Ok(0)
        }

        fn alloc_async(&self, _bytes: usize, _stream: StreamHandle) -> NativeResult<DevicePtr> {
            Ok(DevicePtr::from_raw(0x1000))
        }

        fn memset_async(
            &self,
            _ptr: DevicePtr,
            _value: u8,
            _bytes: usize,
            _stream: StreamHandle,
        ) -> NativeResult<()> {
            Ok(())
        }

        fn free_async(&self, _ptr: DevicePtr, _stream: StreamHandle) -> NativeResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_create_and_drop_destroys_once() {
        let runtime = Arc::new(CountingRuntime::default());
        let handle = {
            let stream = ExecutionStream::with_runtime(runtime.clone()).unwrap();
            assert!(stream.is_valid());
            stream.value()
        };
        assert_eq!(*runtime.destroyed.lock(), vec![handle]);
    }

    #[test]
    fn test_take_leaves_source_invalid() {
        let runtime = Arc::new(CountingRuntime::default());
        let mut source = ExecutionStream::with_runtime(runtime.clone()).unwrap();
        let handle = source.value();

        let target = source.take();
        assert!(!source.is_valid());
        assert!(target.is_valid());
        assert_eq!(target.value(), handle);

        drop(source);
        assert!(runtime.destroyed.lock().is_empty());
        drop(target);
        assert_eq!(*runtime.destroyed.lock(), vec![handle]);
    }

    #[test]
    fn test_replace_destroys_previous() {
        let runtime = Arc::new(CountingRuntime::default());
        let mut first = ExecutionStream::with_runtime(runtime.clone()).unwrap();
        let second = ExecutionStream::with_runtime(runtime.clone()).unwrap();
        let (old, new) = (first.value(), second.value());

        first.replace(second);
        assert_eq!(first.value(), new);
        assert_eq!(*runtime.destroyed.lock(), vec![old]);
    }

    #[test]
    fn test_creation_failure_leaves_nothing() {
        let runtime = Arc::new(CountingRuntime {
            fail_create: true,
            ..Default::default()
        });
        let err = ExecutionStream::with_runtime(runtime.clone()).unwrap_err();
        assert!(matches!(
            err,
            StreamError::ResourceCreation {
                resource: ResourceKind::Stream,
                ..
            }
        ));
        assert!(runtime.destroyed.lock().is_empty());
    }

    #[test]
    fn test_view_aliases_owned_handle() {
        let runtime = Arc::new(CountingRuntime::default());
        let stream = ExecutionStream::with_runtime(runtime).unwrap();
        assert_eq!(stream.view().value(), stream.value());
        assert_eq!(StreamView::from(&stream), stream.view());
        assert!(!stream.view().is_default());
        assert!(!stream.view().is_per_thread_default());
    }

    #[test]
    fn test_synchronize_targets_owned_stream() {
        let runtime = Arc::new(CountingRuntime::default());
        let stream = ExecutionStream::with_runtime(runtime.clone()).unwrap();
        stream.synchronize().unwrap();
        stream.synchronize_no_throw();
        assert_eq!(
            *runtime.synchronized.lock(),
            vec![stream.value(), stream.value()]
        );
    }

    #[test]
    #[should_panic(expected = "moved out")]
    fn test_value_after_take_panics() {
        let runtime = Arc::new(CountingRuntime::default());
        let mut stream = ExecutionStream::with_runtime(runtime).unwrap();
        let _owner = stream.take();
        let _ = stream.value();
    }

    #[test]
    fn test_distinct_owners_distinct_handles() {
        let runtime = Arc::new(CountingRuntime::default());
        let a = ExecutionStream::with_runtime(runtime.clone()).unwrap();
        let b = ExecutionStream::with_runtime(runtime).unwrap();
        assert_ne!(a.value(), b.value());
    }
}
