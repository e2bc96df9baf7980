//! Non-owning stream views.

use std::fmt;

use crate::error::{StreamError, StreamResult};
use crate::fatal;
use crate::handle::StreamHandle;
use crate::registry::DefaultStreamRegistry;
use crate::runtime::{current_runtime, StreamRuntime};

/// Strongly-typed, non-owning view of a native stream.
///
/// A view never owns the stream it names. Copying it is free and has no side
/// effects; two views are equal when they name the same handle. The default
/// view is the null stream.
///
/// Views can only be built from a [`StreamHandle`], never from an integer, so
/// an accidental `0` cannot silently become "the default stream".
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StreamView {
    stream: StreamHandle,
}

impl StreamView {
    /// View of `stream`.
    pub const fn new(stream: StreamHandle) -> Self {
        Self { stream }
    }

    /// The wrapped handle.
    pub const fn value(&self) -> StreamHandle {
        self.stream
    }

    /// Whether this is the per-thread default stream under the compiled-in mode.
    pub const fn is_per_thread_default(&self) -> bool {
        DefaultStreamRegistry::ACTIVE.is_per_thread_default(*self)
    }

    /// Whether this is explicitly the legacy default stream under the
    /// compiled-in mode.
    pub const fn is_default(&self) -> bool {
        DefaultStreamRegistry::ACTIVE.is_default(*self)
    }

    /// Block until all work on this stream has completed, using the
    /// process-wide runtime.
    pub fn synchronize(&self) -> StreamResult<()> {
        let runtime = current_runtime()?;
        self.synchronize_on(runtime.as_ref())
    }

    /// Block until all work on this stream has completed.
    pub fn synchronize_on(&self, runtime: &dyn StreamRuntime) -> StreamResult<()> {
        runtime
            .synchronize_stream(self.stream)
            .map_err(|status| StreamError::Synchronization { status })
    }

    /// Synchronize using the process-wide runtime, aborting on failure.
    ///
    /// Not for streams that may already be in a failed state: there is no
    /// recovery path.
    pub fn synchronize_no_throw(&self) {
        match current_runtime() {
            Ok(runtime) => self.synchronize_no_throw_on(runtime.as_ref()),
            Err(e) => {
                tracing::error!(error = %e, "Cannot synchronize without a runtime");
                std::process::abort();
            }
        }
    }

    /// Synchronize on `runtime`, aborting on failure.
    pub fn synchronize_no_throw_on(&self, runtime: &dyn StreamRuntime) {
        fatal::assert_success(runtime.synchronize_stream(self.stream), "stream synchronize");
    }
}

impl From<StreamHandle> for StreamView {
    fn from(stream: StreamHandle) -> Self {
        Self::new(stream)
    }
}

impl fmt::Debug for StreamView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamView({})", self.stream)
    }
}

impl fmt::Display for StreamView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.stream, f)
    }
}
