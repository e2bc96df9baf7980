//! Typed native handles.
//!
//! Native runtimes hand out opaque pointer-sized values for streams, events
//! and device allocations. Each gets its own newtype so a stream can never be
//! built from a bare integer literal or confused with an event.

use std::fmt;

/// Opaque native stream handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StreamHandle(usize);

impl StreamHandle {
    /// The null handle (stream 0).
    pub const NULL: StreamHandle = StreamHandle(0);
    /// Native constant for the blocking legacy default stream.
    pub const LEGACY: StreamHandle = StreamHandle(0x1);
    /// Native constant for the per-thread default stream.
    pub const PER_THREAD: StreamHandle = StreamHandle(0x2);

    /// Wrap a raw handle value returned by a native runtime.
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Raw handle value.
    pub const fn as_raw(self) -> usize {
        self.0
    }

    /// Whether this is the null handle.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamHandle({:#x})", self.0)
    }
}

impl fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Opaque native event handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle(usize);

impl EventHandle {
    /// Wrap a raw event handle.
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Raw handle value.
    pub const fn as_raw(self) -> usize {
        self.0
    }
}

/// Device memory address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DevicePtr(u64);

impl DevicePtr {
    /// Wrap a raw device address.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw device address.
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}
