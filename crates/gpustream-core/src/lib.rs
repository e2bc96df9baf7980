//! # gpustream core
//!
//! Ownership and identity primitives for GPU execution streams.
//!
//! ## Core Abstractions
//!
//! - [`StreamView`] - Non-owning, copyable stream handle compared by identity
//! - [`ExecutionStream`] - Owning, move-only stream destroyed exactly once
//! - [`DefaultStreamRegistry`] - Legacy vs. per-thread default-stream resolution
//! - [`EquivalentTo`] / [`ResourceEquivalence`] - Resource equality and capability tags
//! - [`ScopedTimer`] - Event-based timing of a stream region
//! - [`StreamPool`] - Round-robin pool of owned streams
//! - [`StreamRuntime`] - The native calls everything above is built on
//!
//! ## Example
//!
//! ```ignore
//! use gpustream_core::prelude::*;
//!
//! let stream = ExecutionStream::new()?;
//! let mut log = IterationLog::new();
//! {
//!     let _timer = ScopedTimer::new(&mut log, stream.view(), false)?;
//!     // ... enqueue work on stream.view() ...
//! }
//! stream.synchronize()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod config;
pub mod error;
pub mod fatal;
pub mod handle;
pub mod pool;
pub mod registry;
pub mod resource;
pub mod runtime;
pub mod stream;
pub mod timer;
pub mod view;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{StreamPoolConfig, StreamPoolConfigBuilder, DEFAULT_POOL_SIZE};
    pub use crate::error::{NativeError, ResourceKind, StreamError, StreamResult};
    pub use crate::handle::{DevicePtr, EventHandle, StreamHandle};
    pub use crate::pool::{StreamPool, StreamPoolStats};
    pub use crate::registry::{
        DefaultStreamKind, DefaultStreamMode, DefaultStreamRegistry, STREAM_DEFAULT,
        STREAM_LEGACY, STREAM_PER_THREAD,
    };
    pub use crate::resource::{
        equals, not_equals, Capabilities, DeviceAccessible, EquivalentTo, HostAccessible,
        HostMemoryResource, Property, ResourceEquivalence, SystemHostResource,
    };
    pub use crate::runtime::{
        current_runtime, install_runtime, try_current_runtime, Backend, NativeResult,
        StreamRuntime,
    };
    pub use crate::stream::ExecutionStream;
    pub use crate::timer::{IterationLog, IterationSink, ScopedTimer};
    pub use crate::view::StreamView;
}

// Re-exports for convenience
pub use config::{StreamPoolConfig, StreamPoolConfigBuilder, DEFAULT_POOL_SIZE};
pub use error::{NativeError, ResourceKind, StreamError, StreamResult};
pub use handle::{DevicePtr, EventHandle, StreamHandle};
pub use pool::{StreamPool, StreamPoolStats};
pub use registry::{
    DefaultStreamKind, DefaultStreamMode, DefaultStreamRegistry, STREAM_DEFAULT, STREAM_LEGACY,
    STREAM_PER_THREAD,
};
pub use resource::{
    equals, not_equals, Capabilities, DeviceAccessible, EquivalentTo, HostAccessible,
    HostMemoryResource, Property, ResourceEquivalence, SystemHostResource,
};
pub use runtime::{
    current_runtime, install_runtime, try_current_runtime, Backend, NativeResult, StreamRuntime,
};
pub use stream::ExecutionStream;
pub use timer::{IterationLog, IterationSink, ScopedTimer};
pub use view::StreamView;
