//! # gpustream
//!
//! Ownership and identity of GPU execution streams.
//!
//! A stream is an ordered queue of device work. This crate gives it two
//! faces: [`ExecutionStream`] owns a stream and destroys it exactly once,
//! [`StreamView`] is a copyable reference compared by identity. On top of
//! that sit the default-stream registry, the resource equivalence protocol
//! and [`ScopedTimer`] for timing regions of stream work.
//!
//! ## Quick Start
//!
//! ```ignore
//! use gpustream::prelude::*;
//!
//! fn main() -> StreamResult<()> {
//!     // Install the best available native runtime for this process
//!     gpustream::init(BackendPreference::Auto)?;
//!
//!     let stream = ExecutionStream::new()?;
//!     let mut log = IterationLog::new();
//!     {
//!         let _timer = ScopedTimer::new(&mut log, stream.view(), true)?;
//!         // ... enqueue work on stream.view() ...
//!     }
//!     println!("region took {:?} s", log.last());
//!     Ok(())
//! }
//! ```
//!
//! ## Backends
//!
//! - **CPU** - Host simulation, always available (tests, benchmarks, fallback)
//! - **CUDA** - NVIDIA GPUs through cudarc (requires `cuda` feature)
//!
//! ## Default stream mode
//!
//! The `per-thread-default-stream` feature switches the meaning of the null
//! stream from the legacy default stream to the per-thread default stream.
//! See [`DefaultStreamRegistry`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(hidden_glob_reexports)]

use std::sync::Arc;

// Re-export core types
pub use gpustream_core::*;

// Re-export CPU backend (always available)
pub use gpustream_cpu::{HostRuntime, HostRuntimeConfig, HostRuntimeConfigBuilder};

// CUDA backend (stub when the feature is disabled)
pub use gpustream_cuda::CudaStreamRuntime;

/// Test support from the host runtime.
pub mod testing {
    pub use gpustream_cpu::{CallCounts, FaultPlan, NativeOp};
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{BackendPreference, HostRuntime};
    pub use gpustream_core::prelude::*;
}

/// Which native runtime [`create_runtime`] should build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPreference {
    /// CUDA if a device is present, otherwise the host runtime.
    #[default]
    Auto,
    /// Host-simulated runtime.
    Cpu,
    /// CUDA driver runtime on device 0.
    Cuda,
}

/// Build a native runtime for `preference`.
pub fn create_runtime(preference: BackendPreference) -> StreamResult<Arc<dyn StreamRuntime>> {
    let runtime: Arc<dyn StreamRuntime> = match preference {
        BackendPreference::Auto => auto_runtime()?,
        BackendPreference::Cpu => Arc::new(HostRuntime::new()),
        BackendPreference::Cuda => cuda_runtime()?,
    };
    Ok(runtime)
}

/// Build a runtime for `preference` and install it as the process-wide one.
///
/// Returns the installed runtime. If a runtime was installed earlier it stays
/// in place and is returned instead.
pub fn init(preference: BackendPreference) -> StreamResult<Arc<dyn StreamRuntime>> {
    if let Some(existing) = try_current_runtime() {
        tracing::debug!(backend = %existing.backend(), "Stream runtime already installed");
        return Ok(existing);
    }
    Ok(install_runtime(create_runtime(preference)?))
}

#[cfg(feature = "cuda")]
fn cuda_runtime() -> StreamResult<Arc<dyn StreamRuntime>> {
    Ok(Arc::new(CudaStreamRuntime::new(0)?))
}

#[cfg(not(feature = "cuda"))]
fn cuda_runtime() -> StreamResult<Arc<dyn StreamRuntime>> {
    Err(StreamError::RuntimeUnavailable(
        "CUDA feature not enabled".to_string(),
    ))
}

/// Auto-select the best available backend.
fn auto_runtime() -> StreamResult<Arc<dyn StreamRuntime>> {
    if availability::cuda() {
        tracing::info!("Auto-selected CUDA backend");
        return cuda_runtime();
    }

    tracing::info!("Auto-selected CPU backend (no GPU available)");
    Ok(Arc::new(HostRuntime::new()))
}

/// Check availability of backends at runtime.
pub mod availability {
    /// Check if CUDA is available.
    pub fn cuda() -> bool {
        gpustream_cuda::is_cuda_available()
    }

    /// Get list of available backends.
    pub fn available_backends() -> Vec<super::Backend> {
        let mut backends = vec![super::Backend::Cpu];
        if cuda() {
            backends.push(super::Backend::Cuda);
        }
        backends
    }
}
