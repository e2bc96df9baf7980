//! CUDA Backend for gpustream
//!
//! Implements the native stream runtime on the CUDA driver API using cudarc.
//!
//! # Requirements
//!
//! - NVIDIA GPU with stream-ordered allocation support (CUDA 11.2+)
//! - The `cuda` feature enabled
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gpustream_core::{install_runtime, ExecutionStream};
//! use gpustream_cuda::CudaStreamRuntime;
//!
//! install_runtime(Arc::new(CudaStreamRuntime::new(0)?));
//! let stream = ExecutionStream::new()?;
//! stream.synchronize()?;
//! ```

#![warn(missing_docs)]

#[cfg(feature = "cuda")]
mod runtime;

#[cfg(feature = "cuda")]
pub use runtime::CudaStreamRuntime;

// Placeholder implementation when CUDA is not available
#[cfg(not(feature = "cuda"))]
mod stub {
    use gpustream_core::{DefaultStreamMode, StreamError, StreamResult};

    /// Stub CUDA runtime when the CUDA feature is disabled.
    pub struct CudaStreamRuntime;

    impl CudaStreamRuntime {
        /// Create fails when CUDA is not available.
        pub fn new(_ordinal: usize) -> StreamResult<Self> {
            Err(StreamError::RuntimeUnavailable(
                "CUDA feature not enabled".to_string(),
            ))
        }

        /// Create fails when CUDA is not available.
        pub fn with_mode(_ordinal: usize, _mode: DefaultStreamMode) -> StreamResult<Self> {
            Self::new(0)
        }
    }
}

#[cfg(not(feature = "cuda"))]
pub use stub::CudaStreamRuntime;

/// Check if CUDA is available at runtime.
///
/// This function returns false if:
/// - CUDA feature is not enabled
/// - CUDA libraries are not installed on the system
/// - No CUDA devices are present
pub fn is_cuda_available() -> bool {
    cuda_device_count() > 0
}

/// Get CUDA device count.
///
/// Returns 0 if CUDA is not available or libraries are not installed.
pub fn cuda_device_count() -> usize {
    #[cfg(feature = "cuda")]
    {
        // cudarc panics if CUDA libraries are not found, so we catch that
        std::panic::catch_unwind(|| {
            cudarc::driver::CudaContext::device_count().unwrap_or(0) as usize
        })
        .unwrap_or(0)
    }
    #[cfg(not(feature = "cuda"))]
    {
        0
    }
}
