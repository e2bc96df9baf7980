//! Status codes reported by the host runtime.
//!
//! Numbering follows the CUDA driver so logs read the same on both backends.

use gpustream_core::NativeError;

pub(crate) fn invalid_value() -> NativeError {
    NativeError::new(1, "CUDA_ERROR_INVALID_VALUE")
}

pub(crate) fn invalid_handle() -> NativeError {
    NativeError::new(400, "CUDA_ERROR_INVALID_HANDLE")
}

pub(crate) fn not_ready() -> NativeError {
    NativeError::new(600, "CUDA_ERROR_NOT_READY")
}

pub(crate) fn injected() -> NativeError {
    NativeError::new(999, "CUDA_ERROR_UNKNOWN")
}
