//! Error types for stream, event and timer operations.

use std::fmt;

/// A failed call into the native GPU runtime.
///
/// Carries the numeric status code the runtime returned together with its
/// symbolic name (e.g. `CUDA_ERROR_OUT_OF_MEMORY`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    code: i32,
    name: String,
}

impl NativeError {
    /// Create a native error from a status code and its name.
    pub fn new(code: i32, name: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
        }
    }

    /// Numeric status code.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Symbolic status name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

impl std::error::Error for NativeError {}

/// Kind of native resource whose creation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// An execution stream.
    Stream,
    /// A timing event.
    Event,
    /// A device scratch allocation.
    DeviceMemory,
    /// A host allocation.
    HostMemory,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResourceKind::Stream => "stream",
            ResourceKind::Event => "event",
            ResourceKind::DeviceMemory => "device memory",
            ResourceKind::HostMemory => "host memory",
        };
        f.write_str(label)
    }
}

/// Errors from stream operations.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// A native create call failed; nothing was allocated.
    #[error("Failed to create {resource}: {status}")]
    ResourceCreation {
        /// What was being created.
        resource: ResourceKind,
        /// Native status returned by the runtime.
        status: NativeError,
    },

    /// A native synchronize or wait call failed.
    #[error("Stream synchronization failed: {status}")]
    Synchronization {
        /// Native status returned by the runtime.
        status: NativeError,
    },

    /// Any other recoverable native failure.
    #[error("{operation} failed: {status}")]
    Native {
        /// Native operation that failed.
        operation: &'static str,
        /// Native status returned by the runtime.
        status: NativeError,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No native runtime is installed or the backend is not compiled in.
    #[error("Runtime unavailable: {0}")]
    RuntimeUnavailable(String),
}

impl StreamError {
    /// Native status carried by this error, if any.
    pub fn status(&self) -> Option<&NativeError> {
        match self {
            StreamError::ResourceCreation { status, .. }
            | StreamError::Synchronization { status }
            | StreamError::Native { status, .. } => Some(status),
            StreamError::InvalidConfig(_) | StreamError::RuntimeUnavailable(_) => None,
        }
    }
}

/// Result type for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;
