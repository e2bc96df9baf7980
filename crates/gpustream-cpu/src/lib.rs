//! CPU Backend for gpustream
//!
//! A host-side simulation of the native stream runtime. Streams are modelled
//! as timelines, events capture stream-order timestamps, and every native
//! call can be made to fail on demand. It is always available and is what the
//! test suite and benchmarks run against.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gpustream_core::ExecutionStream;
//! use gpustream_cpu::{HostRuntime, NativeOp};
//!
//! let runtime = Arc::new(HostRuntime::new());
//! runtime.faults().fail_next(NativeOp::CreateStream, 1);
//! assert!(ExecutionStream::with_runtime(runtime.clone()).is_err());
//! ```

#![warn(missing_docs)]

mod config;
mod faults;
mod runtime;
mod status;

pub use config::{HostRuntimeConfig, HostRuntimeConfigBuilder};
pub use faults::{CallCounts, FaultPlan, NativeOp};
pub use runtime::HostRuntime;
