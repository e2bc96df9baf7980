//! Fatal teardown handling.
//!
//! Destructors cannot report failure to a caller. A native failure while
//! destroying a stream, or while finishing a timed region, means resource
//! accounting can no longer be trusted, so the process is terminated.

use crate::runtime::NativeResult;

/// Abort the process if a teardown-path native call failed.
#[track_caller]
pub fn assert_success(result: NativeResult<()>, operation: &'static str) {
    if let Err(status) = result {
        fail(operation, &status.to_string());
    }
}

/// Unwrap a teardown-path native result or abort the process.
#[track_caller]
pub fn expect_success<T>(result: NativeResult<T>, operation: &'static str) -> T {
    match result {
        Ok(value) => value,
        Err(status) => fail(operation, &status.to_string()),
    }
}

#[track_caller]
fn fail(operation: &'static str, status: &str) -> ! {
    let location = std::panic::Location::caller();
    tracing::error!(
        operation,
        status,
        %location,
        "Fatal native failure during teardown"
    );
    eprintln!("gpustream: fatal: {operation} failed: {status} at {location}");
    std::process::abort()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_passes_through() {
        assert_success(Ok(()), "cuStreamDestroy");
        assert_eq!(expect_success(Ok(7), "cuEventElapsedTime"), 7);
    }
}
