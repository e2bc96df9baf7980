//! Fault injection and call accounting for the host runtime.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use gpustream_core::NativeError;

use crate::status;

/// A native call the host runtime can fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeOp {
    /// `create_stream`
    CreateStream,
    /// `destroy_stream`
    DestroyStream,
    /// `synchronize_stream`
    SynchronizeStream,
    /// `create_event`
    CreateEvent,
    /// `destroy_event`
    DestroyEvent,
    /// `record_event`
    RecordEvent,
    /// `synchronize_event`
    SynchronizeEvent,
    /// `elapsed_ms`
    ElapsedTime,
    /// `current_device`
    CurrentDevice,
    /// `l2_cache_size`
    DeviceAttribute,
    /// `alloc_async`
    AllocAsync,
    /// `memset_async`
    MemsetAsync,
    /// `free_async`
    FreeAsync,
}

impl NativeOp {
    /// Number of operations.
    pub const COUNT: usize = 13;

    /// Every operation.
    pub const ALL: [NativeOp; NativeOp::COUNT] = [
        NativeOp::CreateStream,
        NativeOp::DestroyStream,
        NativeOp::SynchronizeStream,
        NativeOp::CreateEvent,
        NativeOp::DestroyEvent,
        NativeOp::RecordEvent,
        NativeOp::SynchronizeEvent,
        NativeOp::ElapsedTime,
        NativeOp::CurrentDevice,
        NativeOp::DeviceAttribute,
        NativeOp::AllocAsync,
        NativeOp::MemsetAsync,
        NativeOp::FreeAsync,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Sentinel for "fail every call".
const ALWAYS: i64 = -1;

/// Per-operation failure schedule.
#[derive(Debug)]
pub struct FaultPlan {
    remaining: [AtomicI64; NativeOp::COUNT],
}

impl Default for FaultPlan {
    fn default() -> Self {
        Self {
            remaining: std::array::from_fn(|_| AtomicI64::new(0)),
        }
    }
}

impl FaultPlan {
    /// Fail the next `count` calls of `op`.
    pub fn fail_next(&self, op: NativeOp, count: u32) {
        self.remaining[op.index()].store(i64::from(count), Ordering::SeqCst);
    }

    /// Fail every call of `op` until cleared.
    pub fn fail_always(&self, op: NativeOp) {
        self.remaining[op.index()].store(ALWAYS, Ordering::SeqCst);
    }

    /// Stop failing `op`.
    pub fn clear(&self, op: NativeOp) {
        self.remaining[op.index()].store(0, Ordering::SeqCst);
    }

    /// Stop failing everything.
    pub fn clear_all(&self) {
        for slot in &self.remaining {
            slot.store(0, Ordering::SeqCst);
        }
    }

    /// Consume one scheduled failure of `op`, if any.
    pub(crate) fn check(&self, op: NativeOp) -> Result<(), NativeError> {
        let slot = &self.remaining[op.index()];
        let fire = slot
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                ALWAYS => Some(ALWAYS),
                n if n > 0 => Some(n - 1),
                _ => None,
            })
            .is_ok();
        if fire {
            Err(status::injected())
        } else {
            Ok(())
        }
    }
}

/// Number of calls made per operation, successful or not.
#[derive(Debug)]
pub struct CallCounts {
    counts: [AtomicU64; NativeOp::COUNT],
}

impl Default for CallCounts {
    fn default() -> Self {
        Self {
            counts: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }
}

impl CallCounts {
    pub(crate) fn bump(&self, op: NativeOp) {
        self.counts[op.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Calls made to `op`.
    pub fn get(&self, op: NativeOp) -> u64 {
        self.counts[op.index()].load(Ordering::Relaxed)
    }

    /// Reset every counter.
    pub fn reset(&self) {
        for count in &self.counts {
            count.store(0, Ordering::Relaxed);
        }
    }
}
