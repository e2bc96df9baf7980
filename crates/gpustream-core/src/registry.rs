//! Well-known streams and default-stream resolution.
//!
//! Native runtimes expose three streams nobody creates: the null stream, the
//! blocking legacy default stream and the per-thread default stream. What the
//! null handle means depends on how the process was built:
//!
//! | Mode | `is_default` | `is_per_thread_default` |
//! |---|---|---|
//! | Legacy | legacy or null | per-thread |
//! | PerThreadDefault | legacy | per-thread or null |
//!
//! The mode is fixed at compile time through the `per-thread-default-stream`
//! feature and exposed as [`DefaultStreamMode::ACTIVE`]. The table above is
//! implemented once, in [`DefaultStreamRegistry::classify`].

use crate::handle::StreamHandle;
use crate::view::StreamView;

/// View of the null stream (stream 0).
pub const STREAM_DEFAULT: StreamView = StreamView::new(StreamHandle::NULL);

/// View of the blocking legacy default stream.
pub const STREAM_LEGACY: StreamView = StreamView::new(StreamHandle::LEGACY);

/// View of the per-thread default stream.
pub const STREAM_PER_THREAD: StreamView = StreamView::new(StreamHandle::PER_THREAD);

/// How the native runtime interprets the null stream handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefaultStreamMode {
    /// Null means the legacy default stream.
    Legacy,
    /// Null means the calling thread's default stream.
    PerThreadDefault,
}

impl DefaultStreamMode {
    /// Mode this build was compiled with.
    #[cfg(not(feature = "per-thread-default-stream"))]
    pub const ACTIVE: DefaultStreamMode = DefaultStreamMode::Legacy;

    /// Mode this build was compiled with.
    #[cfg(feature = "per-thread-default-stream")]
    pub const ACTIVE: DefaultStreamMode = DefaultStreamMode::PerThreadDefault;

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            DefaultStreamMode::Legacy => "legacy",
            DefaultStreamMode::PerThreadDefault => "per-thread-default",
        }
    }
}

impl Default for DefaultStreamMode {
    fn default() -> Self {
        Self::ACTIVE
    }
}

/// Which well-known default a stream resolves to, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefaultStreamKind {
    /// The legacy default stream.
    Legacy,
    /// The per-thread default stream.
    PerThread,
    /// A stream created by someone (not a default).
    Created,
}

/// Classifies stream views against the well-known default streams under a
/// single resolved mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultStreamRegistry {
    mode: DefaultStreamMode,
}

impl DefaultStreamRegistry {
    /// Registry for the compiled-in mode.
    pub const ACTIVE: DefaultStreamRegistry = DefaultStreamRegistry::new(DefaultStreamMode::ACTIVE);

    /// Registry resolving under `mode`.
    pub const fn new(mode: DefaultStreamMode) -> Self {
        Self { mode }
    }

    /// Registry for the compiled-in mode.
    pub const fn active() -> Self {
        Self::ACTIVE
    }

    /// Mode this registry resolves under.
    pub const fn mode(&self) -> DefaultStreamMode {
        self.mode
    }

    /// View of the null stream.
    pub const fn default_stream(&self) -> StreamView {
        STREAM_DEFAULT
    }

    /// View of the legacy default stream.
    pub const fn legacy(&self) -> StreamView {
        STREAM_LEGACY
    }

    /// View of the per-thread default stream.
    pub const fn per_thread_default(&self) -> StreamView {
        STREAM_PER_THREAD
    }

    /// Resolve which default stream `view` denotes.
    pub const fn classify(&self, view: StreamView) -> DefaultStreamKind {
        let handle = view.value().as_raw();
        if handle == StreamHandle::LEGACY.as_raw() {
            return DefaultStreamKind::Legacy;
        }
        if handle == StreamHandle::PER_THREAD.as_raw() {
            return DefaultStreamKind::PerThread;
        }
        if handle == StreamHandle::NULL.as_raw() {
            return match self.mode {
                DefaultStreamMode::Legacy => DefaultStreamKind::Legacy,
                DefaultStreamMode::PerThreadDefault => DefaultStreamKind::PerThread,
            };
        }
        DefaultStreamKind::Created
    }

    /// Whether `view` is the legacy default stream under this mode.
    pub const fn is_default(&self, view: StreamView) -> bool {
        matches!(self.classify(view), DefaultStreamKind::Legacy)
    }

    /// Whether `view` is the per-thread default stream under this mode.
    pub const fn is_per_thread_default(&self, view: StreamView) -> bool {
        matches!(self.classify(view), DefaultStreamKind::PerThread)
    }

    /// Whether `view` is one of the well-known streams (never owned by anyone).
    pub const fn is_well_known(&self, view: StreamView) -> bool {
        !matches!(self.classify(view), DefaultStreamKind::Created)
    }
}

impl Default for DefaultStreamRegistry {
    fn default() -> Self {
        Self::ACTIVE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY_MODE: DefaultStreamRegistry = DefaultStreamRegistry::new(DefaultStreamMode::Legacy);
    const PTDS_MODE: DefaultStreamRegistry =
        DefaultStreamRegistry::new(DefaultStreamMode::PerThreadDefault);

    #[test]
    fn test_legacy_mode_table() {
        assert!(LEGACY_MODE.is_default(STREAM_DEFAULT));
        assert!(LEGACY_MODE.is_default(STREAM_LEGACY));
        assert!(!LEGACY_MODE.is_default(STREAM_PER_THREAD));

        assert!(LEGACY_MODE.is_per_thread_default(STREAM_PER_THREAD));
        assert!(!LEGACY_MODE.is_per_thread_default(STREAM_DEFAULT));
        assert!(!LEGACY_MODE.is_per_thread_default(STREAM_LEGACY));
    }

    #[test]
    fn test_per_thread_mode_table() {
        assert!(PTDS_MODE.is_default(STREAM_LEGACY));
        assert!(!PTDS_MODE.is_default(STREAM_DEFAULT));
        assert!(!PTDS_MODE.is_default(STREAM_PER_THREAD));

        assert!(PTDS_MODE.is_per_thread_default(STREAM_DEFAULT));
        assert!(PTDS_MODE.is_per_thread_default(STREAM_PER_THREAD));
        assert!(!PTDS_MODE.is_per_thread_default(STREAM_LEGACY));
    }

    #[test]
    fn test_created_stream_is_no_default() {
        let view = StreamView::new(StreamHandle::from_raw(0x5000));
        for registry in [LEGACY_MODE, PTDS_MODE] {
            assert_eq!(registry.classify(view), DefaultStreamKind::Created);
            assert!(!registry.is_default(view));
            assert!(!registry.is_per_thread_default(view));
            assert!(!registry.is_well_known(view));
        }
    }

    #[test]
    fn test_null_is_always_some_default() {
        for registry in [LEGACY_MODE, PTDS_MODE] {
            assert!(registry.is_well_known(STREAM_DEFAULT));
            assert_ne!(
                registry.is_default(STREAM_DEFAULT),
                registry.is_per_thread_default(STREAM_DEFAULT)
            );
        }
    }

    #[test]
    fn test_active_mode_matches_feature() {
        let expected = if cfg!(feature = "per-thread-default-stream") {
            DefaultStreamMode::PerThreadDefault
        } else {
            DefaultStreamMode::Legacy
        };
        assert_eq!(DefaultStreamMode::ACTIVE, expected);
        assert_eq!(DefaultStreamRegistry::active().mode(), expected);
    }
}
