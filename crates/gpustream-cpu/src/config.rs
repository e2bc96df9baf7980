//! Host runtime configuration.

use gpustream_core::{DefaultStreamMode, StreamError, StreamResult};

/// Configuration for the host-simulated runtime.
#[derive(Debug, Clone)]
pub struct HostRuntimeConfig {
    /// Device ordinal reported as current.
    pub device_ordinal: i32,
    /// Simulated last-level cache size in bytes.
    pub l2_cache_bytes: usize,
    /// Simulated memset bandwidth (bytes per second).
    pub memset_bytes_per_sec: f64,
    /// How the null stream is interpreted.
    pub mode: DefaultStreamMode,
}

impl Default for HostRuntimeConfig {
    fn default() -> Self {
        Self {
            device_ordinal: 0,
            l2_cache_bytes: 6 * 1024 * 1024,
            memset_bytes_per_sec: 500.0e9,
            mode: DefaultStreamMode::ACTIVE,
        }
    }
}

impl HostRuntimeConfig {
    /// Creates a configuration simulating a device without a last-level cache.
    #[must_use]
    pub fn without_cache() -> Self {
        Self {
            l2_cache_bytes: 0,
            ..Self::default()
        }
    }

    /// Rejects configurations the runtime cannot simulate.
    pub fn validate(&self) -> StreamResult<()> {
        if !self.memset_bytes_per_sec.is_finite() || self.memset_bytes_per_sec <= 0.0 {
            return Err(StreamError::InvalidConfig(format!(
                "memset bandwidth must be finite and positive, got {}",
                self.memset_bytes_per_sec
            )));
        }
        Ok(())
    }
}

/// Builder for HostRuntimeConfig.
#[derive(Debug, Default)]
pub struct HostRuntimeConfigBuilder {
    config: HostRuntimeConfig,
}

impl HostRuntimeConfigBuilder {
    /// Creates a new builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the reported device ordinal.
    #[must_use]
    pub fn with_device_ordinal(mut self, ordinal: i32) -> Self {
        self.config.device_ordinal = ordinal;
        self
    }

    /// Sets the simulated L2 cache size.
    #[must_use]
    pub fn with_l2_cache_bytes(mut self, bytes: usize) -> Self {
        self.config.l2_cache_bytes = bytes;
        self
    }

    /// Sets the simulated memset bandwidth.
    #[must_use]
    pub fn with_memset_bandwidth(mut self, bytes_per_sec: f64) -> Self {
        self.config.memset_bytes_per_sec = bytes_per_sec;
        self
    }

    /// Sets the default-stream mode.
    #[must_use]
    pub fn with_mode(mut self, mode: DefaultStreamMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> StreamResult<HostRuntimeConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
