//! Stream pool configuration.

use crate::error::{StreamError, StreamResult};

/// Default number of streams in a pool.
pub const DEFAULT_POOL_SIZE: usize = 16;

/// Configuration for [`StreamPool`](crate::pool::StreamPool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPoolConfig {
    /// Number of owned streams.
    pub pool_size: usize,
}

impl Default for StreamPoolConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl StreamPoolConfig {
    /// Creates a single-stream configuration.
    #[must_use]
    pub fn minimal() -> Self {
        Self { pool_size: 1 }
    }

    /// Rejects configurations that cannot build a pool.
    pub fn validate(&self) -> StreamResult<()> {
        if self.pool_size == 0 {
            return Err(StreamError::InvalidConfig(
                "stream pool size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for StreamPoolConfig.
#[derive(Debug, Default)]
pub struct StreamPoolConfigBuilder {
    config: StreamPoolConfig,
}

impl StreamPoolConfigBuilder {
    /// Creates a new builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of streams.
    #[must_use]
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.config.pool_size = size;
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> StreamResult<StreamPoolConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
