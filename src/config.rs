//! Configuration for DriftKV
//!
//! Centralized configuration with sensible defaults. Every value is fixed
//! for the lifetime of an open WAL handle.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{DriftError, Result};

/// Main configuration for a DriftKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Log directory holding the segment files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal-0001.log     (sealed segment)
    ///     └── wal-0002.log     (active segment)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Period of the background flush cycle
    pub flush_interval: Duration,

    /// Size budget of one segment before rotating (soft limit, in bytes)
    pub max_segment_bytes: u64,

    /// Initial capacity of the in-memory append buffer (in bytes)
    pub buffer_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./driftkv_data"),
            flush_interval: Duration::from_millis(100),
            max_segment_bytes: 10 * 1024 * 1024, // 10 MB
            buffer_capacity: 4096,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject parameters the WAL cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.flush_interval.is_zero() {
            return Err(DriftError::Config(
                "flush interval must be greater than zero".to_string(),
            ));
        }
        if self.max_segment_bytes == 0 {
            return Err(DriftError::Config(
                "max segment size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the log directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the background flush interval
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.flush_interval = interval;
        self
    }

    /// Set the segment size budget (in bytes)
    pub fn max_segment_bytes(mut self, bytes: u64) -> Self {
        self.config.max_segment_bytes = bytes;
        self
    }

    /// Set the initial append buffer capacity (in bytes)
    pub fn buffer_capacity(mut self, bytes: usize) -> Self {
        self.config.buffer_capacity = bytes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
