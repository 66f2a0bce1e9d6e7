//! Configuration for the spill tier.

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Smallest accepted RAM budget for the embedded store.
pub const MIN_MAX_MEMORY: usize = 20 * 1024 * 1024;

/// Default RAM budget for the embedded store (256 MiB).
pub const DEFAULT_MAX_MEMORY: usize = 256 * 1024 * 1024;

/// Default sweeper period in seconds.
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 300;

/// Configuration for the spill engine.
///
/// Built either programmatically via the `with_*` builders or from the flat
/// key/value argument list the host passes at module load
/// ([`SpillConfig::from_args`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpillConfig {
    /// Directory for the embedded store. Owned for the process lifetime.
    pub path: PathBuf,

    /// Total RAM budget for the store in bytes (block cache + write buffers).
    pub max_memory: usize,

    /// Sweeper period in seconds; 0 disables the periodic sweeper.
    pub cleanup_interval: u64,
}

impl SpillConfig {
    /// Create a configuration with the given store directory and defaults
    /// for everything else.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_memory: DEFAULT_MAX_MEMORY,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL_SECS,
        }
    }

    /// Set the store RAM budget in bytes.
    pub fn with_max_memory(mut self, bytes: usize) -> Self {
        self.max_memory = bytes;
        self
    }

    /// Set the sweeper period in seconds (0 disables it).
    pub fn with_cleanup_interval(mut self, secs: u64) -> Self {
        self.cleanup_interval = secs;
        self
    }

    /// Parse the host's module-load arguments: a flat list of alternating
    /// keys and values.
    ///
    /// Recognized keys (case-insensitive): `path` (required),
    /// `max-memory`/`max_memory` (bytes), `cleanup-interval`/
    /// `cleanup_interval` (seconds). Unknown keys and a dangling trailing
    /// key are ignored.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let mut path: Option<PathBuf> = None;
        let mut max_memory = DEFAULT_MAX_MEMORY;
        let mut cleanup_interval = DEFAULT_CLEANUP_INTERVAL_SECS;

        for pair in args.chunks_exact(2) {
            let key = pair[0].as_ref();
            let value = pair[1].as_ref();

            if key.eq_ignore_ascii_case("path") {
                path = Some(PathBuf::from(value));
            } else if key.eq_ignore_ascii_case("max-memory")
                || key.eq_ignore_ascii_case("max_memory")
            {
                max_memory = value.parse::<usize>().map_err(|_| {
                    Error::Config(format!("max-memory must be an integer, got {value:?}"))
                })?;
            } else if key.eq_ignore_ascii_case("cleanup-interval")
                || key.eq_ignore_ascii_case("cleanup_interval")
            {
                let secs = value.parse::<i64>().map_err(|_| {
                    Error::Config(format!("cleanup-interval must be an integer, got {value:?}"))
                })?;
                if secs < 0 {
                    return Err(Error::Config(format!(
                        "cleanup-interval must be non-negative, got {secs}"
                    )));
                }
                cleanup_interval = secs as u64;
            }
        }

        let config = Self {
            path: path.ok_or_else(|| Error::Config("'path' parameter is required".to_string()))?,
            max_memory,
            cleanup_interval,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(Error::Config("'path' parameter is required".to_string()));
        }
        if self.max_memory < MIN_MAX_MEMORY {
            return Err(Error::Config(format!(
                "max-memory must be at least {} bytes, got {}",
                MIN_MAX_MEMORY, self.max_memory
            )));
        }
        Ok(())
    }
}
