/*!
 * Pipe Configuration
 *
 * Open deadlines and queue depths shared by the opener, watcher and channel.
 */

use crate::core::limits::*;
use std::time::Duration;
use tracing::warn;

/// Configuration for pipe opens and event delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeConfig {
    /// Deadline for blocking opens without an explicit per-call timeout (default: 100ms)
    pub open_timeout: Duration,

    /// Depth of the raw notification queue fed by the OS watcher (default: 64)
    pub raw_event_buffer: usize,
}

impl PipeConfig {
    /// Create default configuration
    pub fn new() -> Self {
        Self {
            open_timeout: DEFAULT_OPEN_TIMEOUT,
            raw_event_buffer: RAW_EVENT_BUFFER,
        }
    }

    /// Short deadlines for development
    pub fn aggressive() -> Self {
        Self {
            open_timeout: AGGRESSIVE_OPEN_TIMEOUT,
            ..Self::new()
        }
    }

    /// Long deadlines for slow environments
    pub fn relaxed() -> Self {
        Self {
            open_timeout: RELAXED_OPEN_TIMEOUT,
            ..Self::new()
        }
    }

    /// Defaults overridden by `PIPEWATCH_*` environment variables
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(raw) = lookup(ENV_OPEN_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.open_timeout = Duration::from_millis(ms),
                Err(e) => warn!(value = %raw, error = %e, "Ignoring invalid {}", ENV_OPEN_TIMEOUT_MS),
            }
        }

        if let Some(raw) = lookup(ENV_RAW_EVENT_BUFFER) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.raw_event_buffer = n,
                _ => warn!(value = %raw, "Ignoring invalid {}", ENV_RAW_EVENT_BUFFER),
            }
        }

        config
    }

    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self::new()
    }
}
