/*!
 * FIFO Types
 * Lifecycle states and open request parameters
 */

use nix::fcntl::OFlag;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Lifecycle of a named pipe handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipeState {
    /// No node has been made through this handle yet
    Uncreated,
    /// The node exists and may be opened
    Created,
    /// The node was removed; the handle cannot be revived
    Destroyed,
}

impl fmt::Display for PipeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipeState::Uncreated => "uncreated",
            PipeState::Created => "created",
            PipeState::Destroyed => "destroyed",
        };
        f.write_str(s)
    }
}

/// Which end of the pipe to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
}

impl AccessMode {
    /// Flags beyond the access mode itself
    ///
    /// Readers open with O_EXCL, writers with O_APPEND.
    pub(crate) fn extra_flags(self) -> OFlag {
        match self {
            AccessMode::ReadOnly => OFlag::O_EXCL,
            AccessMode::WriteOnly => OFlag::O_APPEND,
        }
    }

    /// The other end of the pipe
    pub fn opposite(self) -> Self {
        match self {
            AccessMode::ReadOnly => AccessMode::WriteOnly,
            AccessMode::WriteOnly => AccessMode::ReadOnly,
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::ReadOnly => f.write_str("read-only"),
            AccessMode::WriteOnly => f.write_str("write-only"),
        }
    }
}

/// Parameters of one open call
///
/// `timeout` only matters for blocking opens; `None` falls back to the
/// opener's configured deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenRequest {
    pub mode: AccessMode,
    pub non_blocking: bool,
    pub timeout: Option<Duration>,
}

impl OpenRequest {
    pub fn new(mode: AccessMode) -> Self {
        Self {
            mode,
            non_blocking: true,
            timeout: None,
        }
    }

    /// Non-blocking read-only open
    pub fn read_only() -> Self {
        Self::new(AccessMode::ReadOnly)
    }

    /// Non-blocking write-only open
    pub fn write_only() -> Self {
        Self::new(AccessMode::WriteOnly)
    }

    /// Wait for a peer, bounded by a deadline
    pub fn blocking(mut self) -> Self {
        self.non_blocking = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Full flag set passed to open(2), access mode excluded
    pub(crate) fn custom_flags(&self) -> OFlag {
        let mut flags = self.mode.extra_flags();
        if self.non_blocking {
            flags |= OFlag::O_NONBLOCK;
        }
        flags
    }
}
