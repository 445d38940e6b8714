/*!
 * Limits and Constants
 *
 * Centralized location for timeouts, queue depths and file modes.
 */

use std::time::Duration;

// =============================================================================
// PIPE OPEN
// =============================================================================

/// Default deadline for a blocking open (100ms)
/// A blocking FIFO open waits for a peer; past this the caller gets Timeout
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_millis(100);

/// Aggressive open deadline for tests and local development (25ms)
pub const AGGRESSIVE_OPEN_TIMEOUT: Duration = Duration::from_millis(25);

/// Relaxed open deadline for slow or heavily loaded hosts (1s)
pub const RELAXED_OPEN_TIMEOUT: Duration = Duration::from_secs(1);

/// Pause between tries to release a blocking open that lost its deadline
pub const CANCEL_RETRY_INTERVAL: Duration = Duration::from_millis(5);

/// Tries before a lost blocking open is left to finish on its own
pub const CANCEL_MAX_ATTEMPTS: u32 = 100;

/// Permission bits of every FIFO node we create: owner read/write only
pub const PIPE_MODE: u32 = 0o600;

/// Read chunk size when draining a pipe (one Linux pipe buffer page)
pub const READ_CHUNK_SIZE: usize = 4096;

// =============================================================================
// EVENT QUEUES
// =============================================================================

/// Depth of every outbound watcher/channel queue
/// One slot: a producer waits until the consumer drained the previous item
pub const OUTBOUND_QUEUE_DEPTH: usize = 1;

/// Depth of the raw notification queue between the OS watcher thread and the loop
pub const RAW_EVENT_BUFFER: usize = 64;

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Overrides the open deadline, in milliseconds
pub const ENV_OPEN_TIMEOUT_MS: &str = "PIPEWATCH_OPEN_TIMEOUT_MS";

/// Overrides the raw notification queue depth
pub const ENV_RAW_EVENT_BUFFER: &str = "PIPEWATCH_RAW_EVENT_BUFFER";

/// Path of the pipe served by the binary
pub const ENV_PIPE_PATH: &str = "PIPEWATCH_PATH";

/// Default pipe path for the binary
pub const DEFAULT_PIPE_PATH: &str = "/tmp/pipewatch.fifo";
