/*!
 * Error Types
 * Centralized error handling with thiserror and miette diagnostics
 */

use miette::Diagnostic;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for every pipe, watcher and channel operation
pub type PipeResult<T> = Result<T, PipeError>;

/// Unified error type for named pipes and their event stream
///
/// Lifecycle and open errors surface synchronously to the caller.
/// Watcher errors surface asynchronously on the watcher's error stream.
/// Nothing in this crate retries on any of these.
#[derive(Error, Debug, Diagnostic)]
pub enum PipeError {
    #[error("Could not resolve path {path:?}: {source}")]
    #[diagnostic(
        code(pipe::path_resolution),
        help("The current working directory may have been removed or become unreadable.")
    )]
    PathResolution {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("A filesystem entry already exists at {0:?}")]
    #[diagnostic(
        code(pipe::already_exists),
        help("Remove the existing entry or attach to it with PipeHandle::open_existing.")
    )]
    AlreadyExists(PathBuf),

    #[error("Named pipe not found: {0:?}")]
    #[diagnostic(
        code(pipe::not_found),
        help("The pipe was never created, has been destroyed, or its parent directory is missing.")
    )]
    NotFound(PathBuf),

    #[error("Named pipe {path:?} is {state}")]
    #[diagnostic(
        code(pipe::invalid_state),
        help("A destroyed pipe handle cannot be reused. Create a new handle for the same path.")
    )]
    InvalidState {
        path: PathBuf,
        state: crate::fifo::PipeState,
    },

    #[error("Not a named pipe: {0:?}")]
    #[diagnostic(
        code(pipe::not_a_fifo),
        help("The path exists but is not a FIFO node.")
    )]
    NotAFifo(PathBuf),

    #[error("Permission denied for named pipe {0:?}")]
    #[diagnostic(
        code(pipe::permission_denied),
        help("Check the pipe's mode bits and the permissions of its parent directory.")
    )]
    PermissionDenied(PathBuf),

    #[error("No reader has named pipe {0:?} open")]
    #[diagnostic(
        code(pipe::no_peer),
        help("A non-blocking write-only open needs a reader on the other end.")
    )]
    NoPeerPresent(PathBuf),

    #[error("Opening named pipe timed out after {elapsed_ms}ms (timeout: {timeout_ms}ms)")]
    #[diagnostic(
        code(pipe::timeout),
        help("No peer opened the other end in time. Increase the timeout or use non-blocking mode.")
    )]
    Timeout { elapsed_ms: u64, timeout_ms: u64 },

    #[error("Error while opening named pipe {path:?}: {source}")]
    #[diagnostic(code(pipe::open_failed))]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unsupported filesystem operation {kind} on {path:?}")]
    #[diagnostic(
        code(watch::unsupported_operation),
        help("Only create, write, remove, rename and chmod notifications are classified.")
    )]
    UnsupportedOperation { path: PathBuf, kind: String },

    #[error("Could not watch directory {directory:?}: {source}")]
    #[diagnostic(
        code(watch::subscription),
        help("The directory must exist and the platform watch limit must not be exhausted.")
    )]
    WatchSubscription {
        directory: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("Filesystem watch error: {0}")]
    #[diagnostic(code(watch::backend))]
    WatchBackend(#[from] notify::Error),

    #[error("I/O error: {0}")]
    #[diagnostic(
        code(pipe::io_error),
        help("Filesystem or I/O operation failed. Check file permissions and disk space.")
    )]
    Io(#[from] io::Error),
}

impl PipeError {
    /// Map an `open(2)` failure on `path` onto the pipe error vocabulary
    pub fn from_open(path: PathBuf, err: io::Error) -> Self {
        if err.raw_os_error() == Some(nix::libc::ENXIO) {
            return PipeError::NoPeerPresent(path);
        }
        match err.kind() {
            io::ErrorKind::NotFound => PipeError::NotFound(path),
            io::ErrorKind::PermissionDenied => PipeError::PermissionDenied(path),
            _ => PipeError::OpenFailed { path, source: err },
        }
    }
}
