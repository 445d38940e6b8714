/*!
 * Pipe Opener
 *
 * Opens FIFO ends under an explicit mode / blocking / deadline contract.
 *
 * POSIX FIFO open(2) semantics:
 * - O_RDONLY | O_NONBLOCK succeeds at once, writer or not
 * - O_WRONLY | O_NONBLOCK fails with ENXIO when no reader has the FIFO open
 * - without O_NONBLOCK either end waits until the other end is opened
 *
 * A blocking open runs on its own OS thread and is raced against a deadline.
 * When the deadline wins, the attempt is woken by briefly opening the other
 * end, its descriptor is closed and its thread joined before `Timeout` is
 * returned. No parked open outlives the call to count as a phantom peer.
 */

use super::fd::PipeFd;
use super::handle::PipeHandle;
use super::types::{AccessMode, OpenRequest};
use crate::config::PipeConfig;
use crate::core::limits::{CANCEL_MAX_ATTEMPTS, CANCEL_RETRY_INTERVAL};
use crate::core::{PipeError, PipeResult};
use crate::monitoring::span_operation;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Name of the thread running a blocking open
pub const OPEN_THREAD_NAME: &str = "pipe-open";

/// Opens descriptors against pipe handles
#[derive(Debug, Clone, Default)]
pub struct PipeOpener {
    config: PipeConfig,
}

impl PipeOpener {
    pub fn new(config: PipeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipeConfig {
        &self.config
    }

    /// Open one end of `handle`
    ///
    /// Exactly one of success, error or `Timeout` is returned. The handle must
    /// be in the created state.
    pub async fn open(&self, handle: &PipeHandle, request: OpenRequest) -> PipeResult<PipeFd> {
        handle.ensure_created()?;
        let path = handle.absolute_path()?;

        let span = span_operation("open", &path.to_string_lossy());
        let result = if request.non_blocking {
            // Cannot wait on a peer, so no deadline is needed
            open_file(&path, &request)
        } else {
            self.open_blocking(&path, request).await
        };

        match result {
            Ok(file) => {
                span.record_result(true);
                Ok(PipeFd::new(file, path, request.mode))
            }
            Err(e) => {
                span.record_error(&e.to_string());
                Err(e)
            }
        }
    }

    /// Non-blocking read-only open
    pub async fn open_reader(&self, handle: &PipeHandle) -> PipeResult<PipeFd> {
        self.open(handle, OpenRequest::read_only()).await
    }

    /// Non-blocking write-only open; `NoPeerPresent` without a reader
    pub async fn open_writer(&self, handle: &PipeHandle) -> PipeResult<PipeFd> {
        self.open(handle, OpenRequest::write_only()).await
    }

    async fn open_blocking(&self, path: &Path, request: OpenRequest) -> PipeResult<File> {
        let deadline = request.timeout.unwrap_or(self.config.open_timeout);
        let start = Instant::now();

        let mut attempt = Attempt::spawn(path.to_path_buf(), request)?;

        let raced = tokio::time::timeout(deadline, &mut attempt.rx).await;
        match raced {
            Ok(outcome) => {
                attempt.join().await;
                outcome.unwrap_or_else(|_| {
                    Err(PipeError::OpenFailed {
                        path: path.to_path_buf(),
                        source: io::Error::new(
                            io::ErrorKind::Other,
                            "open attempt ended without a result",
                        ),
                    })
                })
            }
            Err(_) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                debug!(
                    path = %path.display(),
                    mode = %request.mode,
                    elapsed_ms,
                    "Blocking open timed out waiting for a peer"
                );
                attempt.cancel().await;
                Err(PipeError::Timeout {
                    elapsed_ms,
                    timeout_ms: deadline.as_millis() as u64,
                })
            }
        }
    }
}

/// One blocking open(2) running on its own thread
///
/// A parked FIFO open only returns once the other end is opened, so losing
/// the race means opening the other end ourselves, then closing whatever the
/// attempt obtained. The thread is joined before the caller sees the result.
struct Attempt {
    path: PathBuf,
    mode: AccessMode,
    rx: oneshot::Receiver<PipeResult<File>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl Attempt {
    fn spawn(path: PathBuf, request: OpenRequest) -> PipeResult<Self> {
        let (tx, rx) = oneshot::channel();
        let thread_path = path.clone();

        let thread = std::thread::Builder::new()
            .name(OPEN_THREAD_NAME.to_string())
            .spawn(move || {
                let result = open_file(&thread_path, &request);
                // Only when the caller itself was dropped mid-open
                if let Err(Ok(file)) = tx.send(result) {
                    warn!(
                        path = %thread_path.display(),
                        mode = %request.mode,
                        "Open completed for a caller that is gone, closing descriptor"
                    );
                    drop(file);
                }
            })
            .map_err(PipeError::Io)?;

        Ok(Self {
            path,
            mode: request.mode,
            rx,
            thread: Some(thread),
        })
    }

    /// Release a parked open and wait until its thread has exited
    async fn cancel(&mut self) {
        for _ in 0..CANCEL_MAX_ATTEMPTS {
            self.release_peer();
            let outcome = tokio::time::timeout(CANCEL_RETRY_INTERVAL, &mut self.rx).await;
            match outcome {
                Ok(Ok(Ok(file))) => {
                    debug!(path = %self.path.display(), "Closed descriptor of a timed out open");
                    drop(file);
                    self.join().await;
                    return;
                }
                Ok(_) => {
                    self.join().await;
                    return;
                }
                // Thread had not entered open(2) yet
                Err(_) => continue,
            }
        }

        warn!(
            path = %self.path.display(),
            mode = %self.mode,
            "Timed out open could not be released, leaving it to finish on its own"
        );
        self.thread = None;
    }

    /// Open and close the opposite end once
    ///
    /// The parked side waits for the other end's open count to change, so a
    /// transient open is enough to wake it.
    fn release_peer(&self) {
        let counterpart = OpenRequest::new(self.mode.opposite());
        if let Err(e) = open_file(&self.path, &counterpart) {
            debug!(path = %self.path.display(), error = %e, "Releasing open attempt failed");
        }
    }

    async fn join(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        match tokio::task::spawn_blocking(move || thread.join()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => warn!(path = %self.path.display(), "Open attempt thread panicked"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Joining open attempt failed"),
        }
    }
}

impl Drop for Attempt {
    fn drop(&mut self) {
        // Caller dropped while the attempt was still parked
        if self.thread.is_some() {
            self.release_peer();
        }
    }
}

fn open_file(path: &Path, request: &OpenRequest) -> PipeResult<File> {
    let mut options = OpenOptions::new();
    match request.mode {
        AccessMode::ReadOnly => options.read(true),
        AccessMode::WriteOnly => options.append(true),
    };
    options
        .custom_flags(request.custom_flags().bits())
        .open(path)
        .map_err(|e| PipeError::from_open(path.to_path_buf(), e))
}
