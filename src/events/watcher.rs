/*!
 * Event Watcher
 *
 * Subscribes to the pipe's parent directory, classifies every raw
 * notification, keeps only those for the pipe itself and republishes them.
 *
 * A writer session on the pipe yields one Write per data change the kernel
 * reports, or a single Write at close when the kernel reports no data change
 * for FIFOs. A write close that follows reported data changes is dropped.
 *
 * Both outbound streams hold one item. The loop waits for the consumer to
 * take the previous item before it reads the next notification, so nothing
 * queues up unbounded and nothing is dropped under load.
 */

use super::classify::{classify, is_write_close};
use super::source::{RawEvent, RawStreams, WatchSource};
use super::types::{FsEvent, FsOp};
use crate::core::limits::OUTBOUND_QUEUE_DEPTH;
use crate::core::{PipeError, PipeResult};
use crate::fifo::{absolute, PipeHandle};
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outbound halves of a running watcher
#[derive(Debug)]
pub struct WatchStreams {
    /// Classified events for the monitored pipe, in arrival order
    pub events: mpsc::Receiver<FsEvent>,
    /// Unsupported operations, path failures and backend errors
    pub errors: mpsc::Receiver<PipeError>,
}

/// Running watch loop for one pipe
///
/// Dropping the watcher stops the loop just like [`EventWatcher::stop`],
/// without waiting for it to finish.
#[derive(Debug)]
pub struct EventWatcher {
    target: PathBuf,
    directory: PathBuf,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl EventWatcher {
    /// Subscribe to the parent directory of `handle` and start the loop
    ///
    /// Must be called from within a tokio runtime. A failed subscription is
    /// returned here and nothing is spawned.
    pub fn spawn<S: WatchSource>(
        handle: &PipeHandle,
        mut source: S,
    ) -> PipeResult<(Self, WatchStreams)> {
        let target = handle.absolute_path()?;
        let directory = handle.parent_directory()?;

        let raw = source.subscribe(&directory)?;

        let (event_tx, event_rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        let (error_tx, error_rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        let (stop_tx, stop_rx) = oneshot::channel();

        let watch_loop = WatchLoop {
            source,
            raw,
            target: target.clone(),
            events: event_tx,
            errors: error_tx,
            stop: stop_rx,
            modified: false,
        };
        let task = tokio::spawn(watch_loop.run());

        info!(
            pipe = %target.display(),
            directory = %directory.display(),
            "Event watcher started"
        );

        Ok((
            Self {
                target,
                directory,
                stop_tx: Some(stop_tx),
                task: Some(task),
            },
            WatchStreams {
                events: event_rx,
                errors: error_rx,
            },
        ))
    }

    /// Absolute path of the monitored pipe
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Directory the subscription is bound to
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Stop the loop and wait until it has unsubscribed and closed its streams
    ///
    /// Opens already in flight elsewhere are not affected.
    pub async fn stop(mut self) {
        self.signal_stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Event watcher task ended abnormally");
            }
        }
    }

    fn signal_stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            // Err only when the loop is already gone
            let _ = tx.send(());
        }
    }
}

impl Drop for EventWatcher {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

enum Outbound {
    Event(FsEvent),
    Error(PipeError),
}

enum Step {
    Stop,
    Raw(RawEvent),
    Backend(notify::Error),
    SourceClosed,
}

struct WatchLoop<S> {
    source: S,
    raw: RawStreams,
    target: PathBuf,
    events: mpsc::Sender<FsEvent>,
    errors: mpsc::Sender<PipeError>,
    stop: oneshot::Receiver<()>,
    /// A data change on the pipe was published since the last write close
    modified: bool,
}

impl<S: WatchSource> WatchLoop<S> {
    async fn run(mut self) {
        loop {
            let step = tokio::select! {
                biased;
                _ = &mut self.stop => Step::Stop,
                raw = self.raw.events.recv() => match raw {
                    Some(raw) => Step::Raw(raw),
                    None => Step::SourceClosed,
                },
                Some(err) = self.raw.errors.recv() => Step::Backend(err),
            };

            let outbound = match step {
                Step::Stop => break,
                Step::SourceClosed => {
                    debug!(pipe = %self.target.display(), "Raw event stream closed");
                    break;
                }
                Step::Backend(err) => Outbound::Error(PipeError::WatchBackend(err)),
                Step::Raw(raw) => match self.translate(raw) {
                    Some(outbound) => outbound,
                    None => continue,
                },
            };

            if !self.publish(outbound).await {
                break;
            }
        }

        // The backend thread may be parked on a full raw channel; closing it
        // first lets unsubscribe reach that thread.
        self.raw.events.close();
        self.raw.errors.close();
        self.source.unsubscribe();
        info!(pipe = %self.target.display(), "Event watcher stopped");
        // Both senders drop with self, closing the outbound streams
    }

    /// Classify, filter on the pipe path, then fold write closes
    fn translate(&mut self, raw: RawEvent) -> Option<Outbound> {
        let Some(op) = classify(raw.kind) else {
            return Some(Outbound::Error(PipeError::UnsupportedOperation {
                kind: format!("{:?}", raw.kind),
                path: raw.path,
            }));
        };

        let path = match absolute(&raw.path) {
            Ok(path) => path,
            Err(e) => return Some(Outbound::Error(e)),
        };

        if path != self.target {
            return None;
        }

        if op == FsOp::Write {
            if !is_write_close(raw.kind) {
                self.modified = true;
            } else if std::mem::take(&mut self.modified) {
                return None;
            }
        }

        Some(Outbound::Event(FsEvent::new(path, op)))
    }

    /// Hand one item to its consumer, giving up if a stop arrives first
    ///
    /// Returns false when the loop should end.
    async fn publish(&mut self, outbound: Outbound) -> bool {
        match outbound {
            Outbound::Event(event) => {
                debug!(op = %event.op(), path = %event.path().display(), "Publishing event");
                tokio::select! {
                    biased;
                    _ = &mut self.stop => false,
                    sent = self.events.send(event) => {
                        if sent.is_err() {
                            debug!("Event consumer gone");
                        }
                        sent.is_ok()
                    }
                }
            }
            Outbound::Error(err) => {
                tokio::select! {
                    biased;
                    _ = &mut self.stop => false,
                    sent = self.errors.send(err) => {
                        if let Err(mpsc::error::SendError(err)) = sent {
                            warn!(error = %err, "Watch error dropped, no error consumer");
                        }
                        true
                    }
                }
            }
        }
    }
}
