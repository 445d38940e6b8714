/*!
 * Watch Sources
 * Directory subscriptions that feed raw notifications to the watcher
 */

use crate::core::limits::RAW_EVENT_BUFFER;
use crate::core::{PipeError, PipeResult};
use notify::event::{AccessKind, AccessMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One raw notification: a single path and the backend's operation code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub path: PathBuf,
    pub kind: EventKind,
}

impl RawEvent {
    pub fn new(path: impl Into<PathBuf>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Receiving halves of a subscription
#[derive(Debug)]
pub struct RawStreams {
    pub events: mpsc::Receiver<RawEvent>,
    pub errors: mpsc::Receiver<notify::Error>,
}

/// Directory-level watch subscription
pub trait WatchSource: Send + 'static {
    /// Start watching `directory` (non-recursive)
    fn subscribe(&mut self, directory: &Path) -> PipeResult<RawStreams>;

    /// Release the subscription; calling it again is a no-op
    fn unsubscribe(&mut self);
}

/// [`WatchSource`] backed by the platform watcher from `notify`
///
/// Access notifications are not part of the subscription, except the close of
/// a descriptor opened for writing: some kernels report a write to a FIFO only
/// that way. A notification that names several paths is split into one raw
/// event per path.
pub struct NotifySource {
    watcher: Option<RecommendedWatcher>,
    directory: Option<PathBuf>,
    buffer: usize,
}

impl NotifySource {
    pub fn new() -> Self {
        Self::with_buffer(RAW_EVENT_BUFFER)
    }

    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            watcher: None,
            directory: None,
            buffer: buffer.max(1),
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.watcher.is_some()
    }
}

impl Default for NotifySource {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchSource for NotifySource {
    fn subscribe(&mut self, directory: &Path) -> PipeResult<RawStreams> {
        self.unsubscribe();

        let (event_tx, event_rx) = mpsc::channel(self.buffer);
        let (error_tx, error_rx) = mpsc::channel(self.buffer);

        // Runs on notify's own thread, outside the runtime, so blocking sends are fine
        let callback = move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !is_forwarded(&event.kind) {
                    return;
                }
                for path in event.paths {
                    if event_tx.blocking_send(RawEvent::new(path, event.kind)).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                if error_tx.blocking_send(e).is_err() {
                    debug!("Watch error dropped, subscriber gone");
                }
            }
        };

        let subscription_error = |source: notify::Error| PipeError::WatchSubscription {
            directory: directory.to_path_buf(),
            source,
        };

        let mut watcher =
            RecommendedWatcher::new(callback, Config::default()).map_err(subscription_error)?;
        watcher
            .watch(directory, RecursiveMode::NonRecursive)
            .map_err(subscription_error)?;

        info!(directory = %directory.display(), "Subscribed to directory notifications");
        self.watcher = Some(watcher);
        self.directory = Some(directory.to_path_buf());

        Ok(RawStreams {
            events: event_rx,
            errors: error_rx,
        })
    }

    fn unsubscribe(&mut self) {
        let Some(mut watcher) = self.watcher.take() else {
            return;
        };
        if let Some(directory) = self.directory.take() {
            if let Err(e) = watcher.unwatch(&directory) {
                warn!(directory = %directory.display(), error = %e, "Failed to unwatch directory");
            } else {
                info!(directory = %directory.display(), "Unsubscribed from directory notifications");
            }
        }
    }
}

/// Whether a backend notification belongs to the subscription
pub(crate) fn is_forwarded(kind: &EventKind) -> bool {
    match kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => true,
        EventKind::Access(_) => false,
        _ => true,
    }
}

impl Drop for NotifySource {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
