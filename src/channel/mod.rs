/*!
 * Pipe Channel
 *
 * Line-oriented messaging over one named pipe. Writers append a line with a
 * non-blocking open; the listening side wakes on Write notifications for the
 * pipe and drains whatever is buffered into one message.
 *
 * Messages are newline-terminated UTF-8 with no escaping, so a line that
 * contains a newline cannot be told apart from two messages.
 */

mod reader;

use crate::config::PipeConfig;
use crate::core::limits::OUTBOUND_QUEUE_DEPTH;
use crate::core::{PipeError, PipeResult};
use crate::events::{Dispatcher, EventWatcher, FsOp, HandlerRegistry, NotifySource, WatchSource};
use crate::fifo::{PipeFd, PipeHandle, PipeOpener};
use arc_swap::ArcSwapOption;
use futures::Stream;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Sender slot of the current message stream; empty when nobody subscribed
type Outlet = Arc<ArcSwapOption<mpsc::Sender<String>>>;

/// Everything `listen` started, torn down together
struct Listener {
    watcher: EventWatcher,
    dispatcher: JoinHandle<u64>,
    errors: JoinHandle<()>,
    // Writers need a reader present for a non-blocking open to succeed
    _keepalive: PipeFd,
}

/// Named pipe with write-line and event-driven read operations
pub struct PipeChannel {
    handle: Arc<PipeHandle>,
    opener: PipeOpener,
    config: PipeConfig,
    outlet: Outlet,
    listener: Option<Listener>,
}

impl PipeChannel {
    /// Create the FIFO at `path`
    pub fn create(path: impl Into<PathBuf>, config: PipeConfig) -> PipeResult<Self> {
        let handle = PipeHandle::create_at(path)?;
        info!(path = %handle.path().display(), "Created pipe channel");
        Ok(Self::from_handle(Arc::new(handle), config))
    }

    /// Use a FIFO that already exists at `path`
    pub fn attach(path: impl Into<PathBuf>, config: PipeConfig) -> PipeResult<Self> {
        let handle = PipeHandle::open_existing(path)?;
        info!(path = %handle.path().display(), "Attached pipe channel");
        Ok(Self::from_handle(Arc::new(handle), config))
    }

    pub fn from_handle(handle: Arc<PipeHandle>, config: PipeConfig) -> Self {
        Self {
            handle,
            opener: PipeOpener::new(config.clone()),
            config,
            outlet: Arc::new(ArcSwapOption::empty()),
            listener: None,
        }
    }

    pub fn handle(&self) -> &Arc<PipeHandle> {
        &self.handle
    }

    pub fn path(&self) -> &Path {
        self.handle.path()
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    /// Append `text` and a line terminator to the pipe
    ///
    /// Fails with `NoPeerPresent` when nothing holds the pipe open for
    /// reading. The descriptor is closed before this returns.
    pub async fn write_line(&self, text: &str) -> PipeResult<()> {
        let mut fd = self.opener.open_writer(&self.handle).await?;

        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        fd.write_all(line.as_bytes())?;

        debug!(path = %self.handle.path().display(), bytes = line.len(), "Wrote line");
        Ok(())
    }

    /// Start reacting to activity on the pipe
    ///
    /// Handlers in `registry` run alongside the channel's own reader (on
    /// Write) and terminator (on Remove). Calling this again replaces the
    /// previous listener.
    pub async fn listen(&mut self, registry: HandlerRegistry) -> PipeResult<()> {
        let source = NotifySource::with_buffer(self.config.raw_event_buffer);
        self.listen_with(registry, source).await
    }

    /// [`PipeChannel::listen`] over a caller-supplied watch source
    pub async fn listen_with<S: WatchSource>(
        &mut self,
        mut registry: HandlerRegistry,
        source: S,
    ) -> PipeResult<()> {
        self.stop().await;

        let keepalive = self.opener.open_reader(&self.handle).await?;

        registry
            .register(
                FsOp::Write,
                reader::reader(
                    Arc::clone(&self.handle),
                    self.opener.clone(),
                    Arc::clone(&self.outlet),
                ),
            )
            .register(FsOp::Remove, reader::terminator(Arc::clone(&self.outlet)));

        let (watcher, streams) = EventWatcher::spawn(&self.handle, source)?;
        let dispatcher = Dispatcher::new(registry).run(streams.events);
        let errors = tokio::spawn(drain_errors(streams.errors));

        info!(path = %self.handle.path().display(), "Pipe channel listening");
        self.listener = Some(Listener {
            watcher,
            dispatcher,
            errors,
            _keepalive: keepalive,
        });
        Ok(())
    }

    /// Messages read from the pipe, one per drained burst
    ///
    /// Calling this again ends the previously returned stream and starts a new
    /// one. Every stream ends when the pipe is destroyed or the channel stops.
    pub fn messages(&self) -> impl Stream<Item = String> + Send + 'static {
        let (tx, mut rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        if self.outlet.swap(Some(Arc::new(tx))).is_some() {
            debug!("Replaced previous message stream");
        }

        async_stream::stream! {
            while let Some(message) = rx.recv().await {
                yield message;
            }
        }
    }

    /// Remove the pipe node and end the message stream
    pub fn destroy(&self) -> PipeResult<()> {
        self.outlet.store(None);
        self.handle.destroy()
    }

    /// Stop listening; the pipe node stays in place
    pub async fn stop(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };

        listener.watcher.stop().await;
        match listener.dispatcher.await {
            Ok(events) => debug!(events, "Dispatcher drained"),
            Err(e) => warn!(error = %e, "Dispatcher task ended abnormally"),
        }
        if let Err(e) = listener.errors.await {
            warn!(error = %e, "Watch error drain ended abnormally");
        }

        self.outlet.store(None);
        info!(path = %self.handle.path().display(), "Pipe channel stopped");
    }
}

impl std::fmt::Debug for PipeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeChannel")
            .field("handle", &self.handle)
            .field("config", &self.config)
            .field("listening", &self.is_listening())
            .finish()
    }
}

async fn drain_errors(mut errors: mpsc::Receiver<PipeError>) {
    while let Some(err) = errors.recv().await {
        warn!(error = %err, "Pipe watcher reported an error");
    }
}
