/*!
 * Handler Registry and Dispatcher
 *
 * Handlers are registered per operation before the watcher starts. Building
 * a Dispatcher freezes the registry: it is shared read-only from then on and
 * cannot be extended without building a new dispatcher.
 *
 * Every matching handler runs as its own task. The dispatcher never waits
 * for a handler, so side effects of different handlers, or of one handler
 * across events, may land in any order.
 */

use super::types::{FsEvent, FsOp};
use ahash::RandomState;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Reacts to one classified event
///
/// Any `Fn(FsEvent) -> impl Future<Output = ()>` closure is a handler.
pub trait EventHandler: Send + Sync + 'static {
    fn handle(&self, event: FsEvent) -> BoxFuture<'static, ()>;
}

impl<F, Fut> EventHandler for F
where
    F: Fn(FsEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn handle(&self, event: FsEvent) -> BoxFuture<'static, ()> {
        Box::pin(self(event))
    }
}

/// Operation to ordered handler list
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<FsOp, Vec<Arc<dyn EventHandler>>, RandomState>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the list for `op`; duplicates are kept
    pub fn register<H: EventHandler>(&mut self, op: FsOp, handler: H) -> &mut Self {
        self.register_shared(op, Arc::new(handler))
    }

    /// Append an already shared handler
    pub fn register_shared(&mut self, op: FsOp, handler: Arc<dyn EventHandler>) -> &mut Self {
        self.handlers.entry(op).or_default().push(handler);
        self
    }

    pub fn handlers(&self, op: FsOp) -> &[Arc<dyn EventHandler>] {
        self.handlers.get(&op).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn handler_count(&self, op: FsOp) -> usize {
        self.handlers(op).len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.values().all(Vec::is_empty)
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for op in FsOp::ALL {
            let count = self.handler_count(op);
            if count > 0 {
                map.entry(&op, &count);
            }
        }
        map.finish()
    }
}

/// Fans events out to their registered handlers
#[derive(Clone, Debug)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
}

impl Dispatcher {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Spawn one task per handler registered for the event's operation
    ///
    /// Returns the number of tasks spawned; zero when nobody listens for the
    /// operation. Must be called from within a tokio runtime.
    pub fn dispatch(&self, event: &FsEvent) -> usize {
        let handlers = self.registry.handlers(event.op());
        for handler in handlers {
            tokio::spawn(handler.handle(event.clone()));
        }
        if !handlers.is_empty() {
            debug!(op = %event.op(), handlers = handlers.len(), "Dispatched event");
        }
        handlers.len()
    }

    /// Dispatch every event from `events`, in order, until the stream closes
    pub fn run(self, mut events: mpsc::Receiver<FsEvent>) -> JoinHandle<u64> {
        tokio::spawn(async move {
            let mut dispatched = 0u64;
            while let Some(event) = events.recv().await {
                self.dispatch(&event);
                dispatched += 1;
            }
            info!(events = dispatched, "Dispatcher finished, event stream closed");
            dispatched
        })
    }
}
