/*!
 * pipewatch
 * Line messaging over Unix named pipes, driven by filesystem notifications
 */

pub mod channel;
pub mod config;
pub mod core;
pub mod events;
pub mod fifo;
pub mod monitoring;

// Re-exports
pub use channel::PipeChannel;
pub use config::PipeConfig;
pub use crate::core::{PipeError, PipeResult};
pub use events::{
    Dispatcher, EventHandler, EventWatcher, FsEvent, FsOp, HandlerRegistry, NotifySource,
    RawEvent, RawStreams, WatchSource, WatchStreams,
};
pub use fifo::{AccessMode, OpenRequest, PipeFd, PipeHandle, PipeOpener, PipeState};
pub use monitoring::init_tracing;
