/*!
 * Events Module
 * Directory notifications filtered down to one pipe and fanned out to handlers
 */

pub mod classify;
pub mod dispatch;
pub mod source;
pub mod types;
pub mod watcher;

// Re-export public API
pub use classify::classify;
pub use dispatch::{Dispatcher, EventHandler, HandlerRegistry};
pub use source::{NotifySource, RawEvent, RawStreams, WatchSource};
pub use types::{FsEvent, FsOp};
pub use watcher::{EventWatcher, WatchStreams};
