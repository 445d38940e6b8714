/*!
 * FIFO Module
 * Named pipe lifecycle and timeout-bounded opens
 */

pub mod fd;
pub mod handle;
pub mod opener;
pub mod types;

// Re-export public API
pub use fd::PipeFd;
pub use handle::{absolute, PipeHandle};
pub use opener::PipeOpener;
pub use types::{AccessMode, OpenRequest, PipeState};
