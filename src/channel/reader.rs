/*!
 * Channel Reader
 * Internal handlers the channel registers on Write and Remove events
 */

use super::Outlet;
use crate::core::limits::READ_CHUNK_SIZE;
use crate::core::PipeResult;
use crate::events::{EventHandler, FsEvent};
use crate::fifo::{PipeHandle, PipeOpener};
use std::sync::Arc;
use tracing::{debug, warn};

/// Drains the pipe on every Write event and publishes one message per drain
pub(super) fn reader(
    handle: Arc<PipeHandle>,
    opener: PipeOpener,
    outlet: Outlet,
) -> impl EventHandler {
    move |event: FsEvent| {
        let handle = Arc::clone(&handle);
        let opener = opener.clone();
        let outlet = Arc::clone(&outlet);
        async move {
            let message = match read_message(&opener, &handle).await {
                Ok(Some(message)) => message,
                // Another reader got there first
                Ok(None) => return,
                Err(e) => {
                    warn!(path = %event.path().display(), error = %e, "Failed to read from pipe");
                    return;
                }
            };

            let Some(sender) = outlet.load_full() else {
                debug!(bytes = message.len(), "No message subscriber, dropping message");
                return;
            };
            if sender.send(message).await.is_err() {
                debug!("Message stream closed before delivery");
            }
        }
    }
}

/// Ends the current message stream when the pipe node goes away
pub(super) fn terminator(outlet: Outlet) -> impl EventHandler {
    move |event: FsEvent| {
        let outlet = Arc::clone(&outlet);
        async move {
            if outlet.swap(None).is_some() {
                debug!(path = %event.path().display(), "Pipe removed, message stream ended");
            }
        }
    }
}

/// Everything currently buffered in the pipe, `None` when it was empty
async fn read_message(opener: &PipeOpener, handle: &PipeHandle) -> PipeResult<Option<String>> {
    let mut fd = opener.open_reader(handle).await?;
    let bytes = fd.drain(READ_CHUNK_SIZE)?;
    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}
