/*!
 * pipewatch - Main Entry Point
 *
 * Creates a named pipe, prints every line written to it and logs each
 * filesystem event seen on it until interrupted.
 */

use anyhow::Context;
use futures::StreamExt;
use tracing::{info, warn};

use pipewatch::core::limits::{DEFAULT_PIPE_PATH, ENV_PIPE_PATH};
use pipewatch::{init_tracing, FsEvent, FsOp, HandlerRegistry, PipeChannel, PipeConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = PipeConfig::from_env();
    let path = std::env::var(ENV_PIPE_PATH).unwrap_or_else(|_| DEFAULT_PIPE_PATH.to_string());
    info!(path = %path, open_timeout_ms = config.open_timeout.as_millis() as u64, "pipewatch starting");

    let mut channel = PipeChannel::create(&path, config)
        .with_context(|| format!("creating named pipe at {path}"))?;

    let mut registry = HandlerRegistry::new();
    for op in FsOp::ALL {
        registry.register(op, |event: FsEvent| async move {
            match serde_json::to_string(&event) {
                Ok(json) => info!(event = %json, "Pipe event"),
                Err(e) => warn!(error = %e, "Failed to encode event"),
            }
        });
    }

    if let Err(e) = channel.listen(registry).await {
        let _ = channel.destroy();
        return Err(e).context("starting pipe listener");
    }

    let mut messages = Box::pin(channel.messages());
    info!("Listening; write lines with `echo hello > {}`", path);

    loop {
        tokio::select! {
            message = messages.next() => match message {
                Some(message) => print!("{message}"),
                None => {
                    info!("Message stream ended");
                    break;
                }
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("waiting for ctrl-c")?;
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    channel.stop().await;
    match channel.destroy() {
        Ok(()) => info!(path = %path, "Removed named pipe"),
        Err(e) => warn!(path = %path, error = %e, "Failed to remove named pipe"),
    }
    Ok(())
}
