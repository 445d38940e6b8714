/*!
 * Event Watcher Tests
 * Real directory notifications through the notify backend
 */

use pipewatch::{
    EventWatcher, FsEvent, FsOp, NotifySource, PipeHandle, PipeOpener, WatchStreams,
};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

const EVENT_WAIT: Duration = Duration::from_secs(5);

fn fresh_pipe() -> (TempDir, PipeHandle) {
    let dir = tempfile::tempdir().unwrap();
    let handle = PipeHandle::create_at(dir.path().join("pipe")).unwrap();
    (dir, handle)
}

/// Next event with the given operation, skipping any others
async fn next_op(streams: &mut WatchStreams, op: FsOp) -> FsEvent {
    tokio::time::timeout(EVENT_WAIT, async {
        loop {
            let event = streams.events.recv().await.expect("event stream closed");
            if event.op() == op {
                return event;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no {} event within {:?}", op, EVENT_WAIT))
}

async fn write_through_pipe(opener: &PipeOpener, handle: &PipeHandle, text: &str) {
    let mut writer = opener.open_writer(handle).await.unwrap();
    writer.write_all(text.as_bytes()).unwrap();
}

#[tokio::test]
async fn test_watcher_reports_writes_to_pipe_only() {
    let (dir, handle) = fresh_pipe();
    let opener = PipeOpener::default();
    let _reader = opener.open_reader(&handle).await.unwrap();

    let (watcher, mut streams) = EventWatcher::spawn(&handle, NotifySource::new()).unwrap();
    assert_eq!(watcher.target(), handle.absolute_path().unwrap());

    std::fs::write(dir.path().join("sibling"), b"noise").unwrap();
    write_through_pipe(&opener, &handle, "a\n").await;

    let event = next_op(&mut streams, FsOp::Write).await;
    assert_eq!(event.path(), handle.absolute_path().unwrap());

    watcher.stop().await;
    while let Some(event) = streams.events.recv().await {
        assert_eq!(event.path(), handle.absolute_path().unwrap());
    }
}

#[tokio::test]
async fn test_sequential_writes_arrive_in_order() {
    let (_dir, handle) = fresh_pipe();
    let opener = PipeOpener::default();
    let mut reader = opener.open_reader(&handle).await.unwrap();

    let (watcher, mut streams) = EventWatcher::spawn(&handle, NotifySource::new()).unwrap();

    write_through_pipe(&opener, &handle, "a\n").await;
    next_op(&mut streams, FsOp::Write).await;
    assert_eq!(reader.drain(64).unwrap(), b"a\n");

    write_through_pipe(&opener, &handle, "b\n").await;
    next_op(&mut streams, FsOp::Write).await;
    assert_eq!(reader.drain(64).unwrap(), b"b\n");

    watcher.stop().await;
}

#[tokio::test]
async fn test_destroy_yields_remove_event() {
    let (_dir, handle) = fresh_pipe();
    let (watcher, mut streams) = EventWatcher::spawn(&handle, NotifySource::new()).unwrap();

    handle.destroy().unwrap();
    let event = next_op(&mut streams, FsOp::Remove).await;
    assert_eq!(event.path(), handle.absolute_path().unwrap());

    watcher.stop().await;
}

#[tokio::test]
async fn test_create_after_watch_yields_create_event() {
    let dir = tempfile::tempdir().unwrap();
    let handle = PipeHandle::new(dir.path().join("late"));

    let (watcher, mut streams) = EventWatcher::spawn(&handle, NotifySource::new()).unwrap();
    handle.create().unwrap();

    let event = next_op(&mut streams, FsOp::Create).await;
    assert_eq!(event.path(), dir.path().join("late"));
    watcher.stop().await;
}

#[tokio::test]
async fn test_no_events_after_stop() {
    let (_dir, handle) = fresh_pipe();
    let opener = PipeOpener::default();
    let _reader = opener.open_reader(&handle).await.unwrap();

    let (watcher, mut streams) = EventWatcher::spawn(&handle, NotifySource::new()).unwrap();
    watcher.stop().await;

    write_through_pipe(&opener, &handle, "late\n").await;
    handle.destroy().unwrap();

    let closed = tokio::time::timeout(EVENT_WAIT, streams.events.recv())
        .await
        .unwrap();
    assert_eq!(closed, None);
    assert!(streams.errors.recv().await.is_none());
}

#[tokio::test]
async fn test_watch_on_missing_directory_fails() {
    let handle = PipeHandle::new(Path::new("/definitely/not/here/pipe"));
    let result = EventWatcher::spawn(&handle, NotifySource::new());
    assert!(matches!(
        result,
        Err(pipewatch::PipeError::WatchSubscription { .. })
    ));
}
