/*!
 * Dispatch Tests
 * Handler fan-out and ordering through the public API
 */

use pipewatch::{Dispatcher, FsEvent, FsOp, HandlerRegistry};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::test]
async fn test_unregistered_operation_is_ignored() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut registry = HandlerRegistry::new();
    registry.register(FsOp::Write, move |_event: FsEvent| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    let dispatcher = Dispatcher::new(registry);
    assert_eq!(dispatcher.dispatch(&FsEvent::new("/tmp/p", FsOp::Chmod)), 0);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_every_handler_runs_once_per_event() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = HandlerRegistry::new();
    for _ in 0..3 {
        let calls = Arc::clone(&calls);
        registry.register(FsOp::Remove, move |_event: FsEvent| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        });
    }
    assert_eq!(registry.handler_count(FsOp::Remove), 3);

    let (tx, rx) = mpsc::channel(1);
    let task = Dispatcher::new(registry).run(rx);
    tx.send(FsEvent::new("/tmp/p", FsOp::Remove)).await.unwrap();
    tx.send(FsEvent::new("/tmp/p", FsOp::Remove)).await.unwrap();
    drop(tx);

    assert_eq!(task.await.unwrap(), 2);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_each_event_reaches_handler_with_its_own_path() {
    // Handler tasks may finish in any order
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let mut registry = HandlerRegistry::new();
    registry.register(FsOp::Write, move |event: FsEvent| {
        let seen_tx = seen_tx.clone();
        async move {
            let _ = seen_tx.send(event.path().to_path_buf());
        }
    });

    let (tx, rx) = mpsc::channel(1);
    let task = Dispatcher::new(registry).run(rx);
    for name in ["a", "b", "c"] {
        tx.send(FsEvent::new(format!("/tmp/{name}"), FsOp::Write))
            .await
            .unwrap();
    }
    drop(tx);
    task.await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..3 {
        let path = tokio::time::timeout(Duration::from_secs(1), seen_rx.recv())
            .await
            .unwrap()
            .unwrap();
        seen.push(path.to_string_lossy().into_owned());
    }
    seen.sort();
    assert_eq!(seen, vec!["/tmp/a", "/tmp/b", "/tmp/c"]);
}
