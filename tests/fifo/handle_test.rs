/*!
 * Pipe Handle Tests
 * Node creation, removal and path resolution against a real filesystem
 */

use pipewatch::{PipeError, PipeHandle, PipeState};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::fs;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};

#[test]
fn test_create_makes_fifo_with_mode_0600() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipe");

    let handle = PipeHandle::create_at(&path).unwrap();
    assert_eq!(handle.state(), PipeState::Created);

    let metadata = fs::metadata(&path).unwrap();
    assert!(metadata.file_type().is_fifo());
    assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
}

#[test]
fn test_create_over_existing_node_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taken");
    fs::write(&path, b"regular file").unwrap();

    let handle = PipeHandle::new(&path);
    let result = handle.create();
    assert!(matches!(result, Err(PipeError::AlreadyExists(_))));
    assert_eq!(handle.state(), PipeState::Uncreated);

    // The existing node is left alone
    assert_eq!(fs::read(&path).unwrap(), b"regular file");
}

#[test]
fn test_second_create_on_same_handle_fails() {
    let dir = tempfile::tempdir().unwrap();
    let handle = PipeHandle::create_at(dir.path().join("pipe")).unwrap();
    assert!(matches!(handle.create(), Err(PipeError::AlreadyExists(_))));
}

#[test]
fn test_create_in_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let handle = PipeHandle::new(dir.path().join("missing").join("pipe"));
    assert!(matches!(handle.create(), Err(PipeError::NotFound(_))));
}

#[test]
fn test_destroy_removes_node() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipe");
    let handle = PipeHandle::create_at(&path).unwrap();

    handle.destroy().unwrap();
    assert!(!path.exists());
    assert_eq!(handle.state(), PipeState::Destroyed);
}

#[test]
fn test_destroy_missing_node_fails() {
    let dir = tempfile::tempdir().unwrap();

    let never_created = PipeHandle::new(dir.path().join("nothing"));
    assert!(matches!(never_created.destroy(), Err(PipeError::NotFound(_))));

    let handle = PipeHandle::create_at(dir.path().join("pipe")).unwrap();
    handle.destroy().unwrap();
    assert!(matches!(handle.destroy(), Err(PipeError::NotFound(_))));
}

#[test]
fn test_uncreated_handle_leaves_foreign_file_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    fs::write(&path, b"keep me").unwrap();

    let handle = PipeHandle::new(&path);
    assert!(matches!(handle.destroy(), Err(PipeError::NotFound(_))));
    assert_eq!(fs::read(&path).unwrap(), b"keep me");
    assert_eq!(handle.state(), PipeState::Uncreated);
}

#[test]
fn test_destroy_refuses_node_replaced_by_regular_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipe");
    let handle = PipeHandle::create_at(&path).unwrap();

    fs::remove_file(&path).unwrap();
    fs::write(&path, b"not a pipe").unwrap();

    assert!(matches!(handle.destroy(), Err(PipeError::NotAFifo(_))));
    assert!(path.exists());
    assert_eq!(handle.state(), PipeState::Created);

    fs::remove_file(&path).unwrap();
    assert!(matches!(handle.destroy(), Err(PipeError::NotFound(_))));
}

#[test]
fn test_destroyed_handle_cannot_be_recreated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipe");
    let handle = PipeHandle::create_at(&path).unwrap();
    handle.destroy().unwrap();

    assert!(matches!(
        handle.create(),
        Err(PipeError::InvalidState {
            state: PipeState::Destroyed,
            ..
        })
    ));

    // A fresh handle for the same path works
    let again = PipeHandle::create_at(&path).unwrap();
    assert!(again.is_created());
}

#[test]
fn test_dropping_handle_keeps_node() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipe");
    drop(PipeHandle::create_at(&path).unwrap());
    assert!(path.exists());
}

#[test]
fn test_open_existing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipe");
    let creator = PipeHandle::create_at(&path).unwrap();

    let adopted = PipeHandle::open_existing(&path).unwrap();
    assert!(adopted.is_created());
    assert_eq!(adopted.absolute_path().unwrap(), creator.absolute_path().unwrap());

    let plain = dir.path().join("plain");
    fs::write(&plain, b"").unwrap();
    assert!(matches!(
        PipeHandle::open_existing(&plain),
        Err(PipeError::NotAFifo(_))
    ));
    assert!(matches!(
        PipeHandle::open_existing(dir.path().join("absent")),
        Err(PipeError::NotFound(_))
    ));
}

#[test]
#[serial]
fn test_relative_path_resolves_against_cwd() {
    let dir = tempfile::tempdir().unwrap();
    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();

    let handle = PipeHandle::new("sub/../pipe");
    let absolute = handle.absolute_path();
    let parent = handle.parent_directory();
    let created = handle.create();

    std::env::set_current_dir(previous).unwrap();

    let cwd = dir.path().canonicalize().unwrap();
    assert_eq!(absolute.unwrap(), cwd.join("pipe"));
    assert_eq!(parent.unwrap(), cwd);
    created.unwrap();
    assert!(dir.path().join("pipe").exists());
}
