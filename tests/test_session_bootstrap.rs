//! Session bootstrap over durable file storage.

mod common;

use std::sync::Arc;

use common::MockTransport;
use srscan::session::{FileStore, KeyValueStore, SESSION_KEY, SessionProvider, SessionState, StoredSessionProvider};
use srscan::transport::TransportError;

#[tokio::test]
async fn test_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state/storage.json");
    let transport = MockTransport::new();
    transport.push_session(Ok("persisted"));

    let first = StoredSessionProvider::new(Arc::new(FileStore::new(&path)), transport.clone());
    assert_eq!(first.current(), SessionState::Uninitialized);
    let state = first.ensure_session().await.unwrap();
    assert_eq!(state.id().unwrap().as_str(), "persisted");
    drop(first);

    let second = StoredSessionProvider::new(Arc::new(FileStore::new(&path)), transport.clone());
    assert_eq!(second.current().id().unwrap().as_str(), "persisted");
    second.ensure_session().await.unwrap();
    assert_eq!(transport.session_calls(), 1);
}

#[tokio::test]
async fn test_cleared_storage_bootstraps_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");
    let store = Arc::new(FileStore::new(&path));
    let transport = MockTransport::new();
    transport.push_session(Ok("one"));
    transport.push_session(Ok("two"));
    let provider = StoredSessionProvider::new(store.clone(), transport.clone());

    provider.ensure_session().await.unwrap();
    store.remove(SESSION_KEY).unwrap();
    let state = provider.ensure_session().await.unwrap();

    assert_eq!(state.id().unwrap().as_str(), "two");
    assert_eq!(transport.session_calls(), 2);
}

#[tokio::test]
async fn test_failed_bootstrap_leaves_nothing_stored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");
    let store = Arc::new(FileStore::new(&path));
    let transport = MockTransport::new();
    transport.push_session(Err(TransportError::unreachable("connection refused")));
    let provider = StoredSessionProvider::new(store.clone(), transport);

    assert!(provider.ensure_session().await.is_err());
    assert_eq!(provider.current(), SessionState::Uninitialized);
    assert_eq!(store.get(SESSION_KEY).unwrap(), None);
}
