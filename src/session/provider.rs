//! Lazily bootstrapped, storage-backed session provider.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use log::{info, warn};

use super::SessionId;
use super::store::{KeyValueStore, SESSION_KEY};
use crate::error::{ScanError, ScanResult};
use crate::transport::ScanTransport;

/// Where the session identifier is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    /// A bootstrap request is in flight.
    Pending,
    Ready(SessionId),
}

impl SessionState {
    pub fn id(&self) -> Option<&SessionId> {
        match self {
            Self::Ready(id) => Some(id),
            _ => None,
        }
    }
}

/// Source of the session scope for uploads and exports.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// State as of now, without any network traffic.
    fn current(&self) -> SessionState;

    /// Make sure a session exists, creating one if storage has none.
    ///
    /// Answers `Pending` without a second request while a bootstrap is
    /// already running. A failed bootstrap leaves no identifier behind; the
    /// next call tries again. Fails without contacting the service when
    /// storage cannot be read.
    async fn ensure_session(&self) -> ScanResult<SessionState>;
}

/// [`SessionProvider`] persisting the identifier in a [`KeyValueStore`].
pub struct StoredSessionProvider {
    store: Arc<dyn KeyValueStore>,
    transport: Arc<dyn ScanTransport>,
    bootstrapping: AtomicBool,
}

impl StoredSessionProvider {
    pub fn new(store: Arc<dyn KeyValueStore>, transport: Arc<dyn ScanTransport>) -> Self {
        Self {
            store,
            transport,
            bootstrapping: AtomicBool::new(false),
        }
    }

    fn read(&self) -> ScanResult<Option<SessionId>> {
        Ok(self.store.get(SESSION_KEY)?.and_then(SessionId::new))
    }

    fn stored(&self) -> Option<SessionId> {
        self.read().unwrap_or_else(|err| {
            warn!("Cannot read stored session: {err}");
            None
        })
    }
}

/// Clears the in-flight flag even if the bootstrap future is dropped.
struct BootstrapGuard<'a>(&'a AtomicBool);

impl Drop for BootstrapGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionProvider for StoredSessionProvider {
    fn current(&self) -> SessionState {
        match self.stored() {
            Some(id) => SessionState::Ready(id),
            None if self.bootstrapping.load(Ordering::SeqCst) => SessionState::Pending,
            None => SessionState::Uninitialized,
        }
    }

    async fn ensure_session(&self) -> ScanResult<SessionState> {
        // Unreadable storage fails here, before any request.
        if let Some(id) = self.read()? {
            return Ok(SessionState::Ready(id));
        }
        if self
            .bootstrapping
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(SessionState::Pending);
        }
        let _guard = BootstrapGuard(&self.bootstrapping);
        // Another bootstrap may have finished between the read and the claim.
        if let Some(id) = self.read()? {
            return Ok(SessionState::Ready(id));
        }

        let id = self.transport.create_session().await.map_err(|err| {
            warn!("Session bootstrap failed: {err}");
            ScanError::session(err.to_string())
        })?;
        self.store.set(SESSION_KEY, id.as_str())?;
        info!("Session {id} created");
        Ok(SessionState::Ready(id))
    }
}
