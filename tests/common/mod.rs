//! Common test utilities shared by the integration tests.
//!
//! - [`MockTransport`]: scripted service responses with call counters
//! - [`captured_image`]: a real JPEG capture from the synthetic camera
//! - [`stored_sessions`]: a session provider over in-memory storage

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use srscan::Size;
use srscan::capture::sources::SyntheticDevices;
use srscan::capture::{CapturedImage, FrameCapture, MediaConstraints, MediaDevices, MediaStream};
use srscan::core::HandleRegistry;
use srscan::session::{KeyValueStore, MemoryStore, SESSION_KEY, SessionId, StoredSessionProvider};
use srscan::transport::{ProgressEvent, ProgressSink, ScanTransport, ScanUpload, TransportError};

/// How the mock answers one `POST /scan`.
pub enum ScanReply {
    Json(Value),
    Fail(TransportError),
    /// Never answers.
    Hang,
}

/// Scripted [`ScanTransport`].
#[derive(Default)]
pub struct MockTransport {
    sessions: Mutex<VecDeque<Result<SessionId, TransportError>>>,
    scans: Mutex<VecDeque<ScanReply>>,
    /// Emitted in order before a scan reply, `step` apart.
    progress: Mutex<Vec<ProgressEvent>>,
    step: Mutex<Duration>,
    export: Mutex<Vec<u8>>,
    uploads: Mutex<Vec<(SessionId, ScanUpload)>>,
    session_calls: AtomicUsize,
    scan_calls: AtomicUsize,
    download_calls: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_session(&self, reply: Result<&str, TransportError>) {
        let reply = reply.map(|id| SessionId::new(id).expect("non-empty id"));
        self.sessions.lock().push_back(reply);
    }

    pub fn push_scan(&self, reply: ScanReply) {
        self.scans.lock().push_back(reply);
    }

    pub fn set_progress(&self, events: Vec<ProgressEvent>, step: Duration) {
        *self.progress.lock() = events;
        *self.step.lock() = step;
    }

    pub fn set_export(&self, bytes: &[u8]) {
        *self.export.lock() = bytes.to_vec();
    }

    pub fn session_calls(&self) -> usize {
        self.session_calls.load(Ordering::SeqCst)
    }

    pub fn scan_calls(&self) -> usize {
        self.scan_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    /// Session and payload of every upload received.
    pub fn uploads(&self) -> Vec<(SessionId, ScanUpload)> {
        self.uploads.lock().clone()
    }
}

#[async_trait]
impl ScanTransport for MockTransport {
    async fn create_session(&self) -> Result<SessionId, TransportError> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);
        self.sessions
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::unreachable("no scripted session")))
    }

    async fn upload_scan(
        &self,
        session: &SessionId,
        upload: ScanUpload,
        progress: ProgressSink,
    ) -> Result<Value, TransportError> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        self.uploads.lock().push((session.clone(), upload));

        let events = self.progress.lock().clone();
        let step = *self.step.lock();
        for event in events {
            tokio::time::sleep(step).await;
            progress(event);
        }
        tokio::time::sleep(step).await;

        let reply = self.scans.lock().pop_front();
        match reply {
            Some(ScanReply::Json(body)) => Ok(body),
            Some(ScanReply::Fail(err)) => Err(err),
            Some(ScanReply::Hang) | None => std::future::pending().await,
        }
    }

    async fn download_results(&self, _session: &SessionId) -> Result<Vec<u8>, TransportError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.export.lock().clone())
    }
}

/// Capture one synthetic frame of `size` through a real [`FrameCapture`].
pub async fn captured_image(registry: &Arc<HandleRegistry>, size: Size) -> CapturedImage {
    let devices = SyntheticDevices::new(size);
    let mut stream = devices
        .get_user_media(MediaConstraints::video_only())
        .await
        .expect("synthetic camera");
    stream.play().await.expect("play");
    let mut frames = FrameCapture::new(Arc::clone(registry), Size { w: 640, h: 480 }, 0.9);
    let image = frames.capture(stream.as_mut()).await.expect("capture").clone();
    stream.stop_tracks();
    image
}

/// Provider over in-memory storage, optionally pre-seeded with an id.
pub fn stored_sessions(
    transport: Arc<dyn ScanTransport>,
    existing: Option<&str>,
) -> (Arc<StoredSessionProvider>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    if let Some(id) = existing {
        store.set(SESSION_KEY, id).expect("memory store");
    }
    let provider = Arc::new(StoredSessionProvider::new(store.clone(), transport));
    (provider, store)
}
