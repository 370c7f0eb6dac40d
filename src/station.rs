//! # Scan Station
//!
//! Ties the pieces together for one interactive surface: a camera, the
//! current capture, the upload slot and the export button. The station
//! owns the camera and the preview handle and releases both on
//! [`ScanStation::teardown`] or drop, whatever uploads are still running.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::capture::{CapturedImage, FrameCapture, MediaAcquisition, MediaDevices};
use crate::config::ClientConfig;
use crate::core::HandleRegistry;
use crate::error::{ScanError, ScanResult};
use crate::export::ExportTrigger;
use crate::messages;
use crate::processing::Downscaler;
use crate::session::{SessionProvider, SessionState};
use crate::transport::ScanTransport;
use crate::upload::{UploadOutcome, UploadPipeline, UploadSnapshot};

pub struct ScanStation {
    registry: Arc<HandleRegistry>,
    media: MediaAcquisition,
    frames: FrameCapture,
    sessions: Arc<dyn SessionProvider>,
    pipeline: Arc<UploadPipeline>,
    export: ExportTrigger,
    download_dir: PathBuf,
    bootstrap: Option<JoinHandle<()>>,
}

impl ScanStation {
    pub fn new(
        config: &ClientConfig,
        devices: Arc<dyn MediaDevices>,
        transport: Arc<dyn ScanTransport>,
        sessions: Arc<dyn SessionProvider>,
    ) -> Self {
        let registry = Arc::new(HandleRegistry::new());
        let pipeline = UploadPipeline::new(
            Arc::clone(&transport),
            Arc::clone(&sessions),
            Downscaler::new(Arc::clone(&registry)),
            config.upload_settings(),
        );
        Self {
            media: MediaAcquisition::new(devices),
            frames: FrameCapture::new(Arc::clone(&registry), config.fallback_size(), config.capture_quality),
            export: ExportTrigger::new(transport, Arc::clone(&sessions)),
            pipeline: Arc::new(pipeline),
            download_dir: config.download_dir.clone(),
            registry,
            sessions,
            bootstrap: None,
        }
    }

    /// Start the camera and kick off the session bootstrap in the
    /// background. A camera failure becomes the visible result and is
    /// not returned.
    pub async fn init(&mut self) {
        if self.start_camera().await.is_err() {
            debug!("Station running without a camera");
        }
        if self.bootstrap.as_ref().is_none_or(|task| task.is_finished()) {
            let sessions = Arc::clone(&self.sessions);
            self.bootstrap = Some(tokio::spawn(async move {
                if let Err(err) = sessions.ensure_session().await {
                    debug!("Background session bootstrap ended with: {err}");
                }
            }));
        }
    }

    pub async fn start_camera(&mut self) -> ScanResult<()> {
        let started = self.media.start_camera().await;
        if started.is_err() {
            self.pipeline.report(messages::CAMERA_UNAVAILABLE);
        }
        started
    }

    pub fn stop_camera(&mut self) {
        self.media.stop_camera();
    }

    pub fn camera_active(&self) -> bool {
        self.media.is_active()
    }

    /// Snapshot the live camera into a new current capture.
    pub async fn capture(&mut self) -> ScanResult<CapturedImage> {
        let stream = self
            .media
            .stream_mut()
            .ok_or_else(|| ScanError::camera("camera is not started"))?;
        let image = self.frames.capture(stream).await?;
        Ok(image.clone())
    }

    pub fn current_capture(&self) -> Option<&CapturedImage> {
        self.frames.current()
    }

    /// Upload the current capture.
    ///
    /// The returned future owns its payload, so the station can capture
    /// again while it is in flight; the new capture does not affect it.
    pub fn upload(&self) -> impl Future<Output = ScanResult<UploadOutcome>> + Send + 'static {
        let pipeline = Arc::clone(&self.pipeline);
        let image = self.frames.current().cloned();
        async move { pipeline.upload(image.as_ref()).await }
    }

    pub async fn download_export(&self) -> ScanResult<Option<PathBuf>> {
        self.export.download_export(&self.download_dir).await
    }

    /// Wait for the background bootstrap started by [`init`](Self::init),
    /// then report the session state.
    pub async fn session_ready(&mut self) -> SessionState {
        if let Some(task) = self.bootstrap.take() {
            if let Err(err) = task.await {
                debug!("Session bootstrap task ended abnormally: {err}");
            }
        }
        self.sessions.current()
    }

    pub fn session(&self) -> SessionState {
        self.sessions.current()
    }

    pub fn result(&self) -> Option<String> {
        self.pipeline.snapshot().result
    }

    pub fn progress(&self) -> u8 {
        self.pipeline.snapshot().progress
    }

    pub fn uploading(&self) -> bool {
        self.pipeline.snapshot().uploading
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadSnapshot> {
        self.pipeline.subscribe()
    }

    pub fn registry(&self) -> &Arc<HandleRegistry> {
        &self.registry
    }

    /// Stop the camera and revoke the preview handle. Idempotent.
    pub fn teardown(&mut self) {
        self.media.stop_camera();
        if self.frames.current().is_some() {
            self.frames.clear();
            info!("Station torn down");
        }
    }
}

impl Drop for ScanStation {
    fn drop(&mut self) {
        self.teardown();
    }
}
