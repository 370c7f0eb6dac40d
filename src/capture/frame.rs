//! # Frame Capture
//!
//! Snapshots the live stream into a high-fidelity JPEG (the master
//! capture) and publishes it through a revocable preview handle.
//!
//! Exactly one capture is current at a time. Installing a new one revokes
//! the previous preview handle first, so N sequential captures leave one
//! live handle behind, never N.

use std::sync::Arc;

use log::debug;
use srscan_scale::{Size, encode_jpeg};

use crate::capture::media::MediaStream;
use crate::core::{HandleRegistry, ObjectHandle};
use crate::error::{ScanError, ScanResult};

/// Immutable JPEG buffer plus its on-screen preview handle.
///
/// Cloning is cheap; an upload keeps its own clone, so replacing the
/// current capture never disturbs a request already in flight.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    bytes: Arc<Vec<u8>>,
    size: Size,
    preview: ObjectHandle,
}

impl CapturedImage {
    pub fn bytes(&self) -> &Arc<Vec<u8>> {
        &self.bytes
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn preview(&self) -> &ObjectHandle {
        &self.preview
    }
}

/// Produces and owns the current [`CapturedImage`].
pub struct FrameCapture {
    registry: Arc<HandleRegistry>,
    fallback: Size,
    quality: f32,
    current: Option<CapturedImage>,
}

impl FrameCapture {
    pub fn new(registry: Arc<HandleRegistry>, fallback: Size, quality: f32) -> Self {
        Self {
            registry,
            fallback,
            quality,
            current: None,
        }
    }

    /// Capture the stream's current frame and make it the current image.
    ///
    /// The raster size follows the stream's frame size, or the fallback
    /// when the stream has not produced a frame yet. On error the previous
    /// capture stays current.
    pub async fn capture(&mut self, stream: &mut dyn MediaStream) -> ScanResult<&CapturedImage> {
        let size = stream
            .video_size()
            .filter(|s| s.w > 0 && s.h > 0)
            .unwrap_or(self.fallback);
        let raster = stream.snapshot(size).await?;

        let quality = self.quality;
        let encoded = tokio::task::spawn_blocking(move || encode_jpeg(&raster, quality))
            .await
            .map_err(|e| ScanError::task("capture encode", e))?
            .map_err(|e| ScanError::frame_capture(format!("encode failed: {e}")))?;

        let bytes = Arc::new(encoded.bytes);
        self.clear();
        let preview = self.registry.create(Arc::clone(&bytes), "image/jpeg");
        debug!("Captured {}x{} ({} bytes) as {preview}", size.w, size.h, bytes.len());

        Ok(self.current.insert(CapturedImage { bytes, size, preview }))
    }

    pub fn current(&self) -> Option<&CapturedImage> {
        self.current.as_ref()
    }

    /// Drop the current capture and revoke its preview handle.
    pub fn clear(&mut self) {
        if let Some(prev) = self.current.take() {
            self.registry.revoke(&prev.preview);
        }
    }
}
