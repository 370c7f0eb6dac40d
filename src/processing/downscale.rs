//! # Image Downscaler
//!
//! Async front for [`srscan_scale::downscale_jpeg`]: the decode, resize
//! and encode run on the blocking pool while the source buffer is pinned
//! behind a scoped handle that is revoked however the call ends.

use std::sync::Arc;

use log::debug;
use srscan_scale::Size;

use crate::core::HandleRegistry;
use crate::error::{ScanError, ScanResult};

/// Width bound applied when none is configured.
pub const DEFAULT_MAX_WIDTH: u32 = 1000;
/// JPEG quality applied when none is configured.
pub const DEFAULT_QUALITY: f32 = 0.7;

/// Upload-ready JPEG.
#[derive(Debug, Clone)]
pub struct ResizedImage {
    pub bytes: Vec<u8>,
    pub size: Size,
}

/// Shrinks captures to a bounded width and quality.
#[derive(Clone)]
pub struct Downscaler {
    registry: Arc<HandleRegistry>,
}

impl Downscaler {
    pub fn new(registry: Arc<HandleRegistry>) -> Self {
        Self { registry }
    }

    /// Re-encode `image` so its width is at most `max_width`.
    ///
    /// Never upscales. Fails if the buffer cannot be decoded or the target
    /// JPEG cannot be produced.
    pub async fn resize(&self, image: &Arc<Vec<u8>>, max_width: u32, quality: f32) -> ScanResult<ResizedImage> {
        let _source = self.registry.scoped(Arc::clone(image), "image/jpeg");
        let input = Arc::clone(image);

        let encoded = tokio::task::spawn_blocking(move || srscan_scale::downscale_jpeg(&input, max_width, quality))
            .await
            .map_err(|e| ScanError::task("resize", e))?
            .map_err(|e| ScanError::processing("resize", e))?;

        debug!(
            "Resized to {}x{} ({} → {} bytes)",
            encoded.width,
            encoded.height,
            image.len(),
            encoded.bytes.len()
        );
        Ok(ResizedImage {
            bytes: encoded.bytes,
            size: Size {
                w: encoded.width,
                h: encoded.height,
            },
        })
    }
}
