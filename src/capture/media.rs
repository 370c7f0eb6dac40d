//! # Media Acquisition
//!
//! Exclusive, scoped ownership of a live camera stream.
//!
//! ## Architecture
//!
//! 1. **MediaDevices**: asks a backend for a video-only stream
//! 2. **MediaStream**: a running stream; reports its frame size and draws
//!    the current frame into a raster on demand
//! 3. **MediaAcquisition**: holds at most one stream and guarantees its
//!    tracks are stopped on `stop_camera()` or drop
//!
//! A stream must never outlive its owner: the hardware stays busy (and the
//! indicator LED stays lit) until every track is stopped.

use std::sync::Arc;

use async_trait::async_trait;
use image::RgbImage;
use log::{error, info};
use srscan_scale::Size;

use crate::error::ScanResult;

/// What to ask the device layer for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
}

impl MediaConstraints {
    /// Camera only, no microphone.
    pub const fn video_only() -> Self {
        Self {
            video: true,
            audio: false,
        }
    }
}

/// Backend able to grant access to a video input device.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Request a stream. Fails when access is denied or no device exists.
    async fn get_user_media(&self, constraints: MediaConstraints) -> ScanResult<Box<dyn MediaStream>>;
}

/// A live stream bound to a video input device.
#[async_trait]
pub trait MediaStream: Send {
    /// Begin delivering frames to the video surface.
    async fn play(&mut self) -> ScanResult<()>;

    /// Intrinsic size of the current frame, `None` until the stream has
    /// produced one.
    fn video_size(&self) -> Option<Size>;

    /// Draw the current frame into a raster of exactly `size`.
    async fn snapshot(&mut self, size: Size) -> ScanResult<RgbImage>;

    /// Number of tracks that are still running.
    fn live_tracks(&self) -> usize;

    /// Stop every track. Calling it on a stopped stream does nothing.
    fn stop_tracks(&mut self);
}

/// Owns the camera stream for one station.
pub struct MediaAcquisition {
    devices: Arc<dyn MediaDevices>,
    stream: Option<Box<dyn MediaStream>>,
}

impl MediaAcquisition {
    pub fn new(devices: Arc<dyn MediaDevices>) -> Self {
        Self { devices, stream: None }
    }

    /// Acquire the camera and start playback.
    ///
    /// A stream that is already held is stopped first so it cannot leak.
    /// On failure the cause is logged and returned; the caller decides what
    /// to show.
    pub async fn start_camera(&mut self) -> ScanResult<()> {
        self.stop_camera();

        let devices = Arc::clone(&self.devices);
        let acquired = async move {
            let mut stream = devices.get_user_media(MediaConstraints::video_only()).await?;
            if let Err(err) = stream.play().await {
                stream.stop_tracks();
                return Err(err);
            }
            Ok(stream)
        }
        .await;

        match acquired {
            Ok(stream) => {
                info!(
                    "Camera started ({} track(s), size {:?})",
                    stream.live_tracks(),
                    stream.video_size()
                );
                self.stream = Some(stream);
                Ok(())
            }
            Err(err) => {
                error!("Camera error: {err}");
                Err(err)
            }
        }
    }

    /// Stop every track and drop the stream. Safe to call at any time.
    pub fn stop_camera(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop_tracks();
            info!("Camera stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.stream.as_ref().is_some_and(|s| s.live_tracks() > 0)
    }

    /// The live stream, if any.
    pub fn stream_mut(&mut self) -> Option<&mut (dyn MediaStream + 'static)> {
        self.stream.as_deref_mut()
    }
}

impl Drop for MediaAcquisition {
    fn drop(&mut self) {
        self.stop_camera();
    }
}
