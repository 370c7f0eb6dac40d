// # Media Sources
//
// Concrete `MediaDevices` backends:
// - `SyntheticDevices`: moving gradient test pattern, no hardware needed
// - `StillImageDevices`: a picture on disk acts as the camera feed
// - `NokhwaDevices`: real webcams (feature `camera`)

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use image::RgbImage;
use image::imageops::{self, FilterType};
use log::warn;
use srscan_scale::Size;

use crate::capture::media::{MediaConstraints, MediaDevices, MediaStream};
use crate::error::{ScanError, ScanResult};

fn check_constraints(constraints: MediaConstraints) -> ScanResult<()> {
    if !constraints.video {
        return Err(ScanError::camera("no video track requested"));
    }
    if constraints.audio {
        return Err(ScanError::camera("audio capture is not supported"));
    }
    Ok(())
}

/// Join a camera worker thread. Inside a tokio runtime the join moves to
/// the blocking pool so an executor thread never waits on the device.
#[cfg_attr(not(feature = "camera"), allow(dead_code))]
fn reap_worker(worker: std::thread::JoinHandle<()>) {
    let join = move || {
        if worker.join().is_err() {
            warn!("camera worker panicked");
        }
    };
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => drop(runtime.spawn_blocking(join)),
        Err(_) => join(),
    }
}

/// Draw `frame` into a raster of `size`, rescaling if needed.
fn fit_frame(frame: &RgbImage, size: Size) -> RgbImage {
    if frame.dimensions() == (size.w, size.h) {
        frame.clone()
    } else {
        imageops::resize(frame, size.w, size.h, FilterType::Triangle)
    }
}

/// Counters shared between a synthetic device and its streams.
#[derive(Debug, Default)]
pub struct SyntheticStats {
    opened: AtomicUsize,
    stopped: AtomicUsize,
    snapshots: AtomicUsize,
}

impl SyntheticStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Streams opened and not yet stopped.
    pub fn live(&self) -> usize {
        self.opened() - self.stopped()
    }

    pub fn snapshots(&self) -> usize {
        self.snapshots.load(Ordering::SeqCst)
    }
}

/// Test-pattern camera.
pub struct SyntheticDevices {
    native: Size,
    denied: Option<String>,
    reports_size: bool,
    stats: Arc<SyntheticStats>,
}

impl SyntheticDevices {
    pub fn new(native: Size) -> Self {
        Self {
            native,
            denied: None,
            reports_size: true,
            stats: Arc::new(SyntheticStats::default()),
        }
    }

    /// Refuse every request with `reason`.
    pub fn deny(mut self, reason: impl Into<String>) -> Self {
        self.denied = Some(reason.into());
        self
    }

    /// Streams never report a frame size, like a surface that has not
    /// decoded its first frame yet.
    pub fn without_dimensions(mut self) -> Self {
        self.reports_size = false;
        self
    }

    pub fn stats(&self) -> Arc<SyntheticStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl MediaDevices for SyntheticDevices {
    async fn get_user_media(&self, constraints: MediaConstraints) -> ScanResult<Box<dyn MediaStream>> {
        check_constraints(constraints)?;
        if let Some(reason) = &self.denied {
            return Err(ScanError::camera(reason.clone()));
        }
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticStream {
            native: self.native,
            reports_size: self.reports_size,
            playing: false,
            live: true,
            frame: 0,
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct SyntheticStream {
    native: Size,
    reports_size: bool,
    playing: bool,
    live: bool,
    frame: u32,
    stats: Arc<SyntheticStats>,
}

#[async_trait]
impl MediaStream for SyntheticStream {
    async fn play(&mut self) -> ScanResult<()> {
        self.playing = true;
        Ok(())
    }

    fn video_size(&self) -> Option<Size> {
        (self.live && self.playing && self.reports_size).then_some(self.native)
    }

    async fn snapshot(&mut self, size: Size) -> ScanResult<RgbImage> {
        if !self.live {
            return Err(ScanError::frame_capture("stream stopped"));
        }
        self.frame = self.frame.wrapping_add(1);
        self.stats.snapshots.fetch_add(1, Ordering::SeqCst);
        let shift = self.frame;
        let w = size.w.max(1);
        // Gradient pattern that drifts one step per frame
        Ok(RgbImage::from_fn(size.w, size.h, |x, y| {
            let r = (x.wrapping_add(shift) % w * 255 / w) as u8;
            let g = (y * 255 / size.h.max(1)) as u8;
            image::Rgb([r, g, 128])
        }))
    }

    fn live_tracks(&self) -> usize {
        usize::from(self.live)
    }

    fn stop_tracks(&mut self) {
        if self.live {
            self.live = false;
            self.stats.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Serves a still picture from disk as the camera feed.
pub struct StillImageDevices {
    path: PathBuf,
}

impl StillImageDevices {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MediaDevices for StillImageDevices {
    async fn get_user_media(&self, constraints: MediaConstraints) -> ScanResult<Box<dyn MediaStream>> {
        check_constraints(constraints)?;
        let path = self.path.clone();
        let frame = tokio::task::spawn_blocking(move || {
            let bytes = std::fs::read(&path)
                .map_err(|e| ScanError::camera(format!("{}: {e}", path.display())))?;
            srscan_scale::decode_rgb(&bytes)
                .map_err(|e| ScanError::camera(format!("{}: {e}", path.display())))
        })
        .await
        .map_err(|e| ScanError::task("open still image", e))??;
        Ok(Box::new(StillImageStream { frame, live: true }))
    }
}

struct StillImageStream {
    frame: RgbImage,
    live: bool,
}

#[async_trait]
impl MediaStream for StillImageStream {
    async fn play(&mut self) -> ScanResult<()> {
        Ok(())
    }

    fn video_size(&self) -> Option<Size> {
        self.live.then(|| Size {
            w: self.frame.width(),
            h: self.frame.height(),
        })
    }

    async fn snapshot(&mut self, size: Size) -> ScanResult<RgbImage> {
        if !self.live {
            return Err(ScanError::frame_capture("stream stopped"));
        }
        Ok(fit_frame(&self.frame, size))
    }

    fn live_tracks(&self) -> usize {
        usize::from(self.live)
    }

    fn stop_tracks(&mut self) {
        self.live = false;
    }
}

#[cfg(feature = "camera")]
pub use self::webcam::NokhwaDevices;

#[cfg(feature = "camera")]
mod webcam {
    //! nokhwa cameras are not `Send`, so each stream owns a worker thread
    //! that opens the device, serves snapshot requests and stops the
    //! stream when told to (or when the request channel closes).

    use std::sync::mpsc;
    use std::thread;

    use log::{debug, warn};
    use nokhwa::Camera;
    use nokhwa::pixel_format::RgbFormat;
    use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
    use tokio::sync::oneshot;

    use super::*;

    enum Command {
        Snapshot(oneshot::Sender<ScanResult<RgbImage>>),
        Stop,
    }

    /// Webcam backend selecting a device by index.
    pub struct NokhwaDevices {
        index: u32,
    }

    impl NokhwaDevices {
        pub fn new(index: u32) -> Self {
            Self { index }
        }
    }

    #[async_trait]
    impl MediaDevices for NokhwaDevices {
        async fn get_user_media(&self, constraints: MediaConstraints) -> ScanResult<Box<dyn MediaStream>> {
            check_constraints(constraints)?;
            let (tx, rx) = mpsc::channel::<Command>();
            let (ready_tx, ready_rx) = oneshot::channel::<ScanResult<Size>>();
            let index = self.index;

            let worker = thread::Builder::new()
                .name(format!("camera-{index}"))
                .spawn(move || run_camera(index, rx, ready_tx))
                .map_err(|e| ScanError::camera(format!("spawn camera worker: {e}")))?;

            let native = ready_rx
                .await
                .map_err(|_| ScanError::camera("camera worker exited during open"))??;

            Ok(Box::new(NokhwaStream {
                commands: Some(tx),
                worker: Some(worker),
                native,
            }))
        }
    }

    fn run_camera(index: u32, rx: mpsc::Receiver<Command>, ready: oneshot::Sender<ScanResult<Size>>) {
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);
        let opened = Camera::new(CameraIndex::Index(index), requested).and_then(|mut cam| {
            cam.open_stream()?;
            Ok(cam)
        });
        let mut cam = match opened {
            Ok(cam) => cam,
            Err(e) => {
                let _ = ready.send(Err(ScanError::camera(format!("open camera {index}: {e}"))));
                return;
            }
        };
        let res = cam.resolution();
        let _ = ready.send(Ok(Size {
            w: res.width(),
            h: res.height(),
        }));

        while let Ok(Command::Snapshot(reply)) = rx.recv() {
            let frame = cam
                .frame()
                .and_then(|buf| buf.decode_image::<RgbFormat>())
                .map_err(|e| ScanError::frame_capture(format!("camera {index}: {e}")))
                .and_then(|decoded| {
                    let (w, h) = decoded.dimensions();
                    RgbImage::from_raw(w, h, decoded.into_raw())
                        .ok_or_else(|| ScanError::frame_capture("short frame buffer"))
                });
            let _ = reply.send(frame);
        }

        if let Err(e) = cam.stop_stream() {
            warn!("camera {index}: stop_stream failed: {e}");
        }
        debug!("camera {index} worker exiting");
    }

    struct NokhwaStream {
        commands: Option<mpsc::Sender<Command>>,
        worker: Option<thread::JoinHandle<()>>,
        native: Size,
    }

    #[async_trait]
    impl MediaStream for NokhwaStream {
        async fn play(&mut self) -> ScanResult<()> {
            Ok(())
        }

        fn video_size(&self) -> Option<Size> {
            self.commands.as_ref().map(|_| self.native)
        }

        async fn snapshot(&mut self, size: Size) -> ScanResult<RgbImage> {
            let commands = self
                .commands
                .as_ref()
                .ok_or_else(|| ScanError::frame_capture("stream stopped"))?;
            let (tx, rx) = oneshot::channel();
            commands
                .send(Command::Snapshot(tx))
                .map_err(|_| ScanError::frame_capture("camera worker gone"))?;
            let frame = rx
                .await
                .map_err(|_| ScanError::frame_capture("camera worker gone"))??;
            Ok(fit_frame(&frame, size))
        }

        fn live_tracks(&self) -> usize {
            usize::from(self.commands.is_some())
        }

        fn stop_tracks(&mut self) {
            if let Some(commands) = self.commands.take() {
                let _ = commands.send(Command::Stop);
            }
            if let Some(worker) = self.worker.take() {
                reap_worker(worker);
            }
        }
    }

    impl Drop for NokhwaStream {
        fn drop(&mut self) {
            self.stop_tracks();
        }
    }
}
