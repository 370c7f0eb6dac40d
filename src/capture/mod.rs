// # Capture Module
//
// Camera acquisition and single-frame capture. Device backends plug in
// through the `MediaDevices` / `MediaStream` traits in `media`.

pub mod frame;
pub mod media;
pub mod sources;

pub use frame::{CapturedImage, FrameCapture};
pub use media::{MediaAcquisition, MediaConstraints, MediaDevices, MediaStream};
