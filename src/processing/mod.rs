//! # Processing Module
//!
//! Bandwidth-bounding of captures before upload.

pub mod downscale;

pub use downscale::{DEFAULT_MAX_WIDTH, DEFAULT_QUALITY, Downscaler, ResizedImage};
