// SPDX-License-Identifier: MIT
//! # srscan-scale: bandwidth-bounded image downscaling
//!
//! Turns a high-fidelity camera capture into a JPEG small enough to upload
//! quickly, independent of the camera's native resolution.
//!
//! ## Key Components
//!
//! - [`presets`]: width-bounded scaling plan (never upscales)
//! - [`cpu`]: RGB8 scaling on the CPU via fast_image_resize
//! - [`codec`]: JPEG/PNG decode and quality-controlled JPEG encode
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use srscan_scale::downscale_jpeg;
//!
//! # fn example(capture: &[u8]) -> Result<(), srscan_scale::ScaleError> {
//! let resized = downscale_jpeg(capture, 1000, 0.7)?;
//! assert!(resized.width <= 1000);
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod cpu;
pub mod presets;

pub use codec::{EncodedImage, decode_rgb, encode_jpeg, jpeg_quality};
pub use cpu::{ScaleError, scale_rgb_cpu};
pub use presets::{ScalePlan, Size, build_plan};

/// Decode `src`, shrink it to at most `max_width` pixels wide and re-encode
/// it as JPEG at `quality` (0.0, 1.0].
///
/// Images already narrower than `max_width` keep their dimensions and are
/// only re-encoded.
pub fn downscale_jpeg(src: &[u8], max_width: u32, quality: f32) -> Result<EncodedImage, ScaleError> {
    // Reject bad quality before paying for the decode.
    let q = jpeg_quality(quality)?;
    let rgb = decode_rgb(src)?;
    let input = Size { w: rgb.width(), h: rgb.height() };
    let plan = build_plan(input, max_width);

    if plan.is_identity() {
        return codec::encode_rgb_jpeg(rgb.as_raw(), input, q);
    }

    let mut resizer = fast_image_resize::Resizer::new();
    let mut dst = vec![0u8; plan.out.w as usize * plan.out.h as usize * 3];
    scale_rgb_cpu(&mut resizer, rgb.as_raw(), input, &plan, &mut dst)?;
    codec::encode_rgb_jpeg(&dst, plan.out, q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png_of(w: u32, h: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(w, h, |x, y| image::Rgb([(x % 255) as u8, (y % 255) as u8, 90]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn wide_capture_is_bounded_to_max_width() {
        let out = downscale_jpeg(&png_of(2000, 1500), 1000, 0.7).unwrap();
        assert_eq!((out.width, out.height), (1000, 750));
        let back = decode_rgb(&out.bytes).unwrap();
        assert_eq!(back.dimensions(), (1000, 750));
    }

    #[test]
    fn narrow_capture_is_not_upscaled() {
        let out = downscale_jpeg(&png_of(640, 480), 1000, 0.7).unwrap();
        assert_eq!((out.width, out.height), (640, 480));
    }

    #[test]
    fn garbage_input_fails_to_decode() {
        let err = downscale_jpeg(b"not an image", 1000, 0.7).unwrap_err();
        assert!(matches!(err, ScaleError::Decode(_)));
    }

    #[test]
    fn out_of_range_quality_is_rejected() {
        let err = downscale_jpeg(&png_of(8, 8), 1000, 0.0).unwrap_err();
        assert!(matches!(err, ScaleError::Quality(_)));
    }
}
