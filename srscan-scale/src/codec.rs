// SPDX-License-Identifier: MIT
//! Decode arbitrary captures to RGB8 and encode RGB8 rasters as JPEG.

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, RgbImage};

use crate::cpu::ScaleError;
use crate::presets::Size;

/// A compressed JPEG buffer together with its pixel dimensions.
#[derive(Clone, Debug)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Map a browser-style quality in (0.0, 1.0] onto libjpeg's 1..=100 scale.
pub fn jpeg_quality(quality: f32) -> Result<u8, ScaleError> {
    if !(quality > 0.0 && quality <= 1.0) {
        return Err(ScaleError::Quality(quality));
    }
    Ok((quality * 100.0).round().clamp(1.0, 100.0) as u8)
}

/// Decode any supported container (JPEG, PNG) into a packed RGB8 raster.
pub fn decode_rgb(src: &[u8]) -> Result<RgbImage, ScaleError> {
    let decoded = image::load_from_memory(src).map_err(ScaleError::Decode)?;
    Ok(decoded.to_rgb8())
}

/// Encode an RGB8 image as JPEG at `quality` (0.0, 1.0].
pub fn encode_jpeg(img: &RgbImage, quality: f32) -> Result<EncodedImage, ScaleError> {
    let q = jpeg_quality(quality)?;
    encode_rgb_jpeg(img.as_raw(), Size { w: img.width(), h: img.height() }, q)
}

pub(crate) fn encode_rgb_jpeg(rgb: &[u8], size: Size, q: u8) -> Result<EncodedImage, ScaleError> {
    if size.w == 0 || size.h == 0 {
        return Err(ScaleError::Empty(size.w, size.h));
    }
    let mut bytes = Vec::with_capacity(rgb.len() / 8);
    JpegEncoder::new_with_quality(&mut bytes, q)
        .encode(rgb, size.w, size.h, ExtendedColorType::Rgb8)
        .map_err(ScaleError::Encode)?;
    Ok(EncodedImage {
        bytes,
        width: size.w,
        height: size.h,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_maps_to_percent() {
        assert_eq!(jpeg_quality(0.9).unwrap(), 90);
        assert_eq!(jpeg_quality(0.7).unwrap(), 70);
        assert_eq!(jpeg_quality(1.0).unwrap(), 100);
        assert_eq!(jpeg_quality(0.001).unwrap(), 1);
        assert!(jpeg_quality(1.5).is_err());
        assert!(jpeg_quality(f32::NAN).is_err());
    }

    #[test]
    fn encoded_jpeg_decodes_back_to_same_size() {
        let img = RgbImage::from_pixel(64, 48, image::Rgb([12, 200, 34]));
        let out = encode_jpeg(&img, 0.9).unwrap();
        assert_eq!(&out.bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(decode_rgb(&out.bytes).unwrap().dimensions(), (64, 48));
    }

    #[test]
    fn empty_raster_cannot_be_encoded() {
        let img = RgbImage::new(0, 0);
        assert!(matches!(encode_jpeg(&img, 0.9), Err(ScaleError::Empty(0, 0))));
    }
}
