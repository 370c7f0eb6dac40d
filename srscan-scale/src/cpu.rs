// SPDX-License-Identifier: MIT
// CPU scaler built on fast_image_resize (SIMD-accelerated).
// RGB8 in → RGB8 out, direct write into caller-provided dst buffer.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x3;
use fir::{ResizeOptions, Resizer};

use crate::presets::{ScalePlan, Size};

#[derive(Debug, thiserror::Error)]
pub enum ScaleError {
    #[error("Output buffer too small")]
    BufferTooSmall,
    #[error("Image decode failed: {0}")]
    Decode(#[source] image::ImageError),
    #[error("JPEG encode failed: {0}")]
    Encode(#[source] image::ImageError),
    #[error("Empty image ({0}x{1}) cannot be encoded")]
    Empty(u32, u32),
    #[error("Quality {0} outside (0.0, 1.0]")]
    Quality(f32),
    #[error("Fast image resize error: {0}")]
    Fir(#[from] fir::ResizeError),
    #[error("Image buffer error: {0}")]
    ImageBuf(#[from] fir::ImageBufferError),
}

/// Main scaling entry point.
/// `src_rgb` must be tightly packed (`src.w * 3` bytes per row).
/// `dst` must be at least `plan.out.w * plan.out.h * 3` bytes (RGB).
pub fn scale_rgb_cpu(
    resizer: &mut Resizer,
    src_rgb: &[u8],
    src: Size,
    plan: &ScalePlan,
    dst: &mut [u8],
) -> Result<(), ScaleError> {
    let dst_len = (plan.out.w as usize) * (plan.out.h as usize) * 3;
    if dst.len() < dst_len {
        return Err(ScaleError::BufferTooSmall);
    }

    let src_view = TypedImageRef::<U8x3>::from_buffer(src.w, src.h, src_rgb)?;
    let mut dst_image = TypedImage::<U8x3>::from_buffer(plan.out.w, plan.out.h, &mut dst[..dst_len])?;

    // Default filter is Convolution(Lanczos3).
    let opts = ResizeOptions::new();
    resizer.resize_typed::<U8x3>(&src_view, &mut dst_image, &opts)?;

    Ok(())
}
