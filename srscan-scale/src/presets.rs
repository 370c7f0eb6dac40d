// SPDX-License-Identifier: MIT
//! # Scaling Plan Computation
//!
//! Uploads are bounded by width only: a capture wider than the limit is
//! scaled uniformly so its width equals the limit, anything else is left
//! at its native size.
//!
//! - Floating-point scale, both sides rounded to the nearest pixel
//! - No upscaling
//! - Clamp to minimum 1px so extreme aspect ratios never produce an empty side

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

/// Scaling plan computed from the input size and width limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalePlan {
    /// Original input dimensions
    pub input: Size,
    /// Width limit used for planning
    pub max_width: u32,
    /// Final computed output dimensions
    pub out: Size,
}

impl ScalePlan {
    /// True when the output keeps the input dimensions.
    pub fn is_identity(&self) -> bool {
        self.input == self.out
    }
}

/// Compute the plan for bounding `input` to `max_width`.
///
/// # Performance
/// O(1)
pub fn build_plan(input: Size, max_width: u32) -> ScalePlan {
    ScalePlan {
        input,
        max_width,
        out: fit_width(input, max_width),
    }
}

fn fit_width(input: Size, max_width: u32) -> Size {
    if input.w <= max_width {
        return input;
    }
    let s = max_width as f64 / input.w as f64;
    Size {
        w: ((input.w as f64 * s).round() as u32).max(1),
        h: ((input.h as f64 * s).round() as u32).max(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_wide_input_down_to_limit() {
        let plan = build_plan(Size { w: 4000, h: 3000 }, 1000);
        assert_eq!(plan.out, Size { w: 1000, h: 750 });
        assert!(!plan.is_identity());
    }

    #[test]
    fn leaves_input_at_or_below_limit_untouched() {
        for w in [1, 320, 999, 1000] {
            let input = Size { w, h: 77 };
            let plan = build_plan(input, 1000);
            assert_eq!(plan.out, input);
            assert!(plan.is_identity());
        }
    }

    #[test]
    fn width_never_exceeds_limit() {
        for w in (1..5000).step_by(37) {
            for max in [1, 64, 640, 1000] {
                let plan = build_plan(Size { w, h: 480 }, max);
                assert!(plan.out.w <= max);
                assert!(plan.out.w <= w);
                assert!(plan.out.h >= 1);
            }
        }
    }

    #[test]
    fn tall_thin_input_keeps_one_pixel_height() {
        let plan = build_plan(Size { w: 10_000, h: 2 }, 1000);
        assert_eq!(plan.out, Size { w: 1000, h: 1 });
    }
}
