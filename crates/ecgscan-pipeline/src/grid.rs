//! Grid suppression: erase the printed background grid.
//!
//! Paper ECG strips carry a fine periodic grid that would otherwise
//! drown the trace in downstream analysis. A small-kernel morphological
//! opening erases the thin grid lines while leaving the thicker trace
//! strokes intact; inverted Otsu thresholding then turns the result into
//! a binary image with ink as foreground.
//!
//! This stage never fails: any non-degenerate grayscale image produces
//! a deterministic binary output.

use image::GrayImage;
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use imageproc::morphology::{Mask, grayscale_open};

/// Suppress grid lines and binarize.
///
/// Applies a 3×3 grayscale opening (erosion then dilation) followed by
/// Otsu thresholding, inverted so that ink becomes white (255) on a
/// black background. Output dimensions equal input dimensions and every
/// output pixel is 0 or 255.
#[must_use = "returns the grid-suppressed binary image"]
pub fn suppress_grid(image: &GrayImage) -> GrayImage {
    // 3×3 structuring element, matching the thin grid line width.
    let opened = grayscale_open(image, &Mask::square(1));

    let level = otsu_level(&opened);
    threshold(&opened, level, ThresholdType::BinaryInverted)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Dark trace stroke on a light background crossed by faint
    /// single-pixel grid lines.
    fn gridded_strip() -> GrayImage {
        GrayImage::from_fn(60, 40, |x, y| {
            // Thick horizontal stroke rows 18..=21.
            if (18..=21).contains(&y) {
                image::Luma([20])
            } else if x % 10 == 0 || y % 10 == 0 {
                // Faint grid every 10 px.
                image::Luma([200])
            } else {
                image::Luma([245])
            }
        })
    }

    #[test]
    fn output_dimensions_equal_input() {
        let img = gridded_strip();
        let out = suppress_grid(&img);
        assert_eq!(out.dimensions(), img.dimensions());
    }

    #[test]
    fn output_is_binary() {
        let out = suppress_grid(&gridded_strip());
        for pixel in out.pixels() {
            assert!(
                pixel.0[0] == 0 || pixel.0[0] == 255,
                "non-binary pixel value {}",
                pixel.0[0],
            );
        }
    }

    #[test]
    fn trace_stroke_becomes_foreground() {
        let out = suppress_grid(&gridded_strip());
        // The dark stroke should survive as white foreground in the
        // inverted binary image, away from the opened-away grid.
        let mut stroke_hits = 0_u32;
        for x in 5..55 {
            if out.get_pixel(x, 19).0[0] == 255 {
                stroke_hits += 1;
            }
        }
        assert!(
            stroke_hits > 30,
            "expected the trace stroke to survive grid suppression, got {stroke_hits} hits",
        );
    }

    #[test]
    fn thin_grid_lines_are_removed() {
        let out = suppress_grid(&gridded_strip());
        // A grid-only pixel far from the stroke should be background.
        assert_eq!(out.get_pixel(30, 10).0[0], 0);
        assert_eq!(out.get_pixel(10, 30).0[0], 0);
    }
}
