//! Isolated-pixel cleaning: pixel-level denoise after cropping.
//!
//! A foreground pixel that has too few foreground neighbors is noise
//! left over from grid and text suppression. Removing it here keeps the
//! segmenter's per-column signal points from chasing speckle.
//!
//! The pass reads neighbor counts from the pre-cleaning image, so
//! removals never cascade within a single pass.

use image::{GrayImage, Luma};

use crate::types::NeighborConnectivity;

/// Remove foreground pixels with fewer than `min_neighbors` foreground
/// neighbors under the given connectivity.
///
/// A single full-image pass against the input image; with
/// `min_neighbors = 1` the operation is idempotent (a second pass
/// removes nothing).
#[must_use = "returns the cleaned image"]
pub fn remove_isolated_pixels(
    image: &GrayImage,
    connectivity: NeighborConnectivity,
    min_neighbors: u32,
) -> GrayImage {
    let (width, height) = (i64::from(image.width()), i64::from(image.height()));
    let offsets = connectivity.offsets();

    let mut cleaned = image.clone();
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel.0[0] != 255 {
            continue;
        }

        let mut neighbors = 0_u32;
        for &(dx, dy) in offsets {
            let (nx, ny) = (i64::from(x) + dx, i64::from(y) + dy);
            if nx < 0 || ny < 0 || nx >= width || ny >= height {
                continue;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            if image.get_pixel(nx as u32, ny as u32).0[0] == 255 {
                neighbors += 1;
            }
        }

        if neighbors < min_neighbors {
            cleaned.put_pixel(x, y, Luma([0]));
        }
    }

    cleaned
}
