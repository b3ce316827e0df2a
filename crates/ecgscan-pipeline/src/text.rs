//! Text suppression: mask out lead labels and calibration text.
//!
//! Two detectors are OR-combined into a single binary mask:
//!
//! - a **margin heuristic** that unconditionally marks the left band
//!   (lead labels) and bottom band (scale/patient text) of the image;
//! - a **connected-component heuristic** that isolates small, compact
//!   bright blobs — text glyphs are small relative to the continuous
//!   trace strokes.
//!
//! The component detector is best-effort: when its statistics are
//! degenerate it is dropped with a warning and the margin mask alone is
//! used. It never aborts the pipeline.
//!
//! The combined mask is dilated once with a 3×3 kernel to cover
//! anti-aliased glyph edges, then applied by zeroing masked pixels.

use image::{GrayImage, Luma};
use imageproc::contrast::{ThresholdType, threshold};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;
use imageproc::region_labelling::{Connectivity, connected_components};

use crate::types::{PipelineConfig, PipelineWarning};

/// Fraction of the median component area below which a component can be
/// classified as text.
const SMALL_COMPONENT_FRACTION: f64 = 0.1;

/// Bounding-box divisors: a text glyph is at most `width / 12` wide and
/// `height / 15` tall.
const MAX_TEXT_WIDTH_DIVISOR: u32 = 12;
const MAX_TEXT_HEIGHT_DIVISOR: u32 = 15;

/// Mask the margins where ECG annotations are conventionally printed.
///
/// Marks a left vertical band (`left_fraction` of the width) and a
/// bottom horizontal band (`bottom_fraction` of the height) regardless
/// of content.
#[must_use = "returns the margin mask"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn margin_mask(image: &GrayImage, left_fraction: f64, bottom_fraction: f64) -> GrayImage {
    let (width, height) = image.dimensions();
    let left_band = (f64::from(width) * left_fraction) as u32;
    let bottom_band = (f64::from(height) * bottom_fraction) as u32;

    GrayImage::from_fn(width, height, |x, y| {
        if x < left_band || y >= height.saturating_sub(bottom_band) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// The component detector could not produce meaningful statistics.
#[derive(Debug, thiserror::Error)]
pub enum TextAnalysisError {
    /// The image has no pixels to analyze.
    #[error("image has no pixels")]
    EmptyImage,
}

/// Per-component statistics gathered from a label image.
struct ComponentStats {
    area: u64,
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
}

impl ComponentStats {
    const fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    const fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// Detect probable text glyphs via connected-component analysis.
///
/// The image is inverted and thresholded to isolate bright blobs, which
/// are labeled with 8-connectivity. A component is classified as text
/// when its area is below 10% of the median component area and its
/// bounding box is smaller than `width/12` × `height/15`.
///
/// Returns an all-zero mask when no components are found.
///
/// # Errors
///
/// Returns [`TextAnalysisError::EmptyImage`] for a zero-sized image.
#[allow(clippy::cast_possible_truncation)]
pub fn component_text_mask(
    image: &GrayImage,
    component_threshold: u8,
) -> Result<GrayImage, TextAnalysisError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(TextAnalysisError::EmptyImage);
    }

    // Text is typically dark ink; invert so glyphs become bright blobs.
    let inverted = GrayImage::from_fn(width, height, |x, y| Luma([!image.get_pixel(x, y).0[0]]));
    let blobs = threshold(&inverted, component_threshold, ThresholdType::Binary);

    let labels = connected_components(&blobs, Connectivity::Eight, Luma([0_u8]));

    // Gather per-component area and bounding box. Label 0 is background.
    let mut stats: Vec<Option<ComponentStats>> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label.0[0] as usize;
        if label == 0 {
            continue;
        }
        if stats.len() < label {
            stats.resize_with(label, || None);
        }
        match &mut stats[label - 1] {
            Some(s) => {
                s.area += 1;
                s.min_x = s.min_x.min(x);
                s.max_x = s.max_x.max(x);
                s.min_y = s.min_y.min(y);
                s.max_y = s.max_y.max(y);
            }
            slot @ None => {
                *slot = Some(ComponentStats {
                    area: 1,
                    min_x: x,
                    max_x: x,
                    min_y: y,
                    max_y: y,
                });
            }
        }
    }
    let stats: Vec<ComponentStats> = stats.into_iter().flatten().collect();

    let mut mask = GrayImage::new(width, height);
    if stats.is_empty() {
        return Ok(mask);
    }

    let small_threshold = median_area(&stats) * SMALL_COMPONENT_FRACTION;
    let max_text_width = width / MAX_TEXT_WIDTH_DIVISOR;
    let max_text_height = height / MAX_TEXT_HEIGHT_DIVISOR;

    let is_text: Vec<bool> = stats
        .iter()
        .map(|s| {
            #[allow(clippy::cast_precision_loss)]
            let small = (s.area as f64) < small_threshold;
            small && s.width() < max_text_width && s.height() < max_text_height
        })
        .collect();

    for (x, y, label) in labels.enumerate_pixels() {
        let label = label.0[0] as usize;
        if label > 0 && is_text.get(label - 1).copied().unwrap_or(false) {
            mask.put_pixel(x, y, Luma([255]));
        }
    }

    Ok(mask)
}

/// Median component area, averaging the two middle values for even
/// counts.
#[allow(clippy::cast_precision_loss)]
fn median_area(stats: &[ComponentStats]) -> f64 {
    let mut areas: Vec<u64> = stats.iter().map(|s| s.area).collect();
    areas.sort_unstable();
    let mid = areas.len() / 2;
    if areas.len() % 2 == 0 {
        (areas[mid - 1] + areas[mid]) as f64 / 2.0
    } else {
        areas[mid] as f64
    }
}

/// Build the combined text mask: margin heuristic OR component
/// heuristic, dilated once to cover glyph edges.
///
/// When the component detector fails, the margin mask alone is used and
/// the failure is surfaced as a warning. Never aborts.
#[must_use = "returns the text mask and any warning raised while building it"]
pub fn build_text_mask(
    image: &GrayImage,
    config: &PipelineConfig,
) -> (GrayImage, Option<PipelineWarning>) {
    let mut mask = margin_mask(image, config.text_left_margin, config.text_bottom_margin);

    let warning = match component_text_mask(image, config.text_component_threshold) {
        Ok(component_mask) => {
            for (x, y, pixel) in mask.enumerate_pixels_mut() {
                if component_mask.get_pixel(x, y).0[0] > 0 {
                    *pixel = Luma([255]);
                }
            }
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, "text component analysis failed, using margin mask only");
            Some(PipelineWarning::TextComponentAnalysis {
                reason: err.to_string(),
            })
        }
    };

    (dilate(&mask, Norm::LInf, 1), warning)
}

/// Zero out every pixel marked in `mask`.
#[must_use = "returns the text-suppressed image"]
pub fn suppress_text(image: &GrayImage, mask: &GrayImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if mask.get_pixel(x, y).0[0] > 0 {
            Luma([0])
        } else {
            *image.get_pixel(x, y)
        }
    })
}
