//! Frame removal: detect the printed border and crop to its interior.
//!
//! Scanned strips often carry a rectangular frame around the trace
//! area. Detection runs Canny edge detection, dilates the edge map,
//! takes the largest external contour, reduces it to a simplified
//! closed polygon, and accepts its axis-aligned bounding rectangle only
//! when it is plausibly a frame (above a minimum area, and neither
//! degenerate nor spanning a full image dimension).
//!
//! Detection failure is never fatal: the stage degrades to a symmetric
//! percentage margin crop, which always succeeds. The outcome is
//! returned as a tagged [`FrameOutcome`] rather than an error crossing
//! the stage boundary.

use image::GrayImage;
use image::imageops::crop_imm;
use imageproc::contours::{BorderType, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::morphology::dilate;
use imageproc::point::Point;

use crate::types::{FrameFallbackReason, FrameOutcome, PipelineConfig, Rect};

/// Minimum plausible frame edge length in pixels. Rectangles at or
/// below this size are artifacts, not strip borders.
const MIN_FRAME_EDGE: u32 = 20;

/// Polygon approximation epsilon as a fraction of contour perimeter.
const APPROX_EPSILON_RATIO: f64 = 0.01;

/// Hard cap on the fallback margin: at most 10% of each axis.
const FALLBACK_MARGIN_CAP_DIVISOR: u32 = 10;

/// Minimum allowed Canny threshold.
///
/// imageproc's hysteresis pass underflows on a zero low threshold
/// (imageproc#705) and asserts when `low > high`. Both configured
/// thresholds are clamped so that any pair yields an edge map.
const MIN_CANNY_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_CANNY_THRESHOLD > 0.0);

/// Detect and remove a rectangular frame, cropping to its interior.
///
/// Returns the cropped image together with the tagged outcome: either
/// the detected frame rectangle or the fallback reason. Both variants
/// carry a usable image; this stage cannot fail.
#[must_use = "returns the cropped image and the frame outcome"]
pub fn remove_frame(image: &GrayImage, config: &PipelineConfig) -> (GrayImage, FrameOutcome) {
    match detect_frame_rect(image, config) {
        Ok(rect) => {
            let cropped = crop_to_interior(image, rect, config.frame_crop_margin);
            (cropped, FrameOutcome::Detected(rect))
        }
        Err(reason) => {
            tracing::warn!(%reason, "frame detection failed, applying fallback margin crop");
            let cropped = fallback_margin_crop(image, config.fallback_crop_fraction);
            (cropped, FrameOutcome::Fallback(reason))
        }
    }
}

/// Find a plausible frame rectangle, or the reason there is none.
///
/// # Errors
///
/// Returns the [`FrameFallbackReason`] that should drive the fallback
/// crop when no plausible frame exists.
pub fn detect_frame_rect(
    image: &GrayImage,
    config: &PipelineConfig,
) -> Result<Rect, FrameFallbackReason> {
    let edges = edge_map(image, config.frame_canny_low, config.frame_canny_high);
    let dilated = dilate(&edges, Norm::LInf, 1);

    let contours = find_contours::<u32>(&dilated);
    let largest = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .map(|c| to_i64_points(&c.points))
        .max_by(|a, b| contour_area(a).total_cmp(&contour_area(b)))
        .ok_or(FrameFallbackReason::NoContour)?;

    #[allow(clippy::cast_precision_loss)]
    if contour_area(&largest) <= config.frame_min_area as f64 {
        return Err(FrameFallbackReason::ContourTooSmall);
    }

    // Reduce the contour to a simpler closed polygon before taking the
    // bounding rectangle.
    let epsilon = APPROX_EPSILON_RATIO * arc_length(&largest, true);
    let approx = approximate_polygon_dp(&largest, epsilon, true);
    let rect = bounding_rect(&approx).ok_or(FrameFallbackReason::ImplausibleRect)?;

    let plausible = rect.width > MIN_FRAME_EDGE
        && rect.width < image.width()
        && rect.height > MIN_FRAME_EDGE
        && rect.height < image.height();
    if plausible {
        Ok(rect)
    } else {
        Err(FrameFallbackReason::ImplausibleRect)
    }
}

/// Crop to the interior of `rect`, pulled inward by `margin` pixels on
/// every side to keep border ink out.
///
/// Bounds are clamped to the image extents. If the inward margin would
/// leave a non-positive width or height, the original image is returned
/// unmodified (degenerate-geometry guard).
#[must_use = "returns the cropped image"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn crop_to_interior(image: &GrayImage, rect: Rect, margin: u32) -> GrayImage {
    let (img_w, img_h) = (i64::from(image.width()), i64::from(image.height()));
    let margin = i64::from(margin);

    let x = (i64::from(rect.x) + margin).max(0);
    let y = (i64::from(rect.y) + margin).max(0);
    let w = (i64::from(rect.width) - 2 * margin).min(img_w - x);
    let h = (i64::from(rect.height) - 2 * margin).min(img_h - y);

    if w <= 0 || h <= 0 {
        return image.clone();
    }

    crop_imm(image, x as u32, y as u32, w as u32, h as u32).to_image()
}

/// Symmetric percentage margin crop: the always-safe fallback.
///
/// The margin is `fraction` of each axis, capped at 10% per axis. A
/// crop that would be empty returns the original image unmodified.
#[must_use = "returns the cropped image"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn fallback_margin_crop(image: &GrayImage, fraction: f64) -> GrayImage {
    let (width, height) = image.dimensions();

    let margin_x = ((f64::from(width) * fraction) as u32).min(width / FALLBACK_MARGIN_CAP_DIVISOR);
    let margin_y =
        ((f64::from(height) * fraction) as u32).min(height / FALLBACK_MARGIN_CAP_DIVISOR);

    let crop_w = i64::from(width) - 2 * i64::from(margin_x);
    let crop_h = i64::from(height) - 2 * i64::from(margin_y);
    if crop_w <= 0 || crop_h <= 0 {
        return image.clone();
    }

    crop_imm(image, margin_x, margin_y, crop_w as u32, crop_h as u32).to_image()
}

/// Canny edge detection with clamped hysteresis thresholds.
///
/// The high threshold is raised to at least [`MIN_CANNY_THRESHOLD`] and
/// the low threshold is raised likewise, then capped at the high one.
fn edge_map(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let high = high_threshold.max(MIN_CANNY_THRESHOLD);
    let low = low_threshold.max(MIN_CANNY_THRESHOLD).min(high);
    canny(image, low, high)
}

fn to_i64_points(points: &[Point<u32>]) -> Vec<Point<i64>> {
    points
        .iter()
        .map(|p| Point::new(i64::from(p.x), i64::from(p.y)))
        .collect()
}

/// Shoelace area of a closed contour.
#[allow(clippy::cast_precision_loss)]
fn contour_area(points: &[Point<i64>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut doubled = 0_i64;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        doubled += a.x * b.y - b.x * a.y;
    }
    (doubled.abs() as f64) / 2.0
}

/// Axis-aligned bounding rectangle of a point set.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bounding_rect(points: &[Point<i64>]) -> Option<Rect> {
    let first = points.first()?;
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    Some(Rect {
        x: min_x.max(0) as u32,
        y: min_y.max(0) as u32,
        width: (max_x - min_x + 1) as u32,
        height: (max_y - min_y + 1) as u32,
    })
}
