//! Lead segmentation: locate lead baselines and band boundaries.
//!
//! The cleaned image is normalized to bright-signal-on-dark-background
//! and binarized, then reduced to per-column signal points (the median
//! row of each contiguous foreground run). Pooled over all columns, the
//! point rows are clustered with a 1-D density scan; cluster medians
//! are the lead baseline rows, and the midpoints between adjacent
//! baselines delimit the lead bands.
//!
//! The clustering is the 1-D specialization of density-based
//! clustering: sort rows, split where a consecutive gap exceeds the
//! neighborhood radius, and discard runs smaller than the minimum
//! cluster size as noise. No multi-dimensional clustering machinery is
//! needed for a single row coordinate.

use image::{GrayImage, Luma};
use imageproc::contrast::{ThresholdType, threshold};

use crate::types::{PipelineConfig, PipelineWarning, Segmentation};

/// Polarity midpoint: images brighter than this on average are assumed
/// to be dark-signal-on-light and get inverted.
const POLARITY_MIDPOINT: f64 = 127.0;

/// Normalize polarity so the working convention is always a bright
/// signal on a dark background.
#[must_use = "returns the polarity-normalized image"]
pub fn normalize_polarity(image: &GrayImage) -> GrayImage {
    if mean_intensity(image) > POLARITY_MIDPOINT {
        GrayImage::from_fn(image.width(), image.height(), |x, y| {
            Luma([255 - image.get_pixel(x, y).0[0]])
        })
    } else {
        image.clone()
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_intensity(image: &GrayImage) -> f64 {
    let count = image.as_raw().len();
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = image.as_raw().iter().map(|&v| u64::from(v)).sum();
    sum as f64 / count as f64
}

/// Collect signal-point rows: for every column, each contiguous run of
/// foreground pixels contributes its median row.
///
/// A column crossed by several disjoint strokes (overlapping leads)
/// contributes several points. Only the row coordinate is retained;
/// clustering is 1-D.
#[must_use = "returns the pooled signal-point rows"]
pub fn find_signal_rows(binary: &GrayImage) -> Vec<u32> {
    let (width, height) = binary.dimensions();
    let mut rows = Vec::new();

    for x in 0..width {
        let mut run_start: Option<u32> = None;
        for y in 0..height {
            let foreground = binary.get_pixel(x, y).0[0] > 0;
            match (run_start, foreground) {
                (None, true) => run_start = Some(y),
                (Some(start), false) => {
                    rows.push(start.midpoint(y - 1));
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            rows.push(start.midpoint(height - 1));
        }
    }

    rows
}

/// Cluster pooled rows into lead baseline positions.
///
/// Sorts the rows and splits where a consecutive gap exceeds `eps`;
/// runs shorter than `min_cluster_size` are density noise and are
/// discarded. Each surviving cluster is reduced to its median row.
/// Returned positions are sorted ascending.
#[must_use = "returns the clustered lead positions"]
pub fn cluster_rows(rows: &[u32], eps: u32, min_cluster_size: usize) -> Vec<f64> {
    let mut sorted = rows.to_vec();
    sorted.sort_unstable();

    let mut positions = Vec::new();
    let mut cluster_start = 0_usize;
    // Split at the end of the slice or where the gap to the previous
    // row exceeds the neighborhood radius.
    for i in 1..=sorted.len() {
        if i == sorted.len() || sorted[i] - sorted[i - 1] > eps {
            let cluster = &sorted[cluster_start..i];
            if cluster.len() >= min_cluster_size {
                positions.push(median(cluster));
            }
            cluster_start = i;
        }
    }

    positions
}

/// Median of a sorted slice, averaging the two middle values for even
/// lengths.
fn median(sorted: &[u32]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (f64::from(sorted[mid - 1]) + f64::from(sorted[mid])) / 2.0
    } else {
        f64::from(sorted[mid])
    }
}

/// Derive band boundaries from baseline positions: the midpoint row
/// between each adjacent pair, bracketed by row 0 and the image height.
#[must_use = "returns the lead boundary rows"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn lead_boundaries(positions: &[f64], image_height: u32) -> Vec<u32> {
    let mut boundaries = vec![0];
    for pair in positions.windows(2) {
        boundaries.push(((pair[0] + pair[1]) / 2.0) as u32);
    }
    boundaries.push(image_height);
    boundaries
}

/// Reconcile the detected band count against the configured
/// expectation.
///
/// Mismatches are warned about; over-detection truncates the trailing
/// excess bands, under-detection passes through unchanged (no synthetic
/// boundary is invented).
///
/// Truncating trailing bands is the compatible policy even when the
/// spurious clusters sit mid-image; merging nearest clusters would be a
/// behavior change and is left for future refinement.
#[must_use = "returns the reconciled boundaries and any warnings"]
pub fn reconcile_lead_count(
    mut boundaries: Vec<u32>,
    expected: usize,
) -> (Vec<u32>, Vec<PipelineWarning>) {
    let found = boundaries.len().saturating_sub(1);
    if found == expected {
        return (boundaries, Vec::new());
    }

    let mut warnings = vec![PipelineWarning::LeadCountMismatch { found, expected }];
    tracing::warn!(found, expected, "lead count differs from expectation");

    if found > expected {
        let excess = found - expected;
        tracing::warn!(excess, "discarding excess trailing leads");
        warnings.push(PipelineWarning::ExcessLeadsDiscarded { count: excess });
        boundaries.truncate(expected + 1);
    }

    (boundaries, warnings)
}

/// Run the full segmentation stage.
///
/// Returns the recovered [`Segmentation`], the binarized working image
/// (consumed by the signal extractor), and any reconciliation warnings.
#[must_use = "returns the segmentation, the binarized image, and warnings"]
pub fn segment_leads(
    image: &GrayImage,
    config: &PipelineConfig,
) -> (Segmentation, GrayImage, Vec<PipelineWarning>) {
    let normalized = normalize_polarity(image);
    let binary = threshold(&normalized, config.binarize_threshold, ThresholdType::Binary);

    let rows = find_signal_rows(&binary);
    let positions = cluster_rows(&rows, config.cluster_radius, config.min_cluster_size);
    let boundaries = lead_boundaries(&positions, binary.height());
    let (boundaries, warnings) = reconcile_lead_count(boundaries, config.expected_lead_count);

    (
        Segmentation {
            boundaries,
            positions,
        },
        binary,
        warnings,
    )
}
