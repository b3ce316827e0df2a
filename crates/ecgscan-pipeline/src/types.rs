//! Shared types for the ECG extraction pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Standard 12-lead names, in conventional printing order.
pub const LEAD_NAMES: [&str; 12] = [
    "I", "II", "III", "aVR", "aVL", "aVF", "V1", "V2", "V3", "V4", "V5", "V6",
];

/// Label for the lead at `index` (zero-based, top band first).
///
/// Indices beyond the standard twelve are labeled generically
/// (`Lead 13`, `Lead 14`, ...).
#[must_use]
pub fn lead_label(index: usize) -> String {
    LEAD_NAMES
        .get(index)
        .map_or_else(|| format!("Lead {}", index + 1), ToString::to_string)
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// An axis-aligned rectangle in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Area in square pixels.
    #[must_use]
    pub fn area(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Pixel adjacency used when counting same-value neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NeighborConnectivity {
    /// Horizontal and vertical neighbors only.
    Four,
    /// Horizontal, vertical, and diagonal neighbors.
    #[default]
    Eight,
}

impl NeighborConnectivity {
    /// Neighbor offsets as `(dx, dy)` pairs.
    #[must_use]
    pub const fn offsets(self) -> &'static [(i64, i64)] {
        match self {
            Self::Four => &[(0, -1), (-1, 0), (1, 0), (0, 1)],
            Self::Eight => &[
                (-1, -1),
                (0, -1),
                (1, -1),
                (-1, 0),
                (1, 0),
                (-1, 1),
                (0, 1),
                (1, 1),
            ],
        }
    }
}

/// Configuration for the ECG extraction pipeline.
///
/// Every heuristic threshold the stages rely on is a named field with a
/// documented default, so tuning never requires touching algorithm code.
/// The `Default` values are the contract a test suite may assume absent
/// explicit configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of lead bands the strip is expected to contain.
    /// Detection of more bands truncates the trailing excess; fewer is
    /// reported as a warning and passed through unchanged.
    pub expected_lead_count: usize,

    /// Maximum row gap (pixels) between signal points assigned to the
    /// same lead cluster.
    pub cluster_radius: u32,

    /// Minimum number of signal points a cluster needs to count as a
    /// lead; smaller runs are density noise and are discarded.
    pub min_cluster_size: usize,

    /// Fraction of the image width masked on the left, where lead
    /// labels are conventionally printed.
    pub text_left_margin: f64,

    /// Fraction of the image height masked at the bottom, where scale
    /// and calibration text appears.
    pub text_bottom_margin: f64,

    /// Threshold applied to the inverted image when isolating candidate
    /// text blobs for connected-component analysis.
    pub text_component_threshold: u8,

    /// Canny low threshold for frame-edge detection. Clamped to at
    /// least 1.0 and at most the high threshold before use.
    pub frame_canny_low: f32,

    /// Canny high threshold for frame-edge detection. Clamped to at
    /// least 1.0 before use.
    pub frame_canny_high: f32,

    /// Minimum contour area (square pixels) for a candidate frame
    /// rectangle. Smaller contours are not plausible strip borders.
    pub frame_min_area: u64,

    /// Inward margin (pixels) applied when cropping to a detected
    /// frame's interior, keeping border ink out of the crop.
    pub frame_crop_margin: u32,

    /// Per-axis margin fraction for the fallback crop used when frame
    /// detection fails. Capped at 10% of each axis.
    pub fallback_crop_fraction: f64,

    /// Adjacency used by the isolated-pixel cleaner.
    pub neighbor_connectivity: NeighborConnectivity,

    /// Minimum number of foreground neighbors a foreground pixel needs
    /// to survive the isolated-pixel cleaner.
    pub min_neighbor_count: u32,

    /// Fixed binarization threshold used by the lead segmenter.
    pub binarize_threshold: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            expected_lead_count: 12,
            cluster_radius: 10,
            min_cluster_size: 3,
            text_left_margin: 0.10,
            text_bottom_margin: 0.05,
            text_component_threshold: 170,
            frame_canny_low: 50.0,
            frame_canny_high: 150.0,
            frame_min_area: 100,
            frame_crop_margin: 10,
            fallback_crop_fraction: 0.05,
            neighbor_connectivity: NeighborConnectivity::Eight,
            min_neighbor_count: 1,
            binarize_threshold: 127,
        }
    }
}

/// One envelope of a lead's waveform: parallel column/amplitude
/// sequences sorted by ascending column.
///
/// Amplitudes are relative to the lead's baseline row: positive means
/// above the baseline (toward the top of the image).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundaryTrace {
    columns: Vec<u32>,
    amplitudes: Vec<f64>,
}

impl BoundaryTrace {
    /// Create an empty trace.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            columns: Vec::new(),
            amplitudes: Vec::new(),
        }
    }

    /// Append a point. Callers push in ascending column order; the
    /// invariant is re-established by [`sort_by_column`](Self::sort_by_column)
    /// before the trace leaves the extractor.
    pub fn push(&mut self, column: u32, amplitude: f64) {
        self.columns.push(column);
        self.amplitudes.push(amplitude);
    }

    /// Number of points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the trace has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column (x) coordinates, ascending.
    #[must_use]
    pub fn columns(&self) -> &[u32] {
        &self.columns
    }

    /// Amplitudes parallel to [`columns`](Self::columns).
    #[must_use]
    pub fn amplitudes(&self) -> &[f64] {
        &self.amplitudes
    }

    /// Iterate over `(column, amplitude)` pairs.
    pub fn points(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.columns
            .iter()
            .copied()
            .zip(self.amplitudes.iter().copied())
    }

    /// Sort both sequences by ascending column.
    pub fn sort_by_column(&mut self) {
        let mut order: Vec<usize> = (0..self.columns.len()).collect();
        order.sort_by_key(|&i| self.columns[i]);
        self.columns = order.iter().map(|&i| self.columns[i]).collect();
        self.amplitudes = order.iter().map(|&i| self.amplitudes[i]).collect();
    }
}

/// Digitized output for a single lead band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadTrace {
    /// Lead label (`I`, `II`, ..., `V6`, or `Lead N` for overflow).
    pub label: String,
    /// First row of the band (inclusive), in cropped-image coordinates.
    pub band_start: u32,
    /// One past the last row of the band.
    pub band_end: u32,
    /// Baseline row relative to `band_start`.
    pub baseline: f64,
    /// Upper envelope (peaks).
    pub upper: BoundaryTrace,
    /// Lower envelope (troughs).
    pub lower: BoundaryTrace,
}

impl LeadTrace {
    /// Height of the band in pixels.
    #[must_use]
    pub const fn band_height(&self) -> u32 {
        self.band_end.saturating_sub(self.band_start)
    }
}

/// Lead layout recovered by the segmenter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    /// Row coordinates delimiting lead bands: first entry 0, last entry
    /// the image height, non-decreasing. Length is lead count + 1.
    pub boundaries: Vec<u32>,
    /// Cluster-median baseline row per detected lead, ascending.
    /// May be shorter than the band count after reconciliation.
    pub positions: Vec<f64>,
}

impl Segmentation {
    /// Number of lead bands delimited by the boundary list.
    #[must_use]
    pub fn lead_count(&self) -> usize {
        self.boundaries.len().saturating_sub(1)
    }
}

/// Why the frame remover fell back to the percentage margin crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameFallbackReason {
    /// Edge detection produced no contours at all.
    NoContour,
    /// The largest contour was below the minimum area.
    ContourTooSmall,
    /// The bounding rectangle was degenerate or spanned a full image
    /// dimension, meaning no real frame was found.
    ImplausibleRect,
}

impl std::fmt::Display for FrameFallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoContour => write!(f, "no contours detected"),
            Self::ContourTooSmall => write!(f, "largest contour below minimum area"),
            Self::ImplausibleRect => write!(f, "bounding rectangle implausible"),
        }
    }
}

/// Tagged outcome of frame detection: either a crop to a detected
/// frame's interior or the safe fallback margin crop, with the reason.
///
/// Frame detection failure is never fatal; both variants carry a valid
/// cropped image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameOutcome {
    /// A plausible frame rectangle was found and the image was cropped
    /// to its interior.
    Detected(Rect),
    /// No plausible frame; the percentage margin crop was applied.
    Fallback(FrameFallbackReason),
}

/// Non-fatal conditions surfaced by pipeline stages.
///
/// Warnings are emitted as `tracing` events at the point of detection
/// and also collected into results, so the sans-IO core stays useful
/// without a subscriber installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum PipelineWarning {
    /// Connected-component text analysis failed; the margin mask alone
    /// was used.
    #[error("text component analysis failed: {reason}")]
    TextComponentAnalysis {
        /// Human-readable failure description.
        reason: String,
    },

    /// Frame detection fell back to the percentage margin crop.
    #[error("frame detection fell back to margin crop: {reason}")]
    FrameFallback {
        /// Why the detected rectangle was not usable.
        reason: FrameFallbackReason,
    },

    /// Detected lead band count differed from the configured
    /// expectation.
    #[error("found {found} leads, expected {expected}")]
    LeadCountMismatch {
        /// Bands the segmenter produced before reconciliation.
        found: usize,
        /// Configured expectation.
        expected: usize,
    },

    /// Trailing excess lead bands were discarded during reconciliation.
    #[error("discarded {count} excess trailing leads")]
    ExcessLeadsDiscarded {
        /// How many bands were dropped.
        count: usize,
    },
}

/// Errors that can occur during pipeline processing.
///
/// Only input decoding can fail fatally; every detection stage resolves
/// to a deterministic fallback plus a [`PipelineWarning`] instead.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,
}

/// Final result of running the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcgResult {
    /// One trace per lead band, top band first.
    pub leads: Vec<LeadTrace>,
    /// Dimensions of the cropped working image the traces refer to.
    pub dimensions: Dimensions,
    /// Non-fatal conditions encountered along the way.
    pub warnings: Vec<PipelineWarning>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_labels_follow_standard_naming() {
        assert_eq!(lead_label(0), "I");
        assert_eq!(lead_label(3), "aVR");
        assert_eq!(lead_label(11), "V6");
    }

    #[test]
    fn overflow_leads_get_generic_labels() {
        assert_eq!(lead_label(12), "Lead 13");
        assert_eq!(lead_label(14), "Lead 15");
    }

    #[test]
    fn config_defaults_match_contract() {
        let config = PipelineConfig::default();
        assert_eq!(config.expected_lead_count, 12);
        assert_eq!(config.cluster_radius, 10);
        assert_eq!(config.min_cluster_size, 3);
        assert!((config.text_left_margin - 0.10).abs() < f64::EPSILON);
        assert!((config.text_bottom_margin - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.text_component_threshold, 170);
        assert!((config.frame_canny_low - 50.0).abs() < f32::EPSILON);
        assert!((config.frame_canny_high - 150.0).abs() < f32::EPSILON);
        assert_eq!(config.frame_min_area, 100);
        assert_eq!(config.frame_crop_margin, 10);
        assert!((config.fallback_crop_fraction - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.neighbor_connectivity, NeighborConnectivity::Eight);
        assert_eq!(config.min_neighbor_count, 1);
        assert_eq!(config.binarize_threshold, 127);
    }

    #[test]
    fn connectivity_offset_counts() {
        assert_eq!(NeighborConnectivity::Four.offsets().len(), 4);
        assert_eq!(NeighborConnectivity::Eight.offsets().len(), 8);
    }

    #[test]
    fn rect_area() {
        let r = Rect {
            x: 5,
            y: 5,
            width: 400,
            height: 300,
        };
        assert_eq!(r.area(), 120_000);
    }

    #[test]
    fn boundary_trace_push_and_accessors() {
        let mut trace = BoundaryTrace::new();
        trace.push(3, 1.5);
        trace.push(7, -2.0);
        assert_eq!(trace.len(), 2);
        assert!(!trace.is_empty());
        assert_eq!(trace.columns(), &[3, 7]);
        assert_eq!(trace.amplitudes(), &[1.5, -2.0]);
    }

    #[test]
    fn boundary_trace_sort_reorders_both_sequences() {
        let mut trace = BoundaryTrace::new();
        trace.push(9, 1.0);
        trace.push(2, 2.0);
        trace.push(5, 3.0);
        trace.sort_by_column();
        assert_eq!(trace.columns(), &[2, 5, 9]);
        assert_eq!(trace.amplitudes(), &[2.0, 3.0, 1.0]);
    }

    #[test]
    fn segmentation_lead_count() {
        let seg = Segmentation {
            boundaries: vec![0, 100, 200, 300],
            positions: vec![50.0, 150.0, 250.0],
        };
        assert_eq!(seg.lead_count(), 3);
    }

    #[test]
    fn lead_trace_band_height() {
        let trace = LeadTrace {
            label: lead_label(0),
            band_start: 40,
            band_end: 140,
            baseline: 50.0,
            upper: BoundaryTrace::new(),
            lower: BoundaryTrace::new(),
        };
        assert_eq!(trace.band_height(), 100);
    }

    #[test]
    fn warning_display_messages() {
        let warn = PipelineWarning::LeadCountMismatch {
            found: 9,
            expected: 12,
        };
        assert_eq!(warn.to_string(), "found 9 leads, expected 12");

        let warn = PipelineWarning::FrameFallback {
            reason: FrameFallbackReason::NoContour,
        };
        assert_eq!(
            warn.to_string(),
            "frame detection fell back to margin crop: no contours detected",
        );
    }

    #[test]
    fn error_empty_input_display() {
        let err = PipelineError::EmptyInput;
        assert_eq!(err.to_string(), "input image data is empty");
    }

    // --- Serde round-trips ---

    #[cfg(test)]
    #[allow(clippy::unwrap_used)]
    mod serde_round_trips {
        use super::*;

        #[test]
        fn pipeline_config() {
            let config = PipelineConfig {
                expected_lead_count: 6,
                cluster_radius: 14,
                neighbor_connectivity: NeighborConnectivity::Four,
                ..PipelineConfig::default()
            };
            let json = serde_json::to_string(&config).unwrap();
            let back: PipelineConfig = serde_json::from_str(&json).unwrap();
            assert_eq!(config, back);
        }

        #[test]
        fn boundary_trace() {
            let mut trace = BoundaryTrace::new();
            trace.push(0, 4.5);
            trace.push(1, -3.0);
            let json = serde_json::to_string(&trace).unwrap();
            let back: BoundaryTrace = serde_json::from_str(&json).unwrap();
            assert_eq!(trace, back);
        }

        #[test]
        fn frame_outcome() {
            let outcome = FrameOutcome::Detected(Rect {
                x: 10,
                y: 10,
                width: 400,
                height: 300,
            });
            let json = serde_json::to_string(&outcome).unwrap();
            let back: FrameOutcome = serde_json::from_str(&json).unwrap();
            assert_eq!(outcome, back);
        }

        #[test]
        fn warnings() {
            let warn = PipelineWarning::ExcessLeadsDiscarded { count: 3 };
            let json = serde_json::to_string(&warn).unwrap();
            let back: PipelineWarning = serde_json::from_str(&json).unwrap();
            assert_eq!(warn, back);
        }
    }
}
