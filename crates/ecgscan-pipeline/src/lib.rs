//! ecgscan-pipeline: Pure ECG image-to-signal extraction (sans-IO).
//!
//! Converts a scanned or photographed paper ECG strip into per-lead
//! digitized amplitude traces through:
//! grid suppression -> text suppression -> frame removal ->
//! isolated-pixel cleaning -> lead segmentation -> signal extraction.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. Decoding failures are the
//! only fatal errors; every detection stage degrades to a documented
//! safe fallback and surfaces a [`PipelineWarning`] instead of
//! aborting.

pub mod clean;
pub mod debug;
pub mod extract;
pub mod frame;
pub mod grayscale;
pub mod grid;
pub mod segment;
pub mod text;
pub mod types;

pub use debug::{DebugSink, NullSink};
pub use types::{
    BoundaryTrace, Dimensions, EcgResult, FrameFallbackReason, FrameOutcome, GrayImage, LeadTrace,
    PipelineConfig, PipelineError, PipelineWarning, Rect, Segmentation, lead_label,
};

/// Result of running the pipeline with all intermediate rasters
/// preserved, for debug persistence and inspection.
///
/// Does not derive `PartialEq` or serde traits because `GrayImage`
/// implements neither; callers that need the structured output alone
/// should use [`StagedResult::into_result`].
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Stage 0: decoded grayscale input.
    pub grayscale: GrayImage,
    /// Stage 1: grid-suppressed binary image.
    pub grid_suppressed: GrayImage,
    /// Stage 2a: combined (dilated) text mask.
    pub text_mask: GrayImage,
    /// Stage 2b: image with masked text zeroed out.
    pub text_suppressed: GrayImage,
    /// Stage 3: frame-cropped image.
    pub frame_cropped: GrayImage,
    /// How the frame stage arrived at its crop.
    pub frame_outcome: FrameOutcome,
    /// Stage 4: isolated-pixel-cleaned image.
    pub cleaned: GrayImage,
    /// Stage 5: polarity-normalized, binarized working image.
    pub binary: GrayImage,
    /// Stage 5: recovered lead layout.
    pub segmentation: Segmentation,
    /// Stage 6: per-lead boundary traces.
    pub leads: Vec<LeadTrace>,
    /// Dimensions of the cropped working image the traces refer to.
    pub dimensions: Dimensions,
    /// Non-fatal conditions encountered across all stages.
    pub warnings: Vec<PipelineWarning>,
}

impl StagedResult {
    /// The intermediate rasters in pipeline order. Labels carry a
    /// numeric prefix so a sorted directory listing matches the order
    /// the stages ran in.
    #[must_use]
    pub fn rasters(&self) -> [(&'static str, &GrayImage); 7] {
        [
            ("01_original", &self.grayscale),
            ("02_grid_suppressed", &self.grid_suppressed),
            ("03_text_mask", &self.text_mask),
            ("04_text_suppressed", &self.text_suppressed),
            ("05_frame_cropped", &self.frame_cropped),
            ("06_cleaned", &self.cleaned),
            ("07_binary", &self.binary),
        ]
    }

    /// Drop the rasters and keep the structured output.
    #[must_use]
    pub fn into_result(self) -> EcgResult {
        EcgResult {
            leads: self.leads,
            dimensions: self.dimensions,
            warnings: self.warnings,
        }
    }
}

/// Run the full extraction pipeline, discarding intermediates.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty and
/// [`PipelineError::ImageDecode`] if the bytes cannot be decoded. All
/// other conditions resolve to fallbacks recorded in
/// [`EcgResult::warnings`].
pub fn process(image_bytes: &[u8], config: &PipelineConfig) -> Result<EcgResult, PipelineError> {
    Ok(process_staged(image_bytes, config)?.into_result())
}

/// Run the full extraction pipeline, retaining every intermediate
/// raster.
///
/// # Errors
///
/// Same failure modes as [`process`].
pub fn process_staged(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<StagedResult, PipelineError> {
    // 1. Decode and convert to grayscale — the only fatal stage.
    let gray = grayscale::decode_and_grayscale(image_bytes)?;

    let mut warnings = Vec::new();

    // 2. Grid suppression.
    let grid_suppressed = grid::suppress_grid(&gray);

    // 3. Text suppression.
    let (text_mask, text_warning) = text::build_text_mask(&grid_suppressed, config);
    warnings.extend(text_warning);
    let text_suppressed = text::suppress_text(&grid_suppressed, &text_mask);

    // 4. Frame removal (detected crop or fallback margin crop).
    let (frame_cropped, frame_outcome) = frame::remove_frame(&text_suppressed, config);
    if let FrameOutcome::Fallback(reason) = frame_outcome {
        warnings.push(PipelineWarning::FrameFallback { reason });
    }

    // 5. Isolated-pixel cleaning.
    let cleaned = clean::remove_isolated_pixels(
        &frame_cropped,
        config.neighbor_connectivity,
        config.min_neighbor_count,
    );

    // 6. Lead segmentation.
    let (segmentation, binary, segment_warnings) = segment::segment_leads(&cleaned, config);
    warnings.extend(segment_warnings);

    // 7. Signal extraction.
    let leads = extract::extract_leads(&binary, &segmentation);

    let dimensions = Dimensions {
        width: binary.width(),
        height: binary.height(),
    };

    Ok(StagedResult {
        grayscale: gray,
        grid_suppressed,
        text_mask,
        text_suppressed,
        frame_cropped,
        frame_outcome,
        cleaned,
        binary,
        segmentation,
        leads,
        dimensions,
        warnings,
    })
}

/// Like [`process_staged`], but hands each intermediate raster to
/// `sink` after the run completes.
///
/// Persistence is a side effect performed after stage computation, not
/// interleaved with it; the pipeline output is identical to
/// [`process_staged`] regardless of the sink.
///
/// # Errors
///
/// Same failure modes as [`process`].
pub fn process_with_sink(
    image_bytes: &[u8],
    config: &PipelineConfig,
    sink: &mut dyn DebugSink,
) -> Result<StagedResult, PipelineError> {
    let staged = process_staged(image_bytes, config)?;
    for (label, raster) in staged.rasters() {
        sink.save(raster, label);
    }
    Ok(staged)
}
