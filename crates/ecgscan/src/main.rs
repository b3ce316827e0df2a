//! Digitize a scanned ECG strip image into per-lead traces.
//!
//! Reads one input image, runs the extraction pipeline, and writes an
//! SVG chart (`digitized_ecg.svg`) and a TSV signal table
//! (`traces.tsv`) into the output directory. With `--debug`, the
//! intermediate raster of every stage is saved as a PNG under
//! `<output>/debug/`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use ecgscan_export::{SvgMetadata, TsvMetadata, to_chart_svg, to_tsv};
use ecgscan_pipeline::{
    DebugSink, GrayImage, PipelineConfig, StagedResult, process_staged, process_with_sink,
};
use tracing_subscriber::EnvFilter;

/// Digitize a scanned ECG strip image into per-lead SVG and TSV traces.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Input image path (PNG, JPEG, BMP, or WebP).
    input: PathBuf,

    /// Output directory for the SVG chart and TSV table.
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Pipeline configuration as a JSON file. Missing fields are not
    /// defaulted; the file must contain a complete configuration, for
    /// example one previously embedded in an exported SVG.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the expected number of lead bands.
    #[arg(long, value_name = "N")]
    expected_leads: Option<usize>,

    /// Save every intermediate stage raster under <output>/debug/.
    #[arg(long)]
    debug: bool,
}

/// Sink that writes each intermediate raster as `<dir>/<label>.png`.
///
/// Save failures are logged rather than propagated: debug artifacts are
/// best-effort and must never abort a run that already has a result.
struct DirectorySink {
    dir: PathBuf,
}

impl DebugSink for DirectorySink {
    fn save(&mut self, image: &GrayImage, label: &str) {
        let path = self.dir.join(format!("{label}.png"));
        match image.save(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "saved debug raster"),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "failed to save debug raster");
            }
        }
    }
}

/// Resolve the pipeline configuration from `--config` and flag overrides.
fn resolve_config(args: &Args) -> anyhow::Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("parsing config file {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };
    if let Some(n) = args.expected_leads {
        config.expected_lead_count = n;
    }
    Ok(config)
}

fn run_pipeline(
    args: &Args,
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> anyhow::Result<StagedResult> {
    if args.debug {
        let debug_dir = args.output.join("debug");
        fs::create_dir_all(&debug_dir)
            .with_context(|| format!("creating debug directory {}", debug_dir.display()))?;
        let mut sink = DirectorySink { dir: debug_dir };
        Ok(process_with_sink(image_bytes, config, &mut sink)?)
    } else {
        Ok(process_staged(image_bytes, config)?)
    }
}

fn write_output(path: &Path, contents: &str) -> anyhow::Result<()> {
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote output");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = resolve_config(&args)?;

    let image_bytes = fs::read(&args.input)
        .with_context(|| format!("reading input image {}", args.input.display()))?;
    fs::create_dir_all(&args.output)
        .with_context(|| format!("creating output directory {}", args.output.display()))?;

    let staged = run_pipeline(&args, &image_bytes, &config)?;

    let frame = match staged.frame_outcome {
        ecgscan_pipeline::FrameOutcome::Detected(_) => "detected",
        ecgscan_pipeline::FrameOutcome::Fallback(_) => "fallback",
    };
    tracing::info!(
        width = staged.dimensions.width,
        height = staged.dimensions.height,
        leads = staged.leads.len(),
        frame,
        "pipeline complete",
    );
    for warning in &staged.warnings {
        tracing::warn!(%warning);
    }

    let config_json =
        serde_json::to_string(&config).context("serializing pipeline configuration")?;
    let title = args.input.file_stem().and_then(std::ffi::OsStr::to_str);
    let description = format!(
        "{} leads from a {}x{} working image",
        staged.leads.len(),
        staged.dimensions.width,
        staged.dimensions.height,
    );

    let svg = to_chart_svg(
        &staged.leads,
        staged.dimensions,
        &SvgMetadata {
            title,
            description: Some(&description),
            config_json: Some(&config_json),
        },
    );
    write_output(&args.output.join("digitized_ecg.svg"), &svg)?;

    let tsv = to_tsv(
        &staged.leads,
        &TsvMetadata {
            title,
            description: Some(&description),
            config_json: Some(&config_json),
            ..TsvMetadata::default()
        },
    );
    write_output(&args.output.join("traces.tsv"), &tsv)?;

    Ok(())
}
