//! ecgscan-export: Pure format serializers (sans-IO)
//!
//! Converts digitized lead traces into output formats. Currently
//! supports SVG (per-lead chart) and TSV (tabular signal data).

pub mod svg;
pub mod tsv;

pub use svg::{SvgMetadata, to_chart_svg};
pub use tsv::{TsvMetadata, to_tsv};
