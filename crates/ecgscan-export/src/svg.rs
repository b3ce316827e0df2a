//! SVG chart serializer.
//!
//! Renders digitized leads as a vertically stacked chart in source-image
//! coordinates using the [`svg`] crate for document construction, XML
//! escaping, and path data formatting.
//!
//! Each lead becomes a `<g>` group containing its band separator, a
//! dashed baseline reference, the upper and lower envelope `<path>`
//! elements, and a bold label in the band's top-left corner.
//!
//! Optional [`SvgMetadata`] embeds `<title>` and `<desc>` elements for
//! accessibility and to help file managers identify exported files.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Element, Group, Line, Path, Rectangle, Title};
use svg::node::element::Text as TextElement;
use svg::node::{Node, Text, Value};

use ecgscan_pipeline::{BoundaryTrace, Dimensions, LeadTrace};

/// Stroke color for upper envelopes.
const UPPER_STROKE: &str = "#1f77b4";
/// Stroke color for lower envelopes.
const LOWER_STROKE: &str = "#ff7f0e";
/// Stroke color for the dashed baseline reference.
const BASELINE_STROKE: &str = "#cc0000";
/// Stroke color for band separator lines.
const SEPARATOR_STROKE: &str = "#cccccc";

/// Metadata to embed in the SVG document.
///
/// Both text fields are optional.  When present, a `<title>` and/or
/// `<desc>` element is emitted immediately after the opening `<svg>`
/// tag.  These are standard SVG accessibility elements and are surfaced
/// by some file managers and screen readers.
///
/// Text values are XML-escaped automatically by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title — emitted as `<title>`.
    ///
    /// Typically the source image filename (without extension).
    pub title: Option<&'a str>,

    /// Document description — emitted as `<desc>`.
    ///
    /// Typically contains pipeline parameters and a timestamp so
    /// exported files are distinguishable.
    pub description: Option<&'a str>,

    /// Structured pipeline configuration JSON — emitted inside a
    /// `<metadata>` element wrapped in a namespaced `<ecgscan:pipeline>`
    /// element.
    ///
    /// When present, the full serialized configuration is embedded so
    /// exported files carry machine-parseable settings for
    /// reproducibility.  The human-readable `description` is retained
    /// separately.
    pub config_json: Option<&'a str>,
}

/// Build an SVG path `d` attribute string from one envelope of a lead.
///
/// Amplitudes are converted back to absolute image rows
/// (`band_start + baseline - amplitude`, positive amplitude pointing
/// up) so the chart overlays the source strip exactly.  Uses `M` for
/// the first point and `L` for subsequent points.  Returns an empty
/// string for traces with fewer than 2 points.
///
/// # Examples
///
/// ```
/// use ecgscan_pipeline::BoundaryTrace;
/// use ecgscan_export::svg::envelope_path_data;
///
/// let mut trace = BoundaryTrace::new();
/// trace.push(0, 5.0);
/// trace.push(10, -3.0);
/// let d = envelope_path_data(&trace, 100, 50.0);
/// assert_eq!(d, "M0,145 L10,153");
/// ```
#[must_use]
pub fn envelope_path_data(trace: &BoundaryTrace, band_start: u32, baseline: f64) -> String {
    if trace.len() < 2 {
        return String::new();
    }

    let mut data: Option<Data> = None;
    for (column, amplitude) in trace.points() {
        let point = (
            f64::from(column),
            f64::from(band_start) + baseline - amplitude,
        );
        data = Some(match data {
            None => Data::new().move_to(point),
            Some(d) => d.line_to(point),
        });
    }
    data.map_or_else(String::new, |d| String::from(Value::from(d)))
}

/// Build the `<g>` group for a single lead.
fn lead_group(lead: &LeadTrace) -> Group {
    let baseline_row = f64::from(lead.band_start) + lead.baseline;
    let mut group = Group::new().set("data-lead", lead.label.as_str());

    // Band separator along the top edge of every band except the first.
    if lead.band_start > 0 {
        group = group.add(
            Line::new()
                .set("x1", 0)
                .set("y1", lead.band_start)
                .set("x2", "100%")
                .set("y2", lead.band_start)
                .set("stroke", SEPARATOR_STROKE)
                .set("stroke-width", 1),
        );
    }

    // Dashed baseline reference at the lead's resting row.
    group = group.add(
        Line::new()
            .set("x1", 0)
            .set("y1", baseline_row)
            .set("x2", "100%")
            .set("y2", baseline_row)
            .set("stroke", BASELINE_STROKE)
            .set("stroke-width", 1)
            .set("stroke-dasharray", "4 4")
            .set("opacity", 0.5),
    );

    for (trace, stroke) in [(&lead.upper, UPPER_STROKE), (&lead.lower, LOWER_STROKE)] {
        let d = envelope_path_data(trace, lead.band_start, lead.baseline);
        if d.is_empty() {
            continue;
        }
        group = group.add(
            Path::new()
                .set("d", d)
                .set("fill", "none")
                .set("stroke", stroke)
                .set("stroke-width", 1),
        );
    }

    // Bold label in the band's top-left corner.
    group.add(
        TextElement::new(lead.label.as_str())
            .set("x", 4)
            .set("y", lead.band_start + 14)
            .set("font-family", "sans-serif")
            .set("font-size", 12)
            .set("font-weight", "bold"),
    )
}

/// Serialize digitized leads into an SVG chart document string.
///
/// The `viewBox` matches [`Dimensions`] of the cropped working image,
/// so every envelope point lands on the pixel it was extracted from.
/// Leads with no envelope points still get their separator, baseline,
/// and label, making missing signal visible rather than silent.
///
/// If [`SvgMetadata::title`] or [`SvgMetadata::description`] is
/// provided, the corresponding `<title>` / `<desc>` element is emitted
/// after the opening `<svg>` tag.  If [`SvgMetadata::config_json`] is
/// provided, a `<metadata>` element is emitted containing the JSON
/// wrapped in a namespaced `<ecgscan:pipeline>` element.
#[must_use]
pub fn to_chart_svg(
    leads: &[LeadTrace],
    dimensions: Dimensions,
    metadata: &SvgMetadata<'_>,
) -> String {
    let w = dimensions.width;
    let h = dimensions.height;
    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0, 0, w, h));

    // Optional <title> element
    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    // Optional <desc> element
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    // Optional <metadata> element with structured pipeline config
    if let Some(config_json) = metadata.config_json {
        let mut pipeline_el = Element::new("ecgscan:pipeline");
        pipeline_el.assign("xmlns:ecgscan", "https://ecgscan.dev/ns/1");
        pipeline_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(pipeline_el);
        doc = doc.add(metadata_el);
    }

    // White background so the chart reads on dark viewers.
    doc = doc.add(
        Rectangle::new()
            .set("width", "100%")
            .set("height", "100%")
            .set("fill", "white"),
    );

    for lead in leads {
        doc = doc.add(lead_group(lead));
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
