//! TSV export serializer.
//!
//! Converts digitized lead traces into a tab-separated text file with
//! one row per envelope point:
//!
//! ```text
//! lead<TAB>envelope<TAB>column<TAB>amplitude
//! ```
//!
//! where **envelope** is `upper` or `lower`, **column** is the x pixel
//! in the cropped working image, and **amplitude** is the signed
//! baseline-relative deflection in pixels (positive pointing up).
//!
//! Lines beginning with `#` are metadata comments, to be skipped by
//! downstream parsers.
//!
//! This is a pure function with no I/O — it returns a `String`.

use std::fmt::Write;

use ecgscan_pipeline::LeadTrace;

/// Metadata to embed as `#`-prefixed comment lines at the top of the
/// `.tsv` file.
///
/// All fields are optional.  When present, the corresponding comment
/// line is emitted.  Parsers should skip any line beginning with `#`.
#[derive(Debug, Clone, Default)]
pub struct TsvMetadata<'a> {
    /// Source image filename — emitted as `# Source: <filename>`.
    pub title: Option<&'a str>,

    /// Human-readable pipeline parameters — emitted as a `#` comment.
    pub description: Option<&'a str>,

    /// Export timestamp — emitted as `# Exported: <timestamp>`.
    pub timestamp: Option<&'a str>,

    /// Full pipeline configuration JSON — emitted as `# Config: <json>`.
    ///
    /// Allows re-running the pipeline with the exact same settings.
    pub config_json: Option<&'a str>,
}

/// Serialize digitized leads into a TSV text string.
///
/// Emits a comment header, one `# Lead:` line per lead describing its
/// band and baseline, a column header row, then the data rows in lead
/// order (upper envelope first, then lower, each ascending by column).
///
/// Amplitudes are formatted with shortest-round-trip `f64` formatting,
/// so integral values print without a decimal point.
#[must_use]
pub fn to_tsv(leads: &[LeadTrace], metadata: &TsvMetadata<'_>) -> String {
    let mut out = String::new();

    // --- Metadata header ---
    let _ = writeln!(out, "# ecgscan");
    if let Some(title) = metadata.title {
        for line in title.lines() {
            let _ = writeln!(out, "# Source: {line}");
        }
    }
    if let Some(description) = metadata.description {
        for line in description.lines() {
            let _ = writeln!(out, "# {line}");
        }
    }
    if let Some(timestamp) = metadata.timestamp {
        for line in timestamp.lines() {
            let _ = writeln!(out, "# Exported: {line}");
        }
    }
    if let Some(config_json) = metadata.config_json {
        for line in config_json.lines() {
            let _ = writeln!(out, "# Config: {line}");
        }
    }
    for lead in leads {
        let _ = writeln!(
            out,
            "# Lead: {} rows {}..{} baseline {}",
            lead.label,
            lead.band_start,
            lead.band_end,
            f64::from(lead.band_start) + lead.baseline,
        );
    }

    // --- Column header + data rows ---
    let _ = writeln!(out, "lead\tenvelope\tcolumn\tamplitude");
    for lead in leads {
        for (name, trace) in [("upper", &lead.upper), ("lower", &lead.lower)] {
            for (column, amplitude) in trace.points() {
                let _ = writeln!(out, "{}\t{name}\t{column}\t{amplitude}", lead.label);
            }
        }
    }

    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ecgscan_pipeline::BoundaryTrace;

    use super::*;

    fn no_meta() -> TsvMetadata<'static> {
        TsvMetadata::default()
    }

    fn lead(label: &str, upper: &[(u32, f64)], lower: &[(u32, f64)]) -> LeadTrace {
        let mut up = BoundaryTrace::new();
        for &(c, a) in upper {
            up.push(c, a);
        }
        let mut low = BoundaryTrace::new();
        for &(c, a) in lower {
            low.push(c, a);
        }
        LeadTrace {
            label: label.to_owned(),
            band_start: 0,
            band_end: 100,
            baseline: 50.0,
            upper: up,
            lower: low,
        }
    }

    #[test]
    fn empty_input_still_emits_header() {
        let tsv = to_tsv(&[], &no_meta());
        assert!(tsv.starts_with("# ecgscan\n"));
        assert!(tsv.ends_with("lead\tenvelope\tcolumn\tamplitude\n"));
    }

    #[test]
    fn rows_are_tab_separated_in_lead_order() {
        let leads = vec![
            lead("I", &[(0, 4.0), (1, 4.5)], &[(0, -2.0)]),
            lead("II", &[(3, 1.0)], &[]),
        ];
        let tsv = to_tsv(&leads, &no_meta());

        let data: Vec<&str> = tsv
            .lines()
            .filter(|line| !line.starts_with('#') && !line.starts_with("lead\t"))
            .collect();
        assert_eq!(
            data,
            vec![
                "I\tupper\t0\t4",
                "I\tupper\t1\t4.5",
                "I\tlower\t0\t-2",
                "II\tupper\t3\t1",
            ],
        );
    }

    #[test]
    fn lead_comment_reports_absolute_baseline() {
        let mut l = lead("V1", &[], &[]);
        l.band_start = 200;
        l.band_end = 300;
        l.baseline = 48.5;
        let tsv = to_tsv(&[l], &no_meta());
        assert!(tsv.contains("# Lead: V1 rows 200..300 baseline 248.5\n"));
    }

    #[test]
    fn metadata_lines_are_comments() {
        let meta = TsvMetadata {
            title: Some("scan-042.png"),
            description: Some("12 leads expected"),
            timestamp: Some("2026-08-28T12:00:00Z"),
            config_json: Some(r#"{"expected_lead_count":12}"#),
        };
        let tsv = to_tsv(&[], &meta);
        assert!(tsv.contains("# Source: scan-042.png\n"));
        assert!(tsv.contains("# 12 leads expected\n"));
        assert!(tsv.contains("# Exported: 2026-08-28T12:00:00Z\n"));
        assert!(tsv.contains(r##"# Config: {"expected_lead_count":12}"##));
        // Every line before the column header is a comment.
        for line in tsv.lines() {
            if line == "lead\tenvelope\tcolumn\tamplitude" {
                break;
            }
            assert!(line.starts_with('#'), "uncommented header line: {line}");
        }
    }
}
