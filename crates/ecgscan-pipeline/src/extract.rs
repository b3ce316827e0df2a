//! Signal extraction: per-lead upper/lower envelope traces.
//!
//! Within one lead band, every pixel column is reduced to at most two
//! boundary points. ECG strokes are thin, but peaks and troughs span
//! several rows at their extremity, so the topmost foreground pixel
//! traces the upper envelope and the bottommost the lower one. A column
//! with a single foreground pixel lands on whichever side of the
//! baseline its signed amplitude points to.
//!
//! Amplitudes are `baseline_row - pixel_row`, so positive values are
//! above the baseline. The computation is per-column and per-lead with
//! no cross-lead interaction.

use image::GrayImage;

use crate::types::{BoundaryTrace, LeadTrace, Segmentation, lead_label};

/// Extract the upper and lower boundary traces for one lead band
/// spanning rows `band_start..band_end`.
///
/// `baseline` is the lead's baseline row in image coordinates; when
/// absent the vertical midpoint of the band is used. Both returned
/// traces are sorted by ascending column.
#[must_use = "returns the upper and lower boundary traces"]
pub fn extract_band(
    binary: &GrayImage,
    band_start: u32,
    band_end: u32,
    baseline: Option<f64>,
) -> (BoundaryTrace, BoundaryTrace) {
    let band_end = band_end.min(binary.height());
    let band_height = band_end.saturating_sub(band_start);
    let baseline_rel = baseline.map_or_else(
        || f64::from(band_height / 2),
        |row| row - f64::from(band_start),
    );

    let mut upper = BoundaryTrace::new();
    let mut lower = BoundaryTrace::new();

    for x in 0..binary.width() {
        let mut top: Option<u32> = None;
        let mut bottom: Option<u32> = None;
        for y in band_start..band_end {
            if binary.get_pixel(x, y).0[0] > 0 {
                let rel = y - band_start;
                if top.is_none() {
                    top = Some(rel);
                }
                bottom = Some(rel);
            }
        }

        match (top, bottom) {
            (Some(top), Some(bottom)) if top != bottom => {
                upper.push(x, baseline_rel - f64::from(top));
                lower.push(x, baseline_rel - f64::from(bottom));
            }
            (Some(only), Some(_)) => {
                let amplitude = baseline_rel - f64::from(only);
                if amplitude >= 0.0 {
                    upper.push(x, amplitude);
                } else {
                    lower.push(x, amplitude);
                }
            }
            _ => {}
        }
    }

    upper.sort_by_column();
    lower.sort_by_column();
    (upper, lower)
}

/// Extract traces for every lead band described by `segmentation`.
///
/// Band `i` uses lead position `i` as its baseline when one was
/// detected; bands beyond the position list fall back to their
/// vertical midpoint. Leads are labeled `I` through `V6`, with
/// overflow bands labeled generically.
#[must_use = "returns one trace per lead band"]
pub fn extract_leads(binary: &GrayImage, segmentation: &Segmentation) -> Vec<LeadTrace> {
    segmentation
        .boundaries
        .windows(2)
        .enumerate()
        .map(|(i, band)| {
            let (band_start, band_end) = (band[0], band[1]);
            let baseline = segmentation.positions.get(i).copied();
            let (upper, lower) = extract_band(binary, band_start, band_end, baseline);

            let band_height = band_end.saturating_sub(band_start);
            LeadTrace {
                label: lead_label(i),
                band_start,
                band_end,
                baseline: baseline.map_or_else(
                    || f64::from(band_height / 2),
                    |row| row - f64::from(band_start),
                ),
                upper,
                lower,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn single_pixel_columns_land_on_exactly_one_side() {
        // Band rows 0..21, baseline row 10. Columns alternate between
        // a pixel above the baseline (row 6) and below it (row 14).
        let mut img = GrayImage::new(10, 21);
        for x in 0..10 {
            let y = if x % 2 == 0 { 6 } else { 14 };
            img.put_pixel(x, y, Luma([255]));
        }

        let (upper, lower) = extract_band(&img, 0, 21, Some(10.0));

        for x in 0..10_u32 {
            let in_upper = upper.columns().contains(&x);
            let in_lower = lower.columns().contains(&x);
            assert!(
                in_upper != in_lower,
                "column {x} must appear in exactly one boundary",
            );
        }
        // Amplitude is exactly baseline - row.
        assert!(upper.points().all(|(_, a)| (a - 4.0).abs() < f64::EPSILON));
        assert!(lower.points().all(|(_, a)| (a + 4.0).abs() < f64::EPSILON));
    }

    #[test]
    fn zero_amplitude_counts_as_upper() {
        let mut img = GrayImage::new(1, 21);
        img.put_pixel(0, 10, Luma([255]));
        let (upper, lower) = extract_band(&img, 0, 21, Some(10.0));
        assert_eq!(upper.len(), 1);
        assert!(lower.is_empty());
    }

    #[test]
    fn multi_pixel_column_splits_into_top_and_bottom() {
        // A vertical stroke from rows 4..=16 in a band with baseline 10:
        // topmost pixel to the upper envelope, bottommost to the lower.
        let mut img = GrayImage::new(1, 21);
        for y in 4..=16 {
            img.put_pixel(0, y, Luma([255]));
        }

        let (upper, lower) = extract_band(&img, 0, 21, Some(10.0));
        assert_eq!(upper.columns(), &[0]);
        assert_eq!(lower.columns(), &[0]);
        assert!((upper.amplitudes()[0] - 6.0).abs() < f64::EPSILON);
        assert!((lower.amplitudes()[0] + 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_columns_contribute_no_points() {
        let img = GrayImage::new(10, 20);
        let (upper, lower) = extract_band(&img, 0, 20, None);
        assert!(upper.is_empty());
        assert!(lower.is_empty());
    }

    #[test]
    fn columns_are_strictly_increasing() {
        let mut img = GrayImage::new(30, 20);
        for x in 0..30 {
            img.put_pixel(x, 5 + (x % 7), Luma([255]));
        }
        let (upper, lower) = extract_band(&img, 0, 20, Some(8.0));
        for trace in [&upper, &lower] {
            assert!(trace.columns().windows(2).all(|pair| pair[0] < pair[1]));
        }
    }

    #[test]
    fn missing_baseline_defaults_to_band_midpoint() {
        // Band 0..20 with no baseline: midpoint row 10. A pixel at row
        // 7 has amplitude 10 - 7 = 3.
        let mut img = GrayImage::new(1, 20);
        img.put_pixel(0, 7, Luma([255]));
        let (upper, _) = extract_band(&img, 0, 20, None);
        assert!((upper.amplitudes()[0] - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn baseline_is_made_relative_to_band_start() {
        // Band 100..140, baseline at image row 120 → relative row 20.
        // A pixel at image row 110 (relative 10) has amplitude 10.
        let mut img = GrayImage::new(1, 200);
        img.put_pixel(0, 110, Luma([255]));
        let (upper, _) = extract_band(&img, 100, 140, Some(120.0));
        assert!((upper.amplitudes()[0] - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn leads_are_labeled_in_standard_order() {
        let img = GrayImage::new(4, 120);
        let segmentation = Segmentation {
            boundaries: (0..=12).map(|i| i * 10).collect(),
            positions: (0..12).map(|i| f64::from(i) * 10.0 + 5.0).collect(),
        };
        let leads = extract_leads(&img, &segmentation);
        assert_eq!(leads.len(), 12);
        assert_eq!(leads[0].label, "I");
        assert_eq!(leads[3].label, "aVR");
        assert_eq!(leads[11].label, "V6");
    }

    #[test]
    fn bands_beyond_position_list_use_midpoint_baseline() {
        let img = GrayImage::new(4, 60);
        let segmentation = Segmentation {
            boundaries: vec![0, 20, 60],
            positions: vec![10.0],
        };
        let leads = extract_leads(&img, &segmentation);
        assert_eq!(leads.len(), 2);
        assert!((leads[0].baseline - 10.0).abs() < f64::EPSILON);
        // Second band is 40 rows tall with no detected position.
        assert!((leads[1].baseline - 20.0).abs() < f64::EPSILON);
    }
}
