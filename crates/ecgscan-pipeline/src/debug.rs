//! Debug artifact sink: optional persistence of intermediate rasters.
//!
//! The pipeline itself performs no I/O. Callers that want to inspect
//! intermediate stage outputs supply a [`DebugSink`]; everyone else
//! gets [`NullSink`], which discards everything. The pipeline behaves
//! identically either way — a sink is only ever handed a finished
//! stage's output, never interleaved with its computation.

use image::GrayImage;

/// Receiver for labeled intermediate rasters.
pub trait DebugSink {
    /// Persist one intermediate raster under `label`.
    fn save(&mut self, image: &GrayImage, label: &str);
}

/// Sink that discards every artifact. Used when debugging is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DebugSink for NullSink {
    fn save(&mut self, _image: &GrayImage, _label: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sink that records the labels it was handed.
    #[derive(Default)]
    struct RecordingSink {
        labels: Vec<String>,
    }

    impl DebugSink for RecordingSink {
        fn save(&mut self, _image: &GrayImage, label: &str) {
            self.labels.push(label.to_owned());
        }
    }

    #[test]
    fn null_sink_accepts_anything() {
        let mut sink = NullSink;
        sink.save(&GrayImage::new(4, 4), "whatever");
    }

    #[test]
    fn recording_sink_sees_labels_in_order() {
        let mut sink = RecordingSink::default();
        let img = GrayImage::new(2, 2);
        sink.save(&img, "first");
        sink.save(&img, "second");
        assert_eq!(sink.labels, vec!["first", "second"]);
    }
}
