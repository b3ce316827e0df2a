//! Strip decoding: raw scan bytes to the grayscale working image.
//!
//! Every later stage operates on a single-channel image, so decoding
//! and luminance reduction happen once, up front. This is the only
//! stage that can fail fatally: an undecodable scan has no fallback.

use image::GrayImage;

use crate::types::PipelineError;

/// Decode a scanned strip and reduce it to grayscale.
///
/// Any container the `image` crate is built with is accepted; this
/// crate enables PNG, JPEG, BMP, and WebP. Color scans are reduced
/// with a perceptual luminance weighting, and scans that are already
/// single-channel pass through unchanged.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode_and_grayscale(bytes: &[u8]) -> Result<GrayImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_luma8())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Encode an RGBA image as PNG bytes.
    fn png_bytes(img: &image::RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        let result = decode_and_grayscale(&[]);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode_and_grayscale(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn decoded_strip_keeps_its_dimensions() {
        let img = image::RgbaImage::from_fn(23, 11, |_, _| image::Rgba([128, 64, 32, 255]));
        let gray = decode_and_grayscale(&png_bytes(&img)).unwrap();
        assert_eq!((gray.width(), gray.height()), (23, 11));
    }

    #[test]
    fn white_background_survives_luminance_reduction() {
        let img = image::RgbaImage::from_fn(3, 3, |_, _| image::Rgba([255, 255, 255, 255]));
        let gray = decode_and_grayscale(&png_bytes(&img)).unwrap();
        assert!(gray.pixels().all(|p| p.0[0] == 255));
    }
}
