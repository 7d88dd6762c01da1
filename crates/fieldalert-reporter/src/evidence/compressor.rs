//! Bounded-size JPEG compression of captured evidence.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use fieldalert_core::config::MediaConfig;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader, RgbImage};
use tracing::{debug, info, warn};

use super::CompressionError;

/// Transport-ready evidence payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompressedEvidence {
    /// Base64 text of the JPEG bytes; empty when the source was unreadable.
    pub payload: String,
    pub encoded_len: usize,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub within_budget: bool,
}

impl CompressedEvidence {
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Deterministic resize-then-requantize compressor.
#[derive(Debug, Clone)]
pub struct EvidenceCompressor {
    settings: MediaConfig,
}

impl EvidenceCompressor {
    pub const fn new(settings: MediaConfig) -> Self {
        Self { settings }
    }

    pub const fn settings(&self) -> &MediaConfig {
        &self.settings
    }

    /// Compress `source`, returning an empty payload when it cannot be decoded.
    pub fn compress(&self, source: &[u8]) -> CompressedEvidence {
        match self.try_compress(source) {
            Ok(evidence) => evidence,
            Err(e) => {
                warn!(error = %e, source_len = source.len(), "Evidence dropped");
                CompressedEvidence::default()
            }
        }
    }

    /// Compress `source` to at most `max_dimension` on the long edge, lowering
    /// JPEG quality by `quality_step` until the byte budget or the quality
    /// floor is reached. The last encoding is returned even when it is still
    /// over budget.
    pub fn try_compress(&self, source: &[u8]) -> Result<CompressedEvidence, CompressionError> {
        let (width, height) = read_bounds(source)?;
        let target = self.settings.max_dimension;
        let factor = subsample_factor(width, height, target);
        debug!(width, height, factor, target, "Evidence bounds read");

        let image = decode_scaled(source, factor, target)?;
        let rgb = image.to_rgb8();

        let budget = self.settings.byte_budget;
        let floor = self.settings.quality_floor;
        let mut quality = self.settings.quality_start;
        let mut encoded = encode_at(&rgb, quality)?;
        debug!(quality, bytes = encoded.len(), budget, "Evidence encoded");

        while encoded.len() > budget && quality > floor {
            quality = quality.saturating_sub(self.settings.quality_step).max(floor);
            encoded = encode_at(&rgb, quality)?;
            debug!(quality, bytes = encoded.len(), budget, "Evidence re-encoded");
        }

        let within_budget = encoded.len() <= budget;
        info!(
            width = rgb.width(),
            height = rgb.height(),
            quality,
            bytes = encoded.len(),
            within_budget,
            "Evidence compressed"
        );

        Ok(CompressedEvidence {
            payload: STANDARD.encode(&encoded),
            encoded_len: encoded.len(),
            width: rgb.width(),
            height: rgb.height(),
            quality,
            within_budget,
        })
    }
}

/// Read only the image header for its dimensions.
pub fn read_bounds(source: &[u8]) -> Result<(u32, u32), CompressionError> {
    ImageReader::new(Cursor::new(source))
        .with_guessed_format()
        .map_err(|e| CompressionError::Unreadable(e.to_string()))?
        .into_dimensions()
        .map_err(|e| CompressionError::Unreadable(e.to_string()))
}

/// Largest power-of-two factor that keeps both subsampled dimensions at or
/// above `target`.
pub fn subsample_factor(width: u32, height: u32, target: u32) -> u32 {
    let mut factor = 1;
    if target == 0 || (width <= target && height <= target) {
        return factor;
    }
    let half_width = width / 2;
    let half_height = height / 2;
    while half_width / factor >= target && half_height / factor >= target {
        factor *= 2;
    }
    factor
}

/// Decode, subsample by `factor`, then fit the long edge to `target`.
fn decode_scaled(source: &[u8], factor: u32, target: u32) -> Result<DynamicImage, CompressionError> {
    let mut image = ImageReader::new(Cursor::new(source))
        .with_guessed_format()
        .map_err(|e| CompressionError::Unreadable(e.to_string()))?
        .decode()
        .map_err(|e| CompressionError::Unreadable(e.to_string()))?;

    if factor > 1 {
        let (w, h) = image.dimensions();
        image = image.resize_exact((w / factor).max(1), (h / factor).max(1), FilterType::Nearest);
    }

    let (w, h) = image.dimensions();
    if w > target || h > target {
        image = image.resize(target, target, FilterType::Triangle);
    }
    Ok(image)
}

/// Encode `image` as JPEG at `quality`.
pub(crate) fn encode_at(image: &RgbImage, quality: u8) -> Result<Vec<u8>, CompressionError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(image)
        .map_err(|e| CompressionError::Encode(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_possible_truncation)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};

    /// High-frequency pattern so JPEG size tracks quality closely.
    fn noisy(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let h = (x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663)).wrapping_mul(2_654_435_761);
            Rgb([(h >> 24) as u8, (h >> 16) as u8, ((x + y) % 256) as u8])
        })
    }

    fn png(image: RgbImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn settings(max_dimension: u32, byte_budget: usize) -> MediaConfig {
        MediaConfig {
            max_dimension,
            byte_budget,
            ..MediaConfig::default()
        }
    }

    #[test]
    fn subsample_factor_for_4000_by_3000_is_two() {
        assert_eq!(subsample_factor(4000, 3000, 1024), 2);
    }

    #[test]
    fn subsample_factor_keeps_both_dimensions_above_target() {
        for (w, h) in [(4000, 3000), (8192, 8192), (5000, 2100), (2048, 2048), (1500, 9000)] {
            let f = subsample_factor(w, h, 1024);
            assert!(w / f >= 1024 && h / f >= 1024, "{w}x{h} factor {f}");
            assert!(w / (f * 2) < 1024 || h / (f * 2) < 1024, "{w}x{h} factor {f} not tight");
        }
    }

    #[test]
    fn small_images_are_not_subsampled() {
        assert_eq!(subsample_factor(800, 600, 1024), 1);
        assert_eq!(subsample_factor(1024, 1024, 1024), 1);
        assert_eq!(subsample_factor(1500, 900, 1024), 1);
    }

    #[test]
    fn bounds_are_read_without_decoding() {
        let source = png(noisy(64, 48));
        assert_eq!(read_bounds(&source).unwrap(), (64, 48));
    }

    #[test]
    fn large_source_is_fitted_to_target_long_edge() {
        let compressor = EvidenceCompressor::new(settings(256, usize::MAX));
        let result = compressor.try_compress(&png(noisy(1200, 900))).unwrap();
        assert_eq!((result.width, result.height), (256, 192));
        assert_eq!(result.quality, 75);
        assert!(result.within_budget);
    }

    #[test]
    fn encoded_size_does_not_grow_as_quality_drops() {
        let image = noisy(320, 240);
        let sizes: Vec<usize> = [75u8, 65, 55, 45, 40]
            .iter()
            .map(|&q| encode_at(&image, q).unwrap().len())
            .collect();
        for pair in sizes.windows(2) {
            assert!(pair[1] <= pair[0], "sizes not monotonic: {sizes:?}");
        }
    }

    #[test]
    fn first_quality_within_budget_is_returned() {
        let image = noisy(320, 240);
        let at_55 = encode_at(&image, 55).unwrap().len();
        let at_65 = encode_at(&image, 65).unwrap().len();
        assert!(at_65 > at_55);

        let compressor = EvidenceCompressor::new(settings(1024, at_55));
        let result = compressor.try_compress(&png(image)).unwrap();
        assert_eq!(result.quality, 55);
        assert_eq!(result.encoded_len, at_55);
        assert!(result.within_budget);
    }

    #[test]
    fn unreachable_budget_stops_at_floor_and_still_returns() {
        let compressor = EvidenceCompressor::new(settings(1024, 1));
        let result = compressor.try_compress(&png(noisy(160, 120))).unwrap();
        assert_eq!(result.quality, 40);
        assert!(!result.within_budget);
        assert!(!result.is_empty());
    }

    #[test]
    fn payload_is_base64_of_jpeg() {
        let compressor = EvidenceCompressor::new(MediaConfig::default());
        let result = compressor.compress(&png(noisy(32, 32)));
        let bytes = STANDARD.decode(&result.payload).unwrap();
        assert_eq!(bytes.len(), result.encoded_len);
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn undecodable_source_yields_empty_payload() {
        let compressor = EvidenceCompressor::new(MediaConfig::default());
        assert!(compressor.compress(b"definitely not an image").is_empty());
        assert!(matches!(
            compressor.try_compress(b"definitely not an image"),
            Err(CompressionError::Unreadable(_))
        ));
    }
}
