pub mod heif;

use image::codecs::jpeg::JpegEncoder;

use crate::core::ConversionError;

pub const DEFAULT_JPEG_QUALITY: f32 = 0.8;

/// Image capability consumed by the pipeline.
///
/// Implementations must be shareable across the blocking worker pool.
pub trait ImageCodec: Send + Sync {
    /// Whether the bytes hold a HEIC/HEIF image. Errors are I/O-level only;
    /// the pipeline treats them as "not HEIC".
    fn is_heic(&self, bytes: &[u8]) -> Result<bool, ConversionError>;

    /// Converts a HEIC/HEIF image to JPEG. `quality` is in `0.0..=1.0`.
    fn convert_to_jpeg(&self, bytes: &[u8], quality: f32) -> Result<Vec<u8>, ConversionError>;

    /// Whether `convert_to_jpeg` can decode HEIF containers at all.
    fn decodes_heif(&self) -> bool {
        true
    }
}

pub const HEIF_DECODER_MISSING: &str = "HEIC decoding requires a HEIF-capable codec";

/// Default codec: HEIF container sniffing plus the `image` crate for decoding
/// and JPEG encoding. `image` has no HEIF decoder, so HEIF input fails per file
/// with `HEIF_DECODER_MISSING`; a HEIF-capable decoder plugs in through `ImageCodec`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateCodec;

impl ImageCodec for ImageCrateCodec {
    fn is_heic(&self, bytes: &[u8]) -> Result<bool, ConversionError> {
        Ok(heif::is_heif_container(bytes))
    }

    fn convert_to_jpeg(&self, bytes: &[u8], quality: f32) -> Result<Vec<u8>, ConversionError> {
        if heif::is_heif_container(bytes) {
            return Err(ConversionError::new(HEIF_DECODER_MISSING));
        }

        let decoded = image::load_from_memory(bytes)?;
        let rgb = decoded.to_rgb8();

        let mut output = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut output, jpeg_quality(quality)))?;
        Ok(output)
    }

    fn decodes_heif(&self) -> bool {
        false
    }
}

/// Maps a `0.0..=1.0` quality to the encoder's `1..=100` scale.
pub fn jpeg_quality(quality: f32) -> u8 {
    if !quality.is_finite() {
        return (DEFAULT_JPEG_QUALITY * 100.0) as u8;
    }
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// True when the bytes look like any image format we know about.
pub fn looks_like_image(bytes: &[u8]) -> bool {
    heif::is_heif_container(bytes) || image::guess_format(bytes).is_ok()
}
