//! Pure Rust watermark backend.
//!
//! ## Crate mapping
//!
//! | Step | Crate / function |
//! |---|---|
//! | Format detection | `image::guess_format`, file extension as fallback |
//! | Decode (JPEG, PNG, TIFF, WebP, BMP) | `image::ImageReader::into_decoder` |
//! | Orientation | `ImageDecoder::orientation` + `DynamicImage::apply_orientation` |
//! | Text | [`render`](super::render) (rusttype / font8x8) |
//! | Encode JPEG | `JpegEncoder::new_with_quality`, EXIF/ICC re-spliced |
//! | Encode others | `DynamicImage::write_to` with the source format |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::metadata::{PreservedMetadata, extract_jpeg_metadata, insert_jpeg_segments};
use super::params::ImageJob;
use super::render::watermark_image;
use image::codecs::jpeg::JpegEncoder;
use image::metadata::Orientation;
use image::{ColorType, DynamicImage, ImageDecoder, ImageFormat, ImageReader, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-step mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// A decoded source image plus what the encoder needs to write it back.
struct SourceImage {
    image: DynamicImage,
    format: ImageFormat,
    color: ColorType,
    metadata: PreservedMetadata,
}

fn detect_format(bytes: &[u8], path: &Path) -> Result<ImageFormat, BackendError> {
    image::guess_format(bytes)
        .ok()
        .or_else(|| ImageFormat::from_path(path).ok())
        .ok_or_else(|| {
            BackendError::ProcessingFailed(format!("Unrecognized image format: {}", path.display()))
        })
}

/// Read, decode and orient an image from disk.
fn load_source(path: &Path) -> Result<SourceImage, BackendError> {
    let bytes = std::fs::read(path)?;
    let format = detect_format(&bytes, path)?;
    let metadata = if format == ImageFormat::Jpeg {
        extract_jpeg_metadata(&bytes)
    } else {
        PreservedMetadata::default()
    };

    let mut decoder = ImageReader::with_format(Cursor::new(&bytes), format).into_decoder()?;
    // Captured EXIF first, then whatever the decoder itself reports
    let orientation = match metadata.exif_payload().and_then(Orientation::from_exif_chunk) {
        Some(orientation) => orientation,
        None => decoder.orientation().unwrap_or(Orientation::NoTransforms),
    };
    let color = decoder.color_type();
    let mut image = DynamicImage::from_decoder(decoder).map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
    })?;

    if orientation != Orientation::NoTransforms {
        debug!(?orientation, path = %path.display(), "applying orientation");
        image.apply_orientation(orientation);
    }

    Ok(SourceImage {
        image,
        format,
        color,
        metadata,
    })
}

/// Convert the composited canvas to what the output format can hold.
///
/// JPEG, BMP and TIFF are always flattened to RGB. Elsewhere alpha survives
/// when the source had it, otherwise the source color type is restored.
fn convert_for_output(canvas: RgbaImage, format: ImageFormat, source: ColorType) -> DynamicImage {
    let canvas = DynamicImage::ImageRgba8(canvas);
    match format {
        ImageFormat::Jpeg | ImageFormat::Bmp | ImageFormat::Tiff => {
            DynamicImage::ImageRgb8(canvas.to_rgb8())
        }
        _ if source.has_alpha() => canvas,
        _ => match source {
            ColorType::L8 => DynamicImage::ImageLuma8(canvas.to_luma8()),
            ColorType::L16 => DynamicImage::ImageLuma16(canvas.to_luma16()),
            ColorType::Rgb16 => DynamicImage::ImageRgb16(canvas.to_rgb16()),
            _ => DynamicImage::ImageRgb8(canvas.to_rgb8()),
        },
    }
}

/// Encode into memory in `format`. JPEG uses `quality` and gets the
/// source's preserved segments back.
fn encode(
    image: &DynamicImage,
    format: ImageFormat,
    quality: u8,
    metadata: &PreservedMetadata,
) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    if format == ImageFormat::Jpeg {
        let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
        image.write_with_encoder(encoder)?;
        return Ok(insert_jpeg_segments(&buf, metadata));
    }
    image.write_to(&mut Cursor::new(&mut buf), format)?;
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn watermark(&self, job: &ImageJob) -> Result<(), BackendError> {
        let source = load_source(&job.source)?;
        debug!(
            path = %job.source.display(),
            width = source.image.width(),
            height = source.image.height(),
            format = ?source.format,
            "decoded source"
        );

        let canvas = watermark_image(&source.image, &job.watermark, &job.placement)
            .map_err(|e| BackendError::ProcessingFailed(e.to_string()))?;
        let output = convert_for_output(canvas, source.format, source.color);
        let bytes = encode(
            &output,
            source.format,
            job.quality.value() as u8,
            &source.metadata,
        )?;

        if let Some(parent) = job.output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&job.output, bytes)?;
        Ok(())
    }
}
