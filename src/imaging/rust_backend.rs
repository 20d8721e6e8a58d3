//! Pure Rust codec backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` with format sniffing |
//! | Orientation | `ImageDecoder::orientation` + `DynamicImage::apply_orientation` |
//! | Rotate (right angles) | `DynamicImage::rotate90` / `rotate180` / `rotate270` |
//! | Rotate (other angles) | `imageops::interpolate_bilinear` onto an expanded canvas |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at the requested quality |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//! | Encode → PNG, TIFF, WebP | `DynamicImage::write_to` (lossless; quality ignored) |
//!
//! AVIF is encode-only: the `image` crate's `"avif"` feature ships the rav1e
//! encoder, not a decoder.

use super::backend::{BackendError, ImageBackend};
use super::calculations::rotated_bounds;
use super::params::{Quality, Rotation};
use super::resize::{CanvasPixel, SourceImage, map_buffer};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::interpolate_bilinear;
use image::metadata::Orientation;
use image::{ColorType, DynamicImage, ImageBuffer, ImageDecoder, ImageFormat, ImageReader};
use std::borrow::Cow;
use std::io::Cursor;

/// Backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Sniff the container format from the leading bytes.
pub fn guess_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

fn decode_error(e: image::ImageError) -> BackendError {
    BackendError::Decode(e.to_string())
}

fn encode_error(format: ImageFormat) -> impl Fn(image::ImageError) -> BackendError {
    move |e| BackendError::Encode {
        format: format!("{format:?}"),
        message: e.to_string(),
    }
}

/// JPEG has no alpha channel and only 8-bit samples.
fn jpeg_compatible(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image.color() {
        ColorType::L8 | ColorType::Rgb8 => Cow::Borrowed(image),
        ColorType::La8 | ColorType::L16 | ColorType::La16 => {
            Cow::Owned(DynamicImage::ImageLuma8(image.to_luma8()))
        }
        _ => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
    }
}

/// The WebP and AVIF encoders only take 8-bit RGB(A).
fn rgb8_compatible(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image.color() {
        ColorType::Rgb8 | ColorType::Rgba8 => Cow::Borrowed(image),
        color if color.has_alpha() => Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8())),
        _ => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
    }
}

/// Rotate clockwise by any angle onto a canvas holding the whole result.
/// Uncovered corners are white, or transparent when the image has alpha.
fn rotate_oblique(image: &DynamicImage, degrees: i32) -> DynamicImage {
    let fill = if image.color().has_alpha() {
        [0, 0, 0, 0]
    } else {
        [255, 255, 255, 255]
    };
    map_buffer!(image, |buffer| rotate_buffer(buffer, degrees, fill))
}

fn rotate_buffer<P: CanvasPixel>(
    buffer: &ImageBuffer<P, Vec<P::Subpixel>>,
    degrees: i32,
    fill: [u8; 4],
) -> ImageBuffer<P, Vec<P::Subpixel>> {
    let (w, h) = buffer.dimensions();
    let (width, height) = rotated_bounds((w, h), degrees);
    let (sin, cos) = f64::from(degrees).to_radians().sin_cos();
    let fill = P::from_rgba8(fill);
    let source_center = (f64::from(w) / 2.0, f64::from(h) / 2.0);
    let canvas_center = (f64::from(width) / 2.0, f64::from(height) / 2.0);

    // Map each output pixel centre back into the source (inverse rotation).
    ImageBuffer::from_fn(width, height, |x, y| {
        let dx = f64::from(x) + 0.5 - canvas_center.0;
        let dy = f64::from(y) + 0.5 - canvas_center.1;
        let sx = dx * cos + dy * sin + source_center.0 - 0.5;
        let sy = dy * cos - dx * sin + source_center.1 - 0.5;
        interpolate_bilinear(buffer, sx as f32, sy as f32).unwrap_or(fill)
    })
}

impl ImageBackend for RustBackend {
    fn open(&self, bytes: &[u8]) -> Result<SourceImage, BackendError> {
        let mut decoder = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .into_decoder()
            .map_err(decode_error)?;
        let orientation = decoder
            .orientation()
            .unwrap_or(Orientation::NoTransforms);
        let image = DynamicImage::from_decoder(decoder).map_err(decode_error)?;
        Ok(SourceImage::with_orientation(image, orientation))
    }

    fn autorotate(&self, image: SourceImage) -> SourceImage {
        let orientation = image.orientation();
        let mut pixels = image.into_image();
        pixels.apply_orientation(orientation);
        SourceImage::new(pixels)
    }

    fn rotate(&self, image: &SourceImage, rotation: Rotation) -> SourceImage {
        let pixels = image.image();
        let rotated = match rotation {
            Rotation::None => pixels.clone(),
            Rotation::Cw90 => pixels.rotate90(),
            Rotation::Cw180 => pixels.rotate180(),
            Rotation::Cw270 => pixels.rotate270(),
            Rotation::Oblique(degrees) => rotate_oblique(pixels, degrees),
        };
        SourceImage::new(rotated)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        extension: &str,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        let format = ImageFormat::from_extension(extension)
            .ok_or_else(|| BackendError::UnsupportedFormat(extension.to_string()))?;
        let mut buffer = Cursor::new(Vec::new());

        match format {
            ImageFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.encoder_value());
                jpeg_compatible(image)
                    .write_with_encoder(encoder)
                    .map_err(encode_error(format))?;
            }
            ImageFormat::Avif => {
                let encoder =
                    AvifEncoder::new_with_speed_quality(&mut buffer, 6, quality.encoder_value());
                rgb8_compatible(image)
                    .write_with_encoder(encoder)
                    .map_err(encode_error(format))?;
            }
            ImageFormat::WebP => {
                rgb8_compatible(image)
                    .write_to(&mut buffer, format)
                    .map_err(encode_error(format))?;
            }
            ImageFormat::Png | ImageFormat::Tiff => {
                image
                    .write_to(&mut buffer, format)
                    .map_err(encode_error(format))?;
            }
            other => {
                return Err(BackendError::UnsupportedFormat(format!("{other:?}")));
            }
        }

        Ok(buffer.into_inner())
    }
}
