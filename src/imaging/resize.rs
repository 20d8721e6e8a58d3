//! The resize engine: source image + [`DimensionSpec`] → derived image.
//!
//! Pure and deterministic. Geometry comes from
//! [`plan_version`](super::calculations::plan_version); this module only
//! executes the plan (Lanczos3 resample, crop, paste onto a background
//! canvas). The result keeps the source's color type, so a grayscale or
//! 16-bit source yields a grayscale or 16-bit version, padding included.

use super::calculations::{Padding, VersionPlan, plan_version};
use super::dimensions::DimensionSpec;
use image::imageops::{self, FilterType};
use image::metadata::Orientation;
use image::{DynamicImage, GenericImageView, ImageBuffer, Luma, LumaA, Pixel, Rgb, Rgba};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResizeError {
    #[error("source image has no pixels")]
    EmptySource,
    #[error("`{version}` resolves to an empty {width}x{height} box")]
    EmptyTarget {
        version: String,
        width: u32,
        height: u32,
    },
}

/// A decoded image, plus the orientation its container asked for.
#[derive(Debug, Clone)]
pub struct SourceImage {
    image: DynamicImage,
    orientation: Orientation,
}

impl SourceImage {
    pub fn new(image: DynamicImage) -> Self {
        Self::with_orientation(image, Orientation::NoTransforms)
    }

    pub fn with_orientation(image: DynamicImage, orientation: Orientation) -> Self {
        Self { image, orientation }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }
}

/// A version's pixels. Its size may differ from the requested box when the
/// aspect ratio was kept without padding.
#[derive(Debug, Clone)]
pub struct DerivedImage {
    image: DynamicImage,
}

impl DerivedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }
}

/// Derive one version from `source`.
pub fn generate(source: &SourceImage, spec: &DimensionSpec) -> Result<DerivedImage, ResizeError> {
    let plan = plan_version(source.dimensions(), spec)?;
    Ok(DerivedImage {
        image: apply_plan(source.image(), &plan),
    })
}

/// Execute a plan against pixels.
pub fn apply_plan(image: &DynamicImage, plan: &VersionPlan) -> DynamicImage {
    let mut out = match plan.resize.scale_to {
        Some((w, h)) => image.resize_exact(w, h, FilterType::Lanczos3),
        None => image.clone(),
    };
    if let Some(crop) = plan.resize.crop {
        out = out.crop_imm(crop.x, crop.y, crop.width, crop.height);
    }
    if let Some(padding) = &plan.padding {
        out = pad(&out, padding);
    }
    out
}

/// Apply a generic buffer operation to whichever pixel type `image` holds,
/// keeping that type. Unknown variants are handled as 8-bit RGBA.
macro_rules! map_buffer {
    ($image:expr, |$buffer:ident| $body:expr) => {{
        use ::image::DynamicImage as D;
        match $image {
            D::ImageLuma8($buffer) => D::ImageLuma8($body),
            D::ImageLumaA8($buffer) => D::ImageLumaA8($body),
            D::ImageRgb8($buffer) => D::ImageRgb8($body),
            D::ImageRgba8($buffer) => D::ImageRgba8($body),
            D::ImageLuma16($buffer) => D::ImageLuma16($body),
            D::ImageLumaA16($buffer) => D::ImageLumaA16($body),
            D::ImageRgb16($buffer) => D::ImageRgb16($body),
            D::ImageRgba16($buffer) => D::ImageRgba16($body),
            D::ImageRgb32F($buffer) => D::ImageRgb32F($body),
            D::ImageRgba32F($buffer) => D::ImageRgba32F($body),
            other => {
                let converted = other.to_rgba8();
                let $buffer = &converted;
                D::ImageRgba8($body)
            }
        }
    }};
}
pub(crate) use map_buffer;

fn pad(image: &DynamicImage, padding: &Padding) -> DynamicImage {
    let (width, height) = padding.canvas;
    let (x, y) = padding.offset;
    let color = padding.color.0;
    map_buffer!(image, |buffer| place_on_canvas(buffer, width, height, x, y, color))
}

/// A pixel type a background colour can be expressed in.
///
/// Channels are widened from 8 bits (`v * 257` for 16-bit, `v / 255` for
/// float) so a white background stays full-scale white.
pub(crate) trait CanvasPixel: Pixel {
    fn from_rgba8(color: [u8; 4]) -> Self;
}

fn wide16(color: [u8; 4]) -> Rgba<u16> {
    Rgba(color.map(|v| u16::from(v) * 257))
}

fn float(color: [u8; 4]) -> Rgba<f32> {
    Rgba(color.map(|v| f32::from(v) / 255.0))
}

impl CanvasPixel for Luma<u8> {
    fn from_rgba8(color: [u8; 4]) -> Self {
        Rgba(color).to_luma()
    }
}

impl CanvasPixel for LumaA<u8> {
    fn from_rgba8(color: [u8; 4]) -> Self {
        Rgba(color).to_luma_alpha()
    }
}

impl CanvasPixel for Rgb<u8> {
    fn from_rgba8(color: [u8; 4]) -> Self {
        Rgba(color).to_rgb()
    }
}

impl CanvasPixel for Rgba<u8> {
    fn from_rgba8(color: [u8; 4]) -> Self {
        Rgba(color)
    }
}

impl CanvasPixel for Luma<u16> {
    fn from_rgba8(color: [u8; 4]) -> Self {
        wide16(color).to_luma()
    }
}

impl CanvasPixel for LumaA<u16> {
    fn from_rgba8(color: [u8; 4]) -> Self {
        wide16(color).to_luma_alpha()
    }
}

impl CanvasPixel for Rgb<u16> {
    fn from_rgba8(color: [u8; 4]) -> Self {
        wide16(color).to_rgb()
    }
}

impl CanvasPixel for Rgba<u16> {
    fn from_rgba8(color: [u8; 4]) -> Self {
        wide16(color)
    }
}

impl CanvasPixel for Rgb<f32> {
    fn from_rgba8(color: [u8; 4]) -> Self {
        float(color).to_rgb()
    }
}

impl CanvasPixel for Rgba<f32> {
    fn from_rgba8(color: [u8; 4]) -> Self {
        float(color)
    }
}

/// Paste `buffer` at `(x, y)` onto a `width`x`height` canvas filled with
/// `color`. Parts that fall outside the canvas are clipped.
pub(crate) fn place_on_canvas<P: CanvasPixel>(
    buffer: &ImageBuffer<P, Vec<P::Subpixel>>,
    width: u32,
    height: u32,
    x: i64,
    y: i64,
    color: [u8; 4],
) -> ImageBuffer<P, Vec<P::Subpixel>> {
    let mut canvas = ImageBuffer::from_pixel(width, height, P::from_rgba8(color));
    imageops::replace(&mut canvas, buffer, x, y);
    canvas
}
