//! Pure calculation functions for version geometry.
//!
//! All functions here are pure and testable without any I/O or pixels. The
//! [`resize`](super::resize) engine turns a [`VersionPlan`] into pixels; this
//! module decides what the plan is.
//!
//! Boxes are `(width, height)` tuples. "A contains B" means A is at least as
//! large as B on both axes.

use super::dimensions::{BackgroundColor, DimensionSpec};
use super::resize::ResizeError;

/// Scaling mode derived from [`DimensionSpec::crop_to_fit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Fit the whole source inside the box.
    Inset,
    /// Fill the box and cut away the overflow.
    Outbound,
}

impl Mode {
    pub fn for_spec(spec: &DimensionSpec) -> Self {
        if spec.crop_to_fit {
            Mode::Outbound
        } else {
            Mode::Inset
        }
    }
}

/// Rectangle cut out of a (possibly scaled) image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Scale and crop steps, in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizePlan {
    /// Exact size to resample the source to, if any.
    pub scale_to: Option<(u32, u32)>,
    /// Crop applied after scaling, if any.
    pub crop: Option<CropBox>,
    /// Size of the image after scale and crop.
    pub output: (u32, u32),
}

impl ResizePlan {
    fn unchanged(source: (u32, u32)) -> Self {
        Self {
            scale_to: None,
            crop: None,
            output: source,
        }
    }
}

/// Solid canvas the produced image is pasted onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding {
    pub canvas: (u32, u32),
    pub offset: (i64, i64),
    pub color: BackgroundColor,
}

/// Everything needed to derive one version from a source of known size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPlan {
    pub resize: ResizePlan,
    pub padding: Option<Padding>,
}

impl VersionPlan {
    /// Final dimensions of the derived image.
    pub fn dimensions(&self) -> (u32, u32) {
        self.padding
            .map(|p| p.canvas)
            .unwrap_or(self.resize.output)
    }
}

fn contains(outer: (u32, u32), inner: (u32, u32)) -> bool {
    outer.0 >= inner.0 && outer.1 >= inner.1
}

/// Scale a box, rounding each axis to the nearest pixel (at least 1).
fn scale_box(size: (u32, u32), ratio: f64) -> (u32, u32) {
    let axis = |v: u32| ((v as f64 * ratio).round() as u32).max(1);
    (axis(size.0), axis(size.1))
}

/// Fill in a missing target dimension from the source aspect ratio.
///
/// Returns `None` when both are missing (identity copy). The missing side is
/// rounded up: a 200x100 source asked for width 100 gets height
/// `ceil(100 * (100 / 200)) = 50`.
pub fn resolve_target(
    source: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
) -> Option<(u32, u32)> {
    let (src_w, src_h) = (source.0 as f64, source.1 as f64);
    match (width, height) {
        (None, None) => None,
        (Some(w), Some(h)) => Some((w, h)),
        (Some(w), None) => Some((w, (src_h * (w as f64 / src_w)).ceil() as u32)),
        (None, Some(h)) => Some(((src_w * (h as f64 / src_h)).ceil() as u32, h)),
    }
}

/// Plan the scale and crop of `source` into `target`.
///
/// The OUTBOUND branch deliberately keeps two containment checks apart: the
/// enlarge-skip path clamps the box against the *unscaled* source and crops
/// from it, while the regular path crops from the *scaled* image.
pub fn plan_thumbnail(
    source: (u32, u32),
    target: (u32, u32),
    mode: Mode,
    enlarge: bool,
) -> ResizePlan {
    if contains(target, source) && !enlarge {
        return ResizePlan::unchanged(source);
    }

    let ratios = (
        target.0 as f64 / source.0 as f64,
        target.1 as f64 / source.1 as f64,
    );

    match mode {
        Mode::Inset => {
            let scaled = scale_box(source, ratios.0.min(ratios.1));
            ResizePlan {
                scale_to: Some(scaled),
                crop: None,
                output: scaled,
            }
        }
        Mode::Outbound => {
            let (image_size, size, scale_to) = if !contains(source, target) && !enlarge {
                let clamped = (source.0.min(target.0), source.1.min(target.1));
                (source, clamped, None)
            } else {
                let scaled = scale_box(source, ratios.0.max(ratios.1));
                (scaled, target, Some(scaled))
            };

            let origin = |image: u32, wanted: u32| -> u32 {
                ((image as f64 - wanted as f64) / 2.0).round().max(0.0) as u32
            };
            let x = origin(image_size.0, size.0);
            let y = origin(image_size.1, size.1);
            let crop = CropBox {
                x,
                y,
                width: size.0.min(image_size.0 - x),
                height: size.1.min(image_size.1 - y),
            };
            let output = (crop.width, crop.height);
            let crop = (output != image_size).then_some(crop);

            ResizePlan {
                scale_to,
                crop,
                output,
            }
        }
    }
}

/// Center `produced` on a `target` canvas, or `None` when it already fills it.
pub fn plan_padding(
    target: (u32, u32),
    produced: (u32, u32),
    color: BackgroundColor,
) -> Option<Padding> {
    if contains(produced, target) {
        return None;
    }
    let offset = |t: u32, p: u32| ((t as f64 - p as f64) / 2.0).round() as i64;
    Some(Padding {
        canvas: target,
        offset: (offset(target.0, produced.0), offset(target.1, produced.1)),
        color,
    })
}

/// Plan a whole version: target resolution, scale/crop, optional padding.
pub fn plan_version(
    source: (u32, u32),
    spec: &DimensionSpec,
) -> Result<VersionPlan, ResizeError> {
    if source.0 == 0 || source.1 == 0 {
        return Err(ResizeError::EmptySource);
    }

    let Some(target) = resolve_target(source, spec.width, spec.height) else {
        return Ok(VersionPlan {
            resize: ResizePlan::unchanged(source),
            padding: None,
        });
    };
    if target.0 == 0 || target.1 == 0 {
        return Err(ResizeError::EmptyTarget {
            version: spec.version.clone(),
            width: target.0,
            height: target.1,
        });
    }

    let resize = plan_thumbnail(source, target, Mode::for_spec(spec), spec.enlarge);
    let padding = spec
        .background
        .and_then(|color| plan_padding(target, resize.output, color));

    Ok(VersionPlan { resize, padding })
}

/// Box that holds `source` rotated clockwise by `degrees`.
///
/// Never smaller than the source on either axis, so the unrotated image
/// always fits before it is turned.
pub fn rotated_bounds(source: (u32, u32), degrees: i32) -> (u32, u32) {
    let (sin, cos) = f64::from(degrees).to_radians().sin_cos();
    let (sin, cos) = (sin.abs(), cos.abs());
    let (w, h) = (f64::from(source.0), f64::from(source.1));
    // Trim float noise so exact fits (e.g. 180 degrees) do not grow by one.
    let axis = |v: f64| (v - 1e-9).ceil().max(1.0) as u32;
    (
        axis(w * cos + h * sin).max(source.0),
        axis(w * sin + h * cos).max(source.1),
    )
}
