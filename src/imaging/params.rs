//! Parameter types for image operations.
//!
//! These describe *what* to do, not *how*. They sit between the orchestration
//! layer (which decides what to encode and how to rotate) and the
//! [`backend`](super::backend) (which does the pixel and codec work).
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (0–100, default 90). Out-of-range
//!   values are rejected rather than clamped.
//! - [`Rotation`]: a clockwise rotation, normalized from degrees. Right angles
//!   have their own variants; anything else is [`Rotation::Oblique`].

use super::dimensions::SpecError;

/// Quality setting for lossy image encoding (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u32) -> Result<Self, SpecError> {
        if value > 100 {
            return Err(SpecError::Quality(value));
        }
        Ok(Self(value as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Quality as handed to encoders that divide by it (JPEG tables).
    pub(crate) fn encoder_value(self) -> u8 {
        self.0.max(1)
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Clockwise rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    Cw90,
    Cw180,
    Cw270,
    /// Any other angle, in degrees within `1..360`. The result is drawn on a
    /// canvas large enough to hold the whole rotated image.
    Oblique(i32),
}

impl Rotation {
    /// Normalize an angle in degrees; negative angles rotate counter-clockwise.
    pub fn from_degrees(angle: i32) -> Self {
        match angle.rem_euclid(360) {
            0 => Self::None,
            90 => Self::Cw90,
            180 => Self::Cw180,
            270 => Self::Cw270,
            other => Self::Oblique(other),
        }
    }

    /// Whether width and height trade places.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Self::Cw90 | Self::Cw270)
    }
}
