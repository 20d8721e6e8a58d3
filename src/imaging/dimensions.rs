//! Declarative descriptions of image versions.
//!
//! A [`DimensionSpec`] names a version (`"thumb"`, `"large"`, ...) and says how
//! it is derived from the original: target box, crop or fit, whether small
//! sources may be enlarged, an optional background fill and encoding quality.
//!
//! ```text
//! thumb   64x64    cropped            → exactly 64x64, overflow cut away
//! large   1200x?   resized            → 1200 wide, height from aspect ratio
//! card    400x300  resized(#ffffff)   → exactly 400x300, white letterbox
//! ```
//!
//! Builders never validate; [`DimensionSpec::validate`] is run by the
//! orchestrator before a spec is used and by config loading.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Longest version name a repository will store.
pub const MAX_VERSION_NAME_LEN: usize = 45;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    #[error("quality must be 0-100, got {0}")]
    Quality(u32),
    #[error("version name must not be empty")]
    EmptyVersion,
    #[error("version name `{0}` is longer than {MAX_VERSION_NAME_LEN} characters")]
    VersionTooLong(String),
    #[error("version name `{0}` must not contain path separators")]
    VersionSeparator(String),
    #[error("`{0}` target width and height must be positive")]
    ZeroDimension(String),
    #[error("invalid background color `{0}`, expected #RGB, #RRGGBB or #RRGGBBAA")]
    Color(String),
}

/// Solid RGBA fill used to pad underfilled versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BackgroundColor(pub [u8; 4]);

impl BackgroundColor {
    pub const WHITE: Self = Self([255, 255, 255, 255]);
    pub const BLACK: Self = Self([0, 0, 0, 255]);

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA`; the `#` is optional.
    pub fn parse(value: &str) -> Result<Self, SpecError> {
        let hex = value.trim().trim_start_matches('#');
        let invalid = || SpecError::Color(value.to_string());
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
        match hex.len() {
            3 => {
                let mut rgba = [255u8; 4];
                for (i, c) in hex.chars().enumerate() {
                    let nibble = channel(&c.to_string())?;
                    rgba[i] = nibble * 17;
                }
                Ok(Self(rgba))
            }
            6 | 8 => {
                let mut rgba = [255u8; 4];
                for i in 0..hex.len() / 2 {
                    rgba[i] = channel(&hex[i * 2..i * 2 + 2])?;
                }
                Ok(Self(rgba))
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for BackgroundColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        if a == 255 {
            write!(f, "#{r:02x}{g:02x}{b:02x}")
        } else {
            write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

impl TryFrom<String> for BackgroundColor {
    type Error = SpecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BackgroundColor> for String {
    fn from(color: BackgroundColor) -> Self {
        color.to_string()
    }
}

/// How a version is derived from its source image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DimensionSpec {
    /// Version name, unique within one image (`"thumb"`, `"small"`, ...).
    pub version: String,
    /// Target width, or `None` to derive it from the source aspect ratio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Target height, or `None` to derive it from the source aspect ratio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Fill the box exactly and crop overflow (true), or fit inside it (false).
    #[serde(default = "default_true")]
    pub crop_to_fit: bool,
    /// Allow sources smaller than the box to be scaled up.
    #[serde(default = "default_true")]
    pub enlarge: bool,
    /// Pad underfilled results to the exact box with this color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<BackgroundColor>,
    /// Encoding quality, 0-100.
    #[serde(default = "default_quality")]
    pub quality: u32,
}

fn default_true() -> bool {
    true
}

fn default_quality() -> u32 {
    90
}

impl DimensionSpec {
    /// A spec for `version`; with neither dimension set the version is an
    /// unscaled copy of the source.
    pub fn new(version: impl Into<String>, width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            version: version.into(),
            width,
            height,
            crop_to_fit: true,
            enlarge: true,
            background: None,
            quality: default_quality(),
        }
    }

    /// Fill the whole box, cropping overflow. Enables enlarging.
    pub fn as_cropped(mut self) -> Self {
        self.crop_to_fit = true;
        self.enlarge = true;
        self
    }

    /// Fit inside the box. With a background the result is padded to the
    /// exact box; without one it keeps the source aspect ratio. Enables
    /// enlarging.
    pub fn as_resized(mut self, background: Option<BackgroundColor>) -> Self {
        self.crop_to_fit = false;
        self.enlarge = true;
        self.background = background;
        self
    }

    pub fn enlarge(mut self, value: bool) -> Self {
        self.enlarge = value;
        self
    }

    pub fn with_quality(mut self, value: u32) -> Self {
        self.quality = value;
        self
    }

    /// Neither dimension set: the version is a plain copy.
    pub fn is_identity(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }

    pub fn validate(&self) -> Result<(), SpecError> {
        validate_version_name(&self.version)?;
        if self.width == Some(0) || self.height == Some(0) {
            return Err(SpecError::ZeroDimension(self.version.clone()));
        }
        if self.quality > 100 {
            return Err(SpecError::Quality(self.quality));
        }
        Ok(())
    }
}

/// Version names end up inside file names, so they must be short and flat.
pub fn validate_version_name(name: &str) -> Result<(), SpecError> {
    if name.is_empty() {
        return Err(SpecError::EmptyVersion);
    }
    if name.chars().count() > MAX_VERSION_NAME_LEN {
        return Err(SpecError::VersionTooLong(name.to_string()));
    }
    if name.contains(['/', '\\']) {
        return Err(SpecError::VersionSeparator(name.to_string()));
    }
    Ok(())
}
