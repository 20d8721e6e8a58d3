//! Store configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults
//! are serialized to a TOML table and the user's file is merged on top, so a
//! config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! images_root = "www/images"   # Where originals and versions are written
//! base_url = "/images"         # Public URL prefix for the same files
//! original_quality = 90        # Quality for re-encoded originals (0-100)
//!
//! # One array of tables per group; each table is a version spec.
//! [[groups.gallery]]
//! version = "thumb"
//! width = 150
//! height = 150                 # crop_to_fit defaults to true
//!
//! [[groups.gallery]]
//! version = "large"
//! width = 1200
//! crop_to_fit = false          # height follows the aspect ratio
//! enlarge = false
//! quality = 85
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::DimensionSpec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Store configuration loaded from `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Directory holding originals and versions.
    pub images_root: PathBuf,
    /// URL prefix under which `images_root` is served.
    pub base_url: String,
    /// Encoding quality for originals rewritten after autorotate or rotate.
    pub original_quality: u32,
    /// Version specs per image group, generated in listed order.
    pub groups: BTreeMap<String, Vec<DimensionSpec>>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            images_root: PathBuf::from("www/images"),
            base_url: "/images".to_string(),
            original_quality: 90,
            groups: BTreeMap::new(),
        }
    }
}

impl StoreConfig {
    /// Version specs configured for `group`, or `None` for an unknown group.
    pub fn versions_for(&self, group: &str) -> Option<&[DimensionSpec]> {
        self.groups.get(group).map(Vec::as_slice)
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.original_quality > 100 {
            return Err(ConfigError::Validation(
                "original_quality must be 0-100".into(),
            ));
        }
        for (group, specs) in &self.groups {
            let mut seen = HashSet::new();
            for spec in specs {
                spec.validate()
                    .map_err(|e| ConfigError::Validation(format!("groups.{group}: {e}")))?;
                if !seen.insert(spec.version.as_str()) {
                    return Err(ConfigError::Validation(format!(
                        "groups.{group}: version `{}` is listed twice",
                        spec.version
                    )));
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(StoreConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so a group's
///   spec list is replaced as a whole.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `config.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<StoreConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: StoreConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
pub fn load_config(dir: &Path) -> Result<StoreConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Image Versions Configuration
# ============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Directory where originals and versions are written.
images_root = "www/images"

# Public URL prefix under which images_root is served.
base_url = "/images"

# Quality (0-100) used when an original is re-encoded after autorotation,
# rotation or an in-place resize. Lossless formats ignore it.
original_quality = 90

# ---------------------------------------------------------------------------
# Groups
# ---------------------------------------------------------------------------
# Each group lists the versions generated for its images, in order.
# Images uploaded without a group keep only their original.
#
# Spec keys:
#   version      name used in file names (required, at most 45 characters)
#   width        target width; omit to derive it from the aspect ratio
#   height       target height; omit to derive it from the aspect ratio
#                (omit both for an unscaled copy)
#   crop_to_fit  true = fill the box and crop overflow (default)
#                false = fit inside the box
#   enlarge      allow scaling small sources up (default true)
#   background   "#RGB", "#RRGGBB" or "#RRGGBBAA"; pads a fitted version
#                to the exact box
#   quality      encoding quality 0-100 (default 90)
#
# [[groups.gallery]]
# version = "thumb"
# width = 150
# height = 150
#
# [[groups.gallery]]
# version = "large"
# width = 1200
# crop_to_fit = false
# enlarge = false
#
# [[groups.avatar]]
# version = "card"
# width = 400
# height = 300
# crop_to_fit = false
# background = "#ffffff"
"##
}
