//! Manipulation configuration.
//!
//! Handles loading, validating, and merging `reframe.toml`. Stock defaults
//! are serialized to a TOML table and the user file is merged on top, so
//! a config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! backend = "raster"            # raster | fast | netpbm
//! maintain_aspect_ratio = true  # never upscale past the source
//! focus = "CENTER"              # crop anchor for non-square resizes
//! orientation = "AUTO"          # AUTO | LANDSCAPE | PORTRAIT | SQUARE
//! quality = 100                 # encoder quality (0-100)
//! cache = false                 # reuse outputs of identical runs
//!
//! [raster]
//! background = "#ffffff"        # corner fill for non-right-angle rotations
//!
//! [fast]
//! background = "#000000"
//! ```
//!
//! Unknown keys are rejected to catch typos early, and enum values must be
//! spelled exactly (upper case).

use crate::imaging::{BackendKind, Focus, Orientation, Quality, parse_hex_color};
use image::Rgba;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "reframe.toml";

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

/// Settings consumed by a manipulation session.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManipulationConfig {
    /// Backend name, matched case-insensitively.
    pub backend: String,
    /// Clamp derived sizes to the source so images are never upscaled.
    pub maintain_aspect_ratio: bool,
    /// Crop anchor applied to non-square resizes.
    pub focus: Focus,
    /// Orientation forced onto non-square resize targets.
    pub orientation: Orientation,
    /// Encoder quality, 0-100.
    pub quality: u32,
    /// Reuse previously written outputs for identical inputs.
    pub cache: bool,
    /// Options for the `raster` backend.
    pub raster: BackendOptions,
    /// Options for the `fast` backend.
    pub fast: BackendOptions,
}

impl Default for ManipulationConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Raster.as_str().to_string(),
            maintain_aspect_ratio: true,
            focus: Focus::Center,
            orientation: Orientation::Auto,
            quality: 100,
            cache: false,
            raster: BackendOptions {
                background: "#ffffff".to_string(),
            },
            fast: BackendOptions {
                background: "#000000".to_string(),
            },
        }
    }
}

impl ManipulationConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quality > 100 {
            return Err(ConfigError::Validation("quality must be 0-100".into()));
        }
        if self.backend.parse::<BackendKind>().is_err() {
            return Err(ConfigError::Validation(format!(
                "backend must be one of raster, fast, netpbm (got '{}')",
                self.backend
            )));
        }
        for (table, options) in [("raster", &self.raster), ("fast", &self.fast)] {
            if parse_hex_color(&options.background).is_none() {
                return Err(ConfigError::Validation(format!(
                    "{table}.background must be a hex color like #rrggbb (got '{}')",
                    options.background
                )));
            }
        }
        Ok(())
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }
}

/// Per-backend options, nested under the backend's own table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendOptions {
    /// Hex fill color for canvas areas a rotation uncovers.
    pub background: String,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            background: "#ffffff".to_string(),
        }
    }
}

impl BackendOptions {
    /// Parsed background; opaque white when the value is not a valid color.
    pub fn background_color(&self) -> Rgba<u8> {
        parse_hex_color(&self.background).unwrap_or(Rgba([255, 255, 255, 255]))
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ManipulationConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
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

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ManipulationConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ManipulationConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the stock defaults.
pub fn load_config(path: &Path) -> Result<ManipulationConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    if overlay.is_none() {
        tracing::debug!(path = %path.display(), "no config file, using stock defaults");
    }
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `reframe.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Reframe Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Backend that executes pixel operations: "raster", "fast" or "netpbm".
# Names are case-insensitive. "netpbm" is registered but not implemented.
backend = "raster"

# When true, resize and scale never produce an image larger than the source.
maintain_aspect_ratio = true

# Crop anchor for non-square resizes. One of:
# CENTER, NORTH, NORTHEAST, EAST, SOUTHEAST, SOUTH, SOUTHWEST, WEST, NORTHWEST
# Square resizes always crop around the center.
focus = "CENTER"

# Orientation of non-square resize targets: AUTO, LANDSCAPE, PORTRAIT, SQUARE.
# AUTO derives it from the requested width and height.
orientation = "AUTO"

# Encoder quality (0 = smallest, 100 = best).
# JPEG uses it directly; PNG maps it onto fast/default/best compression;
# other formats ignore it.
quality = 100

# Reuse the previous output when source, backend, quality and steps match.
cache = false

# ---------------------------------------------------------------------------
# Backend options
# ---------------------------------------------------------------------------
[raster]
# Fill for the corners uncovered by rotations that are not multiples of 90.
background = "#ffffff"

[fast]
background = "#000000"
"##
}
