//! Watermark configuration.
//!
//! Handles loading, validating, and merging watermark settings. Values are
//! layered: stock defaults are overridden by an optional TOML file, which is
//! in turn overridden by command-line flags.
//!
//! ```text
//! stock defaults  ←  --config watermark.toml  ←  --color, --opacity, ...
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [text]
//! color = "#FFFFFF"         # Hex or CSS color name
//! opacity = 0.35            # 0.0-1.0 fraction, or 0-100 percent
//! # font_path = "fonts/Inter.ttf"
//! # font_size = 48          # Fixed size in pixels (wins over rel_size)
//! # rel_size = 0.25         # Text width as fraction of image width
//! stroke_width = 0
//! stroke_color = "#000000"
//!
//! [placement]
//! position = "bottom-right"
//! margin = 32
//!
//! [tile]
//! enabled = false
//! spacing = 64              # Used for both axes unless overridden
//! # spacing_x = 64
//! # spacing_y = 64
//! offset_x = 0
//! offset_y = 0
//! angle = 0.0               # Degrees, counter-clockwise
//! # opacity = 0.2           # Overrides text.opacity for the tiled layer
//!
//! [output]
//! quality = 100             # JPEG quality 1-100
//! suffix = "_wm"
//! recursive = false
//! keep_tree = false
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{FontSizing, PlacementSpec, Position, Quality, Stroke, TileSpec, WatermarkSpec};
use image::Rgb;
use serde::{Deserialize, Serialize};
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
    #[error("Invalid color '{value}': {reason}")]
    InvalidColor { value: String, reason: String },
}

/// Watermark configuration.
///
/// All fields have defaults. Config files need only specify the values they
/// want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkConfig {
    /// Text styling and font selection.
    pub text: TextConfig,
    /// Anchored placement (ignored when tiling).
    pub placement: PlacementConfig,
    /// Tiled placement.
    pub tile: TileConfig,
    /// Output encoding and naming.
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextConfig {
    pub color: String,
    /// Fraction (`<= 1.0`) or percent (`> 1.0`).
    pub opacity: f64,
    pub font_path: Option<PathBuf>,
    pub font_size: Option<u32>,
    pub rel_size: Option<f64>,
    pub stroke_width: u32,
    pub stroke_color: String,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            color: "#FFFFFF".to_string(),
            opacity: 0.35,
            font_path: None,
            font_size: None,
            rel_size: None,
            stroke_width: 0,
            stroke_color: "#000000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlacementConfig {
    pub position: String,
    pub margin: i64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            position: "bottom-right".to_string(),
            margin: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TileConfig {
    pub enabled: bool,
    /// Gap between tiles on both axes unless an axis override is set.
    pub spacing: i64,
    pub spacing_x: Option<i64>,
    pub spacing_y: Option<i64>,
    pub offset_x: i64,
    pub offset_y: i64,
    pub angle: f64,
    pub opacity: Option<f64>,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            spacing: 64,
            spacing_x: None,
            spacing_y: None,
            offset_x: 0,
            offset_y: 0,
            angle: 0.0,
            opacity: None,
        }
    }
}

impl TileConfig {
    pub fn effective_spacing(&self) -> (i64, i64) {
        (
            self.spacing_x.unwrap_or(self.spacing),
            self.spacing_y.unwrap_or(self.spacing),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub quality: u32,
    pub suffix: String,
    pub recursive: bool,
    pub keep_tree: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            quality: 100,
            suffix: "_wm".to_string(),
            recursive: false,
            keep_tree: false,
        }
    }
}

/// Parse a hex (`#RGB`, `#RRGGBB`) or CSS named color. Alpha is ignored.
pub fn parse_color(value: &str) -> Result<Rgb<u8>, ConfigError> {
    let color = csscolorparser::parse(value.trim()).map_err(|e| ConfigError::InvalidColor {
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    let [r, g, b, _] = color.to_rgba8();
    Ok(Rgb([r, g, b]))
}

/// Convert an opacity to an alpha channel value.
///
/// Values up to 1.0 are fractions, larger values are percentages, so `0.35`
/// and `35` give the same alpha. Out-of-range input is clamped.
pub fn parse_opacity(value: f64) -> u8 {
    let fraction = if value <= 1.0 { value } else { value / 100.0 };
    (fraction * 255.0).round().clamp(0.0, 255.0) as u8
}

impl WatermarkConfig {
    /// Validate everything that would otherwise fail mid-batch.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_color(&self.text.color)?;
        parse_color(&self.text.stroke_color)?;

        if let Some(rel) = self.text.rel_size.filter(|r| *r <= 0.0 || !r.is_finite()) {
            return Err(ConfigError::Validation(format!(
                "text.rel_size must be positive, got {rel}"
            )));
        }
        if self.text.font_size == Some(0) {
            return Err(ConfigError::Validation(
                "text.font_size must be non-zero".into(),
            ));
        }
        if self.tile.enabled {
            let (sx, sy) = self.tile.effective_spacing();
            if sx < 0 || sy < 0 {
                return Err(ConfigError::Validation(format!(
                    "tile spacing must be >= 0, got ({sx}, {sy})"
                )));
            }
        }
        Ok(())
    }

    /// Build the drawing spec for `text` from the validated config.
    pub fn watermark_spec(&self, text: &str) -> Result<WatermarkSpec, ConfigError> {
        let stroke = if self.text.stroke_width > 0 {
            Some(Stroke {
                width: self.text.stroke_width,
                color: parse_color(&self.text.stroke_color)?,
            })
        } else {
            None
        };
        Ok(WatermarkSpec {
            text: text.to_string(),
            color: parse_color(&self.text.color)?,
            alpha: parse_opacity(self.text.opacity),
            stroke,
            font_path: self.text.font_path.clone(),
            sizing: FontSizing::resolve(self.text.font_size, self.text.rel_size.map(|r| r as f32)),
        })
    }

    pub fn placement_spec(&self) -> PlacementSpec {
        if self.tile.enabled {
            let (spacing_x, spacing_y) = self.tile.effective_spacing();
            PlacementSpec::Tiled(TileSpec {
                spacing_x,
                spacing_y,
                offset_x: self.tile.offset_x,
                offset_y: self.tile.offset_y,
                angle: self.tile.angle as f32,
                alpha: self.tile.opacity.map(parse_opacity),
            })
        } else {
            PlacementSpec::Anchored {
                position: Position::parse(&self.placement.position),
                margin: self.placement.margin,
            }
        }
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.output.quality)
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// Base layer for merging a user file on top. Unset optional keys are
/// absent from the table.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(WatermarkConfig::default())?)
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

/// Read a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto the stock defaults and deserialize.
///
/// Not validated: flags may still override invalid file values.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<WatermarkConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    Ok(merged.try_into()?)
}

/// Load the config layer: stock defaults, then `path` if given.
pub fn load_config(path: Option<&Path>) -> Result<WatermarkConfig, ConfigError> {
    let overlay = path.map(load_raw_config).transpose()?;
    resolve_config(overlay)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Watermark Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Pass this file with `watermark apply --config watermark.toml`.
# Command-line flags override values from the file.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Text
# ---------------------------------------------------------------------------
[text]
# Hex (#RGB, #RRGGBB) or CSS color name.
color = "#FFFFFF"

# Opacity as a fraction (0.0-1.0) or a percentage (0-100).
opacity = 0.35

# TrueType/OpenType font file. When missing or unreadable, common system
# fonts are tried, then a built-in bitmap font.
# font_path = "fonts/Inter.ttf"

# Fixed size in pixels. Wins over rel_size. Default 48 when neither is set.
# font_size = 48

# Text width as a fraction of the image width, e.g. 0.25 for a quarter.
# rel_size = 0.25

# Outline width in pixels (0 disables) and color.
stroke_width = 0
stroke_color = "#000000"

# ---------------------------------------------------------------------------
# Anchored placement (ignored when tiling)
# ---------------------------------------------------------------------------
[placement]
# center, top-left, top-right, bottom-left, bottom-right, top, bottom,
# left, right. Unknown values fall back to bottom-right.
position = "bottom-right"

# Distance from the image edges in pixels.
margin = 32

# ---------------------------------------------------------------------------
# Tiled placement
# ---------------------------------------------------------------------------
[tile]
enabled = false

# Gap between tiles in pixels, for both axes unless overridden below.
spacing = 64
# spacing_x = 64
# spacing_y = 64

# Shift of the tile grid in pixels.
offset_x = 0
offset_y = 0

# Rotation of each tile in degrees, counter-clockwise.
angle = 0.0

# Opacity for the tiled layer. Defaults to text.opacity.
# opacity = 0.2

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# JPEG quality (1-100). Other formats are written with default settings.
quality = 100

# Inserted between file stem and extension: photo.jpg -> photo_wm.jpg
suffix = "_wm"

# Descend into subfolders.
recursive = false

# Mirror the input folder structure under the output folder.
keep_tree = false
"##
}
