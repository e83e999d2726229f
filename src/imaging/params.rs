//! Parameter types for the watermark pipeline.
//!
//! These structs describe *what* to stamp and *where*, not *how*. They are
//! the interface between the batch runner in [`process`](crate::process)
//! (which builds one [`ImageJob`] per discovered file) and the
//! [`backend`](super::backend) (which does the pixel work).
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100). Clamped on construction.
//! - [`FontSizing`]: Fixed pixel size or a fraction of the image width.
//! - [`WatermarkSpec`]: Text, color, opacity, optional stroke, font reference.
//! - [`Position`]: Named anchor for a single watermark instance.
//! - [`PlacementSpec`]: Anchored or tiled placement; exactly one per run.
//! - [`ImageJob`]: Everything needed to watermark one file.

use image::Rgb;
use std::path::PathBuf;

/// Font size used when neither a fixed nor a relative size is requested.
pub const DEFAULT_FONT_SIZE: u32 = 48;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(100)
    }
}

/// How the effective font size is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FontSizing {
    /// Size in pixels.
    Fixed(u32),
    /// Rendered text width as a fraction of the image width.
    Relative(f32),
}

impl FontSizing {
    /// Resolve the sizing rule: a fixed size wins, then a relative fraction,
    /// then [`DEFAULT_FONT_SIZE`].
    pub fn resolve(fixed: Option<u32>, relative: Option<f32>) -> Self {
        match (fixed, relative) {
            (Some(size), _) => Self::Fixed(size),
            (None, Some(fraction)) => Self::Relative(fraction),
            (None, None) => Self::Fixed(DEFAULT_FONT_SIZE),
        }
    }
}

/// Text outline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub width: u32,
    pub color: Rgb<u8>,
}

/// What to draw: the watermark text and its styling.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkSpec {
    pub text: String,
    pub color: Rgb<u8>,
    /// Alpha channel value (0-255) applied to fill and stroke.
    pub alpha: u8,
    pub stroke: Option<Stroke>,
    pub font_path: Option<PathBuf>,
    pub sizing: FontSizing,
}

impl WatermarkSpec {
    /// Stroke width in pixels, 0 when no outline is drawn.
    pub fn stroke_width(&self) -> u32 {
        self.stroke.map(|s| s.width).unwrap_or(0)
    }
}

/// Named anchor for a single watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Top,
    Bottom,
    Left,
    Right,
}

impl Position {
    pub const KEYWORDS: &'static [&'static str] = &[
        "center",
        "centered",
        "top-left",
        "top-right",
        "bottom-left",
        "bottom-right",
        "top",
        "bottom",
        "left",
        "right",
    ];

    /// Parse a position keyword. Case and spaces are normalized
    /// (`"Top Left"` → `top-left`), `centered` is an alias of `center`, and
    /// anything unrecognized falls back to bottom-right.
    pub fn parse(value: &str) -> Self {
        let key = value.trim().to_lowercase().replace(' ', "-");
        match key.as_str() {
            "center" | "centered" => Self::Center,
            "top-left" => Self::TopLeft,
            "top-right" => Self::TopRight,
            "bottom-left" => Self::BottomLeft,
            "bottom-right" => Self::BottomRight,
            "top" => Self::Top,
            "bottom" => Self::Bottom,
            "left" => Self::Left,
            "right" => Self::Right,
            _ => Self::BottomRight,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Tiled repetition of the watermark across the whole canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSpec {
    pub spacing_x: i64,
    pub spacing_y: i64,
    pub offset_x: i64,
    pub offset_y: i64,
    /// Rotation in degrees, counter-clockwise.
    pub angle: f32,
    /// Overrides [`WatermarkSpec::alpha`] for the whole tiled layer.
    pub alpha: Option<u8>,
}

/// Where to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlacementSpec {
    Anchored { position: Position, margin: i64 },
    Tiled(TileSpec),
}

/// One file's worth of work. Built once per discovered image, consumed by
/// the backend, then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageJob {
    pub source: PathBuf,
    pub output: PathBuf,
    pub watermark: WatermarkSpec,
    pub placement: PlacementSpec,
    pub quality: Quality,
}
