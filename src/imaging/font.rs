//! Font resolution, measurement, and glyph rasterization.
//!
//! | Concern | Crate / function |
//! |---|---|
//! | TrueType/OpenType outlines | `rusttype` (`Font::layout`, `PositionedGlyph::draw`) |
//! | Built-in fallback | `font8x8::BASIC_FONTS`, fixed 8px cells, not scalable |
//!
//! ## Resolution chain
//!
//! A font is resolved by trying strategies in order until one yields a font:
//!
//! 1. The explicit `font_path`, if one was given.
//! 2. The first existing file from [`SYSTEM_FONT_CANDIDATES`].
//! 3. The built-in bitmap font, with a warning.
//!
//! A font file that exists but fails to load is never fatal; the chain moves
//! on. Relative sizing probes at [`PROBE_SIZE`] and scales linearly, see
//! [`font_for_relative_width`].

use super::calculations::{relative_target_width, scaled_font_size};
use super::params::{FontSizing, WatermarkSpec};
use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{GrayImage, Luma};
use rusttype::{Font, PositionedGlyph, Rect, Scale, point};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Provisional size used to measure text before relative scaling.
pub const PROBE_SIZE: u32 = 100;

/// Extra pixels between lines of multi-line text.
pub const LINE_SPACING: u32 = 4;

/// Largest text buffer (stroke included) one watermark may allocate.
pub const MAX_TEXT_PIXELS: u64 = 1 << 26;

/// Side of one built-in bitmap glyph cell.
const BITMAP_CELL: u32 = 8;

/// Well-known font locations, checked in order.
pub const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    r"C:\Windows\Fonts\arial.ttf",
    r"C:\Windows\Fonts\calibri.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Helvetica.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
];

/// Why a resolution strategy did not produce a font.
#[derive(Error, Debug)]
pub enum FontMiss {
    #[error("could not load font at '{}': {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },
    #[error("no system font found")]
    NoCandidate,
}

/// Rendered text would exceed [`MAX_TEXT_PIXELS`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("watermark text would be {width}x{height} px, over the {MAX_TEXT_PIXELS} pixel limit")]
pub struct TextTooLarge {
    pub width: u64,
    pub height: u64,
}

/// Ink box of `width` x `height` grown by `stroke` on every side, or an
/// error when the result is over [`MAX_TEXT_PIXELS`].
pub fn padded_box(width: u64, height: u64, stroke: u32) -> Result<(u32, u32), TextTooLarge> {
    let padded_w = width.saturating_add(2 * stroke as u64);
    let padded_h = height.saturating_add(2 * stroke as u64);
    let too_large = TextTooLarge {
        width: padded_w,
        height: padded_h,
    };
    match padded_w.checked_mul(padded_h) {
        Some(pixels) if pixels <= MAX_TEXT_PIXELS => Ok((
            u32::try_from(padded_w).map_err(|_| too_large)?,
            u32::try_from(padded_h).map_err(|_| too_large)?,
        )),
        _ => Err(too_large),
    }
}

/// A font ready to rasterize text.
#[derive(Clone)]
pub enum LoadedFont {
    /// Scalable outline font at a pixel size.
    Outline {
        font: Font<'static>,
        size: u32,
        source: PathBuf,
    },
    /// Built-in 8x8 bitmap font. Ignores size requests.
    Bitmap,
}

impl std::fmt::Debug for LoadedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outline { size, source, .. } => f
                .debug_struct("Outline")
                .field("size", size)
                .field("source", source)
                .finish(),
            Self::Bitmap => f.write_str("Bitmap"),
        }
    }
}

impl LoadedFont {
    /// Load an outline font from disk at `size` pixels.
    pub fn from_file(path: &Path, size: u32) -> Result<Self, FontMiss> {
        let data = std::fs::read(path).map_err(|e| FontMiss::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let font = Font::try_from_vec(data).ok_or_else(|| FontMiss::Unreadable {
            path: path.to_path_buf(),
            reason: "not a TrueType/OpenType font".into(),
        })?;
        Ok(Self::Outline {
            font,
            size: size.max(1),
            source: path.to_path_buf(),
        })
    }

    pub fn is_scalable(&self) -> bool {
        matches!(self, Self::Outline { .. })
    }

    /// Pixel size for outline fonts, `None` for the bitmap font.
    pub fn size(&self) -> Option<u32> {
        match self {
            Self::Outline { size, .. } => Some(*size),
            Self::Bitmap => None,
        }
    }

    /// Same face at another size. The bitmap font is returned unchanged.
    pub fn with_size(&self, size: u32) -> Self {
        match self {
            Self::Outline { font, source, .. } => Self::Outline {
                font: font.clone(),
                size: size.max(1),
                source: source.clone(),
            },
            Self::Bitmap => Self::Bitmap,
        }
    }

    /// Coverage mask of the text's ink box: ink starts at (0, 0), each pixel
    /// holds glyph coverage 0-255. Lines are split on `\n`. Empty text gives
    /// a 0x0 mask. The box is checked against [`MAX_TEXT_PIXELS`] before
    /// anything is allocated.
    pub fn rasterize(&self, text: &str) -> Result<GrayImage, TextTooLarge> {
        match self {
            Self::Outline { font, size, .. } => rasterize_outline(font, *size as f32, text),
            Self::Bitmap => rasterize_bitmap(text),
        }
    }

    /// Width and height of the rendered text, including `stroke_width` on
    /// every side.
    pub fn measure(&self, text: &str, stroke_width: u32) -> Result<(u32, u32), TextTooLarge> {
        let mask = self.rasterize(text)?;
        padded_box(mask.width() as u64, mask.height() as u64, stroke_width)
    }
}

fn union(a: Rect<i32>, b: Rect<i32>) -> Rect<i32> {
    Rect {
        min: point(a.min.x.min(b.min.x), a.min.y.min(b.min.y)),
        max: point(a.max.x.max(b.max.x), a.max.y.max(b.max.y)),
    }
}

fn rasterize_outline(font: &Font<'static>, size: f32, text: &str) -> Result<GrayImage, TextTooLarge> {
    let scale = Scale::uniform(size);
    let v_metrics = font.v_metrics(scale);
    let line_advance =
        (v_metrics.ascent - v_metrics.descent + v_metrics.line_gap).ceil() + LINE_SPACING as f32;

    let glyphs: Vec<PositionedGlyph<'_>> = text
        .split('\n')
        .enumerate()
        .flat_map(|(i, line)| {
            font.layout(
                line,
                scale,
                point(0.0, v_metrics.ascent + i as f32 * line_advance),
            )
        })
        .collect();

    let Some(bounds) = glyphs
        .iter()
        .filter_map(|g| g.pixel_bounding_box())
        .reduce(union)
    else {
        return Ok(GrayImage::new(0, 0));
    };

    let (width, height) = padded_box(
        (bounds.max.x as i64 - bounds.min.x as i64).max(0) as u64,
        (bounds.max.y as i64 - bounds.min.y as i64).max(0) as u64,
        0,
    )?;
    let mut mask = GrayImage::new(width, height);

    for glyph in &glyphs {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        let origin_x = (bb.min.x - bounds.min.x) as u32;
        let origin_y = (bb.min.y - bounds.min.y) as u32;
        glyph.draw(|gx, gy, coverage| {
            let (px, py) = (origin_x + gx, origin_y + gy);
            if px >= width || py >= height {
                return;
            }
            let value = (coverage * 255.0).round().clamp(0.0, 255.0) as u8;
            let current = mask.get_pixel_mut(px, py);
            // Overlapping glyphs (kerning pairs) keep the stronger coverage
            if value > current[0] {
                *current = Luma([value]);
            }
        });
    }

    Ok(mask)
}

fn rasterize_bitmap(text: &str) -> Result<GrayImage, TextTooLarge> {
    let lines: Vec<&str> = text.split('\n').collect();
    let columns = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u64;
    if columns == 0 {
        return Ok(GrayImage::new(0, 0));
    }
    let rows = lines.len() as u64;
    let (width, height) = padded_box(
        columns * BITMAP_CELL as u64,
        rows * BITMAP_CELL as u64 + (rows - 1) * LINE_SPACING as u64,
        0,
    )?;
    let mut mask = GrayImage::new(width, height);

    for (row, line) in lines.iter().enumerate() {
        let top = row as u32 * (BITMAP_CELL + LINE_SPACING);
        for (col, ch) in line.chars().enumerate() {
            let glyph = BASIC_FONTS
                .get(ch)
                .or_else(|| BASIC_FONTS.get('?'))
                .unwrap_or([0; 8]);
            let left = col as u32 * BITMAP_CELL;
            for (gy, bits) in glyph.into_iter().enumerate() {
                for gx in 0..BITMAP_CELL {
                    if (bits >> gx) & 1 == 1 {
                        mask.put_pixel(left + gx, top + gy as u32, Luma([255]));
                    }
                }
            }
        }
    }

    Ok(mask)
}

/// One step of the resolution chain.
enum FontStrategy<'a> {
    Explicit(&'a Path),
    SystemCandidates(&'a [&'a str]),
}

impl FontStrategy<'_> {
    fn attempt(&self, size: u32) -> Result<LoadedFont, FontMiss> {
        match self {
            Self::Explicit(path) => LoadedFont::from_file(path, size),
            Self::SystemCandidates(candidates) => {
                let path = candidates
                    .iter()
                    .map(Path::new)
                    .find(|p| p.exists())
                    .ok_or(FontMiss::NoCandidate)?;
                LoadedFont::from_file(path, size)
            }
        }
    }
}

/// Resolve a font at `size` through the fallback chain. Never fails: the
/// last resort is the built-in bitmap font.
pub fn resolve_font(explicit: Option<&Path>, size: u32) -> LoadedFont {
    let mut chain = Vec::with_capacity(2);
    if let Some(path) = explicit {
        chain.push(FontStrategy::Explicit(path));
    }
    chain.push(FontStrategy::SystemCandidates(SYSTEM_FONT_CANDIDATES));

    for strategy in &chain {
        match strategy.attempt(size) {
            Ok(font) => return font,
            Err(miss @ FontMiss::Unreadable { .. }) => warn!("{miss}. Falling back."),
            Err(miss) => debug!("{miss}"),
        }
    }

    warn!("Falling back to the built-in bitmap font (fixed size). Consider providing --font-path.");
    LoadedFont::Bitmap
}

/// Font sized so `text` renders `round(fraction * image_width)` pixels wide.
///
/// Renders once at [`PROBE_SIZE`], measures (stroke included), and scales
/// the size linearly. Rasterizers are not exactly linear, so the result is
/// approximate. A zero-width probe or the bitmap font returns the probe
/// font unscaled.
pub fn font_for_relative_width(
    text: &str,
    fraction: f32,
    image_width: u32,
    font_path: Option<&Path>,
    stroke_width: u32,
) -> LoadedFont {
    let probe = resolve_font(font_path, PROBE_SIZE);
    if !probe.is_scalable() {
        return probe;
    }
    let measured = match probe.measure(text, stroke_width) {
        Ok((0, _)) => return probe,
        Ok((width, _)) => width,
        // Rendering reports the oversize box later
        Err(_) => return probe,
    };
    let target = relative_target_width(fraction, image_width);
    let size = scaled_font_size(PROBE_SIZE, measured, target);
    debug!(measured, target, size, "scaled font for relative width");
    probe.with_size(size)
}

/// Font for a watermark on an image `image_width` pixels wide.
pub fn font_for_spec(spec: &WatermarkSpec, image_width: u32) -> LoadedFont {
    match spec.sizing {
        FontSizing::Fixed(size) => resolve_font(spec.font_path.as_deref(), size),
        FontSizing::Relative(fraction) => font_for_relative_width(
            &spec.text,
            fraction,
            image_width,
            spec.font_path.as_deref(),
            spec.stroke_width(),
        ),
    }
}
