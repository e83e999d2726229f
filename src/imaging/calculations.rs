//! Pure placement and sizing arithmetic.
//!
//! All functions here are pure and testable without any I/O or images.
//! Coordinates are `i64` because tiled grids start off-canvas (negative
//! top-left corners) and anchored text may be larger than the image.

use super::params::Position;

/// Top-left corner for a single watermark anchored at `position`.
///
/// Centering uses floor division of the free space. Margins are measured
/// from the named edges; a negative margin counts as 0. The result is
/// clamped into `[0, image - text]` on each axis so the text never starts
/// off-canvas, even with an oversized margin. A text box larger than the
/// image clamps to 0.
///
/// # Examples
/// ```
/// # use watermark_batch::imaging::{Position, anchored_position};
/// assert_eq!(anchored_position((1000, 1000), (200, 50), Position::Center, 0), (400, 475));
/// ```
pub fn anchored_position(
    image: (u32, u32),
    text: (u32, u32),
    position: Position,
    margin: i64,
) -> (i64, i64) {
    let (img_w, img_h) = (image.0 as i64, image.1 as i64);
    let (text_w, text_h) = (text.0 as i64, text.1 as i64);
    let margin = margin.max(0);

    let center_x = (img_w - text_w).div_euclid(2);
    let center_y = (img_h - text_h).div_euclid(2);
    let right = img_w - text_w - margin;
    let bottom = img_h - text_h - margin;

    let (x, y) = match position {
        Position::Center => (center_x, center_y),
        Position::TopLeft => (margin, margin),
        Position::TopRight => (right, margin),
        Position::BottomLeft => (margin, bottom),
        Position::BottomRight => (right, bottom),
        Position::Top => (center_x, margin),
        Position::Bottom => (center_x, bottom),
        Position::Left => (margin, center_y),
        Position::Right => (right, center_y),
    };

    (
        x.min(img_w - text_w).max(0),
        y.min(img_h - text_h).max(0),
    )
}

/// Grid step sizes for a tile: tile dimension plus spacing, floored at 1 so
/// iteration always advances.
pub fn tile_steps(tile: (u32, u32), spacing_x: i64, spacing_y: i64) -> (i64, i64) {
    (
        (tile.0 as i64 + spacing_x).max(1),
        (tile.1 as i64 + spacing_y).max(1),
    )
}

/// Top-left corners of every tile needed to cover `canvas`.
///
/// The grid passes through `offset` and repeats every `steps`. Iteration
/// starts at the grid point at or before `(-tile_w, -tile_h)`, so the first
/// row and column sit partially (or fully) off-canvas and coverage reaches
/// the top-left edges for any offset sign or magnitude. Rows advance along
/// y (outer loop), cells along x (inner loop), until the coordinate reaches
/// the canvas extent.
pub fn tile_origins(
    canvas: (u32, u32),
    tile: (u32, u32),
    steps: (i64, i64),
    offset: (i64, i64),
) -> Vec<(i64, i64)> {
    let (step_x, step_y) = (steps.0.max(1), steps.1.max(1));
    let start_x = grid_start(tile.0 as i64, step_x, offset.0);
    let start_y = grid_start(tile.1 as i64, step_y, offset.1);
    let (width, height) = (canvas.0 as i64, canvas.1 as i64);

    let mut origins = Vec::new();
    let mut y = start_y;
    while y < height {
        let mut x = start_x;
        while x < width {
            origins.push((x, y));
            x += step_x;
        }
        y += step_y;
    }
    origins
}

/// Largest `s <= -tile` with `s ≡ offset (mod step)`.
///
/// The grid phase follows `offset` exactly, so even a small offset shifts
/// every tile. It is not snapped to a multiple of the step.
fn grid_start(tile: i64, step: i64, offset: i64) -> i64 {
    -tile - (-tile - offset).rem_euclid(step)
}

/// Target text width in pixels for a relative size: `round(fraction * width)`,
/// at least 1.
pub fn relative_target_width(fraction: f32, image_width: u32) -> u32 {
    ((fraction as f64 * image_width as f64).round() as i64).max(1) as u32
}

/// Font size that scales a probe measurement to the target width.
///
/// Assumes rendered width is linear in font size. Returns `provisional`
/// unchanged when the probe measured nothing.
pub fn scaled_font_size(provisional: u32, measured_width: u32, target_width: u32) -> u32 {
    if measured_width == 0 {
        return provisional;
    }
    let scale = target_width as f64 / measured_width as f64;
    ((provisional as f64 * scale).round() as i64).max(1) as u32
}

/// Size of the box that fully contains a `width` x `height` rectangle
/// rotated by `degrees`.
pub fn rotated_bounds(width: u32, height: u32, degrees: f32) -> (u32, u32) {
    let radians = (degrees as f64).to_radians();
    // Round away float noise so 90° turns stay exact.
    let cos = (radians.cos() * 1e12).round() / 1e12;
    let sin = (radians.sin() * 1e12).round() / 1e12;
    let (w, h) = (width as f64, height as f64);
    let out_w = w * cos.abs() + h * sin.abs();
    let out_h = w * sin.abs() + h * cos.abs();
    (
        ((out_w - 1e-6).ceil() as u32).max(1),
        ((out_h - 1e-6).ceil() as u32).max(1),
    )
}

/// Source and destination rectangles of a paste clipped to the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipRect {
    pub src_x: u32,
    pub src_y: u32,
    pub dst_x: u32,
    pub dst_y: u32,
    pub width: u32,
    pub height: u32,
}

/// Clip a `tile`-sized paste at `(x, y)` against `canvas`.
///
/// Returns `None` when nothing of the tile lands on the canvas.
pub fn clip_rect(canvas: (u32, u32), tile: (u32, u32), x: i64, y: i64) -> Option<ClipRect> {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + tile.0 as i64).min(canvas.0 as i64);
    let y1 = (y + tile.1 as i64).min(canvas.1 as i64);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some(ClipRect {
        src_x: (x0 - x) as u32,
        src_y: (y0 - y) as u32,
        dst_x: x0 as u32,
        dst_y: y0 as u32,
        width: (x1 - x0) as u32,
        height: (y1 - y0) as u32,
    })
}
