//! Drawing the watermark into a transparent overlay and compositing it.
//!
//! Nothing here touches the base image until [`composite`]: text is
//! rendered into its own RGBA buffer, placed (anchored or tiled) onto a
//! canvas-sized transparent overlay, and only then blended over the base.

use super::calculations::{anchored_position, clip_rect, rotated_bounds, tile_origins, tile_steps};
use super::font::{LoadedFont, TextTooLarge, font_for_spec, padded_box};
use super::params::{PlacementSpec, TileSpec, WatermarkSpec};
use image::{DynamicImage, GrayImage, Pixel, Rgba, RgbaImage};
use tracing::debug;

/// Rotations smaller than this (degrees) are skipped.
const MIN_ROTATION: f32 = 1e-3;

/// Fill and optional outline colors, alpha included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub fill: Rgba<u8>,
    pub stroke: Option<(u32, Rgba<u8>)>,
}

impl TextStyle {
    /// Style for `spec` with every channel at `alpha`.
    pub fn from_spec(spec: &WatermarkSpec, alpha: u8) -> Self {
        let [r, g, b] = spec.color.0;
        Self {
            fill: Rgba([r, g, b, alpha]),
            stroke: spec.stroke.filter(|s| s.width > 0).map(|s| {
                let [r, g, b] = s.color.0;
                (s.width, Rgba([r, g, b, alpha]))
            }),
        }
    }

    fn stroke_width(&self) -> u32 {
        self.stroke.map(|(w, _)| w).unwrap_or(0)
    }
}

/// Grow coverage outward by a disk of `radius` pixels into a buffer of
/// `padded` size (the mask plus `radius` on every side).
fn dilate(mask: &GrayImage, radius: u32, padded: (u32, u32)) -> GrayImage {
    let r = radius as i64;
    let mut out = GrayImage::new(padded.0, padded.1);
    // Half-width of the disk on each row offset
    let spans: Vec<(i64, i64)> = (-r..=r)
        .map(|dy| (dy, ((r * r - dy * dy) as f64).sqrt().floor() as i64))
        .collect();

    for (x, y, pixel) in mask.enumerate_pixels() {
        let value = pixel[0];
        if value == 0 {
            continue;
        }
        for &(dy, half) in &spans {
            let py = (y as i64 + r + dy) as u32;
            for dx in -half..=half {
                let px = (x as i64 + r + dx) as u32;
                let target = out.get_pixel_mut(px, py);
                if value > target[0] {
                    target[0] = value;
                }
            }
        }
    }
    out
}

fn scale_alpha(color: Rgba<u8>, coverage: u8) -> Rgba<u8> {
    let alpha = (color[3] as u32 * coverage as u32 + 127) / 255;
    Rgba([color[0], color[1], color[2], alpha as u8])
}

/// Put `over` onto `under` through a coverage mask: every channel, alpha
/// included, moves toward `over` by `coverage`. Full coverage yields `over`
/// exactly. A transparent `under` just takes `over` at reduced alpha.
fn mask_paste(under: Rgba<u8>, over: Rgba<u8>, coverage: u8) -> Rgba<u8> {
    if under[3] == 0 {
        return scale_alpha(over, coverage);
    }
    let t = coverage as u32;
    Rgba(std::array::from_fn(|i| {
        ((under[i] as u32 * (255 - t) + over[i] as u32 * t + 127) / 255) as u8
    }))
}

/// Render `text` into a tight transparent buffer: ink box plus the stroke
/// width on every side. The outline is drawn first and the fill replaces it
/// where glyph coverage is full.
pub fn render_text(
    font: &LoadedFont,
    text: &str,
    style: &TextStyle,
) -> Result<RgbaImage, TextTooLarge> {
    let mask = font.rasterize(text)?;
    let stroke = style.stroke_width();
    let (w, h) = padded_box(mask.width() as u64, mask.height() as u64, stroke)?;
    let mut out = RgbaImage::new(w, h);

    if let Some((width, color)) = style.stroke {
        let outline = dilate(&mask, width, (w, h));
        for (x, y, coverage) in outline.enumerate_pixels() {
            if coverage[0] > 0 {
                out.put_pixel(x, y, scale_alpha(color, coverage[0]));
            }
        }
    }

    for (x, y, coverage) in mask.enumerate_pixels() {
        if coverage[0] > 0 {
            let pixel = out.get_pixel_mut(x + stroke, y + stroke);
            *pixel = mask_paste(*pixel, style.fill, coverage[0]);
        }
    }

    Ok(out)
}

/// Source-over paste of `src` at `(x, y)`, clipped to `dst`. A paste that
/// lands fully outside is a no-op.
pub fn paste_clipped(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    let Some(clip) = clip_rect(dst.dimensions(), src.dimensions(), x, y) else {
        return;
    };
    for row in 0..clip.height {
        for col in 0..clip.width {
            let pixel = *src.get_pixel(clip.src_x + col, clip.src_y + row);
            if pixel[3] == 0 {
                continue;
            }
            dst.get_pixel_mut(clip.dst_x + col, clip.dst_y + row)
                .blend(&pixel);
        }
    }
}

/// Bilinear sample at continuous coordinates, transparent outside.
/// Interpolates premultiplied color to avoid dark fringes.
fn sample_bilinear(src: &RgbaImage, fx: f64, fy: f64) -> Rgba<u8> {
    let (w, h) = (src.width() as i64, src.height() as i64);
    let x0 = fx.floor() as i64;
    let y0 = fy.floor() as i64;
    let tx = fx - x0 as f64;
    let ty = fy - y0 as f64;

    let mut acc = [0.0f64; 4];
    for (dx, dy, weight) in [
        (0, 0, (1.0 - tx) * (1.0 - ty)),
        (1, 0, tx * (1.0 - ty)),
        (0, 1, (1.0 - tx) * ty),
        (1, 1, tx * ty),
    ] {
        let (sx, sy) = (x0 + dx, y0 + dy);
        if weight == 0.0 || sx < 0 || sy < 0 || sx >= w || sy >= h {
            continue;
        }
        let p = src.get_pixel(sx as u32, sy as u32);
        let a = p[3] as f64 / 255.0 * weight;
        acc[0] += p[0] as f64 * a;
        acc[1] += p[1] as f64 * a;
        acc[2] += p[2] as f64 * a;
        acc[3] += a;
    }

    if acc[3] <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let channel = |v: f64| (v / acc[3]).round().clamp(0.0, 255.0) as u8;
    Rgba([
        channel(acc[0]),
        channel(acc[1]),
        channel(acc[2]),
        (acc[3] * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Rotate counter-clockwise by `degrees`, expanding the canvas so no
/// content is clipped.
pub fn rotate_expand(src: &RgbaImage, degrees: f32) -> RgbaImage {
    let (out_w, out_h) = rotated_bounds(src.width(), src.height(), degrees);
    let radians = (degrees as f64).to_radians();
    let (sin, cos) = radians.sin_cos();
    let (src_cx, src_cy) = (src.width() as f64 / 2.0, src.height() as f64 / 2.0);
    let (dst_cx, dst_cy) = (out_w as f64 / 2.0, out_h as f64 / 2.0);

    RgbaImage::from_fn(out_w, out_h, |x, y| {
        let dx = x as f64 + 0.5 - dst_cx;
        let dy = y as f64 + 0.5 - dst_cy;
        // Inverse of a counter-clockwise turn in y-down coordinates
        let sx = cos * dx - sin * dy + src_cx - 0.5;
        let sy = sin * dx + cos * dy + src_cy - 0.5;
        sample_bilinear(src, sx, sy)
    })
}

/// One rendered watermark instance for tiling: the text with transparent
/// padding of `max(2, stroke + 2)` per side, rotated once by `angle`.
pub fn build_tile(
    font: &LoadedFont,
    text: &str,
    style: &TextStyle,
    angle: f32,
) -> Result<RgbaImage, TextTooLarge> {
    let rendered = render_text(font, text, style)?;
    let pad = (style.stroke_width() + 2).max(2);
    let (w, h) = rendered.dimensions();
    let mut tile = RgbaImage::new(w.max(1) + 2 * pad, h.max(1) + 2 * pad);
    image::imageops::replace(&mut tile, &rendered, pad as i64, pad as i64);

    if angle.abs() > MIN_ROTATION {
        Ok(rotate_expand(&tile, angle))
    } else {
        Ok(tile)
    }
}

/// Repeat `tile` over the whole `overlay` following `spec`'s grid.
pub fn fill_tiled(overlay: &mut RgbaImage, tile: &RgbaImage, spec: &TileSpec) {
    let steps = tile_steps(tile.dimensions(), spec.spacing_x, spec.spacing_y);
    let origins = tile_origins(
        overlay.dimensions(),
        tile.dimensions(),
        steps,
        (spec.offset_x, spec.offset_y),
    );
    debug!(tiles = origins.len(), ?steps, "tiling watermark");
    for (x, y) in origins {
        paste_clipped(overlay, tile, x, y);
    }
}

/// Draw the watermark into a transparent overlay the size of `canvas`.
pub fn draw_overlay(
    canvas: (u32, u32),
    font: &LoadedFont,
    spec: &WatermarkSpec,
    placement: &PlacementSpec,
) -> Result<RgbaImage, TextTooLarge> {
    let mut overlay = RgbaImage::new(canvas.0, canvas.1);
    match placement {
        PlacementSpec::Anchored { position, margin } => {
            let style = TextStyle::from_spec(spec, spec.alpha);
            let rendered = render_text(font, &spec.text, &style)?;
            let (x, y) = anchored_position(canvas, rendered.dimensions(), *position, *margin);
            debug!(x, y, position = position.as_str(), "anchored watermark");
            paste_clipped(&mut overlay, &rendered, x, y);
        }
        PlacementSpec::Tiled(tile_spec) => {
            let alpha = tile_spec.alpha.unwrap_or(spec.alpha);
            let style = TextStyle::from_spec(spec, alpha);
            let tile = build_tile(font, &spec.text, &style, tile_spec.angle)?;
            fill_tiled(&mut overlay, &tile, tile_spec);
        }
    }
    Ok(overlay)
}

/// Alpha-composite `overlay` over `base` in place.
pub fn composite(base: &mut RgbaImage, overlay: &RgbaImage) {
    paste_clipped(base, overlay, 0, 0);
}

/// Full pixel pipeline for one image: resolve the font for this image's
/// width, draw the overlay, composite it over an RGBA copy of `base`.
/// Text too large to render fails this image only.
pub fn watermark_image(
    base: &DynamicImage,
    spec: &WatermarkSpec,
    placement: &PlacementSpec,
) -> Result<RgbaImage, TextTooLarge> {
    let mut canvas = base.to_rgba8();
    let font = font_for_spec(spec, canvas.width());
    let overlay = draw_overlay(canvas.dimensions(), &font, spec, placement)?;
    composite(&mut canvas, &overlay);
    Ok(canvas)
}
