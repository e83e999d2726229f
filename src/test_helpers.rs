//! Shared test utilities.
//!
//! Synthetic image writers and a system font lookup. Everything here panics
//! on failure; it only ever runs under `cargo test`.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! create_test_jpeg(&tmp.path().join("a.jpg"), 200, 150);
//!
//! let Some(font) = system_font() else { return };
//! ```

use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};
use std::path::{Path, PathBuf};

use crate::imaging::font::{LoadedFont, SYSTEM_FONT_CANDIDATES};

// =========================================================================
// Synthetic images
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Write a small valid JPEG with a color gradient.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = gradient(width, height);
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write a small valid RGB PNG with a color gradient.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    gradient(width, height).save(path).unwrap();
}

// =========================================================================
// Fonts
// =========================================================================

/// First well-known system TrueType font that actually loads, if any.
///
/// Tests that need outline rendering return early when this is `None`, so
/// the suite still passes on minimal containers.
pub fn system_font() -> Option<PathBuf> {
    SYSTEM_FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| LoadedFont::from_file(p, 12).is_ok())
}
