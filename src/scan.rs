//! Input discovery and output path derivation.
//!
//! ## Recognized Files
//!
//! Files are matched by extension, case-insensitively:
//!
//! ```text
//! jpg jpeg png webp tif tiff bmp
//! ```
//!
//! Everything else is ignored without a message. Without `recursive` only
//! the top level of the input folder is read; with it the whole subtree is
//! walked. Results are sorted so batches run in a stable order.
//!
//! ## Output Paths
//!
//! The suffix goes between stem and extension:
//!
//! ```text
//! input/trips/beach.jpg  →  output/beach_wm.jpg          (flat)
//! input/trips/beach.jpg  →  output/trips/beach_wm.jpg    (keep_tree)
//! ```

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Input folder does not exist or is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tif", "tiff", "bmp"];

/// Extensions that are picked up as input images.
pub fn supported_extensions() -> &'static [&'static str] {
    IMAGE_EXTENSIONS
}

/// Whether `path` has a recognized image extension. Does not touch the disk.
pub fn is_image(path: &Path) -> bool {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}

/// Fail unless `path` is an existing directory.
pub fn validate_input_dir(path: &Path) -> Result<(), ScanError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(ScanError::NotADirectory(path.to_path_buf()))
    }
}

/// Recognized image files under `input`, sorted.
pub fn find_images(input: &Path, recursive: bool) -> Result<Vec<PathBuf>, ScanError> {
    validate_input_dir(input)?;

    let walker = WalkDir::new(input).min_depth(1);
    let walker = if recursive {
        walker
    } else {
        walker.max_depth(1)
    };

    let mut images = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && is_image(entry.path()) {
            images.push(entry.into_path());
        }
    }

    images.sort();
    Ok(images)
}

/// Output location for `source`.
///
/// With `keep_tree` the path of `source` relative to `input_root` is
/// mirrored under `out_dir`; otherwise only the file name is kept. A source
/// outside `input_root` falls back to the flat layout.
pub fn build_output_path(
    out_dir: &Path,
    source: &Path,
    suffix: &str,
    keep_tree: bool,
    input_root: &Path,
) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match source.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };

    let relative_dir = keep_tree
        .then(|| source.strip_prefix(input_root).ok())
        .flatten()
        .and_then(Path::parent);

    match relative_dir {
        Some(dir) => out_dir.join(dir).join(file_name),
        None => out_dir.join(file_name),
    }
}
