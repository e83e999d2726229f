//! Per-file listing of a folder's images: name, byte size, dimensions.
//!
//! Handy for checking a batch's output folder. Only the top level is read,
//! with the same extension filter as `apply`.

use crate::imaging::{ImageBackend, RustBackend};
use crate::scan::{self, ScanError};
use serde::Serialize;
use std::path::Path;
use tracing::warn;

/// One row of `describe` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDescription {
    pub filename: String,
    pub size_bytes: u64,
    pub width: u32,
    pub height: u32,
}

/// Describe every recognized image directly inside `dir`. Files that cannot
/// be read or identified are skipped with a warning.
pub fn describe_with_backend(
    backend: &impl ImageBackend,
    dir: &Path,
) -> Result<Vec<FileDescription>, ScanError> {
    let images = scan::find_images(dir, false)?;
    let mut descriptions = Vec::with_capacity(images.len());

    for path in images {
        let size_bytes = match std::fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot stat file");
                continue;
            }
        };
        let dims = match backend.identify(&path) {
            Ok(dims) => dims,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read dimensions");
                continue;
            }
        };
        descriptions.push(FileDescription {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size_bytes,
            width: dims.width,
            height: dims.height,
        });
    }

    Ok(descriptions)
}

pub fn describe_dir(dir: &Path) -> Result<Vec<FileDescription>, ScanError> {
    describe_with_backend(&RustBackend::new(), dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::test_helpers::{create_test_jpeg, create_test_png};
    use tempfile::TempDir;

    #[test]
    fn describes_real_images_in_order() {
        let tmp = TempDir::new().unwrap();
        create_test_png(&tmp.path().join("b.png"), 30, 20);
        create_test_jpeg(&tmp.path().join("a.jpg"), 64, 48);
        std::fs::write(tmp.path().join("notes.txt"), "skip me").unwrap();

        let rows = describe_dir(tmp.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].filename, "a.jpg");
        assert_eq!((rows[0].width, rows[0].height), (64, 48));
        assert_eq!(rows[1].filename, "b.png");
        assert_eq!(
            rows[1].size_bytes,
            std::fs::metadata(tmp.path().join("b.png")).unwrap().len()
        );
    }

    #[test]
    fn unreadable_images_are_skipped() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("broken.png"), "not a png").unwrap();
        create_test_png(&tmp.path().join("ok.png"), 10, 10);

        let rows = describe_dir(tmp.path()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].filename, "ok.png");
    }

    #[test]
    fn subfolders_are_not_described() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        create_test_png(&tmp.path().join("sub/deep.png"), 10, 10);
        assert!(describe_dir(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn uses_backend_identify() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("x.jpg"), "").unwrap();

        let backend = MockBackend::with_dimensions(1920, 1080);
        let rows = describe_with_backend(&backend, tmp.path()).unwrap();
        assert_eq!(
            rows,
            vec![FileDescription {
                filename: "x.jpg".into(),
                size_bytes: 0,
                width: 1920,
                height: 1080,
            }]
        );
        assert!(matches!(&backend.get_operations()[0], RecordedOp::Identify(_)));
    }

    #[test]
    fn missing_dir_errors() {
        let tmp = TempDir::new().unwrap();
        assert!(describe_dir(&tmp.path().join("nope")).is_err());
    }
}
