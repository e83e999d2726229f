//! Image backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the batch runner
//! needs: identify (read dimensions) and watermark (decode, draw, encode one
//! [`ImageJob`]).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests drive the batch
//! logic through `MockBackend`, which records calls without touching pixels.

use super::params::ImageJob;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image backends.
///
/// Jobs are handed over one at a time; a backend never sees the batch.
pub trait ImageBackend {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Watermark `job.source` and write the result to `job.output`.
    fn watermark(&self, job: &ImageJob) -> Result<(), BackendError>;
}
