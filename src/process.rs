//! Batch watermarking.
//!
//! Turns a validated configuration plus an input folder into one
//! [`ImageJob`] per discovered image, then hands the jobs to an
//! [`ImageBackend`] one at a time.
//!
//! ## Failure Model
//!
//! ```text
//! bad config / missing input folder  →  Err before any file is touched
//! corrupt image / write failure      →  ProcessEvent::Failed, batch continues
//! missing font                       →  warning, built-in font used
//! ```
//!
//! Jobs run sequentially. Each job is fully written (or has failed) before
//! the next one is decoded, and no state carries over between jobs.

use crate::config::{ConfigError, WatermarkConfig};
use crate::imaging::{ImageBackend, ImageJob, RustBackend};
use crate::output;
use crate::scan::{self, ScanError};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Everything `apply` needs: where to read, where to write, what to stamp,
/// and the fully layered configuration.
#[derive(Debug, Clone)]
pub struct ApplyRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub text: String,
    pub config: WatermarkConfig,
}

/// Progress reported after each job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Done { source: PathBuf, output: PathBuf },
    Failed { source: PathBuf, error: String },
}

/// Counts for a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
}

/// One job per image. The watermark and placement specs are built once and
/// shared by value across all jobs.
pub fn build_jobs(request: &ApplyRequest, images: &[PathBuf]) -> Result<Vec<ImageJob>, ProcessError> {
    let config = &request.config;
    let watermark = config.watermark_spec(&request.text)?;
    let placement = config.placement_spec();
    let quality = config.quality();

    Ok(images
        .iter()
        .map(|source| ImageJob {
            source: source.clone(),
            output: scan::build_output_path(
                &request.output,
                source,
                &config.output.suffix,
                config.output.keep_tree,
                &request.input,
            ),
            watermark: watermark.clone(),
            placement,
            quality,
        })
        .collect())
}

/// Run every job through `backend`, reporting each outcome to `on_event`.
/// A failed job never stops the batch.
pub fn process_with_backend(
    backend: &impl ImageBackend,
    jobs: &[ImageJob],
    mut on_event: impl FnMut(&ProcessEvent),
) -> BatchSummary {
    let mut summary = BatchSummary::default();

    for job in jobs {
        debug!(source = %job.source.display(), output = %job.output.display(), "watermarking");
        let event = match backend.watermark(job) {
            Ok(()) => {
                summary.processed += 1;
                ProcessEvent::Done {
                    source: job.source.clone(),
                    output: job.output.clone(),
                }
            }
            Err(e) => {
                summary.failed += 1;
                ProcessEvent::Failed {
                    source: job.source.clone(),
                    error: e.to_string(),
                }
            }
        };
        on_event(&event);
    }

    summary
}

/// Fail fast on everything that would make the whole batch pointless.
fn preflight(request: &ApplyRequest) -> Result<(), ProcessError> {
    request.config.validate()?;
    scan::validate_input_dir(&request.input)?;
    Ok(())
}

/// Validate, discover, and watermark every image for `request`, printing
/// per-file results and the final summary.
pub fn run(request: &ApplyRequest) -> Result<BatchSummary, ProcessError> {
    preflight(request)?;

    let images = scan::find_images(&request.input, request.config.output.recursive)?;
    info!(
        count = images.len(),
        input = %request.input.display(),
        "discovered images"
    );

    let jobs = build_jobs(request, &images)?;
    std::fs::create_dir_all(&request.output)?;

    let summary = process_with_backend(&RustBackend::new(), &jobs, output::print_event);
    output::print_summary(&summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::{PlacementSpec, Position};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn request(input: &Path, output: &Path) -> ApplyRequest {
        ApplyRequest {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            text: "(c) Studio".to_string(),
            config: WatermarkConfig::default(),
        }
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        // The mock backend never reads content
        fs::write(path, "").unwrap();
    }

    // =========================================================================
    // Job building
    // =========================================================================

    #[test]
    fn build_jobs_one_per_image() {
        let req = request(Path::new("/in"), Path::new("/out"));
        let images = vec![PathBuf::from("/in/a.jpg"), PathBuf::from("/in/b.png")];
        let jobs = build_jobs(&req, &images).unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].output, PathBuf::from("/out/a_wm.jpg"));
        assert_eq!(jobs[1].output, PathBuf::from("/out/b_wm.png"));
        assert_eq!(jobs[0].watermark.text, "(c) Studio");
        assert_eq!(jobs[0].quality.value(), 100);
        assert_eq!(
            jobs[0].placement,
            PlacementSpec::Anchored {
                position: Position::BottomRight,
                margin: 32
            }
        );
    }

    #[test]
    fn build_jobs_mirrors_tree() {
        let mut req = request(Path::new("/in"), Path::new("/out"));
        req.config.output.keep_tree = true;
        req.config.output.suffix = "-x".into();
        let jobs = build_jobs(&req, &[PathBuf::from("/in/2024/may/a.jpg")]).unwrap();
        assert_eq!(jobs[0].output, PathBuf::from("/out/2024/may/a-x.jpg"));
    }

    #[test]
    fn build_jobs_rejects_bad_color() {
        let mut req = request(Path::new("/in"), Path::new("/out"));
        req.config.text.color = "not-a-color".into();
        let result = build_jobs(&req, &[PathBuf::from("/in/a.jpg")]);
        assert!(matches!(result, Err(ProcessError::Config(_))));
    }

    // =========================================================================
    // Batch processing with mock backend
    // =========================================================================

    #[test]
    fn process_with_mock_runs_all_jobs_in_order() {
        let req = request(Path::new("/in"), Path::new("/out"));
        let images = vec![PathBuf::from("/in/a.jpg"), PathBuf::from("/in/b.jpg")];
        let jobs = build_jobs(&req, &images).unwrap();

        let backend = MockBackend::new();
        let mut events = Vec::new();
        let summary = process_with_backend(&backend, &jobs, |e| events.push(e.clone()));

        assert_eq!(
            summary,
            BatchSummary {
                processed: 2,
                failed: 0
            }
        );
        let ops = backend.get_operations();
        assert!(matches!(&ops[0], RecordedOp::Watermark { source, .. } if source == "/in/a.jpg"));
        assert!(matches!(&ops[1], RecordedOp::Watermark { source, .. } if source == "/in/b.jpg"));
        assert_eq!(
            events[0],
            ProcessEvent::Done {
                source: "/in/a.jpg".into(),
                output: "/out/a_wm.jpg".into()
            }
        );
    }

    #[test]
    fn failure_does_not_abort_batch() {
        let req = request(Path::new("/in"), Path::new("/out"));
        let images = vec![
            PathBuf::from("/in/a.jpg"),
            PathBuf::from("/in/broken.jpg"),
            PathBuf::from("/in/c.jpg"),
        ];
        let jobs = build_jobs(&req, &images).unwrap();

        let backend = MockBackend::failing_on(&[Path::new("/in/broken.jpg")]);
        let mut events = Vec::new();
        let summary = process_with_backend(&backend, &jobs, |e| events.push(e.clone()));

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(backend.get_operations().len(), 3);
        assert!(matches!(
            &events[1],
            ProcessEvent::Failed { source, error }
                if source == Path::new("/in/broken.jpg") && error.contains("broken.jpg")
        ));
        assert!(matches!(&events[2], ProcessEvent::Done { .. }));
    }

    #[test]
    fn empty_batch_processes_nothing() {
        let backend = MockBackend::new();
        let summary = process_with_backend(&backend, &[], |_| panic!("no events expected"));
        assert_eq!(summary, BatchSummary::default());
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn only_recognized_files_become_jobs() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        for name in ["a.jpg", "b.PNG", "c.webp", "notes.txt", "d.gif", "e.psd"] {
            touch(&input.join(name));
        }

        let req = request(&input, &tmp.path().join("out"));
        let images = scan::find_images(&input, false).unwrap();
        let jobs = build_jobs(&req, &images).unwrap();

        let backend = MockBackend::new();
        let summary = process_with_backend(&backend, &jobs, |_| {});
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn text_and_quality_flow_into_backend() {
        let mut req = request(Path::new("/in"), Path::new("/out"));
        req.config.output.quality = 72;
        let jobs = build_jobs(&req, &[PathBuf::from("/in/a.jpg")]).unwrap();

        let backend = MockBackend::new();
        process_with_backend(&backend, &jobs, |_| {});
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Watermark { quality: 72, text, .. } if text == "(c) Studio"
        ));
    }

    // =========================================================================
    // Preflight
    // =========================================================================

    #[test]
    fn run_rejects_missing_input() {
        let tmp = TempDir::new().unwrap();
        let req = request(&tmp.path().join("missing"), &tmp.path().join("out"));
        assert!(matches!(run(&req), Err(ProcessError::Scan(_))));
        assert!(!tmp.path().join("out").exists());
    }

    #[test]
    fn run_rejects_invalid_config_before_touching_files() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        touch(&input.join("a.jpg"));
        let mut req = request(&input, &tmp.path().join("out"));
        req.config.text.rel_size = Some(-1.0);

        assert!(matches!(run(&req), Err(ProcessError::Config(_))));
        assert!(!tmp.path().join("out").exists());
    }

    #[test]
    fn run_on_empty_folder_is_ok() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        fs::create_dir_all(&input).unwrap();
        let summary = run(&request(&input, &tmp.path().join("out"))).unwrap();
        assert_eq!(summary, BatchSummary::default());
    }

    #[test]
    fn run_counts_corrupt_file_as_failed() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        touch(&input.join("empty.jpg"));
        crate::test_helpers::create_test_jpeg(&input.join("real.jpg"), 64, 48);

        let summary = run(&request(&input, &tmp.path().join("out"))).unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 1);
        assert!(tmp.path().join("out/real_wm.jpg").exists());
        assert!(!tmp.path().join("out/empty_wm.jpg").exists());
    }
}
