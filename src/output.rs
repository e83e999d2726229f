//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Apply
//!
//! ```text
//! [ok] photos/beach.jpg -> out/beach_wm.jpg
//! [fail] photos/broken.jpg: Image error: ...        (stderr)
//! [done] Processed 1 image(s).
//! ```
//!
//! A batch that processed nothing ends with a warning on stderr instead of
//! the `[done]` line:
//!
//! ```text
//! [warn] No images processed. Check your input folder and file extensions.
//! ```
//!
//! ## Describe
//!
//! ```text
//! Filename: beach_wm.jpg - Size: 1.2 MB - Dimensions: 4000x3000
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `String`) for testability
//! and a `print_*` wrapper that writes it. Format functions are pure: no
//! I/O, no side effects.

use crate::describe::FileDescription;
use crate::process::{BatchSummary, ProcessEvent};

// ============================================================================
// Apply
// ============================================================================

/// One line per finished job.
pub fn format_event(event: &ProcessEvent) -> String {
    match event {
        ProcessEvent::Done { source, output } => {
            format!("[ok] {} -> {}", source.display(), output.display())
        }
        ProcessEvent::Failed { source, error } => {
            format!("[fail] {}: {}", source.display(), error)
        }
    }
}

/// Print a job result: successes to stdout, failures to stderr.
pub fn print_event(event: &ProcessEvent) {
    let line = format_event(event);
    match event {
        ProcessEvent::Done { .. } => println!("{}", line),
        ProcessEvent::Failed { .. } => eprintln!("{}", line),
    }
}

/// Closing line for a batch. `None` when nothing was processed; the caller
/// prints [`EMPTY_BATCH_WARNING`] instead.
pub fn format_summary(summary: &BatchSummary) -> Option<String> {
    (summary.processed > 0).then(|| format!("[done] Processed {} image(s).", summary.processed))
}

pub const EMPTY_BATCH_WARNING: &str =
    "[warn] No images processed. Check your input folder and file extensions.";

pub fn print_summary(summary: &BatchSummary) {
    match format_summary(summary) {
        Some(line) => println!("{}", line),
        None => eprintln!("{}", EMPTY_BATCH_WARNING),
    }
}

// ============================================================================
// Describe
// ============================================================================

const SIZE_UNITS: &[&str] = &["kB", "MB", "GB", "TB", "PB", "EB"];

/// Human-readable size with decimal (1000-based) units.
///
/// ```text
/// 1        → 1 Byte
/// 300      → 300 Bytes
/// 3000     → 3.0 kB
/// 1234567  → 1.2 MB
/// ```
pub fn human_size(bytes: u64) -> String {
    if bytes == 1 {
        return "1 Byte".to_string();
    }
    if bytes < 1000 {
        return format!("{} Bytes", bytes);
    }
    let value = bytes as f64;
    let mut unit = 1000.0;
    for suffix in SIZE_UNITS {
        unit *= 1000.0;
        if value < unit {
            return format!("{:.1} {}", value * 1000.0 / unit, suffix);
        }
    }
    format!("{:.1} {}", value * 1000.0 / unit, SIZE_UNITS[SIZE_UNITS.len() - 1])
}

pub fn format_description(description: &FileDescription) -> String {
    format!(
        "Filename: {} - Size: {} - Dimensions: {}x{}",
        description.filename,
        human_size(description.size_bytes),
        description.width,
        description.height
    )
}

/// Print descriptions as text lines, or one JSON object per line.
pub fn print_descriptions(
    descriptions: &[FileDescription],
    json: bool,
) -> Result<(), serde_json::Error> {
    for description in descriptions {
        if json {
            println!("{}", serde_json::to_string(description)?);
        } else {
            println!("{}", format_description(description));
        }
    }
    Ok(())
}
