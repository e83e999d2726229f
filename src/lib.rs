//! # Watermark Batch
//!
//! Stamps a text watermark onto every image in a folder. Each file runs
//! through the same sequential pipeline:
//!
//! ```text
//! load + orient  →  size font  →  place  →  overlay + composite  →  convert + save
//! ```
//!
//! Placement is either a single anchored instance (nine named positions
//! with a margin) or a rotated tile repeated across the whole canvas.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Stock defaults, TOML file layer, validation, spec conversion |
//! | [`scan`] | Finds recognized images and derives output paths |
//! | [`process`] | Builds one job per image and runs the batch |
//! | [`imaging`] | Font resolution, placement math, rendering, encoding |
//! | [`describe`] | Name/size/dimension listing of a folder |
//! | [`output`] | CLI line formatting for batch results and listings |
//!
//! # Design Decisions
//!
//! ## Overlay, Then Composite
//!
//! The watermark is drawn into its own transparent canvas-sized layer and
//! blended over the base in one pass. Partial opacity and outlines compose
//! the same way whether the base has alpha or not.
//!
//! ## Fonts Never Fail a Batch
//!
//! A missing or unreadable font walks down a fallback chain (explicit file,
//! common system fonts, a built-in 8px bitmap font) and logs a warning.
//! Only configuration mistakes stop a run; per-file problems are reported
//! and skipped.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, text rasterization and encoding are all pure Rust (`image`,
//! `rusttype`, `font8x8`), so the binary has no system dependencies.

pub mod config;
pub mod describe;
pub mod imaging;
pub mod output;
pub mod process;
pub mod scan;

#[cfg(test)]
pub(crate) mod test_helpers;
