//! Image processing: pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Decode + orient** | `image` decoders, `apply_orientation` |
//! | **Text** | `rusttype` outlines, `font8x8` fallback |
//! | **Composite** | `image::Pixel::blend` over a transparent overlay |
//! | **EXIF / ICC** | custom JPEG segment scanner |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for placement and tiling math (unit testable)
//! - **Parameters**: Data structures describing one watermark job
//! - **Font**: Font resolution chain, measurement, relative sizing
//! - **Render**: Overlay drawing, rotation, compositing
//! - **Metadata**: EXIF/ICC segment carry-over for JPEG
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
pub mod font;
pub(crate) mod metadata;
mod params;
pub mod render;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{anchored_position, tile_origins, tile_steps};
pub use params::{
    DEFAULT_FONT_SIZE, FontSizing, ImageJob, PlacementSpec, Position, Quality, Stroke, TileSpec,
    WatermarkSpec,
};
pub use rust_backend::RustBackend;
