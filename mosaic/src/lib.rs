//! Mosaic - Pixel cache and compositing for Rust
//!
//! # Overview
//!
//! - Pixel storage behind a cache with memory and disk
//!   backends, read and written through per-region views
//! - Virtual pixels for reads outside the image bounds
//! - Quantum transfer between pixels and packed byte buffers, and between
//!   image regions and typed pixel maps
//! - Compositing with the Porter-Duff operators, blend modes and
//!   geometry-driven effects
//!
//! # Example
//!
//! ```
//! use mosaic::cache::Image;
//! use mosaic::composite::{CompositeOperator, composite_image};
//! use mosaic::quantum::{export_image_pixels, import_image_pixels};
//! use mosaic::Context;
//!
//! let ctx = Context::default();
//! let canvas = Image::new(&ctx, 4, 4);
//! let stamp = Image::new(&ctx, 2, 2);
//! import_image_pixels(&stamp, 0, 0, 2, 2, "RGB", &[255u8, 0, 0].repeat(4)).unwrap();
//!
//! composite_image(&canvas, CompositeOperator::Over, &stamp, 1, 1).unwrap();
//!
//! let mut rgb = [0u8; 3];
//! export_image_pixels(&canvas, 2, 2, 1, 1, "RGB", &mut rgb).unwrap();
//! assert_eq!(rgb, [255, 0, 0]);
//! ```

// Re-export core types (pixels, geometry, context and errors)
pub use mosaic_core::*;

// Re-export the other crates as modules to avoid name conflicts
pub use mosaic_cache as cache;
pub use mosaic_composite as composite;
pub use mosaic_quantum as quantum;
