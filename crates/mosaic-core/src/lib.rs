//! mosaic core - shared types of the pixel engine
//!
//! This crate holds the vocabulary every other mosaic crate speaks:
//!
//! - [`Quantum`] and its scaling law ([`quantum`])
//! - [`PixelPacket`] / [`RealPixel`] and the [`IndexPacket`] plane
//! - [`Colormap`] - palette for PseudoClass images
//! - [`Hsb`] conversions used by the hue-family composite operators
//! - [`GeometryInfo`] / [`RectangleInfo`] / [`Gravity`] - geometry strings
//! - [`Context`] - process-wide resource limits, codec lock and progress
//! - [`Blob`] - the shared byte stream coders read from and write to
//! - [`Error`] and the image-scoped [`ExceptionInfo`] record

pub mod blob;
pub mod color;
pub mod colormap;
pub mod context;
pub mod error;
pub mod exception;
pub mod geometry;
pub mod pixel;
pub mod quantum;

pub use blob::{Blob, Endian};
pub use color::{Hsb, hsb_to_rgb, rgb_to_hsb};
pub use colormap::{Colormap, MAX_COLORMAP_SIZE};
pub use context::{Context, ProgressMonitor, ResourceLimits, ResourceType};
pub use error::{Error, Result};
pub use exception::{Exception, ExceptionInfo, Severity};
pub use geometry::{GeometryFlags, GeometryInfo, Gravity, RectangleInfo};
pub use pixel::{IndexPacket, PixelPacket, RealPixel};
pub use quantum::{
    MAGICK_EPSILON, OPAQUE_OPACITY, QUANTUM_DEPTH, QUANTUM_RANGE, QUANTUM_RANGE_F, QUANTUM_SCALE,
    Quantum, TRANSPARENT_OPACITY,
};

/// How an image stores its pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageClass {
    /// Colors stored directly in each pixel
    #[default]
    Direct,
    /// Colors stored as indexes into a colormap
    Pseudo,
}

/// Color model of the stored samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Colorspace {
    #[default]
    Rgb,
    Gray,
    /// Cyan, magenta, yellow in red/green/blue; black in the index plane
    Cmyk,
}
