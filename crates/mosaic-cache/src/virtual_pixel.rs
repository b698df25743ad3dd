//! Virtual pixel methods
//!
//! Pixels read from outside the image bounds are synthesized according to
//! the image's [`VirtualPixelMethod`].  The coordinate mappings here are
//! applied per axis.

use mosaic_core::{Error, Result};

/// How out-of-bounds pixels are synthesized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VirtualPixelMethod {
    /// Same as [`VirtualPixelMethod::Edge`]
    #[default]
    Undefined,
    /// The image background color
    Background,
    /// The image background color
    Constant,
    /// Nearest edge pixel
    Edge,
    /// Reflect the image at its borders
    Mirror,
    /// Repeat the image
    Tile,
    /// Fully transparent black
    Transparent,
}

impl std::str::FromStr for VirtualPixelMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "undefined" => Ok(Self::Undefined),
            "background" => Ok(Self::Background),
            "constant" => Ok(Self::Constant),
            "edge" => Ok(Self::Edge),
            "mirror" => Ok(Self::Mirror),
            "tile" => Ok(Self::Tile),
            "transparent" => Ok(Self::Transparent),
            _ => Err(Error::InvalidParameter(format!(
                "unknown virtual pixel method: {s}"
            ))),
        }
    }
}

/// Nearest in-range coordinate
#[inline]
pub fn edge_x(extent: usize, x: i64) -> i64 {
    x.clamp(0, extent as i64 - 1)
}

/// Coordinate modulo the extent
#[inline]
pub fn tile_x(extent: usize, x: i64) -> i64 {
    let extent = extent as i64;
    if x < 0 {
        extent + ((x + 1) % extent) - 1
    } else if x >= extent {
        x % extent
    } else {
        x
    }
}

/// Coordinate reflected at the borders
#[inline]
pub fn mirror_x(extent: usize, x: i64) -> i64 {
    if x < 0 || x >= extent as i64 {
        extent as i64 - tile_x(extent, x) - 1
    } else {
        x
    }
}
