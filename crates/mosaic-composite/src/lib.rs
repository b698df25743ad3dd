//! mosaic-composite - Image compositing for mosaic
//!
//! Combines an overlay image with a destination image:
//!
//! - [`CompositeOperator`] - Porter-Duff operators, blend modes, HSB
//!   operators, channel copies and the Dissolve/Blend/Displace/Modulate/
//!   Threshold family
//! - [`ops`] - the per-pixel math, usable on its own
//! - [`composite_image`] - the row-at-a-time driver
//! - [`CompositeOptions`] - placement, tiling, stereo and stegano on top of
//!   the driver
//!
//! # Example
//!
//! ```
//! use mosaic_cache::Image;
//! use mosaic_composite::{CompositeOperator, composite_image};
//! use mosaic_core::{Context, PixelPacket};
//!
//! let ctx = Context::default();
//! let canvas = Image::new(&ctx, 4, 4);
//! let stamp = Image::new(&ctx, 2, 2);
//! stamp.set_one_pixel(0, 0, PixelPacket::white()).unwrap();
//! composite_image(&canvas, CompositeOperator::Over, &stamp, 1, 1).unwrap();
//! assert_eq!(canvas.acquire_one_pixel(1, 1), PixelPacket::white());
//! ```

pub mod composite;
mod error;
pub mod operator;
pub mod ops;
pub mod options;
pub mod params;
pub mod special;

pub use composite::{
    COMPOSITE_TAG, MODIFY_OUTSIDE_OVERLAY, composite_image, composite_image_with,
};
pub use error::{CompositeError, CompositeResult};
pub use operator::CompositeOperator;
pub use options::CompositeOptions;
pub use params::CompositeParams;
pub use special::{STEGANO_TAG, STEREO_TAG, stegano_image, stereo_image};
