//! mosaic-cache - Pixel cache for mosaic images
//!
//! This crate owns the pixels of an image:
//!
//! - [`Image`] - reference-counted image handle with its attributes
//! - Pixel cache held in memory or, past the resource limits, in a
//!   temporary paging file ([`CacheType`])
//! - [`VirtualPixelMethod`] - pixels synthesized outside the image bounds
//! - [`CacheView`] - windowed read (`acquire`) and read-write
//!   (`get`/`set` + `sync`) access
//! - [`interpolate_color`] - alpha-weighted bilinear sampling

mod image;
pub mod interpolate;
mod storage;
pub mod view;
pub mod virtual_pixel;

pub use image::Image;
pub use interpolate::interpolate_color;
pub use storage::CacheType;
pub use view::{CacheView, Window, WindowMut};
pub use virtual_pixel::VirtualPixelMethod;
