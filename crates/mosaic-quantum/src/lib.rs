//! mosaic-quantum - Pixel transfer for mosaic
//!
//! Two ways of moving pixels in and out of an [`Image`](mosaic_cache::Image):
//!
//! - Quantum channel transfer: a view's window to or from a packed byte
//!   buffer at the image depth (1 to 32 bits), selected by [`QuantumType`]
//! - Pixel map transfer: an image region to or from a typed buffer
//!   (`u8` .. `f64`) in any channel order (`"RGBA"`, `"BGRP"`, `"I"`, ...)
//!
//! The [`BitPacker`] / [`BitUnpacker`] pair underneath handles sample
//! widths that are not a whole number of bytes.

pub mod bitpack;
pub mod layout;
pub mod pixel_map;
pub mod quantum_type;
pub mod transfer;

pub use bitpack::{BitPacker, BitUnpacker};
pub use layout::{Layout, QuantumFormat, SUPPORTED_DEPTHS, quantum_extent};
pub use pixel_map::{
    MapChannel, StorageSample, StorageType, export_image_pixels, import_image_pixels, parse_map,
};
pub use quantum_type::{Channel, QuantumType};
pub use transfer::{export_quantum_pixels, import_quantum_pixels};
