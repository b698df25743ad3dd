//! Quantum Channel Transfer
//!
//! Moves the pixels of a view's current window to or from a flat byte
//! buffer, one [`QuantumType`] at a time, at the image's depth and
//! endianness.
//!
//! - [`export_quantum_pixels`]: window pixels -> bytes
//! - [`import_quantum_pixels`]: bytes -> window pixels (commit with
//!   [`CacheView::sync`](mosaic_cache::CacheView::sync))
//!
//! Opacity is stored inverted (0 = opaque); `Alpha` samples are
//! complemented in both directions, `Opacity` samples are not.

use crate::layout::{QuantumFormat, SampleReader, SampleWriter};
use crate::quantum_type::{Channel, QuantumType};
use mosaic_cache::{CacheView, Image};
use mosaic_core::quantum::{scale_any_to_quantum, scale_quantum_to_any};
use mosaic_core::{
    Colorspace, Error, IndexPacket, PixelPacket, QUANTUM_RANGE, Result, StorageClass,
};

/// Check the image can carry the channels of `quantum_type`
fn validate(image: &Image, quantum_type: QuantumType) -> Result<QuantumFormat> {
    if quantum_type.needs_colormap() && image.storage_class() != StorageClass::Pseudo {
        return Err(Error::ColormappedImageRequired);
    }
    if quantum_type.needs_cmyk() && image.colorspace() != Colorspace::Cmyk {
        return Err(Error::ColorSeparatedImageRequired);
    }
    let format = QuantumFormat::new(quantum_type, image.depth())?;
    Ok(format)
}

#[inline]
fn export_sample(channel: Channel, p: &PixelPacket, index: IndexPacket, max: u64) -> u32 {
    let value = match channel {
        Channel::Red => scale_quantum_to_any(p.red, max),
        Channel::Green => scale_quantum_to_any(p.green, max),
        Channel::Blue => scale_quantum_to_any(p.blue, max),
        Channel::Alpha => scale_quantum_to_any(QUANTUM_RANGE - p.opacity, max),
        Channel::Opacity => scale_quantum_to_any(p.opacity, max),
        Channel::Black => scale_quantum_to_any(index, max),
        Channel::Index => (index as u64).min(max),
        Channel::Gray => scale_quantum_to_any(p.intensity(), max),
    };
    value as u32
}

/// Write the pixels of the view's current window into `dest`.
///
/// Returns the number of bytes written, which is
/// [`quantum_extent`](crate::quantum_extent) of the window area.
///
/// # Errors
///
/// - [`Error::ColormappedImageRequired`] for index types on a DirectClass
///   image
/// - [`Error::ColorSeparatedImageRequired`] for black/CMYK types on a
///   non-CMYK image
/// - [`Error::ImageDepthNotSupported`] for an unsupported image depth
/// - [`Error::BufferTooSmall`] if `dest` is shorter than the transfer
pub fn export_quantum_pixels(
    view: &CacheView,
    quantum_type: QuantumType,
    pad: usize,
    dest: &mut [u8],
) -> Result<usize> {
    let image = view.image();
    let format = validate(image, quantum_type)?;
    let window = view.window();
    let count = window.pixels.len();
    let needed = format.extent(pad, count);
    if dest.len() < needed {
        return Err(Error::BufferTooSmall {
            needed,
            actual: dest.len(),
        });
    }
    log::trace!(
        "export {count} pixels as {quantum_type:?} at depth {} ({needed} bytes)",
        format.depth
    );
    if pad > 0 && !format.layout.is_padded() {
        log::debug!("pad {pad} ignored for {:?}", format.layout);
    }

    let max = format.sample_max();
    let mut writer = SampleWriter::new(&format, image.endian(), pad, dest);
    for (i, p) in window.pixels.iter().enumerate() {
        let index = window.indexes.get(i).copied().unwrap_or(0);
        for &channel in format.channels {
            writer.put(export_sample(channel, p, index, max));
        }
        writer.end_pixel();
    }
    let written = writer.finish();
    debug_assert_eq!(written, needed);
    Ok(needed)
}

/// Read `source` into the pixels of the view's current write window.
///
/// Returns the number of bytes consumed.  Out-of-range colormap indexes
/// are replaced by 0 and recorded as `InvalidColormapIndex`, once per
/// pixel, in the image's exception record.  Alpha-bearing types turn on
/// the image's matte flag.
///
/// # Errors
///
/// The conditions of [`export_quantum_pixels`], plus
/// [`Error::UnableToGetCacheNexus`] if the view holds no write window.
pub fn import_quantum_pixels(
    view: &mut CacheView,
    quantum_type: QuantumType,
    pad: usize,
    source: &[u8],
) -> Result<usize> {
    let image = view.image().clone();
    let format = validate(&image, quantum_type)?;
    let colormap = if quantum_type.needs_colormap() {
        image.colormap().unwrap_or_default()
    } else {
        Default::default()
    };
    let region = view.region();
    let Some(window) = view.window_mut() else {
        return Err(Error::UnableToGetCacheNexus {
            x: region.x,
            y: region.y,
            width: region.width,
            height: region.height,
        });
    };
    let count = window.pixels.len();
    let needed = format.extent(pad, count);
    if source.len() < needed {
        return Err(Error::BufferTooSmall {
            needed,
            actual: source.len(),
        });
    }
    log::trace!(
        "import {count} pixels as {quantum_type:?} at depth {} ({needed} bytes)",
        format.depth
    );

    let max = format.sample_max();
    let mut reader = SampleReader::new(&format, image.endian(), pad, source);
    for (i, p) in window.pixels.iter_mut().enumerate() {
        for &channel in format.channels {
            let sample = reader.get() as u64;
            match channel {
                Channel::Red => p.red = scale_any_to_quantum(sample, max),
                Channel::Green => p.green = scale_any_to_quantum(sample, max),
                Channel::Blue => p.blue = scale_any_to_quantum(sample, max),
                Channel::Alpha => p.opacity = QUANTUM_RANGE - scale_any_to_quantum(sample, max),
                Channel::Opacity => p.opacity = scale_any_to_quantum(sample, max),
                Channel::Black => {
                    if let Some(index) = window.indexes.get_mut(i) {
                        *index = scale_any_to_quantum(sample, max);
                    }
                }
                Channel::Index => {
                    let index = if (sample as usize) < colormap.len() {
                        sample as IndexPacket
                    } else {
                        image.record_exception(&Error::InvalidColormapIndex {
                            index: sample as usize,
                            colors: colormap.len(),
                        });
                        0
                    };
                    if let Some(slot) = window.indexes.get_mut(i) {
                        *slot = index;
                    }
                    if let Some(color) = colormap.lookup(index) {
                        *p = color;
                    }
                }
                Channel::Gray => {
                    let gray = scale_any_to_quantum(sample, max);
                    p.red = gray;
                    p.green = gray;
                    p.blue = gray;
                }
            }
        }
        reader.end_pixel();
    }
    let consumed = reader.finish();
    debug_assert_eq!(consumed, needed);
    if quantum_type.has_alpha() {
        image.set_matte(true);
    }
    Ok(needed)
}
