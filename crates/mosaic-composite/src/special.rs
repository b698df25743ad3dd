//! Two-image effects that build a new image
//!
//! - [`stereo_image`]: red/cyan anaglyph from a left and right view
//! - [`stegano_image`]: hide one image's intensity bits in another

use crate::error::CompositeResult;
use mosaic_cache::Image;
use mosaic_core::{Error, PixelPacket, QUANTUM_DEPTH, Quantum, StorageClass};

/// Progress tag reported once per row by [`stereo_image`]
pub const STEREO_TAG: &str = "Stereo/Image";

/// Progress tag reported once per bit plane by [`stegano_image`]
pub const STEGANO_TAG: &str = "Stegano/Image";

/// Combine two views of a scene into a red/cyan anaglyph.
///
/// Red comes from `left`, green and blue from `right`; opacity is the
/// integer mean of both.
///
/// # Errors
///
/// [`Error::ImageSizesDiffer`] unless both images have the same extent.
pub fn stereo_image(left: &Image, right: &Image) -> CompositeResult<Image> {
    let (columns, rows) = (left.columns(), left.rows());
    if (columns, rows) != (right.columns(), right.rows()) {
        return Err(Error::ImageSizesDiffer(columns, rows, right.columns(), right.rows()).into());
    }
    let stereo = left.deep_clone()?;
    stereo.set_storage_class(StorageClass::Direct);
    let context = stereo.context();

    let mut left_view = left.open_view()?;
    let mut right_view = right.open_view()?;
    let mut stereo_view = stereo.open_view()?;
    let mut left_row: Vec<PixelPacket> = Vec::with_capacity(columns);
    for y in 0..rows as i64 {
        let Some(window) = left_view.acquire(0, y, columns, 1) else {
            break;
        };
        left_row.clear();
        left_row.extend_from_slice(window.pixels);
        let Some(right_window) = right_view.acquire(0, y, columns, 1) else {
            break;
        };
        let Some(window) = stereo_view.get(0, y, columns, 1) else {
            break;
        };
        for ((r, p), q) in window
            .pixels
            .iter_mut()
            .zip(&left_row)
            .zip(right_window.pixels)
        {
            r.red = p.red;
            r.green = q.green;
            r.blue = q.blue;
            r.opacity = ((p.opacity as u64 + q.opacity as u64) / 2) as Quantum;
        }
        stereo_view.sync()?;
        if !context.progress(STEREO_TAG, y as u64, rows as u64) {
            return Err(Error::Cancelled(STEREO_TAG).into());
        }
    }
    Ok(stereo)
}

/// Hide `watermark` in the low-order bits of a copy of `image`.
///
/// Bit `i` of each watermark intensity, most significant plane first, is
/// written to bit `j` of the red, green or blue sample (in rotation) of
/// successive image pixels starting at pixel `offset`.  Pixels are counted
/// row-major and the count wraps over the image area; each time it comes
/// back to `offset` the target bit `j` moves up by one.
///
/// # Errors
///
/// [`Error::Cancelled`] if the progress monitor stops the loop, or cache
/// errors from reading or writing either image.
pub fn stegano_image(image: &Image, watermark: &Image, offset: u64) -> CompositeResult<Image> {
    let stegano = image.deep_clone()?;
    stegano.set_storage_class(StorageClass::Direct);
    stegano.set_depth(QUANTUM_DEPTH);
    let columns = stegano.columns() as u64;
    let area = columns * stegano.rows() as u64;
    let mark_columns = watermark.columns();
    if area == 0 || mark_columns == 0 {
        return Ok(stegano);
    }
    let start = offset % area;
    if start != offset {
        log::debug!("stegano offset {offset} wrapped to {start}");
    }

    let mut marks: Vec<Quantum> = Vec::with_capacity(mark_columns * watermark.rows());
    let mut mark_view = watermark.open_view()?;
    for y in 0..watermark.rows() as i64 {
        let Some(window) = mark_view.acquire(0, y, mark_columns, 1) else {
            break;
        };
        marks.extend(window.pixels.iter().map(PixelPacket::intensity));
    }

    let context = stegano.context();
    let mut view = stegano.open_view()?;
    let (mut channel, mut j, mut k) = (0usize, 0u32, start);
    for i in (0..QUANTUM_DEPTH).rev() {
        if j >= QUANTUM_DEPTH {
            break;
        }
        for row in marks.chunks(mark_columns) {
            if j >= QUANTUM_DEPTH {
                break;
            }
            for &mark in row {
                if j >= QUANTUM_DEPTH {
                    break;
                }
                let Some(window) = view.get((k % columns) as i64, (k / columns) as i64, 1, 1)
                else {
                    break;
                };
                let pixel = &mut window.pixels[0];
                let sample = match channel {
                    0 => &mut pixel.red,
                    1 => &mut pixel.green,
                    _ => &mut pixel.blue,
                };
                let bit: Quantum = 1 << j;
                if (mark >> i) & 1 != 0 {
                    *sample |= bit;
                } else {
                    *sample &= !bit;
                }
                view.sync()?;
                channel = (channel + 1) % 3;
                k += 1;
                if k == area {
                    k = 0;
                }
                if k == start {
                    j += 1;
                }
            }
        }
        if !context.progress(STEGANO_TAG, (QUANTUM_DEPTH - i) as u64, QUANTUM_DEPTH as u64) {
            return Err(Error::Cancelled(STEGANO_TAG).into());
        }
    }
    Ok(stegano)
}
