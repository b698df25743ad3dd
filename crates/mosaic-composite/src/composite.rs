//! Composite driver
//!
//! Walks the destination one row at a time, pairs each pixel with the
//! overlay pixel at the same position, and writes back the result of the
//! selected operator.  CMYK pixels are inverted into additive form before
//! the operator runs and inverted back afterwards.
//!
//! Operators that redefine the destination outside the overlay visit every
//! destination row; the others only visit the overlap.

use crate::error::CompositeResult;
use crate::operator::CompositeOperator;
use crate::ops::{MIDPOINT, compose_outside, compose_pixel};
use crate::params::CompositeParams;
use mosaic_cache::{Image, interpolate_color};
use mosaic_core::quantum::round_to_quantum;
use mosaic_core::{
    Colorspace, Error, IndexPacket, OPAQUE_OPACITY, PixelPacket, QUANTUM_RANGE_F, RealPixel,
    StorageClass,
};

/// Progress tag reported once per destination row
pub const COMPOSITE_TAG: &str = "Composite/Image";

/// Image attribute that, when present on the overlay, confines every
/// operator to the overlap region
pub const MODIFY_OUTSIDE_OVERLAY: &str = "modify-outside-overlay";

#[inline]
fn invert(pixel: &mut RealPixel) {
    pixel.red = QUANTUM_RANGE_F - pixel.red;
    pixel.green = QUANTUM_RANGE_F - pixel.green;
    pixel.blue = QUANTUM_RANGE_F - pixel.blue;
}

/// Widen a stored pixel into the operator's working form
#[inline]
fn working_pixel(p: &PixelPacket, index: IndexPacket, matte: bool, cmyk: bool) -> RealPixel {
    let mut pixel = RealPixel::from_packet(p, 0);
    if !matte {
        pixel.opacity = OPAQUE_OPACITY as f64;
    }
    if cmyk {
        invert(&mut pixel);
        pixel.index = QUANTUM_RANGE_F - index as f64;
    }
    pixel
}

/// Composite `composite` onto `image` with its top-left corner at
/// (`x_offset`, `y_offset`).
///
/// Operator arguments come from the overlay's geometry string; see
/// [`CompositeParams::new`].
///
/// # Errors
///
/// - [`Error::Cancelled`] if the progress monitor stops the loop
/// - cache errors from reading or writing either image
pub fn composite_image(
    image: &Image,
    compose: CompositeOperator,
    composite: &Image,
    x_offset: i64,
    y_offset: i64,
) -> CompositeResult<()> {
    let geometry = composite.geometry();
    let params = CompositeParams::new(compose, geometry.as_deref());
    composite_image_with(image, compose, composite, x_offset, y_offset, &params)
}

/// Composite with explicit operator arguments
pub fn composite_image_with(
    image: &Image,
    compose: CompositeOperator,
    composite: &Image,
    x_offset: i64,
    y_offset: i64,
    params: &CompositeParams,
) -> CompositeResult<()> {
    if compose == CompositeOperator::No {
        return Ok(());
    }
    image.set_storage_class(StorageClass::Direct);
    if compose == CompositeOperator::CopyOpacity && !image.matte() {
        image.set_opacity(OPAQUE_OPACITY)?;
    }

    let displaced;
    let composite = if compose == CompositeOperator::Displace {
        displaced = displace(image, composite, x_offset, y_offset, params)?;
        &displaced
    } else {
        composite
    };
    let mut params = *params;
    if composite.attribute(MODIFY_OUTSIDE_OVERLAY).is_some() {
        params.modify_outside_overlay = false;
    }
    let outside = params.modify_outside_overlay;

    let (columns, rows) = (image.columns(), image.rows());
    let overlay_columns = composite.columns();
    let overlay_rows = composite.rows() as i64;
    let matte = image.matte();
    let cmyk = image.colorspace() == Colorspace::Cmyk;
    let source_matte = composite.matte();
    let source_cmyk = composite.colorspace() == Colorspace::Cmyk;
    log::debug!(
        "composite {overlay_columns}x{overlay_rows}{x_offset:+}{y_offset:+} onto {columns}x{rows} with {compose}"
    );

    let context = image.context();
    let mut image_view = image.open_view()?;
    let mut overlay_view = composite.open_view()?;
    let mut source_pixels: Vec<PixelPacket> = Vec::with_capacity(overlay_columns);
    let mut source_indexes: Vec<IndexPacket> = Vec::with_capacity(overlay_columns);

    for y in 0..rows as i64 {
        let overlay_row = y >= y_offset && y - y_offset < overlay_rows;
        if !outside {
            if y < y_offset {
                continue;
            }
            if !overlay_row {
                break;
            }
        }
        if overlay_row {
            let Some(window) = overlay_view.acquire(0, y - y_offset, overlay_columns, 1) else {
                break;
            };
            source_pixels.clear();
            source_pixels.extend_from_slice(window.pixels);
            source_indexes.clear();
            source_indexes.extend_from_slice(window.indexes);
        }

        let Some(window) = image_view.get(0, y, columns, 1) else {
            break;
        };
        for x in 0..columns as i64 {
            let overlay_column = x >= x_offset && x - x_offset < overlay_columns as i64;
            if !outside {
                if x < x_offset {
                    continue;
                }
                if !overlay_column {
                    break;
                }
            }
            let i = x as usize;
            let q = &mut window.pixels[i];
            let index = window.indexes.get(i).copied().unwrap_or(0);
            let destination = working_pixel(q, index, matte, cmyk);

            let mut result = if overlay_row && overlay_column {
                let u = (x - x_offset) as usize % overlay_columns;
                let source_index = source_indexes.get(u).copied().unwrap_or(0);
                let source = working_pixel(&source_pixels[u], source_index, source_matte, source_cmyk);
                compose_pixel(compose, &params, &source, source_matte, &destination)
            } else {
                compose_outside(compose, &params, &destination)
            };

            if cmyk {
                invert(&mut result);
                result.index = QUANTUM_RANGE_F - result.index;
            }
            q.red = round_to_quantum(result.red);
            q.green = round_to_quantum(result.green);
            q.blue = round_to_quantum(result.blue);
            if matte {
                q.opacity = round_to_quantum(result.opacity);
            }
            if cmyk && let Some(slot) = window.indexes.get_mut(i) {
                *slot = round_to_quantum(result.index);
            }
        }
        image_view.sync()?;
        if !context.progress(COMPOSITE_TAG, y as u64, rows as u64) {
            return Err(Error::Cancelled(COMPOSITE_TAG).into());
        }
    }
    Ok(())
}

/// Build the Displace source: every overlay pixel that lands on the image is
/// replaced by the image color sampled at a position shifted by the overlay
/// itself.
///
/// The horizontal shift follows the overlay intensity and the vertical shift
/// its opacity (or intensity when it has no matte), both centered on
/// mid-gray and scaled by the Displace arguments.
fn displace(
    image: &Image,
    map: &Image,
    x_offset: i64,
    y_offset: i64,
    params: &CompositeParams,
) -> CompositeResult<Image> {
    let displaced = map.deep_clone()?;
    let (columns, rows) = (image.columns() as i64, image.rows() as i64);
    let map_columns = map.columns();
    let map_matte = map.matte();
    log::trace!(
        "displace scale {}x{}",
        params.horizontal_scale,
        params.vertical_scale
    );

    let mut map_view = map.open_view()?;
    let mut image_view = image.open_view()?;
    let mut displaced_view = displaced.open_view()?;
    let mut row: Vec<PixelPacket> = Vec::with_capacity(map_columns);
    let mut samples: Vec<(usize, RealPixel)> = Vec::with_capacity(map_columns);
    for y in 0..map.rows() as i64 {
        if y + y_offset < 0 || y + y_offset >= rows {
            continue;
        }
        let Some(window) = map_view.acquire(0, y, map_columns, 1) else {
            break;
        };
        row.clear();
        row.extend_from_slice(window.pixels);

        samples.clear();
        for (u, p) in row.iter().enumerate() {
            let x = x_offset + u as i64;
            if x < 0 || x >= columns {
                continue;
            }
            let x_displace =
                params.horizontal_scale * (p.intensity() as f64 - MIDPOINT) / MIDPOINT;
            let y_displace = if map_matte {
                params.vertical_scale * (p.opacity as f64 - MIDPOINT) / MIDPOINT
            } else {
                x_displace
            };
            let pixel = interpolate_color(
                &mut image_view,
                x as f64 + x_displace,
                (y + y_offset) as f64 + y_displace,
            );
            samples.push((u, pixel));
        }

        let Some(window) = displaced_view.get(0, y, map_columns, 1) else {
            break;
        };
        for &(u, pixel) in &samples {
            let (packet, index) = pixel.to_packet();
            window.pixels[u] = packet;
            if let Some(slot) = window.indexes.get_mut(u) {
                *slot = index;
            }
        }
        displaced_view.sync()?;
    }
    Ok(displaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_core::{Context, QUANTUM_RANGE, TRANSPARENT_OPACITY};

    fn filled(columns: usize, rows: usize, color: PixelPacket) -> Image {
        let image = Image::new(&Context::default(), columns, rows);
        let mut view = image.open_view().unwrap();
        let window = view.set(0, 0, columns, rows).unwrap();
        window.pixels.fill(color);
        view.sync().unwrap();
        image
    }

    #[test]
    fn test_no_is_a_no_op() {
        let image = filled(2, 2, PixelPacket::white());
        let overlay = filled(2, 2, PixelPacket::black());
        composite_image(&image, CompositeOperator::No, &overlay, 0, 0).unwrap();
        assert_eq!(image.acquire_one_pixel(0, 0), PixelPacket::white());
    }

    #[test]
    fn test_over_opaque_overlay() {
        let image = filled(4, 3, PixelPacket::white());
        let red = PixelPacket::rgb(QUANTUM_RANGE, 0, 0);
        let overlay = filled(2, 2, red);
        composite_image(&image, CompositeOperator::Over, &overlay, 1, 1).unwrap();
        assert_eq!(image.acquire_one_pixel(1, 1), red);
        assert_eq!(image.acquire_one_pixel(2, 2), red);
        assert_eq!(image.acquire_one_pixel(0, 0), PixelPacket::white());
        assert_eq!(image.acquire_one_pixel(3, 2), PixelPacket::white());
    }

    #[test]
    fn test_negative_offset_clips() {
        let image = filled(3, 3, PixelPacket::white());
        let overlay = filled(2, 2, PixelPacket::black());
        composite_image(&image, CompositeOperator::Src, &overlay, -1, -1).unwrap();
        assert_eq!(image.acquire_one_pixel(0, 0), PixelPacket::black());
        // Src clears everything it does not cover
        let cleared = image.acquire_one_pixel(1, 1);
        assert_eq!((cleared.red, cleared.green, cleared.blue), (0, 0, 0));
        assert!(!image.matte());
        assert_eq!(cleared.opacity, OPAQUE_OPACITY);
    }

    #[test]
    fn test_copy_opacity_turns_on_matte() {
        let image = filled(3, 1, PixelPacket::white());
        let overlay = filled(1, 1, PixelPacket::black());
        composite_image(&image, CompositeOperator::CopyOpacity, &overlay, 1, 0).unwrap();
        assert!(image.matte());
        assert_eq!(image.acquire_one_pixel(1, 0).opacity, QUANTUM_RANGE);
        assert_eq!(image.acquire_one_pixel(0, 0).opacity, TRANSPARENT_OPACITY);
        assert_eq!(image.acquire_one_pixel(0, 0).red, QUANTUM_RANGE);
    }

    #[test]
    fn test_attribute_keeps_outside() {
        let image = filled(3, 1, PixelPacket::white());
        image.set_matte(true);
        let overlay = filled(1, 1, PixelPacket::black());
        overlay.set_attribute(MODIFY_OUTSIDE_OVERLAY, Some("false"));
        composite_image(&image, CompositeOperator::In, &overlay, 1, 0).unwrap();
        assert_eq!(image.acquire_one_pixel(0, 0), PixelPacket::white());
        assert_eq!(image.acquire_one_pixel(1, 0), PixelPacket::black());
    }
}
