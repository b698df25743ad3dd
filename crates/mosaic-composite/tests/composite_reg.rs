//! Composite regression test
//!
//! Alpha algebra of Over, operators that redefine the whole canvas,
//! geometry-driven operators, CMYK handling and progress cancellation.

use mosaic_cache::Image;
use mosaic_composite::{
    COMPOSITE_TAG, CompositeOperator, CompositeParams, composite_image, composite_image_with,
};
use mosaic_core::{
    Colorspace, Context, IndexPacket, OPAQUE_OPACITY, PixelPacket, QUANTUM_RANGE, Quantum,
    TRANSPARENT_OPACITY,
};
use mosaic_test::{Lcg, RegParams};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

fn image_from(ctx: &Context, columns: usize, rows: usize, pixels: &[PixelPacket]) -> Image {
    let image = Image::new(ctx, columns, rows);
    let mut view = image.open_view().unwrap();
    view.set(0, 0, columns, rows)
        .unwrap()
        .pixels
        .copy_from_slice(pixels);
    view.sync().unwrap();
    image
}

fn read_all(image: &Image) -> Vec<PixelPacket> {
    let mut view = image.open_view().unwrap();
    view.acquire(0, 0, image.columns(), image.rows())
        .unwrap()
        .pixels
        .to_vec()
}

/// `w` x `h` block at (`x`, `y`) of a row-major pixel run
fn region(
    pixels: &[PixelPacket],
    columns: usize,
    x: usize,
    y: usize,
    w: usize,
    h: usize,
) -> Vec<PixelPacket> {
    (y..y + h)
        .flat_map(|row| pixels[row * columns + x..row * columns + x + w].to_vec())
        .collect()
}

#[test_log::test]
fn composite_over_reg() {
    let mut rp = RegParams::new("composite_over");
    let ctx = Context::default();
    let mut rng = Lcg::new(5);

    // Opaque overlay replaces the destination exactly
    let base = rng.pixels(6 * 5);
    let image = image_from(&ctx, 6, 5, &base);
    image.set_matte(true);
    let stamp: Vec<PixelPacket> = rng
        .pixels(3 * 2)
        .into_iter()
        .map(|p| PixelPacket { opacity: OPAQUE_OPACITY, ..p })
        .collect();
    let overlay = image_from(&ctx, 3, 2, &stamp);
    overlay.set_matte(true);
    composite_image(&image, CompositeOperator::Over, &overlay, 2, 1).unwrap();
    let after = read_all(&image);
    rp.compare_pixels(&stamp, &region(&after, 6, 2, 1, 3, 2), 0);
    rp.compare_pixels(&base[..6], &after[..6], 0);
    rp.compare_pixels(&region(&base, 6, 0, 3, 6, 2), &region(&after, 6, 0, 3, 6, 2), 0);
    rp.compare_pixels(&region(&base, 6, 0, 1, 2, 2), &region(&after, 6, 0, 1, 2, 2), 0);

    // Transparent overlay leaves the destination as it was
    let base: Vec<PixelPacket> = rng
        .pixels(4 * 4)
        .into_iter()
        .map(|p| PixelPacket { opacity: p.opacity / 2, ..p })
        .collect();
    let image = image_from(&ctx, 4, 4, &base);
    image.set_matte(true);
    let clear: Vec<PixelPacket> = rng
        .pixels(4 * 4)
        .into_iter()
        .map(|p| PixelPacket { opacity: TRANSPARENT_OPACITY, ..p })
        .collect();
    let overlay = image_from(&ctx, 4, 4, &clear);
    overlay.set_matte(true);
    composite_image(&image, CompositeOperator::Over, &overlay, 0, 0).unwrap();
    rp.compare_pixels(&base, &read_all(&image), 1);

    // Overlay without matte counts as opaque
    let image = image_from(&ctx, 2, 1, &[PixelPacket::white(); 2]);
    let overlay = image_from(&ctx, 1, 1, &[PixelPacket::new(0, 0, 0, QUANTUM_RANGE)]);
    composite_image(&image, CompositeOperator::Over, &overlay, 1, 0).unwrap();
    rp.compare_pixels(
        &[PixelPacket::white(), PixelPacket::black()],
        &read_all(&image),
        0,
    );

    assert!(rp.cleanup());
}

#[test_log::test]
fn composite_outside_reg() {
    let mut rp = RegParams::new("composite_outside");
    let ctx = Context::default();
    let white = PixelPacket::white();
    let red = PixelPacket::rgb(QUANTUM_RANGE, 0, 0);

    // In: the overlap keeps the source, everything else turns transparent
    let image = image_from(&ctx, 3, 3, &[white; 9]);
    image.set_matte(true);
    let overlay = image_from(&ctx, 1, 1, &[red]);
    composite_image(&image, CompositeOperator::In, &overlay, 1, 1).unwrap();
    let after = read_all(&image);
    rp.compare_pixels(&[red], &after[4..5], 0);
    for (i, p) in after.iter().enumerate() {
        if i != 4 {
            rp.compare_values(TRANSPARENT_OPACITY as f64, p.opacity as f64, 0.0);
            rp.compare_values(QUANTUM_RANGE as f64, p.green as f64, 0.0);
        }
    }

    // Clear wipes the whole canvas
    let image = image_from(&ctx, 2, 2, &[white; 4]);
    image.set_matte(true);
    composite_image(&image, CompositeOperator::Clear, &overlay, 5, 5).unwrap();
    rp.compare_pixels(&[PixelPacket::transparent(); 4], &read_all(&image), 0);

    // Over leaves the rest untouched
    let image = image_from(&ctx, 3, 1, &[white; 3]);
    image.set_matte(true);
    composite_image(&image, CompositeOperator::Over, &overlay, 1, 0).unwrap();
    rp.compare_pixels(&[white, red, white], &read_all(&image), 0);

    // Restricting to the overlay turns In into a local operation
    let image = image_from(&ctx, 3, 1, &[white; 3]);
    image.set_matte(true);
    let params = CompositeParams {
        modify_outside_overlay: false,
        ..CompositeParams::new(CompositeOperator::In, None)
    };
    composite_image_with(&image, CompositeOperator::In, &overlay, 1, 0, &params).unwrap();
    rp.compare_pixels(&[white, red, white], &read_all(&image), 0);

    assert!(rp.cleanup());
}

#[test_log::test]
fn composite_geometry_reg() {
    let mut rp = RegParams::new("composite_geometry");
    let ctx = Context::default();

    // Dissolve 50: half the source over an opaque destination
    let image = image_from(&ctx, 2, 1, &[PixelPacket::white(); 2]);
    let overlay = image_from(&ctx, 1, 1, &[PixelPacket::rgb(QUANTUM_RANGE, 0, 0)]);
    overlay.set_geometry(Some("50"));
    composite_image(&image, CompositeOperator::Dissolve, &overlay, 0, 0).unwrap();
    let half = QUANTUM_RANGE / 2;
    let p = image.acquire_one_pixel(0, 0);
    rp.compare_values(QUANTUM_RANGE as f64, p.red as f64, 1.0);
    rp.compare_values(half as f64, p.green as f64, 1.0);
    rp.compare_values(half as f64, p.blue as f64, 1.0);
    rp.compare_pixels(&[PixelPacket::white()], &[image.acquire_one_pixel(1, 0)], 0);

    // Displace with a mid-gray map samples every pixel in place
    let mut rng = Lcg::new(9);
    let base: Vec<PixelPacket> = rng
        .pixels(6 * 6)
        .into_iter()
        .map(|p| PixelPacket { opacity: OPAQUE_OPACITY, ..p })
        .collect();
    let image = image_from(&ctx, 6, 6, &base);
    let mid = ((QUANTUM_RANGE as u64 + 1) / 2) as Quantum;
    let map = image_from(&ctx, 3, 3, &[PixelPacket::gray(mid); 9]);
    composite_image(&image, CompositeOperator::Displace, &map, 2, 2).unwrap();
    rp.compare_pixels(&base, &read_all(&image), 0);

    // A black map shifts by the full scale, up and to the left
    let map = image_from(&ctx, 2, 2, &[PixelPacket::black(); 4]);
    map.set_geometry(Some("2"));
    composite_image(&image, CompositeOperator::Displace, &map, 3, 3).unwrap();
    let after = read_all(&image);
    rp.compare_pixels(&region(&base, 6, 1, 1, 2, 2), &region(&after, 6, 3, 3, 2, 2), 0);
    rp.compare_pixels(&region(&base, 6, 0, 0, 6, 3), &region(&after, 6, 0, 0, 6, 3), 0);

    // Malformed geometry falls back to the defaults instead of failing
    map.set_geometry(Some("sideways"));
    rp.compare_values(
        1.0,
        composite_image(&image, CompositeOperator::Displace, &map, 0, 0).is_ok() as u8 as f64,
        0.0,
    );

    assert!(rp.cleanup());
}

#[test_log::test]
fn composite_cmyk_reg() {
    let mut rp = RegParams::new("composite_cmyk");
    let ctx = Context::default();

    let with_black = |columns: usize, pixels: &[PixelPacket], black: &[IndexPacket]| {
        let image = Image::new(&ctx, columns, 1);
        image.set_colorspace(Colorspace::Cmyk);
        let mut view = image.open_view().unwrap();
        let window = view.set(0, 0, columns, 1).unwrap();
        window.pixels.copy_from_slice(pixels);
        window.indexes.copy_from_slice(black);
        view.sync().unwrap();
        image
    };
    let ink = PixelPacket::new(10, 20, 30, 0);
    let image = with_black(2, &[PixelPacket::black(); 2], &[0, 0]);
    let overlay = with_black(1, &[ink], &[QUANTUM_RANGE / 3]);
    composite_image(&image, CompositeOperator::Over, &overlay, 1, 0).unwrap();

    let mut view = image.open_view().unwrap();
    let window = view.acquire(0, 0, 2, 1).unwrap();
    rp.compare_pixels(&[PixelPacket::black(), ink], window.pixels, 0);
    rp.compare_values(0.0, window.indexes[0] as f64, 0.0);
    rp.compare_values((QUANTUM_RANGE / 3) as f64, window.indexes[1] as f64, 0.0);

    // CopyBlack moves only the black plane
    drop(view);
    let overlay = with_black(1, &[PixelPacket::white()], &[QUANTUM_RANGE]);
    composite_image(&image, CompositeOperator::CopyBlack, &overlay, 0, 0).unwrap();
    let mut view = image.open_view().unwrap();
    let window = view.acquire(0, 0, 1, 1).unwrap();
    rp.compare_pixels(&[PixelPacket::black()], window.pixels, 0);
    rp.compare_values(QUANTUM_RANGE as f64, window.indexes[0] as f64, 0.0);

    assert!(rp.cleanup());
}

#[test_log::test]
fn composite_operators_reg() {
    let mut rp = RegParams::new("composite_operators");
    let ctx = Context::default();
    let mut rng = Lcg::new(31);
    let base = rng.pixels(5 * 4);
    let stamp = rng.pixels(3 * 3);

    for compose in CompositeOperator::ALL {
        let image = image_from(&ctx, 5, 4, &base);
        image.set_matte(true);
        let overlay = image_from(&ctx, 3, 3, &stamp);
        overlay.set_matte(true);
        let ok = composite_image(&image, compose, &overlay, 1, -1).is_ok();
        if !rp.compare_values(1.0, ok as u8 as f64, 0.0) {
            eprintln!("  {compose} failed");
        }
        rp.compare_values(0.0, image.exception().total() as f64, 0.0);
        // Operators confined to the overlay never touch column 0
        if !compose.modifies_outside_overlay()
            && !matches!(compose, CompositeOperator::Dissolve | CompositeOperator::Blend)
        {
            let after = read_all(&image);
            rp.compare_pixels(&region(&base, 5, 0, 0, 1, 4), &region(&after, 5, 0, 0, 1, 4), 0);
        }
        // The overlay itself is never modified
        rp.compare_pixels(&stamp, &read_all(&overlay), 0);
    }

    assert!(rp.cleanup());
}

#[test_log::test]
fn composite_progress_reg() {
    let mut rp = RegParams::new("composite_progress");
    let ctx = Context::default();
    let calls = Arc::new(AtomicU64::new(0));
    let seen = Arc::clone(&calls);
    ctx.set_progress_monitor(Some(Arc::new(move |tag: &str, offset: u64, extent: u64| {
        assert_eq!(tag, COMPOSITE_TAG);
        assert_eq!(extent, 4);
        seen.fetch_add(1, Ordering::SeqCst);
        offset < 1
    })));

    let image = image_from(&ctx, 2, 4, &[PixelPacket::white(); 8]);
    let overlay = image_from(&ctx, 2, 4, &[PixelPacket::black(); 8]);
    let err = composite_image(&image, CompositeOperator::Src, &overlay, 0, 0).unwrap_err();
    rp.compare_values(1.0, (err.reason() == "Cancelled") as u8 as f64, 0.0);
    rp.compare_values(2.0, calls.load(Ordering::SeqCst) as f64, 0.0);

    // Rows finished before the stop are kept
    let after = read_all(&image);
    rp.compare_pixels(&[PixelPacket::black(); 4], &after[..4], 0);
    rp.compare_pixels(&[PixelPacket::white(); 4], &after[4..], 0);

    assert!(rp.cleanup());
}
