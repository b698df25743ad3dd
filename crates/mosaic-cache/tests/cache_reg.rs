//! Pixel cache regression test
//!
//! Windowed writes and reads, virtual pixels at the borders, disk spill
//! and re-shaping.

use mosaic_cache::{CacheType, Image, VirtualPixelMethod};
use mosaic_core::{
    Colormap, Context, PixelPacket, Quantum, ResourceLimits, ResourceType, StorageClass,
};
use mosaic_test::{Lcg, RegParams};

/// Fill `image` row by row with a recognizable pattern
fn fill_pattern(image: &Image) {
    let (columns, rows) = (image.columns(), image.rows());
    let mut view = image.open_view().unwrap();
    for y in 0..rows {
        let window = view.set(0, y as i64, columns, 1).unwrap();
        for (x, p) in window.pixels.iter_mut().enumerate() {
            *p = PixelPacket::new(x as Quantum, y as Quantum, (x + y) as Quantum, 0);
        }
        view.sync().unwrap();
    }
}

fn at(x: i64, y: i64) -> PixelPacket {
    PixelPacket::new(x as Quantum, y as Quantum, (x + y) as Quantum, 0)
}

#[test_log::test]
fn cache_reg() {
    let mut rp = RegParams::new("cache");
    let ctx = Context::new(ResourceLimits::unlimited());

    // Get, sync, then acquire the same rectangle
    let image = Image::new(&ctx, 8, 6);
    let mut rng = Lcg::new(7);
    let written = rng.pixels(12);
    let mut view = image.open_view().unwrap();
    view.get(2, 1, 4, 3).unwrap().pixels.copy_from_slice(&written);
    view.sync().unwrap();
    let read = view.acquire(2, 1, 4, 3).unwrap().pixels.to_vec();
    rp.compare_pixels(&written, &read, 0);
    drop(view);

    // Edge clamps, mirror reflects, tile wraps
    let image = Image::new(&ctx, 4, 3);
    fill_pattern(&image);
    let mut view = image.open_view().unwrap();

    image.set_virtual_pixel_method(VirtualPixelMethod::Edge);
    let window = view.acquire(-2, -1, 3, 1).unwrap();
    rp.compare_pixels(&[at(0, 0), at(0, 0), at(0, 0)], window.pixels, 0);
    let window = view.acquire(3, 4, 2, 1).unwrap();
    rp.compare_pixels(&[at(3, 2), at(3, 2)], window.pixels, 0);

    image.set_virtual_pixel_method(VirtualPixelMethod::Mirror);
    let window = view.acquire(-2, 0, 3, 1).unwrap();
    rp.compare_pixels(&[at(1, 0), at(0, 0), at(0, 0)], window.pixels, 0);
    let window = view.acquire(3, 3, 2, 1).unwrap();
    rp.compare_pixels(&[at(3, 2), at(3, 2)], window.pixels, 0);

    image.set_virtual_pixel_method(VirtualPixelMethod::Tile);
    let window = view.acquire(3, -1, 3, 1).unwrap();
    rp.compare_pixels(&[at(3, 2), at(0, 2), at(1, 2)], window.pixels, 0);
    drop(view);

    // Spill to disk under a tight memory limit; same API, same pixels
    ctx.set_limit(ResourceType::Memory, Some(64));
    let disk = Image::new(&ctx, 16, 16);
    disk.sync_cache().unwrap();
    assert_eq!(disk.cache_type(), CacheType::Disk);
    fill_pattern(&disk);
    let mut view = disk.open_view().unwrap();
    let window = view.acquire(14, 15, 3, 1).unwrap();
    rp.compare_pixels(&[at(14, 15), at(15, 15), at(15, 15)], window.pixels, 0);
    drop(view);
    ctx.set_limit(ResourceType::Memory, None);

    // Re-shaping keeps the overlap and adds an index plane for PseudoClass
    image.set_colormap(Colormap::linear(4).unwrap());
    assert_eq!(image.storage_class(), StorageClass::Pseudo);
    image.set_extent(2, 5).unwrap();
    let mut view = image.open_view().unwrap();
    let window = view.acquire(0, 0, 2, 3).unwrap();
    rp.compare_values(6.0, window.indexes.len() as f64, 0.0);
    rp.compare_pixels(
        &[at(0, 0), at(1, 0), at(0, 1), at(1, 1), at(0, 2), at(1, 2)],
        window.pixels,
        0,
    );
    let window = view.acquire(0, 3, 2, 1).unwrap();
    rp.compare_pixels(&[PixelPacket::default(); 2], window.pixels, 0);
    drop(view);

    // Resources are returned once the images go away
    drop(image);
    drop(disk);
    rp.compare_values(0.0, ctx.resource_usage(ResourceType::Disk) as f64, 0.0);
    rp.compare_values(0.0, ctx.resource_usage(ResourceType::File) as f64, 0.0);

    assert!(rp.cleanup());
}

#[test]
fn cache_exhausted_reg() {
    let mut limits = ResourceLimits::unlimited();
    limits.memory = Some(0);
    limits.file = Some(0);
    let ctx = Context::new(limits);
    let image = Image::new(&ctx, 4, 4);
    let err = image.open_view().unwrap_err();
    assert_eq!(err.reason(), "CacheResourcesExhausted");
    assert!(err.severity().is_fatal());
}

#[test_log::test]
fn cache_oversized_window_reg() {
    let mut rp = RegParams::new("cache_oversized_window");
    let image = Image::new(&Context::new(ResourceLimits::unlimited()), 4, 4);
    let mut view = image.open_view().unwrap();

    // Virtual windows are unbounded; an unservable size is a null window
    rp.compare_values(
        1.0,
        view.acquire(0, 0, usize::MAX / 2, 3).is_none() as u8 as f64,
        0.0,
    );
    rp.compare_values(
        1.0,
        image.exception().count("CacheResourcesExhausted") as f64,
        0.0,
    );

    // Windows past the area limit are refused as well
    let mut limits = ResourceLimits::unlimited();
    limits.area = Some(64);
    let limited = Image::new(&Context::new(limits), 4, 4);
    let mut view = limited.open_view().unwrap();
    rp.compare_values(1.0, view.acquire(-2, -2, 8, 8).is_some() as u8 as f64, 0.0);
    rp.compare_values(0.0, view.acquire(-8, -8, 20, 20).is_some() as u8 as f64, 0.0);
    rp.compare_values(
        1.0,
        limited.exception().count("CacheResourcesExhausted") as f64,
        0.0,
    );

    // The view stays usable after a refused window
    rp.compare_values(1.0, view.acquire(0, 0, 2, 2).is_some() as u8 as f64, 0.0);

    assert!(rp.cleanup());
}
