//! Composite options regression test
//!
//! Tiling, gravity placement, operator restriction and the two special
//! effects reached through `CompositeOptions::apply`.

use mosaic_cache::Image;
use mosaic_composite::{CompositeOperator, CompositeOptions};
use mosaic_core::{Context, PixelPacket, QUANTUM_DEPTH, QUANTUM_RANGE, Quantum};
use mosaic_test::{Lcg, RegParams};

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

/// Positions of the pixels equal to `color`
fn marked(pixels: &[PixelPacket], columns: usize, color: PixelPacket) -> Vec<(usize, usize)> {
    pixels
        .iter()
        .enumerate()
        .filter(|(_, p)| **p == color)
        .map(|(i, _)| (i % columns, i / columns))
        .collect()
}

#[test_log::test]
fn options_tile_reg() {
    let mut rp = RegParams::new("options_tile");
    let ctx = Context::default();
    let red = PixelPacket::rgb(QUANTUM_RANGE, 0, 0);

    let image = image_from(&ctx, 5, 4, &[PixelPacket::white(); 20]);
    let tile = image_from(&ctx, 2, 2, &[red; 4]);
    let tiled = CompositeOptions::new()
        .with_tile(true)
        .apply(&image, &tile)
        .unwrap();
    rp.compare_pixels(&[red; 20], &read_all(&tiled), 0);
    // The destination passed in is left alone
    rp.compare_pixels(&[PixelPacket::white(); 20], &read_all(&image), 0);

    // Tiling forces local compositing even for In
    let tiled = CompositeOptions::new()
        .with_operator(CompositeOperator::In)
        .with_tile(true)
        .apply(&image, &tile)
        .unwrap();
    rp.compare_pixels(&[red; 20], &read_all(&tiled), 0);

    let err = CompositeOptions::new()
        .with_tile(true)
        .apply(&image, &Image::new(&ctx, 0, 0))
        .unwrap_err();
    rp.compare_values(
        1.0,
        (err.reason() == "NoPixelsDefinedInCache") as u8 as f64,
        0.0,
    );

    assert!(rp.cleanup());
}

#[test_log::test]
fn options_gravity_reg() {
    let mut rp = RegParams::new("options_gravity");
    let ctx = Context::default();
    let canvas = image_from(&ctx, 6, 6, &[PixelPacket::white(); 36]);
    let stamp = image_from(&ctx, 2, 2, &[PixelPacket::black(); 4]);

    let centered = CompositeOptions::new()
        .with_gravity("center")
        .unwrap()
        .apply(&canvas, &stamp)
        .unwrap();
    rp.compare_values(
        1.0,
        (marked(&read_all(&centered), 6, PixelPacket::black()) == [(2, 2), (3, 2), (2, 3), (3, 3)])
            as u8 as f64,
        0.0,
    );

    let corner = CompositeOptions::new()
        .with_gravity("NorthEast")
        .unwrap()
        .with_geometry("+1+0")
        .unwrap()
        .apply(&canvas, &stamp)
        .unwrap();
    rp.compare_values(
        1.0,
        (marked(&read_all(&corner), 6, PixelPacket::black()) == [(3, 0), (4, 0), (3, 1), (4, 1)])
            as u8 as f64,
        0.0,
    );

    // Plain offset with the default anchor
    let placed = CompositeOptions::new()
        .with_geometry("+4+5")
        .unwrap()
        .apply(&canvas, &stamp)
        .unwrap();
    rp.compare_values(
        1.0,
        (marked(&read_all(&placed), 6, PixelPacket::black()) == [(4, 5), (5, 5)]) as u8 as f64,
        0.0,
    );

    assert!(rp.cleanup());
}

#[test_log::test]
fn options_restrict_reg() {
    let mut rp = RegParams::new("options_restrict");
    let ctx = Context::default();
    let canvas = image_from(&ctx, 4, 1, &[PixelPacket::white(); 4]);
    canvas.set_matte(true);
    let stamp = image_from(&ctx, 1, 1, &[PixelPacket::black()]);

    let opts = CompositeOptions::new().with_compose("in").unwrap();
    let open = opts.clone().apply(&canvas, &stamp).unwrap();
    rp.compare_pixels(
        &[
            PixelPacket::black(),
            PixelPacket::transparent(),
            PixelPacket::transparent(),
            PixelPacket::transparent(),
        ],
        &read_all(&open),
        0,
    );

    let confined = opts
        .with_restrict_to_overlay(true)
        .apply(&canvas, &stamp)
        .unwrap();
    rp.compare_pixels(
        &[
            PixelPacket::black(),
            PixelPacket::white(),
            PixelPacket::white(),
            PixelPacket::white(),
        ],
        &read_all(&confined),
        0,
    );

    assert!(rp.cleanup());
}

#[test_log::test]
fn options_stereo_reg() {
    let mut rp = RegParams::new("options_stereo");
    let ctx = Context::default();
    let mut rng = Lcg::new(17);
    let left_pixels = rng.pixels(3 * 2);
    let right_pixels = rng.pixels(3 * 2);
    let left = image_from(&ctx, 3, 2, &left_pixels);
    let right = image_from(&ctx, 3, 2, &right_pixels);

    let stereo = CompositeOptions::new()
        .with_stereo(true)
        .apply(&left, &right)
        .unwrap();
    let expected: Vec<PixelPacket> = left_pixels
        .iter()
        .zip(&right_pixels)
        .map(|(p, q)| {
            PixelPacket::new(
                p.red,
                q.green,
                q.blue,
                ((p.opacity as u64 + q.opacity as u64) / 2) as Quantum,
            )
        })
        .collect();
    rp.compare_pixels(&expected, &read_all(&stereo), 0);

    let err = CompositeOptions::new()
        .with_stereo(true)
        .apply(&left, &Image::new(&ctx, 2, 3))
        .unwrap_err();
    rp.compare_values(1.0, (err.reason() == "ImageSizesDiffer") as u8 as f64, 0.0);

    assert!(rp.cleanup());
}

#[test_log::test]
fn options_stegano_reg() {
    let mut rp = RegParams::new("options_stegano");
    let ctx = Context::default();
    let value = (0xA5A5_A5A5u64 & QUANTUM_RANGE as u64) as Quantum;
    let image = image_from(&ctx, 4, 4, &[PixelPacket::black(); 16]);
    let watermark = image_from(&ctx, 1, 1, &[PixelPacket::gray(value)]);
    let start = 5u64;

    let hidden = CompositeOptions::new()
        .with_stegano("5")
        .unwrap()
        .apply(&image, &watermark)
        .unwrap();
    rp.compare_values(QUANTUM_DEPTH as f64, hidden.depth() as f64, 0.0);

    // Write n lands on pixel (start + n) mod 16, channel n mod 3, and bit
    // n / 16, carrying watermark bit QUANTUM_DEPTH - 1 - n
    let mut expected = [PixelPacket::black(); 16];
    for n in 0..QUANTUM_DEPTH as u64 {
        if (value >> (QUANTUM_DEPTH as u64 - 1 - n)) & 1 == 0 {
            continue;
        }
        let pixel = &mut expected[((start + n) % 16) as usize];
        let bit: Quantum = 1 << (n / 16);
        match n % 3 {
            0 => pixel.red |= bit,
            1 => pixel.green |= bit,
            _ => pixel.blue |= bit,
        }
    }
    rp.compare_pixels(&expected, &read_all(&hidden), 0);
    rp.compare_pixels(&[PixelPacket::black(); 16], &read_all(&image), 0);

    assert!(rp.cleanup());
}
