//! Bilinear color interpolation

use crate::view::CacheView;
use mosaic_core::{Colorspace, MAGICK_EPSILON, QUANTUM_RANGE_F, QUANTUM_SCALE, RealPixel};

/// Alpha-weighted bilinear sample at real coordinates.
///
/// Reads the 2x2 neighborhood anchored at `(floor(x), floor(y))` through the
/// view, so coordinates past the edge follow the virtual pixel method.
/// Color channels are weighted by alpha and renormalized; opacity is
/// interpolated directly.  Returns the image background color if the
/// neighborhood cannot be read.
pub fn interpolate_color(view: &mut CacheView, x: f64, y: f64) -> RealPixel {
    let (matte, cmyk, background) = {
        let image = view.image();
        (
            image.matte(),
            image.colorspace() == Colorspace::Cmyk,
            image.background_color(),
        )
    };
    let (x0, y0) = (x.floor(), y.floor());
    let Some(window) = view.acquire(x0 as i64, y0 as i64, 2, 2) else {
        return RealPixel::from_packet(&background, 0);
    };

    let mut alpha = [1.0f64; 4];
    let mut samples = [RealPixel::default(); 4];
    for i in 0..4 {
        let p = &window.pixels[i];
        if matte {
            alpha[i] = QUANTUM_SCALE * (QUANTUM_RANGE_F - p.opacity as f64);
        }
        let index = if cmyk { window.indexes[i] } else { 0 };
        let s = RealPixel::from_packet(p, index);
        samples[i] = RealPixel {
            red: alpha[i] * s.red,
            green: alpha[i] * s.green,
            blue: alpha[i] * s.blue,
            opacity: s.opacity,
            index: alpha[i] * s.index,
        };
    }

    let dx = x - x0;
    let dy = y - y0;
    let bilinear = |v: [f64; 4]| {
        (1.0 - dy) * ((1.0 - dx) * v[0] + dx * v[1]) + dy * ((1.0 - dx) * v[2] + dx * v[3])
    };
    let gamma = bilinear(alpha);
    let gamma = 1.0 / if gamma.abs() <= MAGICK_EPSILON { 1.0 } else { gamma };
    let channel = |f: fn(&RealPixel) -> f64| bilinear([
        f(&samples[0]),
        f(&samples[1]),
        f(&samples[2]),
        f(&samples[3]),
    ]);

    RealPixel {
        red: gamma * channel(|s| s.red),
        green: gamma * channel(|s| s.green),
        blue: gamma * channel(|s| s.blue),
        opacity: if matte { channel(|s| s.opacity) } else { 0.0 },
        index: if cmyk { gamma * channel(|s| s.index) } else { 0.0 },
    }
}
