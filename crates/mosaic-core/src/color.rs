//! HSB color conversion on the Quantum scale
//!
//! Used by the hue-family and modulate composite operators.  Hue,
//! saturation and brightness are all normalised to `[0, 1]`; hue 0 and 1
//! are both red.

use crate::quantum::{QUANTUM_RANGE_F, QUANTUM_SCALE};

/// HSB color values.
///
/// Hue correspondence:
/// - 0: red
/// - 1/6: yellow
/// - 1/3: green
/// - 1/2: cyan
/// - 2/3: blue
/// - 5/6: magenta
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hsb {
    pub hue: f64,
    pub saturation: f64,
    pub brightness: f64,
}

/// Convert real-valued RGB samples (Quantum scale) to HSB.
pub fn rgb_to_hsb(red: f64, green: f64, blue: f64) -> Hsb {
    let max = red.max(green).max(blue);
    let min = red.min(green).min(blue);
    let mut hsb = Hsb {
        hue: 0.0,
        saturation: 0.0,
        brightness: QUANTUM_SCALE * max,
    };
    if max != 0.0 {
        hsb.saturation = (max - min) / max;
    }
    if hsb.saturation == 0.0 {
        return hsb;
    }
    let delta = max - min;
    let mut hue = if red == max {
        (green - blue) / delta
    } else if green == max {
        2.0 + (blue - red) / delta
    } else {
        4.0 + (red - green) / delta
    };
    hue /= 6.0;
    if hue < 0.0 {
        hue += 1.0;
    } else if hue > 1.0 {
        hue -= 1.0;
    }
    hsb.hue = hue;
    hsb
}

/// Convert HSB to real-valued RGB samples on the Quantum scale.
pub fn hsb_to_rgb(hsb: Hsb) -> (f64, f64, f64) {
    let Hsb {
        hue,
        saturation,
        brightness,
    } = hsb;
    if saturation == 0.0 {
        let v = QUANTUM_RANGE_F * brightness;
        return (v, v, v);
    }
    let mut h = 6.0 * hue;
    if h == 6.0 {
        h = 0.0;
    }
    let sector = h.trunc();
    let f = h - sector;
    let p = brightness * (1.0 - saturation);
    let q = brightness * (1.0 - saturation * f);
    let t = brightness * (1.0 - saturation * (1.0 - f));
    let (r, g, b) = match sector as i64 {
        1 => (q, brightness, p),
        2 => (p, brightness, t),
        3 => (p, q, brightness),
        4 => (t, p, brightness),
        5 => (brightness, p, q),
        _ => (brightness, t, p),
    };
    (QUANTUM_RANGE_F * r, QUANTUM_RANGE_F * g, QUANTUM_RANGE_F * b)
}
