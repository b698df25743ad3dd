//! Per-pixel composite operators
//!
//! Every operator combines a source pixel `p`, with opacity `alpha`, and a
//! destination pixel `q`, with opacity `beta`.  Opacities are on the
//! Quantum scale, 0 meaning opaque.  With `Sa = 1 - alpha/QuantumRange`,
//! `Da = 1 - beta/QuantumRange` and premultiplied colors `Sca`, `Dca`:
//!
//! | Operator    | Coverage (`gamma`)     | Color                        |
//! |-------------|------------------------|------------------------------|
//! | Over        | `Sa + Da - Sa*Da`      | `Sca + Dca*(1-Sa)`           |
//! | In          | `Sa*Da`                | `Sca*Da`                     |
//! | Out         | `Sa*(1-Da)`            | `Sca*(1-Da)`                 |
//! | Atop        | `Da`                   | `Sca*Da + Dca*(1-Sa)`        |
//! | Xor         | `Sa + Da - 2*Sa*Da`    | `Sca*(1-Da) + Dca*(1-Sa)`    |
//! | Plus, Minus | `Sa +/- Da`, clamped   | `Sca +/- Dca`                |
//! | blend modes | `Sa + Da - Sa*Da`      | mode-specific                |
//!
//! The resulting color is divided by `gamma`, and a `gamma` within
//! [`MAGICK_EPSILON`] of zero divides by 1 instead.  When both pixels are
//! fully transparent SoftLight evaluates 0/0; such channels are stored
//! as 0.

use crate::operator::CompositeOperator;
use crate::params::CompositeParams;
use mosaic_core::quantum::round_to_unity;
use mosaic_core::{
    Hsb, MAGICK_EPSILON, QUANTUM_RANGE_F, QUANTUM_SCALE, RealPixel, TRANSPARENT_OPACITY,
    hsb_to_rgb, rgb_to_hsb,
};

const QR: f64 = QUANTUM_RANGE_F;
const QS: f64 = QUANTUM_SCALE;
const TRANSPARENT: f64 = TRANSPARENT_OPACITY as f64;

/// Half the number of Quantum levels; the neutral point of Modulate and
/// Displace maps.
pub const MIDPOINT: f64 = (QUANTUM_RANGE_F + 1.0) / 2.0;

#[inline]
fn reciprocal(gamma: f64) -> f64 {
    1.0 / if gamma.abs() <= MAGICK_EPSILON {
        1.0
    } else {
        gamma
    }
}

#[inline]
fn defined(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value }
}

/// Apply `channel(p, q)` to every color sample and normalize by `gamma`
fn weighted(
    p: &RealPixel,
    q: &RealPixel,
    gamma: f64,
    channel: impl Fn(f64, f64) -> f64,
) -> RealPixel {
    let scale = reciprocal(gamma);
    RealPixel {
        red: defined(scale * channel(p.red, q.red)),
        green: defined(scale * channel(p.green, q.green)),
        blue: defined(scale * channel(p.blue, q.blue)),
        opacity: QR * (1.0 - gamma),
        index: defined(scale * channel(p.index, q.index)),
    }
}

#[inline]
fn coverage(alpha: f64, beta: f64) -> (f64, f64) {
    (1.0 - QS * alpha, 1.0 - QS * beta)
}

// ============================================================================
// Porter-Duff operators
// ============================================================================

/// Source over destination
pub fn over(p: &RealPixel, alpha: f64, q: &RealPixel, beta: f64) -> RealPixel {
    let (sa, da) = coverage(alpha, beta);
    let gamma = 1.0 - QS * QS * alpha * beta;
    weighted(p, q, gamma, |p, q| sa * p + da * q * QS * alpha)
}

/// Source where the destination is, destination elsewhere
pub fn atop(p: &RealPixel, alpha: f64, q: &RealPixel, beta: f64) -> RealPixel {
    let (sa, da) = coverage(alpha, beta);
    weighted(p, q, da, |p, q| sa * p * da + da * q * QS * alpha)
}

/// Source where the destination is
pub fn src_in(p: &RealPixel, alpha: f64, q: &RealPixel, beta: f64) -> RealPixel {
    let (sa, da) = coverage(alpha, beta);
    weighted(p, q, sa * da, |p, _| sa * p * da)
}

/// Source where the destination is not
pub fn src_out(p: &RealPixel, alpha: f64, q: &RealPixel, beta: f64) -> RealPixel {
    let (sa, _) = coverage(alpha, beta);
    weighted(p, q, sa * QS * beta, |p, _| sa * p * QS * beta)
}

/// Source and destination where the other is not
pub fn xor(p: &RealPixel, alpha: f64, q: &RealPixel, beta: f64) -> RealPixel {
    let (sa, da) = coverage(alpha, beta);
    let gamma = sa + da - 2.0 * sa * da;
    weighted(p, q, gamma, |p, q| sa * p * QS * beta + da * q * QS * alpha)
}

/// Sum of the premultiplied colors
pub fn plus(p: &RealPixel, alpha: f64, q: &RealPixel, beta: f64) -> RealPixel {
    let (sa, da) = coverage(alpha, beta);
    weighted(p, q, round_to_unity(sa + da), |p, q| sa * p + da * q)
}

/// Difference of the premultiplied colors
pub fn minus(p: &RealPixel, alpha: f64, q: &RealPixel, beta: f64) -> RealPixel {
    let (sa, da) = coverage(alpha, beta);
    weighted(p, q, round_to_unity(sa - da), |p, q| sa * p - da * q)
}

// ============================================================================
// Blend modes
// ============================================================================

/// Coverage of the blend modes: the union of both pixels
#[inline]
fn union(sa: f64, da: f64) -> f64 {
    round_to_unity(sa + da - sa * da)
}

/// Parts of the source and destination left uncovered by the other
#[inline]
fn uncovered(sca: f64, dca: f64, sa: f64, da: f64) -> f64 {
    sca * (1.0 - da) + dca * (1.0 - sa)
}

pub fn multiply(p: &RealPixel, alpha: f64, q: &RealPixel, beta: f64) -> RealPixel {
    let (sa, da) = coverage(alpha, beta);
    weighted(p, q, union(sa, da), |p, q| {
        QS * sa * p * da * q + sa * p * QS * beta + da * q * QS * alpha
    })
}

pub fn screen(p: &RealPixel, alpha: f64, q: &RealPixel, beta: f64) -> RealPixel {
    let (sa, da) = coverage(alpha, beta);
    weighted(p, q, union(sa, da), |p, q| {
        let (sca, dca) = (QS * sa * p, QS * da * q);
        QR * (sca + dca - sca * dca)
    })
}

pub fn darken(p: &RealPixel, alpha: f64, q: &RealPixel, beta: f64) -> RealPixel {
    let (sa, da) = coverage(alpha, beta);
    weighted(p, q, union(sa, da), |p, q| {
        if sa * p * da < da * q * sa {
            sa * p + da * q * QS * alpha
        } else {
            da * q + sa * p * QS * beta
        }
    })
}

pub fn lighten(p: &RealPixel, alpha: f64, q: &RealPixel, beta: f64) -> RealPixel {
    let (sa, da) = coverage(alpha, beta);
    weighted(p, q, union(sa, da), |p, q| {
        if sa * p * da > da * q * sa {
            sa * p + da * q * QS * alpha
        } else {
            da * q + sa * p * QS * beta
        }
    })
}

pub fn difference(p: &RealPixel, alpha: f64, q: &RealPixel, beta: f64) -> RealPixel {
    let (sa, da) = coverage(alpha, beta);
    weighted(p, q, union(sa, da), |p, q| {
        let (sca, dca) = (QS * sa * p, QS * da * q);
        QR * (sca + dca - 2.0 * (sca * da).min(dca * sa))
    })
}

pub fn exclusion(p: &RealPixel, alpha: f64, q: &RealPixel, beta: f64) -> RealPixel {
    let (sa, da) = coverage(alpha, beta);
    weighted(p, q, union(sa, da), |p, q| {
        let (sca, dca) = (QS * sa * p, QS * da * q);
        QR * ((sca * da + dca * sa - 2.0 * sca * dca) + uncovered(sca, dca, sa, da))
    })
}

/// Multiply or screen, chosen by `dark`
#[inline]
fn light(sca: f64, dca: f64, sa: f64, da: f64, dark: bool) -> f64 {
    let rest = uncovered(sca, dca, sa, da);
    if dark {
        QR * (2.0 * sca * dca + rest)
    } else {
        QR * (sa * da - 2.0 * (da - dca) * (sa - sca) + rest)
    }
}

pub fn hard_light(p: &RealPixel, alpha: f64, q: &RealPixel, beta: f64) -> RealPixel {
    let (sa, da) = coverage(alpha, beta);
    weighted(p, q, union(sa, da), |p, q| {
        let (sca, dca) = (QS * sa * p, QS * da * q);
        light(sca, dca, sa, da, 2.0 * sca < sa)
    })
}

pub fn overlay(p: &RealPixel, alpha: f64, q: &RealPixel, beta: f64) -> RealPixel {
    let (sa, da) = coverage(alpha, beta);
    weighted(p, q, union(sa, da), |p, q| {
        let (sca, dca) = (QS * sa * p, QS * da * q);
        light(sca, dca, sa, da, 2.0 * dca < da)
    })
}

pub fn soft_light(p: &RealPixel, alpha: f64, q: &RealPixel, beta: f64) -> RealPixel {
    let (sa, da) = coverage(alpha, beta);
    weighted(p, q, union(sa, da), |p, q| {
        let (sca, dca) = (QS * sa * p, QS * da * q);
        let rest = uncovered(sca, dca, sa, da);
        if 2.0 * sca < sa {
            return QR * (dca * (sa - (1.0 - dca / da) * (2.0 * sca - sa)) + rest);
        }
        if 8.0 * dca <= da {
            return QR
                * (dca * (sa - (1.0 - dca / da) * (2.0 * sca - sa) * (3.0 - 8.0 * dca / da))
                    + rest);
        }
        QR * ((dca * sa + (da - dca) * (2.0 * sca - sa)) + rest)
    })
}

pub fn color_dodge(p: &RealPixel, alpha: f64, q: &RealPixel, beta: f64) -> RealPixel {
    let (sa, da) = coverage(alpha, beta);
    weighted(p, q, union(sa, da), |p, q| {
        let (sca, dca) = (QS * sa * p, QS * da * q);
        let rest = uncovered(sca, dca, sa, da);
        if sca * da + dca * sa >= sa * da {
            QR * (sa * da + rest)
        } else {
            QR * (dca * sa / (1.0 - sca / sa) + rest)
        }
    })
}

pub fn color_burn(p: &RealPixel, alpha: f64, q: &RealPixel, beta: f64) -> RealPixel {
    let (sa, da) = coverage(alpha, beta);
    weighted(p, q, union(sa, da), |p, q| {
        let (sca, dca) = (QS * sa * p, QS * da * q);
        let rest = uncovered(sca, dca, sa, da);
        let delta = sca * da + dca * sa;
        if delta <= sa * da {
            QR * rest
        } else {
            QR * (sa * (delta - sa * da) / QS * sa * p + rest)
        }
    })
}

// ============================================================================
// Arithmetic operators
// ============================================================================

/// Wrapping sum of every sample, opacity included
pub fn add(p: &RealPixel, alpha: f64, q: &RealPixel, beta: f64) -> RealPixel {
    let wrap = |p: f64, q: f64| {
        let sum = p + q;
        if sum > QR { sum - (QR + 1.0) } else { sum }
    };
    RealPixel {
        red: wrap(p.red, q.red),
        green: wrap(p.green, q.green),
        blue: wrap(p.blue, q.blue),
        opacity: wrap(alpha, beta),
        index: wrap(p.index, q.index),
    }
}

/// Wrapping difference of the color samples; opacity is the destination's
pub fn subtract(p: &RealPixel, q: &RealPixel) -> RealPixel {
    let wrap = |p: f64, q: f64| {
        let delta = p - q;
        if delta < 0.0 { delta + (QR + 1.0) } else { delta }
    };
    RealPixel {
        red: wrap(p.red, q.red),
        green: wrap(p.green, q.green),
        blue: wrap(p.blue, q.blue),
        opacity: q.opacity,
        index: wrap(p.index, q.index),
    }
}

/// Destination moved toward the source by `amount` where the two differ
/// by at least half of `threshold`
pub fn threshold(p: &RealPixel, q: &RealPixel, threshold: f64, amount: f64) -> RealPixel {
    let gate = |p: f64, q: f64| {
        let delta = p - q;
        if (2.0 * delta).abs() < threshold {
            q
        } else {
            q + delta * amount
        }
    };
    RealPixel {
        red: gate(p.red, q.red),
        green: gate(p.green, q.green),
        blue: gate(p.blue, q.blue),
        opacity: QR - gate(p.opacity, q.opacity),
        index: gate(p.index, q.index),
    }
}

/// Destination shaded by the source intensity
pub fn bumpmap(p: &RealPixel, q: &RealPixel) -> RealPixel {
    let shade = QS * p.intensity();
    RealPixel {
        red: shade * q.red,
        green: shade * q.green,
        blue: shade * q.blue,
        opacity: shade * p.opacity,
        index: shade * q.index,
    }
}

/// Fully transparent black
pub fn clear() -> RealPixel {
    RealPixel {
        opacity: TRANSPARENT,
        ..Default::default()
    }
}

// ============================================================================
// HSB operators
// ============================================================================

fn hsb(pixel: &RealPixel) -> Hsb {
    rgb_to_hsb(pixel.red, pixel.green, pixel.blue)
}

fn with_hsb(pixel: &RealPixel, value: Hsb) -> RealPixel {
    let (red, green, blue) = hsb_to_rgb(value);
    RealPixel {
        red,
        green,
        blue,
        ..*pixel
    }
}

/// Destination brightness shifted by how far the source intensity is from
/// mid-gray, saturation scaled
pub fn modulate(
    p: &RealPixel,
    q: &RealPixel,
    percent_brightness: f64,
    percent_saturation: f64,
) -> RealPixel {
    if p.opacity == TRANSPARENT {
        return *q;
    }
    let offset = (p.intensity() - MIDPOINT).trunc();
    if offset == 0.0 {
        return *q;
    }
    let mut value = hsb(q);
    value.brightness += 0.01 * percent_brightness * offset / MIDPOINT;
    value.saturation *= 0.01 * percent_saturation;
    with_hsb(q, value)
}

/// Shared shape of Hue, Saturate, Luminize and Colorize
fn hsb_blend(p: &RealPixel, q: &RealPixel, mix: impl Fn(Hsb, Hsb) -> Hsb) -> RealPixel {
    if p.opacity == TRANSPARENT {
        return *q;
    }
    if q.opacity == TRANSPARENT {
        return *p;
    }
    let mut composite = with_hsb(q, mix(hsb(p), hsb(q)));
    if p.opacity < q.opacity {
        composite.opacity = p.opacity;
    }
    composite
}

/// Source hue with destination saturation and brightness
pub fn hue(p: &RealPixel, q: &RealPixel) -> RealPixel {
    hsb_blend(p, q, |s, d| Hsb { hue: s.hue, ..d })
}

/// Source saturation with destination hue and brightness
pub fn saturate(p: &RealPixel, q: &RealPixel) -> RealPixel {
    hsb_blend(p, q, |s, d| Hsb {
        saturation: s.saturation,
        ..d
    })
}

/// Source brightness with destination hue and saturation
pub fn luminize(p: &RealPixel, q: &RealPixel) -> RealPixel {
    hsb_blend(p, q, |s, d| Hsb {
        brightness: s.brightness,
        ..d
    })
}

/// Source hue and saturation with destination brightness
pub fn colorize(p: &RealPixel, q: &RealPixel) -> RealPixel {
    hsb_blend(p, q, |s, d| Hsb {
        brightness: d.brightness,
        ..s
    })
}

// ============================================================================
// Dispatch
// ============================================================================

/// Composite one source pixel onto one destination pixel.
///
/// `source_matte` tells CopyOpacity whether the source opacity is
/// meaningful.  Displace expects `source` to be the already displaced
/// pixel and returns it unchanged.
pub fn compose_pixel(
    compose: CompositeOperator,
    params: &CompositeParams,
    source: &RealPixel,
    source_matte: bool,
    destination: &RealPixel,
) -> RealPixel {
    let (s, d) = (source, destination);
    let (alpha, beta) = (s.opacity, d.opacity);
    match compose {
        CompositeOperator::Clear => clear(),
        CompositeOperator::Src
        | CompositeOperator::Copy
        | CompositeOperator::Replace
        | CompositeOperator::Displace => *s,
        CompositeOperator::Over | CompositeOperator::SrcOver => over(s, alpha, d, beta),
        CompositeOperator::DstOver => over(d, beta, s, alpha),
        CompositeOperator::In | CompositeOperator::SrcIn => src_in(s, alpha, d, beta),
        CompositeOperator::DstIn => src_in(d, beta, s, alpha),
        CompositeOperator::Out | CompositeOperator::SrcOut => src_out(s, alpha, d, beta),
        CompositeOperator::DstOut => src_out(d, beta, s, alpha),
        CompositeOperator::Atop | CompositeOperator::SrcAtop => atop(s, alpha, d, beta),
        CompositeOperator::DstAtop => atop(d, beta, s, alpha),
        CompositeOperator::Xor => xor(s, alpha, d, beta),
        CompositeOperator::Plus => plus(s, alpha, d, beta),
        CompositeOperator::Minus => minus(s, alpha, d, beta),
        CompositeOperator::Multiply => multiply(s, alpha, d, beta),
        CompositeOperator::Screen => screen(s, alpha, d, beta),
        CompositeOperator::Overlay => overlay(s, alpha, d, beta),
        CompositeOperator::Darken => darken(s, alpha, d, beta),
        CompositeOperator::Lighten => lighten(s, alpha, d, beta),
        CompositeOperator::ColorDodge => color_dodge(s, alpha, d, beta),
        CompositeOperator::ColorBurn => color_burn(s, alpha, d, beta),
        CompositeOperator::HardLight => hard_light(s, alpha, d, beta),
        CompositeOperator::SoftLight => soft_light(s, alpha, d, beta),
        CompositeOperator::Difference => difference(s, alpha, d, beta),
        CompositeOperator::Exclusion => exclusion(s, alpha, d, beta),
        CompositeOperator::Bumpmap => {
            if alpha == TRANSPARENT {
                *d
            } else {
                bumpmap(s, d)
            }
        }
        CompositeOperator::Dissolve => over(
            s,
            QR - params.source_dissolve * (QR - alpha),
            d,
            QR - params.destination_dissolve * (QR - beta),
        ),
        CompositeOperator::Blend => plus(
            s,
            QR - params.source_dissolve * (QR - alpha),
            d,
            QR - params.destination_dissolve * (QR - beta),
        ),
        CompositeOperator::Threshold => threshold(s, d, params.threshold, params.amount),
        CompositeOperator::Modulate => {
            modulate(s, d, params.percent_brightness, params.percent_saturation)
        }
        CompositeOperator::Hue => hue(s, d),
        CompositeOperator::Saturate => saturate(s, d),
        CompositeOperator::Luminize => luminize(s, d),
        CompositeOperator::Colorize => colorize(s, d),
        CompositeOperator::Add => add(s, alpha, d, beta),
        CompositeOperator::Subtract => subtract(s, d),
        CompositeOperator::CopyRed | CompositeOperator::CopyCyan => RealPixel { red: s.red, ..*d },
        CompositeOperator::CopyGreen | CompositeOperator::CopyMagenta => RealPixel {
            green: s.green,
            ..*d
        },
        CompositeOperator::CopyBlue | CompositeOperator::CopyYellow => RealPixel {
            blue: s.blue,
            ..*d
        },
        CompositeOperator::CopyOpacity => RealPixel {
            opacity: if source_matte {
                s.opacity
            } else {
                QR - s.intensity()
            },
            ..*d
        },
        CompositeOperator::CopyBlack => RealPixel {
            index: s.index,
            ..*d
        },
        CompositeOperator::Dst | CompositeOperator::Undefined | CompositeOperator::No => *d,
    }
}

/// Destination pixel outside the overlay, for operators that redefine it
pub fn compose_outside(
    compose: CompositeOperator,
    params: &CompositeParams,
    destination: &RealPixel,
) -> RealPixel {
    let mut composite = *destination;
    match compose {
        CompositeOperator::Dissolve | CompositeOperator::Blend => {
            composite.opacity = QR - params.destination_dissolve * (QR - destination.opacity);
        }
        CompositeOperator::Clear | CompositeOperator::Src => composite = clear(),
        CompositeOperator::In
        | CompositeOperator::SrcIn
        | CompositeOperator::SrcOut
        | CompositeOperator::DstIn
        | CompositeOperator::DstAtop
        | CompositeOperator::CopyOpacity => composite.opacity = TRANSPARENT,
        _ => {}
    }
    composite
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_core::PixelPacket;

    fn real(r: f64, g: f64, b: f64, opacity: f64) -> RealPixel {
        RealPixel {
            red: r,
            green: g,
            blue: b,
            opacity,
            index: 0.0,
        }
    }

    /// Destinations with whole-number samples
    fn samples() -> Vec<RealPixel> {
        let v = |f: f64| (QR * f).round();
        vec![
            real(0.0, 0.0, 0.0, 0.0),
            real(QR, QR, QR, 0.0),
            real(v(0.25), v(0.5), v(0.75), v(0.5)),
            real(QR, 0.0, v(0.1), v(0.9)),
            real(v(0.3), v(0.3), v(0.3), QR),
        ]
    }

    #[test]
    fn test_over_opaque_source_is_source() {
        for d in samples() {
            let s = real(QR * 0.2, QR * 0.4, QR * 0.6, 0.0);
            let c = over(&s, s.opacity, &d, d.opacity);
            assert_eq!(c.to_packet(), s.to_packet());
        }
    }

    #[test]
    fn test_over_transparent_source_is_destination() {
        for d in samples() {
            let s = real(QR * 0.9, 0.0, QR, QR);
            let c = over(&s, s.opacity, &d, d.opacity);
            if d.opacity == QR {
                // Nothing covers the pixel; color is unnormalized
                assert_eq!(c.to_packet().0.opacity, PixelPacket::transparent().opacity);
            } else {
                assert_eq!(c.to_packet(), d.to_packet());
            }
        }
    }

    #[test]
    fn test_fully_transparent_inputs_are_finite() {
        let params = CompositeParams::default();
        let s = real(QR * 0.4, QR, 0.0, QR);
        let d = real(0.0, QR * 0.7, QR, QR);
        for op in CompositeOperator::ALL {
            let first = compose_pixel(op, &params, &s, true, &d);
            let second = compose_pixel(op, &params, &s, true, &d);
            for v in [first.red, first.green, first.blue, first.opacity, first.index] {
                assert!(!v.is_nan(), "{op} produced NaN");
            }
            assert_eq!(first, second);
        }
        let c = soft_light(&s, QR, &d, QR);
        for v in [c.red, c.green, c.blue] {
            assert!(v.abs() < 1e-6);
        }
        assert!((c.opacity - QR).abs() < 1e-6);
    }

    #[test]
    fn test_in_and_out() {
        let s = real(QR, 0.0, 0.0, 0.0);
        let opaque = real(0.0, 0.0, QR, 0.0);
        let empty = real(0.0, 0.0, QR, QR);
        assert_eq!(src_in(&s, 0.0, &opaque, 0.0).to_packet(), s.to_packet());
        assert_eq!(
            src_in(&s, 0.0, &empty, QR).to_packet().0.opacity,
            PixelPacket::transparent().opacity
        );
        assert_eq!(src_out(&s, 0.0, &empty, QR).to_packet(), s.to_packet());
        assert_eq!(src_out(&s, 0.0, &opaque, 0.0).opacity, QR);
    }

    #[test]
    fn test_multiply_and_screen_opaque() {
        let s = real(QR, QR * 0.5, 0.0, 0.0);
        let d = real(QR * 0.5, QR * 0.5, QR, 0.0);
        let m = multiply(&s, 0.0, &d, 0.0);
        assert!((m.red - QR * 0.5).abs() < 1e-6);
        assert!((m.green - QR * 0.25).abs() < 1e-6);
        assert!(m.blue.abs() < 1e-6);
        let sc = screen(&s, 0.0, &d, 0.0);
        assert!((sc.red - QR).abs() < 1e-6);
        assert!((sc.green - QR * 0.75).abs() < 1e-6);
        assert!((sc.blue - QR).abs() < 1e-6);
    }

    #[test]
    fn test_darken_lighten_difference() {
        let s = real(QR * 0.2, QR * 0.8, QR * 0.5, 0.0);
        let d = real(QR * 0.6, QR * 0.4, QR * 0.5, 0.0);
        let dark = darken(&s, 0.0, &d, 0.0);
        let light = lighten(&s, 0.0, &d, 0.0);
        assert!((dark.red - s.red).abs() < 1e-6 && (dark.green - d.green).abs() < 1e-6);
        assert!((light.red - d.red).abs() < 1e-6 && (light.green - s.green).abs() < 1e-6);
        let diff = difference(&s, 0.0, &d, 0.0);
        assert!((diff.red - QR * 0.4).abs() < 1e-6);
        assert!(diff.blue.abs() < 1e-6);
    }

    #[test]
    fn test_add_and_subtract_wrap() {
        let s = real(QR, 10.0, 0.0, 0.0);
        let d = real(2.0, 20.0, 0.0, 0.0);
        let a = add(&s, 0.0, &d, 0.0);
        assert_eq!(a.red, 1.0);
        assert_eq!(a.green, 30.0);
        let d = real(0.0, 20.0, 0.0, 7.0);
        let sub = subtract(&s, &d);
        assert_eq!(sub.green, QR + 1.0 - 10.0);
        assert_eq!(sub.opacity, 7.0);
    }

    #[test]
    fn test_threshold_gate() {
        let d = real(100.0, 100.0, 100.0, 0.0);
        let s = real(110.0, 1100.0, 100.0, 0.0);
        let t = threshold(&s, &d, 50.0, 0.5);
        assert_eq!(t.red, 100.0);
        assert_eq!(t.green, 600.0);
        assert_eq!(t.opacity, QR);
    }

    #[test]
    fn test_clear_and_bumpmap() {
        let c = clear();
        assert_eq!(c.opacity, QR);
        assert_eq!((c.red, c.green, c.blue, c.index), (0.0, 0.0, 0.0, 0.0));

        let white = real(QR, QR, QR, 0.0);
        let d = real(100.0, 0.0, QR, 0.0);
        let b = bumpmap(&white, &d);
        assert_eq!(b.to_packet(), d.to_packet());
    }

    #[test]
    fn test_hsb_operators() {
        let red = real(QR, 0.0, 0.0, 0.0);
        let gray = real(QR * 0.25, QR * 0.25, QR * 0.25, 0.0);
        // Gray has no saturation to keep
        let h = hue(&red, &gray);
        assert_eq!(h.to_packet(), gray.to_packet());
        let s = saturate(&red, &gray);
        assert!(s.red > s.green);
        let c = colorize(&red, &gray);
        assert!(c.red > c.green);
        assert!(c.red <= QR);

        let hidden = real(QR, 0.0, 0.0, QR);
        assert_eq!(luminize(&hidden, &gray), gray);
        let empty = real(0.0, 0.0, 0.0, QR);
        assert_eq!(luminize(&red, &empty), red);
    }

    #[test]
    fn test_modulate_neutral_source() {
        let d = real(QR * 0.3, QR * 0.6, QR * 0.9, 0.0);
        let mid = real(MIDPOINT, MIDPOINT, MIDPOINT, 0.0);
        assert_eq!(modulate(&mid, &d, 100.0, 100.0), d);
        let white = real(QR, QR, QR, 0.0);
        let brighter = modulate(&white, &d, 100.0, 100.0);
        assert!(brighter.blue >= d.blue);
    }

    #[test]
    fn test_copy_channels() {
        let params = CompositeParams::default();
        let s = real(1.0, 2.0, 3.0, 4.0);
        let d = real(10.0, 20.0, 30.0, 40.0);
        let c = compose_pixel(CompositeOperator::CopyGreen, &params, &s, true, &d);
        assert_eq!((c.red, c.green, c.blue), (10.0, 2.0, 30.0));
        let c = compose_pixel(CompositeOperator::CopyOpacity, &params, &s, true, &d);
        assert_eq!(c.opacity, 4.0);
        let c = compose_pixel(CompositeOperator::CopyOpacity, &params, &s, false, &d);
        assert_eq!(c.opacity, QR - s.intensity());
    }

    #[test]
    fn test_outside_overlay() {
        let params = CompositeParams {
            destination_dissolve: 0.5,
            ..Default::default()
        };
        let d = real(5.0, 6.0, 7.0, 0.0);
        assert_eq!(compose_outside(CompositeOperator::In, &params, &d).opacity, QR);
        assert_eq!(compose_outside(CompositeOperator::Src, &params, &d), clear());
        let c = compose_outside(CompositeOperator::Dissolve, &params, &d);
        assert_eq!(c.opacity, QR * 0.5);
        assert_eq!(compose_outside(CompositeOperator::Over, &params, &d), d);
    }
}
