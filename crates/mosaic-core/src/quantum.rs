//! Quantum - the per-channel sample type
//!
//! A Quantum is the fixed-width unsigned integer holding one color or
//! opacity sample.  Its width is chosen at build time: 16 bits by default,
//! 8 bits with the `quantum-8` feature, 32 bits with `quantum-32`.
//!
//! # Scaling law
//!
//! A sample of an arbitrary depth `d` (maximum `m = 2^d - 1`) maps to and
//! from the Quantum range by the ratio `value * QUANTUM_RANGE / m`, rounded
//! half up.  For any `m <= QUANTUM_RANGE` the round trip
//! `scale_quantum_to_any(scale_any_to_quantum(v, m), m) == v` is exact; for
//! wider samples the round trip from the Quantum side is exact instead.

#[cfg(feature = "quantum-8")]
pub type Quantum = u8;

#[cfg(all(feature = "quantum-32", not(feature = "quantum-8")))]
pub type Quantum = u32;

#[cfg(not(any(feature = "quantum-8", feature = "quantum-32")))]
pub type Quantum = u16;

/// Bits per Quantum
pub const QUANTUM_DEPTH: u32 = Quantum::BITS;

/// Largest Quantum value
pub const QUANTUM_RANGE: Quantum = Quantum::MAX;

/// [`QUANTUM_RANGE`] as a real number
pub const QUANTUM_RANGE_F: f64 = QUANTUM_RANGE as f64;

/// Multiplier mapping a Quantum into `[0, 1]`
pub const QUANTUM_SCALE: f64 = 1.0 / QUANTUM_RANGE_F;

/// Opacity of a fully opaque pixel (opacity is inverted alpha)
pub const OPAQUE_OPACITY: Quantum = 0;

/// Opacity of a fully transparent pixel
pub const TRANSPARENT_OPACITY: Quantum = QUANTUM_RANGE;

/// Threshold below which a normalisation factor is treated as zero
pub const MAGICK_EPSILON: f64 = 1.0e-12;

/// Rescale `value` from `[0, from_max]` to `[0, to_max]`, rounding half up.
///
/// Returns 0 when `from_max` is 0.
#[inline]
pub fn scale_value(value: u64, from_max: u64, to_max: u64) -> u64 {
    if from_max == 0 {
        return 0;
    }
    let value = value.min(from_max) as u128;
    let from_max = from_max as u128;
    ((2 * value * to_max as u128 + from_max) / (2 * from_max)) as u64
}

/// Maximum sample value at `depth` bits (`depth` in `1..=64`)
#[inline]
pub fn depth_max(depth: u32) -> u64 {
    if depth >= 64 {
        u64::MAX
    } else {
        (1u64 << depth) - 1
    }
}

/// Scale a sample in `[0, max]` to a Quantum
#[inline]
pub fn scale_any_to_quantum(value: u64, max: u64) -> Quantum {
    scale_value(value, max, QUANTUM_RANGE as u64) as Quantum
}

/// Scale a Quantum to a sample in `[0, max]`
#[inline]
pub fn scale_quantum_to_any(quantum: Quantum, max: u64) -> u64 {
    scale_value(quantum as u64, QUANTUM_RANGE as u64, max)
}

#[inline]
pub fn scale_char_to_quantum(value: u8) -> Quantum {
    scale_any_to_quantum(value as u64, u8::MAX as u64)
}

#[inline]
pub fn scale_quantum_to_char(quantum: Quantum) -> u8 {
    scale_quantum_to_any(quantum, u8::MAX as u64) as u8
}

#[inline]
pub fn scale_short_to_quantum(value: u16) -> Quantum {
    scale_any_to_quantum(value as u64, u16::MAX as u64)
}

#[inline]
pub fn scale_quantum_to_short(quantum: Quantum) -> u16 {
    scale_quantum_to_any(quantum, u16::MAX as u64) as u16
}

#[inline]
pub fn scale_long_to_quantum(value: u32) -> Quantum {
    scale_any_to_quantum(value as u64, u32::MAX as u64)
}

#[inline]
pub fn scale_quantum_to_long(quantum: Quantum) -> u32 {
    scale_quantum_to_any(quantum, u32::MAX as u64) as u32
}

/// Round a real sample to the nearest Quantum, clamping to the valid range.
///
/// NaN maps to 0 so that degenerate blend results stay deterministic.
#[inline]
pub fn round_to_quantum(value: f64) -> Quantum {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    if value >= QUANTUM_RANGE_F {
        return QUANTUM_RANGE;
    }
    (value + 0.5) as Quantum
}

/// Clamp a real value to `[0, 1]`
#[inline]
pub fn round_to_unity(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
