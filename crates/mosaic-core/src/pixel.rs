//! Pixel representations
//!
//! [`PixelPacket`] is the stored form: three color samples and an opacity
//! sample, each a [`Quantum`].  Opacity is inverted alpha, so
//! [`OPAQUE_OPACITY`] (0) is fully opaque.  Palette indexes and the CMYK
//! black channel live beside the packet in a parallel [`IndexPacket`] plane.
//!
//! [`RealPixel`] is the working form used by blending and interpolation.

use crate::quantum::{
    OPAQUE_OPACITY, QUANTUM_RANGE, Quantum, TRANSPARENT_OPACITY, round_to_quantum,
};

/// Palette index, or black sample for CMYK images
pub type IndexPacket = Quantum;

/// Stored pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelPacket {
    pub red: Quantum,
    pub green: Quantum,
    pub blue: Quantum,
    pub opacity: Quantum,
}

impl PixelPacket {
    /// Create a pixel from all four samples
    pub const fn new(red: Quantum, green: Quantum, blue: Quantum, opacity: Quantum) -> Self {
        Self {
            red,
            green,
            blue,
            opacity,
        }
    }

    /// Create an opaque pixel
    pub const fn rgb(red: Quantum, green: Quantum, blue: Quantum) -> Self {
        Self::new(red, green, blue, OPAQUE_OPACITY)
    }

    /// Create an opaque gray pixel
    pub const fn gray(value: Quantum) -> Self {
        Self::rgb(value, value, value)
    }

    /// Opaque black
    pub const fn black() -> Self {
        Self::gray(0)
    }

    /// Opaque white
    pub const fn white() -> Self {
        Self::gray(QUANTUM_RANGE)
    }

    /// Transparent black
    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, TRANSPARENT_OPACITY)
    }

    /// Alpha (complement of opacity)
    #[inline]
    pub fn alpha(&self) -> Quantum {
        QUANTUM_RANGE - self.opacity
    }

    /// Luma-weighted intensity, `0.299R + 0.587G + 0.114B`, rounded.
    #[inline]
    pub fn intensity(&self) -> Quantum {
        round_to_quantum(
            0.299 * self.red as f64 + 0.587 * self.green as f64 + 0.114 * self.blue as f64,
        )
    }

    /// True when red, green and blue are equal
    #[inline]
    pub fn is_gray(&self) -> bool {
        self.red == self.green && self.green == self.blue
    }
}

/// Pixel with real-valued samples, plus the index/black sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RealPixel {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub opacity: f64,
    pub index: f64,
}

impl RealPixel {
    /// Widen a stored pixel
    pub fn from_packet(packet: &PixelPacket, index: IndexPacket) -> Self {
        Self {
            red: packet.red as f64,
            green: packet.green as f64,
            blue: packet.blue as f64,
            opacity: packet.opacity as f64,
            index: index as f64,
        }
    }

    /// Round back to a stored pixel and index
    pub fn to_packet(&self) -> (PixelPacket, IndexPacket) {
        (
            PixelPacket {
                red: round_to_quantum(self.red),
                green: round_to_quantum(self.green),
                blue: round_to_quantum(self.blue),
                opacity: round_to_quantum(self.opacity),
            },
            round_to_quantum(self.index),
        )
    }

    /// Luma-weighted intensity on the Quantum scale, rounded
    pub fn intensity(&self) -> f64 {
        (0.299 * self.red + 0.587 * self.green + 0.114 * self.blue + 0.5).floor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intensity_gray_is_identity() {
        for v in [0 as Quantum, 1, QUANTUM_RANGE / 3, QUANTUM_RANGE] {
            assert_eq!(PixelPacket::gray(v).intensity(), v);
        }
    }

    #[test]
    fn test_intensity_weights() {
        let red = PixelPacket::rgb(QUANTUM_RANGE, 0, 0);
        let expected = (0.299 * QUANTUM_RANGE as f64 + 0.5) as Quantum;
        assert_eq!(red.intensity(), expected);
    }

    #[test]
    fn test_alpha_complements_opacity() {
        assert_eq!(PixelPacket::black().alpha(), QUANTUM_RANGE);
        assert_eq!(PixelPacket::transparent().alpha(), 0);
    }

    #[test]
    fn test_real_pixel_roundtrip() {
        let p = PixelPacket::new(1, 2, 3, 4);
        let real = RealPixel::from_packet(&p, 5);
        assert_eq!(real.to_packet(), (p, 5));
    }
}
