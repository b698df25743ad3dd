//! Colormap - palette for PseudoClass images
//!
//! An ordered sequence of [`PixelPacket`]s addressed by [`IndexPacket`].
//! The colormap is owned by its image and resized whenever the color count
//! changes.

use crate::error::{Error, Result};
use crate::pixel::{IndexPacket, PixelPacket};
use crate::quantum::{QUANTUM_RANGE, Quantum, scale_any_to_quantum};

/// Largest number of entries an [`IndexPacket`] can address
pub const MAX_COLORMAP_SIZE: usize = QUANTUM_RANGE as usize + 1;

/// Colormap for indexed images
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Colormap {
    colors: Vec<PixelPacket>,
}

impl Colormap {
    /// Create an empty colormap
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gray ramp of `colors` entries from black to white.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `colors` is 0 or exceeds
    /// [`MAX_COLORMAP_SIZE`].
    pub fn linear(colors: usize) -> Result<Self> {
        if colors == 0 || colors > MAX_COLORMAP_SIZE {
            return Err(Error::InvalidParameter(format!(
                "colormap size {colors} not in 1..={MAX_COLORMAP_SIZE}"
            )));
        }
        let max = (colors - 1).max(1) as u64;
        let colors = (0..colors)
            .map(|i| PixelPacket::gray(scale_any_to_quantum(i as u64, max)))
            .collect();
        Ok(Self { colors })
    }

    /// Build a colormap from existing entries
    pub fn from_colors(colors: Vec<PixelPacket>) -> Result<Self> {
        if colors.len() > MAX_COLORMAP_SIZE {
            return Err(Error::InvalidParameter(format!(
                "colormap size {} exceeds {MAX_COLORMAP_SIZE}",
                colors.len()
            )));
        }
        Ok(Self { colors })
    }

    /// Number of entries
    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Get an entry by index
    #[inline]
    pub fn get(&self, index: usize) -> Option<&PixelPacket> {
        self.colors.get(index)
    }

    /// Get a mutable entry by index
    pub fn get_mut(&mut self, index: usize) -> Option<&mut PixelPacket> {
        self.colors.get_mut(index)
    }

    /// Look up the color of a stored index, or `None` if out of range
    #[inline]
    pub fn lookup(&self, index: IndexPacket) -> Option<PixelPacket> {
        self.colors.get(index as usize).copied()
    }

    /// All entries
    pub fn colors(&self) -> &[PixelPacket] {
        &self.colors
    }

    /// Append an entry and return its index
    pub fn push(&mut self, color: PixelPacket) -> Result<IndexPacket> {
        if self.colors.len() >= MAX_COLORMAP_SIZE {
            return Err(Error::InvalidParameter("colormap is full".to_string()));
        }
        self.colors.push(color);
        Ok((self.colors.len() - 1) as Quantum)
    }

    /// Grow (with opaque black) or truncate to `colors` entries
    pub fn resize(&mut self, colors: usize) -> Result<()> {
        if colors > MAX_COLORMAP_SIZE {
            return Err(Error::InvalidParameter(format!(
                "colormap size {colors} exceeds {MAX_COLORMAP_SIZE}"
            )));
        }
        self.colors.resize(colors, PixelPacket::black());
        Ok(())
    }

    /// Index of the first entry equal to `color`
    pub fn find(&self, color: &PixelPacket) -> Option<IndexPacket> {
        self.colors
            .iter()
            .position(|c| c == color)
            .map(|i| i as Quantum)
    }
}
