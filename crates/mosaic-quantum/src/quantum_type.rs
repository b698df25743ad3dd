//! Quantum types
//!
//! A [`QuantumType`] names which pixel fields a quantum transfer moves, and
//! in which order.

use mosaic_core::{Error, Result};

/// One sample slot of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Red, or cyan in a CMYK image
    Red,
    /// Green, or magenta in a CMYK image
    Green,
    /// Blue, or yellow in a CMYK image
    Blue,
    /// Complement of the stored opacity
    Alpha,
    /// Stored opacity
    Opacity,
    /// Black, from the index plane of a CMYK image
    Black,
    /// Colormap index
    Index,
    /// Intensity on export, all three color fields on import
    Gray,
}

/// Channel selector for quantum transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QuantumType {
    /// Transferred as [`QuantumType::Rgb`]
    #[default]
    Undefined,
    Index,
    IndexAlpha,
    Gray,
    /// Gray with the packed 10- and 12-bit layouts
    GrayPad,
    GrayAlpha,
    Red,
    Cyan,
    Green,
    Magenta,
    Blue,
    Yellow,
    Alpha,
    Opacity,
    Black,
    Rgb,
    /// RGB with the packed 10- and 12-bit layouts
    RgbPad,
    Rgba,
    Rgbo,
    Cmyk,
    Cmyka,
}

impl QuantumType {
    /// Every quantum type, in declaration order
    pub const ALL: [QuantumType; 21] = [
        QuantumType::Undefined,
        QuantumType::Index,
        QuantumType::IndexAlpha,
        QuantumType::Gray,
        QuantumType::GrayPad,
        QuantumType::GrayAlpha,
        QuantumType::Red,
        QuantumType::Cyan,
        QuantumType::Green,
        QuantumType::Magenta,
        QuantumType::Blue,
        QuantumType::Yellow,
        QuantumType::Alpha,
        QuantumType::Opacity,
        QuantumType::Black,
        QuantumType::Rgb,
        QuantumType::RgbPad,
        QuantumType::Rgba,
        QuantumType::Rgbo,
        QuantumType::Cmyk,
        QuantumType::Cmyka,
    ];

    /// Sample slots transferred per pixel
    pub fn channels(self) -> &'static [Channel] {
        use Channel::*;
        match self {
            QuantumType::Index => &[Index],
            QuantumType::IndexAlpha => &[Index, Alpha],
            QuantumType::Gray | QuantumType::GrayPad => &[Gray],
            QuantumType::GrayAlpha => &[Gray, Alpha],
            QuantumType::Red | QuantumType::Cyan => &[Red],
            QuantumType::Green | QuantumType::Magenta => &[Green],
            QuantumType::Blue | QuantumType::Yellow => &[Blue],
            QuantumType::Alpha => &[Alpha],
            QuantumType::Opacity => &[Opacity],
            QuantumType::Black => &[Black],
            QuantumType::Undefined | QuantumType::Rgb | QuantumType::RgbPad => &[Red, Green, Blue],
            QuantumType::Rgba => &[Red, Green, Blue, Alpha],
            QuantumType::Rgbo => &[Red, Green, Blue, Opacity],
            QuantumType::Cmyk => &[Red, Green, Blue, Black],
            QuantumType::Cmyka => &[Red, Green, Blue, Black, Alpha],
        }
    }

    /// True if importing this type makes the image's opacity meaningful
    pub fn has_alpha(self) -> bool {
        self.channels()
            .iter()
            .any(|c| matches!(c, Channel::Alpha | Channel::Opacity))
    }

    /// True if the type reads or writes the colormap index
    pub fn needs_colormap(self) -> bool {
        matches!(self, QuantumType::Index | QuantumType::IndexAlpha)
    }

    /// True if the type reads or writes the black channel
    pub fn needs_cmyk(self) -> bool {
        matches!(
            self,
            QuantumType::Black | QuantumType::Cmyk | QuantumType::Cmyka
        )
    }
}

impl std::str::FromStr for QuantumType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.to_ascii_lowercase();
        QuantumType::ALL
            .into_iter()
            .find(|t| format!("{t:?}").to_ascii_lowercase() == name)
            .ok_or_else(|| Error::InvalidParameter(format!("unknown quantum type: {s}")))
    }
}
