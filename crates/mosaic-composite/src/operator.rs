//! Composite operator names

use mosaic_core::Error;
use std::fmt;
use std::str::FromStr;

/// Selects how a source pixel combines with a destination pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompositeOperator {
    /// Leaves the destination unchanged
    Undefined,
    /// Skips compositing entirely
    No,
    Add,
    Atop,
    Blend,
    Bumpmap,
    Clear,
    ColorBurn,
    ColorDodge,
    Colorize,
    CopyBlack,
    CopyBlue,
    CopyCyan,
    CopyGreen,
    Copy,
    CopyMagenta,
    CopyOpacity,
    CopyRed,
    CopyYellow,
    Darken,
    DstAtop,
    Dst,
    DstIn,
    DstOut,
    DstOver,
    Difference,
    Displace,
    Dissolve,
    Exclusion,
    HardLight,
    Hue,
    In,
    Lighten,
    Luminize,
    Minus,
    Modulate,
    Multiply,
    Out,
    #[default]
    Over,
    Overlay,
    Plus,
    Replace,
    Saturate,
    Screen,
    SoftLight,
    SrcAtop,
    Src,
    SrcIn,
    SrcOut,
    SrcOver,
    Subtract,
    Threshold,
    Xor,
}

impl CompositeOperator {
    /// Every operator, in name order
    pub const ALL: [CompositeOperator; 53] = [
        CompositeOperator::Undefined,
        CompositeOperator::No,
        CompositeOperator::Add,
        CompositeOperator::Atop,
        CompositeOperator::Blend,
        CompositeOperator::Bumpmap,
        CompositeOperator::Clear,
        CompositeOperator::ColorBurn,
        CompositeOperator::ColorDodge,
        CompositeOperator::Colorize,
        CompositeOperator::CopyBlack,
        CompositeOperator::CopyBlue,
        CompositeOperator::CopyCyan,
        CompositeOperator::CopyGreen,
        CompositeOperator::Copy,
        CompositeOperator::CopyMagenta,
        CompositeOperator::CopyOpacity,
        CompositeOperator::CopyRed,
        CompositeOperator::CopyYellow,
        CompositeOperator::Darken,
        CompositeOperator::DstAtop,
        CompositeOperator::Dst,
        CompositeOperator::DstIn,
        CompositeOperator::DstOut,
        CompositeOperator::DstOver,
        CompositeOperator::Difference,
        CompositeOperator::Displace,
        CompositeOperator::Dissolve,
        CompositeOperator::Exclusion,
        CompositeOperator::HardLight,
        CompositeOperator::Hue,
        CompositeOperator::In,
        CompositeOperator::Lighten,
        CompositeOperator::Luminize,
        CompositeOperator::Minus,
        CompositeOperator::Modulate,
        CompositeOperator::Multiply,
        CompositeOperator::Out,
        CompositeOperator::Over,
        CompositeOperator::Overlay,
        CompositeOperator::Plus,
        CompositeOperator::Replace,
        CompositeOperator::Saturate,
        CompositeOperator::Screen,
        CompositeOperator::SoftLight,
        CompositeOperator::SrcAtop,
        CompositeOperator::Src,
        CompositeOperator::SrcIn,
        CompositeOperator::SrcOut,
        CompositeOperator::SrcOver,
        CompositeOperator::Subtract,
        CompositeOperator::Threshold,
        CompositeOperator::Xor,
    ];

    /// Canonical name
    pub fn name(self) -> &'static str {
        match self {
            CompositeOperator::Undefined => "Undefined",
            CompositeOperator::No => "No",
            CompositeOperator::Add => "Add",
            CompositeOperator::Atop => "Atop",
            CompositeOperator::Blend => "Blend",
            CompositeOperator::Bumpmap => "Bumpmap",
            CompositeOperator::Clear => "Clear",
            CompositeOperator::ColorBurn => "ColorBurn",
            CompositeOperator::ColorDodge => "ColorDodge",
            CompositeOperator::Colorize => "Colorize",
            CompositeOperator::CopyBlack => "CopyBlack",
            CompositeOperator::CopyBlue => "CopyBlue",
            CompositeOperator::CopyCyan => "CopyCyan",
            CompositeOperator::CopyGreen => "CopyGreen",
            CompositeOperator::Copy => "Copy",
            CompositeOperator::CopyMagenta => "CopyMagenta",
            CompositeOperator::CopyOpacity => "CopyOpacity",
            CompositeOperator::CopyRed => "CopyRed",
            CompositeOperator::CopyYellow => "CopyYellow",
            CompositeOperator::Darken => "Darken",
            CompositeOperator::DstAtop => "DstAtop",
            CompositeOperator::Dst => "Dst",
            CompositeOperator::DstIn => "DstIn",
            CompositeOperator::DstOut => "DstOut",
            CompositeOperator::DstOver => "DstOver",
            CompositeOperator::Difference => "Difference",
            CompositeOperator::Displace => "Displace",
            CompositeOperator::Dissolve => "Dissolve",
            CompositeOperator::Exclusion => "Exclusion",
            CompositeOperator::HardLight => "HardLight",
            CompositeOperator::Hue => "Hue",
            CompositeOperator::In => "In",
            CompositeOperator::Lighten => "Lighten",
            CompositeOperator::Luminize => "Luminize",
            CompositeOperator::Minus => "Minus",
            CompositeOperator::Modulate => "Modulate",
            CompositeOperator::Multiply => "Multiply",
            CompositeOperator::Out => "Out",
            CompositeOperator::Over => "Over",
            CompositeOperator::Overlay => "Overlay",
            CompositeOperator::Plus => "Plus",
            CompositeOperator::Replace => "Replace",
            CompositeOperator::Saturate => "Saturate",
            CompositeOperator::Screen => "Screen",
            CompositeOperator::SoftLight => "SoftLight",
            CompositeOperator::SrcAtop => "SrcAtop",
            CompositeOperator::Src => "Src",
            CompositeOperator::SrcIn => "SrcIn",
            CompositeOperator::SrcOut => "SrcOut",
            CompositeOperator::SrcOver => "SrcOver",
            CompositeOperator::Subtract => "Subtract",
            CompositeOperator::Threshold => "Threshold",
            CompositeOperator::Xor => "Xor",
        }
    }

    /// True if the operator redefines destination pixels that the overlay
    /// does not cover.
    ///
    /// Dissolve and Blend decide this from their geometry instead; see
    /// [`CompositeParams`](crate::CompositeParams).
    pub fn modifies_outside_overlay(self) -> bool {
        matches!(
            self,
            CompositeOperator::Clear
                | CompositeOperator::Src
                | CompositeOperator::SrcIn
                | CompositeOperator::In
                | CompositeOperator::SrcOut
                | CompositeOperator::Out
                | CompositeOperator::DstIn
                | CompositeOperator::DstAtop
                | CompositeOperator::CopyOpacity
        )
    }

    /// True if the operator reads an auxiliary geometry string
    pub fn takes_geometry(self) -> bool {
        matches!(
            self,
            CompositeOperator::Blend
                | CompositeOperator::Dissolve
                | CompositeOperator::Displace
                | CompositeOperator::Modulate
                | CompositeOperator::Threshold
        )
    }
}

impl fmt::Display for CompositeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompositeOperator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let name = s.trim();
        CompositeOperator::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::UnrecognizedComposeOperator(s.to_string()))
    }
}
