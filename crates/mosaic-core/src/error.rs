//! Error types for mosaic-core
//!
//! Every failure that the pixel engine can report is a variant of [`Error`].
//! Variants are named after the condition they report so that callers can
//! match on them, and each one maps to a [`Severity`] that decides whether
//! the condition is image-scoped (recorded, processing continues) or fatal.

use crate::exception::Severity;
use thiserror::Error;

/// mosaic error type
#[derive(Error, Debug)]
pub enum Error {
    /// Bit depth outside the packers' supported set
    #[error("image depth not supported: {0} bits")]
    ImageDepthNotSupported(u32),

    /// A C/M/Y/K channel was requested from a non-CMYK image
    #[error("color separated image required")]
    ColorSeparatedImageRequired,

    /// An index channel was requested from a DirectClass image
    #[error("colormapped image required")]
    ColormappedImageRequired,

    /// Channel map string contains an unknown character
    #[error("unrecognized pixel map: {0}")]
    UnrecognizedPixelMap(String),

    /// Palette index past the end of the colormap
    #[error("invalid colormap index: {index} >= {colors}")]
    InvalidColormapIndex { index: usize, colors: usize },

    /// Cache requested for an image with no columns or rows
    #[error("no pixels defined in cache: {columns}x{rows}")]
    NoPixelsDefinedInCache { columns: usize, rows: usize },

    /// Neither memory nor disk resources could hold the cache
    #[error("cache resources exhausted: {0} bytes requested")]
    CacheResourcesExhausted(u64),

    /// Pixel access attempted before a cache was opened
    #[error("pixel cache is not open")]
    PixelCacheIsNotOpen,

    /// Window request outside the image and virtual pixel tolerance
    #[error("unable to get cache nexus: {width}x{height}{x:+}{y:+}")]
    UnableToGetCacheNexus {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },

    /// Caller-supplied buffer cannot hold the transfer
    #[error("buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    /// Geometry string could not be parsed
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Unknown composite operator name
    #[error("unrecognized compose operator: {0}")]
    UnrecognizedComposeOperator(String),

    /// Two images that must agree in size do not
    #[error("image sizes differ: {0}x{1} vs {2}x{3}")]
    ImageSizesDiffer(usize, usize, usize, usize),

    /// Invalid parameter value
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Progress monitor asked the operation to stop
    #[error("operation cancelled: {0}")]
    Cancelled(&'static str),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short reason tag, stable across messages, used to group recorded
    /// exceptions.
    pub fn reason(&self) -> &'static str {
        match self {
            Error::ImageDepthNotSupported(_) => "ImageDepthNotSupported",
            Error::ColorSeparatedImageRequired => "ColorSeparatedImageRequired",
            Error::ColormappedImageRequired => "ColormappedImageRequired",
            Error::UnrecognizedPixelMap(_) => "UnrecognizedPixelMap",
            Error::InvalidColormapIndex { .. } => "InvalidColormapIndex",
            Error::NoPixelsDefinedInCache { .. } => "NoPixelsDefinedInCache",
            Error::CacheResourcesExhausted(_) => "CacheResourcesExhausted",
            Error::PixelCacheIsNotOpen => "PixelCacheIsNotOpen",
            Error::UnableToGetCacheNexus { .. } => "UnableToGetCacheNexus",
            Error::BufferTooSmall { .. } => "BufferTooSmall",
            Error::InvalidGeometry(_) => "InvalidGeometry",
            Error::UnrecognizedComposeOperator(_) => "UnrecognizedComposeOperator",
            Error::ImageSizesDiffer(..) => "ImageSizesDiffer",
            Error::InvalidParameter(_) => "InvalidParameter",
            Error::Cancelled(_) => "Cancelled",
            Error::Io(_) => "Io",
        }
    }

    /// How serious the condition is.
    ///
    /// Resource exhaustion is the only fatal class; corrupt data is a
    /// recoverable error, everything else is an ordinary option error.
    pub fn severity(&self) -> Severity {
        match self {
            Error::CacheResourcesExhausted(_) => Severity::ResourceLimitFatal,
            Error::InvalidColormapIndex { .. } => Severity::CorruptImage,
            Error::Cancelled(_) => Severity::Warning,
            Error::PixelCacheIsNotOpen | Error::UnableToGetCacheNexus { .. } => Severity::Cache,
            Error::Io(_) => Severity::Blob,
            Error::ImageSizesDiffer(..) => Severity::Image,
            _ => Severity::Option,
        }
    }
}

/// Result type alias for mosaic operations
pub type Result<T> = std::result::Result<T, Error>;
