//! Generic Pixel Map Transfer
//!
//! Scanline transfer between an image region and a caller buffer of any
//! [`StorageSample`] type, with the channel order given by a map string of
//! the characters `R G B A O C M Y K I P` (case-insensitive):
//!
//! | char | channel |
//! |------|---------|
//! | R G B | red, green, blue |
//! | C M Y K | cyan, magenta, yellow, black (CMYK images) |
//! | A | alpha (complement of opacity) |
//! | O | opacity |
//! | I | intensity |
//! | P | pad (written as 0, skipped on import) |
//!
//! Integer storage spans the full range of the type; `f32`/`f64` are
//! normalized to `[0, 1]`.  A row whose window cannot be obtained stops
//! the transfer; the number of complete rows is returned.

use mosaic_cache::Image;
use mosaic_core::quantum::{
    round_to_quantum, scale_char_to_quantum, scale_long_to_quantum, scale_quantum_to_char,
    scale_quantum_to_long, scale_quantum_to_short, scale_short_to_quantum, scale_value,
};
use mosaic_core::{
    Colorspace, Error, IndexPacket, OPAQUE_OPACITY, PixelPacket, QUANTUM_RANGE, QUANTUM_RANGE_F,
    QUANTUM_SCALE, Quantum, Result, StorageClass,
};

/// Runtime name of a storage type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    Char,
    Short,
    Integer,
    Long,
    Float,
    Double,
}

impl StorageType {
    /// Size of one sample in bytes
    pub fn size(self) -> usize {
        match self {
            StorageType::Char => 1,
            StorageType::Short => 2,
            StorageType::Integer | StorageType::Float => 4,
            StorageType::Long | StorageType::Double => 8,
        }
    }
}

/// A sample type the pixel map transfer can read and write
pub trait StorageSample: Copy + Default {
    const STORAGE_TYPE: StorageType;

    fn from_quantum(quantum: Quantum) -> Self;

    fn to_quantum(self) -> Quantum;
}

impl StorageSample for u8 {
    const STORAGE_TYPE: StorageType = StorageType::Char;

    fn from_quantum(quantum: Quantum) -> Self {
        scale_quantum_to_char(quantum)
    }

    fn to_quantum(self) -> Quantum {
        scale_char_to_quantum(self)
    }
}

impl StorageSample for u16 {
    const STORAGE_TYPE: StorageType = StorageType::Short;

    fn from_quantum(quantum: Quantum) -> Self {
        scale_quantum_to_short(quantum)
    }

    fn to_quantum(self) -> Quantum {
        scale_short_to_quantum(self)
    }
}

impl StorageSample for u32 {
    const STORAGE_TYPE: StorageType = StorageType::Integer;

    fn from_quantum(quantum: Quantum) -> Self {
        scale_quantum_to_long(quantum)
    }

    fn to_quantum(self) -> Quantum {
        scale_long_to_quantum(self)
    }
}

impl StorageSample for u64 {
    const STORAGE_TYPE: StorageType = StorageType::Long;

    fn from_quantum(quantum: Quantum) -> Self {
        scale_value(quantum as u64, QUANTUM_RANGE as u64, u64::MAX)
    }

    fn to_quantum(self) -> Quantum {
        scale_value(self, u64::MAX, QUANTUM_RANGE as u64) as Quantum
    }
}

impl StorageSample for f32 {
    const STORAGE_TYPE: StorageType = StorageType::Float;

    fn from_quantum(quantum: Quantum) -> Self {
        (QUANTUM_SCALE * quantum as f64) as f32
    }

    fn to_quantum(self) -> Quantum {
        round_to_quantum(QUANTUM_RANGE_F * self as f64)
    }
}

impl StorageSample for f64 {
    const STORAGE_TYPE: StorageType = StorageType::Double;

    fn from_quantum(quantum: Quantum) -> Self {
        QUANTUM_SCALE * quantum as f64
    }

    fn to_quantum(self) -> Quantum {
        round_to_quantum(QUANTUM_RANGE_F * self)
    }
}

/// One character of a map string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapChannel {
    Red,
    Green,
    Blue,
    Alpha,
    Opacity,
    Cyan,
    Magenta,
    Yellow,
    Black,
    Intensity,
    Pad,
}

impl MapChannel {
    fn is_cmyk(self) -> bool {
        matches!(
            self,
            MapChannel::Cyan | MapChannel::Magenta | MapChannel::Yellow | MapChannel::Black
        )
    }
}

/// Parse a map string.
///
/// # Errors
///
/// [`Error::UnrecognizedPixelMap`] for any character outside
/// `RGBAOCMYKIP`, or an empty map.
pub fn parse_map(map: &str) -> Result<Vec<MapChannel>> {
    if map.is_empty() {
        return Err(Error::UnrecognizedPixelMap(map.to_string()));
    }
    map.chars()
        .map(|c| match c.to_ascii_uppercase() {
            'R' => Ok(MapChannel::Red),
            'G' => Ok(MapChannel::Green),
            'B' => Ok(MapChannel::Blue),
            'A' => Ok(MapChannel::Alpha),
            'O' => Ok(MapChannel::Opacity),
            'C' => Ok(MapChannel::Cyan),
            'M' => Ok(MapChannel::Magenta),
            'Y' => Ok(MapChannel::Yellow),
            'K' => Ok(MapChannel::Black),
            'I' => Ok(MapChannel::Intensity),
            'P' => Ok(MapChannel::Pad),
            _ => Err(Error::UnrecognizedPixelMap(map.to_string())),
        })
        .collect()
}

/// Interleavings with a dedicated loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FastPath {
    Rgb,
    Rgba,
    Rgbp,
    Bgr,
    Bgra,
    Bgrp,
    I,
}

impl FastPath {
    fn detect(map: &str) -> Option<Self> {
        match map.to_ascii_uppercase().as_str() {
            "RGB" => Some(FastPath::Rgb),
            "RGBA" => Some(FastPath::Rgba),
            "RGBP" => Some(FastPath::Rgbp),
            "BGR" => Some(FastPath::Bgr),
            "BGRA" => Some(FastPath::Bgra),
            "BGRP" => Some(FastPath::Bgrp),
            "I" => Some(FastPath::I),
            _ => None,
        }
    }
}

/// Samples per row of a `columns` x `rows` region, checked against the
/// caller's buffer.  An empty region is a window the cache cannot serve;
/// it is recorded against the image like any other failed window.
fn region_stride<T>(
    image: &Image,
    x: i64,
    y: i64,
    columns: usize,
    rows: usize,
    samples: usize,
    pixels: &[T],
) -> Result<usize> {
    if columns == 0 || rows == 0 {
        let err = Error::UnableToGetCacheNexus {
            x,
            y,
            width: columns,
            height: rows,
        };
        image.record_exception(&err);
        return Err(err);
    }
    let too_small = || Error::BufferTooSmall {
        needed: usize::MAX,
        actual: std::mem::size_of_val(pixels),
    };
    let stride = columns.checked_mul(samples).ok_or_else(too_small)?;
    let needed = stride.checked_mul(rows).ok_or_else(too_small)?;
    check_length(pixels, needed)?;
    Ok(stride)
}

fn check_length<T>(pixels: &[T], needed: usize) -> Result<()> {
    if pixels.len() < needed {
        return Err(Error::BufferTooSmall {
            needed: needed * std::mem::size_of::<T>(),
            actual: std::mem::size_of_val(pixels),
        });
    }
    Ok(())
}

// ===== Export =====

fn export_row_fast<T: StorageSample>(fast: FastPath, matte: bool, src: &[PixelPacket], out: &mut [T]) {
    let alpha = |p: &PixelPacket| -> T {
        T::from_quantum(if matte {
            QUANTUM_RANGE - p.opacity
        } else {
            QUANTUM_RANGE
        })
    };
    match fast {
        FastPath::Rgb => {
            for (p, q) in src.iter().zip(out.chunks_exact_mut(3)) {
                q[0] = T::from_quantum(p.red);
                q[1] = T::from_quantum(p.green);
                q[2] = T::from_quantum(p.blue);
            }
        }
        FastPath::Rgba => {
            for (p, q) in src.iter().zip(out.chunks_exact_mut(4)) {
                q[0] = T::from_quantum(p.red);
                q[1] = T::from_quantum(p.green);
                q[2] = T::from_quantum(p.blue);
                q[3] = alpha(p);
            }
        }
        FastPath::Rgbp => {
            for (p, q) in src.iter().zip(out.chunks_exact_mut(4)) {
                q[0] = T::from_quantum(p.red);
                q[1] = T::from_quantum(p.green);
                q[2] = T::from_quantum(p.blue);
                q[3] = T::from_quantum(0);
            }
        }
        FastPath::Bgr => {
            for (p, q) in src.iter().zip(out.chunks_exact_mut(3)) {
                q[0] = T::from_quantum(p.blue);
                q[1] = T::from_quantum(p.green);
                q[2] = T::from_quantum(p.red);
            }
        }
        FastPath::Bgra => {
            for (p, q) in src.iter().zip(out.chunks_exact_mut(4)) {
                q[0] = T::from_quantum(p.blue);
                q[1] = T::from_quantum(p.green);
                q[2] = T::from_quantum(p.red);
                q[3] = alpha(p);
            }
        }
        FastPath::Bgrp => {
            for (p, q) in src.iter().zip(out.chunks_exact_mut(4)) {
                q[0] = T::from_quantum(p.blue);
                q[1] = T::from_quantum(p.green);
                q[2] = T::from_quantum(p.red);
                q[3] = T::from_quantum(0);
            }
        }
        FastPath::I => {
            for (p, q) in src.iter().zip(out.iter_mut()) {
                *q = T::from_quantum(p.intensity());
            }
        }
    }
}

fn export_row_generic<T: StorageSample>(
    channels: &[MapChannel],
    matte: bool,
    src: &[PixelPacket],
    indexes: &[IndexPacket],
    out: &mut [T],
) {
    for (x, (p, q)) in src.iter().zip(out.chunks_exact_mut(channels.len())).enumerate() {
        let opacity = if matte { p.opacity } else { OPAQUE_OPACITY };
        for (slot, channel) in q.iter_mut().zip(channels) {
            let value = match channel {
                MapChannel::Red | MapChannel::Cyan => p.red,
                MapChannel::Green | MapChannel::Magenta => p.green,
                MapChannel::Blue | MapChannel::Yellow => p.blue,
                MapChannel::Alpha => QUANTUM_RANGE - opacity,
                MapChannel::Opacity => opacity,
                MapChannel::Black => indexes.get(x).copied().unwrap_or(0),
                MapChannel::Intensity => p.intensity(),
                MapChannel::Pad => 0,
            };
            *slot = T::from_quantum(value);
        }
    }
}

/// Copy a region of `image` into `pixels`, `map.len()` samples per pixel.
///
/// Returns the number of rows transferred; fewer than `rows` means a row
/// could not be read (the reason is recorded against the image).
///
/// # Errors
///
/// - [`Error::UnrecognizedPixelMap`] for a bad map character
/// - [`Error::ColorSeparatedImageRequired`] for `C`, `M`, `Y` or `K` on a
///   non-CMYK image
/// - [`Error::BufferTooSmall`] if `pixels` cannot hold the region
/// - [`Error::UnableToGetCacheNexus`] for an empty region
pub fn export_image_pixels<T: StorageSample>(
    image: &Image,
    x: i64,
    y: i64,
    columns: usize,
    rows: usize,
    map: &str,
    pixels: &mut [T],
) -> Result<usize> {
    let channels = parse_map(map)?;
    let cmyk = image.colorspace() == Colorspace::Cmyk;
    if !cmyk && channels.iter().any(|c| c.is_cmyk()) {
        return Err(Error::ColorSeparatedImageRequired);
    }
    let stride = region_stride(image, x, y, columns, rows, channels.len(), pixels)?;
    log::trace!(
        "export {columns}x{rows}{x:+}{y:+} as {map} ({:?})",
        T::STORAGE_TYPE
    );

    let matte = image.matte();
    let fast = FastPath::detect(map);
    let mut view = image.open_view()?;
    let mut done = 0;
    for (row, out) in pixels.chunks_exact_mut(stride).take(rows).enumerate() {
        let Some(window) = view.acquire(x, y + row as i64, columns, 1) else {
            break;
        };
        match fast {
            Some(fast) => export_row_fast(fast, matte, window.pixels, out),
            None => export_row_generic(&channels, matte, window.pixels, window.indexes, out),
        }
        done += 1;
    }
    Ok(done)
}

// ===== Import =====

fn import_row_fast<T: StorageSample>(fast: FastPath, src: &[T], dst: &mut [PixelPacket]) {
    match fast {
        FastPath::Rgb | FastPath::Rgbp => {
            let step = if fast == FastPath::Rgb { 3 } else { 4 };
            for (q, p) in src.chunks_exact(step).zip(dst.iter_mut()) {
                p.red = q[0].to_quantum();
                p.green = q[1].to_quantum();
                p.blue = q[2].to_quantum();
            }
        }
        FastPath::Rgba => {
            for (q, p) in src.chunks_exact(4).zip(dst.iter_mut()) {
                p.red = q[0].to_quantum();
                p.green = q[1].to_quantum();
                p.blue = q[2].to_quantum();
                p.opacity = QUANTUM_RANGE - q[3].to_quantum();
            }
        }
        FastPath::Bgr | FastPath::Bgrp => {
            let step = if fast == FastPath::Bgr { 3 } else { 4 };
            for (q, p) in src.chunks_exact(step).zip(dst.iter_mut()) {
                p.blue = q[0].to_quantum();
                p.green = q[1].to_quantum();
                p.red = q[2].to_quantum();
            }
        }
        FastPath::Bgra => {
            for (q, p) in src.chunks_exact(4).zip(dst.iter_mut()) {
                p.blue = q[0].to_quantum();
                p.green = q[1].to_quantum();
                p.red = q[2].to_quantum();
                p.opacity = QUANTUM_RANGE - q[3].to_quantum();
            }
        }
        FastPath::I => {
            for (q, p) in src.iter().zip(dst.iter_mut()) {
                let gray = q.to_quantum();
                p.red = gray;
                p.green = gray;
                p.blue = gray;
            }
        }
    }
}

fn import_row_generic<T: StorageSample>(
    channels: &[MapChannel],
    src: &[T],
    dst: &mut [PixelPacket],
    indexes: &mut [IndexPacket],
) {
    for (x, (q, p)) in src.chunks_exact(channels.len()).zip(dst.iter_mut()).enumerate() {
        for (sample, channel) in q.iter().zip(channels) {
            let value = sample.to_quantum();
            match channel {
                MapChannel::Red | MapChannel::Cyan => p.red = value,
                MapChannel::Green | MapChannel::Magenta => p.green = value,
                MapChannel::Blue | MapChannel::Yellow => p.blue = value,
                MapChannel::Alpha => p.opacity = QUANTUM_RANGE - value,
                MapChannel::Opacity => p.opacity = value,
                MapChannel::Black => {
                    if let Some(index) = indexes.get_mut(x) {
                        *index = value;
                    }
                }
                MapChannel::Intensity => {
                    p.red = value;
                    p.green = value;
                    p.blue = value;
                }
                MapChannel::Pad => {}
            }
        }
    }
}

/// Copy `pixels`, `map.len()` samples per pixel, into a region of `image`.
///
/// The image becomes DirectClass; `A` or `O` in the map turns on matte and
/// `C`, `M`, `Y` or `K` switches the image to CMYK.  Channels absent from
/// the map keep their current values.  Returns the number of rows
/// transferred.
///
/// # Errors
///
/// - [`Error::UnrecognizedPixelMap`] for a bad map character
/// - [`Error::BufferTooSmall`] if `pixels` is shorter than the region
/// - [`Error::UnableToGetCacheNexus`] for an empty region
/// - the cache open error if the image has no usable cache
pub fn import_image_pixels<T: StorageSample>(
    image: &Image,
    x: i64,
    y: i64,
    columns: usize,
    rows: usize,
    map: &str,
    pixels: &[T],
) -> Result<usize> {
    let channels = parse_map(map)?;
    let stride = region_stride(image, x, y, columns, rows, channels.len(), pixels)?;
    image.set_storage_class(StorageClass::Direct);
    if channels
        .iter()
        .any(|c| matches!(c, MapChannel::Alpha | MapChannel::Opacity))
    {
        image.set_matte(true);
    }
    if channels.iter().any(|c| c.is_cmyk()) {
        image.set_colorspace(Colorspace::Cmyk);
    }
    log::trace!(
        "import {columns}x{rows}{x:+}{y:+} as {map} ({:?})",
        T::STORAGE_TYPE
    );

    let fast = FastPath::detect(map);
    let mut view = image.open_view()?;
    let mut done = 0;
    for (row, src) in pixels.chunks_exact(stride).take(rows).enumerate() {
        let Some(window) = view.get(x, y + row as i64, columns, 1) else {
            break;
        };
        match fast {
            Some(fast) => import_row_fast(fast, src, window.pixels),
            None => import_row_generic(&channels, src, window.pixels, window.indexes),
        }
        if view.sync().is_err() {
            break;
        }
        done += 1;
    }
    Ok(done)
}
