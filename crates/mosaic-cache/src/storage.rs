//! Pixel cache backing store
//!
//! A [`PixelCache`] is the full pixel grid of one image, held either in
//! heap vectors or in an anonymous temporary paging file.  The choice is
//! made once, when the cache is opened, from the [`Context`] resource
//! limits: memory if both the area and memory reservations succeed,
//! otherwise disk, otherwise [`Error::CacheResourcesExhausted`].
//!
//! # Disk layout
//!
//! The pixel plane (`columns * rows` records of red, green, blue, opacity)
//! is followed by the index plane when the cache has one.  Samples are
//! stored little-endian at the Quantum width.

use byteorder::{ByteOrder, LittleEndian};
use mosaic_core::{
    Colorspace, Context, Error, IndexPacket, PixelPacket, Quantum, ResourceType, Result,
    StorageClass,
};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

const QUANTUM_BYTES: usize = std::mem::size_of::<Quantum>();
const PIXEL_BYTES: usize = 4 * QUANTUM_BYTES;
const INDEX_BYTES: usize = QUANTUM_BYTES;

/// Where a cache keeps its pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CacheType {
    /// No cache has been opened yet
    #[default]
    Undefined,
    Memory,
    Disk,
}

#[inline]
fn put_quantum(buf: &mut [u8], q: Quantum) {
    match QUANTUM_BYTES {
        1 => buf[0] = q as u8,
        2 => LittleEndian::write_u16(buf, q as u16),
        _ => LittleEndian::write_u32(buf, q as u32),
    }
}

#[inline]
fn get_quantum(buf: &[u8]) -> Quantum {
    match QUANTUM_BYTES {
        1 => buf[0] as Quantum,
        2 => LittleEndian::read_u16(buf) as Quantum,
        _ => LittleEndian::read_u32(buf) as Quantum,
    }
}

/// Human-readable byte count for log lines
pub(crate) fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes}B")
    } else {
        format!("{value:.1}{}", UNITS[unit])
    }
}

/// Resources held by one cache, returned on drop
struct Reservation {
    context: Context,
    held: Vec<(ResourceType, u64)>,
}

impl Reservation {
    fn new(context: &Context) -> Self {
        Self {
            context: context.clone(),
            held: Vec::new(),
        }
    }

    fn acquire(&mut self, kind: ResourceType, amount: u64) -> bool {
        let granted = self.context.acquire_resource(kind, amount);
        if granted {
            self.held.push((kind, amount));
        }
        granted
    }

    fn release(&mut self, kind: ResourceType) {
        if let Some(pos) = self.held.iter().rposition(|(k, _)| *k == kind) {
            let (kind, amount) = self.held.remove(pos);
            self.context.relinquish_resource(kind, amount);
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        for (kind, amount) in self.held.drain(..) {
            self.context.relinquish_resource(kind, amount);
        }
    }
}

enum Backing {
    Memory {
        pixels: Vec<PixelPacket>,
        indexes: Vec<IndexPacket>,
    },
    Disk {
        file: File,
        scratch: Vec<u8>,
    },
}

fn allocate_memory(count: usize, has_indexes: bool) -> Option<Backing> {
    let mut pixels = Vec::new();
    pixels.try_reserve_exact(count).ok()?;
    pixels.resize(count, PixelPacket::default());
    let mut indexes = Vec::new();
    if has_indexes {
        indexes.try_reserve_exact(count).ok()?;
        indexes.resize(count, 0);
    }
    Some(Backing::Memory { pixels, indexes })
}

/// Shape of a cache: what must match the image for the cache to be valid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CacheShape {
    pub columns: usize,
    pub rows: usize,
    pub has_indexes: bool,
}

impl CacheShape {
    /// PseudoClass and CMYK images carry an index plane
    pub fn of(
        columns: usize,
        rows: usize,
        storage_class: StorageClass,
        colorspace: Colorspace,
    ) -> Self {
        Self {
            columns,
            rows,
            has_indexes: storage_class == StorageClass::Pseudo || colorspace == Colorspace::Cmyk,
        }
    }
}

/// The pixel grid of one image
pub(crate) struct PixelCache {
    shape: CacheShape,
    backing: Backing,
    _reservation: Reservation,
}

impl PixelCache {
    /// Open a cache of the given shape.
    ///
    /// # Errors
    ///
    /// - [`Error::NoPixelsDefinedInCache`] if either dimension is 0
    /// - [`Error::CacheResourcesExhausted`] if neither memory nor disk
    ///   resources can hold it
    pub fn open(context: &Context, filename: &str, shape: CacheShape) -> Result<Self> {
        let CacheShape { columns, rows, .. } = shape;
        if columns == 0 || rows == 0 {
            return Err(Error::NoPixelsDefinedInCache { columns, rows });
        }
        let count = columns
            .checked_mul(rows)
            .ok_or(Error::CacheResourcesExhausted(u64::MAX))?;
        let packet = PIXEL_BYTES + if shape.has_indexes { INDEX_BYTES } else { 0 };
        let length = (count as u64)
            .checked_mul(packet as u64)
            .ok_or(Error::CacheResourcesExhausted(u64::MAX))?;

        let mut reservation = Reservation::new(context);
        if reservation.acquire(ResourceType::Area, count as u64) {
            if reservation.acquire(ResourceType::Memory, length) {
                if let Some(backing) = allocate_memory(count, shape.has_indexes) {
                    log::debug!(
                        "open {filename} (memory, {columns}x{rows}, {})",
                        format_size(length)
                    );
                    return Ok(Self {
                        shape,
                        backing,
                        _reservation: reservation,
                    });
                }
                reservation.release(ResourceType::Memory);
            }
            reservation.release(ResourceType::Area);
        }

        if !reservation.acquire(ResourceType::Disk, length)
            || !reservation.acquire(ResourceType::File, 1)
        {
            log::debug!("open {filename}: no memory or disk for {}", format_size(length));
            return Err(Error::CacheResourcesExhausted(length));
        }
        let file = tempfile::tempfile()?;
        file.set_len(length)?;
        log::debug!(
            "open {filename} (disk, {columns}x{rows}, {})",
            format_size(length)
        );
        Ok(Self {
            shape,
            backing: Backing::Disk {
                file,
                scratch: Vec::new(),
            },
            _reservation: reservation,
        })
    }

    pub fn shape(&self) -> CacheShape {
        self.shape
    }

    pub fn cache_type(&self) -> CacheType {
        match self.backing {
            Backing::Memory { .. } => CacheType::Memory,
            Backing::Disk { .. } => CacheType::Disk,
        }
    }

    pub fn has_indexes(&self) -> bool {
        self.shape.has_indexes
    }

    fn total(&self) -> usize {
        self.shape.columns * self.shape.rows
    }

    /// Read a contiguous run starting at linear `offset`.
    ///
    /// `indexes` is filled only when the cache has an index plane.
    pub fn read_run(
        &mut self,
        offset: usize,
        pixels: &mut [PixelPacket],
        indexes: &mut [IndexPacket],
    ) -> Result<()> {
        let total = self.total();
        let has_indexes = self.has_indexes();
        let n = pixels.len();
        match &mut self.backing {
            Backing::Memory {
                pixels: plane,
                indexes: index_plane,
            } => {
                pixels.copy_from_slice(&plane[offset..offset + n]);
                if has_indexes {
                    indexes[..n].copy_from_slice(&index_plane[offset..offset + n]);
                }
            }
            Backing::Disk { file, scratch } => {
                scratch.resize(n * PIXEL_BYTES, 0);
                file.seek(SeekFrom::Start((offset * PIXEL_BYTES) as u64))?;
                file.read_exact(scratch)?;
                for (pixel, record) in pixels.iter_mut().zip(scratch.chunks_exact(PIXEL_BYTES)) {
                    pixel.red = get_quantum(&record[0..]);
                    pixel.green = get_quantum(&record[QUANTUM_BYTES..]);
                    pixel.blue = get_quantum(&record[2 * QUANTUM_BYTES..]);
                    pixel.opacity = get_quantum(&record[3 * QUANTUM_BYTES..]);
                }
                if has_indexes {
                    scratch.resize(n * INDEX_BYTES, 0);
                    let base = total * PIXEL_BYTES + offset * INDEX_BYTES;
                    file.seek(SeekFrom::Start(base as u64))?;
                    file.read_exact(scratch)?;
                    for (index, record) in indexes.iter_mut().zip(scratch.chunks_exact(INDEX_BYTES))
                    {
                        *index = get_quantum(record);
                    }
                }
            }
        }
        Ok(())
    }

    /// Write a contiguous run starting at linear `offset`.
    pub fn write_run(
        &mut self,
        offset: usize,
        pixels: &[PixelPacket],
        indexes: &[IndexPacket],
    ) -> Result<()> {
        let total = self.total();
        let has_indexes = self.has_indexes();
        let n = pixels.len();
        match &mut self.backing {
            Backing::Memory {
                pixels: plane,
                indexes: index_plane,
            } => {
                plane[offset..offset + n].copy_from_slice(pixels);
                if has_indexes {
                    index_plane[offset..offset + n].copy_from_slice(&indexes[..n]);
                }
            }
            Backing::Disk { file, scratch } => {
                scratch.resize(n * PIXEL_BYTES, 0);
                for (pixel, record) in pixels.iter().zip(scratch.chunks_exact_mut(PIXEL_BYTES)) {
                    put_quantum(&mut record[0..], pixel.red);
                    put_quantum(&mut record[QUANTUM_BYTES..], pixel.green);
                    put_quantum(&mut record[2 * QUANTUM_BYTES..], pixel.blue);
                    put_quantum(&mut record[3 * QUANTUM_BYTES..], pixel.opacity);
                }
                file.seek(SeekFrom::Start((offset * PIXEL_BYTES) as u64))?;
                file.write_all(scratch)?;
                if has_indexes {
                    scratch.resize(n * INDEX_BYTES, 0);
                    for (index, record) in indexes.iter().zip(scratch.chunks_exact_mut(INDEX_BYTES))
                    {
                        put_quantum(record, *index);
                    }
                    let base = total * PIXEL_BYTES + offset * INDEX_BYTES;
                    file.seek(SeekFrom::Start(base as u64))?;
                    file.write_all(scratch)?;
                }
            }
        }
        Ok(())
    }

    /// Read one pixel (and its index, 0 without an index plane)
    pub fn read_pixel(&mut self, x: usize, y: usize) -> Result<(PixelPacket, IndexPacket)> {
        let mut pixel = [PixelPacket::default()];
        let mut index = [0 as IndexPacket];
        self.read_run(y * self.shape.columns + x, &mut pixel, &mut index)?;
        Ok((pixel[0], index[0]))
    }

    /// Copy the region both caches share, row by row
    pub fn copy_overlap_from(&mut self, source: &mut PixelCache) -> Result<()> {
        let columns = self.shape.columns.min(source.shape.columns);
        let rows = self.shape.rows.min(source.shape.rows);
        let mut pixels = vec![PixelPacket::default(); columns];
        let mut indexes = vec![0 as IndexPacket; columns];
        let source_has_indexes = source.has_indexes();
        for y in 0..rows {
            source.read_run(y * source.shape.columns, &mut pixels, &mut indexes)?;
            if !source_has_indexes {
                indexes.fill(0);
            }
            self.write_run(y * self.shape.columns, &pixels, &indexes)?;
        }
        Ok(())
    }

    /// Independent copy with its own backing and reservation
    pub fn duplicate(&mut self, context: &Context, filename: &str) -> Result<PixelCache> {
        let mut copy = PixelCache::open(context, filename, self.shape)?;
        copy.copy_overlap_from(self)?;
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_core::ResourceLimits;

    fn shape(columns: usize, rows: usize, storage_class: StorageClass) -> CacheShape {
        CacheShape::of(columns, rows, storage_class, Colorspace::Rgb)
    }

    #[test]
    fn test_open_zero_size_fails() {
        let ctx = Context::default();
        let err = PixelCache::open(&ctx, "t", shape(0, 4, StorageClass::Direct))
            .err()
            .unwrap();
        assert_eq!(err.reason(), "NoPixelsDefinedInCache");
    }

    #[test]
    fn test_memory_then_disk_spill() {
        let ctx = Context::new(ResourceLimits::unlimited());
        let cache = PixelCache::open(&ctx, "t", shape(4, 4, StorageClass::Direct)).unwrap();
        assert_eq!(cache.cache_type(), CacheType::Memory);

        ctx.set_limit(ResourceType::Memory, Some(16));
        let cache = PixelCache::open(&ctx, "t", shape(4, 4, StorageClass::Direct)).unwrap();
        assert_eq!(cache.cache_type(), CacheType::Disk);
        assert_eq!(ctx.resource_usage(ResourceType::File), 1);
        drop(cache);
        assert_eq!(ctx.resource_usage(ResourceType::File), 0);
        assert_eq!(ctx.resource_usage(ResourceType::Disk), 0);
    }

    #[test]
    fn test_exhausted() {
        let mut limits = ResourceLimits::unlimited();
        limits.memory = Some(0);
        limits.disk = Some(0);
        let ctx = Context::new(limits);
        let err = PixelCache::open(&ctx, "t", shape(2, 2, StorageClass::Direct))
            .err()
            .unwrap();
        assert_eq!(err.reason(), "CacheResourcesExhausted");
        assert_eq!(ctx.resource_usage(ResourceType::Area), 0);
    }

    #[test]
    fn test_disk_run_roundtrip_with_indexes() {
        let mut limits = ResourceLimits::unlimited();
        limits.memory = Some(0);
        let ctx = Context::new(limits);
        let mut cache = PixelCache::open(&ctx, "t", shape(3, 2, StorageClass::Pseudo)).unwrap();
        assert_eq!(cache.cache_type(), CacheType::Disk);
        let pixels = [
            PixelPacket::new(1, 2, 3, 4),
            PixelPacket::new(5, 6, 7, 8),
        ];
        cache.write_run(4, &pixels, &[9, 10]).unwrap();
        let mut out = [PixelPacket::default(); 2];
        let mut idx = [0 as IndexPacket; 2];
        cache.read_run(4, &mut out, &mut idx).unwrap();
        assert_eq!(out, pixels);
        assert_eq!(idx, [9, 10]);
        assert_eq!(cache.read_pixel(1, 1).unwrap(), (pixels[0], 9));
    }

    #[test]
    fn test_copy_overlap() {
        let ctx = Context::default();
        let mut small = PixelCache::open(&ctx, "a", shape(2, 2, StorageClass::Direct)).unwrap();
        small
            .write_run(0, &[PixelPacket::gray(7); 4], &[])
            .unwrap();
        let mut big = PixelCache::open(&ctx, "b", shape(3, 3, StorageClass::Direct)).unwrap();
        big.copy_overlap_from(&mut small).unwrap();
        assert_eq!(big.read_pixel(1, 1).unwrap().0, PixelPacket::gray(7));
        assert_eq!(big.read_pixel(2, 2).unwrap().0, PixelPacket::default());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512B");
        assert_eq!(format_size(1536), "1.5KiB");
        assert_eq!(format_size(3 << 20), "3.0MiB");
    }
}
