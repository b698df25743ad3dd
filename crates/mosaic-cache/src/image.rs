//! Image handle
//!
//! An [`Image`] is a cheap, cloneable reference to one image: its
//! attributes, its pixel cache and its exception record.  Cloning the
//! handle shares the image; [`Image::deep_clone`] copies it.
//!
//! The pixel cache is opened lazily, the first time pixels are needed, and
//! re-shaped on the next sync whenever the extent, storage class or
//! colorspace changes.

use crate::storage::{CacheShape, CacheType, PixelCache};
use crate::view::CacheView;
use crate::virtual_pixel::{VirtualPixelMethod, edge_x, mirror_x, tile_x};
use mosaic_core::{
    Blob, Colormap, Colorspace, Context, Endian, Error, ExceptionInfo, IndexPacket, PixelPacket,
    QUANTUM_DEPTH, Quantum, ResourceType, Result, StorageClass, TRANSPARENT_OPACITY,
};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub(crate) struct ImageData {
    pub columns: usize,
    pub rows: usize,
    pub depth: u32,
    pub storage_class: StorageClass,
    pub colorspace: Colorspace,
    pub matte: bool,
    pub endian: Endian,
    pub background_color: PixelPacket,
    pub colormap: Option<Colormap>,
    pub virtual_pixel_method: VirtualPixelMethod,
    pub geometry: Option<String>,
    pub filename: String,
    pub exception: ExceptionInfo,
    pub taint: bool,
    pub clip_mask: Option<Image>,
    pub blob: Option<Blob>,
    pub attributes: HashMap<String, String>,
    pub context: Context,
    cache: Option<PixelCache>,
    next_view_id: usize,
}

impl ImageData {
    fn shape(&self) -> CacheShape {
        CacheShape::of(self.columns, self.rows, self.storage_class, self.colorspace)
    }

    /// The cache, opened or re-shaped to match the current attributes
    pub(crate) fn cache(&mut self) -> Result<&mut PixelCache> {
        let shape = self.shape();
        let stale = self.cache.as_ref().is_none_or(|cache| cache.shape() != shape);
        if stale {
            let mut fresh = PixelCache::open(&self.context, &self.filename, shape)?;
            if let Some(old) = self.cache.as_mut() {
                fresh.copy_overlap_from(old)?;
            }
            self.cache = Some(fresh);
        }
        self.cache.as_mut().ok_or(Error::PixelCacheIsNotOpen)
    }

    pub(crate) fn has_indexes(&self) -> bool {
        self.shape().has_indexes
    }

    pub(crate) fn next_view_id(&mut self) -> usize {
        self.next_view_id += 1;
        self.next_view_id
    }

    fn contains(&self, x: i64, y: i64, columns: usize, rows: usize) -> bool {
        x >= 0
            && y >= 0
            && (x as u64).saturating_add(columns as u64) <= self.columns as u64
            && (y as u64).saturating_add(rows as u64) <= self.rows as u64
    }

    /// Where an out-of-bounds coordinate reads from, or the constant color
    /// it is replaced by.
    fn virtual_source(&self, x: i64, y: i64) -> ((i64, i64), Option<PixelPacket>) {
        let (c, r) = (self.columns, self.rows);
        let edge = (edge_x(c, x), edge_x(r, y));
        match self.virtual_pixel_method {
            VirtualPixelMethod::Undefined | VirtualPixelMethod::Edge => (edge, None),
            VirtualPixelMethod::Mirror => ((mirror_x(c, x), mirror_x(r, y)), None),
            VirtualPixelMethod::Tile => ((tile_x(c, x), tile_x(r, y)), None),
            VirtualPixelMethod::Background | VirtualPixelMethod::Constant => {
                (edge, Some(self.background_color))
            }
            VirtualPixelMethod::Transparent => (edge, Some(PixelPacket::transparent())),
        }
    }

    /// Pixel count of a `columns` x `rows` window buffer.
    ///
    /// Virtual windows are not bounded by the image, so the buffer is held
    /// to the context's area limit and to what a heap allocation can hold.
    /// The memory limit governs cache storage only; disk caches still read
    /// through heap windows.
    fn window_length(&self, columns: usize, rows: usize, has_indexes: bool) -> Result<usize> {
        let count = columns
            .checked_mul(rows)
            .ok_or(Error::CacheResourcesExhausted(u64::MAX))?;
        let packet =
            size_of::<PixelPacket>() + if has_indexes { size_of::<IndexPacket>() } else { 0 };
        let bytes = (count as u64)
            .checked_mul(packet as u64)
            .ok_or(Error::CacheResourcesExhausted(u64::MAX))?;
        let area = self.context.limits().get(ResourceType::Area);
        if bytes > isize::MAX as u64 || area.is_some_and(|limit| count as u64 > limit) {
            return Err(Error::CacheResourcesExhausted(bytes));
        }
        Ok(count)
    }

    /// Read a window that may extend past the image bounds.
    ///
    /// In-bounds runs are read directly; everything else is synthesized
    /// by the virtual pixel method.
    pub(crate) fn read_virtual(
        &mut self,
        x: i64,
        y: i64,
        columns: usize,
        rows: usize,
        pixels: &mut Vec<PixelPacket>,
        indexes: &mut Vec<IndexPacket>,
    ) -> Result<()> {
        self.cache()?;
        let has_indexes = self.has_indexes();
        let count = self.window_length(columns, rows, has_indexes)?;
        let exhausted = |_| Error::CacheResourcesExhausted(u64::MAX);
        pixels.clear();
        pixels.try_reserve_exact(count).map_err(exhausted)?;
        pixels.resize(count, PixelPacket::default());
        indexes.clear();
        if has_indexes {
            indexes.try_reserve_exact(count).map_err(exhausted)?;
            indexes.resize(count, 0);
        }

        if self.contains(x, y, columns, rows) {
            return self.read_inside(x as usize, y as usize, columns, rows, pixels, indexes);
        }

        let image_columns = self.columns as i64;
        let mut scratch_index = [0 as IndexPacket];
        for row in 0..rows {
            let v = y + row as i64;
            let line = row * columns;
            let mut u = 0usize;
            while u < columns {
                let px = x + u as i64;
                let offset = line + u;
                if v >= 0 && v < self.rows as i64 && px >= 0 && px < image_columns {
                    // in-bounds run
                    let run = ((image_columns - px) as usize).min(columns - u);
                    let start = v as usize * self.columns + px as usize;
                    let cache = self.cache()?;
                    let index_slice = if has_indexes {
                        &mut indexes[offset..offset + run]
                    } else {
                        &mut scratch_index[..0]
                    };
                    cache.read_run(start, &mut pixels[offset..offset + run], index_slice)?;
                    u += run;
                    continue;
                }
                let ((sx, sy), constant) = self.virtual_source(px, v);
                let (pixel, index) = self.cache()?.read_pixel(sx as usize, sy as usize)?;
                pixels[offset] = constant.unwrap_or(pixel);
                if has_indexes {
                    indexes[offset] = index;
                }
                u += 1;
            }
        }
        Ok(())
    }

    fn read_inside(
        &mut self,
        x: usize,
        y: usize,
        columns: usize,
        rows: usize,
        pixels: &mut [PixelPacket],
        indexes: &mut [IndexPacket],
    ) -> Result<()> {
        let stride = self.columns;
        let has_indexes = self.has_indexes();
        let cache = self.cache()?;
        for row in 0..rows {
            let line = row * columns;
            let index_slice: &mut [IndexPacket] = if has_indexes {
                &mut indexes[line..line + columns]
            } else {
                &mut []
            };
            cache.read_run(
                (y + row) * stride + x,
                &mut pixels[line..line + columns],
                index_slice,
            )?;
        }
        Ok(())
    }

    /// Read a window that must lie inside the image
    pub(crate) fn read_region(
        &mut self,
        x: i64,
        y: i64,
        columns: usize,
        rows: usize,
        pixels: &mut Vec<PixelPacket>,
        indexes: &mut Vec<IndexPacket>,
    ) -> Result<()> {
        self.check_region(x, y, columns, rows)?;
        let count = columns * rows;
        pixels.clear();
        pixels.resize(count, PixelPacket::default());
        indexes.clear();
        indexes.resize(if self.has_indexes() { count } else { 0 }, 0);
        self.read_inside(x as usize, y as usize, columns, rows, pixels, indexes)
    }

    pub(crate) fn check_region(&self, x: i64, y: i64, columns: usize, rows: usize) -> Result<()> {
        if columns == 0 || rows == 0 || !self.contains(x, y, columns, rows) {
            return Err(Error::UnableToGetCacheNexus {
                x,
                y,
                width: columns,
                height: rows,
            });
        }
        Ok(())
    }

    /// Commit a window that lies inside the image, honoring the clip mask
    pub(crate) fn write_region(
        &mut self,
        this: &Arc<Mutex<ImageData>>,
        x: i64,
        y: i64,
        columns: usize,
        rows: usize,
        pixels: &mut [PixelPacket],
        indexes: &mut [IndexPacket],
    ) -> Result<()> {
        self.check_region(x, y, columns, rows)?;
        if let Some(mask) = self.clip_mask.clone()
            && !Arc::ptr_eq(&mask.inner, this)
        {
            self.apply_clip_mask(&mask, x, y, columns, rows, pixels, indexes)?;
        }
        let stride = self.columns;
        let has_indexes = self.has_indexes();
        let cache = self.cache()?;
        for row in 0..rows {
            let line = row * columns;
            let index_slice: &[IndexPacket] = if has_indexes {
                &indexes[line..line + columns]
            } else {
                &[]
            };
            cache.write_run(
                (y as usize + row) * stride + x as usize,
                &pixels[line..line + columns],
                index_slice,
            )?;
        }
        self.taint = true;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_clip_mask(
        &mut self,
        mask: &Image,
        x: i64,
        y: i64,
        columns: usize,
        rows: usize,
        pixels: &mut [PixelPacket],
        indexes: &mut [IndexPacket],
    ) -> Result<()> {
        let mut mask_pixels = Vec::new();
        let mut mask_indexes = Vec::new();
        mask.lock()
            .read_virtual(x, y, columns, rows, &mut mask_pixels, &mut mask_indexes)?;
        let mut original = Vec::new();
        let mut original_indexes = Vec::new();
        self.read_region(x, y, columns, rows, &mut original, &mut original_indexes)?;
        for (i, m) in mask_pixels.iter().enumerate() {
            if m.intensity() == TRANSPARENT_OPACITY {
                pixels[i] = original[i];
                if !original_indexes.is_empty() {
                    indexes[i] = original_indexes[i];
                }
            }
        }
        Ok(())
    }
}

/// Reference-counted image handle
#[derive(Clone)]
pub struct Image {
    pub(crate) inner: Arc<Mutex<ImageData>>,
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.lock();
        f.debug_struct("Image")
            .field("filename", &data.filename)
            .field("columns", &data.columns)
            .field("rows", &data.rows)
            .field("storage_class", &data.storage_class)
            .field("colorspace", &data.colorspace)
            .field("matte", &data.matte)
            .finish_non_exhaustive()
    }
}

impl Image {
    /// Create an image of the given extent.  Pixels start out opaque black.
    pub fn new(context: &Context, columns: usize, rows: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ImageData {
                columns,
                rows,
                depth: QUANTUM_DEPTH,
                storage_class: StorageClass::Direct,
                colorspace: Colorspace::Rgb,
                matte: false,
                endian: Endian::Undefined,
                background_color: PixelPacket::white(),
                colormap: None,
                virtual_pixel_method: VirtualPixelMethod::Undefined,
                geometry: None,
                filename: String::new(),
                exception: ExceptionInfo::new(),
                taint: false,
                clip_mask: None,
                blob: None,
                attributes: HashMap::new(),
                context: context.clone(),
                cache: None,
                next_view_id: 0,
            })),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ImageData> {
        self.inner.lock()
    }

    /// The context this image draws resources from
    pub fn context(&self) -> Context {
        self.lock().context.clone()
    }

    pub fn columns(&self) -> usize {
        self.lock().columns
    }

    pub fn rows(&self) -> usize {
        self.lock().rows
    }

    /// Change the extent and re-shape the cache, keeping overlapping pixels.
    pub fn set_extent(&self, columns: usize, rows: usize) -> Result<()> {
        let mut data = self.lock();
        data.columns = columns;
        data.rows = rows;
        data.cache().map(|_| ())
    }

    /// Bits per sample used by quantum transfer
    pub fn depth(&self) -> u32 {
        self.lock().depth
    }

    pub fn set_depth(&self, depth: u32) {
        self.lock().depth = depth;
    }

    pub fn storage_class(&self) -> StorageClass {
        self.lock().storage_class
    }

    pub fn set_storage_class(&self, storage_class: StorageClass) {
        self.lock().storage_class = storage_class;
    }

    pub fn colorspace(&self) -> Colorspace {
        self.lock().colorspace
    }

    pub fn set_colorspace(&self, colorspace: Colorspace) {
        self.lock().colorspace = colorspace;
    }

    /// True if the opacity channel is meaningful
    pub fn matte(&self) -> bool {
        self.lock().matte
    }

    pub fn set_matte(&self, matte: bool) {
        self.lock().matte = matte;
    }

    pub fn endian(&self) -> Endian {
        self.lock().endian
    }

    pub fn set_endian(&self, endian: Endian) {
        self.lock().endian = endian;
    }

    pub fn background_color(&self) -> PixelPacket {
        self.lock().background_color
    }

    pub fn set_background_color(&self, color: PixelPacket) {
        self.lock().background_color = color;
    }

    /// A copy of the colormap, if any
    pub fn colormap(&self) -> Option<Colormap> {
        self.lock().colormap.clone()
    }

    /// Number of colormap entries (0 without a colormap)
    pub fn colors(&self) -> usize {
        self.lock().colormap.as_ref().map_or(0, Colormap::len)
    }

    /// Attach a colormap and switch to PseudoClass
    pub fn set_colormap(&self, colormap: Colormap) {
        let mut data = self.lock();
        data.colormap = Some(colormap);
        data.storage_class = StorageClass::Pseudo;
    }

    pub fn virtual_pixel_method(&self) -> VirtualPixelMethod {
        self.lock().virtual_pixel_method
    }

    pub fn set_virtual_pixel_method(&self, method: VirtualPixelMethod) {
        self.lock().virtual_pixel_method = method;
    }

    /// Geometry string carried with the image (used by the compositor)
    pub fn geometry(&self) -> Option<String> {
        self.lock().geometry.clone()
    }

    pub fn set_geometry(&self, geometry: Option<&str>) {
        self.lock().geometry = geometry.map(str::to_string);
    }

    pub fn filename(&self) -> String {
        self.lock().filename.clone()
    }

    pub fn set_filename(&self, filename: &str) {
        self.lock().filename = filename.to_string();
    }

    /// Named attribute
    pub fn attribute(&self, key: &str) -> Option<String> {
        self.lock().attributes.get(key).cloned()
    }

    /// Set or (with `None`) remove a named attribute
    pub fn set_attribute(&self, key: &str, value: Option<&str>) {
        let mut data = self.lock();
        match value {
            Some(value) => {
                data.attributes.insert(key.to_string(), value.to_string());
            }
            None => {
                data.attributes.remove(key);
            }
        }
    }

    /// A copy of the exception record
    pub fn exception(&self) -> ExceptionInfo {
        self.lock().exception.clone()
    }

    /// Record a soft condition against this image
    pub fn record_exception(&self, error: &Error) {
        self.lock().exception.record(error);
    }

    pub fn clear_exception(&self) {
        self.lock().exception.clear();
    }

    /// True once any pixels have been written
    pub fn is_tainted(&self) -> bool {
        self.lock().taint
    }

    pub fn clip_mask(&self) -> Option<Image> {
        self.lock().clip_mask.clone()
    }

    /// Attach a clip mask.  Writes are discarded wherever the mask is white.
    pub fn set_clip_mask(&self, mask: Option<Image>) {
        self.lock().clip_mask = mask;
    }

    pub fn blob(&self) -> Option<Blob> {
        self.lock().blob.clone()
    }

    pub fn set_blob(&self, blob: Option<Blob>) {
        self.lock().blob = blob;
    }

    /// Make sure a cache matching the current attributes exists.
    ///
    /// # Errors
    ///
    /// Fails with the cache open error, e.g. [`Error::NoPixelsDefinedInCache`]
    /// or [`Error::CacheResourcesExhausted`].
    pub fn sync_cache(&self) -> Result<()> {
        self.lock().cache().map(|_| ())
    }

    /// Where the pixels live
    pub fn cache_type(&self) -> CacheType {
        self.lock()
            .cache
            .as_ref()
            .map_or(CacheType::Undefined, PixelCache::cache_type)
    }

    /// Number of live handles (including views) on this image
    pub fn reference_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// True if both handles refer to the same image
    pub fn ptr_eq(&self, other: &Image) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Copy attributes and pixels into a new, independent image.
    ///
    /// The exception record starts empty; the clip mask and blob are shared.
    pub fn deep_clone(&self) -> Result<Image> {
        let mut data = self.lock();
        let cache = if data.columns > 0 && data.rows > 0 {
            let context = data.context.clone();
            let filename = data.filename.clone();
            Some(data.cache()?.duplicate(&context, &filename)?)
        } else {
            None
        };
        Ok(Image {
            inner: Arc::new(Mutex::new(ImageData {
                columns: data.columns,
                rows: data.rows,
                depth: data.depth,
                storage_class: data.storage_class,
                colorspace: data.colorspace,
                matte: data.matte,
                endian: data.endian,
                background_color: data.background_color,
                colormap: data.colormap.clone(),
                virtual_pixel_method: data.virtual_pixel_method,
                geometry: data.geometry.clone(),
                filename: data.filename.clone(),
                exception: ExceptionInfo::new(),
                taint: data.taint,
                clip_mask: data.clip_mask.clone(),
                blob: data.blob.clone(),
                attributes: data.attributes.clone(),
                context: data.context.clone(),
                cache,
                next_view_id: 0,
            })),
        })
    }

    /// Set the opacity of every pixel and turn on matte
    pub fn set_opacity(&self, opacity: Quantum) -> Result<()> {
        let mut view = self.open_view()?;
        let rows = self.rows();
        let columns = self.columns();
        self.set_matte(true);
        for y in 0..rows {
            let Some(window) = view.get(0, y as i64, columns, 1) else {
                break;
            };
            for pixel in window.pixels.iter_mut() {
                pixel.opacity = opacity;
            }
            view.sync()?;
        }
        Ok(())
    }

    /// Read one pixel, synthesizing it if `(x, y)` is outside the image.
    ///
    /// On failure the failure is recorded and the background color is
    /// returned.
    pub fn acquire_one_pixel(&self, x: i64, y: i64) -> PixelPacket {
        let mut data = self.lock();
        let mut pixels = Vec::with_capacity(1);
        let mut indexes = Vec::with_capacity(1);
        match data.read_virtual(x, y, 1, 1, &mut pixels, &mut indexes) {
            Ok(()) => pixels[0],
            Err(err) => {
                data.exception.record(&err);
                data.background_color
            }
        }
    }

    /// Read one in-bounds pixel
    pub fn get_one_pixel(&self, x: i64, y: i64) -> Option<PixelPacket> {
        let mut data = self.lock();
        let mut pixels = Vec::with_capacity(1);
        let mut indexes = Vec::with_capacity(1);
        match data.read_region(x, y, 1, 1, &mut pixels, &mut indexes) {
            Ok(()) => Some(pixels[0]),
            Err(err) => {
                data.exception.record(&err);
                None
            }
        }
    }

    /// Write one in-bounds pixel, keeping its index
    pub fn set_one_pixel(&self, x: i64, y: i64, pixel: PixelPacket) -> Result<()> {
        let mut data = self.lock();
        let mut pixels = Vec::with_capacity(1);
        let mut indexes = Vec::with_capacity(1);
        data.read_region(x, y, 1, 1, &mut pixels, &mut indexes)?;
        pixels[0] = pixel;
        data.write_region(&self.inner, x, y, 1, 1, &mut pixels, &mut indexes)
    }

    /// Open a view for windowed pixel access.
    ///
    /// # Errors
    ///
    /// Fails if no cache can be opened for the image.
    pub fn open_view(&self) -> Result<CacheView> {
        let id = {
            let mut data = self.lock();
            data.cache()?;
            data.next_view_id()
        };
        Ok(CacheView::new(self.clone(), id))
    }
}
