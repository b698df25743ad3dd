//! Cache views
//!
//! A [`CacheView`] holds a reference to its image and one window buffer
//! (a nexus).  Operators acquire a window, work on it, and either drop it
//! (read) or [`sync`](CacheView::sync) it back (write).
//!
//! # Single-writer discipline
//!
//! A window obtained from [`CacheView::get`] or [`CacheView::set`] is a
//! private copy of the pixels.  Until it is synced, other views see the old
//! pixels, and writes made through them to the same region are lost when
//! this window is synced.  Debug builds assert that a pending write window
//! is synced (or explicitly discarded) before the view acquires another
//! window or is dropped.
//!
//! # Example
//!
//! ```
//! use mosaic_cache::Image;
//! use mosaic_core::{Context, PixelPacket};
//!
//! let image = Image::new(&Context::default(), 4, 4);
//! let mut view = image.open_view().unwrap();
//! if let Some(window) = view.get(0, 0, 4, 1) {
//!     window.pixels.fill(PixelPacket::white());
//! }
//! view.sync().unwrap();
//! let window = view.acquire(-1, 0, 2, 1).unwrap();
//! assert_eq!(window.pixels[0], PixelPacket::white());
//! ```

use crate::image::Image;
use mosaic_core::{Error, IndexPacket, PixelPacket, RectangleInfo, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Read,
    Write,
}

/// Read-only window contents
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    pub pixels: &'a [PixelPacket],
    /// Index plane samples; empty when the image has no index plane
    pub indexes: &'a [IndexPacket],
}

/// Writable window contents
#[derive(Debug)]
pub struct WindowMut<'a> {
    pub pixels: &'a mut [PixelPacket],
    /// Index plane samples; empty when the image has no index plane
    pub indexes: &'a mut [IndexPacket],
}

/// Long-lived handle for windowed pixel access to one image
pub struct CacheView {
    image: Image,
    id: usize,
    region: RectangleInfo,
    pixels: Vec<PixelPacket>,
    indexes: Vec<IndexPacket>,
    mode: Mode,
}

impl fmt::Debug for CacheView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheView")
            .field("id", &self.id)
            .field("region", &self.region)
            .field("mode", &self.mode)
            .finish()
    }
}

impl CacheView {
    pub(crate) fn new(image: Image, id: usize) -> Self {
        Self {
            image,
            id,
            region: RectangleInfo::default(),
            pixels: Vec::new(),
            indexes: Vec::new(),
            mode: Mode::Idle,
        }
    }

    /// The image this view reads and writes
    pub fn image(&self) -> &Image {
        &self.image
    }

    /// Nexus id, unique among the views of one image
    pub fn id(&self) -> usize {
        self.id
    }

    /// Rectangle covered by the current window
    pub fn region(&self) -> RectangleInfo {
        self.region
    }

    /// True while a write window is waiting to be synced
    pub fn has_pending_writes(&self) -> bool {
        self.mode == Mode::Write
    }

    fn begin(&mut self, x: i64, y: i64, columns: usize, rows: usize) {
        debug_assert!(
            self.mode != Mode::Write,
            "cache view {} acquired a new window before syncing {:?}",
            self.id,
            self.region
        );
        self.region = RectangleInfo::new(columns, rows, x, y);
        self.mode = Mode::Idle;
    }

    fn fail(&mut self, err: Error) {
        log::debug!("cache view {}: {err}", self.id);
        self.image.record_exception(&err);
        self.mode = Mode::Idle;
        self.pixels.clear();
        self.indexes.clear();
    }

    /// Acquire a read-only window.
    ///
    /// The window may extend past the image bounds; those pixels come from
    /// the image's virtual pixel method.  Returns `None` (and records the
    /// reason against the image) if the window cannot be served.
    pub fn acquire(&mut self, x: i64, y: i64, columns: usize, rows: usize) -> Option<Window<'_>> {
        self.begin(x, y, columns, rows);
        if columns == 0 || rows == 0 {
            self.fail(Error::UnableToGetCacheNexus {
                x,
                y,
                width: columns,
                height: rows,
            });
            return None;
        }
        let result = self.image.lock().read_virtual(
            x,
            y,
            columns,
            rows,
            &mut self.pixels,
            &mut self.indexes,
        );
        match result {
            Ok(()) => {
                self.mode = Mode::Read;
                Some(self.window())
            }
            Err(err) => {
                self.fail(err);
                None
            }
        }
    }

    /// Get a writable window holding the current pixels.
    ///
    /// The window must lie inside the image.  Call [`CacheView::sync`] to
    /// commit it.
    pub fn get(&mut self, x: i64, y: i64, columns: usize, rows: usize) -> Option<WindowMut<'_>> {
        self.begin(x, y, columns, rows);
        let result = self.image.lock().read_region(
            x,
            y,
            columns,
            rows,
            &mut self.pixels,
            &mut self.indexes,
        );
        match result {
            Ok(()) => {
                self.mode = Mode::Write;
                self.window_mut()
            }
            Err(err) => {
                self.fail(err);
                None
            }
        }
    }

    /// Get a writable window without reading the current pixels.
    ///
    /// The window starts out transparent black with zero indexes; every
    /// pixel is expected to be overwritten before [`CacheView::sync`].
    pub fn set(&mut self, x: i64, y: i64, columns: usize, rows: usize) -> Option<WindowMut<'_>> {
        self.begin(x, y, columns, rows);
        let has_indexes = {
            let data = self.image.lock();
            data.check_region(x, y, columns, rows)
                .map(|()| data.has_indexes())
        };
        match has_indexes {
            Ok(has_indexes) => {
                let count = columns * rows;
                self.pixels.clear();
                self.pixels.resize(count, PixelPacket::transparent());
                self.indexes.clear();
                self.indexes.resize(if has_indexes { count } else { 0 }, 0);
                self.mode = Mode::Write;
                self.window_mut()
            }
            Err(err) => {
                self.fail(err);
                None
            }
        }
    }

    /// The current window, read-only
    pub fn window(&self) -> Window<'_> {
        Window {
            pixels: &self.pixels,
            indexes: &self.indexes,
        }
    }

    /// The current window, writable.  `None` unless the window came from
    /// [`CacheView::get`] or [`CacheView::set`].
    pub fn window_mut(&mut self) -> Option<WindowMut<'_>> {
        if self.mode != Mode::Write {
            return None;
        }
        Some(WindowMut {
            pixels: &mut self.pixels,
            indexes: &mut self.indexes,
        })
    }

    /// Commit the current write window to the cache.
    ///
    /// Pixels under white clip mask pixels keep their old values.  Syncing a
    /// read window is a no-op.
    pub fn sync(&mut self) -> Result<()> {
        if self.mode != Mode::Write {
            return Ok(());
        }
        self.mode = Mode::Idle;
        let RectangleInfo {
            width,
            height,
            x,
            y,
        } = self.region;
        let inner = self.image.inner.clone();
        let result = self.image.lock().write_region(
            &inner,
            x,
            y,
            width,
            height,
            &mut self.pixels,
            &mut self.indexes,
        );
        if let Err(err) = &result {
            self.image.record_exception(err);
        }
        result
    }

    /// Drop a pending write window without committing it
    pub fn discard(&mut self) {
        if self.mode == Mode::Write {
            log::trace!("cache view {}: discard {:?}", self.id, self.region);
        }
        self.mode = Mode::Idle;
    }
}

impl Drop for CacheView {
    fn drop(&mut self) {
        debug_assert!(
            std::thread::panicking() || self.mode != Mode::Write,
            "cache view {} dropped with unsynced window {:?}",
            self.id,
            self.region
        );
    }
}
