//! Composite options
//!
//! [`CompositeOptions`] collects the settings of a composite operation the
//! way a command line would: each setter validates its value, and
//! [`CompositeOptions::apply`] runs the operation on a copy of the
//! destination.

use crate::composite::composite_image_with;
use crate::error::{CompositeError, CompositeResult};
use crate::operator::CompositeOperator;
use crate::params::CompositeParams;
use crate::special::{stegano_image, stereo_image};
use mosaic_cache::Image;
use mosaic_core::{Error, GeometryInfo, Gravity, RectangleInfo};

/// Settings for compositing one image onto another
#[derive(Debug, Clone, Default)]
pub struct CompositeOptions {
    /// Operator (default: Over)
    pub compose: CompositeOperator,
    /// Placement offset, `+X+Y`, relative to the gravity anchor
    pub geometry: Option<String>,
    /// Anchor for the placement offset
    pub gravity: Gravity,
    /// Repeat the overlay across the whole destination
    pub tile: bool,
    /// Build a red/cyan anaglyph instead of compositing
    pub stereo: bool,
    /// Hide the overlay in the destination, starting at this pixel
    pub stegano: Option<u64>,
    /// Blend percentages, `src[xdst]`
    pub blend: Option<String>,
    /// Dissolve percentages, `src[xdst]`
    pub dissolve: Option<String>,
    /// Displacement scale, `h[xv]`
    pub displace: Option<String>,
    /// Watermark brightness and saturation, `brightness[xsaturation]`
    pub watermark: Option<String>,
    /// Threshold amount and distance, `amount[xthreshold]`
    pub unsharp: Option<String>,
    /// Leave destination pixels outside the overlay untouched for every
    /// operator
    pub restrict_to_overlay: bool,
}

fn is_geometry(value: &str) -> bool {
    GeometryInfo::parse(value).is_ok_and(|info| !info.flags.is_empty())
}

fn checked_geometry(option: &'static str, value: &str) -> CompositeResult<String> {
    if !is_geometry(value) {
        return Err(CompositeError::InvalidOption {
            option,
            value: value.to_string(),
        });
    }
    Ok(value.to_string())
}

impl CompositeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the operator by name, case-insensitively
    pub fn with_compose(mut self, name: &str) -> CompositeResult<Self> {
        self.compose = name.parse()?;
        Ok(self)
    }

    pub fn with_operator(mut self, compose: CompositeOperator) -> Self {
        self.compose = compose;
        self
    }

    pub fn with_geometry(mut self, geometry: &str) -> CompositeResult<Self> {
        self.geometry = Some(checked_geometry("geometry", geometry)?);
        Ok(self)
    }

    /// Select the anchor by name, case-insensitively
    pub fn with_gravity(mut self, name: &str) -> CompositeResult<Self> {
        self.gravity = name.parse()?;
        Ok(self)
    }

    pub fn with_tile(mut self, tile: bool) -> Self {
        self.tile = tile;
        self
    }

    pub fn with_stereo(mut self, stereo: bool) -> Self {
        self.stereo = stereo;
        self
    }

    /// Hide the overlay starting at the pixel given by a leading integer
    pub fn with_stegano(mut self, offset: &str) -> CompositeResult<Self> {
        let invalid = || CompositeError::InvalidOption {
            option: "stegano",
            value: offset.to_string(),
        };
        if !is_geometry(offset) {
            return Err(invalid());
        }
        let digits = offset
            .trim()
            .find(|c: char| !c.is_ascii_digit())
            .map_or(offset.trim(), |end| &offset.trim()[..end]);
        self.stegano = Some(digits.parse().map_err(|_| invalid())?);
        Ok(self)
    }

    /// Blend with `src[xdst]` percentages; selects the Blend operator
    pub fn with_blend(mut self, geometry: &str) -> CompositeResult<Self> {
        self.blend = Some(checked_geometry("blend", geometry)?);
        self.compose = CompositeOperator::Blend;
        Ok(self)
    }

    /// Dissolve with `src[xdst]` percentages; selects the Dissolve operator
    pub fn with_dissolve(mut self, geometry: &str) -> CompositeResult<Self> {
        self.dissolve = Some(checked_geometry("dissolve", geometry)?);
        self.compose = CompositeOperator::Dissolve;
        Ok(self)
    }

    /// Displace by `h[xv]` pixels; selects the Displace operator
    pub fn with_displace(mut self, geometry: &str) -> CompositeResult<Self> {
        self.displace = Some(checked_geometry("displace", geometry)?);
        self.compose = CompositeOperator::Displace;
        Ok(self)
    }

    /// Watermark with `brightness[xsaturation]`; selects the Modulate
    /// operator
    pub fn with_watermark(mut self, geometry: &str) -> CompositeResult<Self> {
        self.watermark = Some(checked_geometry("watermark", geometry)?);
        self.compose = CompositeOperator::Modulate;
        Ok(self)
    }

    /// Sharpen with `amount[xthreshold]`; selects the Threshold operator
    pub fn with_unsharp(mut self, geometry: &str) -> CompositeResult<Self> {
        self.unsharp = Some(checked_geometry("unsharp", geometry)?);
        self.compose = CompositeOperator::Threshold;
        Ok(self)
    }

    pub fn with_restrict_to_overlay(mut self, restrict: bool) -> Self {
        self.restrict_to_overlay = restrict;
        self
    }

    /// Geometry string read by the selected operator
    fn operator_geometry(&self, composite: &Image) -> Option<String> {
        let own = match self.compose {
            CompositeOperator::Blend => self.blend.as_ref(),
            CompositeOperator::Dissolve => self.dissolve.as_ref(),
            CompositeOperator::Displace => self.displace.as_ref(),
            CompositeOperator::Modulate => self.watermark.as_ref(),
            CompositeOperator::Threshold => self.unsharp.as_ref(),
            _ => None,
        };
        own.cloned().or_else(|| composite.geometry())
    }

    /// Operator arguments for compositing `composite`
    pub fn params(&self, composite: &Image) -> CompositeParams {
        let geometry = self.operator_geometry(composite);
        let mut params = CompositeParams::new(self.compose, geometry.as_deref());
        if self.restrict_to_overlay {
            params.modify_outside_overlay = false;
        }
        params
    }

    /// Composite `composite` onto a copy of `image` and return the copy.
    ///
    /// `stegano` and `stereo` build their own result and take precedence, in
    /// that order.  Otherwise the overlay is tiled across the destination
    /// when `tile` is set, or placed once at the geometry offset adjusted by
    /// gravity.
    ///
    /// # Errors
    ///
    /// - [`Error::ImageSizesDiffer`] for `stereo` with unequal sizes
    /// - [`Error::NoPixelsDefinedInCache`] for tiling an empty overlay
    /// - any error of [`composite_image_with`]
    pub fn apply(&self, image: &Image, composite: &Image) -> CompositeResult<Image> {
        if let Some(offset) = self.stegano {
            return stegano_image(image, composite, offset);
        }
        if self.stereo {
            return stereo_image(image, composite);
        }

        let result = image.deep_clone()?;
        let mut params = self.params(composite);
        let (columns, rows) = (composite.columns(), composite.rows());
        if self.tile {
            if columns == 0 || rows == 0 {
                return Err(Error::NoPixelsDefinedInCache { columns, rows }.into());
            }
            params.modify_outside_overlay = false;
            log::debug!("tile {columns}x{rows} over {}x{}", result.columns(), result.rows());
            for y in (0..result.rows()).step_by(rows) {
                for x in (0..result.columns()).step_by(columns) {
                    composite_image_with(
                        &result,
                        self.compose,
                        composite,
                        x as i64,
                        y as i64,
                        &params,
                    )?;
                }
            }
            return Ok(result);
        }

        let mut placement = RectangleInfo::new(result.columns(), result.rows(), 0, 0);
        if let Some(geometry) = &self.geometry {
            placement.apply_absolute(geometry)?;
        }
        let region = RectangleInfo::new(columns, rows, placement.x, placement.y);
        let region = self.gravity.adjust(result.columns(), result.rows(), &region);
        log::debug!("place {columns}x{rows} at {:+}{:+}", region.x, region.y);
        composite_image_with(
            &result,
            self.compose,
            composite,
            region.x,
            region.y,
            &params,
        )?;
        Ok(result)
    }
}
