//! Geometry strings
//!
//! Operators take auxiliary numeric arguments as geometry strings of the
//! form `rho[x|X|,|/sigma][+-xi][+-psi][%]`, for example `50`, `60x40`,
//! `+10-5` or `20x20%`.  [`GeometryInfo::parse`] reports which fields were
//! present through [`GeometryFlags`] so callers can fall back to their own
//! defaults for absent ones.

use crate::error::{Error, Result};

/// Which fields of a [`GeometryInfo`] were present in the string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeometryFlags {
    pub rho: bool,
    pub sigma: bool,
    pub xi: bool,
    pub psi: bool,
    pub percent: bool,
}

impl GeometryFlags {
    /// True if no field was present
    pub fn is_empty(&self) -> bool {
        !(self.rho || self.sigma || self.xi || self.psi)
    }
}

/// Parsed geometry values
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeometryInfo {
    pub rho: f64,
    pub sigma: f64,
    pub xi: f64,
    pub psi: f64,
    pub flags: GeometryFlags,
}

impl GeometryInfo {
    /// Parse a geometry string.
    ///
    /// A missing `sigma` takes the value of `rho`; `flags.sigma` still
    /// reports it as absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGeometry`] for empty strings, stray characters,
    /// or strings in which no field is present.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || Error::InvalidGeometry(text.to_string());
        let mut info = GeometryInfo::default();
        let mut body = String::with_capacity(text.len());
        for c in text.trim().chars() {
            match c {
                '%' => info.flags.percent = true,
                // Resize qualifiers carry no numeric value.
                '!' | '<' | '>' | '^' | '@' => {}
                c if c.is_whitespace() => {}
                c => body.push(c),
            }
        }

        let mut scanner = Scanner::new(&body);
        if let Some(rho) = scanner.unsigned() {
            info.rho = rho;
            info.flags.rho = true;
        }
        if scanner.eat_any(&['x', 'X', ',', '/']) {
            if let Some(sigma) = scanner.unsigned() {
                info.sigma = sigma;
                info.flags.sigma = true;
            }
        }
        if let Some(xi) = scanner.signed() {
            info.xi = xi;
            info.flags.xi = true;
            if let Some(psi) = scanner.signed() {
                info.psi = psi;
                info.flags.psi = true;
            }
        }
        if !scanner.at_end() || info.flags.is_empty() {
            return Err(invalid());
        }
        if !info.flags.sigma {
            info.sigma = info.rho;
        }
        Ok(info)
    }
}

struct Scanner<'a> {
    rest: &'a str,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self { rest: text }
    }

    fn at_end(&self) -> bool {
        self.rest.is_empty()
    }

    fn eat_any(&mut self, set: &[char]) -> bool {
        match self.rest.chars().next() {
            Some(c) if set.contains(&c) => {
                self.rest = &self.rest[c.len_utf8()..];
                true
            }
            _ => false,
        }
    }

    fn unsigned(&mut self) -> Option<f64> {
        let end = self
            .rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let value = self.rest[..end].parse().ok()?;
        self.rest = &self.rest[end..];
        Some(value)
    }

    fn signed(&mut self) -> Option<f64> {
        let negative = match self.rest.chars().next() {
            Some('+') => false,
            Some('-') => true,
            _ => return None,
        };
        let saved = self.rest;
        self.rest = &self.rest[1..];
        match self.unsigned() {
            Some(v) => Some(if negative { -v } else { v }),
            None => {
                self.rest = saved;
                None
            }
        }
    }
}

/// Placement rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RectangleInfo {
    pub width: usize,
    pub height: usize,
    pub x: i64,
    pub y: i64,
}

impl RectangleInfo {
    pub fn new(width: usize, height: usize, x: i64, y: i64) -> Self {
        Self {
            width,
            height,
            x,
            y,
        }
    }

    /// Overwrite the fields present in an absolute geometry string
    /// (`WxH+X+Y`).  Absent fields keep their current value.
    pub fn apply_absolute(&mut self, text: &str) -> Result<()> {
        let info = GeometryInfo::parse(text)?;
        if info.flags.rho {
            self.width = info.rho as usize;
        }
        if info.flags.sigma {
            self.height = info.sigma as usize;
        }
        if info.flags.xi {
            self.x = info.xi as i64;
        }
        if info.flags.psi {
            self.y = info.psi as i64;
        }
        Ok(())
    }
}

/// Anchor for placing a box inside a canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Gravity {
    #[default]
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
}

impl std::str::FromStr for Gravity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let gravity = match s.to_ascii_lowercase().as_str() {
            "northwest" | "forget" | "none" => Gravity::NorthWest,
            "north" => Gravity::North,
            "northeast" => Gravity::NorthEast,
            "west" => Gravity::West,
            "center" | "centre" => Gravity::Center,
            "east" => Gravity::East,
            "southwest" => Gravity::SouthWest,
            "south" => Gravity::South,
            "southeast" => Gravity::SouthEast,
            _ => return Err(Error::InvalidParameter(format!("unrecognized gravity: {s}"))),
        };
        Ok(gravity)
    }
}

impl Gravity {
    /// Translate a region's offset, given relative to the gravity anchor,
    /// into an absolute offset inside a `width` x `height` canvas.
    pub fn adjust(self, width: usize, height: usize, region: &RectangleInfo) -> RectangleInfo {
        let mut out = *region;
        let (w, h) = (width as i64, height as i64);
        let (rw, rh) = (region.width as i64, region.height as i64);
        match self {
            Gravity::NorthEast | Gravity::East | Gravity::SouthEast => out.x = w - rw - region.x,
            Gravity::North | Gravity::Center | Gravity::South => out.x += w / 2 - rw / 2,
            _ => {}
        }
        match self {
            Gravity::SouthWest | Gravity::South | Gravity::SouthEast => out.y = h - rh - region.y,
            Gravity::West | Gravity::Center | Gravity::East => out.y += h / 2 - rh / 2,
            _ => {}
        }
        out
    }
}
