//! Color Allocator
//!
//! Maps 8-bit RGBA channel quadruples to server pixel ids on one color map.
//! Alpha is carried but never sent: the core protocol has no alpha channel.

use std::fmt;
use std::str::FromStr;

use tracing::debug;
use x11rb::protocol::xproto::Colormap;

use crate::backend::Backend;
use crate::error::{Error, Result};

/// 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Unpack `0xRRGGBBAA`
    pub const fn from_packed(packed: u32) -> Self {
        Self {
            r: (packed >> 24) as u8,
            g: (packed >> 16) as u8,
            b: (packed >> 8) as u8,
            a: packed as u8,
        }
    }

    pub const fn packed(self) -> u32 {
        (self.r as u32) << 24 | (self.g as u32) << 16 | (self.b as u32) << 8 | self.a as u32
    }

    /// 16-bit server channels, in r, g, b order
    pub fn wire_channels(self) -> (u16, u16, u16) {
        (expand(self.r), expand(self.g), expand(self.b))
    }
}

/// 8-bit channel -> 16-bit server channel. 0xff maps to 0xffff.
pub fn expand(channel: u8) -> u16 {
    u16::from(channel) * 257
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08x}", self.packed())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColorError(String);

impl fmt::Display for ParseColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid color '{}': expected #rrggbb or #rrggbbaa", self.0)
    }
}

impl std::error::Error for ParseColorError {}

impl FromStr for Rgba {
    type Err = ParseColorError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let err = || ParseColorError(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(err)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        let value = u32::from_str_radix(hex, 16).map_err(|_| err())?;

        match hex.len() {
            6 => Ok(Rgba::from_packed(value << 8 | 0xff)),
            8 => Ok(Rgba::from_packed(value)),
            _ => Err(err()),
        }
    }
}

/// Pixel allocation against a single color map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorAllocator {
    colormap: Colormap,
}

impl ColorAllocator {
    pub fn new(colormap: Colormap) -> Self {
        Self { colormap }
    }

    pub fn colormap(&self) -> Colormap {
        self.colormap
    }

    /// Number of color maps a target may have installed at once
    pub fn max_color_mappings(&self) -> u32 {
        1
    }

    /// Allocate a read-only pixel for `color`. Round trip.
    pub fn allocate<B: Backend>(&self, backend: &B, color: Rgba) -> Result<u32> {
        let (red, green, blue) = color.wire_channels();
        let pixel = backend
            .alloc_color(self.colormap, red, green, blue)
            .map_err(|e| match e {
                Error::Resource { description, .. } => Error::Resource {
                    operation: format!("alloc_color({})", color),
                    description,
                },
                other => other,
            })?;

        debug!("Allocated {} as pixel {} on colormap {:#x}", color, pixel, self.colormap);
        Ok(pixel)
    }

    /// Free pixels previously returned by [`allocate`](Self::allocate)
    pub fn release<B: Backend>(&self, backend: &B, pixels: &[u32]) -> Result<()> {
        if pixels.is_empty() {
            return Ok(());
        }
        backend.free_colors(self.colormap, pixels)?;
        debug!("Released {} pixels on colormap {:#x}", pixels.len(), self.colormap);
        Ok(())
    }
}
