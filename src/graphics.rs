//! Graphics Context Manager
//!
//! A [`GraphicsContext`] is a server GC bound to one surface for its whole
//! life. Style changes are deferred like surface attributes; draw calls go
//! out immediately as one batched request each.

use std::rc::Rc;

use tracing::{debug, warn};
use x11rb::protocol::xproto::{Font, Gcontext, Window, GC};

use crate::backend::{Backend, X11Backend};
use crate::dirty::{AttributeCache, Dirty, ValueList};
use crate::display::Display;
use crate::error::{Error, Result};
use crate::shared::{Ellipse, Line, Point, Rect};
use crate::surface::Surface;

/// Longest string a single 16-bit text request carries
const MAX_TEXT_UNITS: usize = 255;

/// Initial style. `None` leaves the server default in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Style {
    pub foreground: Option<u32>,
    pub background: Option<u32>,
    pub line_width: Option<u32>,
    pub font: Option<Font>,
}

/// Pending GC fields
#[derive(Debug, Clone, Default)]
pub struct GcStyle {
    pub foreground: Dirty<u32>,
    pub background: Dirty<u32>,
    pub line_width: Dirty<u32>,
    pub font: Dirty<Font>,
}

impl GcStyle {
    /// Every field `style` sets starts out dirty
    pub fn from_style(style: &Style) -> Self {
        let mut gc = Self::default();
        if let Some(v) = style.foreground {
            gc.foreground.set(v);
        }
        if let Some(v) = style.background {
            gc.background.set(v);
        }
        if let Some(v) = style.line_width {
            gc.line_width.set(v);
        }
        if let Some(v) = style.font {
            gc.font.set(v);
        }
        gc
    }
}

impl AttributeCache for GcStyle {
    fn pending(&self) -> ValueList {
        let mut list = ValueList::new();
        list.push_opt(u32::from(GC::FOREGROUND), self.foreground.pending());
        list.push_opt(u32::from(GC::BACKGROUND), self.background.pending());
        list.push_opt(u32::from(GC::LINE_WIDTH), self.line_width.pending());
        list.push_opt(u32::from(GC::FONT), self.font.pending());
        list
    }

    fn mark_clean(&mut self) {
        self.foreground.clear();
        self.background.clear();
        self.line_width.clear();
        self.font.clear();
    }
}

/// Registry entry for one open context
#[derive(Debug)]
pub(crate) struct ContextState {
    pub(crate) target: Window,
    pub(crate) style: GcStyle,
}

impl ContextState {
    pub(crate) fn is_dirty(&self) -> bool {
        self.style.is_dirty()
    }

    pub(crate) fn flush<B: Backend>(&mut self, backend: &B, id: Gcontext) -> Result<()> {
        let values = self.style.pending();
        if values.is_empty() {
            return Ok(());
        }
        backend.change_gc(id, &values)?;
        self.style.mark_clean();
        debug!(
            "Flushed gc {:#x} on {:#x}: {} fields",
            id,
            self.target,
            values.len()
        );
        Ok(())
    }
}

/// Absolute segments from a "previous point" chained list: every endpoint
/// after the first is relative to the endpoint before it.
fn resolve_relative(lines: &[Line]) -> Vec<Line> {
    let mut prev: Option<(i32, i32)> = None;
    let mut step = |x: i32, y: i32| {
        let point = match prev {
            Some((px, py)) => (px.saturating_add(x), py.saturating_add(y)),
            None => (x, y),
        };
        prev = Some(point);
        point
    };

    lines
        .iter()
        .map(|line| {
            let (x1, y1) = step(line.x1, line.y1);
            let (x2, y2) = step(line.x2, line.y2);
            Line::new(x1, y1, x2, y2)
        })
        .collect()
}

/// UCS-2 units for a text request; characters outside the BMP become U+FFFD
fn text_units(text: &str) -> Vec<u16> {
    text.chars()
        .map(|c| u16::try_from(u32::from(c)).unwrap_or(0xfffd))
        .collect()
}

/// Style plus drawing primitives bound to one surface
pub struct GraphicsContext<B: Backend = X11Backend> {
    display: Rc<Display<B>>,
    id: Gcontext,
    target: Window,
    open: bool,
}

impl<B: Backend> GraphicsContext<B> {
    pub fn new(surface: &Surface<B>, style: &Style) -> Result<Self> {
        if !surface.is_open() {
            return Err(Error::Closed("surface"));
        }

        let display = Rc::clone(surface.display());
        let target = surface.id();
        let id = display.backend().generate_id()?;

        let mut initial = GcStyle::from_style(style);
        let values = initial.take_request().unwrap_or_default();
        display.backend().create_gc(id, target, &values)?;

        display.registry().contexts.insert(
            id,
            ContextState {
                target,
                style: initial,
            },
        );
        debug!("Created gc {:#x} on {:#x} with {} fields", id, target, values.len());

        Ok(Self {
            display,
            id,
            target,
            open: true,
        })
    }

    pub fn id(&self) -> Gcontext {
        self.id
    }

    /// The surface this context draws on
    pub fn target(&self) -> Window {
        self.target
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn set_foreground(&mut self, pixel: u32) -> Result<()> {
        self.display
            .registry()
            .update_context(self.id, |state| state.style.foreground.set(pixel))
    }

    pub fn set_background(&mut self, pixel: u32) -> Result<()> {
        self.display
            .registry()
            .update_context(self.id, |state| state.style.background.set(pixel))
    }

    pub fn set_line_width(&mut self, width: u32) -> Result<()> {
        self.display
            .registry()
            .update_context(self.id, |state| state.style.line_width.set(width))
    }

    pub fn set_font(&mut self, font: Font) -> Result<()> {
        self.display
            .registry()
            .update_context(self.id, |state| state.style.font.set(font))
    }

    /// Send this context's pending style so the next draw uses it
    fn commit(&self) -> Result<()> {
        let mut registry = self.display.registry();
        let state = registry
            .contexts
            .get_mut(&self.id)
            .ok_or(Error::Closed("graphics context"))?;
        state.flush(self.display.backend(), self.id)?;
        registry.dirty_contexts.remove(&self.id);
        Ok(())
    }

    /// `relative` chains each point from the one before it
    pub fn draw_points(&mut self, relative: bool, points: &[Point]) -> Result<()> {
        self.commit()?;
        if points.is_empty() {
            return Ok(());
        }
        self.display
            .backend()
            .poly_point(self.target, self.id, relative, points)
    }

    /// `relative` chains each endpoint from the endpoint before it
    pub fn draw_lines(&mut self, relative: bool, lines: &[Line]) -> Result<()> {
        self.commit()?;
        if lines.is_empty() {
            return Ok(());
        }
        let lines = if relative {
            resolve_relative(lines)
        } else {
            lines.to_vec()
        };
        self.display.backend().poly_segment(self.target, self.id, &lines)
    }

    pub fn draw_rects(&mut self, fill: bool, rects: &[Rect]) -> Result<()> {
        self.commit()?;
        if rects.is_empty() {
            return Ok(());
        }
        self.display
            .backend()
            .poly_rectangle(self.target, self.id, fill, rects)
    }

    /// Draw `text` with its baseline origin at (x, y). Checked.
    pub fn draw_text(&mut self, x: i32, y: i32, text: &str) -> Result<()> {
        let units = text_units(text);
        if units.len() > MAX_TEXT_UNITS {
            return Err(Error::Unsupported("text longer than 255 characters"));
        }
        self.commit()?;
        self.display
            .backend()
            .image_text16(self.target, self.id, x, y, &units)
    }

    pub fn draw_ovals(&mut self, _fill: bool, _ovals: &[Ellipse]) -> Result<()> {
        Err(Error::Unsupported("draw_ovals"))
    }

    pub fn draw_polygons(&mut self, _fill: bool, _points: &[Point]) -> Result<()> {
        Err(Error::Unsupported("draw_polygons"))
    }

    /// Free the server GC. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.display.registry().remove_context(self.id);
        self.display.backend().free_gc(self.id)?;
        debug!("Closed gc {:#x}", self.id);
        Ok(())
    }
}

impl<B: Backend> Drop for GraphicsContext<B> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close gc {:#x}: {}", self.id, e);
        }
    }
}
