//! Backend Module
//!
//! The wire seam. Everything above this module talks to the display server
//! through [`Backend`]; [`X11Backend`] implements it over an x11rb
//! `RustConnection`. Checked requests wait for the server's answer and map a
//! rejection to [`Error::Resource`](crate::error::Error::Resource); unchecked
//! ones are only queued and report failures later through the event queue.

mod x11;

#[cfg(test)]
pub mod recording;

pub use x11::X11Backend;

use x11rb::protocol::Event as RawEvent;
use x11rb::protocol::xproto::{Atom, Colormap, Drawable, Font, Gcontext, Visualid, Window};

use crate::dirty::ValueList;
use crate::error::Result;
use crate::shared::{Geometry, Line, Point, Rect};

/// Root screen descriptor, captured once at connection setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenInfo {
    pub screen_num: usize,
    pub root: Window,
    pub root_visual: Visualid,
    pub root_depth: u8,
    pub default_colormap: Colormap,
    pub white_pixel: u32,
    pub black_pixel: u32,
    pub width: u16,
    pub height: u16,
    pub min_keycode: u8,
    pub max_keycode: u8,
}

/// Arguments of a window creation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRequest {
    pub id: Window,
    pub parent: Window,
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub border_width: u16,
    /// Window attribute list (CW mask bits)
    pub values: ValueList,
}

/// Requests the rest of the crate issues against the display server
pub trait Backend {
    fn screen(&self) -> &ScreenInfo;

    fn generate_id(&self) -> Result<u32>;

    /// `(keysyms_per_keycode, keysyms)` for `count` keycodes starting at `first`
    fn keyboard_mapping(&self, first: u8, count: u8) -> Result<(u8, Vec<u32>)>;

    fn intern_atom(&self, name: &str) -> Result<Atom>;

    // Windows

    /// Checked
    fn create_window(&self, request: &WindowRequest) -> Result<()>;
    fn destroy_window(&self, window: Window) -> Result<()>;
    fn map_window(&self, window: Window) -> Result<()>;
    fn unmap_window(&self, window: Window) -> Result<()>;
    /// `values` uses ConfigWindow mask bits
    fn configure_window(&self, window: Window, values: &ValueList) -> Result<()>;
    /// `values` uses CW mask bits
    fn change_window_attributes(&self, window: Window, values: &ValueList) -> Result<()>;
    /// Round trip
    fn get_geometry(&self, window: Window) -> Result<Geometry>;
    /// Round trip. Empty when the property is unset.
    fn get_property(&self, window: Window, property: Atom, type_: Atom) -> Result<Vec<u8>>;
    fn set_property(&self, window: Window, property: Atom, type_: Atom, data: &[u8]) -> Result<()>;

    // Colors

    /// Checked
    fn create_colormap(&self, colormap: Colormap, window: Window, visual: Visualid) -> Result<()>;
    fn free_colormap(&self, colormap: Colormap) -> Result<()>;
    /// Round trip; channels are 16-bit
    fn alloc_color(&self, colormap: Colormap, red: u16, green: u16, blue: u16) -> Result<u32>;
    fn free_colors(&self, colormap: Colormap, pixels: &[u32]) -> Result<()>;

    // Fonts

    /// Checked
    fn open_font(&self, font: Font, name: &str) -> Result<()>;
    fn close_font(&self, font: Font) -> Result<()>;

    // Graphics contexts and drawing

    /// `values` uses GC mask bits
    fn create_gc(&self, gc: Gcontext, drawable: Drawable, values: &ValueList) -> Result<()>;
    fn change_gc(&self, gc: Gcontext, values: &ValueList) -> Result<()>;
    fn free_gc(&self, gc: Gcontext) -> Result<()>;
    /// `relative` selects coordinate mode "previous"
    fn poly_point(&self, drawable: Drawable, gc: Gcontext, relative: bool, points: &[Point]) -> Result<()>;
    fn poly_segment(&self, drawable: Drawable, gc: Gcontext, lines: &[Line]) -> Result<()>;
    fn poly_rectangle(&self, drawable: Drawable, gc: Gcontext, fill: bool, rects: &[Rect]) -> Result<()>;
    /// Checked. `text` is UCS-2, at most 255 units.
    fn image_text16(&self, drawable: Drawable, gc: Gcontext, x: i32, y: i32, text: &[u16]) -> Result<()>;

    // Queue

    /// Next queued event, never blocking
    fn poll_for_event(&self) -> Result<Option<RawEvent>>;
    /// Push queued requests to the server
    fn flush(&self) -> Result<()>;
}
