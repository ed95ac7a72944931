//! x11rb implementation of the wire seam

use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::Event as RawEvent;
use x11rb::protocol::xproto::{
    self, Atom, ChangeGCAux, ChangeWindowAttributesAux, Char2b, Colormap, ColormapAlloc,
    ConfigWindow, ConfigureWindowAux, ConnectionExt as _, CoordMode, CreateGCAux,
    CreateWindowAux, Drawable, EventMask, Font, Gcontext, PropMode, Visualid, Window, WindowClass,
    CW, GC,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use super::{Backend, ScreenInfo, WindowRequest};
use crate::dirty::ValueList;
use crate::error::{Error, Result};
use crate::shared::geometry::{coord, dimension};
use crate::shared::{Geometry, Line, Point, Rect};

/// Window attribute list -> x11rb aux struct. Both window aux types share
/// the same builder methods.
macro_rules! window_aux {
    ($aux:ty, $values:expr) => {{
        let mut aux = <$aux>::new();
        for (bit, value) in $values.iter() {
            aux = if bit == u32::from(CW::BACK_PIXEL) {
                aux.background_pixel(value)
            } else if bit == u32::from(CW::BORDER_PIXEL) {
                aux.border_pixel(value)
            } else if bit == u32::from(CW::EVENT_MASK) {
                aux.event_mask(EventMask::from(value))
            } else if bit == u32::from(CW::COLORMAP) {
                aux.colormap(value)
            } else {
                warn!("Ignoring unsupported window attribute {:#x}", bit);
                aux
            };
        }
        aux
    }};
}

macro_rules! gc_aux {
    ($aux:ty, $values:expr) => {{
        let mut aux = <$aux>::new();
        for (bit, value) in $values.iter() {
            aux = if bit == u32::from(GC::FOREGROUND) {
                aux.foreground(value)
            } else if bit == u32::from(GC::BACKGROUND) {
                aux.background(value)
            } else if bit == u32::from(GC::LINE_WIDTH) {
                aux.line_width(value)
            } else if bit == u32::from(GC::FONT) {
                aux.font(value)
            } else {
                warn!("Ignoring unsupported gc attribute {:#x}", bit);
                aux
            };
        }
        aux
    }};
}

fn configure_aux(values: &ValueList) -> ConfigureWindowAux {
    let mut aux = ConfigureWindowAux::new();
    for (bit, value) in values.iter() {
        aux = if bit == u32::from(ConfigWindow::X) {
            aux.x(value as i32)
        } else if bit == u32::from(ConfigWindow::Y) {
            aux.y(value as i32)
        } else if bit == u32::from(ConfigWindow::WIDTH) {
            aux.width(value)
        } else if bit == u32::from(ConfigWindow::HEIGHT) {
            aux.height(value)
        } else if bit == u32::from(ConfigWindow::BORDER_WIDTH) {
            aux.border_width(value)
        } else {
            warn!("Ignoring unsupported configure field {:#x}", bit);
            aux
        };
    }
    aux
}

/// Live connection to an X server
pub struct X11Backend {
    conn: RustConnection,
    screen: ScreenInfo,
}

impl X11Backend {
    /// Connect to `display_name` (or `$DISPLAY`) and capture the root screen
    pub fn connect(display_name: Option<&str>) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(display_name)?;

        let screen = {
            let setup = conn.setup();
            let root = setup.roots.get(screen_num).ok_or_else(|| {
                Error::Connection(format!("screen {} not found", screen_num))
            })?;

            ScreenInfo {
                screen_num,
                root: root.root,
                root_visual: root.root_visual,
                root_depth: root.root_depth,
                default_colormap: root.default_colormap,
                white_pixel: root.white_pixel,
                black_pixel: root.black_pixel,
                width: root.width_in_pixels,
                height: root.height_in_pixels,
                min_keycode: setup.min_keycode,
                max_keycode: setup.max_keycode,
            }
        };

        info!(
            "Connected to X server, screen {} ({}x{}, root {:#x})",
            screen.screen_num, screen.width, screen.height, screen.root
        );

        Ok(Self { conn, screen })
    }

    /// Underlying x11rb connection
    pub fn connection(&self) -> &RustConnection {
        &self.conn
    }
}

impl Backend for X11Backend {
    fn screen(&self) -> &ScreenInfo {
        &self.screen
    }

    fn generate_id(&self) -> Result<u32> {
        self.conn
            .generate_id()
            .map_err(|e| Error::from_reply_or_id("generate_id", e))
    }

    fn keyboard_mapping(&self, first: u8, count: u8) -> Result<(u8, Vec<u32>)> {
        let reply = self
            .conn
            .get_keyboard_mapping(first, count)?
            .reply()
            .map_err(|e| Error::from_reply("get_keyboard_mapping", e))?;
        Ok((reply.keysyms_per_keycode, reply.keysyms))
    }

    fn intern_atom(&self, name: &str) -> Result<Atom> {
        Ok(self
            .conn
            .intern_atom(false, name.as_bytes())?
            .reply()
            .map_err(|e| Error::from_reply(format!("intern_atom({})", name), e))?
            .atom)
    }

    fn create_window(&self, request: &WindowRequest) -> Result<()> {
        self.conn
            .create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                request.id,
                request.parent,
                request.x,
                request.y,
                request.width,
                request.height,
                request.border_width,
                WindowClass::INPUT_OUTPUT,
                x11rb::COPY_FROM_PARENT,
                &window_aux!(CreateWindowAux, request.values),
            )?
            .check()
            .map_err(|e| Error::from_reply("create_window", e))
    }

    fn destroy_window(&self, window: Window) -> Result<()> {
        self.conn.destroy_window(window)?;
        Ok(())
    }

    fn map_window(&self, window: Window) -> Result<()> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn unmap_window(&self, window: Window) -> Result<()> {
        self.conn.unmap_window(window)?;
        Ok(())
    }

    fn configure_window(&self, window: Window, values: &ValueList) -> Result<()> {
        self.conn.configure_window(window, &configure_aux(values))?;
        Ok(())
    }

    fn change_window_attributes(&self, window: Window, values: &ValueList) -> Result<()> {
        self.conn
            .change_window_attributes(window, &window_aux!(ChangeWindowAttributesAux, values))?;
        Ok(())
    }

    fn get_geometry(&self, window: Window) -> Result<Geometry> {
        let reply = self
            .conn
            .get_geometry(window)?
            .reply()
            .map_err(|e| Error::from_reply("get_geometry", e))?;
        Ok(Geometry::new(
            i32::from(reply.x),
            i32::from(reply.y),
            u32::from(reply.width),
            u32::from(reply.height),
        ))
    }

    fn get_property(&self, window: Window, property: Atom, type_: Atom) -> Result<Vec<u8>> {
        let reply = self
            .conn
            .get_property(false, window, property, type_, 0, u32::MAX)?
            .reply()
            .map_err(|e| Error::from_reply("get_property", e))?;
        Ok(reply.value)
    }

    fn set_property(&self, window: Window, property: Atom, type_: Atom, data: &[u8]) -> Result<()> {
        self.conn
            .change_property8(PropMode::REPLACE, window, property, type_, data)?;
        Ok(())
    }

    fn create_colormap(&self, colormap: Colormap, window: Window, visual: Visualid) -> Result<()> {
        self.conn
            .create_colormap(ColormapAlloc::NONE, colormap, window, visual)?
            .check()
            .map_err(|e| Error::from_reply("create_colormap", e))
    }

    fn free_colormap(&self, colormap: Colormap) -> Result<()> {
        self.conn.free_colormap(colormap)?;
        Ok(())
    }

    fn alloc_color(&self, colormap: Colormap, red: u16, green: u16, blue: u16) -> Result<u32> {
        let reply = self
            .conn
            .alloc_color(colormap, red, green, blue)?
            .reply()
            .map_err(|e| Error::from_reply("alloc_color", e))?;
        Ok(reply.pixel)
    }

    fn free_colors(&self, colormap: Colormap, pixels: &[u32]) -> Result<()> {
        self.conn.free_colors(colormap, 0, pixels)?;
        Ok(())
    }

    fn open_font(&self, font: Font, name: &str) -> Result<()> {
        self.conn
            .open_font(font, name.as_bytes())?
            .check()
            .map_err(|e| Error::from_reply(format!("open_font({})", name), e))
    }

    fn close_font(&self, font: Font) -> Result<()> {
        self.conn.close_font(font)?;
        Ok(())
    }

    fn create_gc(&self, gc: Gcontext, drawable: Drawable, values: &ValueList) -> Result<()> {
        self.conn
            .create_gc(gc, drawable, &gc_aux!(CreateGCAux, values))?;
        Ok(())
    }

    fn change_gc(&self, gc: Gcontext, values: &ValueList) -> Result<()> {
        self.conn.change_gc(gc, &gc_aux!(ChangeGCAux, values))?;
        Ok(())
    }

    fn free_gc(&self, gc: Gcontext) -> Result<()> {
        self.conn.free_gc(gc)?;
        Ok(())
    }

    fn poly_point(&self, drawable: Drawable, gc: Gcontext, relative: bool, points: &[Point]) -> Result<()> {
        let mode = if relative {
            CoordMode::PREVIOUS
        } else {
            CoordMode::ORIGIN
        };
        let points: Vec<xproto::Point> = points
            .iter()
            .map(|p| xproto::Point {
                x: coord(p.x),
                y: coord(p.y),
            })
            .collect();
        self.conn.poly_point(mode, drawable, gc, &points)?;
        Ok(())
    }

    fn poly_segment(&self, drawable: Drawable, gc: Gcontext, lines: &[Line]) -> Result<()> {
        let segments: Vec<xproto::Segment> = lines
            .iter()
            .map(|l| xproto::Segment {
                x1: coord(l.x1),
                y1: coord(l.y1),
                x2: coord(l.x2),
                y2: coord(l.y2),
            })
            .collect();
        self.conn.poly_segment(drawable, gc, &segments)?;
        Ok(())
    }

    fn poly_rectangle(&self, drawable: Drawable, gc: Gcontext, fill: bool, rects: &[Rect]) -> Result<()> {
        let rectangles: Vec<xproto::Rectangle> = rects
            .iter()
            .map(|r| xproto::Rectangle {
                x: coord(r.x),
                y: coord(r.y),
                width: dimension(r.w),
                height: dimension(r.h),
            })
            .collect();
        if fill {
            self.conn.poly_fill_rectangle(drawable, gc, &rectangles)?;
        } else {
            self.conn.poly_rectangle(drawable, gc, &rectangles)?;
        }
        Ok(())
    }

    fn image_text16(&self, drawable: Drawable, gc: Gcontext, x: i32, y: i32, text: &[u16]) -> Result<()> {
        let chars: Vec<Char2b> = text
            .iter()
            .map(|&unit| Char2b {
                byte1: (unit >> 8) as u8,
                byte2: (unit & 0xff) as u8,
            })
            .collect();
        self.conn
            .image_text16(drawable, gc, coord(x), coord(y), &chars)?
            .check()
            .map_err(|e| Error::from_reply("image_text16", e))
    }

    fn poll_for_event(&self) -> Result<Option<RawEvent>> {
        Ok(self.conn.poll_for_event()?)
    }

    fn flush(&self) -> Result<()> {
        debug!("Flushing request queue");
        self.conn.flush()?;
        Ok(())
    }
}
