//! Surface Module
//!
//! Window/Frame manager. A [`Surface`] is one top-level or child window with
//! its own color allocator. Geometry and attribute changes are deferred into
//! the surface's dirty caches, which live in the display registry until the
//! next [`Display::flush`](crate::display::Display::flush).

use std::rc::Rc;

use tracing::{debug, warn};
use x11rb::protocol::xproto::{Colormap, ConfigWindow, Window, CW};

use crate::backend::{Backend, WindowRequest, X11Backend};
use crate::color::{ColorAllocator, Rgba};
use crate::dirty::{AttributeCache, Dirty, ValueList};
use crate::display::{Display, LazyDisplay};
use crate::error::{Error, Result};
use crate::event::EventKind;
use crate::shared::geometry::{coord, dimension};

/// Pending configure-window fields
#[derive(Debug, Clone, Default)]
pub struct WindowConfig {
    pub x: Dirty<i32>,
    pub y: Dirty<i32>,
    pub width: Dirty<u32>,
    pub height: Dirty<u32>,
    pub border_width: Dirty<u32>,
}

impl AttributeCache for WindowConfig {
    fn pending(&self) -> ValueList {
        let mut list = ValueList::new();
        // coordinates travel as the two's complement bits of an INT32
        list.push_opt(u32::from(ConfigWindow::X), self.x.pending().map(|v| v as u32));
        list.push_opt(u32::from(ConfigWindow::Y), self.y.pending().map(|v| v as u32));
        list.push_opt(u32::from(ConfigWindow::WIDTH), self.width.pending());
        list.push_opt(u32::from(ConfigWindow::HEIGHT), self.height.pending());
        list.push_opt(u32::from(ConfigWindow::BORDER_WIDTH), self.border_width.pending());
        list
    }

    fn mark_clean(&mut self) {
        self.x.clear();
        self.y.clear();
        self.width.clear();
        self.height.clear();
        self.border_width.clear();
    }
}

/// Pending window attributes
#[derive(Debug, Clone, Default)]
pub struct WindowAttributes {
    pub background: Dirty<u32>,
    pub border_color: Dirty<u32>,
}

impl AttributeCache for WindowAttributes {
    fn pending(&self) -> ValueList {
        let mut list = ValueList::new();
        list.push_opt(u32::from(CW::BACK_PIXEL), self.background.pending());
        list.push_opt(u32::from(CW::BORDER_PIXEL), self.border_color.pending());
        list
    }

    fn mark_clean(&mut self) {
        self.background.clear();
        self.border_color.clear();
    }
}

/// Registry entry for one open surface
#[derive(Debug, Default)]
pub(crate) struct SurfaceState {
    pub(crate) config: WindowConfig,
    pub(crate) attributes: WindowAttributes,
}

impl SurfaceState {
    pub(crate) fn is_dirty(&self) -> bool {
        self.config.is_dirty() || self.attributes.is_dirty()
    }

    /// At most one configure and one attribute request. Each cache is
    /// cleared only once its request was queued.
    pub(crate) fn flush<B: Backend>(&mut self, backend: &B, id: Window) -> Result<()> {
        let config = self.config.pending();
        if !config.is_empty() {
            backend.configure_window(id, &config)?;
            self.config.mark_clean();
        }

        let attributes = self.attributes.pending();
        if !attributes.is_empty() {
            backend.change_window_attributes(id, &attributes)?;
            self.attributes.mark_clean();
        }

        debug!(
            "Flushed surface {:#x}: {} configure fields, {} attributes",
            id,
            config.len(),
            attributes.len()
        );
        Ok(())
    }
}

/// Creation parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceOptions {
    /// Parent window; 0 means the root window
    pub parent: Window,
    pub x: i32,
    pub y: i32,
    /// Clamped to at least 1
    pub width: u32,
    /// Clamped to at least 1
    pub height: u32,
    pub border_width: u32,
    /// Background pixel; 0 means the configured default
    pub background: u32,
}

/// An on-screen window
pub struct Surface<B: Backend = X11Backend> {
    display: Rc<Display<B>>,
    id: Window,
    colors: ColorAllocator,
    dedicated_colormap: bool,
    event_mask: u32,
    visible: bool,
    open: bool,
}

impl<B: Backend> Surface<B> {
    /// Connect if needed, then create the surface
    pub fn open(display: &LazyDisplay<B>, options: &SurfaceOptions) -> Result<Self> {
        let display = display.ensure_connected()?;
        Self::create(&display, options)
    }

    /// Create the window (and its color map when configured). Any server
    /// rejection aborts creation and releases whatever was already created.
    pub fn create(display: &Rc<Display<B>>, options: &SurfaceOptions) -> Result<Self> {
        let backend = display.backend();
        let screen = display.screen();

        let parent = if options.parent == x11rb::NONE {
            screen.root
        } else {
            options.parent
        };
        let width = options.width.max(1);
        let height = options.height.max(1);
        let background = if options.background == 0 {
            display.default_background()
        } else {
            options.background
        };

        let dedicated_colormap = display.surface_config().dedicated_colormap;
        let colormap = if dedicated_colormap {
            let colormap = backend.generate_id()?;
            backend.create_colormap(colormap, screen.root, screen.root_visual)?;
            colormap
        } else {
            screen.default_colormap
        };

        let id = backend.generate_id()?;
        let mut values = ValueList::new();
        values.push(u32::from(CW::BACK_PIXEL), background);
        values.push(u32::from(CW::EVENT_MASK), 0);
        if dedicated_colormap {
            values.push(u32::from(CW::COLORMAP), colormap);
        }

        let request = WindowRequest {
            id,
            parent,
            x: coord(options.x),
            y: coord(options.y),
            width: dimension(width),
            height: dimension(height),
            border_width: dimension(options.border_width),
            values,
        };

        if let Err(e) = backend.create_window(&request) {
            if dedicated_colormap {
                if let Err(free_err) = backend.free_colormap(colormap) {
                    warn!("Failed to free colormap {:#x}: {}", colormap, free_err);
                }
            }
            return Err(e);
        }

        display.registry().surfaces.insert(id, SurfaceState::default());
        debug!(
            "Created surface {:#x} ({}x{} at {},{} in {:#x})",
            id, width, height, options.x, options.y, parent
        );

        Ok(Self {
            display: Rc::clone(display),
            id,
            colors: ColorAllocator::new(colormap),
            dedicated_colormap,
            event_mask: 0,
            visible: false,
            open: true,
        })
    }

    pub fn id(&self) -> Window {
        self.id
    }

    pub fn display(&self) -> &Rc<Display<B>> {
        &self.display
    }

    pub fn colormap(&self) -> Colormap {
        self.colors.colormap()
    }

    pub fn colors(&self) -> &ColorAllocator {
        &self.colors
    }

    pub fn event_mask(&self) -> u32 {
        self.event_mask
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::Closed("surface"))
        }
    }

    /// Destroy the window. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.display.registry().remove_surface(self.id);

        let backend = self.display.backend();
        backend.destroy_window(self.id)?;
        if self.dedicated_colormap {
            backend.free_colormap(self.colors.colormap())?;
        }

        debug!("Closed surface {:#x}", self.id);
        Ok(())
    }

    /// Client-side visibility flag
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Map or unmap now, without waiting for a flush
    pub fn set_visible(&mut self, visible: bool) -> Result<()> {
        self.ensure_open()?;
        if visible {
            self.display.backend().map_window(self.id)?;
        } else {
            self.display.backend().unmap_window(self.id)?;
        }
        self.visible = visible;
        Ok(())
    }

    /// Current position as the server sees it. Round trip.
    pub fn position(&self) -> Result<(i32, i32)> {
        self.ensure_open()?;
        let geometry = self.display.backend().get_geometry(self.id)?;
        Ok((geometry.x, geometry.y))
    }

    /// Current size as the server sees it. Round trip.
    pub fn size(&self) -> Result<(u32, u32)> {
        self.ensure_open()?;
        let geometry = self.display.backend().get_geometry(self.id)?;
        Ok((geometry.width, geometry.height))
    }

    pub fn set_position(&mut self, x: i32, y: i32) -> Result<()> {
        self.display.registry().update_surface(self.id, |state| {
            state.config.x.set(x);
            state.config.y.set(y);
        })
    }

    /// Deferred. Zero dimensions are raised to 1.
    pub fn set_size(&mut self, width: u32, height: u32) -> Result<()> {
        self.display.registry().update_surface(self.id, |state| {
            state.config.width.set(width.max(1));
            state.config.height.set(height.max(1));
        })
    }

    pub fn set_border_width(&mut self, border_width: u32) -> Result<()> {
        self.display.registry().update_surface(self.id, |state| {
            state.config.border_width.set(border_width);
        })
    }

    pub fn set_background(&mut self, pixel: u32) -> Result<()> {
        self.display.registry().update_surface(self.id, |state| {
            state.attributes.background.set(pixel);
        })
    }

    pub fn set_border_color(&mut self, pixel: u32) -> Result<()> {
        self.display.registry().update_surface(self.id, |state| {
            state.attributes.border_color.set(pixel);
        })
    }

    /// `_NET_WM_NAME`. Round trip.
    pub fn title(&self) -> Result<String> {
        self.ensure_open()?;
        let atoms = self.display.atoms();
        let bytes = self
            .display
            .backend()
            .get_property(self.id, atoms.net_wm_name, atoms.utf8_string)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn set_title(&mut self, title: &str) -> Result<()> {
        self.ensure_open()?;
        let atoms = self.display.atoms();
        self.display.backend().set_property(
            self.id,
            atoms.net_wm_name,
            atoms.utf8_string,
            title.as_bytes(),
        )
    }

    /// Select the protocol events behind `kind`. Sent immediately, and only
    /// when the mask actually changes.
    pub fn listen_event(&mut self, kind: EventKind) -> Result<()> {
        self.ensure_open()?;
        let mask = self.event_mask | kind.event_mask();
        if mask == self.event_mask {
            return Ok(());
        }

        let mut values = ValueList::new();
        values.push(u32::from(CW::EVENT_MASK), mask);
        self.display
            .backend()
            .change_window_attributes(self.id, &values)?;

        debug!("Surface {:#x} now listens for {:?} (mask {:#x})", self.id, kind, mask);
        self.event_mask = mask;
        Ok(())
    }

    /// Allocate a pixel on this surface's color map
    pub fn allocate_color(&self, color: Rgba) -> Result<u32> {
        self.ensure_open()?;
        self.colors.allocate(self.display.backend(), color)
    }

    pub fn release_colors(&self, pixels: &[u32]) -> Result<()> {
        self.ensure_open()?;
        self.colors.release(self.display.backend(), pixels)
    }
}

impl<B: Backend> Drop for Surface<B> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close surface {:#x}: {}", self.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{self, RecordingBackend, Request};
    use crate::config::Config;
    use crate::display::test_display;
    use crate::error::code;
    use crate::shared::Geometry;
    use x11rb::protocol::xproto::EventMask;

    fn surface(display: &Rc<Display<RecordingBackend>>) -> Surface<RecordingBackend> {
        let options = SurfaceOptions {
            width: 200,
            height: 100,
            ..Default::default()
        };
        Surface::create(display, &options).unwrap()
    }

    fn created(display: &Display<RecordingBackend>) -> WindowRequest {
        display
            .backend()
            .requests()
            .into_iter()
            .find_map(|r| match r {
                Request::CreateWindow(req) => Some(req),
                _ => None,
            })
            .expect("no create_window request")
    }

    fn configures(display: &Display<RecordingBackend>) -> Vec<ValueList> {
        display
            .backend()
            .requests()
            .into_iter()
            .filter_map(|r| match r {
                Request::ConfigureWindow(_, values) => Some(values),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn zero_size_is_clamped() {
        let display = test_display();
        let _surface = Surface::create(&display, &SurfaceOptions::default()).unwrap();

        let request = created(&display);
        assert_eq!((request.width, request.height), (1, 1));
    }

    #[test]
    fn creation_defaults() {
        let display = test_display();
        let surface = surface(&display);

        let request = created(&display);
        assert_eq!(request.parent, recording::ROOT);
        assert_eq!(request.values.get(u32::from(CW::BACK_PIXEL)), Some(recording::WHITE));
        assert_eq!(request.values.get(u32::from(CW::EVENT_MASK)), Some(0));
        assert_eq!(
            request.values.get(u32::from(CW::COLORMAP)),
            Some(surface.colormap())
        );
        assert_ne!(surface.colormap(), recording::DEFAULT_COLORMAP);
        assert!(!surface.visible());
        assert_eq!(display.live_surfaces(), 1);
    }

    #[test]
    fn shared_colormap_when_configured() {
        let mut config = Config::default();
        config.surface.dedicated_colormap = false;
        let display = Rc::new(Display::with_backend(RecordingBackend::new(), &config).unwrap());

        let mut surface = surface(&display);
        assert_eq!(surface.colormap(), recording::DEFAULT_COLORMAP);
        surface.close().unwrap();
        assert_eq!(
            display
                .backend()
                .count(|r| matches!(r, Request::CreateColormap(..) | Request::FreeColormap(_))),
            0
        );
    }

    #[test]
    fn failed_create_is_not_open() {
        let display = test_display();
        display.backend().fail_next("create_window", code::ALLOC);

        let result = Surface::create(&display, &SurfaceOptions::default());
        let err = result.err().expect("creation should fail");
        assert!(err.is_resource());
        assert_eq!(display.live_surfaces(), 0);
        // the colormap made for it is released again
        assert_eq!(
            display
                .backend()
                .count(|r| matches!(r, Request::FreeColormap(_))),
            1
        );
    }

    #[test]
    fn failed_colormap_aborts_creation() {
        let display = test_display();
        display.backend().fail_next("create_colormap", code::ALLOC);

        assert!(Surface::create(&display, &SurfaceOptions::default()).is_err());
        assert_eq!(
            display
                .backend()
                .count(|r| matches!(r, Request::CreateWindow(_))),
            0
        );
    }

    #[test]
    fn close_twice_destroys_once() {
        let display = test_display();
        let mut surface = surface(&display);

        surface.close().unwrap();
        surface.close().unwrap();
        drop(surface);

        assert_eq!(
            display
                .backend()
                .count(|r| matches!(r, Request::DestroyWindow(_))),
            1
        );
        assert_eq!(display.live_surfaces(), 0);
    }

    #[test]
    fn drop_closes() {
        let display = test_display();
        let id = {
            let surface = surface(&display);
            surface.id()
        };
        assert!(display.backend().requests().contains(&Request::DestroyWindow(id)));
    }

    #[test]
    fn closed_surface_is_skipped_by_flush() {
        let display = test_display();
        let mut surface = surface(&display);
        surface.set_position(5, 5).unwrap();
        surface.close().unwrap();

        display.flush().unwrap();
        assert!(configures(&display).is_empty());
        assert!(matches!(surface.set_position(1, 1), Err(Error::Closed(_))));
    }

    #[test]
    fn distinct_fields_flush_as_one_request() {
        let display = test_display();
        let mut surface = surface(&display);
        surface.set_position(-10, 20).unwrap();
        surface.set_size(300, 400).unwrap();
        surface.set_border_width(2).unwrap();

        assert_eq!(
            display.registry().surfaces[&surface.id()].config.dirty_count(),
            5
        );

        display.flush().unwrap();

        let requests = configures(&display);
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].iter().collect::<Vec<_>>(),
            vec![
                (u32::from(ConfigWindow::X), -10i32 as u32),
                (u32::from(ConfigWindow::Y), 20),
                (u32::from(ConfigWindow::WIDTH), 300),
                (u32::from(ConfigWindow::HEIGHT), 400),
                (u32::from(ConfigWindow::BORDER_WIDTH), 2),
            ]
        );
        assert_eq!(
            display.registry().surfaces[&surface.id()].config.dirty_count(),
            0
        );

        // nothing left to send
        display.flush().unwrap();
        assert_eq!(configures(&display).len(), 1);
    }

    #[test]
    fn last_write_wins() {
        let display = test_display();
        let mut surface = surface(&display);
        surface.set_background(0x111111).unwrap();
        surface.set_background(0x222222).unwrap();
        display.flush().unwrap();

        let attributes: Vec<ValueList> = display
            .backend()
            .requests()
            .into_iter()
            .filter_map(|r| match r {
                Request::ChangeWindowAttributes(_, values) => Some(values),
                _ => None,
            })
            .collect();
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].len(), 1);
        assert_eq!(attributes[0].get(u32::from(CW::BACK_PIXEL)), Some(0x222222));
    }

    #[test]
    fn set_size_clamps() {
        let display = test_display();
        let mut surface = surface(&display);
        surface.set_size(0, 0).unwrap();
        display.flush().unwrap();

        let values = &configures(&display)[0];
        assert_eq!(values.get(u32::from(ConfigWindow::WIDTH)), Some(1));
        assert_eq!(values.get(u32::from(ConfigWindow::HEIGHT)), Some(1));
    }

    #[test]
    fn listen_event_ors_masks_and_skips_repeats() {
        let display = test_display();
        let mut surface = surface(&display);
        display.backend().take_requests();

        surface.listen_event(EventKind::MouseMove).unwrap();
        surface.listen_event(EventKind::MousePress).unwrap();
        surface.listen_event(EventKind::MousePress).unwrap();

        let expected = EventKind::MouseMove.event_mask() | EventKind::MousePress.event_mask();
        assert_eq!(surface.event_mask(), expected);
        assert_eq!(
            expected,
            u32::from(
                EventMask::POINTER_MOTION | EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE
            )
        );
        assert_eq!(display.backend().requests().len(), 2);
    }

    #[test]
    fn window_open_registration_sends_nothing() {
        let display = test_display();
        let mut surface = surface(&display);
        display.backend().take_requests();

        surface.listen_event(EventKind::WindowOpen).unwrap();
        surface.listen_event(EventKind::WindowClose).unwrap();
        assert_eq!(surface.event_mask(), 0);
        assert!(display.backend().requests().is_empty());
    }

    #[test]
    fn visibility_is_immediate() {
        let display = test_display();
        let mut surface = surface(&display);
        display.backend().take_requests();

        surface.set_visible(true).unwrap();
        assert!(surface.visible());
        surface.set_visible(false).unwrap();
        assert!(!surface.visible());

        assert_eq!(
            display.backend().requests(),
            vec![
                Request::MapWindow(surface.id()),
                Request::UnmapWindow(surface.id())
            ]
        );
    }

    #[test]
    fn geometry_is_queried() {
        let display = test_display();
        let surface = surface(&display);
        display
            .backend()
            .set_geometry(surface.id(), Geometry::new(12, -4, 640, 480));

        assert_eq!(surface.position().unwrap(), (12, -4));
        assert_eq!(surface.size().unwrap(), (640, 480));
        assert_eq!(
            display
                .backend()
                .count(|r| matches!(r, Request::GetGeometry(_))),
            2
        );
    }

    #[test]
    fn title_round_trip() {
        let display = test_display();
        let mut surface = surface(&display);
        assert_eq!(surface.title().unwrap(), "");

        surface.set_title("Grüße").unwrap();
        assert_eq!(surface.title().unwrap(), "Grüße");
    }

    #[test]
    fn colors_use_surface_colormap() {
        let display = test_display();
        let surface = surface(&display);
        display.backend().take_requests();

        let pixel = surface.allocate_color(Rgba::new(1, 2, 3, 4)).unwrap();
        surface.release_colors(&[pixel]).unwrap();

        assert_eq!(
            display.backend().requests(),
            vec![
                Request::AllocColor {
                    colormap: surface.colormap(),
                    red: 257,
                    green: 514,
                    blue: 771,
                },
                Request::FreeColors(surface.colormap(), vec![pixel]),
            ]
        );
    }
}
