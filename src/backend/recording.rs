//! In-memory backend for unit tests. Records every request in order, serves
//! scripted replies, and queues raw events for polling.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use x11rb::protocol::Event as RawEvent;
use x11rb::protocol::xproto::{Atom, Colormap, Drawable, Font, Gcontext, Visualid, Window};

use super::{Backend, ScreenInfo, WindowRequest};
use crate::dirty::ValueList;
use crate::error::{Error, Result};
use crate::shared::{Geometry, Line, Point, Rect};

pub const ROOT: Window = 0x100;
pub const DEFAULT_COLORMAP: Colormap = 0x20;
pub const WHITE: u32 = 0x00ff_ffff;

/// One request as the server would have seen it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    CreateWindow(WindowRequest),
    DestroyWindow(Window),
    MapWindow(Window),
    UnmapWindow(Window),
    ConfigureWindow(Window, ValueList),
    ChangeWindowAttributes(Window, ValueList),
    GetGeometry(Window),
    GetProperty(Window, Atom),
    SetProperty(Window, Atom, Vec<u8>),
    CreateColormap(Colormap, Window),
    FreeColormap(Colormap),
    AllocColor {
        colormap: Colormap,
        red: u16,
        green: u16,
        blue: u16,
    },
    FreeColors(Colormap, Vec<u32>),
    OpenFont(Font, String),
    CloseFont(Font),
    CreateGc(Gcontext, Drawable, ValueList),
    ChangeGc(Gcontext, ValueList),
    FreeGc(Gcontext),
    PolyPoint {
        gc: Gcontext,
        relative: bool,
        points: Vec<Point>,
    },
    PolySegment {
        gc: Gcontext,
        lines: Vec<Line>,
    },
    PolyRectangle {
        gc: Gcontext,
        fill: bool,
        rects: Vec<Rect>,
    },
    ImageText {
        gc: Gcontext,
        x: i32,
        y: i32,
        text: Vec<u16>,
    },
    Flush,
}

pub struct RecordingBackend {
    screen: ScreenInfo,
    next_id: Cell<u32>,
    next_pixel: Cell<u32>,
    mapping: (u8, Vec<u32>),
    atoms: RefCell<Vec<String>>,
    requests: RefCell<Vec<Request>>,
    events: RefCell<VecDeque<RawEvent>>,
    failures: RefCell<HashMap<&'static str, u8>>,
    geometry: RefCell<HashMap<Window, Geometry>>,
    properties: RefCell<HashMap<(Window, Atom), Vec<u8>>>,
}

impl RecordingBackend {
    /// Keycodes 8..=255, keycode 38 -> a/A, keycode 9 -> Escape
    pub fn new() -> Self {
        let per = 2u8;
        let mut keysyms = vec![0u32; 248 * usize::from(per)];
        keysyms[(38 - 8) * 2] = 'a' as u32;
        keysyms[(38 - 8) * 2 + 1] = 'A' as u32;
        keysyms[(9 - 8) * 2] = crate::keymap::keysym::ESCAPE;

        Self {
            screen: ScreenInfo {
                screen_num: 0,
                root: ROOT,
                root_visual: 0x21,
                root_depth: 24,
                default_colormap: DEFAULT_COLORMAP,
                white_pixel: WHITE,
                black_pixel: 0,
                width: 1920,
                height: 1080,
                min_keycode: 8,
                max_keycode: 255,
            },
            next_id: Cell::new(0x0040_0001),
            next_pixel: Cell::new(1),
            mapping: (per, keysyms),
            atoms: RefCell::new(Vec::new()),
            requests: RefCell::new(Vec::new()),
            events: RefCell::new(VecDeque::new()),
            failures: RefCell::new(HashMap::new()),
            geometry: RefCell::new(HashMap::new()),
            properties: RefCell::new(HashMap::new()),
        }
    }

    /// Make the next request named `operation` fail with `error_code`
    pub fn fail_next(&self, operation: &'static str, error_code: u8) {
        self.failures.borrow_mut().insert(operation, error_code);
    }

    pub fn push_event(&self, event: RawEvent) {
        self.events.borrow_mut().push_back(event);
    }

    pub fn set_geometry(&self, window: Window, geometry: Geometry) {
        self.geometry.borrow_mut().insert(window, geometry);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.borrow().clone()
    }

    /// Drain the log
    pub fn take_requests(&self) -> Vec<Request> {
        std::mem::take(&mut *self.requests.borrow_mut())
    }

    pub fn count(&self, pred: impl Fn(&Request) -> bool) -> usize {
        self.requests.borrow().iter().filter(|r| pred(r)).count()
    }

    fn record(&self, request: Request) {
        self.requests.borrow_mut().push(request);
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        match self.failures.borrow_mut().remove(operation) {
            Some(code) => Err(Error::resource(operation, code, 0)),
            None => Ok(()),
        }
    }
}

impl Backend for RecordingBackend {
    fn screen(&self) -> &ScreenInfo {
        &self.screen
    }

    fn generate_id(&self) -> Result<u32> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Ok(id)
    }

    fn keyboard_mapping(&self, first: u8, count: u8) -> Result<(u8, Vec<u32>)> {
        self.check("get_keyboard_mapping")?;
        assert_eq!(first, self.screen.min_keycode);
        assert_eq!(usize::from(count), 248);
        Ok(self.mapping.clone())
    }

    fn intern_atom(&self, name: &str) -> Result<Atom> {
        let mut atoms = self.atoms.borrow_mut();
        let index = match atoms.iter().position(|a| a == name) {
            Some(index) => index,
            None => {
                atoms.push(name.to_string());
                atoms.len() - 1
            }
        };
        Ok(300 + index as Atom)
    }

    fn create_window(&self, request: &WindowRequest) -> Result<()> {
        self.check("create_window")?;
        self.record(Request::CreateWindow(request.clone()));
        Ok(())
    }

    fn destroy_window(&self, window: Window) -> Result<()> {
        self.record(Request::DestroyWindow(window));
        Ok(())
    }

    fn map_window(&self, window: Window) -> Result<()> {
        self.record(Request::MapWindow(window));
        Ok(())
    }

    fn unmap_window(&self, window: Window) -> Result<()> {
        self.record(Request::UnmapWindow(window));
        Ok(())
    }

    fn configure_window(&self, window: Window, values: &ValueList) -> Result<()> {
        self.check("configure_window")?;
        self.record(Request::ConfigureWindow(window, values.clone()));
        Ok(())
    }

    fn change_window_attributes(&self, window: Window, values: &ValueList) -> Result<()> {
        self.record(Request::ChangeWindowAttributes(window, values.clone()));
        Ok(())
    }

    fn get_geometry(&self, window: Window) -> Result<Geometry> {
        self.check("get_geometry")?;
        self.record(Request::GetGeometry(window));
        Ok(self
            .geometry
            .borrow()
            .get(&window)
            .copied()
            .unwrap_or_default())
    }

    fn get_property(&self, window: Window, property: Atom, _type: Atom) -> Result<Vec<u8>> {
        self.record(Request::GetProperty(window, property));
        Ok(self
            .properties
            .borrow()
            .get(&(window, property))
            .cloned()
            .unwrap_or_default())
    }

    fn set_property(&self, window: Window, property: Atom, _type: Atom, data: &[u8]) -> Result<()> {
        self.record(Request::SetProperty(window, property, data.to_vec()));
        self.properties
            .borrow_mut()
            .insert((window, property), data.to_vec());
        Ok(())
    }

    fn create_colormap(&self, colormap: Colormap, window: Window, _visual: Visualid) -> Result<()> {
        self.check("create_colormap")?;
        self.record(Request::CreateColormap(colormap, window));
        Ok(())
    }

    fn free_colormap(&self, colormap: Colormap) -> Result<()> {
        self.record(Request::FreeColormap(colormap));
        Ok(())
    }

    fn alloc_color(&self, colormap: Colormap, red: u16, green: u16, blue: u16) -> Result<u32> {
        self.record(Request::AllocColor {
            colormap,
            red,
            green,
            blue,
        });
        self.check("alloc_color")?;
        let pixel = self.next_pixel.get();
        self.next_pixel.set(pixel + 1);
        Ok(pixel)
    }

    fn free_colors(&self, colormap: Colormap, pixels: &[u32]) -> Result<()> {
        self.record(Request::FreeColors(colormap, pixels.to_vec()));
        Ok(())
    }

    fn open_font(&self, font: Font, name: &str) -> Result<()> {
        self.check("open_font")?;
        self.record(Request::OpenFont(font, name.to_string()));
        Ok(())
    }

    fn close_font(&self, font: Font) -> Result<()> {
        self.record(Request::CloseFont(font));
        Ok(())
    }

    fn create_gc(&self, gc: Gcontext, drawable: Drawable, values: &ValueList) -> Result<()> {
        self.record(Request::CreateGc(gc, drawable, values.clone()));
        Ok(())
    }

    fn change_gc(&self, gc: Gcontext, values: &ValueList) -> Result<()> {
        self.check("change_gc")?;
        self.record(Request::ChangeGc(gc, values.clone()));
        Ok(())
    }

    fn free_gc(&self, gc: Gcontext) -> Result<()> {
        self.record(Request::FreeGc(gc));
        Ok(())
    }

    fn poly_point(&self, _drawable: Drawable, gc: Gcontext, relative: bool, points: &[Point]) -> Result<()> {
        self.record(Request::PolyPoint {
            gc,
            relative,
            points: points.to_vec(),
        });
        Ok(())
    }

    fn poly_segment(&self, _drawable: Drawable, gc: Gcontext, lines: &[Line]) -> Result<()> {
        self.record(Request::PolySegment {
            gc,
            lines: lines.to_vec(),
        });
        Ok(())
    }

    fn poly_rectangle(&self, _drawable: Drawable, gc: Gcontext, fill: bool, rects: &[Rect]) -> Result<()> {
        self.record(Request::PolyRectangle {
            gc,
            fill,
            rects: rects.to_vec(),
        });
        Ok(())
    }

    fn image_text16(&self, _drawable: Drawable, gc: Gcontext, x: i32, y: i32, text: &[u16]) -> Result<()> {
        self.check("image_text16")?;
        self.record(Request::ImageText {
            gc,
            x,
            y,
            text: text.to_vec(),
        });
        Ok(())
    }

    fn poll_for_event(&self) -> Result<Option<RawEvent>> {
        Ok(self.events.borrow_mut().pop_front())
    }

    fn flush(&self) -> Result<()> {
        self.record(Request::Flush);
        Ok(())
    }
}

/// Raw x11rb events as the server would deliver them
pub mod fixtures {
    use x11rb::protocol::Event as RawEvent;
    use x11rb::protocol::xproto::{
        ButtonPressEvent, CreateNotifyEvent, DestroyNotifyEvent, EnterNotifyEvent, ExposeEvent,
        KeyButMask, KeyPressEvent, MapNotifyEvent, Motion, MotionNotifyEvent, NotifyDetail,
        NotifyMode, Window, BUTTON_PRESS_EVENT, BUTTON_RELEASE_EVENT, CREATE_NOTIFY_EVENT,
        DESTROY_NOTIFY_EVENT, ENTER_NOTIFY_EVENT, EXPOSE_EVENT, KEY_PRESS_EVENT,
        KEY_RELEASE_EVENT, LEAVE_NOTIFY_EVENT, MAP_NOTIFY_EVENT, MOTION_NOTIFY_EVENT,
    };

    use super::ROOT;

    pub fn expose(window: Window) -> RawEvent {
        RawEvent::Expose(ExposeEvent {
            response_type: EXPOSE_EVENT,
            sequence: 0,
            window,
            x: 0,
            y: 0,
            width: 100,
            height: 100,
            count: 0,
        })
    }

    pub fn button(window: Window, detail: u8, pressed: bool) -> RawEvent {
        let event = ButtonPressEvent {
            response_type: if pressed {
                BUTTON_PRESS_EVENT
            } else {
                BUTTON_RELEASE_EVENT
            },
            detail,
            sequence: 0,
            time: 0,
            root: ROOT,
            event: window,
            child: x11rb::NONE,
            root_x: 0,
            root_y: 0,
            event_x: 5,
            event_y: 5,
            state: KeyButMask::from(0u16),
            same_screen: true,
        };
        if pressed {
            RawEvent::ButtonPress(event)
        } else {
            RawEvent::ButtonRelease(event)
        }
    }

    pub fn motion(window: Window, x: i16, y: i16) -> RawEvent {
        RawEvent::MotionNotify(MotionNotifyEvent {
            response_type: MOTION_NOTIFY_EVENT,
            detail: Motion::NORMAL,
            sequence: 0,
            time: 0,
            root: ROOT,
            event: window,
            child: x11rb::NONE,
            root_x: x,
            root_y: y,
            event_x: x,
            event_y: y,
            state: KeyButMask::from(0u16),
            same_screen: true,
        })
    }

    pub fn crossing(window: Window, x: i16, y: i16, entered: bool) -> RawEvent {
        let event = EnterNotifyEvent {
            response_type: if entered {
                ENTER_NOTIFY_EVENT
            } else {
                LEAVE_NOTIFY_EVENT
            },
            detail: NotifyDetail::ANCESTOR,
            sequence: 0,
            time: 0,
            root: ROOT,
            event: window,
            child: x11rb::NONE,
            root_x: x,
            root_y: y,
            event_x: x,
            event_y: y,
            state: KeyButMask::from(0u16),
            mode: NotifyMode::NORMAL,
            same_screen_focus: 0,
        };
        if entered {
            RawEvent::EnterNotify(event)
        } else {
            RawEvent::LeaveNotify(event)
        }
    }

    pub fn key(window: Window, keycode: u8, state: u16, pressed: bool) -> RawEvent {
        let event = KeyPressEvent {
            response_type: if pressed {
                KEY_PRESS_EVENT
            } else {
                KEY_RELEASE_EVENT
            },
            detail: keycode,
            sequence: 0,
            time: 0,
            root: ROOT,
            event: window,
            child: x11rb::NONE,
            root_x: 0,
            root_y: 0,
            event_x: 0,
            event_y: 0,
            state: KeyButMask::from(state),
            same_screen: true,
        };
        if pressed {
            RawEvent::KeyPress(event)
        } else {
            RawEvent::KeyRelease(event)
        }
    }

    pub fn create_notify(window: Window) -> RawEvent {
        RawEvent::CreateNotify(CreateNotifyEvent {
            response_type: CREATE_NOTIFY_EVENT,
            sequence: 0,
            parent: ROOT,
            window,
            x: 0,
            y: 0,
            width: 1,
            height: 1,
            border_width: 0,
            override_redirect: false,
        })
    }

    pub fn destroy_notify(window: Window) -> RawEvent {
        RawEvent::DestroyNotify(DestroyNotifyEvent {
            response_type: DESTROY_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
        })
    }

    pub fn map_notify(window: Window) -> RawEvent {
        RawEvent::MapNotify(MapNotifyEvent {
            response_type: MAP_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            override_redirect: false,
        })
    }
}
