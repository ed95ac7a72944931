//! Event Module
//!
//! The normalized event model handed to callers by [`Display::poll`]. One
//! variant per decoded event, each carrying only its own fields plus the
//! surface it was reported against.
//!
//! [`Display::poll`]: crate::display::Display::poll

pub mod decode;
mod key;

pub use key::Key;

use x11rb::protocol::xproto::{EventMask, Window};

/// Event categories a surface can register interest in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    Unknown = 0,
    MouseMove = 1,
    MouseWheel = 2,
    MousePress = 3,
    MouseHover = 4,
    KeyPress = 5,
    WindowMove = 6,
    WindowResize = 7,
    WindowFocus = 8,
    WindowDraw = 9,
    WindowOpen = 10,
    WindowClose = 11,
}

impl EventKind {
    /// Every registrable kind, in code order
    pub const ALL: [EventKind; 11] = [
        EventKind::MouseMove,
        EventKind::MouseWheel,
        EventKind::MousePress,
        EventKind::MouseHover,
        EventKind::KeyPress,
        EventKind::WindowMove,
        EventKind::WindowResize,
        EventKind::WindowFocus,
        EventKind::WindowDraw,
        EventKind::WindowOpen,
        EventKind::WindowClose,
    ];

    /// Protocol event-mask bits a surface must select to receive this kind.
    ///
    /// `WindowOpen` and `WindowClose` select nothing: those events are decoded
    /// when they arrive but registering for them does not ask the server for them.
    pub fn event_mask(self) -> u32 {
        let mask = match self {
            EventKind::MouseMove => EventMask::POINTER_MOTION,
            EventKind::MouseWheel => EventMask::BUTTON_MOTION,
            EventKind::MousePress => EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE,
            EventKind::MouseHover => EventMask::ENTER_WINDOW | EventMask::LEAVE_WINDOW,
            EventKind::KeyPress => EventMask::KEY_PRESS | EventMask::KEY_RELEASE,
            EventKind::WindowMove | EventKind::WindowResize => EventMask::PROPERTY_CHANGE,
            EventKind::WindowFocus => EventMask::FOCUS_CHANGE,
            EventKind::WindowDraw => EventMask::EXPOSURE,
            EventKind::WindowOpen | EventKind::WindowClose | EventKind::Unknown => {
                EventMask::NO_EVENT
            }
        };
        u32::from(mask)
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Pointer button after normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Unknown,
    Left,
    Middle,
    Right,
}

impl MouseButton {
    /// Map a core protocol button index (1-based)
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => MouseButton::Left,
            2 => MouseButton::Middle,
            3 => MouseButton::Right,
            _ => MouseButton::Unknown,
        }
    }
}

/// A decoded input or window event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Something arrived that has no normalized form
    Unknown { target: Option<Window> },
    MouseMove {
        target: Window,
        x: i32,
        y: i32,
        dragging: bool,
    },
    /// Wheel "button". `delta` is the raw button index (4 or 5).
    MouseWheel { target: Window, delta: i32 },
    MousePress {
        target: Window,
        button: MouseButton,
        /// true on press, false on release
        state: bool,
        dragging: bool,
    },
    MouseHover {
        target: Window,
        x: i32,
        y: i32,
        /// true on enter, false on leave
        state: bool,
    },
    KeyPress {
        target: Window,
        /// Key under no modifiers
        physical: Key,
        /// Key under the reported modifier state
        logical: Key,
        /// true on press, false on release
        state: bool,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    },
    WindowDraw { target: Window },
    WindowOpen { target: Window },
    WindowClose { target: Window },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Unknown { .. } => EventKind::Unknown,
            Event::MouseMove { .. } => EventKind::MouseMove,
            Event::MouseWheel { .. } => EventKind::MouseWheel,
            Event::MousePress { .. } => EventKind::MousePress,
            Event::MouseHover { .. } => EventKind::MouseHover,
            Event::KeyPress { .. } => EventKind::KeyPress,
            Event::WindowDraw { .. } => EventKind::WindowDraw,
            Event::WindowOpen { .. } => EventKind::WindowOpen,
            Event::WindowClose { .. } => EventKind::WindowClose,
        }
    }

    /// Surface the event was reported against, when known
    pub fn target(&self) -> Option<Window> {
        match self {
            Event::Unknown { target } => *target,
            Event::MouseMove { target, .. }
            | Event::MouseWheel { target, .. }
            | Event::MousePress { target, .. }
            | Event::MouseHover { target, .. }
            | Event::KeyPress { target, .. }
            | Event::WindowDraw { target }
            | Event::WindowOpen { target }
            | Event::WindowClose { target } => Some(*target),
        }
    }
}
