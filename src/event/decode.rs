//! Event Decoder
//!
//! Turns one raw x11rb event into the normalized [`Event`]. Stateless: the
//! only input besides the raw event is the connection's keymap.

use tracing::{debug, warn};
use x11rb::protocol::Event as RawEvent;
use x11rb::protocol::xproto::{
    ButtonPressEvent, EnterNotifyEvent, KeyButMask, KeyPressEvent, Window,
};

use super::{Event, MouseButton};
use crate::error::describe;
use crate::keymap::Keymap;

/// Core protocol indices of the wheel "buttons"
const WHEEL_UP: u8 = 4;
const WHEEL_DOWN: u8 = 5;

/// Decode a raw event. Kinds without a normalized form become [`Event::Unknown`].
pub fn decode(raw: &RawEvent, keymap: &Keymap) -> Event {
    let event = match raw {
        RawEvent::Expose(e) => Event::WindowDraw { target: e.window },

        RawEvent::ButtonPress(e) => decode_button(e, true),
        RawEvent::ButtonRelease(e) => decode_button(e, false),

        RawEvent::MotionNotify(e) => Event::MouseMove {
            target: input_target(e.root, e.event, e.child),
            x: i32::from(e.event_x),
            y: i32::from(e.event_y),
            dragging: false,
        },

        RawEvent::EnterNotify(e) => decode_hover(e, true),
        RawEvent::LeaveNotify(e) => decode_hover(e, false),

        RawEvent::KeyPress(e) => decode_key(e, true, keymap),
        RawEvent::KeyRelease(e) => decode_key(e, false, keymap),

        RawEvent::CreateNotify(e) => Event::WindowOpen { target: e.window },
        RawEvent::DestroyNotify(e) => Event::WindowClose { target: e.window },

        RawEvent::Error(e) => {
            warn!(
                "X11 error in event queue: {} (major opcode {}, sequence {})",
                describe(e.error_code, e.minor_opcode),
                e.major_opcode,
                e.sequence
            );
            Event::Unknown { target: None }
        }

        other => Event::Unknown {
            target: reported_window(other),
        },
    };

    debug!("Decoded {:?} event for {:?}", event.kind(), event.target());
    event
}

/// Prefer the most specific window the server reported
fn input_target(root: Window, event: Window, child: Window) -> Window {
    if child != x11rb::NONE {
        child
    } else if event != x11rb::NONE {
        event
    } else {
        root
    }
}

fn decode_button(e: &ButtonPressEvent, pressed: bool) -> Event {
    let target = input_target(e.root, e.event, e.child);

    if e.detail == WHEEL_UP || e.detail == WHEEL_DOWN {
        return Event::MouseWheel {
            target,
            delta: i32::from(e.detail),
        };
    }

    Event::MousePress {
        target,
        button: MouseButton::from_index(e.detail),
        state: pressed,
        dragging: false,
    }
}

fn decode_hover(e: &EnterNotifyEvent, entered: bool) -> Event {
    Event::MouseHover {
        target: input_target(e.root, e.event, e.child),
        x: i32::from(e.event_x),
        y: i32::from(e.event_y),
        state: entered,
    }
}

fn decode_key(e: &KeyPressEvent, pressed: bool, keymap: &Keymap) -> Event {
    let state = u16::from(e.state);
    let (physical, logical) = keymap.resolve(e.detail, state);
    // caps lock is deliberately not folded into any flag
    let held = |bit: KeyButMask| state & u16::from(bit) != 0;

    Event::KeyPress {
        target: input_target(e.root, e.event, e.child),
        physical,
        logical,
        state: pressed,
        shift: held(KeyButMask::SHIFT),
        ctrl: held(KeyButMask::CONTROL),
        alt: held(KeyButMask::MOD1),
        meta: held(KeyButMask::MOD4),
    }
}

/// Window named by an event we do not normalize, for diagnostics
fn reported_window(event: &RawEvent) -> Option<Window> {
    match event {
        RawEvent::MapNotify(e) => Some(e.window),
        RawEvent::UnmapNotify(e) => Some(e.window),
        RawEvent::ConfigureNotify(e) => Some(e.window),
        RawEvent::ReparentNotify(e) => Some(e.window),
        RawEvent::PropertyNotify(e) => Some(e.window),
        RawEvent::FocusIn(e) => Some(e.event),
        RawEvent::FocusOut(e) => Some(e.event),
        RawEvent::ClientMessage(e) => Some(e.window),
        _ => None,
    }
}
