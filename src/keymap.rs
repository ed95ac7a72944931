//! Keymap Module
//!
//! Holds the server's keycode -> keysym table and resolves raw key events
//! into normalized [`Key`]s.

use bitflags::bitflags;
use tracing::debug;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::event::Key;

bitflags! {
    /// Core protocol modifier bits (the low byte of a key/button state)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u16 {
        const SHIFT = 1 << 0;
        const LOCK = 1 << 1;
        const CONTROL = 1 << 2;
        const MOD1 = 1 << 3; // Alt
        const MOD2 = 1 << 4;
        const MOD3 = 1 << 5;
        const MOD4 = 1 << 6; // Super
        const MOD5 = 1 << 7;
    }
}

impl Modifiers {
    /// Bits that pick a column in the keysym table
    pub const COLUMN: Modifiers = Modifiers::SHIFT
        .union(Modifiers::LOCK)
        .union(Modifiers::CONTROL);

    /// Parse a raw state word, dropping pointer-button bits
    pub fn from_state(state: u16) -> Self {
        Self::from_bits_truncate(state)
    }
}

/// Keysym values used by the fixed lookup
pub mod keysym {
    pub const VOID_SYMBOL: u32 = 0x00ff_ffff;

    pub const SPACE: u32 = 0x0020;
    pub const ASCII_TILDE: u32 = 0x007e;

    pub const BACKSPACE: u32 = 0xff08;
    pub const TAB: u32 = 0xff09;
    pub const LINEFEED: u32 = 0xff0a;
    pub const RETURN: u32 = 0xff0d;
    pub const PAUSE: u32 = 0xff13;
    pub const SCROLL_LOCK: u32 = 0xff14;
    pub const ESCAPE: u32 = 0xff1b;
    pub const HOME: u32 = 0xff50;
    pub const LEFT: u32 = 0xff51;
    pub const UP: u32 = 0xff52;
    pub const RIGHT: u32 = 0xff53;
    pub const DOWN: u32 = 0xff54;
    pub const PAGE_UP: u32 = 0xff55;
    pub const PAGE_DOWN: u32 = 0xff56;
    pub const END: u32 = 0xff57;
    pub const INSERT: u32 = 0xff63;
    pub const MENU: u32 = 0xff67;
    pub const NUM_LOCK: u32 = 0xff7f;
    pub const KP_ENTER: u32 = 0xff8d;
    pub const KP_MULTIPLY: u32 = 0xffaa;
    pub const KP_ADD: u32 = 0xffab;
    pub const KP_SUBTRACT: u32 = 0xffad;
    pub const KP_DECIMAL: u32 = 0xffae;
    pub const KP_DIVIDE: u32 = 0xffaf;
    pub const KP_0: u32 = 0xffb0;
    pub const KP_9: u32 = 0xffb9;
    pub const F1: u32 = 0xffbe;
    pub const F12: u32 = 0xffc9;
    pub const SHIFT_L: u32 = 0xffe1;
    pub const SHIFT_R: u32 = 0xffe2;
    pub const CONTROL_L: u32 = 0xffe3;
    pub const CONTROL_R: u32 = 0xffe4;
    pub const CAPS_LOCK: u32 = 0xffe5;
    pub const META_L: u32 = 0xffe7;
    pub const META_R: u32 = 0xffe8;
    pub const ALT_L: u32 = 0xffe9;
    pub const ALT_R: u32 = 0xffea;
    pub const SUPER_L: u32 = 0xffeb;
    pub const SUPER_R: u32 = 0xffec;
    pub const DELETE: u32 = 0xffff;
}

/// Map a keysym to the normalized key enumeration
pub fn keysym_to_key(sym: u32) -> Key {
    use keysym::*;

    match sym {
        BACKSPACE => Key::Backspace,
        TAB => Key::Tab,
        LINEFEED | RETURN | KP_ENTER => Key::Enter,
        PAUSE => Key::Pause,
        SCROLL_LOCK => Key::ScrollLock,
        ESCAPE => Key::Escape,
        DELETE => Key::Delete,
        SPACE => Key::Space,

        HOME => Key::Home,
        LEFT => Key::Left,
        UP => Key::Up,
        RIGHT => Key::Right,
        DOWN => Key::Down,
        PAGE_UP => Key::PageUp,
        PAGE_DOWN => Key::PageDown,
        END => Key::End,
        INSERT => Key::Insert,
        MENU => Key::Select,

        SHIFT_L | SHIFT_R => Key::Shift,
        CONTROL_L | CONTROL_R => Key::Ctrl,
        ALT_L | ALT_R => Key::Alt,
        CAPS_LOCK => Key::CapsLock,
        META_L | SUPER_L => Key::LeftMeta,
        META_R | SUPER_R => Key::RightMeta,
        NUM_LOCK => Key::NumLock,

        KP_0..=KP_9 => Key::Numpad((sym - KP_0) as u8),
        KP_MULTIPLY => Key::NumpadMultiply,
        KP_ADD => Key::NumpadAdd,
        KP_SUBTRACT => Key::NumpadSubtract,
        KP_DECIMAL => Key::NumpadDecimal,
        KP_DIVIDE => Key::NumpadDivide,

        F1..=F12 => Key::F((sym - F1 + 1) as u8),

        // Printable Latin-1 keysyms are their own code points
        0x0021..=ASCII_TILDE => char::from_u32(sym).map_or(Key::Unknown, Key::Char),

        _ => Key::Unknown,
    }
}

/// Keycode -> keysym table for one connection
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    first_keycode: u8,
    keysyms_per_keycode: u8,
    table: Vec<u32>,
}

impl Keymap {
    /// Build a table from a keyboard-mapping reply
    pub fn from_mapping(first_keycode: u8, keysyms_per_keycode: u8, keysyms: Vec<u32>) -> Self {
        Self {
            first_keycode,
            keysyms_per_keycode,
            table: keysyms,
        }
    }

    /// Fetch the full keycode range once from the server
    pub fn load<B: Backend>(backend: &B, min_keycode: u8, max_keycode: u8) -> Result<Self> {
        let count = max_keycode
            .checked_sub(min_keycode)
            .and_then(|span| span.checked_add(1))
            .ok_or_else(|| {
                Error::Connection(format!(
                    "invalid keycode range {}..={}",
                    min_keycode, max_keycode
                ))
            })?;

        let (per, keysyms) = backend
            .keyboard_mapping(min_keycode, count)
            .map_err(|e| Error::Connection(format!("failed to load keyboard mapping: {}", e)))?;

        debug!(
            "Loaded keymap: {} keycodes from {}, {} keysyms per keycode",
            count, min_keycode, per
        );

        Ok(Self::from_mapping(min_keycode, per, keysyms))
    }

    pub fn is_loaded(&self) -> bool {
        !self.table.is_empty()
    }

    /// Raw keysym for `keycode` under `mods`
    pub fn lookup(&self, keycode: u8, mods: Modifiers) -> u32 {
        let column = usize::from((mods & Modifiers::COLUMN).bits());
        let per = usize::from(self.keysyms_per_keycode);

        if column >= per || keycode < self.first_keycode {
            return keysym::VOID_SYMBOL;
        }

        let row = usize::from(keycode - self.first_keycode);
        self.table
            .get(row * per + column)
            .copied()
            .unwrap_or(keysym::VOID_SYMBOL)
    }

    /// Resolve to `(physical, logical)`: the key with no modifiers and the key
    /// under the actual modifier state.
    pub fn resolve(&self, keycode: u8, state: u16) -> (Key, Key) {
        let physical = keysym_to_key(self.lookup(keycode, Modifiers::empty()));
        let logical = keysym_to_key(self.lookup(keycode, Modifiers::from_state(state)));
        (physical, logical)
    }

    /// Drop the table. Used on connection teardown.
    pub fn release(&mut self) {
        self.table = Vec::new();
    }
}
