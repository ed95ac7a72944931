//! Normalized key enumeration

/// A key after keysym translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Unknown,
    Backspace,
    Tab,
    Enter,
    Shift,
    Ctrl,
    Alt,
    Pause,
    CapsLock,
    Escape,
    Space,
    PageUp,
    PageDown,
    End,
    Home,
    Left,
    Up,
    Right,
    Down,
    Insert,
    Delete,
    LeftMeta,
    RightMeta,
    Select,
    /// Keypad digit 0-9
    Numpad(u8),
    NumpadMultiply,
    NumpadAdd,
    NumpadSubtract,
    NumpadDecimal,
    NumpadDivide,
    /// Function key F1-F12
    F(u8),
    NumLock,
    ScrollLock,
    /// Printable character
    Char(char),
}

impl Key {
    /// Legacy numeric key code; -1 for keys without one.
    pub fn code(self) -> i32 {
        match self {
            Key::Unknown => -1,
            Key::Backspace => 8,
            Key::Tab => 9,
            Key::Enter => 13,
            Key::Shift => 16,
            Key::Ctrl => 17,
            Key::Alt => 18,
            Key::Pause => 19,
            Key::CapsLock => 20,
            Key::Escape => 27,
            Key::Space => 32,
            Key::PageUp => 33,
            Key::PageDown => 34,
            Key::End => 35,
            Key::Home => 36,
            Key::Left => 37,
            Key::Up => 38,
            Key::Right => 39,
            Key::Down => 40,
            Key::Insert => 45,
            Key::Delete => 46,
            Key::LeftMeta => 91,
            Key::RightMeta => 92,
            Key::Select => 93,
            Key::Numpad(n) if n <= 9 => 96 + i32::from(n),
            Key::Numpad(_) => -1,
            Key::NumpadMultiply => 106,
            Key::NumpadAdd => 107,
            Key::NumpadSubtract => 109,
            Key::NumpadDecimal => 110,
            Key::NumpadDivide => 111,
            Key::F(n) if (1..=12).contains(&n) => 111 + i32::from(n),
            Key::F(_) => -1,
            Key::NumLock => 144,
            Key::ScrollLock => 145,
            Key::Char(c) => char_code(c),
        }
    }

    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            Key::Shift | Key::Ctrl | Key::Alt | Key::LeftMeta | Key::RightMeta
        )
    }
}

fn char_code(c: char) -> i32 {
    match c {
        'a'..='z' | 'A'..='Z' => c.to_ascii_uppercase() as i32,
        '0'..='9' => c as i32,
        ';' => 146,
        '=' => 187,
        ',' => 188,
        '-' => 189,
        '.' => 190,
        '/' => 191,
        '`' => 192,
        '[' => 219,
        '\\' => 220,
        ']' => 221,
        '\'' => 222,
        _ => -1,
    }
}
