//! Geometry and drawing primitives
//!
//! Coordinates are kept as `i32`/`u32` here and narrowed to the 16-bit wire
//! types only when a request is built.

/// Window geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Line segment from (x1, y1) to (x2, y2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Line {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Line {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}

/// Axis-aligned ellipse: center plus radii
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ellipse {
    pub cx: i32,
    pub cy: i32,
    pub rx: u32,
    pub ry: u32,
}

/// Narrow to a 16-bit wire coordinate, saturating
pub(crate) fn coord(v: i32) -> i16 {
    v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

/// Narrow to a 16-bit wire dimension, saturating
pub(crate) fn dimension(v: u32) -> u16 {
    v.min(u32::from(u16::MAX)) as u16
}
