//! Plain value types shared by the surface, graphics and backend layers.

pub mod geometry;

pub use geometry::{Ellipse, Geometry, Line, Point, Rect};
